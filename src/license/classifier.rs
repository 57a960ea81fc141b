use crate::license::spdx::{classify_spdx_id, normalize};
use crate::models::LicenseFamily;

/// Classify a license string (raw or SPDX) into a license family.
///
/// Handles:
/// - SPDX identifiers (MIT, Apache-2.0, etc.)
/// - SPDX OR expressions (MIT OR Apache-2.0)  → most permissive wins
/// - SPDX AND expressions (MIT AND GPL-3.0)  → most restrictive wins
/// - `/` as an OR shorthand and `WITH` exception clauses
/// - Empty / unknown
pub fn classify(license: &str) -> LicenseFamily {
    let trimmed = license.trim().trim_start_matches('(').trim_end_matches(')').trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
        return LicenseFamily::Unknown;
    }

    // Normalize common non-SPDX strings first
    // Also normalize slash separator to OR (e.g. "MIT/Apache-2.0" → "MIT OR Apache-2.0")
    let normalized = normalize(trimmed).replace('/', " OR ");

    if normalized.contains(" OR ") {
        let families: Vec<LicenseFamily> = normalized
            .split(" OR ")
            .map(classify_single)
            .collect();
        return most_permissive(&families);
    }

    if normalized.contains(" AND ") {
        let families: Vec<LicenseFamily> = normalized
            .split(" AND ")
            .map(classify_single)
            .collect();
        return most_restrictive(&families);
    }

    classify_single(&normalized)
}

fn classify_single(id: &str) -> LicenseFamily {
    // Strip WITH exception clauses (e.g. "GPL-2.0 WITH Classpath-exception-2.0")
    let base = id.split(" WITH ").next().unwrap_or(id);
    let base = base.trim().trim_start_matches('(').trim_end_matches(')').trim();
    classify_spdx_id(&normalize(base))
}

fn most_permissive(families: &[LicenseFamily]) -> LicenseFamily {
    [
        LicenseFamily::Permissive,
        LicenseFamily::WeakCopyleft,
        LicenseFamily::StrongCopyleft,
    ]
    .into_iter()
    .find(|f| families.contains(f))
    .unwrap_or(LicenseFamily::Unknown)
}

/// An unclassified component makes the whole conjunction unknown.
fn most_restrictive(families: &[LicenseFamily]) -> LicenseFamily {
    if families.contains(&LicenseFamily::Unknown) {
        return LicenseFamily::Unknown;
    }
    [
        LicenseFamily::StrongCopyleft,
        LicenseFamily::WeakCopyleft,
        LicenseFamily::Permissive,
    ]
    .into_iter()
    .find(|f| families.contains(f))
    .unwrap_or(LicenseFamily::Unknown)
}
