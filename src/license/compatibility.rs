use std::collections::{BTreeMap, BTreeSet};

use crate::license::classifier::classify;
use crate::models::{Compatibility, LicenseFamily, LicensePair, LicenseVerdict};

/// Pairwise family rule: unknown beats everything, strong copyleft mixed with
/// any other family is incompatible, everything else is compatible.
pub fn pair_compatibility(a: LicenseFamily, b: LicenseFamily) -> Compatibility {
    use LicenseFamily::*;
    match (a, b) {
        (Unknown, _) | (_, Unknown) => Compatibility::Unknown,
        (StrongCopyleft, StrongCopyleft) => Compatibility::Compatible,
        (StrongCopyleft, _) | (_, StrongCopyleft) => Compatibility::Incompatible,
        _ => Compatibility::Compatible,
    }
}

/// Assess every unordered pair of distinct licenses in `licenses`.
///
/// The overall verdict is the worst pair verdict, raised to at least
/// `Unknown` when any single license is unclassified. The empty set is
/// trivially compatible.
pub fn assess(licenses: &BTreeSet<String>) -> LicenseVerdict {
    let families: BTreeMap<String, LicenseFamily> = licenses
        .iter()
        .map(|license| (license.clone(), classify(license)))
        .collect();

    let mut pairs = BTreeMap::new();
    for (i, (a, family_a)) in families.iter().enumerate() {
        for (b, family_b) in families.iter().skip(i + 1) {
            if let Some(pair) = LicensePair::new(a, b) {
                pairs.insert(pair, pair_compatibility(*family_a, *family_b));
            }
        }
    }

    let worst_pair = pairs
        .values()
        .copied()
        .max()
        .unwrap_or(Compatibility::Compatible);
    let any_unclassified = families.values().any(|f| *f == LicenseFamily::Unknown);
    let overall = if any_unclassified {
        worst_pair.max(Compatibility::Unknown)
    } else {
        worst_pair
    };

    LicenseVerdict {
        pairs,
        families,
        overall,
    }
}
