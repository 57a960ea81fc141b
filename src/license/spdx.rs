use crate::models::LicenseFamily;

// Base identifiers only; `-only`, `-or-later` and `+` are stripped before lookup.
const PERMISSIVE: &[&str] = &[
    "MIT", "MIT-0", "Apache-2.0", "BSD-2-Clause", "BSD-3-Clause", "ISC", "0BSD", "Unlicense",
    "Zlib", "CC0-1.0", "PSF-2.0", "Python-2.0", "BSL-1.0", "Ruby", "PostgreSQL", "Artistic-2.0",
    "Unicode-3.0",
];

const WEAK_COPYLEFT: &[&str] = &[
    "LGPL-2.0", "LGPL-2.1", "LGPL-3.0", "MPL-1.1", "MPL-2.0", "EPL-1.0", "EPL-2.0", "EUPL-1.2",
    "CDDL-1.0",
];

const STRONG_COPYLEFT: &[&str] = &["GPL-2.0", "GPL-3.0", "AGPL-3.0", "EUPL-1.1"];

/// Free-text names seen on PyPI, RubyGems and NuGet, keyed by the SPDX id
/// they stand for. Matched without regard to case.
const ALIASES: &[(&str, &[&str])] = &[
    ("MIT", &["MIT License", "The MIT License", "Expat"]),
    (
        "Apache-2.0",
        &[
            "Apache 2.0",
            "Apache 2",
            "Apache License 2.0",
            "Apache License, Version 2.0",
            "Apache Software License",
            "ASL 2.0",
        ],
    ),
    ("BSD-2-Clause", &["BSD 2-Clause", "Simplified BSD"]),
    ("BSD-3-Clause", &["BSD", "BSD License", "BSD 3-Clause", "New BSD", "Modified BSD"]),
    ("ISC", &["ISC License", "ISC License (ISCL)"]),
    ("PSF-2.0", &["Python Software Foundation License", "PSF"]),
    ("CC0-1.0", &["CC0", "Public Domain"]),
    ("MPL-2.0", &["MPL 2.0", "Mozilla Public License 2.0", "Mozilla Public License 2.0 (MPL 2.0)"]),
    ("LGPL-2.1", &["LGPL v2.1", "LGPLv2.1", "GNU LGPL v2.1"]),
    ("LGPL-3.0", &["LGPL v3", "LGPLv3", "GNU LGPL v3", "GNU Lesser General Public License v3 (LGPLv3)"]),
    ("GPL-2.0", &["GPL v2", "GPLv2", "GNU GPL v2", "GNU General Public License v2 (GPLv2)"]),
    ("GPL-3.0", &["GPL v3", "GPLv3", "GNU GPL v3", "GNU General Public License v3 (GPLv3)"]),
    ("AGPL-3.0", &["AGPL v3", "AGPLv3", "GNU Affero General Public License v3"]),
];

/// Family of a single SPDX identifier. Version qualifiers do not change the
/// family, so `GPL-3.0-or-later` and `GPL-3.0+` classify like `GPL-3.0`.
pub fn classify_spdx_id(id: &str) -> LicenseFamily {
    let id = id.trim();
    let base = id
        .strip_suffix("-or-later")
        .or_else(|| id.strip_suffix("-only"))
        .or_else(|| id.strip_suffix('+'))
        .unwrap_or(id);
    let listed = |table: &[&str]| table.iter().any(|known| known.eq_ignore_ascii_case(base));

    if listed(PERMISSIVE) {
        LicenseFamily::Permissive
    } else if listed(WEAK_COPYLEFT) {
        LicenseFamily::WeakCopyleft
    } else if listed(STRONG_COPYLEFT) {
        LicenseFamily::StrongCopyleft
    } else {
        LicenseFamily::Unknown
    }
}

/// Map a registry's license text to its SPDX id when it is a known alias.
/// Trove classifier prefixes (`License :: OSI Approved :: `) are dropped.
/// Unrecognized text comes back trimmed but otherwise unchanged.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let name = trimmed
        .strip_prefix("License :: OSI Approved :: ")
        .or_else(|| trimmed.strip_prefix("License :: "))
        .unwrap_or(trimmed);

    ALIASES
        .iter()
        .find(|(_, names)| names.iter().any(|alias| alias.eq_ignore_ascii_case(name)))
        .map_or(name, |&(spdx, _)| spdx)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families() {
        assert_eq!(classify_spdx_id("MIT"), LicenseFamily::Permissive);
        assert_eq!(classify_spdx_id("BSD-3-Clause"), LicenseFamily::Permissive);
        assert_eq!(classify_spdx_id("MPL-2.0"), LicenseFamily::WeakCopyleft);
        assert_eq!(classify_spdx_id("AGPL-3.0"), LicenseFamily::StrongCopyleft);
        assert_eq!(classify_spdx_id("Proprietary"), LicenseFamily::Unknown);
    }

    #[test]
    fn test_version_qualifiers_keep_the_family() {
        assert_eq!(classify_spdx_id("GPL-3.0-only"), LicenseFamily::StrongCopyleft);
        assert_eq!(classify_spdx_id("GPL-2.0+"), LicenseFamily::StrongCopyleft);
        assert_eq!(classify_spdx_id("LGPL-2.1-or-later"), LicenseFamily::WeakCopyleft);
        assert_eq!(classify_spdx_id(" apache-2.0 "), LicenseFamily::Permissive);
    }

    #[test]
    fn test_aliases_resolve_to_spdx_ids() {
        assert_eq!(normalize("MIT License"), "MIT");
        assert_eq!(normalize("mit license"), "MIT");
        assert_eq!(normalize("Apache 2.0"), "Apache-2.0");
        assert_eq!(normalize("GNU GPL v3"), "GPL-3.0");
        assert_eq!(
            normalize("License :: OSI Approved :: Apache Software License"),
            "Apache-2.0"
        );
        assert_eq!(normalize("License :: Public Domain"), "CC0-1.0");
        assert_eq!(normalize("  Custom  "), "Custom");
    }

    #[test]
    fn test_every_alias_lands_in_a_family() {
        for (spdx, _) in ALIASES {
            assert_ne!(classify_spdx_id(spdx), LicenseFamily::Unknown, "{spdx}");
        }
    }
}
