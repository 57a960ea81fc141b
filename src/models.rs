use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Pip,
    Npm,
    NuGet,
    Gem,
    Composer,
    Cargo,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 6] = [
        Ecosystem::Pip,
        Ecosystem::Npm,
        Ecosystem::NuGet,
        Ecosystem::Gem,
        Ecosystem::Composer,
        Ecosystem::Cargo,
    ];

    /// Ecosystem identifier understood by the OSV query API.
    pub fn osv_name(&self) -> &'static str {
        match self {
            Ecosystem::Pip => "PyPI",
            Ecosystem::Npm => "npm",
            Ecosystem::NuGet => "NuGet",
            Ecosystem::Gem => "RubyGems",
            Ecosystem::Composer => "Packagist",
            Ecosystem::Cargo => "crates.io",
        }
    }

    /// Human name of the public registry backing this ecosystem.
    pub fn registry_name(&self) -> &'static str {
        match self {
            Ecosystem::Pip => "PyPI",
            Ecosystem::Npm => "npm registry",
            Ecosystem::NuGet => "NuGet Gallery",
            Ecosystem::Gem => "RubyGems",
            Ecosystem::Composer => "Packagist",
            Ecosystem::Cargo => "crates.io",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::Pip => write!(f, "pip"),
            Ecosystem::Npm => write!(f, "npm"),
            Ecosystem::NuGet => write!(f, "NuGet"),
            Ecosystem::Gem => write!(f, "gem"),
            Ecosystem::Composer => write!(f, "composer"),
            Ecosystem::Cargo => write!(f, "cargo"),
        }
    }
}

/// A manifest file found by the directory scanner.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub ecosystem: Ecosystem,
    pub path: PathBuf,
    pub content: String,
}

/// One directly declared dependency, as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDeclaration {
    pub name: String,
    pub ecosystem: Ecosystem,
    pub declared_version: Option<String>,
}

impl DependencyDeclaration {
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            ecosystem,
            declared_version: version.filter(|v| !v.trim().is_empty()),
        }
    }

    /// The declared version when it pins one concrete release.
    ///
    /// Ranges (`^1.2`, `>=2.0`, `~> 3.1`), wildcards and tags like `latest`
    /// return `None`. Cargo reads a bare `1.2.3` as a caret requirement, so
    /// only `=1.2.3` pins there.
    pub fn exact_version(&self) -> Option<&str> {
        let raw = self.declared_version.as_deref()?.trim();
        if self.ecosystem == Ecosystem::Cargo && !raw.starts_with('=') {
            return None;
        }
        let version = raw
            .strip_prefix("==")
            .or_else(|| raw.strip_prefix('='))
            .unwrap_or(raw)
            .trim();
        let starts_with_digit = version.chars().next().is_some_and(|c| c.is_ascii_digit());
        let has_operator = version.chars().any(|c| {
            matches!(c, '^' | '~' | '>' | '<' | '*' | '|' | ',' | ' ' | '[' | '(' | '!')
        });
        let has_wildcard = version.split('.').any(|part| part.eq_ignore_ascii_case("x"));
        if starts_with_digit && !has_operator && !has_wildcard {
            Some(version)
        } else {
            None
        }
    }
}

/// Registry metadata for one declaration.
///
/// A failed lookup still produces a value: every descriptive field is `None`
/// and `resolve_error` says why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub ecosystem: Ecosystem,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub project_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub resolve_error: Option<FetchError>,
}

impl PackageInfo {
    /// An empty record for `decl`, ready to be filled by a registry mapping.
    pub fn empty(decl: &DependencyDeclaration) -> Self {
        Self {
            name: decl.name.clone(),
            ecosystem: decl.ecosystem,
            description: None,
            author: None,
            license: None,
            project_url: None,
            release_date: None,
            resolve_error: None,
        }
    }

    pub fn unresolved(decl: &DependencyDeclaration, error: FetchError) -> Self {
        Self {
            resolve_error: Some(error),
            ..Self::empty(decl)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VulnerabilityStatus {
    pub has_known_vulnerabilities: bool,
    pub count: usize,
    /// OSV identifiers of the matching advisories.
    pub advisory_ids: Vec<String>,
    /// The query was made by package name only, so advisories may concern
    /// releases other than the one in use.
    pub version_unpinned: bool,
    pub query_error: Option<FetchError>,
}

impl VulnerabilityStatus {
    pub fn from_advisories(advisory_ids: Vec<String>, version_unpinned: bool) -> Self {
        Self {
            has_known_vulnerabilities: !advisory_ids.is_empty(),
            count: advisory_ids.len(),
            advisory_ids,
            version_unpinned,
            query_error: None,
        }
    }

    pub fn failed(error: FetchError, version_unpinned: bool) -> Self {
        Self {
            has_known_vulnerabilities: false,
            count: 0,
            advisory_ids: Vec::new(),
            version_unpinned,
            query_error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LicenseFamily {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    Unknown,
}

impl std::fmt::Display for LicenseFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LicenseFamily::Permissive => write!(f, "Permissive"),
            LicenseFamily::WeakCopyleft => write!(f, "Weak Copyleft"),
            LicenseFamily::StrongCopyleft => write!(f, "Strong Copyleft"),
            LicenseFamily::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Ordered from best to worst, so `max` gives the worst case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    Compatible,
    Unknown,
    Incompatible,
}

impl std::fmt::Display for Compatibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compatibility::Compatible => write!(f, "compatible"),
            Compatibility::Unknown => write!(f, "unknown"),
            Compatibility::Incompatible => write!(f, "incompatible"),
        }
    }
}

/// Unordered pair of two distinct license strings, stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LicensePair(String, String);

impl LicensePair {
    /// Returns `None` when both sides are the same license.
    pub fn new(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self(a.to_string(), b.to_string())),
            std::cmp::Ordering::Greater => Some(Self(b.to_string(), a.to_string())),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }

    pub fn contains(&self, license: &str) -> bool {
        self.0 == license || self.1 == license
    }
}

impl std::fmt::Display for LicensePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} + {}", self.0, self.1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LicenseVerdict {
    #[serde(serialize_with = "serialize_pairs")]
    pub pairs: BTreeMap<LicensePair, Compatibility>,
    pub families: BTreeMap<String, LicenseFamily>,
    pub overall: Compatibility,
}

impl LicenseVerdict {
    pub fn get(&self, a: &str, b: &str) -> Option<Compatibility> {
        LicensePair::new(a, b).and_then(|pair| self.pairs.get(&pair).copied())
    }

    pub fn pairs_with(&self, verdict: Compatibility) -> impl Iterator<Item = &LicensePair> {
        self.pairs
            .iter()
            .filter(move |(_, v)| **v == verdict)
            .map(|(pair, _)| pair)
    }

    pub fn licenses(&self) -> BTreeSet<&str> {
        self.families.keys().map(String::as_str).collect()
    }
}

// JSON object keys must be strings, so pairs are written as a list.
fn serialize_pairs<S>(
    pairs: &BTreeMap<LicensePair, Compatibility>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(pairs.iter().map(|(pair, verdict)| (&pair.0, &pair.1, verdict)))
}

/// Outcome of one run. The three vectors are index-aligned and in
/// declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub declarations: Vec<DependencyDeclaration>,
    pub package_infos: Vec<PackageInfo>,
    pub vuln_statuses: Vec<VulnerabilityStatus>,
    pub license_verdict: LicenseVerdict,
}

impl ScanReport {
    pub fn rows(
        &self,
    ) -> impl Iterator<Item = (&DependencyDeclaration, &PackageInfo, &VulnerabilityStatus)> {
        self.declarations
            .iter()
            .zip(&self.package_infos)
            .zip(&self.vuln_statuses)
            .map(|((decl, info), vuln)| (decl, info, vuln))
    }
}
