use serde_json::Value;

use crate::error::ParseError;
use crate::models::{DependencyDeclaration, Ecosystem};

use super::Entries;

const SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

/// Analyzer for `package.json`. Version ranges are kept as written.
pub struct NodeAnalyzer;

impl NodeAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for NodeAnalyzer {
    fn analyze(&self, content: &str) -> Result<Entries, ParseError> {
        let json: Value = serde_json::from_str(content)
            .map_err(|e| ParseError::new(Ecosystem::Npm, "package.json", e.to_string()))?;
        Ok(dependency_maps(&json, Ecosystem::Npm, &SECTIONS, |_| true))
    }
}

/// Collect `name -> version` entries from the given top-level object maps.
///
/// Shared with `composer.json`, which has the same layout. `keep` filters out
/// names that are not packages at all.
pub(super) fn dependency_maps(
    json: &Value,
    ecosystem: Ecosystem,
    sections: &[&str],
    keep: impl Fn(&str) -> bool,
) -> Entries {
    let mut entries = Vec::new();

    for section in sections {
        let Some(pkgs) = json.get(section).and_then(|v| v.as_object()) else {
            continue;
        };
        for (name, version) in pkgs {
            if !keep(name) {
                continue;
            }
            let entry = match version.as_str() {
                Some(v) if !name.trim().is_empty() => Ok(DependencyDeclaration::new(
                    ecosystem,
                    name.clone(),
                    Some(v.to_string()),
                )),
                Some(_) => Err(ParseError::new(ecosystem, name.clone(), "empty package name")),
                None => Err(ParseError::new(
                    ecosystem,
                    format!("{}: {}", name, version),
                    "version is not a string",
                )),
            };
            entries.push(entry);
        }
    }

    entries
}
