use serde_json::Value;

use crate::error::ParseError;
use crate::models::Ecosystem;

use super::node::dependency_maps;
use super::Entries;

const SECTIONS: [&str; 2] = ["require", "require-dev"];

/// Analyzer for `composer.json` (`require` and `require-dev`).
pub struct PhpAnalyzer;

impl PhpAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for PhpAnalyzer {
    fn analyze(&self, content: &str) -> Result<Entries, ParseError> {
        let json: Value = serde_json::from_str(content)
            .map_err(|e| ParseError::new(Ecosystem::Composer, "composer.json", e.to_string()))?;
        Ok(dependency_maps(&json, Ecosystem::Composer, &SECTIONS, |name| {
            !is_platform_requirement(name)
        }))
    }
}

/// `php`, `ext-json`, `lib-icu`, `composer-plugin-api` and friends constrain
/// the runtime and have no Packagist entry.
fn is_platform_requirement(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    !name.contains('/')
        && (name == "php"
            || name.starts_with("php-")
            || name == "hhvm"
            || name.starts_with("ext-")
            || name.starts_with("lib-")
            || name.starts_with("composer"))
}
