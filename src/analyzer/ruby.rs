use regex::Regex;

use crate::error::ParseError;
use crate::models::{DependencyDeclaration, Ecosystem};

use super::Entries;

/// Analyzer for Bundler `Gemfile`s: `gem "name"[, "requirement"]` lines.
pub struct RubyAnalyzer;

impl RubyAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for RubyAnalyzer {
    fn analyze(&self, content: &str) -> Result<Entries, ParseError> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ParseError::new(Ecosystem::Gem, "", e.to_string()))
        };
        // gem 'rails', '~> 7.0'   /   gem("puma")
        let gem_re = build(r#"^gem[\s(]+(["'])([^"']+)["'](.*)$"#)?;
        let version_re = build(r#"^\s*,\s*["']([^"']+)["']"#)?;

        let mut entries = Vec::new();

        for raw in content.lines() {
            let line = raw.trim();
            if !(line.starts_with("gem ") || line.starts_with("gem(")) {
                continue;
            }

            let entry = match gem_re.captures(line) {
                Some(caps) => {
                    let name = caps[2].trim().to_string();
                    let version = version_re
                        .captures(&caps[3])
                        .map(|v| v[1].trim().to_string());
                    Ok(DependencyDeclaration::new(Ecosystem::Gem, name, version))
                }
                None => Err(ParseError::new(Ecosystem::Gem, line, "not a gem declaration")),
            };
            entries.push(entry);
        }

        Ok(entries)
    }
}
