use regex::Regex;

use crate::error::ParseError;
use crate::models::{DependencyDeclaration, Ecosystem};

use super::Entries;

/// Analyzer for pip `requirements.txt` files.
///
/// Accepts `name`, `name==version` and other PEP 440 specifiers (kept raw).
/// Extras and environment markers are dropped; pip option lines (`-r`, `-e`,
/// `--index-url`) are ignored.
pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for PythonAnalyzer {
    fn analyze(&self, content: &str) -> Result<Entries, ParseError> {
        let re = Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[[^\]]*\])?\s*(.*)$")
            .map_err(|e| ParseError::new(Ecosystem::Pip, "", e.to_string()))?;
        let mut entries = Vec::new();

        for raw in content.lines() {
            let line = strip_comment(raw).trim();
            if line.is_empty() || line.starts_with('-') {
                continue;
            }
            // Environment markers: `numpy==1.24 ; python_version >= "3.8"`
            let requirement = line.split(';').next().unwrap_or(line).trim();
            entries.push(parse_requirement(&re, requirement));
        }

        Ok(entries)
    }
}

fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #").or_else(|| line.find("\t#")) {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_requirement(re: &Regex, requirement: &str) -> Result<DependencyDeclaration, ParseError> {
    let malformed = |reason: &str| ParseError::new(Ecosystem::Pip, requirement, reason);

    let caps = re
        .captures(requirement)
        .ok_or_else(|| malformed("not a requirement"))?;
    let name = caps[1].to_string();
    let rest: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();

    let version = if rest.is_empty() || rest.starts_with('@') {
        // Bare name, or a direct URL reference
        None
    } else if let Some(pinned) = rest.strip_prefix("===").or_else(|| rest.strip_prefix("==")) {
        Some(pinned.to_string())
    } else if rest.starts_with(['<', '>', '=', '!', '~']) {
        Some(rest)
    } else {
        return Err(malformed("unrecognised version specifier"));
    };

    Ok(DependencyDeclaration::new(Ecosystem::Pip, name, version))
}
