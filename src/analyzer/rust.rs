use toml::Value;

use crate::error::ParseError;
use crate::models::{DependencyDeclaration, Ecosystem};

use super::Entries;

/// Analyzer for the `[dependencies]` table of a `Cargo.toml`.
pub struct RustAnalyzer;

impl RustAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for RustAnalyzer {
    fn analyze(&self, content: &str) -> Result<Entries, ParseError> {
        let manifest: toml::Table = toml::from_str(content)
            .map_err(|e| ParseError::new(Ecosystem::Cargo, "Cargo.toml", e.to_string()))?;

        let Some(deps) = manifest.get("dependencies").and_then(Value::as_table) else {
            return Ok(Vec::new());
        };

        Ok(deps
            .iter()
            .map(|(key, spec)| parse_dependency(key, spec))
            .collect())
    }
}

/// `serde = "1"`, `tokio = { version = "1", features = [...] }`,
/// `log2 = { package = "log", version = "0.4" }`, `local = { path = "../x" }`.
fn parse_dependency(key: &str, spec: &Value) -> Result<DependencyDeclaration, ParseError> {
    match spec {
        Value::String(version) => Ok(DependencyDeclaration::new(
            Ecosystem::Cargo,
            key,
            Some(version.clone()),
        )),
        Value::Table(table) => {
            // `package` names the real crate when the dependency is renamed
            let name = table
                .get("package")
                .and_then(Value::as_str)
                .unwrap_or(key);
            let version = table
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(DependencyDeclaration::new(Ecosystem::Cargo, name, version))
        }
        other => Err(ParseError::new(
            Ecosystem::Cargo,
            format!("{} = {}", key, other),
            "expected a version string or a table",
        )),
    }
}
