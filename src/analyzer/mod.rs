//! Manifest parsers, one per ecosystem.
//!
//! Each [`Analyzer`] works on file content only. A malformed entry becomes an
//! `Err` item that [`parse`] logs and drops; a document that cannot be read at
//! all yields zero declarations.

use tracing::{debug, warn};

use crate::error::ParseError;
use crate::models::{DependencyDeclaration, Ecosystem};

pub mod dotnet;
pub mod node;
pub mod php;
pub mod python;
pub mod ruby;
pub mod rust;

/// Declarations of one manifest, with malformed entries kept as errors.
pub type Entries = Vec<Result<DependencyDeclaration, ParseError>>;

pub trait Analyzer {
    /// Parse manifest content. `Err` means the document as a whole is unusable.
    fn analyze(&self, content: &str) -> Result<Entries, ParseError>;
}

/// Parse `content` as a manifest of `ecosystem`, skipping whatever is malformed.
pub fn parse(ecosystem: Ecosystem, content: &str) -> Vec<DependencyDeclaration> {
    let result = match ecosystem {
        Ecosystem::Pip => python::PythonAnalyzer::new().analyze(content),
        Ecosystem::Npm => node::NodeAnalyzer::new().analyze(content),
        Ecosystem::NuGet => dotnet::DotNetAnalyzer::new().analyze(content),
        Ecosystem::Gem => ruby::RubyAnalyzer::new().analyze(content),
        Ecosystem::Composer => php::PhpAnalyzer::new().analyze(content),
        Ecosystem::Cargo => rust::RustAnalyzer::new().analyze(content),
    };

    match result {
        Ok(entries) => entries
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(decl) => Some(decl),
                Err(e) => {
                    debug!("{}", e);
                    None
                }
            })
            .collect(),
        Err(e) => {
            warn!("{}", e);
            Vec::new()
        }
    }
}
