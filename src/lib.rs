//! Dependency due diligence for polyglot projects.
//!
//! Finds dependency manifests (requirements.txt, package.json, .csproj,
//! Gemfile, composer.json, Cargo.toml), looks every declared package up on its
//! public registry and in the OSV vulnerability database, and judges whether
//! the licenses found can be combined.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use dep_diligence::{config::Config, detector::discover_manifests, scan::Scanner};
//!
//! let manifests = discover_manifests(std::path::Path::new("."))?;
//! let report = Scanner::new(&Config::default())?.run(&manifests).await;
//! println!("{}", dep_diligence::report::markdown::render(&report));
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod fetch;
pub mod license;
pub mod models;
pub mod registry;
pub mod report;
pub mod scan;
pub mod vulnerability;

pub use error::{ConfigError, FetchError, FetchErrorKind, ParseError};
pub use models::{
    Compatibility, DependencyDeclaration, Ecosystem, LicenseFamily, LicenseVerdict, Manifest,
    PackageInfo, ScanReport, VulnerabilityStatus,
};
pub use scan::Scanner;
