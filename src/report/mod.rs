//! Report renderers for scan results.
//!
//! - [`markdown`] — the due diligence report file: per-package details,
//!   vulnerability status, license summary table and compatibility findings.
//! - [`terminal`] — colored summary box and attention table; respects `--verbose` / `--quiet`.

pub mod markdown;
pub mod terminal;
