//! License string normalization, family classification and pairwise
//! compatibility.
//!
//! - [`spdx`] — maps canonical SPDX identifiers to [`LicenseFamily`](crate::models::LicenseFamily)
//!   and normalizes common non-SPDX strings.
//! - [`classifier`] — entry point that handles raw license strings including
//!   SPDX OR/AND expressions.
//! - [`compatibility`] — the pairwise rule and [`assess`] over a license set.

pub mod classifier;
pub mod compatibility;
pub mod spdx;

pub use compatibility::assess;
