//! Async clients for package metadata on the public registries.
//!
//! Each module builds its registry URL, fetches through the shared
//! [`FetchClient`], and maps the response with a `to_package_info` function
//! that is total over missing or oddly typed fields. Failures never escape:
//! [`Registry::fetch_package_info`] turns them into an unresolved
//! [`PackageInfo`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RegistryEndpoints;
use crate::error::FetchError;
use crate::fetch::FetchClient;
use crate::models::{DependencyDeclaration, Ecosystem, PackageInfo};

pub mod crates_io;
pub mod npm;
pub mod nuget;
pub mod packagist;
pub mod pypi;
pub mod rubygems;

#[derive(Debug, Clone)]
pub struct Registry {
    client: FetchClient,
    endpoints: RegistryEndpoints,
}

impl Registry {
    pub fn new(client: FetchClient, endpoints: RegistryEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Look up `decl` on its ecosystem's registry. Always returns a record.
    pub async fn fetch_package_info(&self, decl: &DependencyDeclaration) -> PackageInfo {
        debug!("Fetching {} info for {}", decl.ecosystem.registry_name(), decl.name);

        let result = match decl.ecosystem {
            Ecosystem::Pip => pypi::fetch(&self.client, &self.endpoints.pypi, decl).await,
            Ecosystem::Npm => npm::fetch(&self.client, &self.endpoints.npm, decl).await,
            Ecosystem::NuGet => nuget::fetch(&self.client, &self.endpoints.nuget, decl).await,
            Ecosystem::Gem => rubygems::fetch(&self.client, &self.endpoints.rubygems, decl).await,
            Ecosystem::Composer => {
                packagist::fetch(&self.client, &self.endpoints.packagist, decl).await
            }
            Ecosystem::Cargo => {
                crates_io::fetch(&self.client, &self.endpoints.crates_io, decl).await
            }
        };

        result.unwrap_or_else(|e: FetchError| {
            warn!(
                "Could not resolve {} package {}: {}",
                decl.ecosystem, decl.name, e
            );
            PackageInfo::unresolved(decl, e)
        })
    }
}

/// Percent-encode one URL path segment.
pub(crate) fn segment(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

/// A non-blank string at `pointer` (RFC 6901), trimmed.
pub(crate) fn text(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(non_blank)
}

pub(crate) fn non_blank(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse the timestamp shapes the registries use into a calendar date:
/// RFC 3339 (`2023-01-05T10:00:00.000Z`), naive (`2022-06-29T15:34:24`), or
/// a bare date.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

pub(crate) fn date(value: &Value, pointer: &str) -> Option<NaiveDate> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .and_then(parse_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use crate::fetch::RetryPolicy;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(2022, 6, 29);
        assert_eq!(parse_date("2022-06-29T15:34:24"), expected);
        assert_eq!(parse_date("2022-06-29T15:34:24.123456Z"), expected);
        assert_eq!(parse_date("2022-06-29T15:34:24+02:00"), expected);
        assert_eq!(parse_date("2022-06-29"), expected);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_text_ignores_blank_and_non_strings() {
        let v = serde_json::json!({"a": "  ", "b": 3, "c": " x "});
        assert_eq!(text(&v, "/a"), None);
        assert_eq!(text(&v, "/b"), None);
        assert_eq!(text(&v, "/c"), Some("x".to_string()));
        assert_eq!(text(&v, "/missing"), None);
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("@types/node"), "%40types%2Fnode");
        assert_eq!(segment("requests"), "requests");
    }

    #[tokio::test]
    async fn test_failure_becomes_unresolved_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = FetchClient::with_client(
            reqwest::Client::new(),
            RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            },
        );
        let registry = Registry::new(client, RegistryEndpoints::all(&server.uri()));

        for ecosystem in Ecosystem::ALL {
            let decl = DependencyDeclaration::new(ecosystem, "ghost-package", None);
            let info = registry.fetch_package_info(&decl).await;
            assert_eq!(info.name, "ghost-package");
            assert_eq!(info.ecosystem, ecosystem);
            assert_eq!(info.resolve_error.map(|e| e.kind), Some(FetchErrorKind::NotFound));
            assert_eq!(info.description, None);
            assert_eq!(info.license, None);
        }
    }
}
