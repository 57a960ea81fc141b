use serde_json::Value;

use crate::error::FetchError;
use crate::fetch::FetchClient;
use crate::models::{DependencyDeclaration, PackageInfo};

use super::{date, segment, text};

pub fn metadata_url(base: &str, decl: &DependencyDeclaration) -> String {
    format!("{}/api/v1/crates/{}", base, segment(&decl.name))
}

/// Fetch crate metadata from crates.io. The crate endpoint lists every
/// published version, so one request covers pinned and unpinned lookups.
pub async fn fetch(
    client: &FetchClient,
    base: &str,
    decl: &DependencyDeclaration,
) -> Result<PackageInfo, FetchError> {
    let data = client.get_json(&metadata_url(base, decl)).await?;
    Ok(to_package_info(decl, &data))
}

pub fn to_package_info(decl: &DependencyDeclaration, data: &Value) -> PackageInfo {
    let krate = data.get("crate").unwrap_or(&Value::Null);
    let wanted = decl
        .exact_version()
        .map(str::to_string)
        .or_else(|| text(krate, "/max_stable_version"))
        .or_else(|| text(krate, "/newest_version"));

    let version = data
        .get("versions")
        .and_then(Value::as_array)
        .and_then(|versions| {
            versions
                .iter()
                .find(|v| text(v, "/num") == wanted)
                .or_else(|| versions.first())
        })
        .unwrap_or(&Value::Null);

    PackageInfo {
        name: text(krate, "/name").unwrap_or_else(|| decl.name.clone()),
        description: text(krate, "/description"),
        author: text(version, "/published_by/name")
            .or_else(|| text(version, "/published_by/login")),
        license: text(version, "/license"),
        project_url: text(krate, "/homepage").or_else(|| text(krate, "/repository")),
        release_date: date(version, "/created_at"),
        ..PackageInfo::empty(decl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ecosystem;
    use chrono::NaiveDate;
    use serde_json::json;

    fn decl(version: &str) -> DependencyDeclaration {
        DependencyDeclaration::new(Ecosystem::Cargo, "serde", Some(version.to_string()))
    }

    fn metadata() -> Value {
        json!({
            "crate": {
                "name": "serde",
                "description": "A generic serialization/deserialization framework",
                "homepage": "https://serde.rs",
                "repository": "https://github.com/serde-rs/serde",
                "max_stable_version": "1.0.197",
                "newest_version": "1.0.197"
            },
            "versions": [
                {"num": "1.0.197", "license": "MIT OR Apache-2.0",
                 "created_at": "2024-02-20T04:23:57.081934Z",
                 "published_by": {"login": "dtolnay", "name": "David Tolnay"}},
                {"num": "1.0.100", "license": "MIT/Apache-2.0",
                 "created_at": "2019-09-04T01:18:29.000000Z", "published_by": null}
            ]
        })
    }

    #[test]
    fn test_metadata_url() {
        assert_eq!(
            metadata_url("https://crates.io", &decl("1")),
            "https://crates.io/api/v1/crates/serde"
        );
    }

    #[test]
    fn test_requirement_uses_max_stable() {
        let info = to_package_info(&decl("1.0"), &metadata());
        assert_eq!(info.author.as_deref(), Some("David Tolnay"));
        assert_eq!(info.license.as_deref(), Some("MIT OR Apache-2.0"));
        assert_eq!(info.project_url.as_deref(), Some("https://serde.rs"));
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2024, 2, 20));
    }

    #[test]
    fn test_pinned_version() {
        let info = to_package_info(&decl("=1.0.100"), &metadata());
        assert_eq!(info.license.as_deref(), Some("MIT/Apache-2.0"));
        assert_eq!(info.author, None);
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2019, 9, 4));
    }
}
