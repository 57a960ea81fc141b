use serde_json::{Map, Value};

use crate::error::{FetchError, FetchErrorKind};
use crate::fetch::FetchClient;
use crate::models::{DependencyDeclaration, PackageInfo};

use super::{date, non_blank, segment, text};

const UNSET: &str = "__unset";

/// `vendor/package` names map onto two path segments. Anything else cannot
/// exist on Packagist.
pub fn metadata_url(base: &str, decl: &DependencyDeclaration) -> Option<String> {
    let (vendor, package) = decl.name.split_once('/')?;
    if vendor.is_empty() || package.is_empty() || package.contains('/') {
        return None;
    }
    Some(format!(
        "{}/p2/{}/{}.json",
        base,
        segment(&vendor.to_lowercase()),
        segment(&package.to_lowercase())
    ))
}

/// Fetch package metadata from the Packagist v2 metadata API.
pub async fn fetch(
    client: &FetchClient,
    base: &str,
    decl: &DependencyDeclaration,
) -> Result<PackageInfo, FetchError> {
    let url = metadata_url(base, decl).ok_or_else(|| FetchError::new(FetchErrorKind::NotFound))?;
    let data = client.get_json(&url).await?;
    Ok(to_package_info(decl, &data))
}

/// The first listed version is the newest; the pinned one wins when present.
pub fn to_package_info(decl: &DependencyDeclaration, data: &Value) -> PackageInfo {
    let listed = data
        .get("packages")
        .and_then(|p| p.get(decl.name.to_lowercase()))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let versions = if data.get("minified").is_some() {
        expand(listed)
    } else {
        listed.to_vec()
    };

    let pinned = decl.exact_version().and_then(|pinned| {
        versions.iter().find(|v| {
            text(v, "/version").is_some_and(|ver| ver.trim_start_matches('v') == pinned)
        })
    });
    let release = pinned.or_else(|| versions.first()).unwrap_or(&Value::Null);

    let authors: Vec<String> = release
        .get("authors")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(|a| text(a, "/name")).collect())
        .unwrap_or_default();
    let licenses: Vec<String> = release
        .get("license")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(non_blank).collect())
        .unwrap_or_default();

    PackageInfo {
        name: text(release, "/name").unwrap_or_else(|| decl.name.clone()),
        description: text(release, "/description"),
        author: (!authors.is_empty()).then(|| authors.join(", ")),
        license: (!licenses.is_empty()).then(|| licenses.join(" OR ")),
        project_url: text(release, "/homepage").or_else(|| text(release, "/source/url")),
        release_date: date(release, "/time"),
        ..PackageInfo::empty(decl)
    }
}

/// Undo `composer/2.0` minification: each entry only lists the keys that
/// differ from the entry before it, and `"__unset"` removes a key.
pub fn expand(minified: &[Value]) -> Vec<Value> {
    let mut expanded = Vec::with_capacity(minified.len());
    let mut current = Map::new();
    for entry in minified {
        let Some(changes) = entry.as_object() else {
            continue;
        };
        for (key, value) in changes {
            if value.as_str() == Some(UNSET) {
                current.remove(key);
            } else {
                current.insert(key.clone(), value.clone());
            }
        }
        expanded.push(Value::Object(current.clone()));
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ecosystem;
    use chrono::NaiveDate;
    use serde_json::json;

    fn decl(name: &str, version: Option<&str>) -> DependencyDeclaration {
        DependencyDeclaration::new(Ecosystem::Composer, name, version.map(str::to_string))
    }

    fn metadata() -> Value {
        json!({"minified": "composer/2.0", "packages": {"monolog/monolog": [
            {
                "name": "monolog/monolog",
                "version": "3.5.0",
                "description": "Sends your logs to files, sockets, inboxes, databases and various web services",
                "homepage": "https://github.com/Seldaek/monolog",
                "license": ["MIT"],
                "authors": [{"name": "Jordi Boggiano", "email": "j.boggiano@seld.be"}],
                "time": "2023-10-27T15:32:31+00:00"
            },
            {"version": "3.4.0", "time": "2023-06-21T08:46:11+00:00"},
            {"version": "1.0.0", "time": "2011-02-24T08:21:48+00:00",
             "homepage": "__unset", "authors": [{"name": "Jordi Boggiano"}, {"name": "Tom Dev"}]}
        ]}})
    }

    #[test]
    fn test_metadata_url() {
        assert_eq!(
            metadata_url("https://repo.packagist.org", &decl("Monolog/Monolog", None)).as_deref(),
            Some("https://repo.packagist.org/p2/monolog/monolog.json")
        );
        assert_eq!(metadata_url("https://repo.packagist.org", &decl("monolog", None)), None);
    }

    #[test]
    fn test_newest_release() {
        let info = to_package_info(&decl("monolog/monolog", Some("^3.0")), &metadata());
        assert_eq!(info.author.as_deref(), Some("Jordi Boggiano"));
        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.project_url.as_deref(), Some("https://github.com/Seldaek/monolog"));
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2023, 10, 27));
    }

    #[test]
    fn test_pinned_release() {
        let info = to_package_info(&decl("monolog/monolog", Some("3.4.0")), &metadata());
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2023, 6, 21));
        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.author.as_deref(), Some("Jordi Boggiano"));
        assert!(info.description.is_some());
        assert_eq!(info.project_url.as_deref(), Some("https://github.com/Seldaek/monolog"));
    }

    #[test]
    fn test_unset_keys_are_dropped() {
        let info = to_package_info(&decl("monolog/monolog", Some("1.0.0")), &metadata());
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2011, 2, 24));
        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.author.as_deref(), Some("Jordi Boggiano, Tom Dev"));
        assert_eq!(info.project_url, None);
    }

    #[test]
    fn test_expanded_entries_are_independent() {
        let data = metadata();
        let expanded = expand(data["packages"]["monolog/monolog"].as_array().unwrap());
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0]["version"], "3.5.0");
        assert_eq!(expanded[1]["license"], json!(["MIT"]));
        assert!(expanded[2].get("homepage").is_none());
        assert!(expanded[1].get("homepage").is_some());
    }
}
