use serde_json::Value;

use crate::error::FetchError;
use crate::fetch::FetchClient;
use crate::models::{DependencyDeclaration, PackageInfo};

use super::{date, non_blank, segment, text};

pub fn metadata_url(base: &str, decl: &DependencyDeclaration) -> String {
    format!("{}/api/v1/gems/{}.json", base, segment(&decl.name))
}

/// Fetch gem metadata from the RubyGems API. The endpoint always describes
/// the latest release.
pub async fn fetch(
    client: &FetchClient,
    base: &str,
    decl: &DependencyDeclaration,
) -> Result<PackageInfo, FetchError> {
    let data = client.get_json(&metadata_url(base, decl)).await?;
    Ok(to_package_info(decl, &data))
}

pub fn to_package_info(decl: &DependencyDeclaration, data: &Value) -> PackageInfo {
    let licenses: Vec<String> = data
        .get("licenses")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(non_blank).collect())
        .unwrap_or_default();

    PackageInfo {
        name: text(data, "/name").unwrap_or_else(|| decl.name.clone()),
        description: text(data, "/info"),
        author: text(data, "/authors"),
        // Multiple licenses on a gem mean the user may pick one.
        license: (!licenses.is_empty()).then(|| licenses.join(" OR ")),
        project_url: text(data, "/homepage_uri").or_else(|| text(data, "/project_uri")),
        release_date: date(data, "/version_created_at"),
        ..PackageInfo::empty(decl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ecosystem;
    use chrono::NaiveDate;
    use serde_json::json;

    fn decl() -> DependencyDeclaration {
        DependencyDeclaration::new(Ecosystem::Gem, "rails", Some("~> 7.0".to_string()))
    }

    #[test]
    fn test_metadata_url() {
        assert_eq!(
            metadata_url("https://rubygems.org", &decl()),
            "https://rubygems.org/api/v1/gems/rails.json"
        );
    }

    #[test]
    fn test_to_package_info() {
        let data = json!({
            "name": "rails",
            "info": "Ruby on Rails is a full-stack web framework.",
            "authors": "David Heinemeier Hansson",
            "licenses": ["MIT"],
            "homepage_uri": "https://rubyonrails.org",
            "project_uri": "https://rubygems.org/gems/rails",
            "version_created_at": "2024-01-04T18:55:54.114Z"
        });
        let info = to_package_info(&decl(), &data);
        assert_eq!(info.author.as_deref(), Some("David Heinemeier Hansson"));
        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.project_url.as_deref(), Some("https://rubyonrails.org"));
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2024, 1, 4));
    }

    #[test]
    fn test_several_licenses_are_alternatives() {
        let data = json!({"licenses": ["Ruby", "BSD-2-Clause"], "homepage_uri": null,
                          "project_uri": "https://rubygems.org/gems/json"});
        let info = to_package_info(&decl(), &data);
        assert_eq!(info.license.as_deref(), Some("Ruby OR BSD-2-Clause"));
        assert_eq!(info.project_url.as_deref(), Some("https://rubygems.org/gems/json"));
    }

    #[test]
    fn test_no_licenses() {
        let info = to_package_info(&decl(), &json!({"licenses": []}));
        assert_eq!(info.license, None);
        assert_eq!(info.name, "rails");
    }
}
