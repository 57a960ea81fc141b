use chrono::Datelike;
use serde_json::Value;

use crate::error::FetchError;
use crate::fetch::FetchClient;
use crate::models::{DependencyDeclaration, PackageInfo};

use super::{date, segment, text};

pub fn metadata_url(base: &str, decl: &DependencyDeclaration) -> String {
    format!(
        "{}/v3/registration5-semver1/{}/index.json",
        base,
        segment(&decl.name.to_lowercase())
    )
}

/// Fetch package metadata from the NuGet registration API.
///
/// Packages with many versions do not inline their pages in the index; the
/// newest page is then fetched from its `@id`.
pub async fn fetch(
    client: &FetchClient,
    base: &str,
    decl: &DependencyDeclaration,
) -> Result<PackageInfo, FetchError> {
    let index = client.get_json(&metadata_url(base, decl)).await?;

    let last_page = index
        .get("items")
        .and_then(Value::as_array)
        .and_then(|pages| pages.last())
        .unwrap_or(&Value::Null);

    let fetched = match text(last_page, "/@id") {
        Some(page_url) if last_page.get("items").is_none() => {
            Some(client.get_json(&page_url).await?)
        }
        _ => None,
    };

    let entry = select_entry(&index, fetched.as_ref(), decl.exact_version());
    Ok(to_package_info(decl, entry.unwrap_or(&Value::Null)))
}

/// The catalog entry of the pinned version if listed, else the newest one.
pub fn select_entry<'a>(
    index: &'a Value,
    fetched_page: Option<&'a Value>,
    version: Option<&str>,
) -> Option<&'a Value> {
    let candidates: Vec<&Value> = index
        .get("items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .chain(fetched_page)
        .flat_map(leaves)
        .collect();

    let pinned = version.and_then(|v| {
        candidates
            .iter()
            .copied()
            .find(|entry| text(entry, "/version").is_some_and(|ev| ev.eq_ignore_ascii_case(v)))
    });
    pinned.or_else(|| candidates.last().copied())
}

fn leaves(page: &Value) -> impl Iterator<Item = &Value> {
    page.get("items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|leaf| leaf.get("catalogEntry"))
}

pub fn to_package_info(decl: &DependencyDeclaration, entry: &Value) -> PackageInfo {
    PackageInfo {
        name: text(entry, "/id").unwrap_or_else(|| decl.name.clone()),
        description: text(entry, "/description"),
        author: text(entry, "/authors"),
        license: text(entry, "/licenseExpression"),
        project_url: text(entry, "/projectUrl"),
        // Unlisted packages report a placeholder publish date in 1900.
        release_date: date(entry, "/published").filter(|d| d.year() > 1900),
        ..PackageInfo::empty(decl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RetryPolicy;
    use crate::models::Ecosystem;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn decl(version: Option<&str>) -> DependencyDeclaration {
        DependencyDeclaration::new(Ecosystem::NuGet, "Newtonsoft.Json", version.map(str::to_string))
    }

    fn catalog(version: &str, published: &str) -> Value {
        json!({
            "catalogEntry": {
                "id": "Newtonsoft.Json",
                "version": version,
                "description": "Json.NET is a popular high-performance JSON framework for .NET",
                "authors": "James Newton-King",
                "licenseExpression": "MIT",
                "projectUrl": "https://www.newtonsoft.com/json",
                "published": published
            }
        })
    }

    #[test]
    fn test_metadata_url_lowercases() {
        assert_eq!(
            metadata_url("https://api.nuget.org", &decl(None)),
            "https://api.nuget.org/v3/registration5-semver1/newtonsoft.json/index.json"
        );
    }

    #[test]
    fn test_newest_entry_is_used() {
        let index = json!({"items": [{"items": [
            catalog("13.0.1", "2021-03-22T20:10:49.817+00:00"),
            catalog("13.0.3", "2023-03-08T07:42:54.647+00:00")
        ]}]});
        let entry = select_entry(&index, None, None).unwrap();
        let info = to_package_info(&decl(None), entry);
        assert_eq!(info.name, "Newtonsoft.Json");
        assert_eq!(info.author.as_deref(), Some("James Newton-King"));
        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2023, 3, 8));
    }

    #[test]
    fn test_pinned_entry_is_used() {
        let index = json!({"items": [{"items": [
            catalog("13.0.1", "2021-03-22T20:10:49.817+00:00"),
            catalog("13.0.3", "2023-03-08T07:42:54.647+00:00")
        ]}]});
        let entry = select_entry(&index, None, Some("13.0.1")).unwrap();
        assert_eq!(entry["version"], "13.0.1");
    }

    #[test]
    fn test_unlisted_publish_date_is_dropped() {
        let entry = catalog("1.0.0", "1900-01-01T00:00:00+00:00");
        let info = to_package_info(&decl(None), &entry["catalogEntry"]);
        assert_eq!(info.release_date, None);
    }

    #[tokio::test]
    async fn test_fetches_page_that_is_not_inlined() {
        let server = MockServer::start().await;
        let page_url = format!("{}/v3/registration5-semver1/newtonsoft.json/page/13.0.3.json", server.uri());

        Mock::given(method("GET"))
            .and(path("/v3/registration5-semver1/newtonsoft.json/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"@id": page_url, "lower": "1.0.0", "upper": "13.0.3"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/registration5-semver1/newtonsoft.json/page/13.0.3.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [catalog("13.0.3", "2023-03-08T07:42:54.647+00:00")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FetchClient::with_client(
            reqwest::Client::new(),
            RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            },
        );
        let info = fetch(&client, &server.uri(), &decl(None)).await.unwrap();
        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2023, 3, 8));
    }
}
