use serde_json::Value;

use crate::error::FetchError;
use crate::fetch::FetchClient;
use crate::models::{DependencyDeclaration, PackageInfo};

use super::{non_blank, parse_date, segment, text};

/// Full packument URL. Scoped packages need encoding: `@scope/pkg` → `%40scope%2Fpkg`.
pub fn metadata_url(base: &str, decl: &DependencyDeclaration) -> String {
    format!("{}/{}", base, segment(&decl.name))
}

/// Fetch package metadata from the npm registry.
pub async fn fetch(
    client: &FetchClient,
    base: &str,
    decl: &DependencyDeclaration,
) -> Result<PackageInfo, FetchError> {
    let data = client.get_json(&metadata_url(base, decl)).await?;
    Ok(to_package_info(decl, &data))
}

/// Describes the declared version when it is pinned and published, otherwise
/// `dist-tags.latest`.
pub fn to_package_info(decl: &DependencyDeclaration, data: &Value) -> PackageInfo {
    let versions = data.get("versions");
    let version = decl
        .exact_version()
        .filter(|v| versions.and_then(|vs| vs.get(*v)).is_some())
        .map(str::to_string)
        .or_else(|| text(data, "/dist-tags/latest"));
    let manifest = version
        .as_deref()
        .and_then(|v| versions.and_then(|vs| vs.get(v)))
        .unwrap_or(&Value::Null);

    PackageInfo {
        name: text(data, "/name").unwrap_or_else(|| decl.name.clone()),
        description: text(data, "/description").or_else(|| text(manifest, "/description")),
        author: person(data.get("author")).or_else(|| person(manifest.get("author"))),
        license: license(manifest.get("license")).or_else(|| license(data.get("license"))),
        project_url: text(data, "/homepage").or_else(|| text(manifest, "/homepage")),
        release_date: version.and_then(|v| {
            data.get("time")
                .and_then(|t| t.get(v.as_str()))
                .and_then(Value::as_str)
                .and_then(parse_date)
        }),
        ..PackageInfo::empty(decl)
    }
}

/// `"Jane <jane@x.io>"` or `{"name": "Jane", "email": ...}`.
fn person(value: Option<&Value>) -> Option<String> {
    let value = value?;
    non_blank(value).or_else(|| text(value, "/name"))
}

/// `"MIT"`, legacy `{"type": "MIT", "url": ...}`, or a legacy `licenses` array.
fn license(value: Option<&Value>) -> Option<String> {
    let value = value?;
    non_blank(value)
        .or_else(|| text(value, "/type"))
        .or_else(|| text(value, "/0/type"))
}
