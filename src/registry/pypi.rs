use serde_json::Value;

use crate::error::FetchError;
use crate::fetch::FetchClient;
use crate::license::spdx::normalize;
use crate::models::{DependencyDeclaration, PackageInfo};

use super::{date, non_blank, segment, text};

/// `info.license` sometimes holds the whole license text; past this length
/// the trove classifiers are the better source.
const MAX_LICENSE_NAME_LEN: usize = 100;

pub fn metadata_url(base: &str, decl: &DependencyDeclaration) -> String {
    match decl.exact_version() {
        Some(version) => format!("{}/pypi/{}/{}/json", base, segment(&decl.name), segment(version)),
        None => format!("{}/pypi/{}/json", base, segment(&decl.name)),
    }
}

/// Fetch package metadata from the PyPI JSON API.
pub async fn fetch(
    client: &FetchClient,
    base: &str,
    decl: &DependencyDeclaration,
) -> Result<PackageInfo, FetchError> {
    let data = client.get_json(&metadata_url(base, decl)).await?;
    Ok(to_package_info(decl, &data))
}

pub fn to_package_info(decl: &DependencyDeclaration, data: &Value) -> PackageInfo {
    let info = data.get("info").unwrap_or(&Value::Null);

    PackageInfo {
        name: text(info, "/name").unwrap_or_else(|| decl.name.clone()),
        description: text(info, "/summary"),
        author: text(info, "/author")
            .or_else(|| text(info, "/author_email"))
            .or_else(|| text(info, "/maintainer")),
        license: license(info),
        project_url: text(info, "/project_urls/Homepage")
            .or_else(|| text(info, "/home_page"))
            .or_else(|| text(info, "/project_url")),
        release_date: release_date(data, info),
        ..PackageInfo::empty(decl)
    }
}

fn license(info: &Value) -> Option<String> {
    text(info, "/license_expression")
        .or_else(|| {
            text(info, "/license")
                .filter(|l| l.len() <= MAX_LICENSE_NAME_LEN && !l.contains('\n'))
        })
        .or_else(|| {
            info.get("classifiers")?
                .as_array()?
                .iter()
                .filter_map(non_blank)
                .find(|c| c.starts_with("License ::"))
                .map(|c| normalize(&c))
        })
}

fn release_date(data: &Value, info: &Value) -> Option<chrono::NaiveDate> {
    // Files of the requested (or latest) release are listed under `urls`.
    date(data, "/urls/0/upload_time_iso_8601")
        .or_else(|| date(data, "/urls/0/upload_time"))
        .or_else(|| {
            let version = info.get("version")?.as_str()?;
            let files = data.get("releases")?.get(version)?;
            date(files, "/0/upload_time_iso_8601").or_else(|| date(files, "/0/upload_time"))
        })
}
