//! Known-vulnerability lookup against the OSV database.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{FetchError, FetchErrorKind};
use crate::fetch::FetchClient;
use crate::models::{Ecosystem, VulnerabilityStatus};

/// OSV pages large result sets; packages with long histories rarely need
/// more than a couple of pages.
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    vulns: Vec<Vulnerability>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Vulnerability {
    id: String,
}

/// Query OSV for advisories affecting `name`.
///
/// With no exact `version` the query covers every release of the package and
/// the status is flagged `version_unpinned`. Failures are recorded in
/// `query_error`, never returned.
pub async fn check_vulnerabilities(
    client: &FetchClient,
    osv_base: &str,
    name: &str,
    ecosystem: Ecosystem,
    version: Option<&str>,
) -> VulnerabilityStatus {
    let unpinned = version.is_none();
    match query_all(client, osv_base, name, ecosystem, version).await {
        Ok(ids) => {
            debug!("{} advisories for {} {}", ids.len(), ecosystem, name);
            VulnerabilityStatus::from_advisories(ids, unpinned)
        }
        Err(e) => {
            warn!("Vulnerability query failed for {} {}: {}", ecosystem, name, e);
            VulnerabilityStatus::failed(e, unpinned)
        }
    }
}

async fn query_all(
    client: &FetchClient,
    osv_base: &str,
    name: &str,
    ecosystem: Ecosystem,
    version: Option<&str>,
) -> Result<Vec<String>, FetchError> {
    let url = format!("{}/v1/query", osv_base);
    let mut ids: Vec<String> = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let body = query_body(name, ecosystem, version, page_token.as_deref());
        let data = client.post_json(&url, &body).await?;
        let page: QueryResponse = serde_json::from_value(data).map_err(|e| {
            debug!("Unexpected OSV response shape: {}", e);
            FetchError::new(FetchErrorKind::InvalidResponse)
        })?;

        for vuln in page.vulns {
            if !ids.contains(&vuln.id) {
                ids.push(vuln.id);
            }
        }

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => page_token = Some(token),
            None => return Ok(ids),
        }
    }

    debug!("Stopped paging OSV results for {} after {} pages", name, MAX_PAGES);
    Ok(ids)
}

fn query_body(name: &str, ecosystem: Ecosystem, version: Option<&str>, page_token: Option<&str>) -> Value {
    let mut body = json!({
        "package": {"name": name, "ecosystem": ecosystem.osv_name()}
    });
    if let Some(version) = version {
        body["version"] = json!(version);
    }
    if let Some(token) = page_token {
        body["page_token"] = json!(token);
    }
    body
}
