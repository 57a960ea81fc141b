//! Runs the registry and vulnerability lookups for every declaration and
//! gathers the results into a [`ScanReport`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::analyzer;
use crate::config::Config;
use crate::error::{ConfigError, FetchError, FetchErrorKind};
use crate::fetch::FetchClient;
use crate::license;
use crate::models::{DependencyDeclaration, Manifest, PackageInfo, ScanReport, VulnerabilityStatus};
use crate::registry::Registry;
use crate::vulnerability::check_vulnerabilities;

/// License name used for packages whose registry gave none.
pub const UNKNOWN_LICENSE: &str = "Unknown";

pub struct Scanner {
    registry: Registry,
    client: FetchClient,
    osv_base: String,
    concurrency: usize,
    task_timeout: Duration,
    progress: Option<ProgressBar>,
}

impl Scanner {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = FetchClient::new(&config.network)?;
        Ok(Self {
            registry: Registry::new(client.clone(), config.registries.clone()),
            client,
            osv_base: config.registries.osv.clone(),
            concurrency: config.network.concurrency,
            task_timeout: config.network.task_timeout(),
            progress: None,
        })
    }

    /// Advance `progress` by one for every declaration that settles.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn run(&self, manifests: &[Manifest]) -> ScanReport {
        let declarations = declarations(manifests);
        info!(
            "Looking up {} dependencies from {} manifests",
            declarations.len(),
            manifests.len()
        );
        if let Some(pb) = &self.progress {
            pb.set_length(declarations.len() as u64);
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let tasks: Vec<_> = declarations
            .iter()
            .cloned()
            .map(|decl| {
                let semaphore = Arc::clone(&semaphore);
                let registry = self.registry.clone();
                let client = self.client.clone();
                let osv_base = self.osv_base.clone();
                let progress = self.progress.clone();
                let limit = self.task_timeout;

                tokio::spawn(async move {
                    // The semaphore is never closed, so acquiring cannot fail.
                    let _permit = semaphore.acquire_owned().await.ok();
                    let result = lookup(&registry, &client, &osv_base, &decl, limit).await;
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    result
                })
            })
            .collect();

        let mut package_infos = Vec::with_capacity(declarations.len());
        let mut vuln_statuses = Vec::with_capacity(declarations.len());
        for (decl, joined) in declarations.iter().zip(join_all(tasks).await) {
            let (info, vulns) = settle(decl, joined);
            package_infos.push(info);
            vuln_statuses.push(vulns);
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        let licenses = license_set(&package_infos);
        ScanReport {
            license_verdict: license::assess(&licenses),
            declarations,
            package_infos,
            vuln_statuses,
        }
    }
}

/// Every declaration of `manifests`, grouped by ecosystem (pip first), then
/// manifests in path order and entries in file order.
pub fn declarations(manifests: &[Manifest]) -> Vec<DependencyDeclaration> {
    let mut ordered: Vec<&Manifest> = manifests.iter().collect();
    ordered.sort_by(|a, b| (a.ecosystem, &a.path).cmp(&(b.ecosystem, &b.path)));
    ordered
        .into_iter()
        .flat_map(|m| analyzer::parse(m.ecosystem, &m.content))
        .collect()
}

/// The license of `info`, or [`UNKNOWN_LICENSE`] when it is missing or is a
/// registry placeholder such as PyPI's `UNKNOWN`.
pub fn license_name(info: &PackageInfo) -> &str {
    match info.license.as_deref() {
        Some(license) if !license.eq_ignore_ascii_case(UNKNOWN_LICENSE) => license,
        _ => UNKNOWN_LICENSE,
    }
}

/// Distinct licenses across `infos`, named by [`license_name`].
pub fn license_set(infos: &[PackageInfo]) -> BTreeSet<String> {
    infos.iter().map(|info| license_name(info).to_string()).collect()
}

async fn lookup(
    registry: &Registry,
    client: &FetchClient,
    osv_base: &str,
    decl: &DependencyDeclaration,
    limit: Duration,
) -> (PackageInfo, VulnerabilityStatus) {
    let info = match timeout(limit, registry.fetch_package_info(decl)).await {
        Ok(info) => info,
        Err(_) => {
            warn!("Registry lookup for {} timed out after {:?}", decl.name, limit);
            PackageInfo::unresolved(decl, FetchError::new(FetchErrorKind::Timeout))
        }
    };

    let version = decl.exact_version();
    let query = check_vulnerabilities(client, osv_base, &decl.name, decl.ecosystem, version);
    let vulns = match timeout(limit, query).await {
        Ok(status) => status,
        Err(_) => {
            warn!("Vulnerability query for {} timed out after {:?}", decl.name, limit);
            VulnerabilityStatus::failed(FetchError::new(FetchErrorKind::Timeout), version.is_none())
        }
    };

    (info, vulns)
}

fn settle(
    decl: &DependencyDeclaration,
    joined: Result<(PackageInfo, VulnerabilityStatus), JoinError>,
) -> (PackageInfo, VulnerabilityStatus) {
    joined.unwrap_or_else(|e| {
        warn!("Lookup task for {} failed: {}", decl.name, e);
        let error = FetchError::new(FetchErrorKind::TaskFailed);
        (
            PackageInfo::unresolved(decl, error),
            VulnerabilityStatus::failed(error, decl.exact_version().is_none()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkConfig, RegistryEndpoints};
    use crate::detector::discover_manifests;
    use crate::models::{Compatibility, Ecosystem};
    use serde_json::json;
    use std::path::PathBuf;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> Config {
        Config {
            network: NetworkConfig {
                max_retries: 2,
                base_delay_ms: 1,
                max_delay_ms: 1,
                task_timeout_secs: 1,
                concurrency: 4,
                ..NetworkConfig::default()
            },
            registries: RegistryEndpoints::all(base),
        }
    }

    fn manifest(ecosystem: Ecosystem, path: &str, content: &str) -> Manifest {
        Manifest {
            ecosystem,
            path: PathBuf::from(path),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_declarations_group_by_ecosystem_then_path() {
        let manifests = vec![
            manifest(Ecosystem::Npm, "a/package.json", r#"{"dependencies":{"lodash":"^4"}}"#),
            manifest(Ecosystem::Pip, "z/requirements.txt", "flask==3.0.0\nrequests\n"),
            manifest(Ecosystem::Pip, "b/requirements.txt", "numpy\n"),
            manifest(Ecosystem::Cargo, "0/Cargo.toml", "[dependencies]\nserde = \"1\"\n"),
        ];
        let names: Vec<String> = declarations(&manifests).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["numpy", "flask", "requests", "lodash", "serde"]);
    }

    #[test]
    fn test_license_set_counts_missing_as_unknown() {
        let decl = DependencyDeclaration::new(Ecosystem::Pip, "a", None);
        let mut mit = PackageInfo::empty(&decl);
        mit.license = Some("MIT".to_string());
        let set = license_set(&[mit.clone(), PackageInfo::empty(&decl), mit]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["MIT", "Unknown"]);
    }

    #[test]
    fn test_placeholder_licenses_fold_into_unknown() {
        let decl = DependencyDeclaration::new(Ecosystem::Pip, "legacy", None);
        let infos: Vec<PackageInfo> = [Some("UNKNOWN"), Some("unknown"), None, Some("BSD-3-Clause")]
            .into_iter()
            .map(|license| PackageInfo {
                license: license.map(str::to_string),
                ..PackageInfo::empty(&decl)
            })
            .collect();

        let set = license_set(&infos);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["BSD-3-Clause", "Unknown"]);
        assert_eq!(license_name(&infos[0]), UNKNOWN_LICENSE);

        let verdict = license::assess(&license_set(&infos));
        assert_eq!(verdict.pairs.len(), 1);
    }

    #[tokio::test]
    async fn test_panicked_task_becomes_degraded_record() {
        let decl = DependencyDeclaration::new(Ecosystem::Gem, "rails", None);
        let joined: Result<(PackageInfo, VulnerabilityStatus), JoinError> =
            tokio::spawn(async { panic!("lookup exploded") }).await;
        let (info, vulns) = settle(&decl, joined);
        assert_eq!(info.resolve_error.map(|e| e.kind), Some(FetchErrorKind::TaskFailed));
        assert_eq!(vulns.query_error.map(|e| e.kind), Some(FetchErrorKind::TaskFailed));
        assert!(vulns.version_unpinned);
    }

    #[tokio::test]
    async fn test_every_declaration_gets_a_record_when_everything_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let manifests = vec![
            manifest(Ecosystem::Pip, "requirements.txt", "flask==3.0.0\nrequests>=2\nnumpy\n"),
            manifest(Ecosystem::Gem, "Gemfile", "gem 'rails', '~> 7.0'\ngem 'puma'\n"),
        ];
        let scanner = Scanner::new(&config(&server.uri())).unwrap();
        let report = scanner.run(&manifests).await;

        assert_eq!(report.declarations.len(), 5);
        assert_eq!(report.package_infos.len(), 5);
        assert_eq!(report.vuln_statuses.len(), 5);
        for (decl, info, vulns) in report.rows() {
            assert_eq!(info.name, decl.name);
            assert_eq!(info.resolve_error.map(|e| e.kind), Some(FetchErrorKind::ServerError));
            assert_eq!(vulns.query_error.map(|e| e.kind), Some(FetchErrorKind::ServerError));
            assert!(!vulns.has_known_vulnerabilities);
        }
        assert_eq!(report.license_verdict.overall, Compatibility::Unknown);
    }

    #[tokio::test]
    async fn test_slow_registry_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let manifests = vec![manifest(Ecosystem::Npm, "package.json", r#"{"dependencies":{"left-pad":"1.3.0"}}"#)];
        let report = Scanner::new(&config(&server.uri())).unwrap().run(&manifests).await;

        assert_eq!(
            report.package_infos[0].resolve_error.map(|e| e.kind),
            Some(FetchErrorKind::Timeout)
        );
        assert!(report.vuln_statuses[0].query_error.is_none());
    }

    #[tokio::test]
    async fn test_end_to_end_over_a_project_directory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pypi/requests/2.28.0/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "info": {
                    "name": "requests",
                    "summary": "Python HTTP for Humans.",
                    "author": "Kenneth Reitz",
                    "license": "Apache 2.0",
                    "version": "2.28.0"
                },
                "urls": [{"upload_time_iso_8601": "2022-06-09T14:44:46.126540Z"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lodash"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "lodash",
                "dist-tags": {"latest": "4.17.21"},
                "versions": {"4.17.21": {"license": "MIT"}},
                "time": {"4.17.21": "2021-02-20T15:42:16.891Z"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "requests==2.28.0\n").unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"lodash":"^4.17.21"}}"#,
        )
        .unwrap();

        let manifests = discover_manifests(dir.path()).unwrap();
        let report = Scanner::new(&config(&server.uri())).unwrap().run(&manifests).await;

        assert_eq!(report.package_infos.len(), 2);
        let ecosystems: Vec<Ecosystem> = report.package_infos.iter().map(|i| i.ecosystem).collect();
        assert_eq!(ecosystems, vec![Ecosystem::Pip, Ecosystem::Npm]);
        assert_eq!(report.package_infos[0].license.as_deref(), Some("Apache 2.0"));
        assert_eq!(report.package_infos[1].license.as_deref(), Some("MIT"));
        assert!(!report.vuln_statuses[0].version_unpinned);
        assert!(report.vuln_statuses[1].version_unpinned);
        assert!(report.license_verdict.licenses().len() <= 2);
        assert_eq!(report.license_verdict.overall, Compatibility::Compatible);
    }
}
