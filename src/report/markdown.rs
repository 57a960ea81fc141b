use std::collections::BTreeMap;

use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::{Cell, CellAlignment, Table};

use crate::models::{
    Compatibility, DependencyDeclaration, Ecosystem, LicenseFamily, PackageInfo, ScanReport,
    VulnerabilityStatus,
};
use crate::scan::{license_name, UNKNOWN_LICENSE};

const NOT_AVAILABLE: &str = "N/A";

/// Render the due diligence report as Markdown.
pub fn render(report: &ScanReport) -> String {
    let mut out = String::from("# Tech Due Diligence Report\n\n");
    dependencies_section(&mut out, report);
    vulnerabilities_section(&mut out, report);
    license_summary_section(&mut out, report);
    compatibility_section(&mut out, report);
    unknown_licenses_section(&mut out, report);
    out
}

fn dependencies_section(out: &mut String, report: &ScanReport) {
    out.push_str("## Open Source Dependencies\n\n");
    if report.declarations.is_empty() {
        out.push_str("No dependency manifests were found.\n\n");
        return;
    }

    for ecosystem in Ecosystem::ALL {
        let rows: Vec<_> = report.rows().filter(|(d, _, _)| d.ecosystem == ecosystem).collect();
        if rows.is_empty() {
            continue;
        }
        out.push_str(&format!("### {} Packages\n\n", ecosystem.osv_name()));
        for (decl, info, vulns) in rows {
            package_block(out, decl, info, vulns);
        }
    }
}

fn package_block(
    out: &mut String,
    decl: &DependencyDeclaration,
    info: &PackageInfo,
    vulns: &VulnerabilityStatus,
) {
    let field = |value: Option<&str>| match &info.resolve_error {
        Some(e) => format!("unavailable ({})", e),
        None => value.unwrap_or(NOT_AVAILABLE).to_string(),
    };
    let release_date = info.release_date.map(|d| d.format("%Y-%m-%d").to_string());

    out.push_str(&format!("#### {}\n\n", decl.name));
    out.push_str(&format!(
        "- Declared Version: {}\n",
        decl.declared_version.as_deref().unwrap_or("unspecified")
    ));
    out.push_str(&format!("- Description: {}\n", field(info.description.as_deref())));
    out.push_str(&format!("- Author: {}\n", field(info.author.as_deref())));
    out.push_str(&format!("- License: {}\n", license_name(info)));
    out.push_str(&format!("- Project URL: {}\n", field(info.project_url.as_deref())));
    out.push_str(&format!("- Release Date: {}\n", field(release_date.as_deref())));
    out.push_str(&format!("- Known Vulnerability: {}\n\n", vulnerability_label(vulns)));
}

/// "Yes", "No" or "Unknown"; a failed query is never reported as "No".
pub fn vulnerability_label(vulns: &VulnerabilityStatus) -> String {
    let label = match &vulns.query_error {
        Some(e) => format!("Unknown (query failed: {})", e),
        None if vulns.has_known_vulnerabilities => {
            format!("Yes ({}: {})", vulns.count, vulns.advisory_ids.join(", "))
        }
        None => "No".to_string(),
    };
    if vulns.version_unpinned && vulns.query_error.is_none() {
        format!("{} (checked across all versions, none pinned)", label)
    } else {
        label
    }
}

fn family_of(report: &ScanReport, license: &str) -> LicenseFamily {
    report
        .license_verdict
        .families
        .get(license)
        .copied()
        .unwrap_or(LicenseFamily::Unknown)
}

fn vulnerabilities_section(out: &mut String, report: &ScanReport) {
    out.push_str("## Vulnerabilities\n\n");

    let affected: Vec<_> = report
        .rows()
        .filter(|(_, _, v)| v.has_known_vulnerabilities)
        .collect();
    let unchecked: Vec<&str> = report
        .rows()
        .filter(|(_, _, v)| v.query_error.is_some())
        .map(|(d, _, _)| d.name.as_str())
        .collect();

    if affected.is_empty() {
        out.push_str("No known vulnerabilities were reported for the checked packages.\n\n");
    } else {
        for (decl, _, vulns) in &affected {
            out.push_str(&format!(
                "- {} ({}): {}\n",
                decl.name,
                decl.ecosystem,
                vulns.advisory_ids.join(", ")
            ));
        }
        out.push('\n');
    }

    if !unchecked.is_empty() {
        out.push_str(&format!(
            "The vulnerability status of {} package(s) is unknown because the query failed: {}\n\n",
            unchecked.len(),
            unchecked.join(", ")
        ));
    }
}

fn license_summary_section(out: &mut String, report: &ScanReport) {
    out.push_str("## License Summary\n\n");

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for info in &report.package_infos {
        *counts.entry(license_name(info)).or_default() += 1;
    }
    if counts.is_empty() {
        out.push_str("No packages to summarize.\n\n");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(ASCII_MARKDOWN)
        .set_header(vec!["License", "Family", "Packages"]);

    // Unknown goes last.
    let (unknown, known): (Vec<_>, Vec<_>) =
        counts.into_iter().partition(|(license, _)| *license == UNKNOWN_LICENSE);
    for (license, count) in known.into_iter().chain(unknown) {
        let family = family_of(report, license);
        table.add_row(vec![
            Cell::new(license),
            Cell::new(family),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }

    out.push_str(&table.to_string());
    out.push_str("\n\n");
}

fn compatibility_section(out: &mut String, report: &ScanReport) {
    let verdict = &report.license_verdict;
    out.push_str("## License Compatibility\n\n");
    out.push_str(&format!("Overall verdict: **{}**\n\n", verdict.overall));

    out.push_str("### Potential Incompatibilities\n\n");
    let incompatible: Vec<_> = verdict.pairs_with(Compatibility::Incompatible).collect();
    if incompatible.is_empty() {
        out.push_str("No potential license incompatibilities found.\n\n");
    }
    for pair in incompatible {
        out.push_str(&format!(
            "- {} may be incompatible with {}\n  Affected packages:\n",
            pair.first(),
            pair.second()
        ));
        for info in report.package_infos.iter().filter(|i| pair.contains(license_name(i))) {
            out.push_str(&format!("  - {} ({})\n", info.name, license_name(info)));
        }
        out.push('\n');
    }

    let undetermined: Vec<_> = verdict.pairs_with(Compatibility::Unknown).collect();
    if !undetermined.is_empty() {
        out.push_str("### Undetermined Compatibility\n\n");
        out.push_str("At least one license in each of these pairs could not be classified:\n\n");
        for pair in undetermined {
            out.push_str(&format!("- {}\n", pair));
        }
        out.push('\n');
    }
}

fn unknown_licenses_section(out: &mut String, report: &ScanReport) {
    let unknown: Vec<&PackageInfo> = report
        .package_infos
        .iter()
        .filter(|info| family_of(report, license_name(info)) == LicenseFamily::Unknown)
        .collect();
    if unknown.is_empty() {
        return;
    }

    out.push_str("### Packages with Unknown Licenses\n\n");
    out.push_str(
        "The following packages have unknown or unrecognized licenses and should be investigated further:\n\n",
    );
    for info in unknown {
        out.push_str(&format!(
            "- {} ({}): {}\n",
            info.name,
            info.ecosystem,
            info.project_url.as_deref().unwrap_or(NOT_AVAILABLE)
        ));
    }
    out.push('\n');
}
