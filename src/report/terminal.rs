use std::collections::HashMap;
use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::models::{
    Compatibility, DependencyDeclaration, LicenseFamily, PackageInfo, ScanReport,
    VulnerabilityStatus,
};
use crate::scan::license_name;

use super::markdown::vulnerability_label;

type Row<'a> = (&'a DependencyDeclaration, &'a PackageInfo, &'a VulnerabilityStatus);

/// Print a colored summary of `report` after the Markdown file was written.
pub fn render(report: &ScanReport, path: &Path, output: &Path, verbose: bool, quiet: bool) {
    let total = report.declarations.len();
    let unresolved = report.package_infos.iter().filter(|i| i.resolve_error.is_some()).count();
    let vulnerable = report
        .vuln_statuses
        .iter()
        .filter(|v| v.has_known_vulnerabilities)
        .count();
    let unchecked = report.vuln_statuses.iter().filter(|v| v.query_error.is_some()).count();
    let verdict = colored_verdict(report.license_verdict.overall);

    if quiet {
        println!(
            "Total: {}  Vulnerable: {}  Unchecked: {}  Unresolved: {}  Licenses: {}",
            total,
            vulnerable.to_string().red(),
            unchecked.to_string().yellow(),
            unresolved.to_string().yellow(),
            verdict,
        );
        return;
    }

    println!("\n {} v{}", env!("CARGO_PKG_NAME").bold(), env!("CARGO_PKG_VERSION"));
    println!(" Scanned: {}\n", path.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<49} │", "SUMMARY".bold());
    println!(" │  {:<49} │", format!("Dependencies      : {:>4}", total));
    println!(
        " │  {:<49} │",
        format!("{}  Vulnerable     : {:>4}", "✗".red(), vulnerable)
    );
    println!(
        " │  {:<49} │",
        format!("{}  Unchecked      : {:>4}", "?".yellow(), unchecked)
    );
    println!(
        " │  {:<49} │",
        format!("{}  Unresolved     : {:>4}", "⚠".yellow(), unresolved)
    );
    println!(" │  {:<49} │", format!("Licenses          : {}", summarize_licenses(report)));
    println!(" └────────────────────────────────────────────────────┘");
    println!(" License compatibility: {}\n", verdict);

    let flagged: Vec<Row> = report.rows().filter(|row| needs_attention(report, row)).collect();
    if !flagged.is_empty() {
        println!(" {} Dependencies requiring attention:\n", "[ATTENTION]".red().bold());
        render_table(report, &flagged);
        println!();
    }

    if verbose && !report.declarations.is_empty() {
        println!(" {} All dependencies:\n", "[ALL]".cyan().bold());
        let all: Vec<Row> = report.rows().collect();
        render_table(report, &all);
        println!();
    }

    println!(" Report written to {}\n", output.display().to_string().bold());
}

fn colored_verdict(verdict: Compatibility) -> ColoredString {
    match verdict {
        Compatibility::Compatible => verdict.to_string().green(),
        Compatibility::Unknown => verdict.to_string().yellow(),
        Compatibility::Incompatible => verdict.to_string().red().bold(),
    }
}

fn family(report: &ScanReport, info: &PackageInfo) -> LicenseFamily {
    let license = license_name(info);
    report
        .license_verdict
        .families
        .get(license)
        .copied()
        .unwrap_or(LicenseFamily::Unknown)
}

/// Vulnerable, unchecked, unresolved, or under a strong-copyleft or unknown license.
fn needs_attention(report: &ScanReport, (_, info, vulns): &Row) -> bool {
    vulns.has_known_vulnerabilities
        || vulns.query_error.is_some()
        || info.resolve_error.is_some()
        || matches!(
            family(report, info),
            LicenseFamily::StrongCopyleft | LicenseFamily::Unknown
        )
}

fn render_table(report: &ScanReport, rows: &[Row]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("Ecosystem").add_attribute(Attribute::Bold),
            Cell::new("License").add_attribute(Attribute::Bold),
            Cell::new("Family").add_attribute(Attribute::Bold),
            Cell::new("Vulnerabilities").add_attribute(Attribute::Bold),
        ]);

    for (decl, info, vulns) in rows {
        let family = family(report, info);
        let family_color = match family {
            LicenseFamily::Permissive => Color::Green,
            LicenseFamily::WeakCopyleft => Color::Yellow,
            LicenseFamily::StrongCopyleft => Color::Red,
            LicenseFamily::Unknown => Color::DarkGrey,
        };
        let vuln_color = if vulns.has_known_vulnerabilities {
            Color::Red
        } else if vulns.query_error.is_some() {
            Color::Yellow
        } else {
            Color::Green
        };
        let license = match &info.resolve_error {
            Some(e) => format!("unavailable ({})", e),
            None => license_name(info).to_string(),
        };

        table.add_row(vec![
            Cell::new(&decl.name),
            Cell::new(decl.declared_version.as_deref().unwrap_or("*")),
            Cell::new(decl.ecosystem.to_string()),
            Cell::new(license),
            Cell::new(family.to_string()).fg(family_color),
            Cell::new(vulnerability_label(vulns)).fg(vuln_color),
        ]);
    }

    println!("{table}");
}

/// The three most common licenses with their counts, e.g. `MIT (12), Apache-2.0 (4)`.
fn summarize_licenses(report: &ScanReport) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for info in &report.package_infos {
        *counts.entry(license_name(info)).or_insert(0) += 1;
    }

    let mut pairs: Vec<(&str, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    pairs
        .iter()
        .take(3)
        .map(|(lic, cnt)| format!("{} ({})", lic, cnt))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::assess;
    use crate::models::Ecosystem;
    use crate::scan::license_set;

    fn report(licenses: &[Option<&str>]) -> ScanReport {
        let declarations: Vec<DependencyDeclaration> = licenses
            .iter()
            .enumerate()
            .map(|(i, _)| DependencyDeclaration::new(Ecosystem::Npm, format!("pkg-{}", i), None))
            .collect();
        let package_infos: Vec<PackageInfo> = declarations
            .iter()
            .zip(licenses)
            .map(|(decl, license)| PackageInfo {
                license: license.map(str::to_string),
                ..PackageInfo::empty(decl)
            })
            .collect();
        ScanReport {
            license_verdict: assess(&license_set(&package_infos)),
            vuln_statuses: declarations
                .iter()
                .map(|_| VulnerabilityStatus::from_advisories(Vec::new(), true))
                .collect(),
            declarations,
            package_infos,
        }
    }

    #[test]
    fn test_summarize_licenses_orders_by_count() {
        let report = report(&[Some("MIT"), Some("ISC"), Some("MIT"), None, Some("Apache-2.0")]);
        assert_eq!(summarize_licenses(&report), "MIT (2), Apache-2.0 (1), ISC (1)");
    }

    #[test]
    fn test_needs_attention() {
        let report = report(&[Some("MIT"), Some("GPL-3.0-only"), None]);
        let flagged: Vec<&str> = report
            .rows()
            .filter(|row| needs_attention(&report, row))
            .map(|(d, _, _)| d.name.as_str())
            .collect();
        assert_eq!(flagged, vec!["pkg-1", "pkg-2"]);
    }
}
