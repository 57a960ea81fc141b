use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::models::Ecosystem;

pub const DEFAULT_OUTPUT: &str = "tech_due_diligence_report.md";

#[derive(Parser, Debug)]
#[command(
    name = "dep-diligence",
    about = "Inventory open source dependencies, their licenses and known vulnerabilities",
    version
)]
pub struct Cli {
    /// Project folder to analyze; prompted for when omitted
    pub path: Option<PathBuf>,

    /// Config file [default: ./.dep-diligence/config.toml, fallback ~/.config/dep-diligence/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report output path
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Report format
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: ReportFormat,

    /// Exclude an ecosystem from scanning (repeatable)
    #[arg(long = "exclude-lang", value_name = "LANG")]
    pub exclude_lang: Vec<EcosystemArg>,

    /// Maximum number of dependencies looked up at once
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Attempts per request before giving up
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Debug logging and a table of every dependency
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print the summary line
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Command-line overrides take precedence over the config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.network.concurrency = concurrency;
        }
        if let Some(max_retries) = self.max_retries {
            config.network.max_retries = max_retries;
        }
    }

    pub fn excluded(&self) -> Vec<Ecosystem> {
        self.exclude_lang.iter().map(Into::into).collect()
    }

    /// Default tracing filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Markdown,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EcosystemArg {
    #[value(alias = "pip")]
    Python,
    #[value(alias = "npm")]
    Node,
    #[value(alias = "nuget")]
    Dotnet,
    #[value(alias = "gem")]
    Ruby,
    #[value(alias = "composer")]
    Php,
    #[value(alias = "cargo")]
    Rust,
}

impl From<&EcosystemArg> for Ecosystem {
    fn from(arg: &EcosystemArg) -> Self {
        match arg {
            EcosystemArg::Python => Ecosystem::Pip,
            EcosystemArg::Node => Ecosystem::Npm,
            EcosystemArg::Dotnet => Ecosystem::NuGet,
            EcosystemArg::Ruby => Ecosystem::Gem,
            EcosystemArg::Php => Ecosystem::Composer,
            EcosystemArg::Rust => Ecosystem::Cargo,
        }
    }
}
