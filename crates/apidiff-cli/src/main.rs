//! apidiff - API compatibility diff CLI
//!
//! The `apidiff` command compares the public API of a package's library
//! modules against a baseline revision and fails when it finds breakage.
//!
//! ## Commands
//!
//! - `diagnose-api-breaking-changes`: compare against a baseline treeish

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use apidiff_core::{
    write_report_json, ApiDiffEngine, DiffOptions, ObservabilityScope, ToolConfig,
    DEFAULT_BUILD_TOOL, DEFAULT_DIGESTER,
};

#[derive(Parser)]
#[command(name = "apidiff")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect breaking changes to a package's public API", long_about = None)]
struct Cli {
    /// Root of the package to diagnose
    #[arg(long, global = true, env = "APIDIFF_PACKAGE_PATH", default_value = ".")]
    package_path: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Parallel jobs for builds, dumps and comparisons (default: available parallelism)
    #[arg(short, long, global = true, env = "APIDIFF_JOBS")]
    jobs: Option<usize>,

    /// Build tool executable
    #[arg(long, global = true, env = "APIDIFF_BUILD_TOOL", default_value = DEFAULT_BUILD_TOOL)]
    build_tool: String,

    /// API digester executable
    #[arg(long, global = true, env = "APIDIFF_DIGESTER", default_value = DEFAULT_DIGESTER)]
    digester: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose API-breaking changes to library modules against a baseline
    DiagnoseApiBreakingChanges(DiagnoseArgs),

    /// Former name of diagnose-api-breaking-changes
    #[command(hide = true)]
    ExperimentalApiDiff {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Args)]
struct DiagnoseArgs {
    /// Baseline revision (commit, branch or tag)
    treeish: String,

    /// Library products to diff
    #[arg(long, num_args = 1..)]
    products: Vec<String>,

    /// Library targets to diff
    #[arg(long, num_args = 1..)]
    targets: Vec<String>,

    /// Directory for baseline digests, kept across runs
    #[arg(long)]
    baseline_dir: Option<PathBuf>,

    /// File of breakage messages to ignore, one per line
    #[arg(long)]
    breakage_allowlist_path: Option<PathBuf>,

    /// Regenerate baseline digests even when they already exist
    #[arg(long)]
    regenerate_baseline: bool,

    /// Fail a module's comparison after this many seconds
    #[arg(long, value_name = "SECS")]
    comparison_timeout: Option<u64>,

    /// Write a JSON report to this path
    #[arg(long)]
    report_json: Option<PathBuf>,
}

impl DiagnoseArgs {
    fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            treeish: self.treeish.clone(),
            products: self.products.clone(),
            targets: self.targets.clone(),
            baseline_dir: self.baseline_dir.clone(),
            allowlist_path: self.breakage_allowlist_path.clone(),
            regenerate_baseline: self.regenerate_baseline,
        }
    }
}

impl Cli {
    fn tool_config(&self, comparison_timeout: Option<u64>) -> ToolConfig {
        let defaults = ToolConfig::default();
        ToolConfig {
            package_path: self.package_path.clone(),
            build_tool: self.build_tool.clone(),
            digester: self.digester.clone(),
            jobs: self.jobs.unwrap_or(defaults.jobs).max(1),
            comparison_timeout: comparison_timeout.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    apidiff_core::telemetry::init_tracing(cli.json, level);

    match &cli.command {
        Commands::DiagnoseApiBreakingChanges(args) => {
            let config = cli.tool_config(args.comparison_timeout);
            cmd_diagnose(&config, args).await
        }
        Commands::ExperimentalApiDiff { .. } => cmd_experimental_api_diff(),
    }
}

async fn cmd_diagnose(config: &ToolConfig, args: &DiagnoseArgs) -> Result<ExitCode> {
    let scope = Arc::new(ObservabilityScope::new());
    let engine = ApiDiffEngine::from_config(config, Arc::clone(&scope));

    let report = engine
        .run(&args.diff_options())
        .await
        .with_context(|| format!("failed to diagnose API breaking changes against '{}'", args.treeish))?;

    report
        .report
        .write_to(&mut std::io::stdout().lock())
        .context("write breakage report")?;

    if let Some(path) = &args.report_json {
        write_report_json(path, &report.artifact())?;
        info!(path = %path.display(), "wrote JSON report");
    }

    info!(
        passed = report.verdict.passed,
        errors = scope.errors_reported(),
        "{}",
        report.verdict.message
    );
    if run_succeeded(report.verdict.passed, scope.errors_reported()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

const RENAMED_NOTICE: &str =
    "apidiff experimental-api-diff has been renamed to apidiff diagnose-api-breaking-changes";

fn cmd_experimental_api_diff() -> Result<ExitCode> {
    println!("{RENAMED_NOTICE}");
    Ok(ExitCode::FAILURE)
}

/// Success only for a passing verdict with no error emitted along the way.
fn run_succeeded(passed: bool, errors_reported: bool) -> bool {
    passed && !errors_reported
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn diagnose(cli: &Cli) -> &DiagnoseArgs {
        match &cli.command {
            Commands::DiagnoseApiBreakingChanges(args) => args,
            Commands::ExperimentalApiDiff { .. } => panic!("expected diagnose command"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_minimal_diagnose() {
        let cli = parse(&["apidiff", "diagnose-api-breaking-changes", "main"]);
        let args = diagnose(&cli);
        assert_eq!(args.treeish, "main");
        assert!(args.products.is_empty());
        assert!(args.targets.is_empty());
        assert!(!args.regenerate_baseline);
        assert_eq!(cli.package_path, PathBuf::from("."));
    }

    #[test]
    fn test_parse_full_diagnose() {
        let cli = parse(&[
            "apidiff",
            "--package-path",
            "/src/pkg",
            "-j",
            "3",
            "diagnose-api-breaking-changes",
            "v1.2.0",
            "--products",
            "Foo",
            "Bar",
            "--targets",
            "Baz",
            "--baseline-dir",
            "/tmp/baselines",
            "--breakage-allowlist-path",
            "allow.txt",
            "--regenerate-baseline",
            "--comparison-timeout",
            "30",
            "--report-json",
            "report.json",
            "-v",
        ]);
        let args = diagnose(&cli);
        let options = args.diff_options();
        assert_eq!(options.treeish, "v1.2.0");
        assert_eq!(options.products, vec!["Foo", "Bar"]);
        assert_eq!(options.targets, vec!["Baz"]);
        assert_eq!(options.baseline_dir, Some(PathBuf::from("/tmp/baselines")));
        assert_eq!(options.allowlist_path, Some(PathBuf::from("allow.txt")));
        assert!(options.regenerate_baseline);
        assert_eq!(args.report_json, Some(PathBuf::from("report.json")));
        assert!(cli.verbose);

        let config = cli.tool_config(args.comparison_timeout);
        assert_eq!(config.package_path, PathBuf::from("/src/pkg"));
        assert_eq!(config.jobs, 3);
        assert_eq!(config.comparison_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_jobs_is_clamped() {
        let cli = parse(&["apidiff", "-j", "0", "diagnose-api-breaking-changes", "main"]);
        assert_eq!(cli.tool_config(None).jobs, 1);
    }

    #[test]
    fn test_treeish_is_required() {
        assert!(Cli::try_parse_from(["apidiff", "diagnose-api-breaking-changes"]).is_err());
    }

    #[test]
    fn test_experimental_command_is_hidden_and_fails() {
        let cli = parse(&["apidiff", "experimental-api-diff", "main", "--products", "Foo"]);
        assert!(matches!(cli.command, Commands::ExperimentalApiDiff { .. }));

        let help = Cli::command().render_help().to_string();
        assert!(!help.contains("experimental-api-diff"));
        assert!(help.contains("diagnose-api-breaking-changes"));

        assert!(cmd_experimental_api_diff().is_ok());
        assert!(RENAMED_NOTICE.ends_with("renamed to apidiff diagnose-api-breaking-changes"));
    }

    #[test]
    fn test_run_succeeded() {
        assert!(run_succeeded(true, false));
        assert!(!run_succeeded(false, false));
        assert!(!run_succeeded(true, true));
    }

    #[tokio::test]
    async fn test_diagnose_outside_a_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolConfig {
            package_path: dir.path().to_path_buf(),
            ..ToolConfig::default()
        };
        let cli = parse(&["apidiff", "diagnose-api-breaking-changes", "main"]);
        let err = cmd_diagnose(&config, diagnose(&cli)).await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to diagnose API breaking changes"));
    }
}
