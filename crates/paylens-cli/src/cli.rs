//! CLI argument definitions for paylens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cases` | List the case studies and their table bindings |
//! | `options` | Distinct year/quarter/state values of a case study's table |
//! | `analyze` | Filter a case study's table and compute every view |
//! | `overview` | Home-page totals, state map and top states |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--db` | `$PAYLENS_DB` or `~/.paylens/pulse.duckdb` | Store file |
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//!
//! # Examples
//!
//! ```bash
//! # Payment categories in Karnataka during 2023
//! paylens analyze --case market-expansion --year 2023 --state karnataka --pretty
//!
//! # Home page figures as a table
//! paylens overview --format table
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use paylens_core::aggregate::{CATEGORY_TOP_N, DEFAULT_HISTOGRAM_BINS};
use paylens_core::CaseStudy;

/// paylens - payment, insurance and user-registration analytics
#[derive(Debug, Parser)]
#[command(
    name = "paylens",
    author,
    version,
    about = "Slice and aggregate pre-aggregated payment statistics",
    long_about = "paylens reads a read-only DuckDB store of pre-aggregated payment, insurance \
and user-registration tables, filters one table by year, quarter and state, and computes \
grouped sums, rankings, correlations, trends and distributions.\n\
\n\
Use 'paylens <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Path to the DuckDB store. Overrides PAYLENS_DB.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List case studies with their table, category and metric columns.
    Cases,

    /// Show the year, quarter and state values a case study can be filtered by.
    ///
    /// # Examples
    ///
    ///   paylens options --case user-registration
    Options(OptionsArgs),

    /// Run the full filter and aggregation pipeline for one case study.
    ///
    /// Unset filters mean "All". The table and columns default to the case
    /// study's binding and can be overridden individually.
    ///
    /// # Examples
    ///
    ///   paylens analyze --case market-expansion
    ///   paylens analyze --case insurance-engagement --year 2022 --quarter 3
    ///   paylens analyze --case market-expansion --state goa --top 5 --bins 10
    Analyze(AnalyzeArgs),

    /// Totals across every table, the state map and the top-5 leaderboard.
    Overview,
}

/// Arguments for the `options` command.
#[derive(Debug, Args)]
pub struct OptionsArgs {
    /// Case study slug or title.
    #[arg(long = "case")]
    pub case: CaseStudy,
}

/// Arguments for the `analyze` command.
#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Case study slug or title.
    #[arg(long = "case")]
    pub case: CaseStudy,

    /// Keep only this year.
    #[arg(long)]
    pub year: Option<i64>,

    /// Keep only this quarter (1-4).
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=4))]
    pub quarter: Option<i64>,

    /// Keep only this state, matched exactly (e.g. `andhra-pradesh`).
    #[arg(long)]
    pub state: Option<String>,

    /// Table to read instead of the case study's table.
    #[arg(long)]
    pub table: Option<String>,

    /// Category column to group by.
    #[arg(long)]
    pub category: Option<String>,

    /// Count metric column.
    #[arg(long)]
    pub count_metric: Option<String>,

    /// Amount metric column.
    #[arg(long)]
    pub amount_metric: Option<String>,

    /// Length of the top-groups ranking.
    #[arg(long, default_value_t = CATEGORY_TOP_N)]
    pub top: usize,

    /// Bin count of the amount histogram.
    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    pub bins: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_parses_filters_and_overrides() {
        let cli = Cli::try_parse_from([
            "paylens",
            "analyze",
            "--case",
            "market-expansion",
            "--year",
            "2023",
            "--state",
            "goa",
            "--category",
            "district",
            "--db",
            "/tmp/pulse.duckdb",
        ])
        .expect("parse");

        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.case, CaseStudy::MarketExpansion);
        assert_eq!(args.year, Some(2023));
        assert_eq!(args.quarter, None);
        assert_eq!(args.state.as_deref(), Some("goa"));
        assert_eq!(args.category.as_deref(), Some("district"));
        assert_eq!(args.top, CATEGORY_TOP_N);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/pulse.duckdb")));
    }

    #[test]
    fn quarter_outside_range_is_rejected() {
        let result = Cli::try_parse_from([
            "paylens",
            "analyze",
            "--case",
            "market-expansion",
            "--quarter",
            "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_case_is_rejected() {
        let result = Cli::try_parse_from(["paylens", "options", "--case", "churn"]);
        assert!(result.is_err());
    }
}
