mod analyze;
mod cases;
mod options;
mod overview;

use paylens_core::{Envelope, EnvelopeError, PipelineError, Store, StoreConfig};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A pipeline failure reported inside the envelope.
    pub fn failed(error: &PipelineError) -> Self {
        Self {
            data: Value::Null,
            warnings: Vec::new(),
            errors: vec![EnvelopeError::from(error)],
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

pub fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let mut metadata = Metadata::start();

    let outcome = match &cli.command {
        Command::Cases => cases::run(),
        Command::Options(args) => options::run(args, &open_store(cli)?),
        Command::Analyze(args) => analyze::run(args, &open_store(cli)?),
        Command::Overview => overview::run(&open_store(cli)?),
    };

    let CommandResult {
        data,
        warnings,
        errors,
    } = match outcome {
        Ok(result) => result,
        Err(CliError::Pipeline(error)) => {
            tracing::warn!(code = error.code(), %error, "command failed");
            CommandResult::failed(&error)
        }
        Err(error) => return Err(error),
    };

    for warning in warnings {
        metadata.push_warning(warning);
    }
    let meta = metadata.into_envelope_meta()?;

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

/// Open the store for a command that reads tables.
fn open_store(cli: &Cli) -> Result<Store, CliError> {
    let config = match &cli.db {
        Some(path) => StoreConfig::with_db_path(path.clone()),
        None => StoreConfig::default(),
    };
    Store::open(config).map_err(|error| CliError::Pipeline(PipelineError::from(error)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    fn seeded_db(sql: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempdir().expect("tempdir");
        let db_path = temp.path().join("pulse.duckdb");
        let seed = duckdb::Connection::open(&db_path).expect("seed connection");
        seed.execute_batch(sql).expect("seed");
        drop(seed);
        (temp, db_path)
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("paylens").chain(args.iter().copied()))
            .expect("parse")
    }

    const AGG_TRANS: &str = "CREATE TABLE agg_trans (
            \"Year\" INTEGER, \"Quarter\" INTEGER, \"State\" TEXT,
            \"Transaction_Type\" TEXT, \"Transaction_Count\" BIGINT, \"Transaction_Amount\" DOUBLE);
        INSERT INTO agg_trans VALUES
            (2023, 1, 'karnataka', 'Recharge', 100, 5000.0),
            (2023, 1, 'goa', 'Recharge', 50, 2000.0);";

    #[test]
    fn cases_need_no_store() {
        let cli = parse(&["cases", "--db", "/nonexistent/pulse.duckdb"]);
        let envelope = run(&cli).expect("cases");
        assert_eq!(envelope.data.as_array().map(Vec::len), Some(5));
        assert!(envelope.errors.is_empty());
    }

    #[test]
    fn missing_store_refuses_to_analyze() {
        let cli = parse(&[
            "analyze",
            "--case",
            "market-expansion",
            "--db",
            "/nonexistent/pulse.duckdb",
        ]);
        let error = run(&cli).expect_err("store is missing");
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn empty_slice_warns_without_failing() {
        let (_temp, db_path) = seeded_db(AGG_TRANS);
        let db = db_path.to_string_lossy().to_string();
        let cli = parse(&["analyze", "--case", "market-expansion", "--state", "delhi", "--db", &db]);

        let envelope = run(&cli).expect("analyze");
        assert!(envelope.errors.is_empty());
        assert_eq!(
            envelope.meta.warnings,
            vec!["no data available for the selected filters".to_string()]
        );
        assert_eq!(envelope.data["analysis"]["matched_rows"], 0);
        assert_eq!(
            envelope.data["analysis"]["aggregation"]["summary"]["mean_amount"],
            Value::Null
        );
    }

    #[test]
    fn schema_mismatch_lands_in_envelope_errors() {
        let (_temp, db_path) = seeded_db(AGG_TRANS);
        let db = db_path.to_string_lossy().to_string();
        let cli = parse(&["options", "--case", "user-registration", "--db", &db]);

        let envelope = run(&cli).expect("options");
        assert_eq!(envelope.errors.len(), 1);
        assert_eq!(envelope.errors[0].code, "unknown_table");
        assert_eq!(envelope.data, Value::Null);
    }
}
