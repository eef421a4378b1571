use paylens_core::{load_table, FilterOptions, Store};
use serde::Serialize;

use crate::cli::OptionsArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct OptionsResponseData {
    case: &'static str,
    table: String,
    options: FilterOptions,
}

pub fn run(args: &OptionsArgs, store: &Store) -> Result<CommandResult, CliError> {
    let table = load_table(store, args.case.table())?;
    let options = FilterOptions::from_table(&table)?;

    let data = serde_json::to_value(OptionsResponseData {
        case: args.case.slug(),
        table: table.name().to_string(),
        options,
    })?;
    Ok(CommandResult::ok(data))
}
