use paylens_core::{load_overview, Store};

use crate::error::CliError;

use super::CommandResult;

pub fn run(store: &Store) -> Result<CommandResult, CliError> {
    let overview = load_overview(store)?;

    let mut result = CommandResult::ok(serde_json::to_value(&overview)?);
    if !overview.unmatched_states.is_empty() {
        result = result.with_warning(format!(
            "states without a map region: {}",
            overview.unmatched_states.join(", ")
        ));
    }
    Ok(result)
}
