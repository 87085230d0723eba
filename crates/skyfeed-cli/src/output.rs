use serde_json::Value;

use crate::error::CliError;

/// Write the command result as JSON on stdout. Logs go to stderr, so
/// stdout stays machine-parseable.
pub fn render(value: &Value, pretty: bool) -> Result<(), CliError> {
    let body = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{body}");
    Ok(())
}
