//! Files and values read from the command line.

use std::path::Path;

use evalflow_core::config::{self, EvaluationConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CliError, CliResult};

/// One entry of a batch input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponsePair {
    pub query: String,
    pub response: String,
}

/// Reads a JSON array of `{query, response}` objects.
pub fn load_pairs(path: impl AsRef<Path>) -> CliResult<Vec<QueryResponsePair>> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let pairs: Vec<QueryResponsePair> = serde_json::from_str(&contents)?;
    if pairs.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "{} contains no query/response pairs",
            path.as_ref().display()
        )));
    }
    Ok(pairs)
}

/// The configuration at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> CliResult<EvaluationConfig> {
    let config = match path {
        Some(path) => config::from_file(path)?,
        None => EvaluationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Parses a fact value as JSON, falling back to a plain string.
///
/// `200` becomes a number while `200 psi` stays text.
pub fn parse_fact_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
