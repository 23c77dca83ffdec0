//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{AnnexArgs, OutputFormat};
use crate::error::Result;

/// Result structure for dataset generation.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResult {
    pub path: String,
    pub count: usize,
    pub dimension: usize,
    pub seed: u64,
}

/// Output a result in the selected format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &AnnexArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &AnnexArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
    }

    let value = serde_json::to_value(result)?;
    print_value(&value, 0);
    Ok(())
}

fn print_value(value: &serde_json::Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                if val.is_object() {
                    println!("{indent}{key}:");
                    print_value(val, depth + 1);
                } else {
                    println!("{indent}{key}: {}", format_value(val));
                }
            }
        }
        _ => println!("{indent}{}", format_value(value)),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &AnnexArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a scalar JSON value for human output.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
