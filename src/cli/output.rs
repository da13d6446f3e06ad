//! Output formatting for CLI commands.

use serde::Serialize;

use crate::cli::args::{OutputFormat, TaxisArgs};
use crate::engine::ClassificationPath;
use crate::error::Result;

/// Result of the `build` command.
#[derive(Debug, Serialize)]
pub struct BuildResult {
    pub language: String,
    pub rows: usize,
    pub documents_indexed: usize,
    pub duration_ms: u64,
    pub trained: Option<bool>,
}

/// Result of the `add` command.
#[derive(Debug, Serialize)]
pub struct AddResult {
    pub language: String,
    pub path: String,
    pub copies: usize,
}

/// Result of the `remove` command.
#[derive(Debug, Serialize)]
pub struct RemoveResult {
    pub documents_removed: u64,
    pub node_removed: bool,
}

/// Paths found for one input text.
#[derive(Debug, Serialize)]
pub struct ClassifiedText {
    pub text: String,
    pub paths: Vec<ClassificationPath>,
}

/// Result of the `classify` command.
#[derive(Debug, Serialize)]
pub struct ClassificationReport {
    pub language: String,
    pub threshold: f64,
    pub results: Vec<ClassifiedText>,
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Result of the `unlock` command.
#[derive(Debug, Serialize)]
pub struct UnlockResult {
    pub language: String,
    pub lock_removed: bool,
}

/// Result of the `import-tree` command.
#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub nodes: usize,
    pub leaves: usize,
    pub structure_file: String,
}

/// Stop words of a language.
#[derive(Debug, Serialize)]
pub struct StopWordList {
    pub language: String,
    pub words: Vec<String>,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &TaxisArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output a classification report, one line per path in human mode.
pub fn output_classification(report: &ClassificationReport, args: &TaxisArgs) -> Result<()> {
    if args.output_format == OutputFormat::Json {
        return output_json(report, args);
    }
    for classified in &report.results {
        if report.results.len() > 1 || args.verbosity() > 1 {
            println!("{}", classified.text);
        }
        if classified.paths.is_empty() {
            println!("  (no category)");
        }
        for path in &classified.paths {
            println!("  {path}");
        }
    }
    if args.verbosity() > 1 {
        println!();
        println!(
            "Classified {} texts in {}ms",
            report.results.len(),
            report.duration_ms
        );
    }
    if report.skipped > 0 {
        println!("{} texts were not classified", report.skipped);
    }
    Ok(())
}

fn output_human<T: Serialize>(message: &str, result: &T, args: &TaxisArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }
    let value = serde_json::to_value(result)?;
    output_generic_human(&value);
    Ok(())
}

fn output_generic_human(value: &serde_json::Value) {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                match val {
                    serde_json::Value::Array(items) => {
                        println!("{key}:");
                        for item in items {
                            println!("  {}", format_json_value(item));
                        }
                    }
                    _ => println!("{key}: {}", format_json_value(val)),
                }
            }
        }
        _ => println!("{}", format_json_value(value)),
    }
}

fn output_json<T: Serialize>(result: &T, args: &TaxisArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_json_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => "-".to_string(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_json_value() {
        assert_eq!(format_json_value(&json!("text")), "text");
        assert_eq!(format_json_value(&json!(3)), "3");
        assert_eq!(format_json_value(&json!(true)), "true");
        assert_eq!(format_json_value(&json!(null)), "-");
        assert_eq!(format_json_value(&json!([1, 2])), "[1,2]");
    }
}
