use std::path::Path;
use std::process;

use crate::{load_or_exit, report_error, OutputFormat};

/// Print synthesized graphs as JSON. Always JSON: the graph has no
/// useful text rendering.
pub(crate) fn cmd_describe(
    file: &Path,
    config: Option<&Path>,
    goal: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let loaded = load_or_exit(file, config, output, quiet);
    let report = loaded.generate();

    let value = match goal {
        Some(id) => match report.goal(id) {
            Some(g) => serde_json::to_value(g),
            None => {
                let reason = report
                    .failures
                    .iter()
                    .find(|f| f.goal == id)
                    .map(|f| format!("goal '{}' failed: {}", id, f.message))
                    .unwrap_or_else(|| format!("no goal '{}' in '{}'", id, file.display()));
                report_error(&reason, output, quiet);
                process::exit(1);
            }
        },
        None => serde_json::to_value(&report.goals),
    };

    match value {
        Ok(v) => println!(
            "{}",
            serde_json::to_string_pretty(&v).unwrap_or_default()
        ),
        Err(e) => {
            report_error(&format!("serialization error: {}", e), output, quiet);
            process::exit(1);
        }
    }

    if goal.is_none() && !report.is_clean() {
        for failure in &report.failures {
            report_error(
                &format!("{}: {}", failure.goal, failure.message),
                output,
                quiet,
            );
        }
        process::exit(1);
    }
}
