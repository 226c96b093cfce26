use std::path::Path;
use std::process;

use stagecraft_core::{BatchReport, FindingSeverity};

use crate::{load_or_exit, OutputFormat};

pub(crate) fn cmd_check(file: &Path, config: Option<&Path>, output: OutputFormat, quiet: bool) {
    let loaded = load_or_exit(file, config, output, quiet);
    let report = loaded.generate();

    if !quiet {
        match output {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&summary(&report))
                    .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
                println!("{}", json);
            }
            OutputFormat::Text => print_text(&loaded.file_id, &report),
        }
    }

    if !report.is_clean() {
        process::exit(1);
    }
}

/// The report without the synthesized graphs; `describe` prints those.
fn summary(report: &BatchReport) -> serde_json::Value {
    let goals: Vec<serde_json::Value> = report
        .goals
        .iter()
        .map(|g| {
            serde_json::json!({
                "id": g.id,
                "goal_name": g.goal_name,
                "steps": g.order.len(),
                "entry_points": g.entry_points.iter().map(|e| e.signature.name.clone()).collect::<Vec<_>>(),
            })
        })
        .collect();
    serde_json::json!({
        "goals": goals,
        "failures": report.failures,
        "findings": report.findings,
    })
}

fn print_text(file_id: &str, report: &BatchReport) {
    println!("Goal Report: {}", file_id);
    println!("============");
    println!();

    for goal in &report.goals {
        let entries: Vec<&str> = goal
            .entry_points
            .iter()
            .map(|e| e.signature.name.as_str())
            .collect();
        println!(
            "  ok    {} ({} step(s)): {}",
            goal.id,
            goal.order.len(),
            entries.join(", ")
        );
    }
    for failure in &report.failures {
        println!("  FAIL  {} [{}]: {}", failure.goal, failure.kind, failure.message);
    }

    if !report.findings.is_empty() {
        println!();
        println!("Findings:");
        for finding in &report.findings {
            let severity = match finding.severity {
                FindingSeverity::Info => "info",
                FindingSeverity::Warning => "warning",
            };
            match &finding.parameter {
                Some(p) => println!("  [{}] {}.{}: {}", severity, finding.goal, p, finding.message),
                None => println!("  [{}] {}: {}", severity, finding.goal, finding.message),
            }
        }
    }

    println!();
    println!(
        "{} goal(s) synthesized, {} failed",
        report.goals.len(),
        report.failures.len()
    );
}
