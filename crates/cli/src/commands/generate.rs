use std::process;

use stagecraft_codegen::{generate_rust, RustConfig};

use crate::{load_or_exit, report_error, GenerateCommands, OutputFormat};

pub(crate) fn cmd_generate(command: GenerateCommands, output: OutputFormat, quiet: bool) {
    match command {
        GenerateCommands::Rust {
            input,
            out,
            module,
            runtime_path,
            imports,
            config,
        } => {
            let loaded = load_or_exit(&input, config.as_deref(), output, quiet);
            let report = loaded.generate();

            let rust_config = RustConfig {
                out_dir: out,
                module_name: module,
                runtime_path,
                imports,
            };

            let generated = match generate_rust(&report.goals, &rust_config) {
                Ok(g) => g,
                Err(e) => {
                    report_error(&format!("generation error: {}", e), output, quiet);
                    process::exit(1);
                }
            };

            let mut failed: Vec<(String, String)> = report
                .failures
                .iter()
                .map(|f| (f.goal.clone(), f.message.clone()))
                .collect();
            failed.extend(
                generated
                    .skipped
                    .iter()
                    .map(|(goal, e)| (goal.clone(), e.to_string())),
            );

            if !quiet {
                match output {
                    OutputFormat::Text => {
                        let verb = if generated.written { "Generated" } else { "Unchanged" };
                        println!(
                            "{} {} ({} goal(s))",
                            verb,
                            generated.path.display(),
                            generated.rendered.len()
                        );
                        for (goal, message) in &failed {
                            eprintln!("  skipped {}: {}", goal, message);
                        }
                    }
                    OutputFormat::Json => {
                        let failures: Vec<serde_json::Value> = failed
                            .iter()
                            .map(|(goal, message)| {
                                serde_json::json!({ "goal": goal, "message": message })
                            })
                            .collect();
                        let json = serde_json::json!({
                            "path": generated.path.display().to_string(),
                            "written": generated.written,
                            "goals": generated.rendered,
                            "failures": failures,
                        });
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&json).unwrap_or_default()
                        );
                    }
                }
            }

            if !failed.is_empty() {
                process::exit(1);
            }
        }
    }
}
