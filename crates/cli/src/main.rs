mod commands;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use stagecraft_interchange::{load_goal_file, Config, LoadedGoals};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Staged builder and updater generator.
#[derive(Parser)]
#[command(
    name = "stagecraft",
    version,
    about = "Staged builder and updater generator"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a goal file against the JSON Schema
    Validate {
        /// Path to the goal file
        file: PathBuf,
    },

    /// Run the pipeline over a goal file and print the batch report
    Check {
        /// Path to the goal file
        file: PathBuf,
        /// Generator configuration (stagecraft.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the synthesized interface graph as JSON
    Describe {
        /// Path to the goal file
        file: PathBuf,
        /// Generator configuration (stagecraft.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only this goal
        #[arg(long)]
        goal: Option<String>,
    },

    /// Generate code from a goal file
    Generate {
        #[command(subcommand)]
        command: GenerateCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum GenerateCommands {
    /// Generate a Rust module with builders, updaters and recyclers
    Rust {
        /// Path to the goal file
        input: PathBuf,
        /// Output directory for the generated module
        #[arg(long, default_value = "./generated")]
        out: PathBuf,
        /// Module name; the file written is <out>/<module>.rs
        #[arg(long, default_value = "staged")]
        module: String,
        /// Path under which generated code reaches the runtime crate
        #[arg(long, default_value = "stagecraft_runtime")]
        runtime_path: String,
        /// `use` item placed at the top of the module (repeatable)
        #[arg(long = "import", default_value = "super::*")]
        imports: Vec<String>,
        /// Generator configuration (stagecraft.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { file } => {
            commands::validate::cmd_validate(&file, cli.output, cli.quiet);
        }
        Commands::Check { file, config } => {
            commands::check::cmd_check(&file, config.as_deref(), cli.output, cli.quiet);
        }
        Commands::Describe { file, config, goal } => {
            commands::describe::cmd_describe(
                &file,
                config.as_deref(),
                goal.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Generate { command } => {
            commands::generate::cmd_generate(command, cli.output, cli.quiet);
        }
    }
}

/// Logs go to stderr so that JSON on stdout stays parseable.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Load a goal file and its optional configuration, exiting on
/// file-level errors.
pub(crate) fn load_or_exit(
    file: &Path,
    config: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) -> LoadedGoals {
    let config = config.map(|path| match Config::load(path) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    });
    tracing::debug!(file = %file.display(), "loading goal file");
    match load_goal_file(file, config.as_ref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
