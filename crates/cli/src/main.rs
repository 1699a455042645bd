// refmerge CLI - link reference tables into one master table

mod exit_codes;
mod link;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "refmerge")]
#[command(about = "Multi-stage record linkage for reference tables")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured stage and write the merged table
    #[command(after_help = "\
Examples:
  refmerge run master.toml
  refmerge run master.toml --output out/master_company_reference.csv
  refmerge run master.toml --json > report.json
  refmerge run master.toml --report report.json --quiet")]
    Run {
        /// Path to the linkage TOML config
        config: PathBuf,

        /// Output CSV path (overrides [output] file)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Suppress progress lines
        #[arg(long, short = 'q', env = "REFMERGE_QUIET")]
        quiet: bool,
    },

    /// Parse and validate a config without loading any tables
    #[command(after_help = "\
Examples:
  refmerge validate master.toml")]
    Validate {
        /// Path to the linkage TOML config
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  refmerge-linkage ", env!("CARGO_PKG_VERSION"),
        "\nbuild:   ", env!("BUILD_PROFILE"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, output, report, json, quiet } => {
            link::cmd_run(config, output, report, json, quiet)
        }
        Commands::Validate { config } => link::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
