use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rollsink::config::JobConfig;
use rollsink::{runtime, telemetry};

#[derive(Parser)]
#[command(name = "rollsink")]
#[command(about = "Rollsink - size-rotated segment writer for batch pipelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a write job from YAML configuration
    Run {
        /// Path to job YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a job configuration
    Validate {
        /// Path to job YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let job = JobConfig::from_yaml_file(&config)?;
            runtime::run_job(&job)?;
        }
        Commands::Validate { config } => {
            let _job = JobConfig::from_yaml_file(&config)?;
            println!("✓ Job configuration is valid");
        }
        Commands::Version => {
            println!("rollsink version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
