use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use strata_run::serde::to_canonical_json_pretty;
use strata_run::{load_config, plan_only, run_from_config};

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Stratified spatially balanced site sampler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw the sample described by a run configuration and write it out.
    Run(ConfigArgs),
    /// Print the per-stratum sample size plan without drawing.
    Plan(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// YAML run configuration.
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            let config = load_config(&args.config)?;
            let summary = run_from_config(&config)?;
            println!("{}", String::from_utf8(to_canonical_json_pretty(&summary)?)?);
        }
        Command::Plan(args) => {
            let config = load_config(&args.config)?;
            let report = plan_only(&config)?;
            println!("{}", String::from_utf8(to_canonical_json_pretty(&report)?)?);
        }
    }
    Ok(())
}
