use edamame::run_rank::*;
use edamame::simulate::*;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "EDAMAME",
    long_about = "Evaluating Differential Analysis Methods with Artificial Mixed Expression\n\
		  (1) Simulate single-cell counts of female/male control/disease samples\n\
		      with differential genes injected into one sample\n\
		  (2) Rank the injected genes in differential expression results"
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate count matrix, cell metadata, and ground truth
    #[command(alias = "sim")]
    Simulate(SimArgs),

    /// Rank the true differential genes in result tables
    Rank(RankArgs),
}

fn init_logger(verbose: bool) {
    if verbose && std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Simulate(args) => {
            init_logger(args.verbose);
            run_simulate(args)?;
        }
        Commands::Rank(args) => {
            init_logger(args.verbose);
            run_rank(args)?;
        }
    }

    Ok(())
}
