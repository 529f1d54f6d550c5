use std::path::PathBuf;

use clap::{Parser, Subcommand};
use diagnostic_lib::config::AppConfig;
use diagnostic_lib::pipeline::prediction::training::{ForestParams, DEFAULT_TEST_FRACTION};
use diagnostic_lib::{StartupError, TrainOptions};

#[derive(Parser)]
#[command(name = "diagnostic-system", version)]
#[command(about = "Vitals-and-symptoms diagnostic assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Train the classifier artifact from a patient CSV
    Train {
        /// CSV with age, gender, bp, glucose, heart_rate and diagnosis columns
        /// (bundled sample data when omitted)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output artifact (configured model path when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Number of trees
        #[arg(long, default_value_t = 100)]
        trees: usize,

        /// Maximum tree depth
        #[arg(long, default_value_t = 10)]
        max_depth: usize,

        /// RNG seed for bootstrap sampling and the holdout split
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Share of rows held out for the accuracy estimate
        #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
        test_fraction: f64,
    },
}

async fn dispatch(cli: Cli) -> Result<(), StartupError> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => diagnostic_lib::run().await,
        Commands::Train {
            data,
            out,
            trees,
            max_depth,
            seed,
            test_fraction,
        } => {
            let out = match out {
                Some(out) => out,
                None => AppConfig::from_env()?.model_path,
            };
            let options = TrainOptions {
                data,
                out,
                params: ForestParams {
                    n_trees: trees,
                    max_depth,
                    seed,
                    ..ForestParams::default()
                },
                test_fraction,
            };
            let report = diagnostic_lib::train_model(&options)?;
            match report.accuracy {
                Some(accuracy) => println!(
                    "Model saved to {} ({} classes, holdout accuracy {:.2}%)",
                    options.out.display(),
                    report.classes.len(),
                    accuracy * 100.0
                ),
                None => println!(
                    "Model saved to {} ({} classes)",
                    options.out.display(),
                    report.classes.len()
                ),
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    diagnostic_lib::init_tracing();

    if let Err(e) = dispatch(cli).await {
        tracing::error!("Fatal: {e}");
        eprintln!("diagnostic-system: {e}");
        std::process::exit(1);
    }
}
