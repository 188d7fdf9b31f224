use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use embeval::cli;

#[derive(Parser)]
#[command(name = "embeval")]
#[command(about = "Intrinsic evaluation of entity embeddings against gold-standard datasets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a vector file on the selected tasks
    Evaluate(cli::EvaluateArgs),

    /// List supported tasks and their gold-standard datasets
    Tasks,
}

fn init_tracing(debugging_mode: bool) {
    let default_filter = if debugging_mode { "embeval=debug" } else { "embeval=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate(args) => {
            let settings = cli::load_settings(&args)?;
            init_tracing(settings.debugging_mode);
            cli::evaluate(settings)?;
        }

        Commands::Tasks => {
            init_tracing(false);
            cli::list_tasks();
        }
    }

    Ok(())
}
