use clap::Parser;
use tracing::{error, info};
use visual_baseline::{setup_logging, Cli, CliRunner, RunSummary};

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    if let Err(e) = setup_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    info!("Starting visual-baseline v{}", env!("CARGO_PKG_VERSION"));

    match run(&args).await {
        Ok(summary) => {
            info!(
                "visual-baseline finished: {} page(s) processed",
                summary.total
            );
        }
        Err(err) => {
            error!("visual-baseline failed: {err:#}");
            std::process::exit(1);
        }
    }
}

async fn run(args: &Cli) -> anyhow::Result<RunSummary> {
    let runner = CliRunner::new(args).await?;
    runner.run().await
}
