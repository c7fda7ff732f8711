use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use vagg::cli::commands::{
    handle_aggregate, handle_config, handle_inspect, handle_methods, handle_snapshot,
    handle_status, handle_verify,
};
use vagg::cli::{Cli, Commands};
use vagg::models::{Config, OutputFormat};

/// `RUST_LOG` wins; otherwise warnings only, or info with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "vagg=info,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let resolved = Config::load().unwrap_or_default();
    let format = cli.format.unwrap_or(resolved.config.output.default_format);
    let verbose = cli.verbose;

    tokio::select! {
        result = run_command(cli.command, format, verbose) => {
            result?;
        }
        _ = shutdown_signal() => {
            eprintln!("\nReceived shutdown signal, stopping.");
            eprintln!("The destination collection may be partially written.");
        }
    }

    Ok(())
}

async fn run_command(command: Commands, format: OutputFormat, verbose: bool) -> Result<()> {
    match command {
        Commands::Aggregate(args) => {
            handle_aggregate(args, format, verbose).await?;
        }
        Commands::Inspect(args) => {
            handle_inspect(args, format, verbose).await?;
        }
        Commands::Verify(args) => {
            handle_verify(args, format, verbose).await?;
        }
        Commands::Status(args) => {
            handle_status(args, format, verbose).await?;
        }
        Commands::Snapshot(args) => {
            handle_snapshot(args, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, format, verbose).await?;
        }
        Commands::Methods => {
            handle_methods(format)?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
