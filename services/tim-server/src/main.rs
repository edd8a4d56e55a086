//! Groundwater model compute server.
//!
//! Listens on a localhost socket for compute requests, builds and solves
//! the model described by a GeoPackage and writes the head grid as Zarr.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use solver::ReferenceSolver;
use tim_server::{ComputeServer, ServeArgs, ServerConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tim-server")]
#[command(about = "Analytic-element groundwater compute server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve compute requests until shut down
    Serve(ServeArgs),
}

fn init_tracing(config: &ServerConfig) -> Result<()> {
    let level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the ready line; logs go to stderr.
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if config.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Command::Serve(args) = cli.command;

    let config = args.resolve()?;
    init_tracing(&config)?;
    info!(
        address = %config.listen_addr(),
        compression = config.output.compression.as_str(),
        "Loaded configuration"
    );

    let server = ComputeServer::bind(&config, Arc::new(ReferenceSolver::new())).await?;
    println!("{}", serde_json::to_string(&server.ready_line()?)?);

    server.run().await?;
    info!("Compute server stopped");
    Ok(())
}
