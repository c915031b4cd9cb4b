mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use vault_ingest::config::Config;
use vault_ingest::deposit::State;
use vault_ingest::inbox::{InFlight, Inbox};
use vault_ingest::observability::{self, Metrics};
use vault_ingest::queue::TaskBroker;
use vault_ingest::server;
use vault_ingest::task::ConversionTask;
use vault_ingest::worker::WorkerPool;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<ExitCode, AnyError> {
    observability::init_tracing();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Run => {
            run(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Convert(args) => {
            let task = ConversionTask::from_config(&config)?;
            let report = task.run(&args.deposit_dir).await;
            info!(
                state = %report.state,
                message = %report.message,
                archive = ?report.archive,
                moved_to = ?report.moved_to,
                "Conversion finished"
            );

            if report.state == State::Accepted {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

async fn run(config: Config) -> Result<(), AnyError> {
    let metrics = Arc::new(Metrics::new());
    let in_flight = Arc::new(InFlight::new());
    let task = Arc::new(ConversionTask::from_config(&config)?);

    let (broker, receivers) = TaskBroker::new(config.workers.count, config.workers.channel_size);
    let pool = WorkerPool::spawn(receivers, task, Arc::clone(&metrics), Arc::clone(&in_flight));
    info!(workers = pool.len(), "Worker pool started");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let server = tokio::spawn(server::run(
        config.server.bind_addr,
        Arc::clone(&metrics),
        shutdown_rx.clone(),
    ));

    let inbox = Inbox::new(
        config.ingest.inbox.clone(),
        config.ingest.poll_interval(),
        in_flight,
        metrics,
    );
    inbox.run(&broker, shutdown_rx).await;

    // Closing the channels lets the workers finish what they hold and stop
    drop(broker);
    pool.join().await;

    match server.await {
        Ok(result) => result?,
        Err(e) => error!(error = %e, "Server task failed"),
    }

    info!("vault-ingest stopped");
    Ok(())
}
