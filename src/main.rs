mod cli;
mod ui;

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use odm_dispatch::collector::ResultCollector;
use odm_dispatch::{FaultKind, JobGateway, JobId, NodeOdmClient, OdmConfig, Orchestrator};

use cli::{Cli, Command};
use ui::{Ui, WaitSpinner};

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = OdmConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(url) = cli.engine_url {
        config.engine_url = url;
    }

    let ui = Ui::new();

    match cli.command {
        Command::Submit {
            transaction_id,
            batch_size,
            poll_interval,
        } => {
            if let Some(size) = batch_size {
                config.batch_size = size;
            }
            if let Some(secs) = poll_interval {
                config.poll_interval_secs = secs;
            }
            config.validate()?;

            let orchestrator = Orchestrator::from_config(&config);
            let job_id = match orchestrator.calculate_orthophoto(&transaction_id).await {
                Ok(id) => id,
                Err(err) => {
                    ui.rejected(&err);
                    let code = match err.kind() {
                        FaultKind::NotFound => 2,
                        FaultKind::Internal => 1,
                    };
                    process::exit(code);
                }
            };
            ui.submitted(&job_id, &transaction_id);

            let spinner = WaitSpinner::start(format!("Waiting on task {job_id}"));
            tokio::select! {
                _ = orchestrator.drain() => {}
                _ = tokio::signal::ctrl_c() => {
                    ui.interrupted();
                    orchestrator.shutdown().await;
                }
            }
            spinner.finish();
        }

        Command::Status { job_id } => {
            let client = NodeOdmClient::from_config(&config);
            let info = client.task_info(&JobId::new(job_id)).await?;
            ui.task_info(&info);
        }

        Command::Download { job_id, dest } => {
            let job_id = JobId::new(job_id);
            tokio::fs::create_dir_all(&dest)
                .await
                .with_context(|| format!("creating {}", dest.display()))?;
            let gateway: Arc<dyn JobGateway> = Arc::new(NodeOdmClient::from_config(&config));
            let summary = ResultCollector::new(gateway).collect(&job_id, &dest).await?;
            ui.collected(&summary, &dest);
        }

        Command::Remove { job_id } => {
            let job_id = JobId::new(job_id);
            NodeOdmClient::from_config(&config)
                .remove_task(&job_id)
                .await?;
            ui.removed(&job_id);
        }
    }

    Ok(())
}
