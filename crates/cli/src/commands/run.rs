//! Run command - scheduler loop that publishes due posts

use anyhow::Result;
use devshare_domain::{
    SystemClock,
    usecases::{PublishConfig, PublishOrchestrator, Scheduler, TickOutcome},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use uuid::Uuid;

use crate::args::RunArgs;
use crate::commands::{build_publishers, open_store};
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!(
        once = args.once,
        poll_interval_secs = config.scheduler.poll_interval_secs,
        db = %config.general.db_path.display(),
        "Starting devshare scheduler"
    );

    let store = open_store(&config).await?;
    let clock = Arc::new(SystemClock);
    let publishers = build_publishers(&config);

    if publishers.is_empty() {
        tracing::warn!("No platforms are enabled; due posts will be skipped");
    }

    let publish_config = PublishConfig {
        max_retries: config.scheduler.max_retries,
        retry_delay: Duration::from_secs(config.scheduler.retry_delay_secs),
    };

    let orchestrator = PublishOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        publishers,
        publish_config,
    );
    let scheduler = Scheduler::new(store, clock, orchestrator);

    if args.once {
        tracing::info!("Running single scheduler tick");
        let outcomes = scheduler.tick().await?;
        log_outcomes(&outcomes);
        tracing::info!(processed = outcomes.len(), "Tick complete");
    } else {
        let poll_interval = Duration::from_secs(config.scheduler.poll_interval_secs);
        let mut ticker = interval(poll_interval);

        // Set up graceful shutdown
        let shutdown = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
            tracing::info!("Shutdown signal received");
        };

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match scheduler.tick().await {
                        Ok(outcomes) => {
                            if !outcomes.is_empty() {
                                log_outcomes(&outcomes);
                                tracing::info!(processed = outcomes.len(), "Tick complete");
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Scheduler tick failed");
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down gracefully");
                    break;
                }
            }
        }
    }

    tracing::info!("devshare run completed");
    Ok(())
}

fn log_outcomes(outcomes: &[(Uuid, TickOutcome)]) {
    for (post_id, outcome) in outcomes {
        match outcome {
            TickOutcome::Published(receipt) => {
                tracing::info!(
                    post_id = %post_id,
                    platform = %receipt.platform,
                    external_id = ?receipt.external_id,
                    "Published"
                );
            }
            TickOutcome::Skipped { reason } => {
                tracing::debug!(post_id = %post_id, reason = %reason, "Skipped");
            }
            TickOutcome::Failed { error } => {
                tracing::error!(post_id = %post_id, error = %error, "Failed");
            }
        }
    }
}
