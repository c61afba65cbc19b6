use crate::api::ApiServer;
use crate::cli::{build_client, build_fetcher, watch::describe_changes};
use crate::config::Config;
use crate::jobs::{InitialLoader, MeetingService, PollScheduler};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Track meetings until Ctrl-C, serving the local API alongside.
pub async fn run_service(config: Config) -> Result<()> {
    info!(
        "Starting meetwatch service against {}",
        config.remote.base_url
    );

    let client: Arc<dyn MeetingService> = Arc::new(build_client(&config)?);
    let records = InitialLoader::new(client.clone()).load_all().await?;

    let handle = PollScheduler::new(build_fetcher(&config, client), config.polling.interval())
        .with_records(records)
        .spawn();

    let shutdown = CancellationToken::new();

    if config.api.enabled {
        let api_server = ApiServer::new(config.api.port, handle.view());
        let api_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = api_server.start(api_shutdown).await {
                error!("API server failed: {}", e);
            }
        });
    }

    let mut updates = handle.subscribe();
    let mut previous = handle.snapshot();
    info!("meetwatch is ready!");

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    error!("Poll scheduler exited");
                    break;
                }
                let current = updates.borrow_and_update().clone();
                for line in describe_changes(&previous, &current) {
                    info!("{}", line);
                }
                previous = current;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    shutdown.cancel();
    handle.stop().await?;

    Ok(())
}
