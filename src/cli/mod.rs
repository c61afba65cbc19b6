use crate::config::Config;
use crate::jobs::{InitialLoader, MeetingService, PollScheduler, StatusFetcher};
use crate::remote::MeetingsClient;
use anyhow::Result;
use std::sync::Arc;

pub mod args;
pub mod meetings;
pub mod watch;

pub use args::{Cli, CliCommand, WatchCliArgs};
pub use meetings::{
    handle_ask_command, handle_list_command, handle_show_command, handle_upload_command,
};

/// Load the config selected on the command line, applying overrides.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(url) = &cli.api_url {
        config.remote.base_url = url.clone();
    }

    Ok(config)
}

pub fn build_client(config: &Config) -> Result<MeetingsClient> {
    MeetingsClient::new(
        &config.remote.base_url,
        config.remote.request_timeout(),
        config.remote.list_limit,
    )
}

pub fn build_fetcher(config: &Config, service: Arc<dyn MeetingService>) -> StatusFetcher {
    StatusFetcher::new(service).with_retry(config.polling.retry_policy())
}

pub async fn handle_watch_command(config: &Config, args: WatchCliArgs) -> Result<()> {
    let client: Arc<dyn MeetingService> = Arc::new(build_client(config)?);
    let records = InitialLoader::new(client.clone()).load_all().await?;

    let handle = PollScheduler::new(build_fetcher(config, client), config.polling.interval())
        .with_records(records)
        .spawn();

    watch::follow(&handle, !args.no_progress).await?;
    handle.stop().await?;

    Ok(())
}
