use anyhow::Result;
use clap::Parser;
use meetwatch::{
    app,
    cli::{
        handle_ask_command, handle_list_command, handle_show_command, handle_upload_command,
        handle_watch_command, load_config, Cli, CliCommand, WatchCliArgs,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command.take() {
        Some(CliCommand::Version) => {
            println!("meetwatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Watch(args)) => handle_watch_command(&load_config(&cli)?, args).await,
        Some(CliCommand::List(args)) => handle_list_command(&load_config(&cli)?, args).await,
        Some(CliCommand::Show(args)) => handle_show_command(&load_config(&cli)?, args).await,
        Some(CliCommand::Upload(args)) => handle_upload_command(&load_config(&cli)?, args).await,
        Some(CliCommand::Ask(args)) => handle_ask_command(&load_config(&cli)?, args).await,
        Some(CliCommand::Serve) => app::run_service(load_config(&cli)?).await,
        None => {
            let args = WatchCliArgs { no_progress: false };
            handle_watch_command(&load_config(&cli)?, args).await
        }
    }
}
