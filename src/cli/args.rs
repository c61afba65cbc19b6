use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetwatch")]
#[command(about = "Track meeting processing jobs on a meeting-intelligence server", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the meetings API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Follow processing meetings until all of them finish
    Watch(WatchCliArgs),
    /// Track meetings continuously and expose them over the local API
    Serve,
    /// List meetings known to the server
    List(ListCliArgs),
    /// Show a meeting's results
    Show(ShowCliArgs),
    /// Upload a recording for processing
    Upload(UploadCliArgs),
    /// Ask a question about a processed meeting
    Ask(AskCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct WatchCliArgs {
    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ListCliArgs {
    /// Number of meetings to skip
    #[arg(long, default_value = "0")]
    pub skip: usize,
    /// Maximum number of meetings to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

#[derive(ClapArgs, Debug)]
pub struct ShowCliArgs {
    /// Meeting ID
    pub id: String,
    /// Include the full transcript
    #[arg(short, long)]
    pub transcript: bool,
    /// Print the meeting as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct UploadCliArgs {
    /// Path to the audio or video recording
    pub file: PathBuf,
    /// Follow processing until the meeting completes or fails
    #[arg(short, long)]
    pub watch: bool,
    /// Disable the progress spinner while watching
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct AskCliArgs {
    /// Meeting ID
    pub id: String,
    /// Question about the meeting
    pub question: String,
}
