use clap::{Parser, Subcommand};

pub const DEFAULT_PORT: u16 = 8050;

#[derive(Parser)]
#[command(
    name = "outreach",
    about = "Outreach - rate-limited scraping scheduler",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, env = "OUTREACH_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the dispatcher and operator API (default if no command specified)")]
    Serve {
        #[arg(short, long, env = "OUTREACH_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    #[command(about = "Show pool and queue statistics from the running daemon")]
    Status {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Requeue every failed work item")]
    RetryFailed,

    #[command(about = "Write the effective configuration file into the data directory")]
    InitConfig {
        #[arg(long, help = "Replace an existing file with defaults")]
        force: bool,
    },
}
