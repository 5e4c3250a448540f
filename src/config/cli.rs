use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the score-api binary.
#[derive(Debug, Parser)]
#[command(
    name = "score-api",
    version,
    about = "Read-through score cache with JSON, text and SVG badge output"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SCORE_API_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service (default).
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Override the score store address (redis://… or memory://).
    #[arg(long = "store-url", value_name = "URL")]
    pub store_url: Option<String>,

    /// Override the number of pooled store connections.
    #[arg(long = "store-max-idle", value_name = "COUNT")]
    pub store_max_idle: Option<u64>,

    /// Override how long a pooled connection may sit idle.
    #[arg(long = "store-idle-timeout-seconds", value_name = "SECONDS")]
    pub store_idle_timeout_seconds: Option<u64>,

    /// Override the number of startup connection attempts.
    #[arg(long = "store-connect-attempts", value_name = "COUNT")]
    pub store_connect_attempts: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ScorerOverrides {
    /// Override the external scorer executable.
    #[arg(long = "scorer-command", value_name = "PATH")]
    pub scorer_command: Option<PathBuf>,

    /// Override the per-invocation scorer timeout.
    #[arg(long = "scorer-timeout-seconds", value_name = "SECONDS")]
    pub scorer_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub store: StoreOverrides,

    #[command(flatten)]
    pub scorer: ScorerOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the SVG badge template path.
    #[arg(long = "badge-template-path", value_name = "PATH")]
    pub badge_template_path: Option<PathBuf>,
}
