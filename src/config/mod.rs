//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;
#[cfg(test)]
mod tests;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CliArgs, Command, ScorerOverrides, ServeArgs, ServeOverrides, StoreOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "score-api";
const ENV_PREFIX: &str = "SCORE_API";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STORE_URL: &str = "redis://localhost:6379";
const DEFAULT_STORE_MAX_IDLE: u64 = 3;
const DEFAULT_STORE_IDLE_TIMEOUT_SECS: u64 = 240;
const DEFAULT_STORE_CONNECT_ATTEMPTS: u64 = 5;
const DEFAULT_STORE_CONNECT_RETRY_DELAY_MS: u64 = 1_000;
const DEFAULT_STORE_CONNECT_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_SCORER_COMMAND: &str = "./get_score.rb";
const DEFAULT_SCORER_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BADGE_TEMPLATE_PATH: &str = "templates/score.svg";

/// Platform variables consulted, in order, when no store URL was configured.
const LEGACY_STORE_URL_VARS: [&str; 2] = ["REDIS_URL", "REDISCLOUD_URL"];
const LEGACY_PORT_VAR: &str = "PORT";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub scorer: ScorerSettings,
    pub badge: BadgeSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub url: String,
    pub max_idle: NonZeroUsize,
    pub idle_timeout: Duration,
    pub connect_attempts: NonZeroU32,
    pub connect_retry_delay: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ScorerSettings {
    pub command: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BadgeSettings {
    pub template_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_legacy_env(|name| std::env::var(name).ok());

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    scorer: RawScorerSettings,
    badge: RawBadgeSettings,
}

impl RawSettings {
    /// Fill gaps from the hosting platform's conventional variables.
    ///
    /// These only apply when neither a config file nor a `SCORE_API__*`
    /// variable set the value; CLI overrides still win afterwards.
    fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if self.store.url.is_none() {
            self.store.url = LEGACY_STORE_URL_VARS.iter().find_map(|name| non_empty(*name));
        }
        if self.server.port.is_none() {
            self.server.port = non_empty(LEGACY_PORT_VAR).and_then(|port| port.trim().parse().ok());
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(path) = overrides.badge_template_path.as_ref() {
            self.badge.template_path = Some(path.clone());
        }

        self.apply_store_overrides(&overrides.store);
        self.apply_scorer_overrides(&overrides.scorer);
    }

    fn apply_store_overrides(&mut self, overrides: &StoreOverrides) {
        if let Some(url) = overrides.store_url.as_ref() {
            self.store.url = Some(url.clone());
        }
        if let Some(max_idle) = overrides.store_max_idle {
            self.store.max_idle = Some(max_idle);
        }
        if let Some(seconds) = overrides.store_idle_timeout_seconds {
            self.store.idle_timeout_seconds = Some(seconds);
        }
        if let Some(attempts) = overrides.store_connect_attempts {
            self.store.connect_attempts = Some(attempts);
        }
    }

    fn apply_scorer_overrides(&mut self, overrides: &ScorerOverrides) {
        if let Some(command) = overrides.scorer_command.as_ref() {
            self.scorer.command = Some(command.clone());
        }
        if let Some(seconds) = overrides.scorer_timeout_seconds {
            self.scorer.timeout_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            scorer,
            badge,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store)?,
            scorer: build_scorer_settings(scorer)?,
            badge: build_badge_settings(badge)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let url = store
        .url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_STORE_URL.to_string());

    let max_idle = non_zero_usize(
        store.max_idle.unwrap_or(DEFAULT_STORE_MAX_IDLE),
        "store.max_idle",
    )?;
    let idle_timeout = positive_duration(
        store
            .idle_timeout_seconds
            .unwrap_or(DEFAULT_STORE_IDLE_TIMEOUT_SECS),
        Duration::from_secs,
        "store.idle_timeout_seconds",
    )?;
    let connect_attempts = non_zero_u32(
        store
            .connect_attempts
            .unwrap_or(DEFAULT_STORE_CONNECT_ATTEMPTS),
        "store.connect_attempts",
    )?;
    let connect_retry_delay = Duration::from_millis(
        store
            .connect_retry_delay_ms
            .unwrap_or(DEFAULT_STORE_CONNECT_RETRY_DELAY_MS),
    );
    let connect_timeout = positive_duration(
        store
            .connect_timeout_ms
            .unwrap_or(DEFAULT_STORE_CONNECT_TIMEOUT_MS),
        Duration::from_millis,
        "store.connect_timeout_ms",
    )?;

    Ok(StoreSettings {
        url,
        max_idle,
        idle_timeout,
        connect_attempts,
        connect_retry_delay,
        connect_timeout,
    })
}

fn build_scorer_settings(scorer: RawScorerSettings) -> Result<ScorerSettings, LoadError> {
    let command = scorer
        .command
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCORER_COMMAND));
    if command.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "scorer.command",
            "path must not be empty",
        ));
    }

    let timeout = positive_duration(
        scorer.timeout_seconds.unwrap_or(DEFAULT_SCORER_TIMEOUT_SECS),
        Duration::from_secs,
        "scorer.timeout_seconds",
    )?;

    Ok(ScorerSettings { command, timeout })
}

fn build_badge_settings(badge: RawBadgeSettings) -> Result<BadgeSettings, LoadError> {
    let template_path = badge
        .template_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BADGE_TEMPLATE_PATH));
    if template_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "badge.template_path",
            "path must not be empty",
        ));
    }

    Ok(BadgeSettings { template_path })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    url: Option<String>,
    max_idle: Option<u64>,
    idle_timeout_seconds: Option<u64>,
    connect_attempts: Option<u64>,
    connect_retry_delay_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawScorerSettings {
    command: Option<PathBuf>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBadgeSettings {
    template_path: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value_usize: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value_usize)
        .ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn positive_duration(
    value: u64,
    unit: fn(u64) -> Duration,
    key: &'static str,
) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(unit(value))
}
