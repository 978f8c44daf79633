use burrow_telemetry::LogFormat;
use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "BURROW_LISTEN_ADDR";
pub const CONFIG_PATH_ENV: &str = "BURROW_CONFIG";
pub const STORE_BACKEND_ENV: &str = "BURROW_STORE_BACKEND";
pub const REDIS_URL_ENV: &str = "BURROW_REDIS_URL";
pub const REDIS_KEY_PREFIX_ENV: &str = "BURROW_REDIS_KEY_PREFIX";
pub const CACHE_TTL_ENV: &str = "BURROW_CACHE_TTL_SECS";
pub const CACHE_CAPACITY_ENV: &str = "BURROW_CACHE_CAPACITY";
pub const BODY_LIMIT_ENV: &str = "BURROW_BODY_LIMIT";
pub const DRAIN_TIMEOUT_ENV: &str = "BURROW_DRAIN_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "BURROW_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_CONFIG_PATH: &str = "burrow.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackendArg {
    #[value(name = "gitlab")]
    GitLab,
    #[value(name = "in-memory")]
    InMemory,
}

impl Display for StoreBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackendArg::GitLab => write!(f, "gitlab"),
            StoreBackendArg::InMemory => write!(f, "in-memory"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "burrow-gateway", version)]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// JSON gateway configuration, loaded once at start.
    #[arg(long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[arg(
        long,
        env = STORE_BACKEND_ENV,
        value_enum,
        default_value_t = StoreBackendArg::GitLab
    )]
    pub store: StoreBackendArg,

    /// Shared L2 response cache. Without it only the in-process cache is used.
    #[arg(long, env = REDIS_URL_ENV)]
    pub redis_url: Option<String>,

    #[arg(long, env = REDIS_KEY_PREFIX_ENV, default_value = burrow_cache::DEFAULT_KEY_PREFIX)]
    pub redis_key_prefix: String,

    #[arg(long, env = CACHE_CAPACITY_ENV, default_value_t = 10_000)]
    pub cache_capacity: u64,

    /// Lifetime of cached responses in both cache layers.
    #[arg(long, env = CACHE_TTL_ENV, default_value_t = burrow_cache::DEFAULT_TTL.as_secs())]
    pub cache_ttl_secs: u64,

    #[arg(long, env = BODY_LIMIT_ENV, default_value_t = burrow_gateway::app::DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,

    /// How long to wait for pending cache writes on shutdown.
    #[arg(long, env = DRAIN_TIMEOUT_ENV, default_value_t = 10)]
    pub drain_timeout_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, default_value = "text")]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_options_default_to_one_year_and_burrow_prefix() {
        let cli = CLI::try_parse_from(["gateway"]).unwrap();
        assert_eq!(cli.cache_ttl_secs, 31_536_000);
        assert_eq!(cli.redis_key_prefix, "burrow:resp:");
        assert_eq!(cli.store, StoreBackendArg::GitLab);
    }

    #[test]
    fn cache_options_can_be_overridden() {
        let cli = CLI::try_parse_from([
            "gateway",
            "--redis-url",
            "redis://cache:6379",
            "--redis-key-prefix",
            "edge-a:",
            "--cache-ttl-secs",
            "600",
            "--store",
            "in-memory",
        ])
        .unwrap();
        assert_eq!(cli.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(cli.redis_key_prefix, "edge-a:");
        assert_eq!(cli.cache_ttl_secs, 600);
        assert_eq!(cli.store, StoreBackendArg::InMemory);
    }
}
