use clap::{Parser, Subcommand, ValueEnum};
use linkshard_engine::engine::DEFAULT_BASE_URL;
use linkshard_storage::PartitionConfig;
use std::fmt::{Display, Formatter};

pub const STORAGE_BACKEND_ENV: &str = "LINKSHARD_STORAGE";
pub const PARTITIONS_ENV: &str = "LINKSHARD_PARTITIONS";
pub const CACHE_BACKEND_ENV: &str = "LINKSHARD_CACHE";
pub const REDIS_URL_ENV: &str = "LINKSHARD_REDIS_URL";
pub const BASE_URL_ENV: &str = "LINKSHARD_BASE_URL";
pub const OP_TIMEOUT_ENV: &str = "LINKSHARD_OP_TIMEOUT_MS";
pub const CACHE_TIMEOUT_ENV: &str = "LINKSHARD_CACHE_TIMEOUT_MS";
pub const CONNECT_TIMEOUT_ENV: &str = "LINKSHARD_CONNECT_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "LINKSHARD_LOG_FORMAT";

pub const DEFAULT_PARTITIONS: &str = "0";
pub const DEFAULT_DAYS_TO_LIVE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "linkshard", about = "Sharded URL shortener")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    /// Partitions as `selector=dsn`, comma separated. The DSN is ignored
    /// for in-memory storage.
    #[arg(
        long = "partitions",
        env = PARTITIONS_ENV,
        value_delimiter = ',',
        default_value = DEFAULT_PARTITIONS
    )]
    pub partitions: Vec<PartitionConfig>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = OP_TIMEOUT_ENV, default_value_t = 2_000)]
    pub op_timeout_ms: u64,

    #[arg(long, env = CACHE_TIMEOUT_ENV, default_value_t = 500)]
    pub cache_timeout_ms: u64,

    #[arg(long, env = CONNECT_TIMEOUT_ENV, default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a short link.
    Shorten {
        url: String,
        /// Days until the link expires, 1 to 365.
        #[arg(long, default_value_t = DEFAULT_DAYS_TO_LIVE)]
        days: u32,
    },
    /// Print the long URL behind a short code.
    Resolve { code: String },
    /// Print the stored record for a short code.
    Stats { code: String },
    /// Delete expired records, once or every `--every` seconds until Ctrl-C.
    Sweep {
        #[arg(long)]
        every: Option<u64>,
    },
    /// Ping every partition.
    Health,
}
