use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration shared by the front tier and the back tier.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
}

/// Front-tier HTTP listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

/// Orchestrator settings: admission, caching and fetch limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Size of the admission gate (simultaneous pipeline runs).
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum fetches per domain per minute (0 = unlimited).
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// Result cache TTL in seconds (0 = caching disabled).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Maximum accepted page body size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,

    /// Overall timeout for one page fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_workers() -> usize {
    4
}

fn default_rate_limit() -> u32 {
    60
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("pagescope/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            rate_limit_per_minute: default_rate_limit(),
            cache_ttl_secs: default_cache_ttl(),
            max_body_bytes: default_max_body_bytes(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Where the front tier reaches the back tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_host")]
    pub host: String,
    #[serde(default = "default_processor_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Bound on the whole request/response exchange after connecting.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,
}

fn default_backend_host() -> String {
    "127.0.0.1".to_string()
}

fn default_processor_port() -> u16 {
    9000
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_response_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_backend_host(),
            port: default_processor_port(),
            connect_timeout_secs: default_connect_timeout(),
            response_timeout_secs: default_response_timeout(),
        }
    }
}

/// Back-tier dispatcher and worker pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_processor_port")]
    pub port: u16,

    /// Worker processes in the pool (0 = available CPU count).
    #[serde(default)]
    pub processes: usize,

    /// Jobs that may wait for a free worker before submitters block.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// A job running longer than this kills its worker.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Headless browser used for screenshots; a placeholder image is rendered
    /// when unset or when capture fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_browser: Option<PathBuf>,
}

fn default_queue_capacity() -> usize {
    64
}

fn default_job_timeout() -> u64 {
    120
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_processor_port(),
            processes: 0,
            queue_capacity: default_queue_capacity(),
            job_timeout_secs: default_job_timeout(),
            screenshot_browser: None,
        }
    }
}

impl ProcessorConfig {
    /// Pool size with `0` resolved to the number of available CPUs.
    pub fn effective_processes(&self) -> usize {
        if self.processes > 0 {
            return self.processes;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
