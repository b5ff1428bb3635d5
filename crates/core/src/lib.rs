pub mod analysis;
pub mod config;
pub mod dispatcher;
pub mod metrics;
pub mod orchestrator;
pub mod page;
pub mod protocol;
pub mod testing;

pub use analysis::{analyze_page, AnalyzerOptions, ProcessingData};
pub use config::{
    load_config, load_config_from_str, validate_config, BackendConfig, Config, ConfigError,
    ProcessorConfig, ScraperConfig, ServerConfig,
};
pub use dispatcher::{Dispatcher, PoolConfig, PoolStatus, ProcessPool, WorkerCommand, WorkerError};
pub use orchestrator::{
    BackendError, OrchestratorStatus, PipelineError, ProcessingBackend, ProcessingStatus,
    ScrapeOrchestrator, ScrapeResult, TaskRecord, TaskStatus, TcpBackend,
};
pub use page::{extract_page_data, FetchError, FetchedPage, HttpFetcher, PageFetcher, ScrapingData};
