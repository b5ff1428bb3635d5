//! Back tier of pagescope.
//!
//! Without arguments this is the dispatcher: it loads the shared config,
//! starts a pool of worker processes and serves `process_page` requests over
//! TCP. Invoked as `pagescope-processor worker` it is one of those workers,
//! speaking the framed protocol over stdin/stdout.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagescope_core::analysis::SCREENSHOT_BROWSER_ENV;
use pagescope_core::dispatcher::run_worker;
use pagescope_core::{
    load_config, validate_config, AnalyzerOptions, Dispatcher, PoolConfig, ProcessPool,
    WorkerCommand,
};

const WORKER_ARG: &str = "worker";

fn main() {
    let worker_mode = std::env::args().nth(1).as_deref() == Some(WORKER_ARG);
    init_tracing();

    let outcome = if worker_mode {
        worker()
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to build runtime")
            .and_then(|runtime| runtime.block_on(dispatcher()))
    };

    if let Err(e) = outcome {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs always go to stderr; in worker mode stdout carries protocol frames.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn worker() -> Result<()> {
    let options = AnalyzerOptions::from_env();
    let mut input = std::io::stdin().lock();
    let mut output = std::io::stdout().lock();

    run_worker(&mut input, &mut output, &options).context("Worker protocol failure")
}

async fn dispatcher() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("PAGESCOPE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let processor = &config.processor;
    let program = std::env::current_exe().context("Failed to locate own executable")?;
    let mut command = WorkerCommand::new(program).arg(WORKER_ARG);
    if let Some(browser) = &processor.screenshot_browser {
        command = command.env(SCREENSHOT_BROWSER_ENV, browser.to_string_lossy());
    }

    let pool_config = PoolConfig {
        size: processor.effective_processes(),
        queue_capacity: processor.queue_capacity.max(1),
        job_timeout: Duration::from_secs(processor.job_timeout_secs),
    };
    info!(
        processes = pool_config.size,
        queue_capacity = pool_config.queue_capacity,
        "Starting worker pool"
    );
    let pool = Arc::new(
        ProcessPool::start(command, pool_config)
            .await
            .context("Failed to start worker pool")?,
    );

    let addr = SocketAddr::new(processor.host, processor.port);
    let dispatcher = Dispatcher::bind(addr, Arc::clone(&pool))
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Dispatcher listening on {}", addr);

    dispatcher.run(shutdown_signal()).await;

    pool.shutdown().await;
    info!("Worker pool stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
