//! Client side of the inter-tier protocol.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::analysis::ProcessingData;
use crate::config::BackendConfig;
use crate::protocol::{
    read_message, write_message, ProcessPageRequest, ProcessPageResponse, ProtocolError,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cannot connect to processing server at {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("processing server did not answer within {0:?}")]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The back tier answered with an error-shaped response.
    #[error("processing failed: {0}")]
    Rejected(String),
}

/// Enrichment provider used by the orchestrator.
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    async fn process(&self, request: &ProcessPageRequest) -> Result<ProcessingData, BackendError>;
}

/// Talks to the dispatcher over a fresh TCP connection per request.
#[derive(Debug, Clone)]
pub struct TcpBackend {
    host: String,
    port: u16,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl TcpBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            response_timeout: Duration::from_secs(config.response_timeout_secs),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> Result<TcpStream, BackendError> {
        let connect_err = |reason: String| BackendError::Connect {
            address: self.address(),
            reason,
        };

        match timeout(
            self.connect_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(connect_err(e.to_string())),
            Err(_) => Err(connect_err(format!(
                "timed out after {:?}",
                self.connect_timeout
            ))),
        }
    }
}

#[async_trait]
impl ProcessingBackend for TcpBackend {
    async fn process(&self, request: &ProcessPageRequest) -> Result<ProcessingData, BackendError> {
        let message = request.to_message()?;
        let mut stream = self.connect().await?;
        debug!(address = %self.address(), url = %request.url, "Sent page to processing server");

        let exchange = async {
            write_message(&mut stream, &message).await?;
            read_message(&mut stream).await
        };
        let reply = timeout(self.response_timeout, exchange)
            .await
            .map_err(|_| BackendError::Timeout(self.response_timeout))??;

        let response = ProcessPageResponse::from_message(reply)?;
        if response.is_success() {
            Ok(response.processing_data)
        } else {
            Err(BackendError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}
