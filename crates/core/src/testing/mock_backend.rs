//! Mock processing backend for testing.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::analysis::ProcessingData;
use crate::orchestrator::{BackendError, ProcessingBackend};
use crate::protocol::ProcessPageRequest;

/// How the mock answers.
#[derive(Debug, Clone)]
enum Behavior {
    Respond(ProcessingData),
    Unavailable,
    Reject(String),
}

/// Mock implementation of the ProcessingBackend trait.
///
/// Answers with canned processing data by default and records every
/// request. Can be switched to simulate an unreachable back tier or an
/// error-shaped response.
#[derive(Debug)]
pub struct MockBackend {
    behavior: RwLock<Behavior>,
    delay: RwLock<Option<Duration>>,
    requests: RwLock<Vec<ProcessPageRequest>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend answering with [`fixtures::processing_data`](super::fixtures::processing_data).
    pub fn new() -> Self {
        Self::responding(super::fixtures::processing_data())
    }

    pub fn responding(data: ProcessingData) -> Self {
        Self::with_behavior(Behavior::Respond(data))
    }

    /// Backend that refuses every connection.
    pub fn unavailable() -> Self {
        Self::with_behavior(Behavior::Unavailable)
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior: RwLock::new(behavior),
            delay: RwLock::new(None),
            requests: RwLock::new(Vec::new()),
        }
    }

    pub async fn set_response(&self, data: ProcessingData) {
        *self.behavior.write().await = Behavior::Respond(data);
    }

    pub async fn set_unavailable(&self) {
        *self.behavior.write().await = Behavior::Unavailable;
    }

    /// Answer with an error-shaped response carrying `message`.
    pub async fn set_rejecting(&self, message: &str) {
        *self.behavior.write().await = Behavior::Reject(message.to_string());
    }

    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    pub async fn recorded_requests(&self) -> Vec<ProcessPageRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl ProcessingBackend for MockBackend {
    async fn process(&self, request: &ProcessPageRequest) -> Result<ProcessingData, BackendError> {
        self.requests.write().await.push(request.clone());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.behavior.read().await.clone() {
            Behavior::Respond(data) => Ok(data),
            Behavior::Unavailable => Err(BackendError::Connect {
                address: "mock".to_string(),
                reason: "connection refused".to_string(),
            }),
            Behavior::Reject(message) => Err(BackendError::Rejected(message)),
        }
    }
}
