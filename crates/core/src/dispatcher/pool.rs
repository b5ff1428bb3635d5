//! Fixed-size pool of worker processes.
//!
//! Each slot owns at most one long-lived child and talks to it over its
//! stdin/stdout with the framed protocol. Slots pull jobs from one shared
//! bounded queue, so a busy worker never holds up another's job. A child that
//! dies or times out is discarded and replaced on the slot's next job.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analysis::ProcessingData;
use crate::protocol::{read_message, write_message, ProcessPageRequest, ProcessPageResponse};

/// How long a worker gets to exit after its stdin closes.
const WORKER_EXIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    /// The worker exited or broke the protocol mid-job.
    #[error("worker crashed: {0}")]
    Crashed(String),

    #[error("job exceeded {0:?}")]
    Timeout(Duration),

    /// The worker answered with an error response.
    #[error("{0}")]
    Failed(String),

    #[error("worker pool is closed")]
    PoolClosed,
}

/// Program and arguments used to start a worker process.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn spawn(&self) -> Result<WorkerProcess, WorkerError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerError::Spawn(format!("{}: {}", self.program.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Spawn("worker stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Spawn("worker stdout not captured".to_string()))?;

        Ok(WorkerProcess {
            child,
            stdin,
            stdout,
        })
    }
}

struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl WorkerProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Describe how a dead worker ended, killing it if it is still around.
    async fn reap(mut self) -> String {
        let _ = self.child.start_kill();
        match self.child.wait().await {
            Ok(status) => status.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Close stdin and give the worker a moment to exit on its own.
    async fn shutdown(self) {
        let WorkerProcess {
            mut child, stdin, ..
        } = self;
        drop(stdin);
        if timeout(WORKER_EXIT_GRACE, child.wait()).await.is_err() {
            let _ = child.kill().await;
        }
    }
}

/// Snapshot of pool activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Number of worker slots.
    pub size: usize,
    /// Jobs currently executing.
    pub active: usize,
    /// Jobs waiting for a free slot.
    pub queued: usize,
    /// Jobs finished successfully since startup.
    pub processed: u64,
    /// Jobs finished with an error since startup.
    pub failed: u64,
    /// Workers replaced after a crash or timeout.
    pub restarts: u64,
}

#[derive(Default)]
struct PoolStats {
    active: AtomicUsize,
    queued: AtomicUsize,
    processed: AtomicU64,
    failed: AtomicU64,
    restarts: AtomicU64,
}

struct Job {
    request: ProcessPageRequest,
    reply: oneshot::Sender<Result<ProcessingData, WorkerError>>,
}

/// Settings for a [`ProcessPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub size: usize,
    pub queue_capacity: usize,
    pub job_timeout: Duration,
}

pub struct ProcessPool {
    sender: RwLock<Option<mpsc::Sender<Job>>>,
    slots: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<PoolStats>,
    size: usize,
}

impl ProcessPool {
    /// Start the pool. Workers are spawned eagerly so that a bad command
    /// fails here rather than on the first job.
    pub async fn start(command: WorkerCommand, config: PoolConfig) -> Result<Self, WorkerError> {
        let size = config.size.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let stats = Arc::new(PoolStats::default());

        let mut slots = Vec::with_capacity(size);
        for index in 0..size {
            let process = command.spawn()?;
            debug!(slot = index, pid = ?process.pid(), "Worker started");

            let slot = Slot {
                index,
                command: command.clone(),
                receiver: Arc::clone(&receiver),
                stats: Arc::clone(&stats),
                job_timeout: config.job_timeout,
            };
            slots.push(tokio::spawn(slot.run(Some(process))));
        }

        info!(size, queue_capacity = config.queue_capacity, "Worker pool started");

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            slots: Mutex::new(slots),
            stats,
            size,
        })
    }

    /// Run one job on the next free worker. Waits while the queue is full.
    pub async fn submit(&self, request: ProcessPageRequest) -> Result<ProcessingData, WorkerError> {
        let sender = self
            .sender
            .read()
            .await
            .clone()
            .ok_or(WorkerError::PoolClosed)?;

        let (reply, outcome) = oneshot::channel();
        self.stats.queued.fetch_add(1, Ordering::SeqCst);
        if sender.send(Job { request, reply }).await.is_err() {
            self.stats.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(WorkerError::PoolClosed);
        }

        outcome.await.map_err(|_| WorkerError::PoolClosed)?
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.size,
            active: self.stats.active.load(Ordering::SeqCst),
            queued: self.stats.queued.load(Ordering::SeqCst),
            processed: self.stats.processed.load(Ordering::SeqCst),
            failed: self.stats.failed.load(Ordering::SeqCst),
            restarts: self.stats.restarts.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting jobs, let queued ones finish and stop every worker.
    pub async fn shutdown(&self) {
        self.sender.write().await.take();
        let slots: Vec<_> = self.slots.lock().await.drain(..).collect();
        futures::future::join_all(slots).await;
        let status = self.status();
        info!(
            processed = status.processed,
            failed = status.failed,
            restarts = status.restarts,
            "Worker pool stopped"
        );
    }
}

struct Slot {
    index: usize,
    command: WorkerCommand,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    stats: Arc<PoolStats>,
    job_timeout: Duration,
}

impl Slot {
    async fn run(self, mut worker: Option<WorkerProcess>) {
        loop {
            let job = self.receiver.lock().await.recv().await;
            let Some(job) = job else { break };

            self.stats.queued.fetch_sub(1, Ordering::SeqCst);
            self.stats.active.fetch_add(1, Ordering::SeqCst);
            let outcome = self.execute(&mut worker, &job.request).await;
            self.stats.active.fetch_sub(1, Ordering::SeqCst);

            match &outcome {
                Ok(_) => {
                    self.stats.processed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::SeqCst);
                    warn!(slot = self.index, url = %job.request.url, error = %e, "Job failed");
                }
            }

            // The submitter may have gone away; nothing to do then.
            let _ = job.reply.send(outcome);
        }

        if let Some(process) = worker {
            process.shutdown().await;
        }
        debug!(slot = self.index, "Worker slot stopped");
    }

    async fn execute(
        &self,
        worker: &mut Option<WorkerProcess>,
        request: &ProcessPageRequest,
    ) -> Result<ProcessingData, WorkerError> {
        let message = request
            .to_message()
            .map_err(|e| WorkerError::Failed(e.to_string()))?;

        let mut process = match worker.take() {
            Some(process) => process,
            None => {
                let process = self.command.spawn()?;
                self.stats.restarts.fetch_add(1, Ordering::SeqCst);
                info!(slot = self.index, pid = ?process.pid(), "Worker respawned");
                process
            }
        };

        let exchange = async {
            write_message(&mut process.stdin, &message).await?;
            read_message(&mut process.stdout).await
        };

        match timeout(self.job_timeout, exchange).await {
            Ok(Ok(reply)) => {
                let response = ProcessPageResponse::from_message(reply);
                *worker = Some(process);
                match response {
                    Ok(response) if response.is_success() => Ok(response.processing_data),
                    Ok(response) => Err(WorkerError::Failed(
                        response
                            .error
                            .unwrap_or_else(|| "unknown worker error".to_string()),
                    )),
                    Err(e) => Err(WorkerError::Failed(format!("malformed worker reply: {}", e))),
                }
            }
            Ok(Err(e)) => {
                let exit = process.reap().await;
                Err(WorkerError::Crashed(format!("{} ({})", e, exit)))
            }
            Err(_) => {
                let _ = process.reap().await;
                Err(WorkerError::Timeout(self.job_timeout))
            }
        }
    }
}
