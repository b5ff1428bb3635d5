//! Back-tier dispatcher.
//!
//! Accepts framed `process_page` requests over TCP and runs them on a pool
//! of worker processes, isolating analyzer crashes and memory from the
//! acceptor. The same binary acts as the worker via [`run_worker`].

mod pool;
mod server;
mod worker;

pub use pool::{PoolConfig, PoolStatus, ProcessPool, WorkerCommand, WorkerError};
pub use server::{dispatch, Dispatcher};
pub use worker::{handle_job, run_worker};
