//! TCP front of the back tier: one request and one response per connection.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

use crate::protocol::{
    read_message, write_message, Message, ProcessPageRequest, ProcessPageResponse,
};

use super::pool::ProcessPool;

const LISTEN_BACKLOG: u32 = 1024;

/// How long a client may take to deliver its request frame.
pub const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Dispatcher {
    listener: TcpListener,
    pool: Arc<ProcessPool>,
    read_timeout: Duration,
}

impl Dispatcher {
    /// Bind `addr`, choosing the socket family from the address.
    pub async fn bind(addr: SocketAddr, pool: Arc<ProcessPool>) -> io::Result<Self> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;

        Ok(Self {
            listener,
            pool,
            read_timeout: REQUEST_READ_TIMEOUT,
        })
    }

    /// Override the bound on reading a request; idle connections are
    /// dropped once it elapses.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves. Each connection gets
    /// its own handler task, so slow jobs never hold up the acceptor.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Dispatcher shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let pool = Arc::clone(&self.pool);
                        let read_timeout = self.read_timeout;
                        tokio::spawn(async move {
                            handle_connection(stream, peer, &pool, read_timeout).await;
                        });
                    }
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    pool: &ProcessPool,
    read_timeout: Duration,
) {
    let message = match tokio::time::timeout(read_timeout, read_message(&mut stream)).await {
        Ok(Ok(message)) => message,
        Ok(Err(e)) => {
            warn!(peer = %peer, error = %e, "Failed to read request");
            return;
        }
        Err(_) => {
            warn!(peer = %peer, timeout_ms = read_timeout.as_millis() as u64, "Request read timed out");
            return;
        }
    };

    let response = dispatch(&message, pool).await;
    debug!(peer = %peer, success = response.is_success(), "Sending response");

    let sent = match response.to_message() {
        Ok(reply) => write_message(&mut stream, &reply).await,
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        warn!(peer = %peer, error = %e, "Failed to send response");
    }
    let _ = stream.shutdown().await;
}

/// Answer one request. Unknown actions are refused without touching the
/// pool; pool failures become error-shaped responses.
pub async fn dispatch(message: &Message, pool: &ProcessPool) -> ProcessPageResponse {
    let request = ProcessPageRequest::from_message(message);
    if !request.is_process_page() {
        return ProcessPageResponse::error(format!("unknown action: {:?}", request.action));
    }

    let url = request.url.clone();
    match pool.submit(request).await {
        Ok(data) => ProcessPageResponse::success(data),
        Err(e) => {
            warn!(url = %url, error = %e, "Processing failed");
            ProcessPageResponse::error(e.to_string())
        }
    }
}
