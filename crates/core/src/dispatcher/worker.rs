//! Worker-process side of the pool.
//!
//! A worker reads framed requests from its input, runs the analyzers and
//! writes one framed response per request, until the input closes.

use std::any::Any;
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::analysis::{analyze_page, AnalyzerOptions, ProcessingData};
use crate::protocol::{
    read_message_blocking, write_message_blocking, Message, ProcessPageRequest,
    ProcessPageResponse, ProtocolError,
};

/// Serve jobs until `input` reaches end of stream.
pub fn run_worker<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    options: &AnalyzerOptions,
) -> Result<(), ProtocolError> {
    loop {
        let message = match read_message_blocking(input) {
            Ok(message) => message,
            Err(ProtocolError::ConnectionClosed(_)) => {
                debug!("Input closed, worker exiting");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let response = handle_job(&message, |request| {
            analyze_page(
                &request.url,
                &request.scraping_data,
                &request.html,
                options,
            )
        });
        write_message_blocking(output, &response.to_message()?)?;
    }
}

/// Run `analyze` for one request, turning panics into error responses.
pub fn handle_job<F>(message: &Message, analyze: F) -> ProcessPageResponse
where
    F: FnOnce(&ProcessPageRequest) -> ProcessingData,
{
    let request = ProcessPageRequest::from_message(message);
    if !request.is_process_page() {
        return ProcessPageResponse::error(format!("unknown action: {:?}", request.action));
    }

    match panic::catch_unwind(AssertUnwindSafe(|| analyze(&request))) {
        Ok(data) => ProcessPageResponse::success(data),
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(url = %request.url, reason = %reason, "Analyzer panicked");
            ProcessPageResponse::error(format!("analyzer panicked: {}", reason))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
