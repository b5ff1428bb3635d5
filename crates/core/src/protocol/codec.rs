//! Frame encoding and the two transport variants.

use std::io::{self, Read, Write};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A decoded protocol message. Only JSON objects are valid at the top level.
pub type Message = Map<String, Value>;

/// Size of the length header in bytes.
pub const HEADER_LEN: usize = 4;

/// Errors produced while framing or unframing messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream ended before a full header or payload was read.
    #[error("connection closed while reading {0}")]
    ConnectionClosed(&'static str),

    /// The payload decoded to valid JSON that is not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// The payload is not valid UTF-8 JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying transport error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Map an I/O error from a read, turning early EOF into `ConnectionClosed`.
    fn from_read(err: io::Error, part: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ProtocolError::ConnectionClosed(part)
        } else {
            ProtocolError::Io(err)
        }
    }
}

/// Serialize a message into a complete frame (header + payload).
pub fn encode_frame(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(message)?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        ProtocolError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "payload exceeds u32 length",
        ))
    })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode a payload (without header) into a message.
pub fn decode_payload(payload: &[u8]) -> Result<Message, ProtocolError> {
    match serde_json::from_slice::<Value>(payload)? {
        Value::Object(map) => Ok(map),
        _ => Err(ProtocolError::NotAnObject),
    }
}

/// Write one message to an async stream and flush it.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message from an async stream.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|e| ProtocolError::from_read(e, "header"))?;

    let mut payload = vec![0u8; u32::from_be_bytes(header) as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| ProtocolError::from_read(e, "payload"))?;

    decode_payload(&payload)
}

/// Write one message to a blocking stream. Returns only once the whole frame
/// has been handed to the transport and flushed.
pub fn write_message_blocking<W: Write>(
    writer: &mut W,
    message: &Message,
) -> Result<(), ProtocolError> {
    let frame = encode_frame(message)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one message from a blocking stream.
pub fn read_message_blocking<R: Read>(reader: &mut R) -> Result<Message, ProtocolError> {
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .map_err(|e| ProtocolError::from_read(e, "header"))?;

    let mut payload = vec![0u8; u32::from_be_bytes(header) as usize];
    reader
        .read_exact(&mut payload)
        .map_err(|e| ProtocolError::from_read(e, "payload"))?;

    decode_payload(&payload)
}
