//! Length-prefixed JSON framing shared by both tiers.
//!
//! Every frame is a 4-byte unsigned big-endian payload length followed by the
//! payload: UTF-8 JSON text that must decode to an object. The same
//! encode/decode functions back two transports:
//!
//! - [`read_message`] / [`write_message`] for tokio streams (the front tier,
//!   the dispatcher, and the pool side of worker pipes)
//! - [`read_message_blocking`] / [`write_message_blocking`] for `std::io`
//!   streams (the worker process side of its stdin/stdout)
//!
//! No maximum frame length is enforced.

mod codec;
mod messages;

pub use codec::{
    decode_payload, encode_frame, read_message, read_message_blocking, write_message,
    write_message_blocking, Message, ProtocolError, HEADER_LEN,
};
pub use messages::{
    ProcessPageRequest, ProcessPageResponse, ResponseStatus, PROCESS_PAGE_ACTION,
};
