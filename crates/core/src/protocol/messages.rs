//! Typed views over the messages exchanged between the tiers.
//!
//! The dispatcher and the worker pipes carry the same two shapes: a
//! `process_page` request and a response whose error variant is structurally
//! identical to the success variant.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::ProcessingData;
use crate::page::ScrapingData;

use super::codec::{Message, ProtocolError};

/// The only action the back tier understands.
pub const PROCESS_PAGE_ACTION: &str = "process_page";

/// Request sent from the front tier to the back tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPageRequest {
    pub action: String,
    pub url: String,
    #[serde(default)]
    pub scraping_data: ScrapingData,
    #[serde(default)]
    pub html: String,
}

impl ProcessPageRequest {
    pub fn new(url: impl Into<String>, scraping_data: ScrapingData, html: impl Into<String>) -> Self {
        Self {
            action: PROCESS_PAGE_ACTION.to_string(),
            url: url.into(),
            scraping_data,
            html: html.into(),
        }
    }

    pub fn to_message(&self) -> Result<Message, ProtocolError> {
        to_message(self)
    }

    /// Lenient decode: missing or mistyped fields fall back to empty values so
    /// that the dispatcher can always answer with a well-formed response.
    pub fn from_message(message: &Message) -> Self {
        let text = |key: &str| {
            message
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let scraping_data = message
            .get("scraping_data")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Self {
            action: text("action"),
            url: text("url"),
            scraping_data,
            html: text("html"),
        }
    }

    pub fn is_process_page(&self) -> bool {
        self.action == PROCESS_PAGE_ACTION
    }
}

/// Outcome marker carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response returned by the back tier (and by each worker process).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPageResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub processing_data: ProcessingData,
}

impl ProcessPageResponse {
    pub fn success(processing_data: ProcessingData) -> Self {
        Self {
            status: ResponseStatus::Success,
            error: None,
            processing_data,
        }
    }

    /// Error response carrying the all-null placeholder payload.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            error: Some(message.into()),
            processing_data: ProcessingData::placeholder(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    pub fn to_message(&self) -> Result<Message, ProtocolError> {
        to_message(self)
    }

    pub fn from_message(message: Message) -> Result<Self, ProtocolError> {
        from_message(message)
    }
}

fn to_message<T: Serialize>(value: &T) -> Result<Message, ProtocolError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(ProtocolError::NotAnObject),
    }
}

fn from_message<T: DeserializeOwned>(message: Message) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(Value::Object(message))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = ProcessPageRequest::new("https://example.com", ScrapingData::default(), "<html>");
        let message = request.to_message().unwrap();
        assert_eq!(message["action"], "process_page");
        assert_eq!(message["url"], "https://example.com");
        assert_eq!(message["html"], "<html>");
        assert!(message["scraping_data"].is_object());
    }

    #[test]
    fn test_request_lenient_decode() {
        let message = match json!({
            "action": "process_page",
            "url": "https://example.com",
            "scraping_data": "not an object",
            "html": 17,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let request = ProcessPageRequest::from_message(&message);
        assert!(request.is_process_page());
        assert_eq!(request.scraping_data, ScrapingData::default());
        assert_eq!(request.html, "");
    }

    #[test]
    fn test_request_missing_action() {
        let request = ProcessPageRequest::from_message(&Message::new());
        assert!(!request.is_process_page());
        assert_eq!(request.action, "");
    }

    #[test]
    fn test_error_and_success_share_shape() {
        let ok = ProcessPageResponse::success(ProcessingData::placeholder())
            .to_message()
            .unwrap();
        let err = ProcessPageResponse::error("boom").to_message().unwrap();

        let ok_keys: Vec<_> = ok["processing_data"].as_object().unwrap().keys().collect();
        let err_keys: Vec<_> = err["processing_data"].as_object().unwrap().keys().collect();
        assert_eq!(ok_keys, err_keys);
        assert_eq!(err["status"], "error");
        assert_eq!(err["error"], "boom");
        assert!(ok.get("error").is_none());
    }

    #[test]
    fn test_response_decode() {
        let message = match json!({
            "status": "success",
            "processing_data": {
                "screenshot": "aGVsbG8=",
                "performance": null,
                "thumbnails": [],
                "advanced": null
            }
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let response = ProcessPageResponse::from_message(message).unwrap();
        assert!(response.is_success());
        assert_eq!(response.processing_data.screenshot.as_deref(), Some("aGVsbG8="));
        assert_eq!(response.processing_data.thumbnails, Some(vec![]));
    }
}
