//! Session lifecycle events delivered by the browser driver

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header name/value mapping as reported by the driver
pub type Headers = BTreeMap<String, String>;

/// Transport-level request identity assigned by the driver.
///
/// Two concurrent requests to the same URL carry different ids, so this is
/// the only key the correlator matches on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Console message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Debug,
    Info,
    Warning,
    Error,
}

/// One event from the driver's subscription.
///
/// Timestamps are monotonic milliseconds on the driver's clock; only their
/// differences are meaningful. `wall_time` anchors the request in real time
/// for the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    RequestIssued {
        id: RequestId,
        url: String,
        method: String,
        #[serde(default)]
        headers: Headers,
        timestamp_ms: f64,
        wall_time: DateTime<Utc>,
    },

    ResponseReceived {
        id: RequestId,
        status: u16,
        #[serde(default)]
        status_text: String,
        #[serde(default)]
        headers: Headers,
        #[serde(default)]
        mime_type: Option<String>,
        #[serde(default)]
        protocol: Option<String>,
        timestamp_ms: f64,
    },

    RequestFailed {
        id: RequestId,
        reason: String,
        timestamp_ms: f64,
    },

    Console {
        level: ConsoleLevel,
        text: String,
    },

    /// Uncaught exception in the page
    PageError {
        message: String,
    },
}

impl SessionEvent {
    /// Request identity carried by the event, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            SessionEvent::RequestIssued { id, .. }
            | SessionEvent::ResponseReceived { id, .. }
            | SessionEvent::RequestFailed { id, .. } => Some(id),
            SessionEvent::Console { .. } | SessionEvent::PageError { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recorded_event_line() {
        let line = r#"{"event":"response_received","id":"1000.7","status":404,"headers":{"content-type":"text/html"},"timestamp_ms":1520.5}"#;
        let event: SessionEvent = serde_json::from_str(line).unwrap();

        match &event {
            SessionEvent::ResponseReceived { status, status_text, protocol, .. } => {
                assert_eq!(*status, 404);
                assert!(status_text.is_empty());
                assert!(protocol.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(event.request_id().map(RequestId::as_str), Some("1000.7"));
    }

    #[test]
    fn test_console_event_has_no_request_id() {
        let line = r#"{"event":"console","level":"error","text":"Uncaught TypeError"}"#;
        let event: SessionEvent = serde_json::from_str(line).unwrap();
        assert!(event.request_id().is_none());
    }
}
