//! Event correlator - the per-session request ledger
//!
//! Every record moves through exactly one transition, `pending -> terminal`,
//! keyed by the driver's request id. Handlers are synchronous and never
//! yield, so the owning journey task can apply them without locks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::events::{ConsoleLevel, Headers, RequestId, SessionEvent};

/// Response half of a terminal record
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub mime_type: Option<String>,
    pub protocol: Option<String>,
}

impl ResponseInfo {
    /// Content type from the explicit mime type or a case-insensitive header lookup
    pub fn content_type(&self) -> Option<&str> {
        self.mime_type.as_deref().filter(|m| !m.is_empty()).or_else(|| {
            self.headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                .map(|(_, value)| value.as_str())
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalKind {
    Responded(ResponseInfo),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub ended_at_ms: f64,
    pub kind: TerminalKind,
}

/// One outbound request observed during the session
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub id: RequestId,
    pub url: String,
    pub method: String,
    pub request_headers: Headers,
    pub started_at_ms: f64,
    pub wall_time: DateTime<Utc>,
    /// Set once, by whichever terminal event arrives first
    pub outcome: Option<Terminal>,
}

impl RequestRecord {
    pub fn is_pending(&self) -> bool {
        self.outcome.is_none()
    }

    pub fn ended_at_ms(&self) -> Option<f64> {
        self.outcome.as_ref().map(|t| t.ended_at_ms)
    }

    /// Elapsed time between issue and terminal event; clamped at zero
    pub fn duration_ms(&self) -> Option<f64> {
        self.ended_at_ms().map(|end| (end - self.started_at_ms).max(0.0))
    }

    pub fn response(&self) -> Option<&ResponseInfo> {
        match &self.outcome {
            Some(Terminal { kind: TerminalKind::Responded(info), .. }) => Some(info),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            Some(Terminal { kind: TerminalKind::Failed(reason), .. }) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleEntry {
    #[serde(rename = "type")]
    pub level: ConsoleLevel,
    pub text: String,
}

/// Request ledger plus console capture for exactly one browser session
#[derive(Debug, Default)]
pub struct EventCorrelator {
    records: Vec<RequestRecord>,
    index: HashMap<RequestId, usize>,
    console: Vec<ConsoleEntry>,
    errors: Vec<String>,
    ignored_events: usize,
}

impl EventCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one driver event to the ledger
    pub fn observe(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::RequestIssued { id, url, method, headers, timestamp_ms, wall_time } => {
                self.on_request_issued(id, url, method, headers, timestamp_ms, wall_time)
            }
            SessionEvent::ResponseReceived {
                id,
                status,
                status_text,
                headers,
                mime_type,
                protocol,
                timestamp_ms,
            } => self.on_response_received(
                &id,
                ResponseInfo { status, status_text, headers, mime_type, protocol },
                timestamp_ms,
            ),
            SessionEvent::RequestFailed { id, reason, timestamp_ms } => {
                self.on_request_failed(&id, reason, timestamp_ms)
            }
            SessionEvent::Console { level, text } => self.on_console(level, text),
            SessionEvent::PageError { message } => self.on_page_error(message),
        }
    }

    /// Apply every event already queued on the driver channel.
    ///
    /// Never waits: events still in flight are picked up by a later drain.
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = rx.try_recv() {
            self.observe(event);
            applied += 1;
        }
        if applied > 0 {
            trace!("Drained {} session event(s)", applied);
        }
        applied
    }

    pub fn on_request_issued(
        &mut self,
        id: RequestId,
        url: String,
        method: String,
        headers: Headers,
        timestamp_ms: f64,
        wall_time: DateTime<Utc>,
    ) {
        if self.index.contains_key(&id) {
            debug!("Duplicate request-issued for {} ignored", id);
            self.ignored_events += 1;
            return;
        }

        self.index.insert(id.clone(), self.records.len());
        self.records.push(RequestRecord {
            id,
            url,
            method,
            request_headers: headers,
            started_at_ms: timestamp_ms,
            wall_time,
            outcome: None,
        });
    }

    pub fn on_response_received(&mut self, id: &RequestId, response: ResponseInfo, timestamp_ms: f64) {
        self.settle(id, timestamp_ms, TerminalKind::Responded(response));
    }

    pub fn on_request_failed(&mut self, id: &RequestId, reason: String, timestamp_ms: f64) {
        self.settle(id, timestamp_ms, TerminalKind::Failed(reason));
    }

    pub fn on_console(&mut self, level: ConsoleLevel, text: String) {
        if level == ConsoleLevel::Error {
            self.errors.push(text.clone());
        }
        self.console.push(ConsoleEntry { level, text });
    }

    pub fn on_page_error(&mut self, message: String) {
        self.errors.push(format!("Page Error: {}", message));
    }

    fn settle(&mut self, id: &RequestId, timestamp_ms: f64, kind: TerminalKind) {
        let Some(&slot) = self.index.get(id) else {
            // Unknown identity: late delivery after teardown or reordering.
            debug!("Terminal event for unknown request {} ignored", id);
            self.ignored_events += 1;
            return;
        };

        let record = &mut self.records[slot];
        if record.outcome.is_some() {
            debug!("Second terminal event for {} ({}) ignored", id, record.url);
            self.ignored_events += 1;
            return;
        }

        record.outcome = Some(Terminal { ended_at_ms: timestamp_ms, kind });
    }

    /// Records in the order their requests were issued
    pub fn records(&self) -> &[RequestRecord] {
        &self.records
    }

    pub fn get(&self, id: &RequestId) -> Option<&RequestRecord> {
        self.index.get(id).map(|&slot| &self.records[slot])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_pending()).count()
    }

    pub fn console_entries(&self) -> &[ConsoleEntry] {
        &self.console
    }

    /// Console errors and uncaught page errors, in arrival order
    pub fn error_messages(&self) -> &[String] {
        &self.errors
    }

    /// Events dropped as duplicates, late, or for unknown identities
    pub fn ignored_events(&self) -> usize {
        self.ignored_events
    }
}
