//! Terse pass/fail-oriented network summary

use serde::{Deserialize, Serialize};

use crate::correlator::RequestRecord;

/// Requests slower than this are listed as slow
pub const DEFAULT_SLOW_REQUEST_MS: f64 = 4000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRequest {
    pub url: String,
    pub method: String,
    pub failure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowRequest {
    pub url: String,
    pub method: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub url: String,
    pub method: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub url: String,
    pub method: String,
}

/// Summary over the terminal records of one session.
///
/// On the outcome axis every terminal record is exactly one of failed,
/// error (status >= 400) or ok, so `total_failed + total_ok + total_errors
/// == total_requests`. Slowness is an orthogonal tag. Records still pending
/// at compile time are listed separately and not counted in
/// `total_requests`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub failed_requests: Vec<FailedRequest>,
    pub slow_requests: Vec<SlowRequest>,
    pub error_responses: Vec<ErrorResponse>,
    pub pending_requests: Vec<PendingRequest>,
    pub total_requests: usize,
    pub total_failed: usize,
    pub total_slow: usize,
    pub total_errors: usize,
    pub total_ok: usize,
    pub total_pending: usize,
}

impl NetworkSummary {
    /// Whether any request failed outright or answered with an error status
    pub fn has_failures(&self) -> bool {
        self.total_failed > 0 || self.total_errors > 0
    }
}

/// Compile with the default 4000 ms slow-request threshold
pub fn compile_network_summary(records: &[RequestRecord]) -> NetworkSummary {
    compile_network_summary_with(records, DEFAULT_SLOW_REQUEST_MS)
}

pub fn compile_network_summary_with(records: &[RequestRecord], slow_threshold_ms: f64) -> NetworkSummary {
    let mut summary = NetworkSummary::default();

    for record in records {
        let Some(duration) = record.duration_ms() else {
            summary.pending_requests.push(PendingRequest {
                url: record.url.clone(),
                method: record.method.clone(),
            });
            continue;
        };

        summary.total_requests += 1;

        if let Some(reason) = record.failure_reason() {
            summary.failed_requests.push(FailedRequest {
                url: record.url.clone(),
                method: record.method.clone(),
                failure: reason.to_string(),
            });
        } else if let Some(status) = record.response().map(|r| r.status).filter(|s| *s >= 400) {
            summary.error_responses.push(ErrorResponse {
                url: record.url.clone(),
                method: record.method.clone(),
                status,
            });
        } else {
            summary.total_ok += 1;
        }

        if duration > slow_threshold_ms {
            summary.slow_requests.push(SlowRequest {
                url: record.url.clone(),
                method: record.method.clone(),
                duration,
            });
        }
    }

    summary.total_failed = summary.failed_requests.len();
    summary.total_errors = summary.error_responses.len();
    summary.total_slow = summary.slow_requests.len();
    summary.total_pending = summary.pending_requests.len();
    summary
}
