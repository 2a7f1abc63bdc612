//! HAR 1.2 archive compiler
//!
//! Field names follow the public HTTP Archive format so the output opens in
//! browser devtools and third-party HAR viewers. Timings the driver cannot
//! measure independently are `-1` ("unknown"), never zero.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::correlator::RequestRecord;
use crate::events::Headers;

pub const HAR_VERSION: &str = "1.2";
pub const PAGE_ID: &str = "page_1";

/// HAR sentinel for a value that was not measured
pub const UNKNOWN: f64 = -1.0;
const UNKNOWN_SIZE: i64 = -1;
const DEFAULT_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarArchive {
    pub log: HarLog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarLog {
    pub version: String,
    pub creator: HarCreator,
    pub pages: Vec<HarPage>,
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarCreator {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarPage {
    pub started_date_time: String,
    pub id: String,
    pub title: String,
    pub page_timings: HarPageTimings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarPageTimings {
    pub on_content_load: f64,
    pub on_load: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarEntry {
    pub pageref: String,
    pub started_date_time: String,
    pub time: f64,
    pub request: HarRequest,
    pub response: HarResponse,
    pub cache: HarCache,
    pub timings: HarTimings,
    /// Transport failure text, as Chromium writes it for failed requests
    #[serde(rename = "_error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarNameValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub cookies: Vec<HarNameValue>,
    pub headers: Vec<HarNameValue>,
    pub query_string: Vec<HarNameValue>,
    pub headers_size: i64,
    pub body_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarResponse {
    pub status: u16,
    pub status_text: String,
    pub http_version: String,
    pub cookies: Vec<HarNameValue>,
    pub headers: Vec<HarNameValue>,
    pub content: HarContent,
    #[serde(rename = "redirectURL")]
    pub redirect_url: String,
    pub headers_size: i64,
    pub body_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
    pub size: i64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarCache {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarTimings {
    pub blocked: f64,
    pub dns: f64,
    pub connect: f64,
    pub send: f64,
    pub wait: f64,
    pub receive: f64,
    pub ssl: f64,
}

impl HarTimings {
    /// Only the end-to-end wait is known; everything else is unknown or zero
    /// where the format forbids the sentinel.
    fn from_wait(wait: f64) -> Self {
        Self {
            blocked: UNKNOWN,
            dns: UNKNOWN,
            connect: UNKNOWN,
            send: 0.0,
            wait,
            receive: 0.0,
            ssl: UNKNOWN,
        }
    }
}

impl HarArchive {
    pub fn entries(&self) -> &[HarEntry] {
        &self.log.entries
    }
}

/// Build the archive for one page from the ledger.
///
/// Only terminal records become entries; pending requests are left out
/// entirely rather than emitted half-filled.
pub fn compile_har(records: &[RequestRecord], page_url: &str) -> HarArchive {
    let entries: Vec<HarEntry> = records.iter().filter_map(to_entry).collect();

    let page_started = records
        .iter()
        .map(|r| r.wall_time)
        .min()
        .unwrap_or_else(Utc::now);

    HarArchive {
        log: HarLog {
            version: HAR_VERSION.to_string(),
            creator: HarCreator {
                name: "shopwatch".to_string(),
                version: crate::VERSION.to_string(),
            },
            pages: vec![HarPage {
                started_date_time: iso(page_started),
                id: PAGE_ID.to_string(),
                title: page_url.to_string(),
                page_timings: HarPageTimings {
                    on_content_load: UNKNOWN,
                    on_load: UNKNOWN,
                },
            }],
            entries,
        },
    }
}

fn to_entry(record: &RequestRecord) -> Option<HarEntry> {
    let duration = record.duration_ms()?;
    let response = record.response();
    let http_version = http_version(response.and_then(|r| r.protocol.as_deref()));

    let har_response = match response {
        Some(info) => HarResponse {
            status: info.status,
            status_text: info.status_text.clone(),
            http_version: http_version.clone(),
            cookies: Vec::new(),
            headers: name_values(&info.headers),
            content: HarContent {
                size: UNKNOWN_SIZE,
                mime_type: info.content_type().unwrap_or(DEFAULT_MIME).to_string(),
            },
            redirect_url: redirect_location(info.status, &info.headers),
            headers_size: UNKNOWN_SIZE,
            body_size: UNKNOWN_SIZE,
        },
        // Failed before any response: status 0, as browsers export it.
        None => HarResponse {
            status: 0,
            status_text: String::new(),
            http_version: http_version.clone(),
            cookies: Vec::new(),
            headers: Vec::new(),
            content: HarContent {
                size: 0,
                mime_type: DEFAULT_MIME.to_string(),
            },
            redirect_url: String::new(),
            headers_size: UNKNOWN_SIZE,
            body_size: UNKNOWN_SIZE,
        },
    };

    Some(HarEntry {
        pageref: PAGE_ID.to_string(),
        started_date_time: iso(record.wall_time),
        time: duration,
        request: HarRequest {
            method: record.method.clone(),
            url: record.url.clone(),
            http_version,
            cookies: Vec::new(),
            headers: name_values(&record.request_headers),
            query_string: query_string(&record.url),
            headers_size: UNKNOWN_SIZE,
            body_size: UNKNOWN_SIZE,
        },
        response: har_response,
        cache: HarCache::default(),
        timings: HarTimings::from_wait(duration),
        error: record.failure_reason().map(str::to_string),
    })
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn name_values(headers: &Headers) -> Vec<HarNameValue> {
    headers
        .iter()
        .map(|(name, value)| HarNameValue {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Unparseable URLs (data:, blob: oddities) get an empty query list
fn query_string(raw: &str) -> Vec<HarNameValue> {
    match url::Url::parse(raw) {
        Ok(parsed) => parsed
            .query_pairs()
            .map(|(name, value)| HarNameValue {
                name: name.into_owned(),
                value: value.into_owned(),
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn redirect_location(status: u16, headers: &Headers) -> String {
    if !(300..400).contains(&status) {
        return String::new();
    }
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("location"))
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

fn http_version(protocol: Option<&str>) -> String {
    match protocol.map(|p| p.to_ascii_lowercase()).as_deref() {
        Some("h2") | Some("http/2") | Some("http/2.0") => "HTTP/2",
        Some("h3") | Some("http/3") => "HTTP/3",
        Some("http/1.0") => "HTTP/1.0",
        _ => "HTTP/1.1",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::{EventCorrelator, ResponseInfo};
    use crate::events::RequestId;

    fn response(status: u16, headers: Headers) -> ResponseInfo {
        ResponseInfo {
            status,
            status_text: "OK".into(),
            headers,
            mime_type: None,
            protocol: Some("h2".into()),
        }
    }

    fn issue(c: &mut EventCorrelator, id: &str, url: &str) {
        c.on_request_issued(RequestId::from(id), url.into(), "GET".into(), Headers::new(), 0.0, Utc::now());
    }

    #[test]
    fn test_pending_records_are_excluded() {
        let mut c = EventCorrelator::new();
        issue(&mut c, "1", "https://shop.test/a");
        issue(&mut c, "2", "https://shop.test/b");
        issue(&mut c, "3", "https://shop.test/c");
        c.on_response_received(&RequestId::from("1"), response(200, Headers::new()), 80.0);
        c.on_request_failed(&RequestId::from("3"), "net::ERR_BLOCKED_BY_CLIENT".into(), 5.0);

        let har = compile_har(c.records(), "https://shop.test/");
        assert_eq!(har.entries().len(), 2);
        assert_eq!(har.entries()[1].response.status, 0);
        assert_eq!(har.entries()[1].error.as_deref(), Some("net::ERR_BLOCKED_BY_CLIENT"));
        assert_eq!(har.log.pages[0].title, "https://shop.test/");
    }

    #[test]
    fn test_entry_fields_and_sentinels() {
        let mut headers = Headers::new();
        headers.insert("content-type".into(), "text/html; charset=utf-8".into());
        let mut c = EventCorrelator::new();
        issue(&mut c, "1", "https://shop.test/search?q=athena+pro&page=2");
        c.on_response_received(&RequestId::from("1"), response(200, headers), 250.0);

        let har = compile_har(c.records(), "https://shop.test/");
        let entry = &har.entries()[0];
        assert_eq!(entry.time, 250.0);
        assert_eq!(entry.timings.wait, 250.0);
        assert_eq!(entry.timings.dns, UNKNOWN);
        assert_eq!(entry.timings.connect, UNKNOWN);
        assert_eq!(entry.timings.ssl, UNKNOWN);
        assert_eq!(entry.timings.blocked, UNKNOWN);
        assert_eq!(entry.response.http_version, "HTTP/2");
        assert_eq!(entry.response.content.mime_type, "text/html; charset=utf-8");
        assert_eq!(
            entry.request.query_string,
            vec![
                HarNameValue { name: "q".into(), value: "athena pro".into() },
                HarNameValue { name: "page".into(), value: "2".into() },
            ]
        );
    }

    #[test]
    fn test_public_field_names() {
        let mut headers = Headers::new();
        headers.insert("Location".into(), "/cart".into());
        let mut c = EventCorrelator::new();
        issue(&mut c, "1", "https://shop.test/cart/add");
        c.on_response_received(&RequestId::from("1"), response(302, headers), 10.0);

        let json = serde_json::to_value(compile_har(c.records(), "https://shop.test/")).unwrap();
        let entry = &json["log"]["entries"][0];
        assert_eq!(json["log"]["version"], "1.2");
        assert_eq!(entry["response"]["redirectURL"], "/cart");
        assert!(entry["request"]["queryString"].is_array());
        assert!(entry["startedDateTime"].is_string());
        assert!(entry.get("_error").is_none());
        assert_eq!(json["log"]["pages"][0]["pageTimings"]["onLoad"], -1.0);
    }

    #[test]
    fn test_unparseable_url_has_empty_query() {
        assert!(query_string("not a url").is_empty());
    }
}
