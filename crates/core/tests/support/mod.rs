//! Scripted in-memory browser session for integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shopwatch_core::events::{ConsoleLevel, SessionEvent};
use shopwatch_core::{BrowserSession, DriverError, RequestId};
use tokio::sync::mpsc;

/// Replays scripted answers in order; the last answer sticks
#[derive(Debug)]
struct Script<T: Clone> {
    answers: VecDeque<T>,
}

impl<T: Clone> Script<T> {
    fn next(&mut self) -> Option<T> {
        if self.answers.len() > 1 {
            self.answers.pop_front()
        } else {
            self.answers.front().cloned()
        }
    }
}

#[derive(Default)]
struct State {
    url: String,
    navigate_on_click: Option<String>,
    fail_clicks: bool,
    visibility: HashMap<String, Script<bool>>,
    flashes: HashMap<String, Duration>,
    clicked_at: Option<Instant>,
    texts: HashMap<String, Script<Option<String>>>,
    attributes: HashMap<(String, String), Script<Option<String>>>,
    evaluate_result: Value,
    visibility_checks: HashMap<String, usize>,
    clicks: Vec<String>,
    keys: Vec<String>,
    scripts: Vec<String>,
    headers: BTreeMap<String, String>,
    sender: Option<mpsc::UnboundedSender<SessionEvent>>,
}

#[derive(Default)]
pub struct ScriptedSession {
    state: Mutex<State>,
    closed: AtomicBool,
}

impl ScriptedSession {
    pub fn new(url: &str) -> Self {
        let session = Self::default();
        session.state.lock().unwrap().url = url.to_string();
        session
    }

    pub fn visible(self, selector: &str, answers: &[bool]) -> Self {
        self.state.lock().unwrap().visibility.insert(
            selector.to_string(),
            Script { answers: answers.iter().copied().collect() },
        );
        self
    }

    /// Visible only for `window` after the most recent successful click
    pub fn flashes_after_click(self, selector: &str, window: Duration) -> Self {
        self.state.lock().unwrap().flashes.insert(selector.to_string(), window);
        self
    }

    pub fn texts(self, selector: &str, answers: &[Option<&str>]) -> Self {
        self.state.lock().unwrap().texts.insert(
            selector.to_string(),
            Script { answers: answers.iter().map(|a| a.map(str::to_string)).collect() },
        );
        self
    }

    pub fn attribute(self, selector: &str, name: &str, answers: &[Option<&str>]) -> Self {
        self.state.lock().unwrap().attributes.insert(
            (selector.to_string(), name.to_string()),
            Script { answers: answers.iter().map(|a| a.map(str::to_string)).collect() },
        );
        self
    }

    pub fn navigate_on_click(self, url: &str) -> Self {
        self.state.lock().unwrap().navigate_on_click = Some(url.to_string());
        self
    }

    pub fn failing_clicks(self) -> Self {
        self.state.lock().unwrap().fail_clicks = true;
        self
    }

    pub fn evaluates_to(self, value: Value) -> Self {
        self.state.lock().unwrap().evaluate_result = value;
        self
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn emit(&self, event: SessionEvent) {
        let state = self.state.lock().unwrap();
        let sender = state.sender.as_ref().expect("subscribe_events not called");
        sender.send(event).expect("receiver dropped");
    }

    pub fn visibility_checks(&self, selector: &str) -> usize {
        self.state.lock().unwrap().visibility_checks.get(selector).copied().unwrap_or(0)
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn installed_scripts(&self) -> usize {
        self.state.lock().unwrap().scripts.len()
    }

    pub fn extra_headers(&self) -> BTreeMap<String, String> {
        self.state.lock().unwrap().headers.clone()
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.is_closed() {
            Err(DriverError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    fn subscribe_events(&self) -> Result<mpsc::UnboundedReceiver<SessionEvent>, DriverError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().sender = Some(tx);
        Ok(rx)
    }

    async fn install_before_any_page_script(&self, script: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.state.lock().unwrap().scripts.push(script.to_string());
        Ok(())
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, DriverError> {
        self.ensure_open()?;
        Ok(self.state.lock().unwrap().evaluate_result.clone())
    }

    async fn is_visible(&self, selector: &str, _timeout: Duration) -> Result<bool, DriverError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        *state.visibility_checks.entry(selector.to_string()).or_default() += 1;
        if let Some(window) = state.flashes.get(selector) {
            return Ok(state.clicked_at.map(|at| at.elapsed() < *window).unwrap_or(false));
        }
        Ok(state
            .visibility
            .get_mut(selector)
            .and_then(Script::next)
            .unwrap_or(false))
    }

    async fn text_content(&self, selector: &str, _timeout: Duration) -> Result<Option<String>, DriverError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        Ok(state.texts.get_mut(selector).and_then(Script::next).flatten())
    }

    async fn attribute(&self, selector: &str, name: &str, _timeout: Duration) -> Result<Option<String>, DriverError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        Ok(state
            .attributes
            .get_mut(&(selector.to_string(), name.to_string()))
            .and_then(Script::next)
            .flatten())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        if state.fail_clicks {
            return Err(DriverError::Timeout { operation: format!("click {}", selector), duration: timeout });
        }
        state.clicks.push(selector.to_string());
        state.clicked_at = Some(Instant::now());
        if let Some(url) = state.navigate_on_click.clone() {
            state.url = url;
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.state.lock().unwrap().keys.push(key.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<(), DriverError> {
        self.ensure_open()
    }

    async fn set_extra_http_headers(&self, headers: &BTreeMap<String, String>) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.state.lock().unwrap().headers.extend(headers.clone());
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Event builders
// ============================================================================

pub fn issued(id: &str, url: &str, at: f64) -> SessionEvent {
    SessionEvent::RequestIssued {
        id: RequestId::from(id),
        url: url.to_string(),
        method: "GET".to_string(),
        headers: BTreeMap::new(),
        timestamp_ms: at,
        wall_time: Utc::now(),
    }
}

pub fn responded(id: &str, status: u16, at: f64) -> SessionEvent {
    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), "text/html".to_string());
    SessionEvent::ResponseReceived {
        id: RequestId::from(id),
        status,
        status_text: String::new(),
        headers,
        mime_type: None,
        protocol: Some("h2".to_string()),
        timestamp_ms: at,
    }
}

pub fn failed(id: &str, reason: &str, at: f64) -> SessionEvent {
    SessionEvent::RequestFailed {
        id: RequestId::from(id),
        reason: reason.to_string(),
        timestamp_ms: at,
    }
}

pub fn console_error(text: &str) -> SessionEvent {
    SessionEvent::Console {
        level: ConsoleLevel::Error,
        text: text.to_string(),
    }
}
