//! Browser driver seam
//!
//! The automation driver (Playwright bridge, CDP client, WebDriver) is an
//! external collaborator. Everything the core needs from it goes through
//! `BrowserSession`, one instance per page/context.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::DriverError;
use crate::events::SessionEvent;

/// One live browser page/context.
///
/// Every element query takes an explicit timeout; implementations must
/// return within it (a `DriverError::Timeout` or a negative answer), never
/// block indefinitely.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Subscribe to request/response/failure/console/page-error events.
    fn subscribe_events(&self) -> Result<mpsc::UnboundedReceiver<SessionEvent>, DriverError>;

    /// Register a script that runs before any page script on every
    /// subsequent navigation in this context.
    async fn install_before_any_page_script(&self, script: &str) -> Result<(), DriverError>;

    /// Evaluate an expression in the page and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError>;

    async fn is_visible(&self, selector: &str, timeout: Duration) -> Result<bool, DriverError>;

    /// Text content of the first match, `None` when nothing matches
    async fn text_content(&self, selector: &str, timeout: Duration) -> Result<Option<String>, DriverError>;

    async fn attribute(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<String>, DriverError>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    async fn press_key(&self, key: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// Resolve once the network has been idle, or fail after `timeout`.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), DriverError>;

    async fn set_extra_http_headers(&self, headers: &BTreeMap<String, String>) -> Result<(), DriverError>;

    fn is_closed(&self) -> bool;
}
