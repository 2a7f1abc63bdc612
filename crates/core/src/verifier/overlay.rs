//! Bounded retry loop for marketing/consent overlays

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{bounded, poll_until};
use crate::config::OverlayConfig;
use crate::driver::BrowserSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissOutcome {
    /// The overlay was confirmed gone
    pub dismissed: bool,
    /// Attempts used, at most `max_attempts`
    pub attempts: u32,
}

pub struct OverlayDismisser {
    config: OverlayConfig,
}

impl OverlayDismisser {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    /// Wait up to `appear_timeout_ms` for the overlay, then dismiss it.
    /// An overlay that never shows up counts as dismissed with zero attempts.
    pub async fn wait_and_dismiss(&self, session: &dyn BrowserSession) -> DismissOutcome {
        let appear_timeout = Self::ms(self.config.appear_timeout_ms);
        let probe_timeout = Self::ms(self.config.probe_timeout_ms);
        let selector = self.config.overlay_selector.as_str();

        let appeared = poll_until(appear_timeout, probe_timeout, move || async move {
            match bounded("overlay visibility", probe_timeout, session.is_visible(selector, probe_timeout)).await {
                Ok(true) => Ok(()),
                _ => Err(()),
            }
        })
        .await;

        if appeared.is_err() {
            debug!("Overlay '{}' did not appear", selector);
            return DismissOutcome { dismissed: true, attempts: 0 };
        }

        self.dismiss(session).await
    }

    /// Try every close control, optionally Escape, then check the overlay is
    /// gone; repeat up to `max_attempts` times, stopping at the first success.
    pub async fn dismiss(&self, session: &dyn BrowserSession) -> DismissOutcome {
        let probe_timeout = Self::ms(self.config.probe_timeout_ms);
        let click_timeout = Self::ms(self.config.click_timeout_ms);
        let settle = Self::ms(self.config.settle_ms);
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if session.is_closed() {
                warn!("Session closed while dismissing overlay (attempt {})", attempt);
                return DismissOutcome { dismissed: false, attempts: attempt - 1 };
            }

            for selector in &self.config.close_selectors {
                let visible = bounded("close visibility", probe_timeout, session.is_visible(selector, probe_timeout))
                    .await
                    .unwrap_or(false);
                if !visible {
                    continue;
                }
                match bounded("close click", click_timeout, session.click(selector, click_timeout)).await {
                    Ok(()) => debug!("Clicked overlay close control '{}'", selector),
                    Err(e) if e.is_session_closed() => {
                        warn!("Session closed while clicking overlay close control '{}'", selector);
                        return DismissOutcome { dismissed: false, attempts: attempt };
                    }
                    Err(e) => warn!(selector = %selector, attempt, "Overlay close control not clickable: {}", e),
                }
                tokio::time::sleep(settle).await;
            }

            if self.config.press_escape {
                if let Err(e) = bounded("escape", probe_timeout, session.press_key("Escape")).await {
                    warn!(attempt, "Escape press failed while dismissing overlay: {}", e);
                }
                tokio::time::sleep(settle).await;
            }

            // A failed visibility probe means the overlay element is gone
            let still_visible = bounded(
                "overlay visibility",
                probe_timeout,
                session.is_visible(&self.config.overlay_selector, probe_timeout),
            )
            .await
            .unwrap_or(false);

            if !still_visible && !session.is_closed() {
                info!("Overlay dismissed after {} attempt(s)", attempt);
                return DismissOutcome { dismissed: true, attempts: attempt };
            }

            if attempt < max_attempts {
                debug!("Overlay still visible after attempt {}/{}", attempt, max_attempts);
                tokio::time::sleep(Self::ms(self.config.retry_delay_ms)).await;
            }
        }

        warn!(
            "Overlay '{}' still visible after {} attempts",
            self.config.overlay_selector, max_attempts
        );
        DismissOutcome { dismissed: false, attempts: max_attempts }
    }
}
