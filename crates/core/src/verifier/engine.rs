//! Generic signal engine: baseline, trigger, quiesce, check in order

use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::signal::{compile_pattern, ActionPlan, Signal, SignalKind};
use super::{bounded, poll_until};
use crate::config::VerifierConfig;
use crate::driver::BrowserSession;

/// Outcome of one signal check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCheck {
    pub name: String,
    pub kind: SignalKind,
    pub fired: bool,
    pub before: Option<String>,
    pub after: Option<String>,
    pub detail: String,
}

/// Verdict for one action plus the trail that led to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: String,
    pub success: bool,
    /// Whether the trigger click went through
    pub triggered: bool,
    /// Checks in the order they ran; stops at the first signal that fired
    pub checks: Vec<SignalCheck>,
    pub duration_ms: u64,
}

impl ActionOutcome {
    pub fn fired_signal(&self) -> Option<&SignalCheck> {
        self.checks.iter().find(|c| c.fired)
    }
}

/// Decide whether an indicator moved from `before` to `after`.
///
/// Returns the kind of change, or `None` when nothing counts as success.
/// Numeric readings only count when they increase; a decrease is not an
/// add-to-cart. Non-numeric text counts on any change.
pub fn indicator_change(before: Option<&str>, after: Option<&str>) -> Option<&'static str> {
    let before = before.map(str::trim).filter(|s| !s.is_empty());
    let after = after.map(str::trim).filter(|s| !s.is_empty());

    match (before, after) {
        (None, Some(_)) => Some("appeared"),
        (Some(b), Some(a)) => match (parse_number(b), parse_number(a)) {
            (Some(b), Some(a)) => (a > b).then_some("increased"),
            _ => (a != b).then_some("changed"),
        },
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// With a pattern, the control must match it now and must not have matched
/// before. Without one, any new non-empty value counts.
fn control_flipped(before: Option<&str>, after: Option<&str>, expected: Option<&Regex>) -> bool {
    match (expected, after) {
        (Some(re), Some(now)) => re.is_match(now) && !before.map(|b| re.is_match(b)).unwrap_or(false),
        (None, Some(now)) => before != Some(now),
        (_, None) => false,
    }
}

/// Runs `ActionPlan`s against a session
pub struct ActionVerifier {
    config: VerifierConfig,
}

impl ActionVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    fn signal_timeout(&self, signal: &Signal) -> Duration {
        Duration::from_millis(signal.timeout_ms().unwrap_or(self.config.signal_timeout_ms))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms.max(1))
    }

    /// Perform the plan's trigger and report whether any signal confirmed it.
    /// Never fails; every driver problem degrades to "not observed".
    pub async fn verify(&self, session: &dyn BrowserSession, plan: &ActionPlan) -> ActionOutcome {
        let start = Instant::now();
        debug!("Verifying action '{}' ({} signals)", plan.name, plan.signals.len());

        // Baselines first, so a fast UI update cannot race the read
        let mut baselines = Vec::with_capacity(plan.signals.len());
        for signal in &plan.signals {
            let before = if signal.needs_baseline() {
                self.read_value(session, signal, self.poll_interval()).await
            } else {
                None
            };
            baselines.push(before);
        }

        let click_timeout = Duration::from_millis(self.config.click_timeout_ms);
        let triggered = match bounded("click", click_timeout, session.click(&plan.trigger, click_timeout)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Trigger click on '{}' failed: {}", plan.trigger, e);
                false
            }
        };

        let ceiling = Duration::from_millis(
            plan.quiescence_ceiling_ms
                .unwrap_or(self.config.quiescence_ceiling_ms),
        );
        if let Err(e) = bounded("network idle", ceiling, session.wait_for_network_idle(ceiling)).await {
            warn!(action = %plan.name, "Network did not settle after trigger: {}", e);
        }

        // One immediate look at every signal, then poll the unresolved ones
        let mut checks = self.run_pass(session, plan, &baselines, Some(Duration::ZERO)).await;
        if !checks.iter().any(|c| c.fired) && !session.is_closed() {
            debug!("No signal on first look for '{}', polling", plan.name);
            checks = self.run_pass(session, plan, &baselines, None).await;
        }

        let success = checks.iter().any(|c| c.fired);
        let outcome = ActionOutcome {
            action: plan.name.clone(),
            success,
            triggered,
            checks,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if let Some(check) = outcome.fired_signal() {
            info!("✓ {} confirmed by {} ({})", plan.name, check.name, check.detail);
        } else {
            let url = current_url_or_unknown(session).await;
            for check in &outcome.checks {
                warn!(
                    action = %plan.name,
                    url = %url,
                    signal = %check.name,
                    before = ?check.before,
                    after = ?check.after,
                    "Signal not observed: {}",
                    check.detail
                );
            }
            warn!("✗ {} not confirmed by any signal", plan.name);
        }

        outcome
    }

    /// Check the signals in priority order, stopping at the first that fires.
    /// `budget` overrides every signal's own timeout; `Some(ZERO)` looks once.
    async fn run_pass(
        &self,
        session: &dyn BrowserSession,
        plan: &ActionPlan,
        baselines: &[Option<String>],
        budget: Option<Duration>,
    ) -> Vec<SignalCheck> {
        let mut checks = Vec::with_capacity(plan.signals.len());
        for (signal, before) in plan.signals.iter().zip(baselines) {
            let check = if session.is_closed() {
                SignalCheck {
                    name: signal.name(),
                    kind: signal.kind(),
                    fired: false,
                    before: before.clone(),
                    after: None,
                    detail: "session closed".to_string(),
                }
            } else {
                let timeout = budget.unwrap_or_else(|| self.signal_timeout(signal));
                self.check(session, signal, before.clone(), timeout).await
            };

            let fired = check.fired;
            checks.push(check);
            if fired {
                break;
            }
        }
        checks
    }

    async fn check(
        &self,
        session: &dyn BrowserSession,
        signal: &Signal,
        before: Option<String>,
        timeout: Duration,
    ) -> SignalCheck {
        let interval = self.poll_interval();
        // Zero is "wait forever" to some drivers
        let wait = timeout.max(interval);
        let baseline = before.as_deref();

        let (fired, after, detail) = match signal {
            Signal::Navigation { url_pattern, confirm_selector, .. } => match compile_pattern(url_pattern) {
                Ok(pattern) => {
                    let pattern = &pattern;
                    let matched = poll_until(timeout, interval, move || async move {
                        match bounded("current url", interval, session.current_url()).await {
                            Ok(url) if pattern.is_match(&url) => Ok(url),
                            Ok(url) => Err(Some(url)),
                            Err(_) => Err(None),
                        }
                    })
                    .await;

                    match matched {
                        Ok(url) => {
                            let confirmed = bounded("visibility", wait, session.is_visible(confirm_selector, wait))
                                .await
                                .unwrap_or(false);
                            let detail = if confirmed {
                                format!("url matched and '{}' visible", confirm_selector)
                            } else {
                                format!("url matched but '{}' not visible", confirm_selector)
                            };
                            (confirmed, Some(url), detail)
                        }
                        Err(last) => (false, last, format!("url never matched '{}'", url_pattern)),
                    }
                }
                Err(e) => (false, None, e.to_string()),
            },

            Signal::IndicatorChange { .. } => {
                let changed = poll_until(timeout, interval, move || async move {
                    let current = self.read_value(session, signal, interval).await;
                    match indicator_change(baseline, current.as_deref()) {
                        Some(kind) => Ok((kind, current)),
                        None => Err(current),
                    }
                })
                .await;

                match changed {
                    Ok((kind, current)) => (true, current, format!("indicator {}", kind)),
                    Err(current) => (false, current, "indicator unchanged".to_string()),
                }
            }

            Signal::TransientAffordance { selector, .. } => {
                let visible = bounded("visibility", wait, session.is_visible(selector, wait))
                    .await
                    .unwrap_or(false);
                let detail = if visible { "affordance shown" } else { "affordance never shown" };
                (visible, None, detail.to_string())
            }

            Signal::ControlStateChange { expected, .. } => match expected.as_deref().map(compile_pattern).transpose() {
                Ok(pattern) => {
                    let pattern = pattern.as_ref();
                    let flipped = poll_until(timeout, interval, move || async move {
                        let current = self.read_value(session, signal, interval).await;
                        if control_flipped(baseline, current.as_deref(), pattern) {
                            Ok(current)
                        } else {
                            Err(current)
                        }
                    })
                    .await;

                    match flipped {
                        Ok(current) => (true, current, "control changed state".to_string()),
                        Err(current) => (false, current, "control state unchanged".to_string()),
                    }
                }
                Err(e) => (false, None, e.to_string()),
            },
        };

        SignalCheck {
            name: signal.name(),
            kind: signal.kind(),
            fired,
            before,
            after,
            detail,
        }
    }

    /// Read the value a baseline-bearing signal compares. Missing elements
    /// and driver errors read as `None`.
    async fn read_value(&self, session: &dyn BrowserSession, signal: &Signal, timeout: Duration) -> Option<String> {
        let result = match signal {
            Signal::IndicatorChange { selector, .. } => {
                bounded("text", timeout, session.text_content(selector, timeout)).await
            }
            Signal::ControlStateChange { selector, attribute: Some(name), .. } => {
                bounded("attribute", timeout, session.attribute(selector, name, timeout)).await
            }
            Signal::ControlStateChange { selector, attribute: None, .. } => {
                bounded("text", timeout, session.text_content(selector, timeout)).await
            }
            _ => return None,
        };

        match result {
            Ok(value) => value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            Err(e) => {
                debug!("Could not read '{}': {}", signal.name(), e);
                None
            }
        }
    }
}

async fn current_url_or_unknown(session: &dyn BrowserSession) -> String {
    if session.is_closed() {
        return "<closed>".to_string();
    }
    bounded("current url", Duration::from_secs(1), session.current_url())
        .await
        .unwrap_or_else(|_| "<unknown>".to_string())
}
