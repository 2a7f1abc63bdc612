//! Resilient action verification
//!
//! Fire-and-forget UI actions (add to cart, dismiss a marketing overlay) are
//! confirmed from several independent, individually unreliable signals.
//! Nothing in here returns an error to the journey: a missing element, a
//! closed page or an expired wait all count as "signal not observed".

mod engine;
mod overlay;
mod signal;

pub use engine::{indicator_change, ActionOutcome, ActionVerifier, SignalCheck};
pub use overlay::{DismissOutcome, OverlayDismisser};
pub use signal::{ActionPlan, Signal, SignalKind};

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::DriverError;

/// Slack on top of a driver call's own timeout before we stop waiting on it
const DRIVER_GRACE: Duration = Duration::from_millis(250);

/// Run a driver call under a hard ceiling, in case the driver ignores its
/// own timeout argument.
pub(crate) async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    let ceiling = limit + DRIVER_GRACE;
    match tokio::time::timeout(ceiling, call).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout {
            operation: operation.to_string(),
            duration: ceiling,
        }),
    }
}

/// Re-run `probe` until it returns `Ok` or `timeout` expires, handing back
/// the last `Err` reading in the latter case. The probe always runs at least
/// once, so a zero timeout means "check now".
pub(crate) async fn poll_until<T, E, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let last = match probe().await {
            Ok(value) => return Ok(value),
            Err(last) => last,
        };
        let now = Instant::now();
        if now >= deadline {
            return Err(last);
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
