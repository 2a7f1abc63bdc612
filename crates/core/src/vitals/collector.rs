//! Performance collector - install once, read many

use serde_json::Value;
use tracing::{debug, warn};

use super::script::{INSTALL_SCRIPT, READ_EXPRESSION};
use super::snapshot::VitalsSnapshot;
use crate::driver::BrowserSession;
use crate::error::{ProbeError, ProbeResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectorState {
    #[default]
    Uninstalled,
    Installed,
}

/// Owns the install state for one session's context
#[derive(Debug, Default)]
pub struct PerformanceCollector {
    state: CollectorState,
}

impl PerformanceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Inject the observer script. Must run before the first navigation of
    /// the session; later calls are no-ops.
    pub async fn install(&mut self, session: &dyn BrowserSession) -> ProbeResult<()> {
        if self.state == CollectorState::Installed {
            debug!("Vitals collector already installed");
            return Ok(());
        }

        session.install_before_any_page_script(INSTALL_SCRIPT).await?;
        self.state = CollectorState::Installed;
        debug!("Vitals collector installed");
        Ok(())
    }

    /// Cross-context read of the current page's vitals.
    ///
    /// Fails with `SessionClosed` when the page is gone. A page where the
    /// script never ran, or returned something unreadable, yields an empty
    /// snapshot.
    pub async fn read_snapshot(&self, session: &dyn BrowserSession) -> ProbeResult<VitalsSnapshot> {
        if session.is_closed() {
            return Err(ProbeError::SessionClosed);
        }

        let value = session.evaluate(READ_EXPRESSION).await?;
        if value.is_null() {
            debug!("No vitals state in page (collector state: {:?})", self.state);
            return Ok(VitalsSnapshot::default());
        }

        Ok(parse_snapshot(value))
    }

    /// `read_snapshot` with every failure treated as "no data"
    pub async fn read_snapshot_or_default(&self, session: &dyn BrowserSession) -> VitalsSnapshot {
        match self.read_snapshot(session).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Could not read web vitals: {}", e);
                VitalsSnapshot::default()
            }
        }
    }
}

fn parse_snapshot(value: Value) -> VitalsSnapshot {
    match serde_json::from_value::<VitalsSnapshot>(value.clone()) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Malformed vitals payload {}: {}", value, e);
            VitalsSnapshot::default()
        }
    }
}
