//! One synthetic journey's evidence pipeline
//!
//! `JourneyProbe` wires the correlator, collector, verifier and overlay
//! dismisser to a single `BrowserSession` and produces the evidence bundle
//! at the end of the journey.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifact::{ArtifactSink, AttachReport, EvidenceBundle};
use crate::config::{ProbeConfig, Severity};
use crate::correlator::EventCorrelator;
use crate::driver::BrowserSession;
use crate::error::ProbeResult;
use crate::events::SessionEvent;
use crate::evidence::{compile_har, compile_network_summary_with, HarArchive, NetworkSummary};
use crate::jitter::{jitter_delay, pick_one};
use crate::verifier::{ActionOutcome, ActionPlan, ActionVerifier, DismissOutcome, OverlayDismisser};
use crate::vitals::{validate, PerformanceCollector, VitalsReport, VitalsSnapshot};

/// Header used to vary the locale between runs
const ACCEPT_LANGUAGE: &str = "Accept-Language";
const USER_AGENT: &str = "User-Agent";

pub struct JourneyProbe {
    run_id: Uuid,
    session: Arc<dyn BrowserSession>,
    config: ProbeConfig,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    correlator: EventCorrelator,
    collector: PerformanceCollector,
    verifier: ActionVerifier,
    dismisser: OverlayDismisser,
    locale: Option<String>,
    user_agent: Option<String>,
}

impl JourneyProbe {
    /// Attach to a fresh session. Call before the first navigation so the
    /// vitals observers and request capture see the whole page load.
    pub async fn start(session: Arc<dyn BrowserSession>, config: ProbeConfig) -> ProbeResult<Self> {
        config.validate()?;

        let run_id = Uuid::new_v4();
        let events = session.subscribe_events()?;

        let locale = if config.jitter.randomize_locale {
            pick_one(&config.jitter.locales).map(str::to_string)
        } else {
            None
        };
        let user_agent = pick_one(&config.jitter.user_agents).map(str::to_string);

        let mut headers = BTreeMap::new();
        if let Some(locale) = &locale {
            headers.insert(ACCEPT_LANGUAGE.to_string(), locale.clone());
        }
        if let Some(agent) = &user_agent {
            headers.insert(USER_AGENT.to_string(), agent.clone());
        }
        if !headers.is_empty() {
            if let Err(e) = session.set_extra_http_headers(&headers).await {
                warn!("Could not set rotated headers {:?}: {}", headers.keys().collect::<Vec<_>>(), e);
            }
        }

        let delay = jitter_delay(config.jitter.max_ms);
        if !delay.is_zero() {
            debug!("Jitter: sleeping {:?} before journey start", delay);
            tokio::time::sleep(delay).await;
        }

        let mut collector = PerformanceCollector::new();
        if let Err(e) = collector.install(session.as_ref()).await {
            warn!("Vitals collector not installed: {}", e);
        }

        info!("Journey {} started (locale: {})", run_id, locale.as_deref().unwrap_or("default"));

        Ok(Self {
            run_id,
            verifier: ActionVerifier::new(config.verifier.clone()),
            dismisser: OverlayDismisser::new(config.overlay.clone()),
            session,
            config,
            events,
            correlator: EventCorrelator::new(),
            collector,
            locale,
            user_agent,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn correlator(&self) -> &EventCorrelator {
        &self.correlator
    }

    /// Move every queued driver event into the ledger
    pub fn pump(&mut self) -> usize {
        self.correlator.drain(&mut self.events)
    }

    pub async fn dismiss_overlay(&mut self) -> DismissOutcome {
        let outcome = self.dismisser.wait_and_dismiss(self.session.as_ref()).await;
        self.pump();
        outcome
    }

    pub async fn verify_action(&mut self, plan: &ActionPlan) -> ActionOutcome {
        let outcome = self.verifier.verify(self.session.as_ref(), plan).await;
        self.pump();
        outcome
    }

    /// Settle the network, compile and attach the evidence.
    ///
    /// The idle wait is bounded; requests still in flight after it are
    /// reported as pending rather than waited on.
    pub async fn finish(mut self, page_url: &str, sink: &dyn ArtifactSink) -> JourneyEvidence {
        let idle_timeout = self.config.network.idle_timeout();
        if !self.session.is_closed() {
            match tokio::time::timeout(idle_timeout, self.session.wait_for_network_idle(idle_timeout)).await {
                Ok(Ok(())) => debug!("Network idle before evidence compilation"),
                Ok(Err(e)) => debug!("Network idle wait ended early: {}", e),
                Err(_) => debug!("Network still busy after {:?}", idle_timeout),
            }
        }

        let drained = self.pump();
        debug!("Drained {} event(s) before compilation", drained);

        let records = self.correlator.records();
        let summary = compile_network_summary_with(records, self.config.network.slow_request_ms);
        let har = compile_har(records, page_url);

        let vitals = match self.collector.read_snapshot(self.session.as_ref()).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Web vitals unavailable for {}: {}", page_url, e);
                None
            }
        };
        let vitals_report = vitals
            .as_ref()
            .map(|snapshot| validate(snapshot, &self.config.vitals.thresholds()));

        if let Some(report) = &vitals_report {
            if self.config.vitals.severity == Severity::Advisory {
                for failure in &report.failures {
                    warn!("Web vitals (advisory) on {}: {}", page_url, failure);
                }
            }
        }
        if summary.total_slow > 0 && self.config.network.slow_severity == Severity::Advisory {
            warn!("{} slow request(s) on {}", summary.total_slow, page_url);
        }

        let attach = match EvidenceBundle::assemble(
            &summary,
            &har,
            self.correlator.console_entries(),
            self.correlator.error_messages(),
            vitals.as_ref(),
        ) {
            Ok(bundle) => bundle.attach_all(sink).await,
            Err(e) => {
                warn!("Could not assemble evidence bundle: {}", e);
                AttachReport::default()
            }
        };

        info!(
            "Journey {} finished: {} requests, {} failed, {} errors, {} pending, {} artifact(s) attached",
            self.run_id,
            summary.total_requests,
            summary.total_failed,
            summary.total_errors,
            summary.total_pending,
            attach.attached
        );

        JourneyEvidence {
            run_id: self.run_id,
            page_url: page_url.to_string(),
            summary,
            har,
            vitals,
            vitals_report,
            console_errors: self.correlator.error_messages().to_vec(),
            vitals_severity: self.config.vitals.severity,
            slow_severity: self.config.network.slow_severity,
            attached: attach.attached,
            attach_failures: attach.failed,
        }
    }
}

/// What a finished journey leaves for the host test to assert on
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyEvidence {
    pub run_id: Uuid,
    pub page_url: String,
    pub summary: NetworkSummary,
    #[serde(skip)]
    pub har: HarArchive,
    pub vitals: Option<VitalsSnapshot>,
    pub vitals_report: Option<VitalsReport>,
    pub console_errors: Vec<String>,
    pub vitals_severity: Severity,
    pub slow_severity: Severity,
    pub attached: usize,
    pub attach_failures: usize,
}

impl JourneyEvidence {
    /// Threshold violations that should fail the journey. Empty unless a
    /// severity is set to `enforced`.
    pub fn blocking_violations(&self) -> Vec<String> {
        let mut violations: Vec<String> = self
            .vitals_report
            .as_ref()
            .map(|report| report.blocking(self.vitals_severity).to_vec())
            .unwrap_or_default();

        if self.slow_severity == Severity::Enforced {
            violations.extend(
                self.summary
                    .slow_requests
                    .iter()
                    .map(|slow| format!("Slow request {} {} took {:.0}ms", slow.method, slow.url, slow.duration)),
            );
        }

        violations
    }

    pub fn passed(&self) -> bool {
        self.blocking_violations().is_empty()
    }
}
