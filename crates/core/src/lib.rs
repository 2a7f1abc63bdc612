//! Shopwatch core
//!
//! Evidence synthesis and resilient-signal detection for synthetic
//! storefront journeys:
//! - Correlates browser network/console events into a per-session ledger
//! - Compiles the ledger into a network summary and a HAR 1.2 archive
//! - Collects web vitals through in-page performance observers
//! - Decides whether fire-and-forget UI actions succeeded from weak signals
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    JourneyProbe (one session)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserSession ──events──▶ EventCorrelator (ledger)        │
//! │                                 ├── compile_network_summary │
//! │                                 └── compile_har             │
//! │  PerformanceCollector                                       │
//! │    ├── install()  (init script, before page scripts)        │
//! │    ├── read_snapshot() -> VitalsSnapshot                    │
//! │    └── validate(snapshot, thresholds) -> VitalsReport       │
//! │  ActionVerifier / OverlayDismisser                          │
//! │    └── ordered Signal checks -> ActionOutcome               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EvidenceBundle ──attach_all──▶ ArtifactSink                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod config;
pub mod correlator;
pub mod driver;
pub mod error;
pub mod events;
pub mod evidence;
pub mod jitter;
pub mod probe;
pub mod verifier;
pub mod vitals;

pub use artifact::{Artifact, ArtifactSink, AttachReport, DirectorySink, EvidenceBundle};
pub use config::{ProbeConfig, Severity};
pub use correlator::{EventCorrelator, RequestRecord};
pub use driver::BrowserSession;
pub use error::{DriverError, ProbeError, ProbeResult};
pub use events::{RequestId, SessionEvent};
pub use evidence::{compile_har, compile_network_summary, HarArchive, NetworkSummary};
pub use probe::{JourneyEvidence, JourneyProbe};
pub use verifier::{ActionOutcome, ActionPlan, ActionVerifier, DismissOutcome, OverlayDismisser, Signal};
pub use vitals::{PerformanceCollector, VitalsReport, VitalsSnapshot, VitalsThresholds};

/// Shopwatch version, embedded in the HAR creator block
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
