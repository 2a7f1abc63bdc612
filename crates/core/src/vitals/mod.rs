//! Web vitals collection
//!
//! The observers run inside the page under test; the automation side only
//! installs them once and reads their accumulated state back.

pub mod collector;
pub mod script;
pub mod snapshot;
pub mod thresholds;

pub use collector::{CollectorState, PerformanceCollector};
pub use snapshot::{LayoutShift, PerformanceEntry, VitalsAccumulator, VitalsSnapshot};
pub use thresholds::{validate, Tier, VitalsReport, VitalsThresholds};
