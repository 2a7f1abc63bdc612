//! Vitals snapshot and the host-side mirror of the in-page accumulator

use serde::{Deserialize, Serialize};

use super::script::MIN_EVENT_DURATION_MS;

/// Metrics read back from one page context. `None` means the browser never
/// reported the metric (or the read failed), not zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lcp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cls: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inp: Option<f64>,
}

impl VitalsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lcp.is_none() && self.cls.is_none() && self.inp.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutShift {
    pub value: f64,
    #[serde(default)]
    pub had_recent_input: bool,
}

/// One recorded `PerformanceEntry`, as exported from a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entryType", rename_all = "kebab-case")]
pub enum PerformanceEntry {
    LargestContentfulPaint {
        #[serde(rename = "startTime")]
        start_time: f64,
    },
    LayoutShift {
        value: f64,
        #[serde(rename = "hadRecentInput", default)]
        had_recent_input: bool,
    },
    Event {
        duration: f64,
    },
    /// A new document: the page context and its state are replaced
    Navigation,
}

/// Same fold the init script performs inside the page.
///
/// Used to replay recorded traces and to reason about the in-page state
/// without a browser.
#[derive(Debug, Clone, Default)]
pub struct VitalsAccumulator {
    lcp: Option<f64>,
    cls: f64,
    inp: Option<f64>,
}

impl VitalsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace with the last reported entry
    pub fn on_largest_paint(&mut self, start_times: &[f64]) {
        if let Some(last) = start_times.iter().rev().find(|t| t.is_finite()) {
            self.lcp = Some(*last);
        }
    }

    /// Accumulate shifts not caused by recent input
    pub fn on_layout_shift(&mut self, shifts: &[LayoutShift]) {
        for shift in shifts {
            if shift.had_recent_input || !shift.value.is_finite() || shift.value <= 0.0 {
                continue;
            }
            self.cls += shift.value;
        }
    }

    /// Keep the longest qualifying event-processing duration
    pub fn on_event_timing(&mut self, durations: &[f64]) {
        for &duration in durations {
            if !duration.is_finite() || duration < MIN_EVENT_DURATION_MS {
                continue;
            }
            if self.inp.map_or(true, |current| duration > current) {
                self.inp = Some(duration);
            }
        }
    }

    pub fn on_navigation(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&mut self, entry: &PerformanceEntry) {
        match entry {
            PerformanceEntry::LargestContentfulPaint { start_time } => self.on_largest_paint(&[*start_time]),
            PerformanceEntry::LayoutShift { value, had_recent_input } => self.on_layout_shift(&[LayoutShift {
                value: *value,
                had_recent_input: *had_recent_input,
            }]),
            PerformanceEntry::Event { duration } => self.on_event_timing(&[*duration]),
            PerformanceEntry::Navigation => self.on_navigation(),
        }
    }

    pub fn cumulative_layout_shift(&self) -> f64 {
        self.cls
    }

    pub fn snapshot(&self) -> VitalsSnapshot {
        VitalsSnapshot {
            lcp: self.lcp,
            cls: Some(self.cls),
            inp: self.inp,
        }
    }

    /// Fold a whole trace; the result reflects the last page in it
    pub fn replay<'a>(entries: impl IntoIterator<Item = &'a PerformanceEntry>) -> VitalsSnapshot {
        let mut acc = Self::new();
        for entry in entries {
            acc.apply(entry);
        }
        acc.snapshot()
    }
}
