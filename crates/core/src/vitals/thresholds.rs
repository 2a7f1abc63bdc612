//! Vitals thresholds and validation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::snapshot::VitalsSnapshot;
use crate::config::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalsThresholds {
    /// Largest Contentful Paint (ms)
    pub lcp: f64,
    /// Cumulative Layout Shift (score)
    pub cls: f64,
    /// Interaction latency (ms)
    pub inp: f64,
}

/// Journey priority tier. Synthetic thresholds start loose and tighten
/// once a baseline has been recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    #[default]
    P0,
    P1,
    P2,
}

impl Tier {
    pub fn thresholds(self) -> VitalsThresholds {
        match self {
            Tier::P0 => VitalsThresholds { lcp: 4000.0, cls: 0.10, inp: 300.0 },
            Tier::P1 => VitalsThresholds { lcp: 5000.0, cls: 0.15, inp: 400.0 },
            Tier::P2 => VitalsThresholds { lcp: 6000.0, cls: 0.20, inp: 500.0 },
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::P0 => "P0",
            Tier::P1 => "P1",
            Tier::P2 => "P2",
        };
        f.write_str(s)
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "P0" => Ok(Tier::P0),
            "P1" => Ok(Tier::P1),
            "P2" => Ok(Tier::P2),
            other => Err(format!("unknown tier '{}', expected P0, P1 or P2", other)),
        }
    }
}

impl Default for VitalsThresholds {
    fn default() -> Self {
        Tier::P0.thresholds()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsReport {
    pub passed: bool,
    pub failures: Vec<String>,
}

impl VitalsReport {
    /// Violations that should fail the journey under the given severity
    pub fn blocking(&self, severity: Severity) -> &[String] {
        match severity {
            Severity::Enforced => self.failures.as_slice(),
            Severity::Advisory => &[],
        }
    }
}

/// Compare every reported metric against its bound. Metrics the browser
/// never reported are skipped, as are non-finite readings.
pub fn validate(snapshot: &VitalsSnapshot, thresholds: &VitalsThresholds) -> VitalsReport {
    let mut failures = Vec::new();

    if let Some(lcp) = snapshot.lcp.filter(|v| v.is_finite()) {
        if lcp > thresholds.lcp {
            failures.push(format!("LCP {}ms > {}ms", lcp, thresholds.lcp));
        }
    }

    if let Some(cls) = snapshot.cls.filter(|v| v.is_finite()) {
        if cls > thresholds.cls {
            failures.push(format!("CLS {} > {}", cls, thresholds.cls));
        }
    }

    if let Some(inp) = snapshot.inp.filter(|v| v.is_finite()) {
        if inp > thresholds.inp {
            failures.push(format!("INP {}ms > {}ms", inp, thresholds.inp));
        }
    }

    VitalsReport {
        passed: failures.is_empty(),
        failures,
    }
}
