//! Declarative action plans: a trigger plus an ordered list of signals

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, ProbeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Navigation,
    IndicatorChange,
    TransientAffordance,
    ControlStateChange,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Navigation => "navigation",
            SignalKind::IndicatorChange => "indicator_change",
            SignalKind::TransientAffordance => "transient_affordance",
            SignalKind::ControlStateChange => "control_state_change",
        };
        f.write_str(s)
    }
}

/// One independently checkable piece of evidence, in priority order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// The page moved to a URL matching `url_pattern`. Intermediate and
    /// loading URLs can match too, so `confirm_selector` must also be visible.
    Navigation {
        url_pattern: String,
        confirm_selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// A status indicator (cart badge, counter) appeared, increased or
    /// changed text relative to its pre-trigger value.
    IndicatorChange {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// A short-lived success affordance (toast, drawer, banner) showed up
    TransientAffordance {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// The triggering control flipped state, read from its text or from
    /// `attribute`. With `expected`, the new value must match it and the old
    /// one must not.
    ControlStateChange {
        selector: String,
        #[serde(default)]
        attribute: Option<String>,
        #[serde(default)]
        expected: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Navigation { .. } => SignalKind::Navigation,
            Signal::IndicatorChange { .. } => SignalKind::IndicatorChange,
            Signal::TransientAffordance { .. } => SignalKind::TransientAffordance,
            Signal::ControlStateChange { .. } => SignalKind::ControlStateChange,
        }
    }

    /// Short label for logs and diagnostics
    pub fn name(&self) -> String {
        match self {
            Signal::Navigation { url_pattern, .. } => format!("navigation:{}", url_pattern),
            Signal::IndicatorChange { selector, .. }
            | Signal::TransientAffordance { selector, .. }
            | Signal::ControlStateChange { selector, .. } => format!("{}:{}", self.kind(), selector),
        }
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            Signal::Navigation { timeout_ms, .. }
            | Signal::IndicatorChange { timeout_ms, .. }
            | Signal::TransientAffordance { timeout_ms, .. }
            | Signal::ControlStateChange { timeout_ms, .. } => *timeout_ms,
        }
    }

    /// Whether the engine reads a value before triggering the action
    pub fn needs_baseline(&self) -> bool {
        matches!(self, Signal::IndicatorChange { .. } | Signal::ControlStateChange { .. })
    }

    pub fn pattern(&self) -> Option<&str> {
        match self {
            Signal::Navigation { url_pattern, .. } => Some(url_pattern),
            Signal::ControlStateChange { expected, .. } => expected.as_deref(),
            _ => None,
        }
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> ProbeResult<Regex> {
    Regex::new(pattern).map_err(|e| ProbeError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// A UI action and the signals that confirm it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Element clicked to perform the action
    pub trigger: String,

    pub signals: Vec<Signal>,

    /// Overrides the verifier's post-trigger quiescence ceiling
    #[serde(default)]
    pub quiescence_ceiling_ms: Option<u64>,
}

impl ActionPlan {
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Every `.yaml`/`.yml` file under `dir`, sorted by path
    pub fn plan_files(dir: &Path) -> Vec<PathBuf> {
        walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect()
    }

    /// Load every plan under a directory; the first unreadable file fails the load
    pub fn load_all(dir: &Path) -> ProbeResult<Vec<Self>> {
        Self::plan_files(dir).iter().map(|path| Self::from_file(path)).collect()
    }

    /// Static checks; the engine itself degrades bad signals to `false`
    pub fn validate(&self) -> ProbeResult<()> {
        if self.trigger.trim().is_empty() {
            return Err(ProbeError::InvalidConfig(format!("plan '{}' has an empty trigger", self.name)));
        }
        if self.signals.is_empty() {
            return Err(ProbeError::InvalidConfig(format!("plan '{}' has no signals", self.name)));
        }
        for signal in &self.signals {
            if let Some(pattern) = signal.pattern() {
                compile_pattern(pattern)?;
            }
        }
        Ok(())
    }
}
