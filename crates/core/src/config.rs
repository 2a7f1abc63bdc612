//! Probe configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, ProbeResult};
use crate::vitals::{Tier, VitalsThresholds};

/// Whether a threshold violation fails the journey or is only reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Advisory,
    Enforced,
}

/// Top-level configuration for one journey probe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub network: NetworkConfig,
    pub vitals: VitalsConfig,
    pub verifier: VerifierConfig,
    pub overlay: OverlayConfig,
    pub jitter: JitterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Requests slower than this are listed as slow
    pub slow_request_ms: f64,

    /// Ceiling on the network-idle wait before evidence is compiled
    pub idle_timeout_ms: u64,

    pub slow_severity: Severity,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            slow_request_ms: crate::evidence::DEFAULT_SLOW_REQUEST_MS,
            idle_timeout_ms: 10_000,
            slow_severity: Severity::Advisory,
        }
    }
}

impl NetworkConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    pub tier: Tier,

    /// Explicit bounds; overrides the tier table when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<VitalsThresholds>,

    pub severity: Severity,
}

impl VitalsConfig {
    pub fn thresholds(&self) -> VitalsThresholds {
        self.thresholds.unwrap_or_else(|| self.tier.thresholds())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Upper bound on the post-trigger network-idle wait
    pub quiescence_ceiling_ms: u64,
    pub click_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Used by signals that do not set their own timeout
    pub signal_timeout_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            quiescence_ceiling_ms: 10_000,
            click_timeout_ms: 10_000,
            poll_interval_ms: 250,
            signal_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Selector that is visible while the overlay is up
    pub overlay_selector: String,

    /// Tried in order on every attempt
    pub close_selectors: Vec<String>,

    pub press_escape: bool,
    pub max_attempts: u32,
    pub probe_timeout_ms: u64,
    pub click_timeout_ms: u64,
    /// Pause after each click/escape for close animations
    pub settle_ms: u64,
    pub retry_delay_ms: u64,
    /// How long `wait_and_dismiss` waits for the overlay to show up
    pub appear_timeout_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            overlay_selector: "[role=\"dialog\"][aria-modal=\"true\"]".to_string(),
            close_selectors: vec![
                "[role=\"dialog\"] [aria-label=\"Close\"]".to_string(),
                "[role=\"dialog\"] button:has-text(\"No, thanks\")".to_string(),
            ],
            press_escape: true,
            max_attempts: 5,
            probe_timeout_ms: 1_000,
            click_timeout_ms: 2_000,
            settle_ms: 500,
            retry_delay_ms: 1_000,
            appear_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    /// Random delay before the first navigation, in `[0, max_ms)`; 0 disables
    pub max_ms: u64,

    /// Send a random `Accept-Language` from `locales`
    pub randomize_locale: bool,

    pub locales: Vec<String>,

    /// `User-Agent` strings to rotate through; empty keeps the browser's own
    pub user_agents: Vec<String>,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            max_ms: 3_000,
            randomize_locale: true,
            locales: [
                "en-US,en;q=0.9",
                "en-GB,en;q=0.9",
                "en-CA,en;q=0.9",
                "en-AU,en;q=0.9",
                "ja-JP,ja;q=0.9",
                "de-DE,de;q=0.9",
                "fr-FR,fr;q=0.9",
                "es-ES,es;q=0.9",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            user_agents: Vec::new(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> ProbeResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> ProbeResult<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> ProbeResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.network.slow_request_ms.is_finite() && self.network.slow_request_ms > 0.0) {
            return Err(ProbeError::InvalidConfig(format!(
                "network.slow_request_ms must be positive, got {}",
                self.network.slow_request_ms
            )));
        }
        if self.overlay.max_attempts == 0 {
            return Err(ProbeError::InvalidConfig("overlay.max_attempts must be at least 1".into()));
        }
        if self.overlay.overlay_selector.trim().is_empty() {
            return Err(ProbeError::InvalidConfig("overlay.overlay_selector is empty".into()));
        }
        if self.verifier.poll_interval_ms == 0 {
            return Err(ProbeError::InvalidConfig("verifier.poll_interval_ms must be non-zero".into()));
        }
        if self.jitter.randomize_locale && self.jitter.locales.is_empty() {
            return Err(ProbeError::InvalidConfig(
                "jitter.randomize_locale is set but jitter.locales is empty".into(),
            ));
        }
        Ok(())
    }
}
