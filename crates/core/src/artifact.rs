//! Evidence artifacts and the sinks that receive them
//!
//! Attachment is fire-and-forget: a sink failure is logged and counted but
//! never surfaces as a journey failure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::correlator::ConsoleEntry;
use crate::error::{ProbeError, ProbeResult};
use crate::evidence::{HarArchive, NetworkSummary};
use crate::vitals::VitalsSnapshot;

pub const MIME_JSON: &str = "application/json";
pub const MIME_TEXT: &str = "text/plain";

// ============================================================================
// Artifact
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Logical name, e.g. `network-summary`
    pub name: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Pretty-printed JSON artifact
    pub fn json<T: Serialize + ?Sized>(name: &str, file_name: &str, value: &T) -> ProbeResult<Self> {
        Ok(Self {
            name: name.to_string(),
            file_name: file_name.to_string(),
            mime_type: MIME_JSON.to_string(),
            bytes: serde_json::to_vec_pretty(value)?,
        })
    }

    pub fn text(name: &str, file_name: &str, text: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            file_name: file_name.to_string(),
            mime_type: MIME_TEXT.to_string(),
            bytes: text.into().into_bytes(),
        }
    }
}

/// Receiver for evidence, typically the test reporter of the host runner
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn attach(&self, artifact: &Artifact) -> ProbeResult<()>;
}

/// Writes each artifact to `<dir>/<file_name>`
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn attach(&self, artifact: &Artifact) -> ProbeResult<()> {
        // Artifact names come from us, but reject anything that would escape the directory
        if artifact.file_name.contains(['/', '\\']) || artifact.file_name.starts_with("..") {
            return Err(ProbeError::Artifact {
                name: artifact.name.clone(),
                reason: format!("invalid file name '{}'", artifact.file_name),
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&artifact.file_name);
        tokio::fs::write(&path, &artifact.bytes).await?;
        debug!("Wrote {} ({} bytes) to {}", artifact.name, artifact.bytes.len(), path.display());
        Ok(())
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// Everything a journey leaves behind, in attachment order
#[derive(Debug, Clone, Default)]
pub struct EvidenceBundle {
    pub artifacts: Vec<Artifact>,
}

/// Result of `EvidenceBundle::attach_all`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachReport {
    pub attached: usize,
    pub failed: usize,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Assemble the standard artifact set. Console, failed-request and vitals
    /// artifacts are only included when there is something to show.
    pub fn assemble(
        summary: &NetworkSummary,
        har: &HarArchive,
        console: &[ConsoleEntry],
        errors: &[String],
        vitals: Option<&VitalsSnapshot>,
    ) -> ProbeResult<Self> {
        let mut bundle = Self::new();

        bundle.push(Artifact::json("network-summary", "network-summary.json", summary)?);
        bundle.push(Artifact::json("network-har", "network.har", har)?);

        if !console.is_empty() {
            bundle.push(Artifact::json("console-logs", "console-logs.json", console)?);
        }
        if !errors.is_empty() {
            bundle.push(Artifact::text("console-errors", "console-errors.txt", errors.join("\n\n")));
        }
        if !summary.failed_requests.is_empty() {
            bundle.push(Artifact::json("failed-requests", "failed-requests.json", &summary.failed_requests)?);
        }
        if let Some(snapshot) = vitals {
            bundle.push(Artifact::json("web-vitals", "web-vitals.json", snapshot)?);
        }

        Ok(bundle)
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.name.as_str()).collect()
    }

    /// Attach each artifact independently; one failure does not stop the rest
    pub async fn attach_all(&self, sink: &dyn ArtifactSink) -> AttachReport {
        let mut report = AttachReport::default();
        for artifact in &self.artifacts {
            match sink.attach(artifact).await {
                Ok(()) => report.attached += 1,
                Err(e) => {
                    warn!("Failed to attach {}: {}", artifact.name, e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}
