//! Evidence storage for diagnostic artifacts
//!
//! Screenshots and DOM dumps captured during a run are written under
//! `<base>/artifacts/<run-id>/`. Callers treat every failure here as non-fatal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::fs;

use crate::{CheckError, Result};

/// Kinds of stored evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Browser screenshot
    Screenshot,
    /// Serialized editor markup
    DomSnapshot,
    /// Run report
    Report,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Screenshot => write!(f, "screenshot"),
            ArtifactKind::DomSnapshot => write!(f, "dom_snapshot"),
            ArtifactKind::Report => write!(f, "report"),
        }
    }
}

impl ArtifactKind {
    /// File extension for this kind
    pub fn extension(&self) -> &str {
        match self {
            ArtifactKind::Screenshot => "png",
            ArtifactKind::DomSnapshot => "html",
            ArtifactKind::Report => "json",
        }
    }

    /// MIME type for this kind
    pub fn mime_type(&self) -> &str {
        match self {
            ArtifactKind::Screenshot => "image/png",
            ArtifactKind::DomSnapshot => "text/html",
            ArtifactKind::Report => "application/json",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(ArtifactKind::Screenshot),
            "html" => Some(ArtifactKind::DomSnapshot),
            "json" => Some(ArtifactKind::Report),
            _ => None,
        }
    }
}

/// Reference to a stored piece of evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    /// Label the evidence was saved under
    pub label: String,
    /// Path relative to the artifacts directory
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRef {
    /// Absolute path given the artifacts directory
    pub fn absolute_path(&self, artifacts_dir: &Path) -> PathBuf {
        artifacts_dir.join(&self.path)
    }
}

/// Destination for captured evidence
#[async_trait]
pub trait EvidenceSink: Send + Sync {
    /// Persist one artifact
    async fn save(&self, label: &str, kind: ArtifactKind, data: &[u8]) -> Result<ArtifactRef>;
}

/// File-backed evidence sink scoped to one run
pub struct ArtifactStore {
    /// `<base>/artifacts`
    base_dir: PathBuf,
    run_id: String,
}

impl ArtifactStore {
    /// Create a store writing to `<base>/artifacts/<run_id>/`
    pub fn new(base: &Path, run_id: impl Into<String>) -> Self {
        Self {
            base_dir: base.join("artifacts"),
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Artifacts directory shared by all runs
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding this run's artifacts
    pub fn run_dir(&self) -> PathBuf {
        self.base_dir.join(&self.run_id)
    }

    /// List artifacts stored for a run, ordered by file name
    pub async fn list(&self, run_id: &str) -> Result<Vec<ArtifactRef>> {
        let run_dir = self.base_dir.join(run_id);
        if !run_dir.exists() {
            return Ok(Vec::new());
        }

        let mut artifacts = Vec::new();
        let mut entries = fs::read_dir(&run_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(kind) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ArtifactKind::from_extension)
            else {
                continue;
            };

            let metadata = fs::metadata(&path).await?;
            let created_at = metadata
                .modified()
                .ok()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now);

            artifacts.push(ArtifactRef {
                kind,
                label: label_from_file_name(file_name),
                path: PathBuf::from(run_id).join(file_name),
                size_bytes: metadata.len(),
                created_at,
            });
        }

        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(artifacts)
    }

    /// List run identifiers that have stored artifacts
    pub async fn list_runs(base: &Path) -> Result<Vec<String>> {
        let artifacts_dir = base.join("artifacts");
        if !artifacts_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        let mut entries = fs::read_dir(&artifacts_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().is_dir() {
                runs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        runs.sort();
        Ok(runs)
    }
}

#[async_trait]
impl EvidenceSink for ArtifactStore {
    async fn save(&self, label: &str, kind: ArtifactKind, data: &[u8]) -> Result<ArtifactRef> {
        let run_dir = self.run_dir();
        fs::create_dir_all(&run_dir).await.map_err(|e| {
            CheckError::Capture(format!(
                "Failed to create artifact directory {}: {}",
                run_dir.display(),
                e
            ))
        })?;

        // {timestamp}-{label}.{ext}; millisecond precision keeps per-step captures apart
        let created_at = Utc::now();
        let file_name = format!(
            "{}-{}.{}",
            created_at.format("%Y%m%d-%H%M%S%.3f"),
            sanitize_label(label),
            kind.extension()
        );
        let file_path = run_dir.join(&file_name);

        fs::write(&file_path, data).await.map_err(|e| {
            CheckError::Capture(format!(
                "Failed to write artifact {}: {}",
                file_path.display(),
                e
            ))
        })?;

        Ok(ArtifactRef {
            kind,
            label: label.to_string(),
            path: PathBuf::from(&self.run_id).join(file_name),
            size_bytes: data.len() as u64,
            created_at,
        })
    }
}

/// Evidence sink that keeps artifacts in memory
///
/// Used by dry runs and tests. Saving can be switched to fail to check that
/// capture errors never change an outcome.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<(ArtifactRef, Vec<u8>)>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Labels of everything saved so far, in order
    pub fn labels(&self) -> Vec<String> {
        self.lock().iter().map(|(r, _)| r.label.clone()).collect()
    }

    pub fn artifacts(&self) -> Vec<ArtifactRef> {
        self.lock().iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ArtifactRef, Vec<u8>)>> {
        self.saved.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl EvidenceSink for MemorySink {
    async fn save(&self, label: &str, kind: ArtifactKind, data: &[u8]) -> Result<ArtifactRef> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CheckError::Capture(format!("Refusing to store '{}'", label)));
        }

        let mut saved = self.lock();
        let artifact = ArtifactRef {
            label: label.to_string(),
            path: PathBuf::from(format!(
                "memory/{:04}-{}.{}",
                saved.len(),
                sanitize_label(label),
                kind.extension()
            )),
            kind,
            size_bytes: data.len() as u64,
            created_at: Utc::now(),
        };
        saved.push((artifact.clone(), data.to_vec()));
        Ok(artifact)
    }
}

/// Keep labels filesystem-safe
fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}

/// Strip the `{date}-{time}-` prefix and extension
fn label_from_file_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    stem.splitn(3, '-').nth(2).unwrap_or(stem).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_display_and_extension() {
        assert_eq!(ArtifactKind::Screenshot.to_string(), "screenshot");
        assert_eq!(ArtifactKind::Screenshot.extension(), "png");
        assert_eq!(ArtifactKind::DomSnapshot.mime_type(), "text/html");
        assert_eq!(ArtifactKind::Report.extension(), "json");
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("bullet-to-ordered/after"), "bullet-to-ordered-after");
        assert_eq!(sanitize_label("Run Fault"), "run-fault");
        assert_eq!(sanitize_label(""), "artifact");
    }

    #[test]
    fn test_label_from_file_name() {
        assert_eq!(
            label_from_file_name("20260101-120000.123-case-one-passed.png"),
            "case-one-passed"
        );
        assert_eq!(label_from_file_name("odd.png"), "odd");
    }

    #[tokio::test]
    async fn test_store_and_list() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path(), "run-1");

        let shot = store
            .save("page-loaded", ArtifactKind::Screenshot, b"png bytes")
            .await
            .unwrap();
        assert_eq!(shot.size_bytes, 9);
        assert_eq!(shot.label, "page-loaded");
        let abs = shot.absolute_path(store.base_dir());
        assert_eq!(fs::read(&abs).await.unwrap(), b"png bytes");

        store
            .save("editor", ArtifactKind::DomSnapshot, b"<p></p>")
            .await
            .unwrap();

        let listed = store.list("run-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|a| a.kind == ArtifactKind::DomSnapshot));
        assert!(listed.iter().any(|a| a.label == "page-loaded"));

        let runs = ArtifactStore::list_runs(temp.path()).await.unwrap();
        assert_eq!(runs, vec!["run-1".to_string()]);
    }

    #[tokio::test]
    async fn test_list_unknown_run_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path(), "run-1");
        assert!(store.list("missing").await.unwrap().is_empty());
        assert!(ArtifactStore::list_runs(temp.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_sink() {
        let sink = MemorySink::new();
        let saved = sink
            .save("case before", ArtifactKind::Screenshot, b"png")
            .await
            .unwrap();
        assert_eq!(saved.path, PathBuf::from("memory/0000-case-before.png"));
        assert_eq!(sink.labels(), vec!["case before".to_string()]);

        sink.set_failing(true);
        assert!(sink.save("x", ArtifactKind::Report, b"{}").await.is_err());
        assert_eq!(sink.len(), 1);
    }
}
