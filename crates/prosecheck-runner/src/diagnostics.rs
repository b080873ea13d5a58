//! Diagnostic capture and manual-inspection holds
//!
//! Capture is fail-open: a screenshot or store that fails is logged and the
//! artifact records the gap, but the case outcome never changes.

use chrono::{DateTime, Utc};
use prosecheck_browser::query::ElementQuery;
use prosecheck_browser::screenshot::capture_markup;
use prosecheck_browser::session::Session;
use prosecheck_core::fail_open::{fail_open, fail_open_with_retries};
use prosecheck_core::{ArtifactKind, ArtifactRef, EvidenceSink};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const SCREENSHOT_ATTEMPTS: usize = 2;
const SCREENSHOT_BACKOFF: Duration = Duration::from_millis(100);

/// Evidence tied to one step of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticArtifact {
    pub label: String,
    pub captured_at: DateTime<Utc>,
    /// Case the step belongs to; `None` for run-level captures
    pub case: Option<String>,
    pub step: String,
    pub screenshot: Option<ArtifactRef>,
    pub markup: Option<ArtifactRef>,
}

impl DiagnosticArtifact {
    /// Whether anything was actually stored
    pub fn is_stored(&self) -> bool {
        self.screenshot.is_some() || self.markup.is_some()
    }
}

/// Where a capture happens and what to include
#[derive(Debug, Clone)]
pub struct CaptureContext {
    pub case: Option<String>,
    pub step: String,
    pub full_page: bool,
    /// Also store the editor markup
    pub include_markup: bool,
}

impl CaptureContext {
    pub fn case(case: &str, step: &str) -> Self {
        Self {
            case: Some(case.to_string()),
            step: step.to_string(),
            full_page: false,
            include_markup: false,
        }
    }

    pub fn run(step: &str) -> Self {
        Self {
            case: None,
            step: step.to_string(),
            full_page: true,
            include_markup: true,
        }
    }

    pub fn with_markup(mut self) -> Self {
        self.include_markup = true;
        self
    }
}

/// Captures screenshots and markup into an evidence sink
pub struct DiagnosticCapture<'a> {
    session: &'a dyn Session,
    sink: &'a dyn EvidenceSink,
    editor: ElementQuery,
}

impl<'a> DiagnosticCapture<'a> {
    pub fn new(session: &'a dyn Session, sink: &'a dyn EvidenceSink, editor: ElementQuery) -> Self {
        Self {
            session,
            sink,
            editor,
        }
    }

    /// Record an artifact for `label`; never fails
    pub async fn capture(&self, label: &str, context: &CaptureContext) -> DiagnosticArtifact {
        let session = self.session;
        let full_page = context.full_page;

        let screenshot = match fail_open_with_retries(
            "diagnostics::screenshot",
            move || session.screenshot(full_page),
            SCREENSHOT_ATTEMPTS,
            SCREENSHOT_BACKOFF,
        )
        .await
        {
            Some(data) => {
                fail_open("diagnostics::store", || {
                    self.sink.save(label, ArtifactKind::Screenshot, &data)
                })
                .await
            }
            None => None,
        };

        let markup = if context.include_markup {
            self.markup(label).await
        } else {
            None
        };

        let artifact = DiagnosticArtifact {
            label: label.to_string(),
            captured_at: Utc::now(),
            case: context.case.clone(),
            step: context.step.clone(),
            screenshot,
            markup,
        };
        if artifact.is_stored() {
            info!("Captured evidence '{}'", label);
        } else {
            warn!("No evidence stored for '{}'", label);
        }
        artifact
    }

    async fn markup(&self, label: &str) -> Option<ArtifactRef> {
        fail_open("diagnostics::markup", || {
            capture_markup(self.session, self.sink, label, &self.editor)
        })
        .await
        .flatten()
    }
}

/// Keep the browser open for manual inspection; zero skips the hold
pub async fn manual_hold(reason: &str, duration: Duration) {
    if duration.is_zero() {
        return;
    }
    info!(
        "Browser will remain open for {} seconds for manual inspection: {}",
        duration.as_secs(),
        reason
    );
    sleep(duration).await;
}
