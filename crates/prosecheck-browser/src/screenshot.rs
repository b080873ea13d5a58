//! Screenshot and markup capture into an evidence sink

use crate::error::Result;
use crate::query::ElementQuery;
use crate::session::Session;
use prosecheck_core::{ArtifactKind, ArtifactRef, EvidenceSink};
use tracing::{debug, info};

/// Screenshot capture options
#[derive(Debug, Clone)]
pub struct ScreenshotOptions {
    /// Capture the whole scrollable page rather than the viewport
    pub full_page: bool,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self::viewport()
    }
}

impl ScreenshotOptions {
    pub fn full_page() -> Self {
        Self { full_page: true }
    }

    pub fn viewport() -> Self {
        Self { full_page: false }
    }
}

/// Capture a screenshot and store it under `label`
pub async fn capture_screenshot(
    session: &dyn Session,
    sink: &dyn EvidenceSink,
    label: &str,
    options: &ScreenshotOptions,
) -> Result<ArtifactRef> {
    debug!(
        "Capturing {} screenshot '{}'",
        if options.full_page { "full page" } else { "viewport" },
        label
    );

    let data = session.screenshot(options.full_page).await?;
    let artifact = sink.save(label, ArtifactKind::Screenshot, &data).await?;

    info!(
        "Screenshot stored: {} ({} bytes)",
        artifact.path.display(),
        artifact.size_bytes
    );
    Ok(artifact)
}

/// Store the inner markup of the first match of `root`, if there is one
pub async fn capture_markup(
    session: &dyn Session,
    sink: &dyn EvidenceSink,
    label: &str,
    root: &ElementQuery,
) -> Result<Option<ArtifactRef>> {
    let Some(markup) = session.markup(root).await? else {
        debug!("No {} to snapshot for '{}'", root, label);
        return Ok(None);
    };

    let artifact = sink
        .save(label, ArtifactKind::DomSnapshot, markup.as_bytes())
        .await?;
    debug!("Markup stored: {}", artifact.path.display());
    Ok(Some(artifact))
}
