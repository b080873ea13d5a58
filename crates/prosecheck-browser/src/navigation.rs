//! Navigation from the application's landing page to an open editor
//!
//! The landing page lists workspaces (`/d/<workspace>`), a workspace lists
//! documents (`/d/<workspace>/<document>` or `.../docs...`). When the target
//! URL already shows an editor the link walk is skipped.

use crate::error::Result;
use crate::query::{AttrFilter, ElementHandle, ElementQuery};
use crate::screenshot::{capture_screenshot, ScreenshotOptions};
use crate::session::Session;
use prosecheck_core::fail_open::fail_open;
use prosecheck_core::{CheckError, EvidenceSink, HarnessConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::time::sleep;
use tracing::{info, warn};

/// Href shape of a document inside a workspace
const DOCUMENT_HREF: &str = r"/d/[^/]+/[^/]+$";

/// Where navigation ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Editor found and focused
    EditorReady,
    /// No workspace link on the landing page
    NeedsManualNavigation,
    /// Links followed but no editor rendered
    EditorMissing,
}

impl NavigationOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, NavigationOutcome::EditorReady)
    }
}

impl std::fmt::Display for NavigationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationOutcome::EditorReady => write!(f, "editor ready"),
            NavigationOutcome::NeedsManualNavigation => write!(f, "no workspace link found"),
            NavigationOutcome::EditorMissing => write!(f, "editor not found"),
        }
    }
}

/// Whether an href points at a document rather than a workspace
pub fn is_document_href(href: &str) -> Result<bool> {
    Ok(href.contains("/docs") || document_pattern()?.is_match(href))
}

/// Compiled once per process
fn document_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(DOCUMENT_HREF))
        .as_ref()
        .map_err(|e| CheckError::Other(format!("Invalid document pattern: {}", e)))
}

/// Walks from the target URL to a focused editor
pub struct Navigator<'a> {
    session: &'a dyn Session,
    sink: &'a dyn EvidenceSink,
    config: &'a HarnessConfig,
}

impl<'a> Navigator<'a> {
    pub fn new(session: &'a dyn Session, sink: &'a dyn EvidenceSink, config: &'a HarnessConfig) -> Self {
        Self {
            session,
            sink,
            config,
        }
    }

    fn editor(&self) -> ElementQuery {
        ElementQuery::class(&self.config.editor.root_class)
    }

    /// Navigate to the target URL and open the first document
    ///
    /// Transport and navigation failures are errors; a page without the
    /// expected links or editor is a [`NavigationOutcome`].
    pub async fn open_editor(&self) -> Result<NavigationOutcome> {
        info!("Opening {}", self.config.target_url);
        self.session.navigate(&self.config.target_url).await?;
        self.settle().await;
        self.capture("page-loaded", false).await;

        if self.session.count(&self.editor()).await? == 0 {
            let workspaces = ElementQuery::tag("a").with_attr(AttrFilter::Prefix("href".into(), "/d/".into()));
            let links = self.session.query_all(&workspaces).await?;
            info!("Found {} workspace links", links.len());

            let Some(first) = links.first() else {
                warn!("No workspace links found, manual navigation needed");
                self.capture("no-workspace", true).await;
                return Ok(NavigationOutcome::NeedsManualNavigation);
            };
            self.follow(first, "workspace").await?;
            self.capture("workspace-opened", false).await;

            if self.open_document().await? {
                self.capture("document-opened", false).await;
            }
        }

        let editors = self.session.query_all(&self.editor()).await?;
        let Some(editor) = editors.first() else {
            warn!("Could not find editor {}", self.config.editor_selector());
            self.capture("no-editor-debug", true).await;
            return Ok(NavigationOutcome::EditorMissing);
        };

        self.session.click(editor).await?;
        info!("Focused on editor");
        Ok(NavigationOutcome::EditorReady)
    }

    /// Click the first document link; false when there is none
    async fn open_document(&self) -> Result<bool> {
        let documents =
            ElementQuery::tag("a").with_attr(AttrFilter::Contains("href".into(), "/d/".into()));
        let links = self.session.query_all(&documents).await?;
        info!("Found {} document links", links.len());

        for link in &links {
            let href = match self.session.describe(link).await {
                Ok(info) => info.attribute("href").map(str::to_string),
                Err(e) if e.is_recoverable() => None,
                Err(e) => return Err(e),
            };
            if let Some(href) = href {
                if is_document_href(&href)? {
                    self.follow(link, "document").await?;
                    return Ok(true);
                }
            }
        }

        warn!("No document link found");
        Ok(false)
    }

    async fn follow(&self, link: &ElementHandle, what: &str) -> Result<()> {
        if let Ok(info) = self.session.describe(link).await {
            info!(
                "Clicking on {}: \"{}\" ({})",
                what,
                info.text.trim(),
                info.attribute("href").unwrap_or_default()
            );
        }
        self.session.click(link).await?;
        self.settle().await;
        Ok(())
    }

    async fn settle(&self) {
        let delay = self.config.timing.page_settle();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    async fn capture(&self, label: &str, full_page: bool) {
        let options = ScreenshotOptions { full_page };
        fail_open("navigation::capture", || {
            capture_screenshot(self.session, self.sink, label, &options)
        })
        .await;
    }
}
