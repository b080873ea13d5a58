//! Session abstraction over a live (or simulated) browser page
//!
//! The resolver, executor and verifier only ever talk to a [`Session`]. Element
//! handles are paths that each call re-resolves, so a handle that outlives the
//! element it pointed at fails with [`CheckError::StaleElement`].

use crate::error::Result;
use crate::query::{ElementHandle, ElementInfo, ElementQuery};
use async_trait::async_trait;
use prosecheck_core::CheckError;
use serde::{Deserialize, Serialize};

/// Keyboard modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Control,
    Shift,
    Alt,
    Meta,
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modifier::Control => write!(f, "Control"),
            Modifier::Shift => write!(f, "Shift"),
            Modifier::Alt => write!(f, "Alt"),
            Modifier::Meta => write!(f, "Meta"),
        }
    }
}

/// A key press with optional modifiers, written like `Control+A`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyChord {
    pub modifiers: Vec<Modifier>,
    pub key: String,
}

impl KeyChord {
    /// A bare key
    pub fn key(key: &str) -> Self {
        Self {
            modifiers: Vec::new(),
            key: key.to_string(),
        }
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        if !self.modifiers.contains(&modifier) {
            self.modifiers.push(modifier);
        }
        self
    }

    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn select_all() -> Self {
        Self::key("A").with(Modifier::Control)
    }

    pub fn enter() -> Self {
        Self::key("Enter")
    }

    pub fn backspace() -> Self {
        Self::key("Backspace")
    }

    /// Extend the selection to the end of the line
    pub fn select_to_end() -> Self {
        Self::key("End").with(Modifier::Shift)
    }
}

impl std::str::FromStr for KeyChord {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key, modifiers)) = parts.split_last() else {
            return Err(format!("Invalid key chord: {}", s));
        };
        if key.is_empty() {
            return Err(format!("Invalid key chord: {}", s));
        }

        let mut chord = KeyChord::key(key);
        for m in modifiers {
            let modifier = match m.to_lowercase().as_str() {
                "control" | "ctrl" => Modifier::Control,
                "shift" => Modifier::Shift,
                "alt" | "option" => Modifier::Alt,
                "meta" | "cmd" | "command" => Modifier::Meta,
                other => return Err(format!("Invalid modifier '{}' in {}", other, s)),
            };
            chord = chord.with(modifier);
        }
        Ok(chord)
    }
}

impl std::fmt::Display for KeyChord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m)?;
        }
        write!(f, "{}", self.key)
    }
}

/// Element query, action and attribute-read primitives of one page
#[async_trait]
pub trait Session: Send + Sync {
    /// Navigate to a URL and wait for the load to finish
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Handles to every document-wide match of `query`, in document order
    async fn query_all(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>>;

    /// Handles to every match of `query` below `scope`
    async fn query_within(
        &self,
        scope: &ElementHandle,
        query: &ElementQuery,
    ) -> Result<Vec<ElementHandle>>;

    /// Read an element's tag, attributes, text and visibility
    async fn describe(&self, handle: &ElementHandle) -> Result<ElementInfo>;

    /// Click an element
    async fn click(&self, handle: &ElementHandle) -> Result<()>;

    /// Choose an option of a `<select>` element by value
    async fn select_option(&self, handle: &ElementHandle, value: &str) -> Result<()>;

    /// Press a key chord on the focused element
    async fn press(&self, chord: &KeyChord) -> Result<()>;

    /// Type text into the focused element one keystroke at a time
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Inner markup of the first match of `query`, if any
    async fn markup(&self, query: &ElementQuery) -> Result<Option<String>>;

    /// PNG screenshot of the viewport or the full page
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;

    /// Close the page; every later call on the session fails
    async fn close(&self) -> Result<()>;

    /// Number of document-wide matches of `query`
    async fn count(&self, query: &ElementQuery) -> Result<usize> {
        Ok(self.query_all(query).await?.len())
    }
}

/// Error for a handle whose element no longer exists
pub(crate) fn stale(handle: &ElementHandle) -> CheckError {
    CheckError::StaleElement(format!("{} no longer resolves", handle))
}
