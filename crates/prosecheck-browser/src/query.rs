//! Structural element queries, handles and snapshots
//!
//! Queries describe elements by structure (tag, class, attributes, enclosing
//! element) rather than in a particular query language. The Chrome session
//! renders them to CSS; the in-memory session matches them directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute filter applied by a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrFilter {
    Present(String),
    Equals(String, String),
    Prefix(String, String),
    Contains(String, String),
}

impl AttrFilter {
    fn matches(&self, attributes: &BTreeMap<String, String>) -> bool {
        match self {
            AttrFilter::Present(name) => attributes.contains_key(name),
            AttrFilter::Equals(name, value) => attributes.get(name).is_some_and(|v| v == value),
            AttrFilter::Prefix(name, value) => {
                attributes.get(name).is_some_and(|v| v.starts_with(value.as_str()))
            }
            AttrFilter::Contains(name, value) => {
                attributes.get(name).is_some_and(|v| v.contains(value.as_str()))
            }
        }
    }

    fn to_css(&self) -> String {
        match self {
            AttrFilter::Present(name) => format!("[{}]", name),
            AttrFilter::Equals(name, value) => format!("[{}=\"{}\"]", name, escape_css(value)),
            AttrFilter::Prefix(name, value) => format!("[{}^=\"{}\"]", name, escape_css(value)),
            AttrFilter::Contains(name, value) => format!("[{}*=\"{}\"]", name, escape_css(value)),
        }
    }
}

/// A structural description of a set of elements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementQuery {
    /// Lowercase tag name; `None` matches any tag
    pub tag: Option<String>,
    /// Class the element must carry
    pub class: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttrFilter>,
    /// Enclosing element the match must be a descendant of
    pub within: Option<Box<ElementQuery>>,
}

impl ElementQuery {
    /// Any element
    pub fn any() -> Self {
        Self::default()
    }

    /// Elements with the given tag
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            ..Self::default()
        }
    }

    /// Elements carrying the given class
    pub fn class(class: &str) -> Self {
        Self {
            class: Some(class.to_string()),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, filter: AttrFilter) -> Self {
        self.attributes.push(filter);
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    /// Restrict matches to descendants of `ancestor`
    pub fn within(mut self, ancestor: ElementQuery) -> Self {
        self.within = Some(Box::new(ancestor));
        self
    }

    /// Whether the element itself satisfies tag, class and attribute filters
    ///
    /// The `within` constraint needs ancestry and is checked by the session.
    pub fn matches_element(&self, info: &ElementInfo) -> bool {
        if let Some(tag) = &self.tag {
            if !info.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(class) = &self.class {
            if !info.has_class(class) {
                return false;
            }
        }
        self.attributes.iter().all(|f| f.matches(&info.attributes))
    }

    /// Render as a CSS selector
    pub fn to_css(&self) -> String {
        let mut own = self.tag.clone().unwrap_or_default();
        if let Some(class) = &self.class {
            own.push('.');
            own.push_str(class);
        }
        for filter in &self.attributes {
            own.push_str(&filter.to_css());
        }
        if own.is_empty() {
            own.push('*');
        }

        match &self.within {
            Some(ancestor) => format!("{} {}", ancestor.to_css(), own),
            None => own,
        }
    }
}

impl std::fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_css())
    }
}

fn escape_css(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// One step of an element handle: the `index`-th match of `query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleStep {
    pub query: ElementQuery,
    pub index: usize,
}

/// Path to one element, re-resolved on every use
///
/// The first step is evaluated against the whole document, every following
/// step against the descendants of the previous element. If any step no
/// longer resolves the handle is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    steps: Vec<HandleStep>,
}

impl ElementHandle {
    /// The `index`-th document-wide match of `query`
    pub fn root(query: ElementQuery, index: usize) -> Self {
        Self {
            steps: vec![HandleStep { query, index }],
        }
    }

    /// The `index`-th match of `query` among this element's descendants
    pub fn child(&self, query: ElementQuery, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(HandleStep { query, index });
        Self { steps }
    }

    pub fn steps(&self) -> &[HandleStep] {
        &self.steps
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .steps
            .iter()
            .map(|s| format!("{}[{}]", s.query, s.index))
            .collect();
        write!(f, "{}", parts.join(" >> "))
    }
}

/// Snapshot of one element's descriptive state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lowercase tag name
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Rendered text content
    #[serde(default)]
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
}

impl ElementInfo {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Visible and not disabled
    pub fn is_interactable(&self) -> bool {
        self.visible && self.enabled
    }

    /// Short label for logs: tag plus the most descriptive attribute
    pub fn summary(&self) -> String {
        let detail = self
            .attribute("title")
            .or_else(|| self.attribute("aria-label"))
            .map(str::to_string)
            .unwrap_or_else(|| self.text.trim().chars().take(40).collect());
        format!("<{}> \"{}\"", self.tag, detail)
    }
}
