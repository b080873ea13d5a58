//! Ranked locator strategies and the fallback attribute scan
//!
//! A strategy is a candidate query plus a pure predicate over the element
//! snapshot. Strategies are tried in priority order and the first visible,
//! enabled match wins.

use crate::query::{ElementInfo, ElementQuery};
use serde::{Deserialize, Serialize};

/// Predicate a candidate element must satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Every candidate matches
    Any,
    /// Attribute value contains the needle
    AttributeContains { attribute: String, needle: String },
    /// Visible text contains the needle
    TextContains(String),
    /// Visible text contains any of the needles
    TextContainsAny(Vec<String>),
}

/// One way of finding a control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStrategy {
    /// Lower runs first; ties keep declaration order
    pub priority: u32,
    /// Candidate elements the rule is applied to
    pub candidates: ElementQuery,
    pub rule: MatchRule,
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

fn default_true() -> bool {
    true
}

impl LocatorStrategy {
    /// Every visible, enabled match of `candidates`
    pub fn any(priority: u32, candidates: ElementQuery) -> Self {
        Self {
            priority,
            candidates,
            rule: MatchRule::Any,
            case_insensitive: true,
        }
    }

    /// `tag[attribute*="needle" i]`
    pub fn attribute_contains(priority: u32, tag: &str, attribute: &str, needle: &str) -> Self {
        Self {
            priority,
            candidates: ElementQuery::tag(tag),
            rule: MatchRule::AttributeContains {
                attribute: attribute.to_string(),
                needle: needle.to_string(),
            },
            case_insensitive: true,
        }
    }

    /// `tag` whose text contains `needle`
    pub fn text_contains(priority: u32, tag: &str, needle: &str) -> Self {
        Self {
            priority,
            candidates: ElementQuery::tag(tag),
            rule: MatchRule::TextContains(needle.to_string()),
            case_insensitive: true,
        }
    }

    /// `tag` whose text contains any of `needles`
    pub fn text_contains_any(priority: u32, tag: &str, needles: &[&str]) -> Self {
        Self {
            priority,
            candidates: ElementQuery::tag(tag),
            rule: MatchRule::TextContainsAny(needles.iter().map(|n| n.to_string()).collect()),
            case_insensitive: true,
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    /// Whether a candidate's snapshot satisfies the rule
    ///
    /// Visibility and enablement are checked by the resolver.
    pub fn matches(&self, info: &ElementInfo) -> bool {
        let contains = |haystack: &str, needle: &str| {
            if self.case_insensitive {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            } else {
                haystack.contains(needle)
            }
        };

        match &self.rule {
            MatchRule::Any => true,
            MatchRule::AttributeContains { attribute, needle } => info
                .attribute(attribute)
                .is_some_and(|value| contains(value, needle)),
            MatchRule::TextContains(needle) => contains(&info.text, needle),
            MatchRule::TextContainsAny(needles) => {
                needles.iter().any(|needle| contains(&info.text, needle))
            }
        }
    }

    /// Human-readable label recorded with a resolved control
    pub fn label(&self) -> String {
        let flag = if self.case_insensitive { " i" } else { "" };
        match &self.rule {
            MatchRule::Any => self.candidates.to_css(),
            MatchRule::AttributeContains { attribute, needle } => format!(
                "{}[{}*=\"{}\"{}]",
                self.candidates.to_css(),
                attribute,
                needle,
                flag
            ),
            MatchRule::TextContains(needle) => {
                format!("{}:has-text(\"{}\")", self.candidates.to_css(), needle)
            }
            MatchRule::TextContainsAny(needles) => format!(
                "{}:has-text(/{}/{})",
                self.candidates.to_css(),
                needles.join("|"),
                flag.trim()
            ),
        }
    }
}

/// Strategies in the order they are tried
pub fn ranked(strategies: &[LocatorStrategy]) -> Vec<&LocatorStrategy> {
    let mut ordered: Vec<&LocatorStrategy> = strategies.iter().collect();
    // sort_by_key is stable
    ordered.sort_by_key(|s| s.priority);
    ordered
}

/// Last-resort scan over every element of a tag
///
/// Matching is always case-insensitive over the descriptive attributes and,
/// unless disabled, the visible text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackScan {
    pub tag: String,
    pub attributes: Vec<String>,
    pub include_text: bool,
    pub keywords: Vec<String>,
}

impl FallbackScan {
    /// Scan `title`, `aria-label` and text of every `tag` for `keywords`
    pub fn new(tag: &str, keywords: &[&str]) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: vec!["title".to_string(), "aria-label".to_string()],
            include_text: true,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Only look at attributes, not text
    pub fn attributes_only(mut self) -> Self {
        self.include_text = false;
        self
    }

    pub fn query(&self) -> ElementQuery {
        ElementQuery::tag(&self.tag)
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, info: &ElementInfo) -> bool {
        let hit = |value: &str| {
            let value = value.to_lowercase();
            self.keywords.iter().any(|k| value.contains(k.as_str()))
        };

        self.attributes
            .iter()
            .filter_map(|name| info.attribute(name))
            .any(hit)
            || (self.include_text && hit(&info.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn element(tag: &str, attrs: &[(&str, &str)], text: &str) -> ElementInfo {
        ElementInfo {
            tag: tag.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            text: text.to_string(),
            visible: true,
            enabled: true,
        }
    }

    #[test]
    fn test_attribute_rule_case_insensitive() {
        let strategy = LocatorStrategy::attribute_contains(0, "button", "title", "ordered");
        assert!(strategy.matches(&element("button", &[("title", "Ordered List")], "")));
        assert!(!strategy.matches(&element("button", &[("aria-label", "Ordered")], "")));

        let strict = strategy.case_sensitive();
        assert!(!strict.matches(&element("button", &[("title", "Ordered List")], "")));
        assert!(strict.matches(&element("button", &[("title", "unordered")], "")));
    }

    #[test]
    fn test_text_rules() {
        let strategy = LocatorStrategy::text_contains(0, "button", "Numbered");
        assert!(strategy.matches(&element("button", &[], "numbered list")));

        let any = LocatorStrategy::text_contains_any(0, "button", &["ordered", "numbered"]);
        assert!(any.matches(&element("button", &[], "Numbered")));
        assert!(!any.matches(&element("button", &[], "Bullet")));
    }

    #[test]
    fn test_ranked_is_stable() {
        let strategies = vec![
            LocatorStrategy::attribute_contains(2, "button", "title", "c"),
            LocatorStrategy::attribute_contains(1, "button", "title", "a"),
            LocatorStrategy::attribute_contains(1, "button", "title", "b"),
        ];
        let labels: Vec<String> = ranked(&strategies).iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec![
                "button[title*=\"a\" i]",
                "button[title*=\"b\" i]",
                "button[title*=\"c\" i]",
            ]
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            LocatorStrategy::text_contains(0, "button", "Ordered").label(),
            "button:has-text(\"Ordered\")"
        );
        assert_eq!(
            LocatorStrategy::text_contains_any(0, "button", &["ordered", "numbered"]).label(),
            "button:has-text(/ordered|numbered/i)"
        );
        assert_eq!(
            LocatorStrategy::any(0, ElementQuery::class("floating-menu")).label(),
            ".floating-menu"
        );
    }

    #[test]
    fn test_fallback_scan() {
        let scan = FallbackScan::new("button", &["Numbered", "ordered"]);
        assert!(scan.matches(&element("button", &[("aria-label", "Numbered list")], "")));
        assert!(scan.matches(&element("button", &[], "Ordered")));
        assert!(!scan.matches(&element("button", &[("title", "Bold")], "B")));

        let attrs_only = scan.attributes_only();
        assert!(!attrs_only.matches(&element("button", &[], "Ordered")));
        assert!(FallbackScan::new("button", &[]).is_empty());
    }
}
