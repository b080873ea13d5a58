//! Core type definitions shared across prosecheck crates

use serde::{Deserialize, Serialize};

/// Final outcome of a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Control resolved, action executed, expected structure present
    Passed,
    /// Control resolved, action executed, expected structure absent
    Failed,
    /// The attempt could not be completed (action error or unreadable state)
    Inconclusive,
    /// The control could not be resolved, so nothing was attempted
    Skipped,
}

impl Verdict {
    /// Whether this verdict counts against the run
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Failed)
    }

    /// "Could not attempt" outcomes, as opposed to "attempted and wrong"
    pub fn is_unattempted(&self) -> bool {
        matches!(self, Verdict::Inconclusive | Verdict::Skipped)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Inconclusive => write!(f, "inconclusive"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passed" | "pass" => Ok(Self::Passed),
            "failed" | "fail" => Ok(Self::Failed),
            "inconclusive" => Ok(Self::Inconclusive),
            "skipped" | "skip" => Ok(Self::Skipped),
            _ => Err(format!("Invalid verdict: {}", s)),
        }
    }
}

/// Structural list flags read from the editor document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSignature {
    /// An ordered-list node exists under the editor root
    pub ordered: bool,
    /// A bullet-list node exists under the editor root
    pub bulleted: bool,
}

impl ListSignature {
    pub fn new(ordered: bool, bulleted: bool) -> Self {
        Self { ordered, bulleted }
    }

    /// No list of either kind
    pub fn is_empty(&self) -> bool {
        !self.ordered && !self.bulleted
    }

    /// Whether this signature satisfies an expectation
    pub fn satisfies(&self, expected: &Expectation) -> bool {
        expected.ordered.map_or(true, |o| o == self.ordered)
            && expected.bulleted.map_or(true, |b| b == self.bulleted)
    }
}

impl std::fmt::Display for ListSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ordered: {}, bulleted: {}}}", self.ordered, self.bulleted)
    }
}

/// Expected structural signature; `None` fields are not checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub ordered: Option<bool>,
    pub bulleted: Option<bool>,
}

impl Expectation {
    /// Both flags must match exactly
    pub fn exact(ordered: bool, bulleted: bool) -> Self {
        Self {
            ordered: Some(ordered),
            bulleted: Some(bulleted),
        }
    }

    /// Only the ordered flag is checked
    pub fn ordered_present() -> Self {
        Self {
            ordered: Some(true),
            bulleted: None,
        }
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: Option<bool>| v.map_or_else(|| "any".to_string(), |b| b.to_string());
        write!(
            f,
            "{{ordered: {}, bulleted: {}}}",
            show(self.ordered),
            show(self.bulleted)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_roundtrip_str() {
        for v in [
            Verdict::Passed,
            Verdict::Failed,
            Verdict::Inconclusive,
            Verdict::Skipped,
        ] {
            assert_eq!(v.to_string().parse::<Verdict>().unwrap(), v);
        }
        assert!("maybe".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_verdict_classes() {
        assert!(Verdict::Failed.is_failure());
        assert!(!Verdict::Skipped.is_failure());
        assert!(Verdict::Skipped.is_unattempted());
        assert!(Verdict::Inconclusive.is_unattempted());
        assert!(!Verdict::Passed.is_unattempted());
    }

    #[test]
    fn test_exact_expectation() {
        let expected = Expectation::exact(true, false);
        assert!(ListSignature::new(true, false).satisfies(&expected));
        assert!(!ListSignature::new(true, true).satisfies(&expected));
        assert!(!ListSignature::new(false, false).satisfies(&expected));
    }

    #[test]
    fn test_partial_expectation() {
        let expected = Expectation::ordered_present();
        assert!(ListSignature::new(true, true).satisfies(&expected));
        assert!(ListSignature::new(true, false).satisfies(&expected));
        assert!(!ListSignature::new(false, true).satisfies(&expected));
    }

    #[test]
    fn test_signature_display() {
        assert_eq!(
            ListSignature::new(true, false).to_string(),
            "{ordered: true, bulleted: false}"
        );
        assert_eq!(
            Expectation::ordered_present().to_string(),
            "{ordered: true, bulleted: any}"
        );
    }
}
