//! Per-case and per-run reports

use crate::diagnostics::DiagnosticArtifact;
use crate::scenario::TestCase;
use crate::state_machine::{CaseEvent, CaseState};
use chrono::{DateTime, Utc};
use prosecheck_browser::navigation::NavigationOutcome;
use prosecheck_core::{Expectation, ListSignature, Result, Verdict};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Identifier for a new run: UTC timestamp plus a short random suffix
pub fn new_run_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), &id[..8])
}

/// Structured record of one step, mirrored to tracing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    pub at: DateTime<Utc>,
    pub step: String,
    pub message: String,
}

/// Outcome of one test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub verdict: Verdict,
    pub reason: Option<String>,
    /// Strategy that resolved the control
    pub strategy: Option<String>,
    pub via_fallback: bool,
    /// Document signature right after setup
    pub pre_check: Option<ListSignature>,
    /// Document signature after the action
    pub signature: Option<ListSignature>,
    pub expected: Expectation,
    pub events: Vec<StepEvent>,
    pub artifacts: Vec<DiagnosticArtifact>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CaseReport {
    /// A case that has not produced a verdict yet
    pub fn start(case: &TestCase) -> Self {
        Self {
            name: case.name.clone(),
            verdict: Verdict::Inconclusive,
            reason: None,
            strategy: None,
            via_fallback: false,
            pre_check: None,
            signature: None,
            expected: case.expected,
            events: Vec::new(),
            artifacts: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// A case the run never got to
    pub fn not_attempted(case: &TestCase, reason: &str) -> Self {
        let mut report = Self::start(case);
        report.verdict = Verdict::Skipped;
        report.reason = Some(format!("not attempted: {}", reason));
        report.finished_at = Some(Utc::now());
        report
    }

    pub fn record(&mut self, step: &str, message: &str) {
        info!(case = %self.name, step = %step, "{}", message);
        self.events.push(StepEvent {
            at: Utc::now(),
            step: step.to_string(),
            message: message.to_string(),
        });
    }

    /// Keep what an event tells about the document and the control
    pub fn observe(&mut self, event: &CaseEvent) {
        match event {
            CaseEvent::SetupComplete { pre_check } => self.pre_check = *pre_check,
            CaseEvent::ControlResolved {
                strategy,
                via_fallback,
                ..
            } => {
                self.strategy = Some(strategy.clone());
                self.via_fallback = *via_fallback;
            }
            CaseEvent::Verified { signature, .. } => self.signature = Some(*signature),
            _ => {}
        }
    }

    /// Take the verdict from a terminal state
    pub fn finish(&mut self, state: &CaseState) {
        self.verdict = state.verdict().unwrap_or(Verdict::Inconclusive);
        self.reason = match state.verdict() {
            Some(_) => state.reason(),
            None => Some(format!("case stopped in {:?}", state)),
        };
        self.finished_at = Some(Utc::now());
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub target_url: String,
    pub navigation: Option<NavigationOutcome>,
    pub cases: Vec<CaseReport>,
    /// Run-level evidence (navigation, faults)
    pub artifacts: Vec<DiagnosticArtifact>,
    /// Unexpected fault that ended the run
    pub fault: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new(run_id: &str, target_url: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            target_url: target_url.to_string(),
            navigation: None,
            cases: Vec::new(),
            artifacts: Vec::new(),
            fault: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.cases.iter().filter(|c| c.verdict == verdict).count()
    }

    pub fn verdict_of(&self, name: &str) -> Option<Verdict> {
        self.cases.iter().find(|c| c.name == name).map(|c| c.verdict)
    }

    /// Whether the editor could not be reached
    pub fn navigation_blocked(&self) -> bool {
        self.navigation.is_some_and(|n| !n.is_ready())
    }

    /// 0 when nothing failed, 1 when a case failed, 2 when the run faulted
    /// or never reached the editor
    pub fn exit_code(&self) -> i32 {
        if self.fault.is_some() || self.navigation_blocked() {
            2
        } else if self.cases.iter().any(|c| c.verdict.is_failure()) {
            1
        } else {
            0
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} cases: {} passed, {} failed, {} inconclusive, {} skipped",
            self.cases.len(),
            self.count(Verdict::Passed),
            self.count(Verdict::Failed),
            self.count(Verdict::Inconclusive),
            self.count(Verdict::Skipped),
        );
        if let Some(navigation) = self.navigation.filter(|n| !n.is_ready()) {
            summary.push_str(&format!(" ({})", navigation));
        }
        if let Some(fault) = &self.fault {
            summary.push_str(&format!(" (aborted: {})", fault));
        }
        summary
    }

    /// Write the report as pretty JSON
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}
