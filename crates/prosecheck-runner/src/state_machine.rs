//! Pure state machine for a single test case
//!
//! This module has NO I/O. The runner feeds it events and performs the
//! actions it returns.
//!
//! Key design principles:
//! - Pure function: transition(state, event) -> (state, actions)
//! - Invalid transitions end the case Inconclusive (never panic)
//! - Terminal states are final: later events change nothing
//! - Every transition into a terminal state emits CaptureEvidence

use prosecheck_core::{Expectation, ListSignature, Verdict};

/// Per-case state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseState {
    /// Not started
    Pending,
    /// Document prepared (or being prepared), control being looked up
    Resolving,
    /// Control resolved, action running
    Acting { strategy: String },
    /// Action done, reading the document
    Verifying,
    Passed { signature: ListSignature },
    Failed {
        signature: ListSignature,
        expected: Expectation,
    },
    Inconclusive { reason: String },
    Skipped { reason: String },
}

impl CaseState {
    pub fn is_terminal(&self) -> bool {
        self.verdict().is_some()
    }

    /// Verdict of a terminal state
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            CaseState::Passed { .. } => Some(Verdict::Passed),
            CaseState::Failed { .. } => Some(Verdict::Failed),
            CaseState::Inconclusive { .. } => Some(Verdict::Inconclusive),
            CaseState::Skipped { .. } => Some(Verdict::Skipped),
            _ => None,
        }
    }

    /// Why a terminal state is not Passed
    pub fn reason(&self) -> Option<String> {
        match self {
            CaseState::Failed {
                signature,
                expected,
            } => Some(format!("expected {}, found {}", expected, signature)),
            CaseState::Inconclusive { reason } | CaseState::Skipped { reason } => {
                Some(reason.clone())
            }
            _ => None,
        }
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseEvent {
    /// Case begins
    Start,
    /// Document cleared and setup steps done; carries the informational
    /// pre-check signature when it could be read
    SetupComplete { pre_check: Option<ListSignature> },
    /// Clearing or a setup step raised an action error
    SetupFailed { error: String },
    ControlResolved {
        strategy: String,
        via_fallback: bool,
        element: String,
    },
    ControlNotFound,
    ActionCompleted,
    ActionFailed { error: String },
    Verified {
        signature: ListSignature,
        expected: Expectation,
    },
    VerificationUnreadable { error: String },
    /// An error the case cannot absorb; the run ends after this case
    Fault { error: String },
}

/// Side effects the runner performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseAction {
    /// Clear the editor, run the setup steps and take the pre-check
    PrepareDocument,
    ResolveControl,
    PerformAction,
    VerifyDocument,
    /// Store evidence labelled `<case>-<label>`
    CaptureEvidence { label: String },
    /// Append a step event to the case report
    RecordStep { step: String, message: String },
}

fn record(step: &str, message: impl Into<String>) -> CaseAction {
    CaseAction::RecordStep {
        step: step.to_string(),
        message: message.into(),
    }
}

/// Enter a terminal state with its evidence capture
fn finish(state: CaseState, step: &str, mut actions: Vec<CaseAction>) -> (CaseState, Vec<CaseAction>) {
    let verdict = state
        .verdict()
        .map_or_else(|| "unknown".to_string(), |v| v.to_string());
    let message = match state.reason() {
        Some(reason) => format!("{}: {}", verdict, reason),
        None => verdict.clone(),
    };
    actions.push(record(step, message));
    actions.push(CaseAction::CaptureEvidence { label: verdict });
    (state, actions)
}

/// Pure state transition function
///
/// Takes current state and event, returns new state and actions to execute.
/// This function is completely deterministic and has no side effects.
pub fn transition(state: CaseState, event: CaseEvent) -> (CaseState, Vec<CaseAction>) {
    match (state, event) {
        // Terminal states absorb every event
        (state, _) if state.is_terminal() => (state, vec![]),

        (CaseState::Pending, CaseEvent::Start) => (
            CaseState::Resolving,
            vec![
                record("start", "clearing document and running setup"),
                CaseAction::PrepareDocument,
            ],
        ),

        (CaseState::Resolving, CaseEvent::SetupComplete { pre_check }) => {
            let message = match pre_check {
                Some(signature) => format!("after setup: {}", signature),
                None => "after setup: document unreadable".to_string(),
            };
            (
                CaseState::Resolving,
                vec![
                    record("pre-check", message),
                    CaseAction::CaptureEvidence {
                        label: "before".to_string(),
                    },
                    CaseAction::ResolveControl,
                ],
            )
        }

        (CaseState::Resolving, CaseEvent::SetupFailed { error }) => finish(
            CaseState::Inconclusive {
                reason: format!("setup failed: {}", error),
            },
            "setup",
            vec![],
        ),

        (
            CaseState::Resolving,
            CaseEvent::ControlResolved {
                strategy,
                via_fallback,
                element,
            },
        ) => {
            let how = if via_fallback { "fallback" } else { "strategy" };
            (
                CaseState::Acting {
                    strategy: strategy.clone(),
                },
                vec![
                    record("resolve", format!("{} via {} {}", element, how, strategy)),
                    CaseAction::PerformAction,
                ],
            )
        }

        (CaseState::Resolving, CaseEvent::ControlNotFound) => finish(
            CaseState::Skipped {
                reason: "control not found".to_string(),
            },
            "resolve",
            vec![],
        ),

        (CaseState::Acting { strategy }, CaseEvent::ActionCompleted) => (
            CaseState::Verifying,
            vec![
                record("act", format!("action via {} completed", strategy)),
                CaseAction::CaptureEvidence {
                    label: "after".to_string(),
                },
                CaseAction::VerifyDocument,
            ],
        ),

        // The document is still read for the report; the verdict is already final
        (CaseState::Acting { .. }, CaseEvent::ActionFailed { error }) => {
            let (state, mut actions) = finish(
                CaseState::Inconclusive {
                    reason: format!("action failed: {}", error),
                },
                "act",
                vec![],
            );
            actions.push(CaseAction::VerifyDocument);
            (state, actions)
        }

        (
            CaseState::Verifying,
            CaseEvent::Verified {
                signature,
                expected,
            },
        ) => {
            let state = if signature.satisfies(&expected) {
                CaseState::Passed { signature }
            } else {
                CaseState::Failed {
                    signature,
                    expected,
                }
            };
            finish(state, "verify", vec![])
        }

        (CaseState::Verifying, CaseEvent::VerificationUnreadable { error }) => finish(
            CaseState::Inconclusive {
                reason: format!("verification unreadable: {}", error),
            },
            "verify",
            vec![],
        ),

        (_, CaseEvent::Fault { error }) => finish(
            CaseState::Inconclusive {
                reason: format!("unexpected fault: {}", error),
            },
            "fault",
            vec![],
        ),

        // All other invalid transitions
        (state, event) => finish(
            CaseState::Inconclusive {
                reason: format!("invalid transition: {:?} cannot handle {:?}", state, event),
            },
            "invalid",
            vec![],
        ),
    }
}
