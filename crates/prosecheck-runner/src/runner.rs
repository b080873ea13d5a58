//! Scenario runner: drives each case through its state machine
//!
//! Cases run one after another against a single session. A case's own
//! errors end that case with a verdict; only an unexpected fault stops the
//! run, after evidence and the inspection hold.

use crate::diagnostics::{manual_hold, CaptureContext, DiagnosticCapture};
use crate::report::{new_run_id, CaseReport, RunReport};
use crate::scenario::TestCase;
use crate::state_machine::{transition, CaseAction, CaseEvent, CaseState};
use prosecheck_browser::actions::{clear_document, ActionExecutor, ActionStep, Target};
use prosecheck_browser::navigation::Navigator;
use prosecheck_browser::query::ElementQuery;
use prosecheck_browser::resolver::{Resolution, ResolvedControl, SelectorResolver};
use prosecheck_browser::session::Session;
use prosecheck_browser::verification::StateVerifier;
use prosecheck_core::{CheckError, EvidenceSink, HarnessConfig, Result, Verdict};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{error, info, warn};

/// A run stopped by an unexpected fault; carries the partial report
#[derive(Debug, Error)]
#[error("Run aborted: {error}")]
pub struct RunAborted {
    pub report: Box<RunReport>,
    #[source]
    pub error: CheckError,
}

/// Runs test cases against one session
pub struct ScenarioRunner<'a> {
    session: &'a dyn Session,
    sink: &'a dyn EvidenceSink,
    config: &'a HarnessConfig,
    run_id: String,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(session: &'a dyn Session, sink: &'a dyn EvidenceSink, config: &'a HarnessConfig) -> Self {
        Self {
            session,
            sink,
            config,
            run_id: new_run_id(),
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn editor(&self) -> ElementQuery {
        ElementQuery::class(&self.config.editor.root_class)
    }

    fn diagnostics(&self) -> DiagnosticCapture<'_> {
        DiagnosticCapture::new(self.session, self.sink, self.editor())
    }

    fn executor(&self) -> ActionExecutor<'_> {
        ActionExecutor::new(self.session, self.editor(), &self.config.timing)
    }

    /// Navigate to the editor, then run every case
    pub async fn run(&self, cases: &[TestCase]) -> std::result::Result<RunReport, RunAborted> {
        let mut report = RunReport::new(&self.run_id, &self.config.target_url);
        info!("Starting run {} against {}", self.run_id, self.config.target_url);

        let navigator = Navigator::new(self.session, self.sink, self.config);
        match navigator.open_editor().await {
            Ok(outcome) => {
                report.navigation = Some(outcome);
                if !outcome.is_ready() {
                    warn!("Cannot run cases: {}", outcome);
                    manual_hold(&outcome.to_string(), self.config.hold.missing_editor()).await;
                    report.finish();
                    return Ok(report);
                }
            }
            Err(e) => return Err(self.abort(report, e, cases).await),
        }

        self.run_cases(cases, report).await
    }

    /// Run cases against an editor that is already open
    pub async fn run_cases(
        &self,
        cases: &[TestCase],
        mut report: RunReport,
    ) -> std::result::Result<RunReport, RunAborted> {
        for (index, case) in cases.iter().enumerate() {
            info!("=== {} ({}/{}) ===", case.name, index + 1, cases.len());
            let (case_report, fault) = self.run_case(case).await;
            info!("{}: {}", case.name, case_report.verdict);
            report.cases.push(case_report);

            if let Some(fault) = fault {
                return Err(self.abort(report, fault, &cases[index + 1..]).await);
            }
        }

        info!("Run {} complete: {}", self.run_id, report.summary());
        manual_hold("run complete", self.config.hold.after_run()).await;
        report.finish();
        Ok(report)
    }

    /// Run one case to a verdict; the error is set when the run must stop
    pub async fn run_case(&self, case: &TestCase) -> (CaseReport, Option<CheckError>) {
        let mut report = CaseReport::start(case);
        let mut fault: Option<CheckError> = None;
        let mut control: Option<ResolvedControl> = None;

        let (mut state, actions) = transition(CaseState::Pending, CaseEvent::Start);
        let mut queue: VecDeque<CaseAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            let outcome = match action {
                CaseAction::RecordStep { step, message } => {
                    report.record(&step, &message);
                    continue;
                }
                CaseAction::CaptureEvidence { label } => {
                    let mut context = CaptureContext::case(&case.name, &label);
                    if state.verdict().is_some_and(|v| v != Verdict::Passed) {
                        context = context.with_markup();
                    }
                    let artifact = self
                        .diagnostics()
                        .capture(&format!("{}-{}", case.name, label), &context)
                        .await;
                    report.artifacts.push(artifact);
                    continue;
                }
                CaseAction::PrepareDocument => self.prepare(case).await,
                CaseAction::ResolveControl => match self.resolve(case).await {
                    Ok((event, resolved)) => {
                        control = resolved;
                        Ok(event)
                    }
                    Err(e) => Err(e),
                },
                CaseAction::PerformAction => self.perform(case, control.as_ref()).await,
                CaseAction::VerifyDocument => {
                    // The resolved control is only valid for the step that resolved it
                    control = None;
                    self.verify(case).await
                }
            };

            let event = match outcome {
                Ok(event) => event,
                Err(e) => {
                    error!("{}: unexpected fault: {}", case.name, e);
                    let event = CaseEvent::Fault {
                        error: e.to_string(),
                    };
                    fault = Some(e);
                    event
                }
            };

            report.observe(&event);
            let (next, actions) = transition(state, event);
            state = next;
            queue.extend(actions);
        }

        report.finish(&state);
        (report, fault)
    }

    /// Focus the editor, clear it, run setup and read the pre-check
    async fn prepare(&self, case: &TestCase) -> Result<CaseEvent> {
        let mut steps = vec![ActionStep::click(Target::Editor)];
        steps.extend(clear_document(&self.config.timing));
        steps.extend(case.setup.iter().cloned());

        if let Err(e) = self.executor().run_sequence(&steps, None).await {
            if !e.is_recoverable() {
                return Err(e);
            }
            return Ok(CaseEvent::SetupFailed {
                error: e.to_string(),
            });
        }

        let pre_check = match StateVerifier::new(self.session).verify(&case.verification).await {
            Ok(signature) => Some(signature),
            Err(e) if e.is_recoverable() => None,
            Err(e) => return Err(e),
        };
        Ok(CaseEvent::SetupComplete { pre_check })
    }

    async fn resolve(&self, case: &TestCase) -> Result<(CaseEvent, Option<ResolvedControl>)> {
        let resolver = SelectorResolver::new(self.session, &self.config.timing);
        let spec = &case.control;
        let timeout = self.config.timing.resolve_timeout();

        let resolution = if spec.is_scoped() {
            resolver
                .resolve_within(&spec.container, &spec.strategies, spec.fallback.as_ref(), timeout)
                .await?
        } else {
            resolver
                .resolve(&spec.strategies, spec.fallback.as_ref(), timeout)
                .await?
        };

        Ok(match resolution {
            Resolution::Resolved(control) => (
                CaseEvent::ControlResolved {
                    strategy: control.strategy.clone(),
                    via_fallback: control.via_fallback,
                    element: control.info.summary(),
                },
                Some(control),
            ),
            Resolution::NotFound => (CaseEvent::ControlNotFound, None),
        })
    }

    async fn perform(&self, case: &TestCase, control: Option<&ResolvedControl>) -> Result<CaseEvent> {
        match self.executor().run_sequence(&case.action, control).await {
            Ok(()) => Ok(CaseEvent::ActionCompleted),
            Err(e) if e.is_recoverable() => Ok(CaseEvent::ActionFailed {
                error: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn verify(&self, case: &TestCase) -> Result<CaseEvent> {
        match StateVerifier::new(self.session).verify(&case.verification).await {
            Ok(signature) => Ok(CaseEvent::Verified {
                signature,
                expected: case.expected,
            }),
            Err(e) if e.is_recoverable() => Ok(CaseEvent::VerificationUnreadable {
                error: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Capture run-level evidence, hold, and wrap the fault with the report
    ///
    /// Cases the run never reached are reported skipped and carry the
    /// run-level evidence.
    async fn abort(&self, mut report: RunReport, error: CheckError, not_attempted: &[TestCase]) -> RunAborted {
        error!("Error during run {}: {}", self.run_id, error);
        let artifact = self
            .diagnostics()
            .capture("run-fault", &CaptureContext::run("fault"))
            .await;
        for case in not_attempted {
            let mut case_report = CaseReport::not_attempted(case, "run aborted");
            case_report.artifacts.push(artifact.clone());
            report.cases.push(case_report);
        }
        report.artifacts.push(artifact);
        report.fault = Some(error.to_string());

        manual_hold("run fault", self.config.hold.on_fault()).await;
        report.finish();
        RunAborted {
            report: Box::new(report),
            error,
        }
    }
}
