//! Scenario execution for prosecheck
//!
//! A [`TestCase`] names its setup, the control to resolve, the action and the
//! expected list signature. [`ScenarioRunner`] drives each case through the
//! pure [`transition`] function and interprets the actions it returns, so a
//! case always ends with exactly one verdict.
//!
//! - [`state_machine`]: case states, events and transitions
//! - [`scenario`]: case definitions and the built-in suite
//! - [`runner`]: the scenario runner
//! - [`diagnostics`]: fail-open evidence capture and inspection holds
//! - [`report`]: per-case and per-run reports

pub mod diagnostics;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod state_machine;

pub use diagnostics::{manual_hold, CaptureContext, DiagnosticArtifact, DiagnosticCapture};
pub use report::{new_run_id, CaseReport, RunReport, StepEvent};
pub use runner::{RunAborted, ScenarioRunner};
pub use scenario::{
    bullet_list_control, floating_menu_containers, floating_ordered_control, ordered_list_control,
    select_cases, standard_suite, ControlSpec, TestCase,
};
pub use state_machine::{transition, CaseAction, CaseEvent, CaseState};
