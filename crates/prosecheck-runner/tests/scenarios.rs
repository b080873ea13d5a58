//! Integration tests for the scenario runner.
//!
//! These tests drive whole cases against the simulated editor session with
//! every settle delay collapsed, so they exercise resolution, actions,
//! verification, verdicts and evidence together.

use prosecheck_browser::actions::{type_lines, ActionStep, Target};
use prosecheck_browser::memory::{EditorCommand, MemoryPage, MemorySession, PageElement};
use prosecheck_browser::navigation::NavigationOutcome;
use prosecheck_browser::query::ElementQuery;
use prosecheck_core::config::{HoldConfig, TimingConfig};
use prosecheck_core::{ArtifactStore, HarnessConfig, ListSignature, MemorySink, Verdict};
use prosecheck_runner::scenario::{bullet_to_ordered, ordered_to_bullet, standard_suite};
use prosecheck_runner::{RunReport, ScenarioRunner};
use tempfile::TempDir;

fn config() -> HarnessConfig {
    HarnessConfig {
        timing: TimingConfig::immediate(),
        hold: HoldConfig::none(),
        ..HarnessConfig::default()
    }
}

fn fresh_report(config: &HarnessConfig) -> RunReport {
    RunReport::new("test-run", &config.target_url)
}

/// Editor page with a single extra element
fn page_with_button(button: PageElement) -> (MemoryPage, usize) {
    let mut page = MemoryPage::with_editor("ProseMirror");
    let id = page.add(button);
    (page, id)
}

#[tokio::test]
async fn test_standard_suite_passes() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let report = runner.run(&standard_suite(&config)).await.unwrap();

    assert_eq!(report.navigation, Some(NavigationOutcome::EditorReady));
    assert_eq!(report.cases.len(), 3);
    for case in &report.cases {
        assert_eq!(case.verdict, Verdict::Passed, "{}: {:?}", case.name, case.reason);
    }
    assert_eq!(report.exit_code(), 0);
    assert!(report.finished_at.is_some());
    assert!(sink.labels().contains(&"page-loaded".to_string()));
}

#[tokio::test]
async fn test_bullet_marker_after_text_converts_to_ordered() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let (report, fault) = runner.run_case(&bullet_to_ordered(&config)).await;

    assert!(fault.is_none());
    assert_eq!(report.verdict, Verdict::Passed);
    assert_eq!(report.signature, Some(ListSignature::new(true, false)));
    assert_eq!(report.pre_check, Some(ListSignature::new(false, false)));
    assert!(report.strategy.as_deref().is_some_and(|s| s.contains("ordered")));
    assert!(!report.via_fallback);
}

#[tokio::test]
async fn test_ordered_marker_after_text_converts_to_bullet() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let (report, _) = runner.run_case(&ordered_to_bullet(&config)).await;

    assert_eq!(report.verdict, Verdict::Passed);
    assert_eq!(report.signature, Some(ListSignature::new(false, true)));
}

#[tokio::test]
async fn test_dash_after_text_then_ordered_control() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let mut case = bullet_to_ordered(&config);
    case.setup = type_lines(&["A- ", "B"]);
    let (report, fault) = runner.run_case(&case).await;

    assert!(fault.is_none());
    assert_eq!(report.pre_check, Some(ListSignature::new(false, false)));
    assert_eq!(report.signature, Some(ListSignature::new(true, false)));
    assert_eq!(report.verdict, Verdict::Passed, "{:?}", report.reason);
}

#[tokio::test]
async fn test_number_after_text_then_bullet_control() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let mut case = ordered_to_bullet(&config);
    case.setup = type_lines(&["A1. ", "B"]);
    let (report, fault) = runner.run_case(&case).await;

    assert!(fault.is_none());
    assert_eq!(report.pre_check, Some(ListSignature::new(false, false)));
    assert_eq!(report.signature, Some(ListSignature::new(false, true)));
    assert_eq!(report.verdict, Verdict::Passed, "{:?}", report.reason);
}

#[tokio::test]
async fn test_case_starts_from_cleared_document() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    // The first case leaves an ordered list behind
    let (first, _) = runner.run_case(&bullet_to_ordered(&config)).await;
    assert_eq!(first.verdict, Verdict::Passed);

    let (second, _) = runner.run_case(&ordered_to_bullet(&config)).await;
    assert_eq!(second.pre_check, Some(ListSignature::new(false, false)));
    assert_eq!(second.signature, Some(ListSignature::new(false, true)));
}

#[tokio::test]
async fn test_higher_priority_strategy_wins() {
    let config = config();
    let mut page = MemoryPage::with_editor("ProseMirror");
    let by_text = page.add(PageElement::button("Ordered").command(EditorCommand::ToggleOrderedList));
    let by_title = page.add(
        PageElement::button("")
            .title("Numbered list")
            .command(EditorCommand::ToggleOrderedList),
    );
    let session = MemorySession::new(page);
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let (report, _) = runner.run_case(&bullet_to_ordered(&config)).await;

    assert_eq!(report.verdict, Verdict::Passed);
    assert!(report
        .strategy
        .as_deref()
        .is_some_and(|s| s.contains("title") && s.contains("numbered")));
    assert_eq!(session.click_count(by_title), 1);
    assert_eq!(session.click_count(by_text), 0);
}

#[tokio::test]
async fn test_missing_control_is_skipped_with_evidence() {
    let config = config();
    let session = MemorySession::new(MemoryPage::with_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let (report, fault) = runner.run_case(&bullet_to_ordered(&config)).await;

    assert!(fault.is_none());
    assert_eq!(report.verdict, Verdict::Skipped);
    assert!(report.strategy.is_none());
    assert!(report.signature.is_none());
    let last = report.artifacts.last().unwrap();
    assert_eq!(last.label, "bullet-to-ordered-skipped");
    assert!(last.screenshot.is_some());
    assert!(last.markup.is_some());
}

#[tokio::test]
async fn test_wrong_conversion_fails_with_evidence() {
    let config = config();
    let (page, _) = page_with_button(
        PageElement::button("")
            .title("Ordered list")
            .command(EditorCommand::ToggleBulletList),
    );
    let session = MemorySession::new(page);
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let (report, fault) = runner.run_case(&bullet_to_ordered(&config)).await;

    assert!(fault.is_none());
    assert_eq!(report.verdict, Verdict::Failed);
    assert_eq!(report.signature, Some(ListSignature::new(false, true)));
    assert!(report.reason.as_deref().is_some_and(|r| r.starts_with("expected")));

    let labels: Vec<&str> = report.artifacts.iter().map(|a| a.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["bullet-to-ordered-before", "bullet-to-ordered-after", "bullet-to-ordered-failed"]
    );
    assert!(report.artifacts[2].markup.is_some());
    assert!(report.artifacts[0].markup.is_none());
}

#[tokio::test]
async fn test_disabled_control_is_inconclusive() {
    let config = config();
    let (page, button) = page_with_button(
        PageElement::button("")
            .title("Ordered list")
            .command(EditorCommand::ToggleOrderedList),
    );
    let session = MemorySession::new(page);
    session.set_enabled(button, false);
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let (report, fault) = runner.run_case(&bullet_to_ordered(&config)).await;

    // Only the fallback scan accepts a disabled control; acting on it fails
    assert!(fault.is_none());
    assert!(report.via_fallback);
    assert_eq!(report.verdict, Verdict::Inconclusive);
    assert_eq!(session.click_count(button), 0);
    assert_eq!(report.signature, Some(ListSignature::new(false, false)));
}

#[tokio::test]
async fn test_action_error_is_inconclusive() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let mut case = bullet_to_ordered(&config);
    case.action
        .insert(0, ActionStep::click(Target::First(ElementQuery::class("missing-panel"))));
    let (report, fault) = runner.run_case(&case).await;

    assert!(fault.is_none());
    assert_eq!(report.verdict, Verdict::Inconclusive);
    assert!(report.reason.as_deref().is_some_and(|r| r.contains("missing-panel")));
    assert_eq!(
        report.artifacts.last().map(|a| a.label.as_str()),
        Some("bullet-to-ordered-inconclusive")
    );
}

#[tokio::test]
async fn test_unreadable_candidate_is_skipped() {
    let config = config();
    let mut page = MemoryPage::with_editor("ProseMirror");
    let broken = page.add(PageElement::button("").title("Ordered list").unreadable());
    let working = page.add(
        PageElement::button("")
            .aria_label("Numbered list")
            .command(EditorCommand::ToggleOrderedList),
    );
    let session = MemorySession::new(page);
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let (report, fault) = runner.run_case(&bullet_to_ordered(&config)).await;

    assert!(fault.is_none());
    assert_eq!(report.verdict, Verdict::Passed);
    assert!(report.strategy.as_deref().is_some_and(|s| s.contains("aria-label")));
    assert_eq!(session.click_count(broken), 0);
    assert_eq!(session.click_count(working), 1);
}

#[tokio::test]
async fn test_capture_failure_does_not_change_verdict() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    session.fail_screenshots(true);
    let sink = MemorySink::new();
    sink.set_failing(true);
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let (report, fault) = runner.run_case(&bullet_to_ordered(&config)).await;

    assert!(fault.is_none());
    assert_eq!(report.verdict, Verdict::Passed);
    assert!(!report.artifacts.is_empty());
    assert!(report.artifacts.iter().all(|a| !a.is_stored()));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_fault_aborts_run_and_skips_remaining_cases() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    session.disconnect();
    let aborted = runner
        .run_cases(&standard_suite(&config), fresh_report(&config))
        .await
        .unwrap_err();

    let report = aborted.report;
    assert_eq!(report.cases.len(), 3);
    assert_eq!(report.cases[0].verdict, Verdict::Inconclusive);
    assert_eq!(report.cases[1].verdict, Verdict::Skipped);
    assert_eq!(report.cases[2].verdict, Verdict::Skipped);
    assert_eq!(
        report.cases[1].reason.as_deref(),
        Some("not attempted: run aborted")
    );
    assert!(report.fault.is_some());
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.artifacts.last().map(|a| a.label.as_str()), Some("run-fault"));
}

#[tokio::test]
async fn test_every_unpassed_case_has_evidence_after_abort() {
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    session.disconnect();
    let aborted = runner
        .run_cases(&standard_suite(&config), fresh_report(&config))
        .await
        .unwrap_err();

    for case in &aborted.report.cases {
        assert_ne!(case.verdict, Verdict::Passed);
        assert!(!case.artifacts.is_empty(), "{} has no evidence", case.name);
    }
    let skipped = &aborted.report.cases[2];
    assert_eq!(skipped.artifacts[0].label, "run-fault");
}

#[tokio::test]
async fn test_missing_workspace_stops_before_cases() {
    let config = config();
    let page = MemoryPage::with_editor("ProseMirror").editor_at("/d/team/notes");
    let session = MemorySession::new(page);
    let sink = MemorySink::new();
    let runner = ScenarioRunner::new(&session, &sink, &config);

    let report = runner.run(&standard_suite(&config)).await.unwrap();

    assert_eq!(report.navigation, Some(NavigationOutcome::NeedsManualNavigation));
    assert!(report.cases.is_empty());
    assert_eq!(report.exit_code(), 2);
    assert!(sink.labels().contains(&"no-workspace".to_string()));
}

#[tokio::test]
async fn test_run_writes_evidence_to_store() {
    let temp = TempDir::new().unwrap();
    let config = config();
    let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
    let store = ArtifactStore::new(temp.path(), "run-1");
    let runner = ScenarioRunner::new(&session, &store, &config).with_run_id("run-1");

    let report = runner.run(&standard_suite(&config)).await.unwrap();
    assert_eq!(report.run_id, "run-1");
    assert_eq!(report.exit_code(), 0);

    let stored = store.list("run-1").await.unwrap();
    assert!(stored.iter().any(|a| a.label == "bullet-to-ordered-passed"));

    let path = store.run_dir().join("report.json");
    report.save(&path).await.unwrap();
    let loaded = RunReport::load(&path).await.unwrap();
    assert_eq!(loaded.cases.len(), 3);
}
