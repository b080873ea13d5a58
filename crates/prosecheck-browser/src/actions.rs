//! Typed action steps and their executor
//!
//! Compound gestures are plain sequences of primitive steps, with every wait
//! an explicit, named step of its own.

use crate::error::Result;
use crate::query::{ElementHandle, ElementQuery};
use crate::resolver::ResolvedControl;
use crate::session::{KeyChord, Session};
use crate::wait::await_stable;
use prosecheck_core::config::TimingConfig;
use prosecheck_core::CheckError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Element a click or select is aimed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The editor surface
    Editor,
    /// The control resolved for the current step
    Control,
    /// The first document-wide match of a query
    First(ElementQuery),
}

/// Condition an [`ActionStep::AwaitStable`] polls for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StableProbe {
    /// Editor markup unchanged between two consecutive polls
    EditorMarkupSettled,
    /// At least one visible match of the query
    SelectorVisible(ElementQuery),
}

/// One primitive instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStep {
    Click(Target),
    /// Literal keystrokes, so editor input rules fire
    TypeText(String),
    Press(KeyChord),
    Select { target: Target, value: String },
    Settle { label: String, delay: Duration },
    AwaitStable {
        label: String,
        probe: StableProbe,
        timeout: Duration,
    },
}

impl ActionStep {
    pub fn click(target: Target) -> Self {
        ActionStep::Click(target)
    }

    pub fn type_text(text: &str) -> Self {
        ActionStep::TypeText(text.to_string())
    }

    pub fn press(chord: KeyChord) -> Self {
        ActionStep::Press(chord)
    }

    pub fn settle(label: &str, delay: Duration) -> Self {
        ActionStep::Settle {
            label: label.to_string(),
            delay,
        }
    }

    pub fn await_stable(label: &str, probe: StableProbe, timeout: Duration) -> Self {
        ActionStep::AwaitStable {
            label: label.to_string(),
            probe,
            timeout,
        }
    }

    /// Short description for step events and logs
    pub fn describe(&self) -> String {
        match self {
            ActionStep::Click(target) => format!("click {}", target_label(target)),
            ActionStep::TypeText(text) => format!("type {:?}", text),
            ActionStep::Press(chord) => format!("press {}", chord),
            ActionStep::Select { target, value } => {
                format!("select {:?} in {}", value, target_label(target))
            }
            ActionStep::Settle { label, delay } => format!("settle '{}' {:?}", label, delay),
            ActionStep::AwaitStable { label, timeout, .. } => {
                format!("await '{}' up to {:?}", label, timeout)
            }
        }
    }
}

fn target_label(target: &Target) -> String {
    match target {
        Target::Editor => "editor".to_string(),
        Target::Control => "resolved control".to_string(),
        Target::First(query) => query.to_css(),
    }
}

/// Select everything in the editor and delete it
pub fn clear_document(timing: &TimingConfig) -> Vec<ActionStep> {
    vec![
        ActionStep::press(KeyChord::select_all()),
        ActionStep::settle("select-all", timing.select_all_settle()),
        ActionStep::press(KeyChord::backspace()),
        ActionStep::settle("clear", timing.clear_settle()),
    ]
}

/// Type each line, pressing Enter between them
pub fn type_lines(lines: &[&str]) -> Vec<ActionStep> {
    let mut steps = Vec::with_capacity(lines.len() * 2);
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            steps.push(ActionStep::press(KeyChord::enter()));
        }
        steps.push(ActionStep::type_text(line));
    }
    steps
}

/// Performs action steps against a session
pub struct ActionExecutor<'a> {
    session: &'a dyn Session,
    editor: ElementQuery,
    poll_interval: Duration,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(session: &'a dyn Session, editor: ElementQuery, timing: &TimingConfig) -> Self {
        Self {
            session,
            editor,
            poll_interval: timing.poll_interval(),
        }
    }

    /// Run one step; `control` is what [`Target::Control`] refers to
    pub async fn execute(&self, step: &ActionStep, control: Option<&ResolvedControl>) -> Result<()> {
        debug!("Executing: {}", step.describe());

        match step {
            ActionStep::Click(target) => {
                let handle = self.target_handle(target, control).await?;
                self.session.click(&handle).await
            }
            ActionStep::TypeText(text) => self.session.type_text(text).await,
            ActionStep::Press(chord) => self.session.press(chord).await,
            ActionStep::Select { target, value } => {
                let handle = self.target_handle(target, control).await?;
                self.session.select_option(&handle, value).await
            }
            ActionStep::Settle { label, delay } => {
                if !delay.is_zero() {
                    debug!("Settling '{}' for {:?}", label, delay);
                    sleep(*delay).await;
                }
                Ok(())
            }
            ActionStep::AwaitStable {
                label,
                probe,
                timeout,
            } => {
                self.await_probe(label, probe, *timeout).await;
                Ok(())
            }
        }
    }

    /// Run steps in order, stopping at the first error
    pub async fn run_sequence(
        &self,
        steps: &[ActionStep],
        control: Option<&ResolvedControl>,
    ) -> Result<()> {
        for step in steps {
            self.execute(step, control).await?;
        }
        Ok(())
    }

    /// Re-read the target and check it can still be acted on
    async fn target_handle(
        &self,
        target: &Target,
        control: Option<&ResolvedControl>,
    ) -> Result<ElementHandle> {
        let handle = match target {
            Target::Control => control
                .map(|c| c.handle.clone())
                .ok_or_else(|| CheckError::Action("No control resolved for this step".to_string()))?,
            Target::Editor => self.first(&self.editor).await?,
            Target::First(query) => self.first(query).await?,
        };

        let info = self.session.describe(&handle).await?;
        if !info.visible {
            return Err(CheckError::Action(format!("{} is hidden", info.summary())));
        }
        if !info.enabled {
            return Err(CheckError::Action(format!("{} is disabled", info.summary())));
        }
        Ok(handle)
    }

    async fn first(&self, query: &ElementQuery) -> Result<ElementHandle> {
        self.session
            .query_all(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CheckError::Action(format!("Nothing matches {}", query)))
    }

    async fn await_probe(&self, label: &str, probe: &StableProbe, timeout: Duration) -> bool {
        match probe {
            StableProbe::SelectorVisible(query) => {
                let session = self.session;
                await_stable(label, timeout, self.poll_interval, move || async move {
                    let Ok(handles) = session.query_all(query).await else {
                        return false;
                    };
                    for handle in handles {
                        if session.describe(&handle).await.is_ok_and(|info| info.visible) {
                            return true;
                        }
                    }
                    false
                })
                .await
            }
            StableProbe::EditorMarkupSettled => self.await_markup_settled(label, timeout).await,
        }
    }

    async fn await_markup_settled(&self, label: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut previous = self.session.markup(&self.editor).await.ok().flatten();
        loop {
            sleep(self.poll_interval).await;
            let current = self.session.markup(&self.editor).await.ok().flatten();
            if current == previous {
                debug!("'{}' markup settled", label);
                return true;
            }
            if Instant::now() >= deadline {
                info!("'{}' markup still changing after {:?}, continuing", label, timeout);
                return false;
            }
            previous = current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BlockKind, MemoryPage, MemorySession, PageElement};
    use crate::query::ElementInfo;

    fn editor() -> ElementQuery {
        ElementQuery::class("ProseMirror")
    }

    fn control_for(handle: ElementHandle) -> ResolvedControl {
        ResolvedControl {
            handle,
            strategy: "test".to_string(),
            via_fallback: false,
            info: ElementInfo::default(),
        }
    }

    #[test]
    fn test_clear_document_sequence() {
        let steps = clear_document(&TimingConfig::default());
        assert_eq!(
            steps,
            vec![
                ActionStep::press(KeyChord::select_all()),
                ActionStep::settle("select-all", Duration::from_millis(100)),
                ActionStep::press(KeyChord::backspace()),
                ActionStep::settle("clear", Duration::from_millis(200)),
            ]
        );
    }

    #[test]
    fn test_type_lines() {
        let steps = type_lines(&["A- ", "B"]);
        assert_eq!(
            steps,
            vec![
                ActionStep::type_text("A- "),
                ActionStep::press(KeyChord::enter()),
                ActionStep::type_text("B"),
            ]
        );
    }

    #[tokio::test]
    async fn test_typing_fires_input_rules() {
        let session = MemorySession::new(MemoryPage::with_editor("ProseMirror"));
        let timing = TimingConfig::immediate();
        let executor = ActionExecutor::new(&session, editor(), &timing);

        let mut steps = vec![ActionStep::click(Target::Editor)];
        steps.extend(type_lines(&["- one", "two"]));
        executor.run_sequence(&steps, None).await.unwrap();

        assert_eq!(
            session.blocks(),
            vec![
                (BlockKind::BulletItem, "one".to_string()),
                (BlockKind::BulletItem, "two".to_string()),
            ]
        );

        executor.run_sequence(&clear_document(&timing), None).await.unwrap();
        assert_eq!(session.blocks(), vec![(BlockKind::Paragraph, String::new())]);
    }

    #[tokio::test]
    async fn test_click_without_control_is_action_error() {
        let session = MemorySession::new(MemoryPage::with_editor("ProseMirror"));
        let executor = ActionExecutor::new(&session, editor(), &TimingConfig::immediate());

        let err = executor
            .execute(&ActionStep::click(Target::Control), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Action(_)));
    }

    #[tokio::test]
    async fn test_click_on_removed_control_fails() {
        let mut page = MemoryPage::with_editor("ProseMirror");
        let id = page.add(PageElement::button("Ordered"));
        let session = MemorySession::new(page);
        let executor = ActionExecutor::new(&session, editor(), &TimingConfig::immediate());

        let handle = session.query_all(&ElementQuery::tag("button")).await.unwrap()[0].clone();
        let control = control_for(handle);
        session.remove(id);

        let err = executor
            .execute(&ActionStep::click(Target::Control), Some(&control))
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(session.click_count(id), 0);
    }

    #[tokio::test]
    async fn test_click_on_disabled_control_fails() {
        let mut page = MemoryPage::with_editor("ProseMirror");
        let id = page.add(PageElement::button("Ordered"));
        let session = MemorySession::new(page);
        let executor = ActionExecutor::new(&session, editor(), &TimingConfig::immediate());

        let handle = session.query_all(&ElementQuery::tag("button")).await.unwrap()[0].clone();
        session.set_enabled(id, false);

        let err = executor
            .execute(&ActionStep::click(Target::Control), Some(&control_for(handle)))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Action(_)));
    }

    #[tokio::test]
    async fn test_select_option() {
        let mut page = MemoryPage::with_editor("ProseMirror");
        page.add(PageElement::new("select").attr("name", "block-type"));
        let session = MemorySession::new(page);
        let executor = ActionExecutor::new(&session, editor(), &TimingConfig::immediate());

        let step = ActionStep::Select {
            target: Target::First(ElementQuery::tag("select")),
            value: "ordered".to_string(),
        };
        executor.execute(&step, None).await.unwrap();

        let handle = session.query_all(&ElementQuery::tag("select")).await.unwrap()[0].clone();
        let info = session.describe(&handle).await.unwrap();
        assert_eq!(info.attribute("value"), Some("ordered"));
    }

    #[tokio::test]
    async fn test_await_stable_probes() {
        let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
        let executor = ActionExecutor::new(&session, editor(), &TimingConfig::immediate());

        let settled = ActionStep::await_stable(
            "typing",
            StableProbe::EditorMarkupSettled,
            Duration::from_millis(50),
        );
        executor.execute(&settled, None).await.unwrap();

        // Hidden floating menu: times out without failing the step
        let hidden = ActionStep::await_stable(
            "floating-menu",
            StableProbe::SelectorVisible(ElementQuery::class("floating-menu")),
            Duration::from_millis(20),
        );
        executor.execute(&hidden, None).await.unwrap();
        assert!(
            !executor
                .await_probe(
                    "floating-menu",
                    &StableProbe::SelectorVisible(ElementQuery::class("floating-menu")),
                    Duration::from_millis(20)
                )
                .await
        );
        assert!(
            executor
                .await_probe(
                    "toolbar",
                    &StableProbe::SelectorVisible(ElementQuery::class("toolbar")),
                    Duration::from_millis(20)
                )
                .await
        );
    }

    #[test]
    fn test_step_descriptions() {
        assert_eq!(ActionStep::press(KeyChord::select_all()).describe(), "press Control+A");
        assert_eq!(
            ActionStep::click(Target::First(ElementQuery::tag("li"))).describe(),
            "click li"
        );
        assert_eq!(ActionStep::type_text("B").describe(), "type \"B\"");
    }
}
