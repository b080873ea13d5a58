//! Test case definitions and the built-in list conversion suite

use prosecheck_browser::actions::{type_lines, ActionStep, StableProbe, Target};
use prosecheck_browser::locator::{FallbackScan, LocatorStrategy};
use prosecheck_browser::query::{AttrFilter, ElementQuery};
use prosecheck_browser::session::KeyChord;
use prosecheck_browser::verification::VerificationQuery;
use prosecheck_core::{Expectation, HarnessConfig};
use serde::{Deserialize, Serialize};

/// How a case finds the control it acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub strategies: Vec<LocatorStrategy>,
    pub fallback: Option<FallbackScan>,
    /// Container to resolve first; empty searches the whole page
    #[serde(default)]
    pub container: Vec<LocatorStrategy>,
}

impl ControlSpec {
    pub fn new(strategies: Vec<LocatorStrategy>) -> Self {
        Self {
            strategies,
            fallback: None,
            container: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackScan) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn within(mut self, container: Vec<LocatorStrategy>) -> Self {
        self.container = container;
        self
    }

    pub fn is_scoped(&self) -> bool {
        !self.container.is_empty()
    }
}

/// One named scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub description: String,
    /// Steps after the document is cleared, before the control is resolved
    pub setup: Vec<ActionStep>,
    pub control: ControlSpec,
    /// Steps run once the control is resolved
    pub action: Vec<ActionStep>,
    pub verification: VerificationQuery,
    pub expected: Expectation,
}

/// Toolbar button that toggles an ordered list
pub fn ordered_list_control() -> ControlSpec {
    ControlSpec::new(vec![
        LocatorStrategy::attribute_contains(0, "button", "title", "ordered"),
        LocatorStrategy::attribute_contains(1, "button", "title", "numbered"),
        LocatorStrategy::attribute_contains(2, "button", "aria-label", "ordered"),
        LocatorStrategy::attribute_contains(3, "button", "aria-label", "numbered"),
        LocatorStrategy::text_contains(4, "button", "Ordered"),
        LocatorStrategy::text_contains(5, "button", "Numbered"),
    ])
    .with_fallback(FallbackScan::new("button", &["ordered", "numbered"]))
}

/// Toolbar button that toggles a bullet list
pub fn bullet_list_control() -> ControlSpec {
    ControlSpec::new(vec![
        LocatorStrategy::attribute_contains(0, "button", "title", "bullet"),
        LocatorStrategy::attribute_contains(1, "button", "aria-label", "bullet"),
        LocatorStrategy::text_contains(2, "button", "Bullet"),
    ])
    .with_fallback(FallbackScan::new("button", &["bullet"]))
}

/// Menus that appear next to a text selection
pub fn floating_menu_containers() -> Vec<LocatorStrategy> {
    let attr = |filter: AttrFilter| ElementQuery::any().with_attr(filter);
    vec![
        LocatorStrategy::any(
            0,
            attr(AttrFilter::Equals("role".into(), "menu".into()))
                .with_attr(AttrFilter::Present("data-floating".into())),
        ),
        LocatorStrategy::any(1, ElementQuery::class("floating-menu")),
        LocatorStrategy::any(2, ElementQuery::class("selection-toolbar")),
        LocatorStrategy::any(3, attr(AttrFilter::Contains("data-testid".into(), "floating".into()))),
        LocatorStrategy::any(4, attr(AttrFilter::Contains("data-testid".into(), "selection".into()))),
        LocatorStrategy::any(5, attr(AttrFilter::Equals("role".into(), "toolbar".into()))),
    ]
}

/// Ordered list button inside the floating selection menu
pub fn floating_ordered_control() -> ControlSpec {
    ControlSpec::new(vec![LocatorStrategy::text_contains_any(
        0,
        "button",
        &["ordered", "numbered"],
    )])
    .within(floating_menu_containers())
}

/// Typed lines followed by the typing settle
fn typed(lines: &[&str], config: &HarnessConfig) -> Vec<ActionStep> {
    let mut steps = type_lines(lines);
    steps.push(ActionStep::settle("typing", config.timing.typing_settle()));
    steps
}

/// Click the resolved control and let the conversion land
fn click_control(config: &HarnessConfig) -> Vec<ActionStep> {
    vec![
        ActionStep::click(Target::Control),
        ActionStep::settle("conversion", config.timing.conversion_settle()),
    ]
}

fn editor(config: &HarnessConfig) -> ElementQuery {
    ElementQuery::class(&config.editor.root_class)
}

/// Bullet-marked lines converted with the ordered list button
pub fn bullet_to_ordered(config: &HarnessConfig) -> TestCase {
    TestCase {
        name: "bullet-to-ordered".to_string(),
        description: "Bullet list converted to an ordered list from the toolbar".to_string(),
        setup: typed(&["First item- ", "Second item- ", "Third item"], config),
        control: ordered_list_control(),
        action: click_control(config),
        verification: VerificationQuery::lists_under(editor(config)),
        expected: Expectation::exact(true, false),
    }
}

/// Ordered-marked lines converted with the bullet list button
pub fn ordered_to_bullet(config: &HarnessConfig) -> TestCase {
    TestCase {
        name: "ordered-to-bullet".to_string(),
        description: "Ordered list converted to a bullet list from the toolbar".to_string(),
        setup: typed(&["First item1. ", "Second item1. ", "Third item"], config),
        control: bullet_list_control(),
        action: click_control(config),
        verification: VerificationQuery::lists_under(editor(config)),
        expected: Expectation::exact(false, true),
    }
}

/// Bullet list converted through the floating menu of a text selection
pub fn selection_toolbar_ordered(config: &HarnessConfig) -> TestCase {
    let mut setup = typed(&["- Item 1", "Item 2", "Item 3"], config);
    setup.extend([
        ActionStep::click(Target::First(
            ElementQuery::tag("li").within(editor(config)),
        )),
        ActionStep::press(KeyChord::select_to_end()),
        ActionStep::settle("selection", config.timing.selection_settle()),
        ActionStep::await_stable(
            "floating-menu",
            StableProbe::SelectorVisible(ElementQuery::class("floating-menu")),
            config.timing.selection_settle(),
        ),
    ]);

    TestCase {
        name: "selection-toolbar-ordered".to_string(),
        description: "List type converted from the selection toolbar".to_string(),
        setup,
        control: floating_ordered_control(),
        action: click_control(config),
        verification: VerificationQuery::lists_under(editor(config)),
        expected: Expectation::ordered_present(),
    }
}

/// The three list conversion cases, in run order
pub fn standard_suite(config: &HarnessConfig) -> Vec<TestCase> {
    vec![
        bullet_to_ordered(config),
        ordered_to_bullet(config),
        selection_toolbar_ordered(config),
    ]
}

/// Keep only the named cases, in suite order
pub fn select_cases(cases: Vec<TestCase>, names: &[String]) -> Vec<TestCase> {
    if names.is_empty() {
        return cases;
    }
    cases
        .into_iter()
        .filter(|case| names.iter().any(|n| n == &case.name))
        .collect()
}
