//! Selector resolution over ranked locator strategies
//!
//! Resolution never fails because a control is absent: that is
//! [`Resolution::NotFound`], a normal outcome the runner turns into a skipped
//! case. Only faults the runner cannot absorb (a dropped browser connection,
//! for example) are returned as errors.

use crate::error::Result;
use crate::locator::{ranked, FallbackScan, LocatorStrategy};
use crate::query::{ElementHandle, ElementInfo, ElementQuery};
use crate::session::Session;
use crate::wait::poll_for;
use prosecheck_core::config::TimingConfig;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// A handle to exactly one element, tagged with what resolved it
///
/// Only valid within the step that resolved it. Deliberately not `Clone`.
#[derive(Debug)]
pub struct ResolvedControl {
    pub handle: ElementHandle,
    /// Label of the strategy (or fallback scan) that matched
    pub strategy: String,
    pub via_fallback: bool,
    /// Snapshot taken when the control was resolved
    pub info: ElementInfo,
}

/// Outcome of a resolution attempt
#[derive(Debug)]
pub enum Resolution {
    Resolved(ResolvedControl),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn into_control(self) -> Option<ResolvedControl> {
        match self {
            Resolution::Resolved(control) => Some(control),
            Resolution::NotFound => None,
        }
    }
}

/// Finds controls on a page through ranked strategies
pub struct SelectorResolver<'a> {
    session: &'a dyn Session,
    per_strategy_timeout: Duration,
    poll_interval: Duration,
}

impl<'a> SelectorResolver<'a> {
    pub fn new(session: &'a dyn Session, timing: &TimingConfig) -> Self {
        Self {
            session,
            per_strategy_timeout: timing.per_strategy_timeout(),
            poll_interval: timing.poll_interval(),
        }
    }

    /// Resolve a control anywhere on the page
    pub async fn resolve(
        &self,
        strategies: &[LocatorStrategy],
        fallback: Option<&FallbackScan>,
        timeout: Duration,
    ) -> Result<Resolution> {
        let deadline = Instant::now() + timeout;
        self.resolve_in(None, strategies, fallback, deadline).await
    }

    /// Resolve a visible container first, then the control among its descendants
    pub async fn resolve_within(
        &self,
        containers: &[LocatorStrategy],
        strategies: &[LocatorStrategy],
        fallback: Option<&FallbackScan>,
        timeout: Duration,
    ) -> Result<Resolution> {
        let deadline = Instant::now() + timeout;

        let container = match self.resolve_in(None, containers, None, deadline).await? {
            Resolution::Resolved(container) => container,
            Resolution::NotFound => {
                info!("No visible container found");
                return Ok(Resolution::NotFound);
            }
        };
        info!(
            "Container {} matched via {}",
            container.info.summary(),
            container.strategy
        );

        self.resolve_in(Some(&container.handle), strategies, fallback, deadline)
            .await
    }

    async fn resolve_in(
        &self,
        scope: Option<&ElementHandle>,
        strategies: &[LocatorStrategy],
        fallback: Option<&FallbackScan>,
        deadline: Instant,
    ) -> Result<Resolution> {
        for strategy in ranked(strategies) {
            let now = Instant::now();
            if now >= deadline {
                debug!("Resolution deadline reached before {}", strategy.label());
                break;
            }
            let budget = self.per_strategy_timeout.min(deadline - now);

            let this = self;
            let found = poll_for(budget, self.poll_interval, move || {
                this.first_match(scope, &strategy.candidates, move |info: &ElementInfo| {
                    info.is_interactable() && strategy.matches(info)
                })
            })
            .await?;

            if let Some((handle, info)) = found {
                info!("Resolved {} via {}", info.summary(), strategy.label());
                return Ok(Resolution::Resolved(ResolvedControl {
                    handle,
                    strategy: strategy.label(),
                    via_fallback: false,
                    info,
                }));
            }
            debug!("No match for {}", strategy.label());
        }

        if let Some(scan) = fallback.filter(|scan| !scan.is_empty()) {
            debug!(
                "Scanning every <{}> for {:?}",
                scan.tag, scan.keywords
            );
            let found = self
                .first_match(scope, &scan.query(), |info| info.visible && scan.matches(info))
                .await?;
            if let Some((handle, info)) = found {
                info!("Resolved {} via fallback scan", info.summary());
                return Ok(Resolution::Resolved(ResolvedControl {
                    handle,
                    strategy: format!("fallback scan <{}>", scan.tag),
                    via_fallback: true,
                    info,
                }));
            }
        }

        Ok(Resolution::NotFound)
    }

    /// First candidate whose snapshot satisfies `accept`
    ///
    /// Candidates whose snapshot cannot be read are skipped, as is a
    /// container scope that went stale.
    async fn first_match<P>(
        &self,
        scope: Option<&ElementHandle>,
        query: &ElementQuery,
        accept: P,
    ) -> Result<Option<(ElementHandle, ElementInfo)>>
    where
        P: Fn(&ElementInfo) -> bool,
    {
        let candidates = match scope {
            None => self.session.query_all(query).await?,
            Some(scope) => match self.session.query_within(scope, query).await {
                Ok(handles) => handles,
                Err(e) if e.is_recoverable() => {
                    debug!("Container unavailable: {}", e);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            },
        };

        for handle in candidates {
            match self.session.describe(&handle).await {
                Ok(info) if accept(&info) => return Ok(Some((handle, info))),
                Ok(_) => {}
                Err(e) if e.is_recoverable() => debug!("Skipping {}: {}", handle, e),
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryPage, MemorySession, PageElement, Visibility};
    use crate::query::AttrFilter;

    fn timing() -> TimingConfig {
        TimingConfig::immediate()
    }

    fn ordered_strategies() -> Vec<LocatorStrategy> {
        vec![
            LocatorStrategy::attribute_contains(0, "button", "title", "ordered"),
            LocatorStrategy::attribute_contains(1, "button", "aria-label", "ordered"),
            LocatorStrategy::text_contains(2, "button", "Ordered"),
        ]
    }

    #[tokio::test]
    async fn test_priority_wins_over_document_order() {
        let mut page = MemoryPage::new();
        let by_label = page.add(PageElement::button("").aria_label("Ordered list"));
        let by_title = page.add(PageElement::button("").title("Ordered list"));
        let session = MemorySession::new(page);
        let resolver = SelectorResolver::new(&session, &timing());

        let control = resolver
            .resolve(&ordered_strategies(), None, Duration::from_secs(1))
            .await
            .unwrap()
            .into_control()
            .unwrap();

        assert_eq!(control.strategy, "button[title*=\"ordered\" i]");
        assert!(!control.via_fallback);
        session.click(&control.handle).await.unwrap();
        assert_eq!(session.click_count(by_title), 1);
        assert_eq!(session.click_count(by_label), 0);
    }

    #[tokio::test]
    async fn test_hidden_and_disabled_candidates_skipped() {
        let mut page = MemoryPage::new();
        page.add(
            PageElement::button("")
                .title("Ordered list")
                .visibility(Visibility::Hidden),
        );
        page.add(PageElement::button("").title("Ordered list").disabled());
        page.add(PageElement::button("Ordered"));
        let session = MemorySession::new(page);
        let resolver = SelectorResolver::new(&session, &timing());

        let control = resolver
            .resolve(&ordered_strategies(), None, Duration::from_secs(1))
            .await
            .unwrap()
            .into_control()
            .unwrap();
        assert_eq!(control.strategy, "button:has-text(\"Ordered\")");
    }

    #[tokio::test]
    async fn test_not_found_is_not_an_error() {
        let mut page = MemoryPage::new();
        page.add(PageElement::button("Bold"));
        let session = MemorySession::new(page);
        let resolver = SelectorResolver::new(&session, &timing());

        let resolution = resolver
            .resolve(&ordered_strategies(), None, Duration::from_millis(100))
            .await
            .unwrap();
        assert!(!resolution.is_found());

        let empty = FallbackScan::new("button", &[]);
        let resolution = resolver
            .resolve(&[], Some(&empty), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(!resolution.is_found());
    }

    #[tokio::test]
    async fn test_fallback_scan() {
        let mut page = MemoryPage::new();
        page.add(PageElement::button("").attr("data-tip", "Numbered list"));
        let target = page.add(PageElement::button("").aria_label("Insert numbered list"));
        let session = MemorySession::new(page);
        let resolver = SelectorResolver::new(&session, &timing());

        let fallback = FallbackScan::new("button", &["numbered"]);
        let control = resolver
            .resolve(&ordered_strategies(), Some(&fallback), Duration::from_secs(1))
            .await
            .unwrap()
            .into_control()
            .unwrap();

        assert!(control.via_fallback);
        session.click(&control.handle).await.unwrap();
        assert_eq!(session.click_count(target), 1);
    }

    #[tokio::test]
    async fn test_unreadable_candidate_skipped() {
        let mut page = MemoryPage::new();
        page.add(PageElement::button("").title("Ordered list").unreadable());
        let good = page.add(PageElement::button("").title("Ordered (numbered)"));
        let session = MemorySession::new(page);
        let resolver = SelectorResolver::new(&session, &timing());

        let control = resolver
            .resolve(&ordered_strategies(), None, Duration::from_secs(1))
            .await
            .unwrap()
            .into_control()
            .unwrap();
        session.click(&control.handle).await.unwrap();
        assert_eq!(session.click_count(good), 1);
    }

    #[tokio::test]
    async fn test_transport_fault_propagates() {
        let session = MemorySession::new(MemoryPage::new());
        session.disconnect();
        let resolver = SelectorResolver::new(&session, &timing());

        let err = resolver
            .resolve(&ordered_strategies(), None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_resolve_within_container() {
        let session = MemorySession::new(MemoryPage::rich_text_editor("ProseMirror"));
        let resolver = SelectorResolver::new(&session, &timing());
        let containers = vec![
            LocatorStrategy::any(
                0,
                ElementQuery::any()
                    .with_attr(AttrFilter::Equals("role".into(), "menu".into()))
                    .with_attr(AttrFilter::Present("data-floating".into())),
            ),
            LocatorStrategy::any(1, ElementQuery::class("floating-menu")),
        ];
        let controls = vec![LocatorStrategy::text_contains_any(
            0,
            "button",
            &["ordered", "numbered"],
        )];

        // No selection: the floating menu is hidden
        let resolution = resolver
            .resolve_within(&containers, &controls, None, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(!resolution.is_found());

        let root = session.query_all(&ElementQuery::class("ProseMirror")).await.unwrap();
        session.click(&root[0]).await.unwrap();
        session.type_text("- Item 1").await.unwrap();
        let items = session.query_all(&ElementQuery::tag("li")).await.unwrap();
        session.click(&items[0]).await.unwrap();
        session
            .press(&crate::session::KeyChord::select_to_end())
            .await
            .unwrap();

        let control = resolver
            .resolve_within(&containers, &controls, None, Duration::from_secs(1))
            .await
            .unwrap()
            .into_control()
            .unwrap();
        assert_eq!(control.handle.steps().len(), 2);
        assert_eq!(control.info.text, "Numbered");

        session.click(&control.handle).await.unwrap();
        assert!(session
            .blocks()
            .iter()
            .all(|(kind, _)| *kind == crate::memory::BlockKind::OrderedItem));
    }
}
