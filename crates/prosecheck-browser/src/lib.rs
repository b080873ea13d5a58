//! Browser sessions and the resolve / act / verify primitives of prosecheck
//!
//! This crate drives a rich-text editor through a [`Session`]: either a real
//! Chrome tab over the Chrome DevTools Protocol or an in-process simulated
//! editor for tests and dry runs.
//!
//! # Features
//!
//! - **Sessions**: launch or attach to Chrome, or simulate an editor in memory
//! - **Control Resolution**: ranked locator strategies with a fallback scan
//! - **Actions**: clicks, literal typing, key chords, named settle waits
//! - **Verification**: structural list reads under the editor root
//! - **Evidence**: screenshots and markup snapshots into an evidence sink
//!
//! # Example
//!
//! ```no_run
//! use prosecheck_browser::{ChromeSession, LocatorStrategy, SelectorResolver, Session};
//! use prosecheck_core::HarnessConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarnessConfig::default();
//!     let session = ChromeSession::open(&config.browser).await?;
//!     session.navigate(&config.target_url).await?;
//!
//!     let resolver = SelectorResolver::new(&session, &config.timing);
//!     let strategies = vec![LocatorStrategy::attribute_contains(0, "button", "title", "ordered")];
//!     let resolution = resolver
//!         .resolve(&strategies, None, config.timing.resolve_timeout())
//!         .await?;
//!     println!("Ordered list control found: {}", resolution.is_found());
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`session`]: the session trait and key chords
//! - [`browser`]: Chrome session over CDP
//! - [`memory`]: simulated editor session
//! - [`query`]: structural element queries and handles
//! - [`locator`] and [`resolver`]: control resolution
//! - [`actions`]: action steps and their executor
//! - [`verification`]: list signature reads
//! - [`wait`]: polling helpers
//! - [`screenshot`]: evidence capture
//! - [`navigation`]: landing page to open editor

pub mod actions;
pub mod browser;
pub mod error;
pub mod locator;
pub mod memory;
pub mod navigation;
pub mod query;
pub mod resolver;
pub mod screenshot;
pub mod session;
pub mod verification;
pub mod wait;

// Re-export commonly used types
pub use actions::{clear_document, type_lines, ActionExecutor, ActionStep, StableProbe, Target};
pub use browser::ChromeSession;
pub use error::{BrowserError, Result};
pub use locator::{FallbackScan, LocatorStrategy, MatchRule};
pub use memory::{MemoryPage, MemorySession, PageElement};
pub use navigation::{NavigationOutcome, Navigator};
pub use query::{AttrFilter, ElementHandle, ElementInfo, ElementQuery};
pub use resolver::{Resolution, ResolvedControl, SelectorResolver};
pub use screenshot::{capture_markup, capture_screenshot, ScreenshotOptions};
pub use session::{KeyChord, Modifier, Session};
pub use verification::{StateVerifier, VerificationQuery};
pub use wait::{await_stable, poll_for};
