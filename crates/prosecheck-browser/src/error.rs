//! Browser error types - re-exports the unified CheckError from prosecheck-core
//!
//! Browser operations use the CheckError variants that classify at the case
//! boundary:
//! - Browser(String) - transport failures (launch, CDP, dropped connection)
//! - Navigation(String) - page loads that fail or time out
//! - StaleElement(String) - a handle whose element is gone or unreadable
//! - Action(String) - an element that exists but cannot be acted on
//! - Verification(String) - a structural read that could not complete
//! - Capture(String) - screenshots and evidence storage

pub use prosecheck_core::{CheckError, Result};

pub type BrowserError = CheckError;
