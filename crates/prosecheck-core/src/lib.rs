//! # prosecheck-core
//!
//! Core types for the prosecheck rich-text editor verification harness.
//!
//! ## Core Paradigm
//!
//! - Controls are found by ranked locator strategies, never by a single selector
//! - Document state is verified by structural reads, never by trusting the actor
//! - Every case ends in exactly one verdict; only unexpected faults end a run
//! - Evidence capture is fail-open

pub mod config;
mod error;
pub mod evidence;
pub mod fail_open;
mod types;

pub use config::HarnessConfig;
pub use error::{CheckError, FaultClass, Result};
pub use evidence::{ArtifactKind, ArtifactRef, ArtifactStore, EvidenceSink, MemorySink};
pub use types::*;
