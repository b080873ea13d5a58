//! Hooks run after a host tool finishes
//!
//! A hook receives the finished [`ToolExecution`] and may rewrite its output
//! content. Hooks are fail-open: a failing hook is logged and its changes are
//! discarded, the rest of the pipeline still runs.

pub mod pipeline;
pub mod tool;
pub mod truncation;

pub use pipeline::{HookPipeline, HookResult, ToolExecuteAfterHook};
pub use tool::ToolExecution;
pub use truncation::{ReadTruncationHook, TRUNCATION_BANNER};

/// Pipeline with every built-in hook registered
pub fn default_pipeline() -> HookPipeline {
    let mut pipeline = HookPipeline::new();
    pipeline.add_hook(Box::new(ReadTruncationHook));
    pipeline
}
