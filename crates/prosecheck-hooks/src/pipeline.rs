//! Fail-open pipeline of tool-execute-after hooks

use crate::tool::ToolExecution;
use async_trait::async_trait;
use prosecheck_core::Result;
use tracing::{debug, info, warn};

/// Result from hook execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResult {
    /// Whether the hook succeeded
    pub success: bool,
    /// Whether the hook rewrote the execution
    pub changed: bool,
    /// Message describing what happened
    pub message: String,
}

impl HookResult {
    /// The hook rewrote the execution
    pub fn changed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            changed: true,
            message: message.into(),
        }
    }

    /// The hook looked and left the execution alone
    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            success: true,
            changed: false,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            changed: false,
            message: message.into(),
        }
    }
}

/// Hook invoked after a host tool completes
#[async_trait]
pub trait ToolExecuteAfterHook: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Inspect and possibly rewrite the execution
    ///
    /// Implementations report their own errors as a failure result.
    async fn execute(&self, execution: &mut ToolExecution) -> HookResult;
}

/// Pipeline for executing multiple hooks in sequence
pub struct HookPipeline {
    hooks: Vec<Box<dyn ToolExecuteAfterHook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add_hook(&mut self, hook: Box<dyn ToolExecuteAfterHook>) {
        self.hooks.push(hook);
    }

    /// Execute all hooks in order (fail-open)
    ///
    /// Each hook works on a copy; the copy replaces the execution only when
    /// the hook succeeds, so a failing hook leaves no partial rewrite behind.
    pub async fn execute_all(&self, execution: &mut ToolExecution) -> Vec<HookResult> {
        let mut results = Vec::with_capacity(self.hooks.len());

        for hook in &self.hooks {
            let mut candidate = execution.clone();
            let result = hook.execute(&mut candidate).await;

            if !result.success {
                warn!("Hook {} failed (continuing): {}", hook.name(), result.message);
            } else if result.changed {
                info!("Hook {} rewrote {} output: {}", hook.name(), execution.tool(), result.message);
                *execution = candidate;
            } else {
                debug!("Hook {}: {}", hook.name(), result.message);
            }

            results.push(result);
        }

        results
    }

    /// Run the pipeline over a JSON payload and return the resulting JSON
    ///
    /// A payload no hook rewrote is returned exactly as given.
    pub async fn process_json(&self, payload: &str) -> Result<String> {
        let mut execution = ToolExecution::from_json(payload)?;
        let results = self.execute_all(&mut execution).await;
        if results.iter().any(|r| r.success && r.changed) {
            execution.to_json()
        } else {
            Ok(payload.to_string())
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Default for HookPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Appends a marker, or scribbles over the content and then fails
    struct MarkerHook {
        marker: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolExecuteAfterHook for MarkerHook {
        fn name(&self) -> &str {
            self.marker
        }

        async fn execute(&self, execution: &mut ToolExecution) -> HookResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let content = format!("{}{}", execution.content().unwrap_or_default(), self.marker);
            execution.set_content(content);
            if self.fail {
                HookResult::failure(format!("{} broke", self.marker))
            } else {
                HookResult::changed(format!("{} appended", self.marker))
            }
        }
    }

    fn marker(marker: &'static str, fail: bool, calls: &Arc<AtomicUsize>) -> Box<MarkerHook> {
        Box::new(MarkerHook {
            marker,
            fail,
            calls: calls.clone(),
        })
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let pipeline = HookPipeline::new();
        assert!(pipeline.is_empty());

        let mut execution = ToolExecution::new("read", "x");
        let results = pipeline.execute_all(&mut execution).await;
        assert!(results.is_empty());
        assert_eq!(execution.content(), Some("x"));
    }

    #[tokio::test]
    async fn test_failing_hook_is_discarded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = HookPipeline::new();
        pipeline.add_hook(marker("[a]", false, &calls));
        pipeline.add_hook(marker("[b]", true, &calls));
        pipeline.add_hook(marker("[c]", false, &calls));
        assert_eq!(pipeline.len(), 3);

        let mut execution = ToolExecution::new("read", "x");
        let results = pipeline.execute_all(&mut execution).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
        assert_eq!(execution.content(), Some("x[a][c]"));
    }

    #[tokio::test]
    async fn test_process_json_rejects_malformed_payload() {
        let pipeline = HookPipeline::new();
        assert!(pipeline.process_json("{not json").await.is_err());
    }

    #[tokio::test]
    async fn test_unchanged_payload_is_returned_verbatim() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = HookPipeline::new();
        pipeline.add_hook(marker("[b]", true, &calls));

        let payload = r#"{ "output": {"output": "X"},  "tool": "bash" }"#;
        assert_eq!(pipeline.process_json(payload).await.unwrap(), payload);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rewrite_keeps_key_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = HookPipeline::new();
        pipeline.add_hook(marker("[a]", false, &calls));

        let payload = r#"{"output":{"output":"X","title":"t"},"tool":"bash","callID":"c9"}"#;
        assert_eq!(
            pipeline.process_json(payload).await.unwrap(),
            r#"{"output":{"output":"X[a]","title":"t"},"tool":"bash","callID":"c9"}"#
        );
    }

    #[test]
    fn test_hook_result_creation() {
        assert!(HookResult::changed("c").changed);
        assert!(!HookResult::unchanged("u").changed);
        let failure = HookResult::failure("f");
        assert!(!failure.success);
        assert_eq!(failure.message, "f");
    }
}
