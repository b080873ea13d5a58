//! Warning banner for truncated file reads

use crate::pipeline::{HookResult, ToolExecuteAfterHook};
use crate::tool::ToolExecution;
use async_trait::async_trait;

/// Banner placed ahead of truncated read output
pub const TRUNCATION_BANNER: &str = "\
⚠️  FILE CONTENT TRUNCATED ⚠️\n\
\n\
The file content exceeds OpenCode's limits and has been truncated.\n\
- Individual lines are limited to 2000 characters\n\
- Total output is limited to 2000 lines or 50KB\n\
\n\
If you need to see more content, use the 'offset' parameter with the read tool.\n\
\n\
--- Truncated Content Below ---\n\
\n";

/// Tool whose output the banner applies to
const READ_TOOL: &str = "read";

/// Prepends [`TRUNCATION_BANNER`] to truncated `read` output
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadTruncationHook;

impl ReadTruncationHook {
    /// Rewrite the execution in place; returns whether anything changed
    pub fn apply(execution: &mut ToolExecution) -> bool {
        if execution.tool() != READ_TOOL || !execution.is_truncated() {
            return false;
        }
        let Some(content) = execution.content() else {
            return false;
        };
        let content = format!("{}{}", TRUNCATION_BANNER, content);
        execution.set_content(content)
    }
}

#[async_trait]
impl ToolExecuteAfterHook for ReadTruncationHook {
    fn name(&self) -> &str {
        "read-truncation"
    }

    async fn execute(&self, execution: &mut ToolExecution) -> HookResult {
        if Self::apply(execution) {
            HookResult::changed("prepended truncation warning")
        } else {
            HookResult::unchanged("output not truncated")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_pipeline;

    #[test]
    fn test_banner_lines() {
        let lines: Vec<&str> = TRUNCATION_BANNER.split('\n').collect();
        assert_eq!(lines[0], "⚠️  FILE CONTENT TRUNCATED ⚠️");
        assert_eq!(lines[3], "- Individual lines are limited to 2000 characters");
        assert_eq!(lines[4], "- Total output is limited to 2000 lines or 50KB");
        assert_eq!(lines[8], "--- Truncated Content Below ---");
        assert!(TRUNCATION_BANNER.ends_with("--- Truncated Content Below ---\n\n"));
    }

    #[test]
    fn test_truncated_read_gets_banner() {
        let mut execution = ToolExecution::new("read", "X").truncated(true);
        assert!(ReadTruncationHook::apply(&mut execution));
        assert_eq!(execution.content(), Some(format!("{}X", TRUNCATION_BANNER).as_str()));
    }

    #[test]
    fn test_untruncated_read_is_identical() {
        let original = ToolExecution::new("read", "X").truncated(false);
        let mut execution = original.clone();
        assert!(!ReadTruncationHook::apply(&mut execution));
        assert_eq!(execution, original);
    }

    #[test]
    fn test_other_tool_is_identical() {
        let original = ToolExecution::new("bash", "X").truncated(true);
        let mut execution = original.clone();
        assert!(!ReadTruncationHook::apply(&mut execution));
        assert_eq!(execution, original);
    }

    #[tokio::test]
    async fn test_pipeline_over_json() {
        let pipeline = default_pipeline();
        let payload = r#"{"tool":"read","output":{"content":"X","metadata":{"truncated":true}}}"#;

        let rewritten = pipeline.process_json(payload).await.unwrap();
        let execution = ToolExecution::from_json(&rewritten).unwrap();
        assert_eq!(execution.content(), Some(format!("{}X", TRUNCATION_BANNER).as_str()));
    }

    #[tokio::test]
    async fn test_banner_goes_under_host_output_key() {
        let pipeline = default_pipeline();
        let payload = r#"{"tool":"read","output":{"output":"X","metadata":{"truncated":true}}}"#;

        let rewritten: serde_json::Value =
            serde_json::from_str(&pipeline.process_json(payload).await.unwrap()).unwrap();
        assert_eq!(rewritten["output"]["output"], format!("{}X", TRUNCATION_BANNER));
        assert!(rewritten["output"].get("content").is_none());
    }

    #[tokio::test]
    async fn test_untouched_payloads_are_byte_identical() {
        let pipeline = default_pipeline();
        let payloads = [
            r#"{"tool":"bash","output":{"content":"X"}}"#,
            r#"{"output":{"content":"X"},"tool":"bash"}"#,
            r#"{"tool":"bash","output":{"output":"X"}}"#,
            r#"{"tool":"read","output":{"content":"X"}}"#,
            r#"{"tool":"read","output":{"content":"X","metadata":{"truncated":false}}}"#,
            r#"{"tool":"bash","output":{"content":"X","metadata":{"truncated":true}}}"#,
        ];
        for payload in payloads {
            assert_eq!(pipeline.process_json(payload).await.unwrap(), payload);
        }
    }
}
