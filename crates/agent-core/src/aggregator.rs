//! Result Aggregation
//!
//! Renders tool results as text and folds them into the conversation in
//! request order.

use crate::error::Result;
use crate::message::{Conversation, Role};
use crate::tool::{ContentPart, ToolCallResult};

/// Aggregator settings
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    /// Longest rendering kept per result, in characters
    pub max_chars: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { max_chars: 4000 }
    }
}

/// Turns raw tool output into conversation text
#[derive(Clone, Debug, Default)]
pub struct ResultAggregator {
    config: AggregatorConfig,
}

impl ResultAggregator {
    pub const fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Format a tool result for the conversation
    pub fn render(&self, result: &ToolCallResult) -> String {
        let header = if result.is_success() {
            format!("[Tool '{}' returned]", result.name)
        } else {
            format!("[Tool '{}' failed]", result.name)
        };

        let body: Vec<String> = result
            .content
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => text.clone(),
                ContentPart::Structured(value) => {
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
                }
            })
            .collect();

        let body = if body.iter().all(|b| b.trim().is_empty()) {
            "(no output)".to_string()
        } else {
            truncate(&body.join("\n"), self.config.max_chars)
        };

        format!("{header}\n{body}")
    }

    /// Append results to the conversation, in the order given.
    ///
    /// Each result must answer a pending call of the last assistant message.
    pub fn fold(&self, conversation: &mut Conversation, results: &[ToolCallResult]) -> Result<()> {
        for result in results {
            conversation.record_result(&result.call_id, &result.name, self.render(result))?;
        }
        Ok(())
    }

    /// Best-effort answer when a turn hits the dispatch cap
    pub fn partial_answer(&self, conversation: &Conversation, rounds: usize) -> String {
        let findings: Vec<&str> = conversation
            .current_turn()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.content.as_str())
            .collect();

        let mut answer = format!("I couldn't complete this request within {rounds} tool rounds.");
        if !findings.is_empty() {
            answer.push_str(" Here is what I found so far:\n\n");
            answer.push_str(&findings.join("\n\n"));
        }
        answer
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{kept}... [truncated {} chars]", total - max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::message::ToolCallRef;
    use serde_json::json;

    fn call(id: &str) -> ToolCallRef {
        ToolCallRef {
            call_id: id.into(),
            name: "db.get_users".into(),
            arguments: String::new(),
        }
    }

    #[test]
    fn test_render_structured_rows() {
        let result = ToolCallResult::success(
            "c1",
            "db.get_users",
            vec![ContentPart::Structured(json!([{"id": 1, "email": "a@x.com"}]))],
        );
        let text = ResultAggregator::default().render(&result);

        assert!(text.starts_with("[Tool 'db.get_users' returned]"));
        assert!(text.contains("a@x.com"));
    }

    #[test]
    fn test_render_failure_and_empty() {
        let aggregator = ResultAggregator::default();

        let failed = ToolCallResult::failure("c1", "drive.get_file_metadata", "file not found");
        assert_eq!(aggregator.render(&failed), "[Tool 'drive.get_file_metadata' failed]\nfile not found");

        let empty = ToolCallResult::success("c2", "sheets.read_sheet", Vec::new());
        assert!(aggregator.render(&empty).ends_with("(no output)"));
    }

    #[test]
    fn test_render_truncates_long_output() {
        let aggregator = ResultAggregator::new(AggregatorConfig { max_chars: 10 });
        let result = ToolCallResult::success("c1", "x.y", vec![ContentPart::Text("é".repeat(25))]);
        let text = aggregator.render(&result);
        assert!(text.ends_with("... [truncated 15 chars]"));
    }

    #[test]
    fn test_fold_preserves_order_and_rejects_orphans() {
        let aggregator = ResultAggregator::default();
        let mut conversation = Conversation::new();
        conversation.push_user("list users twice");
        conversation.propose_calls("", vec![call("c1"), call("c2")]);

        let results = vec![
            ToolCallResult::success("c1", "db.get_users", vec![ContentPart::Text("first".into())]),
            ToolCallResult::success("c2", "db.get_users", vec![ContentPart::Text("second".into())]),
        ];
        aggregator.fold(&mut conversation, &results).unwrap();

        let tool_ids: Vec<_> = conversation
            .messages()
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(tool_ids, vec!["c1", "c2"]);

        let orphan = ToolCallResult::success("c3", "db.get_users", Vec::new());
        let err = aggregator.fold(&mut conversation, &[orphan]).unwrap_err();
        assert!(matches!(err, AgentError::OrphanResult(_)));
    }

    #[test]
    fn test_partial_answer_includes_findings() {
        let aggregator = ResultAggregator::default();
        let mut conversation = Conversation::new();
        conversation.push_user("find resumes");
        conversation.propose_calls("", vec![call("c1")]);
        conversation
            .record_result("c1", "drive.search_files", "[Tool 'drive.search_files' returned]\nresume.pdf")
            .unwrap();

        let answer = aggregator.partial_answer(&conversation, 3);
        assert!(answer.starts_with("I couldn't complete this request within 3 tool rounds."));
        assert!(answer.contains("resume.pdf"));
    }
}
