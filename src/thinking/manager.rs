//! ThoughtManager：每步思考与任务首尾的一次性思考
//!
//! think 永不返回错误：传输失败与解析失败都折叠为哨兵 Thought，由循环按
//! 无效果步继续。pre_think 把原始目标展开为 CompactGoal（失败用保底目标），
//! post_think 在任务结束时产出写入长期记忆的运行总结。

use std::sync::Arc;

use crate::goal::CompactGoal;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::thinking::thought::strip_code_fence;
use crate::thinking::{parse_thought, thought_format_schema_json, Thought};

/// 思考器：持有 LLM 客户端，产出每步的 Thought 与首尾的一次性产物
pub struct ThoughtManager {
    llm: Arc<dyn LlmClient>,
}

impl ThoughtManager {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 每步思考；rag_context 为长期记忆检索结果（可为空）
    pub async fn think(&self, user_goal: &str, situation: &str, rag_context: &str) -> Thought {
        let prompt = format!(
            "User goal: {}\n\
             Current situation:\n{}\n\n\
             Relevant past knowledge (may be empty):\n{}\n\n\
             Answer ONLY with one JSON object matching this schema:\n{}\n\
             Rules:\n\
             1. Use think_along AT MOST ONCE in a row, only to form a new idea; a think_along step must contain no other action.\n\
             2. After a think_along (or once the idea is ready) you MUST apply it through the available tools.\n\
             3. Do NOT redo work already visible in the history; check with read tools first.\n\
             4. If the history already shows 2-3 think_along in a row, switch to tool actions immediately.\n\
             5. When the success criteria of the goal are met, use submit_task.",
            user_goal,
            situation,
            rag_context,
            thought_format_schema_json(),
        );
        let messages = [
            Message::system("You think fast and to the point."),
            Message::user(prompt),
        ];
        match self.llm.complete(&messages).await {
            Ok(raw) => parse_thought(&raw),
            Err(e) => {
                tracing::warn!(error = %e, "llm transport failure, degrading to sentinel thought");
                Thought::transport_fallback(&e)
            }
        }
    }

    /// 一次性 pre-think：原始目标 → CompactGoal；任何失败都退到保底目标
    pub async fn pre_think(&self, goal: &str, mini_tools: &str, tool_names: Vec<String>) -> CompactGoal {
        let prompt = format!(
            "Expand the raw task below into a compact structured goal.\n\
             Task: {}\n\
             Available tools:\n{}\n\n\
             Answer ONLY with JSON of the form {{\"compact_goal\": {{\"title\", \"objective\", \
             \"deliverables\", \"tool_name_list\", \"context\", \"success_criteria\", \"subgoals\", \
             \"unknowns\", \"assumptions\", \"rag_queries\", \"confidence\"}}}}.\n\
             tool_name_list must only contain tools from the list above. \
             Every subgoal needs an evidence-based done_when.",
            goal, mini_tools,
        );
        let messages = [
            Message::system("You plan tasks precisely."),
            Message::user(prompt),
        ];
        let raw = match self.llm.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "pre_think llm failure, using fallback goal");
                return CompactGoal::fallback(goal, tool_names);
            }
        };
        match CompactGoal::from_json(strip_code_fence(&raw)) {
            Ok(compact) => compact,
            Err(e) => {
                tracing::warn!(error = %e, "pre_think parse failure, using fallback goal");
                CompactGoal::fallback(goal, tool_names)
            }
        }
    }

    /// 一次性 post-think：汇总整个运行，产出长期记忆摘要文本；失败只记日志
    pub async fn post_think(&self, compact_goal: &CompactGoal, observations: &str) -> Option<String> {
        let prompt = format!(
            "Summarize the finished task run for long-term memory.\n\
             Goal:\n{}\n\
             Observations:\n{}\n\n\
             Write a short plain-text record: what the task was, what was done, \
             key decisions, pitfalls and how they were fixed, and what is reusable.",
            compact_goal.to_json(),
            observations,
        );
        let messages = [
            Message::system("You write concise engineering postmortems."),
            Message::user(prompt),
        ];
        match self.llm.complete(&messages).await {
            Ok(summary) if !summary.trim().is_empty() => Some(summary),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "post_think llm failure, skipping summary");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::thinking::ThoughtSource;

    #[tokio::test]
    async fn test_think_oracle_path() {
        let llm = Arc::new(MockLlmClient::new(vec![
            r#"{"reasoning": "go", "action_plan": [{"tool": "ls"}], "confidence": 0.8}"#,
        ]));
        let manager = ThoughtManager::new(llm);
        let t = manager.think("goal", "situation", "").await;
        assert_eq!(t.source, ThoughtSource::Oracle);
    }

    #[tokio::test]
    async fn test_think_transport_fallback() {
        let manager = ThoughtManager::new(Arc::new(MockLlmClient::new(vec![])));
        let t = manager.think("goal", "situation", "").await;
        assert_eq!(t.source, ThoughtSource::TransportFallback);
        assert_eq!(t.action_plan.unwrap()[0].tool, "error_llm");
    }

    #[tokio::test]
    async fn test_pre_think_fallback_on_garbage() {
        let manager = ThoughtManager::new(Arc::new(MockLlmClient::new(vec!["not json"])));
        let goal = manager
            .pre_think("count cats", "[]", vec!["ls".to_string()])
            .await;
        assert_eq!(goal.objective, "count cats");
        assert_eq!(goal.tool_name_list, vec!["ls"]);
    }

    #[tokio::test]
    async fn test_pre_think_parses_wrapped_goal() {
        let manager = ThoughtManager::new(Arc::new(MockLlmClient::new(vec![
            r#"```json
{"compact_goal": {"title": "T", "objective": "O", "rag_queries": ["q1"]}}
```"#,
        ])));
        let goal = manager.pre_think("task", "[]", vec![]).await;
        assert_eq!(goal.title, "T");
        assert_eq!(goal.rag_queries, vec!["q1"]);
    }

    #[tokio::test]
    async fn test_post_think_tolerates_failure() {
        let manager = ThoughtManager::new(Arc::new(MockLlmClient::new(vec![])));
        let summary = manager
            .post_think(&CompactGoal::fallback("g", vec![]), "history")
            .await;
        assert!(summary.is_none());
    }
}
