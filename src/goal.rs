//! 压缩目标（pre-think 产物）
//!
//! 任务开始时 LLM 把原始目标展开为结构化的 CompactGoal：子目标、完成判据、
//! 可用工具列表与长期记忆检索词。循环每步都把它完整渲染进 situation。

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 目标上下文：领域、涉及实体、输入、约束与非目标
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalContext {
    pub domain: String,
    pub entities: Vec<String>,
    pub inputs: Vec<String>,
    pub constraints: Vec<String>,
    pub non_goals: Vec<String>,
}

/// 子目标：done_when 必须是可检验的证据型判据
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Subgoal {
    pub id: String,
    pub description: String,
    pub done_when: String,
    pub evidence_needed: Vec<String>,
    pub risks: Vec<String>,
}

/// 结构化目标说明
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactGoal {
    pub title: String,
    pub objective: String,
    pub deliverables: Vec<String>,
    pub tool_name_list: Vec<String>,
    pub context: GoalContext,
    pub success_criteria: Vec<String>,
    pub subgoals: Vec<Subgoal>,
    pub unknowns: Vec<String>,
    pub assumptions: Vec<String>,
    pub rag_queries: Vec<String>,
    pub confidence: f64,
}

impl CompactGoal {
    /// 解析 pre-think 返回的 JSON；兼容 {"compact_goal": {...}} 包装与裸对象两种形态
    pub fn from_json(text: &str) -> Result<Self, AgentError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, text)))?;
        let inner = value.get("compact_goal").cloned().unwrap_or(value);
        serde_json::from_value(inner)
            .map_err(|e| AgentError::JsonParseError(format!("compact_goal: {}", e)))
    }

    /// pre-think 失败时的保底目标：原始任务即 objective，放开全部工具
    pub fn fallback(goal: &str, tool_names: Vec<String>) -> Self {
        Self {
            title: goal.to_string(),
            objective: goal.to_string(),
            tool_name_list: tool_names,
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_and_bare_forms() {
        let bare = r#"{"title": "t", "objective": "o", "confidence": 0.7}"#;
        let g = CompactGoal::from_json(bare).unwrap();
        assert_eq!(g.title, "t");
        assert!((g.confidence - 0.7).abs() < 1e-9);

        let wrapped = r#"{"compact_goal": {"title": "t2", "tool_name_list": ["write_file"]}}"#;
        let g = CompactGoal::from_json(wrapped).unwrap();
        assert_eq!(g.title, "t2");
        assert_eq!(g.tool_name_list, vec!["write_file"]);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(CompactGoal::from_json("not json").is_err());
    }

    #[test]
    fn test_fallback_keeps_goal_and_tools() {
        let g = CompactGoal::fallback("count cats", vec!["ls".into(), "cat".into()]);
        assert_eq!(g.objective, "count cats");
        assert_eq!(g.tool_name_list.len(), 2);
    }

    #[test]
    fn test_round_trip() {
        let mut g = CompactGoal::fallback("goal", vec![]);
        g.subgoals.push(Subgoal {
            id: "S1".into(),
            description: "first".into(),
            done_when: "file exists".into(),
            ..Subgoal::default()
        });
        let back = CompactGoal::from_json(&g.to_json()).unwrap();
        assert_eq!(back.subgoals[0].id, "S1");
    }
}
