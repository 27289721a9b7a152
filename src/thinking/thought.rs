//! Thought：LLM 决策的结构化形态与解析
//!
//! 两类失败分开建模，不合并：传输失败（TransportFallback → error_llm）与
//! 返回体解析失败（ParseFallback → json_error_llm）。两种哨兵 confidence
//! 固定 1.0——对"该走降级路径"这件事是完全确定的。循环见到哨兵动作时
//! 不派发网关、按无效果步继续，因此 LLM 吐垃圾不会让循环崩溃或卡死。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::memory::StateUpdate;

/// Thought 来源：正常解析 or 两类降级路径
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThoughtSource {
    Oracle,
    /// LLM 有响应但不是合法 JSON
    ParseFallback,
    /// 调用 LLM 本身失败（网络 / 超时）
    TransportFallback,
}

/// 计划中的一步；parameters 可省略（省略是合法的，不是错误）
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    /// 工具名，如 write_file、read_file、submit_task
    pub tool: String,
    /// 工具参数，依工具不同而不同
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// LLM 响应体的期望 JSON 格式（解析目标；schema 注入 system prompt 约束输出）
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct ThoughtPayload {
    /// 推理过程
    #[serde(default)]
    pub reasoning: String,
    /// 按序执行的动作计划
    #[serde(default)]
    pub action_plan: Option<Vec<PlanStep>>,
    /// 决策置信度 0.0-1.0
    #[serde(default)]
    pub confidence: f64,
    /// 可选的扫描进度申报
    #[serde(default)]
    pub state_update: Option<StateUpdate>,
}

/// 一步的决策（构造后不可变，每步恰好一个）
#[derive(Clone, Debug)]
pub struct Thought {
    pub reasoning: String,
    pub confidence: f64,
    pub source: ThoughtSource,
    pub action_plan: Option<Vec<PlanStep>>,
    pub state_update: Option<StateUpdate>,
}

impl Thought {
    /// 传输失败哨兵：动作固定为 error_llm
    pub fn transport_fallback(error: &str) -> Self {
        Self {
            reasoning: format!("LLM error: {}", error),
            confidence: 1.0,
            source: ThoughtSource::TransportFallback,
            action_plan: Some(vec![PlanStep {
                tool: "error_llm".to_string(),
                parameters: None,
            }]),
            state_update: None,
        }
    }

    /// 解析失败哨兵：动作固定为 json_error_llm
    pub fn parse_fallback(error: &str, raw: &str) -> Self {
        Self {
            reasoning: format!("JSON error: {} \n {}", error, raw),
            confidence: 1.0,
            source: ThoughtSource::ParseFallback,
            action_plan: Some(vec![PlanStep {
                tool: "json_error_llm".to_string(),
                parameters: None,
            }]),
            state_update: None,
        }
    }
}

/// 去掉一层可选的代码围栏（``` 或 ```json）；pre-think 的响应解析也用它
pub(super) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 围栏行可带语言标记
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest.trim())
}

/// 解析 LLM 原始响应为 Thought；永不报错——解析失败即 ParseFallback 哨兵
pub fn parse_thought(raw: &str) -> Thought {
    let json_text = strip_code_fence(raw);
    match serde_json::from_str::<ThoughtPayload>(json_text) {
        Ok(payload) => Thought {
            reasoning: payload.reasoning,
            confidence: payload.confidence,
            source: ThoughtSource::Oracle,
            action_plan: payload.action_plan,
            state_update: payload.state_update,
        },
        Err(e) => Thought::parse_fallback(&e.to_string(), raw),
    }
}

/// Thought JSON 格式的 Schema 字符串，拼入 system prompt 减少输出格式错误
pub fn thought_format_schema_json() -> String {
    let schema = schema_for!(ThoughtPayload);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "reasoning": "write the file",
        "action_plan": [{"tool": "write_file", "parameters": {"file_path": "a.txt"}}],
        "confidence": 0.9
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let t = parse_thought(VALID);
        assert_eq!(t.source, ThoughtSource::Oracle);
        assert_eq!(t.action_plan.as_ref().unwrap()[0].tool, "write_file");
        assert!((t.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", VALID);
        let t = parse_thought(&fenced);
        assert_eq!(t.source, ThoughtSource::Oracle);

        let fenced = format!("```\n{}\n```", VALID);
        assert_eq!(parse_thought(&fenced).source, ThoughtSource::Oracle);
    }

    #[test]
    fn test_garbage_is_parse_fallback() {
        let t = parse_thought("I think we should write a file now.");
        assert_eq!(t.source, ThoughtSource::ParseFallback);
        assert!((t.confidence - 1.0).abs() < 1e-9);
        assert_eq!(t.action_plan.unwrap()[0].tool, "json_error_llm");
    }

    #[test]
    fn test_parameters_optional() {
        let t = parse_thought(r#"{"reasoning": "done", "action_plan": [{"tool": "submit_task"}], "confidence": 1.0}"#);
        assert_eq!(t.source, ThoughtSource::Oracle);
        assert!(t.action_plan.unwrap()[0].parameters.is_none());
    }

    #[test]
    fn test_state_update_carried() {
        let t = parse_thought(
            r#"{"reasoning": "scan", "confidence": 0.5,
                "state_update": {"start_line": "40", "found_end": false, "end_line": "unknown", "notes": ["header done"]}}"#,
        );
        let su = t.state_update.unwrap();
        assert_eq!(su.start_line, "40");
        assert_eq!(su.notes, vec!["header done"]);
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = thought_format_schema_json();
        assert!(schema.contains("action_plan"));
        assert!(schema.contains("reasoning"));
    }
}
