//! 动作调度器
//!
//! thought_to_actions 把决策映射为动作列表，内部错误一律吞掉降级为
//! empty_action——调度构造永远不能让这一步失败。actions_to_observations
//! 按计划顺序串行执行：控制动词就地解析为字面量、retrieve_artifact 走本地
//! 工件存储、其余路由网关；所有结果（含失败）统一过 ArtifactPolicy，
//! 任何代码路径都绕不开体积门限。每次网关调用输出 JSON 审计日志。

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::artifacts::{retrieve_artifact, ArtifactPolicy, ArtifactStore, RETRIEVE_ARTIFACT_TOOL};
use crate::gateway::{ToolGateway, ToolValue};
use crate::memory::Observation;
use crate::react::{Action, ActionKind};
use crate::thinking::{Thought, ThoughtSource};

/// 审计日志中参数预览的最大字符数
const ARGS_PREVIEW_CHARS: usize = 200;

/// 决策 → 动作列表；只有 Oracle 来源且带计划时展开，其余一律 empty_action。
/// 本函数不会失败：哨兵计划（error_llm / json_error_llm）也是普通计划。
pub fn thought_to_actions(thought: &Thought) -> Vec<Action> {
    let plan = match (&thought.source, &thought.action_plan) {
        (ThoughtSource::Oracle, Some(plan)) if !plan.is_empty() => plan,
        (ThoughtSource::ParseFallback | ThoughtSource::TransportFallback, Some(plan)) => plan,
        _ => return vec![Action::bare("empty_action")],
    };
    plan.iter()
        .map(|step| match &step.parameters {
            Some(params) => Action::new(&step.tool, params.clone()),
            None => Action::bare(&step.tool),
        })
        .collect()
}

/// 执行器：控制动词 / 本地工件检索 / 网关路由 + 统一工件策略
pub struct Dispatcher {
    store: Arc<ArtifactStore>,
    policy: ArtifactPolicy,
    gateway: Arc<dyn ToolGateway>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<ArtifactStore>,
        policy: ArtifactPolicy,
        gateway: Arc<dyn ToolGateway>,
    ) -> Self {
        Self {
            store,
            policy,
            gateway,
        }
    }

    /// 顺序执行动作并包装为观察；动作失败不中断后续动作，
    /// 而是产出 success=false 的观察留在历史里供下一步推理
    pub async fn actions_to_observations(
        &self,
        actions: Vec<Action>,
        step: usize,
    ) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(actions.len());
        for action in actions {
            let (result, success) = self.execute(&action).await;
            observations.push(self.wrap(action, result, success, step));
        }
        observations
    }

    /// 单个动作的执行：返回 (结果值, 是否成功)
    async fn execute(&self, action: &Action) -> (ToolValue, bool) {
        match &action.kind {
            ActionKind::Invoke(name) if name.as_str() == RETRIEVE_ARTIFACT_TOOL => {
                self.execute_retrieve(&action.params)
            }
            ActionKind::Invoke(name) => self.execute_gateway(name, action.params.clone()).await,
            // 保留控制动词：字面量结果，不接触网关
            kind => (ToolValue::Text(kind.name().to_string()), true),
        }
    }

    fn execute_retrieve(&self, params: &Value) -> (ToolValue, bool) {
        let r = params.get("ref").and_then(|v| v.as_str()).unwrap_or("");
        let start_line = params.get("start_line").and_then(|v| v.as_u64());
        let end_line = params.get("end_line").and_then(|v| v.as_u64());
        match retrieve_artifact(&self.store, r, start_line, end_line) {
            Ok(value) => (ToolValue::Structured(value), true),
            // IncompleteRange / NotFound 必须显式失败，绝不返回悄悄截短的内容
            Err(e) => (ToolValue::Text(e.to_string()), false),
        }
    }

    async fn execute_gateway(&self, name: &str, params: Value) -> (ToolValue, bool) {
        let start = Instant::now();
        let args_preview: String = params.to_string().chars().take(ARGS_PREVIEW_CHARS).collect();
        let result = self.gateway.call_tool(name, params).await;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": name,
            "ok": result.is_ok(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");
        match result {
            Ok(value) => (value, true),
            Err(e) => (ToolValue::Text(format!("Error: {}", e)), false),
        }
    }

    /// 统一后处理：结果过工件策略后构造观察
    fn wrap(&self, action: Action, result: ToolValue, success: bool, step: usize) -> Observation {
        match self.policy.maybe_persist(&result) {
            Ok((output_short, artifacts)) => Observation {
                output: result.render(),
                output_short,
                success,
                step,
                artifacts,
                action,
            },
            Err(e) => {
                tracing::warn!(error = %e, "artifact persistence failed");
                Observation {
                    output: format!("Error: {}", e),
                    output_short: Some(format!("Error: {}", e)),
                    success: false,
                    step,
                    artifacts: Vec::new(),
                    action,
                }
            }
        }
    }
}
