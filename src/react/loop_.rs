//! 任务循环：Init → Begin → Step* → End
//!
//! TaskRunner 驱动单次任务的完整生命周期：Init 建上下文并枚举一次工具，
//! Begin 做 pre-think 与长期记忆预检索，Step 重复"渲染局势 → 思考 →
//! 调度 → 折叠观察"，End 做 post-think 并写入长期记忆。循环对 LLM 的
//! 任何失败都不上抛：哨兵决策按无效果步继续，唯一的硬停是步数上限。

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::artifacts::{
    retrieve_artifact_mini_schema, retrieve_artifact_tool_schema, ArtifactPolicy, ArtifactStore,
    RETRIEVE_ARTIFACT_TOOL,
};
use crate::config::AppConfig;
use crate::core::AgentError;
use crate::gateway::{to_mini_format, to_openai_function, ToolDescriptor, ToolGateway};
use crate::llm::LlmClient;
use crate::memory::{Context, Observation};
use crate::rag::{LongTermMemory, TurnRecord};
use crate::react::{thought_to_actions, ActionKind, Dispatcher};
use crate::thinking::{Thought, ThoughtManager};

/// 写入长期记忆的局势摘要最大字符数
const SITUATION_SUMMARY_CHARS: usize = 300;

/// 任务结束方式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// LLM 调用了 submit_task：目标自报完成
    Completed,
    /// LLM 给不出任何可执行决策（empty_action）：结束但不算完成
    EmptyDecision,
    /// 到达步数上限，强制停止
    StepLimit,
}

/// 一次任务运行的报告
#[derive(Clone, Debug)]
pub struct TaskReport {
    pub outcome: TaskOutcome,
    /// 实际执行的步数
    pub steps: usize,
    /// post-think 产出的运行总结（可能缺失）
    pub summary: Option<String>,
}

/// 任务执行器：持有全部长生命周期组件，run 内部创建并销毁每任务的 Context
pub struct TaskRunner {
    thoughts: ThoughtManager,
    gateway: Arc<dyn ToolGateway>,
    dispatcher: Dispatcher,
    long_term: Arc<dyn LongTermMemory>,
    config: AppConfig,
}

impl TaskRunner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        gateway: Arc<dyn ToolGateway>,
        long_term: Arc<dyn LongTermMemory>,
        config: AppConfig,
    ) -> Result<Self, AgentError> {
        let store = Arc::new(ArtifactStore::new(&config.artifacts.base_path)?);
        let policy = ArtifactPolicy::new(Arc::clone(&store)).with_limits(
            config.artifacts.max_inline_length,
            config.artifacts.summary_length,
        );
        Ok(Self {
            thoughts: ThoughtManager::new(llm),
            gateway: Arc::clone(&gateway),
            dispatcher: Dispatcher::new(store, policy, gateway),
            long_term,
            config,
        })
    }

    /// 运行一个任务直到 submit_task / empty_action / 步数上限。
    /// LLM 与工具的失败都折叠进观察历史，本函数不因其返回错误。
    pub async fn run(&self, task: &str) -> TaskReport {
        // Init：每任务新建上下文；工具只在此处枚举一次
        let mut ctx = Context::new();
        ctx.set_task(task);
        let tools = match self.gateway.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                tracing::warn!(error = %e, "tool discovery failed, continuing with empty list");
                Vec::new()
            }
        };
        let openai_tools = render_openai_tools(&tools);
        let mini_tools = render_mini_tools(&tools);
        let mut tool_names: Vec<String> = tools.iter().map(|t| t.name.clone()).collect();
        tool_names.push(RETRIEVE_ARTIFACT_TOOL.to_string());

        // Begin：pre-think 展开目标，并用 rag_queries 预检索长期记忆
        ctx.compact_goal = self.thoughts.pre_think(task, &mini_tools, tool_names).await;
        let rag_context = self.seed_rag_context(&ctx).await;
        tracing::info!(title = %ctx.compact_goal.title, "task started");

        let mut outcome = TaskOutcome::StepLimit;
        let mut steps = 0;
        for step in 1..=self.config.agent.max_steps {
            steps = step;
            let situation = self.build_situation(step, &ctx, &openai_tools);
            let thought = self
                .thoughts
                .think(task, &situation, &rag_context)
                .await;
            if let Some(update) = thought.state_update.clone() {
                ctx.apply_state_update(update);
            }

            let actions = thought_to_actions(&thought);
            let observations = self.dispatcher.actions_to_observations(actions, step).await;
            // 结束判定只看最新一条观察：计划里靠前的 submit_task 不算数
            let terminal = observations.last().and_then(|o| match &o.action.kind {
                ActionKind::Submit => Some(TaskOutcome::Completed),
                ActionKind::Empty => Some(TaskOutcome::EmptyDecision),
                _ => None,
            });

            self.spawn_turn_save(&situation, &thought, &observations);
            ctx.update(observations);
            // store 清空了 scratchpad；此处重新暂存多步计划供下一步局势渲染
            if let Some(plan) = render_plan(&thought) {
                ctx.set_plan(&plan);
            }

            if let Some(found) = terminal {
                outcome = found;
                break;
            }
        }

        // End：post-think 汇总整个运行并写入长期记忆。
        // 总结吃全量历史（逐条 JSON），不走步内的压缩窗口
        let transcript = ctx
            .memory
            .history
            .iter()
            .map(|o| o.to_json())
            .collect::<Vec<_>>()
            .join("\n");
        let summary = self.thoughts.post_think(&ctx.compact_goal, &transcript).await;
        if let Some(ref text) = summary {
            if self.long_term.enabled() {
                let record = TurnRecord {
                    situation_summary: ctx.compact_goal.objective.clone(),
                    action_description: "task run summary".to_string(),
                    result_summary: text.clone(),
                    reasoning: None,
                    plan: None,
                    success: outcome == TaskOutcome::Completed,
                    created_at: Utc::now(),
                };
                if let Err(e) = self.long_term.save_turn(record).await {
                    tracing::warn!(error = %e, "failed to save run summary");
                }
            }
        }
        tracing::info!(?outcome, steps, "task finished");
        TaskReport {
            outcome,
            steps,
            summary,
        }
    }

    /// Begin 阶段的长期记忆预检索：逐条 rag_query 查询并拼接命中记录
    async fn seed_rag_context(&self, ctx: &Context) -> String {
        if !self.long_term.enabled() {
            return String::new();
        }
        let mut lines = Vec::new();
        for query in &ctx.compact_goal.rag_queries {
            match self
                .long_term
                .search(
                    query,
                    self.config.memory.top_k,
                    self.config.memory.max_distance,
                )
                .await
            {
                Ok(hits) => {
                    for (distance, record) in hits {
                        lines.push(format!(
                            "- (d={:.2}) {}: {}",
                            distance, record.situation_summary, record.result_summary
                        ));
                    }
                }
                Err(e) => tracing::warn!(error = %e, query, "long-term memory search failed"),
            }
        }
        lines.join("\n")
    }

    /// 渲染一步的局势：步数、完整压缩目标、进度申报、压缩历史、
    /// 上一轮申报的计划与全量工具清单
    fn build_situation(&self, step: usize, ctx: &Context, openai_tools: &str) -> String {
        let history = ctx.format_recent_history(
            self.config.agent.history_window,
            self.config.agent.full_output_window,
        );
        let plan_line = match ctx.get_plan() {
            Some(plan) => format!("Declared plan from previous step: {}\n", plan),
            None => String::new(),
        };
        format!(
            "Step {}/{}\n\
             Goal:\n{}\n\
             Progress: start_line={} end_line={} found_end={}\n\
             Recent history:\n{}\n\
             {}\
             Available tools (OpenAI function format):\n{}",
            step,
            self.config.agent.max_steps,
            ctx.compact_goal.to_json(),
            ctx.state_update.start_line,
            ctx.state_update.end_line,
            ctx.state_update.found_end,
            history,
            plan_line,
            openai_tools,
        )
    }

    /// 每步的长期记忆写入：fire-and-forget，失败只记日志，绝不拖慢循环
    fn spawn_turn_save(&self, situation: &str, thought: &Thought, observations: &[Observation]) {
        if !self.long_term.enabled() {
            return;
        }
        let record = TurnRecord {
            situation_summary: situation.chars().take(SITUATION_SUMMARY_CHARS).collect(),
            action_description: observations
                .iter()
                .map(|o| o.action.tool_name().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            result_summary: observations
                .iter()
                .map(|o| o.output_short.clone().unwrap_or_else(|| o.output.clone()))
                .collect::<Vec<_>>()
                .join("\n"),
            reasoning: Some(thought.reasoning.clone()),
            plan: render_plan(thought),
            success: observations.iter().all(|o| o.success),
            created_at: Utc::now(),
        };
        let long_term = Arc::clone(&self.long_term);
        tokio::spawn(async move {
            if let Err(e) = long_term.save_turn(record).await {
                tracing::warn!(error = %e, "failed to save turn record");
            }
        });
    }
}

/// 决策的多步计划 → 单行文本（scratchpad 与长期记忆共用）
fn render_plan(thought: &Thought) -> Option<String> {
    let plan = thought.action_plan.as_ref()?;
    if plan.len() < 2 {
        return None;
    }
    Some(
        plan.iter()
            .map(|s| s.tool.clone())
            .collect::<Vec<_>>()
            .join(" -> "),
    )
}

/// 网关工具 + retrieve_artifact + 控制动词的 OpenAI function 清单
fn render_openai_tools(tools: &[ToolDescriptor]) -> String {
    let mut all: Vec<Value> = tools.iter().map(to_openai_function).collect();
    all.push(retrieve_artifact_tool_schema());
    all.push(control_tool_schema(
        "submit_task",
        "Declare the goal achieved and finish the task.",
    ));
    all.push(control_tool_schema(
        "think_along",
        "Spend one step on pure reasoning, without tool side effects.",
    ));
    serde_json::to_string_pretty(&all).unwrap_or_else(|_| "[]".to_string())
}

/// pre-think 用的紧凑工具清单
fn render_mini_tools(tools: &[ToolDescriptor]) -> String {
    let mut all: Vec<Value> = tools.iter().map(to_mini_format).collect();
    all.push(retrieve_artifact_mini_schema());
    serde_json::to_string(&all).unwrap_or_else(|_| "[]".to_string())
}

fn control_tool_schema(name: &str, description: &str) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {"type": "object", "properties": {}, "required": []},
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockGateway, ToolValue};
    use crate::llm::MockLlmClient;
    use crate::rag::NoopLongTerm;

    fn config(dir: &tempfile::TempDir, max_steps: usize) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.artifacts.base_path = dir.path().to_path_buf();
        cfg.agent.max_steps = max_steps;
        cfg
    }

    fn runner(llm: MockLlmClient, gateway: MockGateway, cfg: AppConfig) -> TaskRunner {
        TaskRunner::new(
            Arc::new(llm),
            Arc::new(gateway),
            Arc::new(NoopLongTerm),
            cfg,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_submit_task_completes() {
        let dir = tempfile::tempdir().unwrap();
        let llm = MockLlmClient::new(vec![
            // pre-think
            r#"{"compact_goal": {"title": "t", "objective": "o"}}"#,
            // 第 1 步直接提交
            r#"{"reasoning": "done", "action_plan": [{"tool": "submit_task"}], "confidence": 0.9}"#,
            // post-think
            "ran fine",
        ]);
        let runner = runner(llm, MockGateway::new(), config(&dir, 10));
        let report = runner.run("do nothing").await;
        assert_eq!(report.outcome, TaskOutcome::Completed);
        assert_eq!(report.steps, 1);
        assert_eq!(report.summary.as_deref(), Some("ran fine"));
    }

    #[tokio::test]
    async fn test_step_limit_is_the_only_hard_stop() {
        let dir = tempfile::tempdir().unwrap();
        // LLM 每步都要求继续思考；传输失败（响应耗尽）降级为哨兵步
        let llm = MockLlmClient::new(vec![
            r#"{"compact_goal": {"title": "t", "objective": "o"}}"#,
        ]);
        let runner = runner(llm, MockGateway::new(), config(&dir, 3));
        let report = runner.run("loop forever").await;
        assert_eq!(report.outcome, TaskOutcome::StepLimit);
        assert_eq!(report.steps, 3);
    }

    #[tokio::test]
    async fn test_terminal_decided_by_newest_observation_only() {
        let dir = tempfile::tempdir().unwrap();
        let llm = MockLlmClient::new(vec![
            r#"{"compact_goal": {"title": "t", "objective": "o"}}"#,
            // submit 后面还跟了 think_along：最新观察不是终止动词，循环必须继续
            r#"{"reasoning": "submit then keep thinking", "action_plan": [{"tool": "submit_task"}, {"tool": "think_along"}], "confidence": 0.7}"#,
            r#"{"reasoning": "actually done", "action_plan": [{"tool": "submit_task"}], "confidence": 0.9}"#,
        ]);
        let runner = runner(llm, MockGateway::new(), config(&dir, 10));
        let report = runner.run("finish properly").await;
        assert_eq!(report.outcome, TaskOutcome::Completed);
        assert_eq!(report.steps, 2);
    }

    #[tokio::test]
    async fn test_empty_decision_terminates_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let llm = MockLlmClient::new(vec![
            r#"{"compact_goal": {"title": "t", "objective": "o"}}"#,
            // Oracle 正常返回但计划为空 → empty_action
            r#"{"reasoning": "stuck", "action_plan": [], "confidence": 0.1}"#,
        ]);
        let runner = runner(llm, MockGateway::new(), config(&dir, 10));
        let report = runner.run("impossible").await;
        assert_eq!(report.outcome, TaskOutcome::EmptyDecision);
        assert_eq!(report.steps, 1);
    }

    #[tokio::test]
    async fn test_tool_failure_continues_loop() {
        let dir = tempfile::tempdir().unwrap();
        let llm = MockLlmClient::new(vec![
            r#"{"compact_goal": {"title": "t", "objective": "o"}}"#,
            r#"{"reasoning": "try", "action_plan": [{"tool": "boom"}], "confidence": 0.5}"#,
            r#"{"reasoning": "give up nicely", "action_plan": [{"tool": "submit_task"}], "confidence": 0.5}"#,
        ]);
        let gateway = MockGateway::new().with_tool("boom", "fails", |_| {
            Err(AgentError::ToolExecutionFailed("nope".into()))
        });
        let runner = runner(llm, gateway, config(&dir, 10));
        let report = runner.run("use the tool").await;
        assert_eq!(report.outcome, TaskOutcome::Completed);
        assert_eq!(report.steps, 2);
    }

    #[tokio::test]
    async fn test_plan_restated_for_next_step() {
        let dir = tempfile::tempdir().unwrap();
        let llm = MockLlmClient::new(vec![
            r#"{"compact_goal": {"title": "t", "objective": "o"}}"#,
            r#"{"reasoning": "two steps", "action_plan": [{"tool": "echo"}, {"tool": "think_along"}], "confidence": 0.5}"#,
            r#"{"reasoning": "done", "action_plan": [{"tool": "submit_task"}], "confidence": 0.9}"#,
        ]);
        let gateway = MockGateway::new()
            .with_tool("echo", "echoes", |_| Ok(ToolValue::Text("ok".into())));
        let runner = runner(llm, gateway, config(&dir, 10));
        let report = runner.run("plan then finish").await;
        assert_eq!(report.outcome, TaskOutcome::Completed);
        assert_eq!(report.steps, 2);
    }
}
