//! 任务上下文与记忆模型
//!
//! Memory 为追加式观察历史 + 单步生命周期的 scratchpad；Context 独占持有 Memory
//! 与 StateUpdate，随任务创建与销毁。format_recent_history 是压缩策略：
//! 窗口内最近 k 条渲染完整输出，更早的降级为摘要 + 可检索的工件引用。

use std::collections::HashMap;

use crate::goal::CompactGoal;
use crate::memory::{Observation, StateUpdate};

/// write_file 的 params 里通常带整文件内容，历史渲染时只保留前 30 字符
const WRITE_FILE_PARAMS_PREVIEW: usize = 30;

/// 记忆：观察历史（追加式）+ scratchpad（单步生命周期）
#[derive(Clone, Debug, Default)]
pub struct Memory {
    pub history: Vec<Observation>,
    pub scratchpad: HashMap<String, String>,
}

impl Memory {
    /// 追加一条观察；scratchpad 同时清空（其中只允许存单步数据，如上一轮计划）
    pub fn store(&mut self, observation: Observation) {
        self.history.push(observation);
        self.scratchpad.clear();
    }
}

/// 单次任务运行的全部进程内状态；任务开始时创建，结束即销毁，不跨任务共享
#[derive(Clone, Debug, Default)]
pub struct Context {
    pub user_goal: Option<String>,
    pub compact_goal: CompactGoal,
    pub memory: Memory,
    pub last_observation: Option<Observation>,
    pub state_update: StateUpdate,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新任务：设置目标并清空 scratchpad
    pub fn set_task(&mut self, task: &str) {
        self.user_goal = Some(task.to_string());
        self.memory.scratchpad.clear();
    }

    pub fn update(&mut self, observations: Vec<Observation>) {
        for observation in observations {
            self.update_observation(observation);
        }
    }

    pub fn update_observation(&mut self, observation: Observation) {
        self.last_observation = Some(observation.clone());
        self.memory.store(observation);
    }

    /// 接收 LLM 申报的进度；数值回退只记 warn，不拒绝（信任 LLM）
    pub fn apply_state_update(&mut self, update: StateUpdate) {
        if update.regressed_from(&self.state_update) {
            tracing::warn!(
                old = %self.state_update.start_line,
                new = %update.start_line,
                "state_update start_line regressed"
            );
        }
        self.state_update = update;
    }

    /// 暂存 LLM 最近申报的多步意图，供下一步 situation 渲染；存观察时即被清掉
    pub fn set_plan(&mut self, plan: &str) {
        self.memory
            .scratchpad
            .insert("plan".to_string(), plan.to_string());
    }

    pub fn get_plan(&self) -> Option<&str> {
        self.memory.scratchpad.get("plan").map(|s| s.as_str())
    }

    /// 渲染最近 window_n 条观察；其中最近 full_output_window_k 条用完整输出，
    /// 更早的用 output_short + 工件引用列表。空历史渲染为固定字面量。
    pub fn format_recent_history(
        &self,
        window_n: usize,
        full_output_window_k: usize,
    ) -> String {
        let history_len = self.memory.history.len();
        if history_len == 0 {
            return "history empty".to_string();
        }

        let skip = history_len.saturating_sub(window_n);
        let shown = history_len - skip;
        let mut lines = Vec::with_capacity(shown);
        for (i, obs) in self.memory.history[skip..].iter().enumerate() {
            // 当前条之后（含当前）还要展示多少条
            let remaining = shown - i;
            let output = if remaining <= full_output_window_k || history_len <= full_output_window_k
            {
                obs.output.clone()
            } else {
                obs.output_short.clone().unwrap_or_default()
            };
            let mark = if obs.success { "[Success]" } else { "[Error]" };
            let refs = if obs.artifacts.is_empty() {
                String::new()
            } else {
                format!(
                    " refs={}",
                    obs.artifacts
                        .iter()
                        .map(|a| a.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                )
            };
            let params = obs.action.params.to_string();
            let params = if obs.action.tool_name() == "write_file" {
                params.chars().take(WRITE_FILE_PARAMS_PREVIEW).collect()
            } else {
                params
            };
            lines.push(format!(
                "{} {}: {} - result: {}{}",
                mark,
                obs.action.tool_name(),
                params,
                output,
                refs
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::react::Action;

    fn obs(step: usize, output: &str, short: &str) -> Observation {
        Observation {
            action: Action::bare("echo"),
            output: output.to_string(),
            output_short: Some(short.to_string()),
            success: true,
            step,
            artifacts: Vec::new(),
        }
    }

    #[test]
    fn test_empty_history_literal() {
        let ctx = Context::new();
        assert_eq!(ctx.format_recent_history(5, 2), "history empty");
    }

    #[test]
    fn test_two_tier_windowing() {
        let mut ctx = Context::new();
        for i in 1..=7 {
            ctx.update_observation(obs(i, &format!("full{}", i), &format!("short{}", i)));
        }
        // 窗口 5：显示 3..=7；其中 6、7 用完整输出，3、4、5 用摘要
        let rendered = ctx.format_recent_history(5, 2);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("short3"));
        assert!(lines[1].contains("short4"));
        assert!(lines[2].contains("short5"));
        assert!(lines[3].contains("full6"));
        assert!(lines[4].contains("full7"));
    }

    #[test]
    fn test_short_history_all_full() {
        let mut ctx = Context::new();
        ctx.update_observation(obs(1, "full1", "short1"));
        ctx.update_observation(obs(2, "full2", "short2"));
        let rendered = ctx.format_recent_history(5, 2);
        assert!(rendered.contains("full1"));
        assert!(rendered.contains("full2"));
    }

    #[test]
    fn test_refs_appended() {
        let mut ctx = Context::new();
        let mut o = obs(1, "full", "short");
        o.artifacts = vec![crate::artifacts::ArtifactRef::new("a1")];
        ctx.update_observation(o);
        assert!(ctx.format_recent_history(5, 2).contains("refs=artifact:a1"));
    }

    #[test]
    fn test_scratchpad_cleared_on_store() {
        let mut ctx = Context::new();
        ctx.set_plan("step 1; step 2");
        assert_eq!(ctx.get_plan(), Some("step 1; step 2"));
        ctx.update_observation(obs(1, "full", "short"));
        assert_eq!(ctx.get_plan(), None);
    }

    #[test]
    fn test_scratchpad_cleared_on_new_task() {
        let mut ctx = Context::new();
        ctx.set_plan("stale plan");
        ctx.set_task("new goal");
        assert_eq!(ctx.get_plan(), None);
        assert_eq!(ctx.user_goal.as_deref(), Some("new goal"));
    }
}
