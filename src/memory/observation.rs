//! 观察记录：一次动作的执行结果
//!
//! 每个执行过的 Action 恰好产生一条 Observation，追加进历史后不再修改。
//! output 为完整渲染，output_short 为策略层给出的有界摘要，artifacts 为落盘引用。

use serde_json::json;

use crate::artifacts::ArtifactRef;
use crate::react::Action;

/// 一次动作的执行结果（追加进历史后不可变）
#[derive(Clone, Debug)]
pub struct Observation {
    pub action: Action,
    /// 完整输出渲染
    pub output: String,
    /// 有界摘要（由 ArtifactPolicy 截断，长度不超过配置的 summary_length）
    pub output_short: Option<String>,
    pub success: bool,
    pub step: usize,
    pub artifacts: Vec<ArtifactRef>,
}

impl Observation {
    /// 渲染为单行 JSON（post_think 汇总历史时使用）
    pub fn to_json(&self) -> String {
        json!({
            "tool_name": self.action.tool_name(),
            "success": self.success,
            "output_short": self.output_short,
            "output": self.output,
            "step": self.step,
            "artifacts": self.artifacts.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        })
        .to_string()
    }
}
