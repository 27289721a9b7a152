//! 可恢复进度标记
//!
//! 长文档扫描类任务里 LLM 每步申报自己的扫描进度，核心只负责持久化申报值。
//! 不强制单调前进：start_line 回退仅记 warn（信任 LLM，回退可能是刻意重扫）。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

fn default_unknown() -> String {
    "unknown".to_string()
}

/// LLM 申报的扫描进度（每步整体替换）
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct StateUpdate {
    #[serde(default = "default_unknown")]
    pub start_line: String,
    #[serde(default)]
    pub found_end: bool,
    #[serde(default = "default_unknown")]
    pub end_line: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Default for StateUpdate {
    fn default() -> Self {
        Self {
            start_line: default_unknown(),
            found_end: false,
            end_line: default_unknown(),
            notes: Vec::new(),
        }
    }
}

impl StateUpdate {
    /// 检测相对上一状态的数值回退（仅当两侧 start_line 均可解析为行号时）
    pub fn regressed_from(&self, prev: &StateUpdate) -> bool {
        match (self.start_line.parse::<u64>(), prev.start_line.parse::<u64>()) {
            (Ok(new), Ok(old)) => new < old,
            _ => false,
        }
    }

    pub fn to_json(&self) -> String {
        json!({ "state_update": self }).to_string()
    }
}
