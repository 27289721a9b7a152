//! 工件策略：内联还是落盘
//!
//! 结构化与二进制结果一律落盘；文本只有超过内联阈值才落盘，否则原样内联。
//! 两种情况都产出有界摘要，保证提示词体积只随摘要长度增长，
//! 完整内容仅能通过 retrieve_artifact 按引用取回。

use std::sync::Arc;

use crate::artifacts::{ArtifactRef, ArtifactStore};
use crate::core::AgentError;
use crate::gateway::ToolValue;

/// 默认内联阈值（字符）
pub const DEFAULT_MAX_INLINE_LENGTH: usize = 2000;
/// 默认摘要长度（字符）
pub const DEFAULT_SUMMARY_LENGTH: usize = 200;

/// 按结果形态决定内联或落盘
pub struct ArtifactPolicy {
    store: Arc<ArtifactStore>,
    max_inline_length: usize,
    summary_length: usize,
}

impl ArtifactPolicy {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            max_inline_length: DEFAULT_MAX_INLINE_LENGTH,
            summary_length: DEFAULT_SUMMARY_LENGTH,
        }
    }

    pub fn with_limits(mut self, max_inline_length: usize, summary_length: usize) -> Self {
        self.max_inline_length = max_inline_length;
        self.summary_length = summary_length;
        self
    }

    /// 按字符截断（摘要永远有界）
    fn summarize(&self, text: &str) -> String {
        if text.chars().count() > self.summary_length {
            text.chars().take(self.summary_length).collect()
        } else {
            text.to_string()
        }
    }

    fn should_persist(&self, value: &ToolValue) -> bool {
        match value {
            ToolValue::Empty => false,
            ToolValue::Structured(_) | ToolValue::Binary(_) => true,
            ToolValue::Text(s) => s.chars().count() > self.max_inline_length,
        }
    }

    /// 返回 (摘要, 工件引用列表)；Empty 短路为 (None, [])。
    /// 落盘失败不吞掉：上游会把它转为失败 Observation。
    pub fn maybe_persist(
        &self,
        value: &ToolValue,
    ) -> Result<(Option<String>, Vec<ArtifactRef>), AgentError> {
        if value.is_empty() {
            return Ok((None, Vec::new()));
        }

        let rendered = value.render();
        let summary = self.summarize(&rendered);
        if self.should_persist(value) {
            let r = self.store.save(value, Some(&summary))?;
            return Ok((Some(summary), vec![r]));
        }
        Ok((Some(summary), Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> (tempfile::TempDir, ArtifactPolicy) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ArtifactStore::new(dir.path()).unwrap());
        (dir, ArtifactPolicy::new(store))
    }

    #[test]
    fn test_empty_short_circuits() {
        let (_dir, policy) = policy();
        let (summary, refs) = policy.maybe_persist(&ToolValue::Empty).unwrap();
        assert_eq!(summary, None);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_short_text_inlined() {
        let (_dir, policy) = policy();
        let (summary, refs) = policy
            .maybe_persist(&ToolValue::Text("short output".into()))
            .unwrap();
        assert_eq!(summary.as_deref(), Some("short output"));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_long_text_persisted_with_bounded_summary() {
        let (_dir, policy) = policy();
        let long = "x".repeat(5000);
        let (summary, refs) = policy.maybe_persist(&ToolValue::Text(long)).unwrap();
        assert_eq!(summary.unwrap().chars().count(), DEFAULT_SUMMARY_LENGTH);
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_structured_always_persisted() {
        let (_dir, policy) = policy();
        let (summary, refs) = policy
            .maybe_persist(&ToolValue::Structured(json!({"small": true})))
            .unwrap();
        assert!(summary.is_some());
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_binary_always_persisted() {
        let (_dir, policy) = policy();
        let (_, refs) = policy
            .maybe_persist(&ToolValue::Binary(vec![1, 2, 3]))
            .unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_summary_truncates_by_chars_not_bytes() {
        let (_dir, policy) = policy();
        // 多字节字符：按字符截断不会劈开码点
        let long: String = "文".repeat(300);
        let (summary, _) = policy.maybe_persist(&ToolValue::Text(long)).unwrap();
        assert_eq!(summary.unwrap().chars().count(), DEFAULT_SUMMARY_LENGTH);
    }
}
