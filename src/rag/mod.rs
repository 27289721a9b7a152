//! 长期记忆：跨任务的回合记录与相似度检索
//!
//! save_turn 写入一条回合记录；search 按相似度距离检索——max_distance 是
//! 距离阈值而非数量，实现必须过滤而不能只排序。当前提供 InMemoryLongTerm
//! （词重叠 Jaccard 距离）；真实向量库（pgvector 等）可在本 trait 后接入。

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 一个回合写入长期记忆的记录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnRecord {
    pub situation_summary: String,
    pub action_description: String,
    pub result_summary: String,
    pub reasoning: Option<String>,
    pub plan: Option<String>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl TurnRecord {
    /// 检索用的拼接文本
    fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.situation_summary, self.action_description, self.result_summary
        )
    }
}

/// 长期记忆 trait
#[async_trait]
pub trait LongTermMemory: Send + Sync {
    async fn save_turn(&self, record: TurnRecord) -> Result<(), AgentError>;

    /// 返回 (距离, 记录)，按距离升序，且已按 max_distance 过滤
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        max_distance: f32,
    ) -> Result<Vec<(f32, TurnRecord)>, AgentError>;

    /// 是否启用（Noop 实现返回 false）
    fn enabled(&self) -> bool {
        true
    }
}

/// 空实现：未启用长期记忆时使用
#[derive(Clone, Default)]
pub struct NoopLongTerm;

#[async_trait]
impl LongTermMemory for NoopLongTerm {
    async fn save_turn(&self, _record: TurnRecord) -> Result<(), AgentError> {
        Ok(())
    }

    async fn search(
        &self,
        _query: &str,
        _top_k: usize,
        _max_distance: f32,
    ) -> Result<Vec<(f32, TurnRecord)>, AgentError> {
        Ok(Vec::new())
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// 将文本切分为小写词集合，用于简单相似度
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 1)
        .collect()
}

/// Jaccard 距离：1 - |交| / |并|；两侧皆空视为最远
fn jaccard_distance(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    1.0 - intersection as f32 / union as f32
}

/// 简单内存实现：词重叠检索，条目数有上限（无真实向量，适合 MVP）
pub struct InMemoryLongTerm {
    store: RwLock<Vec<(TurnRecord, HashSet<String>)>>,
    max_entries: usize,
}

impl InMemoryLongTerm {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: RwLock::new(Vec::new()),
            max_entries,
        }
    }
}

impl Default for InMemoryLongTerm {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl LongTermMemory for InMemoryLongTerm {
    async fn save_turn(&self, record: TurnRecord) -> Result<(), AgentError> {
        let tokens = tokenize_lower(&record.searchable_text());
        let mut store = self.store.write().unwrap();
        store.push((record, tokens));
        let n = store.len();
        if n > self.max_entries {
            store.drain(0..n - self.max_entries);
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        max_distance: f32,
    ) -> Result<Vec<(f32, TurnRecord)>, AgentError> {
        let query_tokens = tokenize_lower(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let store = self.store.read().unwrap();
        let mut scored: Vec<(f32, TurnRecord)> = store
            .iter()
            .map(|(record, tokens)| (jaccard_distance(&query_tokens, tokens), record.clone()))
            .filter(|(distance, _)| *distance <= max_distance)
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}
