//! 工件存储：按 id 落盘的工具输出
//!
//! 每个工件一条元数据（{id}.meta.json）+ 一个内容 blob（{id}.txt / {id}.bin）。
//! 内容先写、元数据后写：读者看到元数据时内容必定已存在。内容写入后不可变，
//! read_slice 是纯读视图，不重编码。

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::gateway::ToolValue;

/// 工件引用：不透明 id，渲染为 `artifact:<id>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRef {
    pub artifact_id: String,
}

impl ArtifactRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            artifact_id: id.into(),
        }
    }

    /// 解析引用字符串；`artifact:` 前缀可省略
    pub fn from_ref(s: &str) -> Self {
        let id = s.strip_prefix("artifact:").unwrap_or(s);
        Self::new(id)
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "artifact:{}", self.artifact_id)
    }
}

/// 内容类别：文本（含规范化后的结构化值）或二进制
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Binary,
}

/// 工件元数据（创建时写入一次，之后不变）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub artifact_id: String,
    pub path: PathBuf,
    pub content_kind: ContentKind,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub summary: Option<String>,
    #[serde(default)]
    pub inline_content: Option<String>,
}

/// 读出的工件内容
#[derive(Clone, Debug, PartialEq)]
pub enum ArtifactContent {
    Text(String),
    Binary(Vec<u8>),
}

impl ArtifactContent {
    pub fn render(&self) -> String {
        match self {
            ArtifactContent::Text(s) => s.clone(),
            ArtifactContent::Binary(b) => format!("<binary {} bytes>", b.len()),
        }
    }
}

/// 文件系统工件存储
pub struct ArtifactStore {
    base_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn meta_path(&self, artifact_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.meta.json", artifact_id))
    }

    fn data_path(&self, artifact_id: &str, kind: ContentKind) -> PathBuf {
        let suffix = match kind {
            ContentKind::Binary => "bin",
            ContentKind::Text => "txt",
        };
        self.base_path.join(format!("{}.{}", artifact_id, suffix))
    }

    pub fn save_text(&self, text: &str, summary: Option<&str>) -> Result<ArtifactRef, AgentError> {
        let artifact_id = Self::generate_id();
        let data_path = self.data_path(&artifact_id, ContentKind::Text);
        fs::write(&data_path, text)?;
        self.save_meta(ArtifactMeta {
            artifact_id: artifact_id.clone(),
            path: data_path,
            content_kind: ContentKind::Text,
            size: text.len() as u64,
            created_at: Utc::now(),
            summary: summary.map(String::from),
            inline_content: None,
        })?;
        Ok(ArtifactRef::new(artifact_id))
    }

    pub fn save_bytes(&self, blob: &[u8], summary: Option<&str>) -> Result<ArtifactRef, AgentError> {
        let artifact_id = Self::generate_id();
        let data_path = self.data_path(&artifact_id, ContentKind::Binary);
        fs::write(&data_path, blob)?;
        self.save_meta(ArtifactMeta {
            artifact_id: artifact_id.clone(),
            path: data_path,
            content_kind: ContentKind::Binary,
            size: blob.len() as u64,
            created_at: Utc::now(),
            summary: summary.map(String::from),
            inline_content: None,
        })?;
        Ok(ArtifactRef::new(artifact_id))
    }

    /// 按值的形态选择存法：二进制走 bytes，结构化值先规范序列化，其余按文本
    pub fn save(&self, value: &ToolValue, summary: Option<&str>) -> Result<ArtifactRef, AgentError> {
        match value {
            ToolValue::Binary(blob) => self.save_bytes(blob, summary),
            ToolValue::Structured(v) => {
                let text = serde_json::to_string_pretty(v)
                    .map_err(|e| AgentError::JsonParseError(e.to_string()))?;
                self.save_text(&text, summary)
            }
            ToolValue::Text(s) => self.save_text(s, summary),
            ToolValue::Empty => self.save_text("", summary),
        }
    }

    fn save_meta(&self, meta: ArtifactMeta) -> Result<(), AgentError> {
        let text = serde_json::to_string_pretty(&meta)
            .map_err(|e| AgentError::JsonParseError(e.to_string()))?;
        fs::write(self.meta_path(&meta.artifact_id), text)?;
        Ok(())
    }

    /// 加载元数据与完整内容；任一文件缺失或不可读均为 ArtifactNotFound
    pub fn load(&self, r: &ArtifactRef) -> Result<(ArtifactMeta, ArtifactContent), AgentError> {
        let meta_text = fs::read_to_string(self.meta_path(&r.artifact_id))
            .map_err(|_| AgentError::ArtifactNotFound(r.to_string()))?;
        let meta: ArtifactMeta = serde_json::from_str(&meta_text)
            .map_err(|_| AgentError::ArtifactNotFound(r.to_string()))?;
        let content = match meta.content_kind {
            ContentKind::Binary => ArtifactContent::Binary(
                fs::read(&meta.path).map_err(|_| AgentError::ArtifactNotFound(r.to_string()))?,
            ),
            ContentKind::Text => ArtifactContent::Text(
                fs::read_to_string(&meta.path)
                    .map_err(|_| AgentError::ArtifactNotFound(r.to_string()))?,
            ),
        };
        Ok((meta, content))
    }

    /// 切片读取：文本按 1 起始的闭区间行号（两端都缺省时返回全文），
    /// 二进制把边界当字节偏移。只是读视图，不改存储内容。
    pub fn read_slice(
        &self,
        r: &ArtifactRef,
        start_line: Option<u64>,
        end_line: Option<u64>,
    ) -> Result<(ArtifactMeta, ArtifactContent), AgentError> {
        let (meta, content) = self.load(r)?;
        match content {
            ArtifactContent::Binary(bytes) => {
                let start = start_line.unwrap_or(0) as usize;
                let end = end_line.map(|e| e as usize).unwrap_or(bytes.len());
                let start = start.min(bytes.len());
                let end = end.clamp(start, bytes.len());
                Ok((meta, ArtifactContent::Binary(bytes[start..end].to_vec())))
            }
            ArtifactContent::Text(text) => {
                if start_line.is_none() && end_line.is_none() {
                    return Ok((meta, ArtifactContent::Text(text)));
                }
                let lines: Vec<&str> = text.lines().collect();
                let start_idx = start_line.map(|s| s.saturating_sub(1) as usize).unwrap_or(0);
                let end_idx = end_line.map(|e| e as usize).unwrap_or(lines.len());
                let start_idx = start_idx.min(lines.len());
                let end_idx = end_idx.clamp(start_idx, lines.len());
                Ok((
                    meta,
                    ArtifactContent::Text(lines[start_idx..end_idx].join("\n")),
                ))
            }
        }
    }
}
