//! 工件子系统
//!
//! - **store**: 内容寻址落盘（元数据 + blob，切片读取）
//! - **policy**: 内联 / 落盘决策与有界摘要
//! - **numbered**: "N: text" 带行号块的解析、切片与检索
//! - **retrieve**: 合成工具 retrieve_artifact（本地执行）

mod numbered;
mod policy;
mod retrieve;
mod store;

pub use numbered::{
    find_matches_in_numbered_block, parse_numbered_lines, slice_lines_from_numbered_block,
};
pub use policy::{ArtifactPolicy, DEFAULT_MAX_INLINE_LENGTH, DEFAULT_SUMMARY_LENGTH};
pub use retrieve::{
    retrieve_artifact, retrieve_artifact_mini_schema, retrieve_artifact_tool_schema,
    RETRIEVE_ARTIFACT_TOOL,
};
pub use store::{ArtifactContent, ArtifactMeta, ArtifactRef, ArtifactStore, ContentKind};
