//! Agent 错误类型
//!
//! 任务循环对 LLM 与解析类错误就地降级（哨兵 Thought），不向上传播；
//! 工具与工件类错误转为失败 Observation 进入历史，供下一步推理参考。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（网络、解析、工具、工件等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Gateway error: {0}")]
    GatewayError(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// 带行号工件中缺少请求范围内的行（上游输出被截断时出现）。
    /// missing 最多列出 10 个缺失行号，more 表示还有更多。
    #[error("Missing lines: {missing:?}{}", if *.more { "..." } else { "" })]
    IncompleteRange { missing: Vec<u64>, more: bool },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
