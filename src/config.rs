//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WASP__*` 覆盖（双下划线表示嵌套，
//! 如 `WASP__LLM__MODEL=gpt-4o-mini`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub artifacts: ArtifactsSection,
    pub gateway: GatewaySection,
    pub memory: MemorySection,
}

/// [agent] 段：步数上限与历史压缩窗口
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 单任务最大步数，唯一的失控保护
    pub max_steps: usize,
    /// 历史渲染窗口（条）
    pub history_window: usize,
    /// 窗口内渲染完整输出的条数
    pub full_output_window: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: 999,
            history_window: 5,
            full_output_window: 2,
        }
    }
}

/// [llm] 段：OpenAI 兼容端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 标识用途（openai / deepseek / 自建代理），不改变客户端行为
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

/// [artifacts] 段：落盘目录与体积门限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsSection {
    pub base_path: PathBuf,
    /// 文本超过该字符数才落盘
    pub max_inline_length: usize,
    /// 摘要最大字符数
    pub summary_length: usize,
}

impl Default for ArtifactsSection {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(".artifacts"),
            max_inline_length: 2000,
            summary_length: 200,
        }
    }
}

/// [gateway] 段：MCP 工具服务器
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub url: String,
    pub request_timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/mcp".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// [memory] 段：长期记忆检索参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub enabled: bool,
    pub top_k: usize,
    /// 相似度距离阈值（超过即过滤，不只是排序）
    pub max_distance: f32,
    pub max_entries: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: 5,
            max_distance: 0.35,
            max_entries: 1000,
        }
    }
}

/// 从 config 目录加载配置，环境变量 WASP__* 可覆盖
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("WASP")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
