//! 工具网关抽象
//!
//! 外部工具服务器通过 ToolGateway 接入：list_tools 枚举带 schema 的工具描述，
//! call_tool 返回统一的 ToolValue 标签联合（结构化 / 文本 / 二进制 / 空），
//! 供 ArtifactPolicy 统一消费，消除对结果形态的临时判断。

mod mcp;
mod mock;

pub use mcp::McpClient;
pub use mock::MockGateway;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::AgentError;

/// 工具调用结果的标签联合
#[derive(Clone, Debug, PartialEq)]
pub enum ToolValue {
    /// 结构化结果（JSON 对象或数组）
    Structured(Value),
    Text(String),
    Binary(Vec<u8>),
    /// 工具无返回
    Empty,
}

impl ToolValue {
    /// 规范文本渲染：结构化值按缩进 JSON，二进制只渲染占位（内容由工件存储持有）
    pub fn render(&self) -> String {
        match self {
            ToolValue::Structured(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
            ToolValue::Text(s) => s.clone(),
            ToolValue::Binary(b) => format!("<binary {} bytes>", b.len()),
            ToolValue::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ToolValue::Empty)
    }
}

/// 网关侧的工具描述（input_schema 为 JSON Schema，原样透传）
#[derive(Clone, Debug)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// 工具网关：任务生命周期内持有连接，list_tools 在 Init 阶段调用一次
#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError>;

    async fn call_tool(&self, name: &str, params: Value) -> Result<ToolValue, AgentError>;
}

/// 将工具描述转为 OpenAI function calling 格式；
/// 参数类型、描述与 required 列表从 input_schema 原样取用
pub fn to_openai_function(tool: &ToolDescriptor) -> Value {
    let mut properties = serde_json::Map::new();
    if let Some(props) = tool.input_schema.get("properties").and_then(|p| p.as_object()) {
        for (param_name, param_meta) in props {
            properties.insert(
                param_name.clone(),
                json!({
                    "type": param_meta.get("type").cloned().unwrap_or(json!("string")),
                    "description": param_meta
                        .get("description")
                        .cloned()
                        .unwrap_or(json!("")),
                }),
            );
        }
    }
    let required = tool
        .input_schema
        .get("required")
        .cloned()
        .unwrap_or(json!([]));
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        }
    })
}

/// 紧凑格式（pre-think 的工具清单用，省 token）：名字、描述与参数名列表
pub fn to_mini_format(tool: &ToolDescriptor) -> Value {
    let params: Vec<String> = tool
        .input_schema
        .get("properties")
        .and_then(|p| p.as_object())
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "write_file".to_string(),
            description: "Write a file".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "target path"},
                    "content": {"type": "string"}
                },
                "required": ["file_path", "content"]
            }),
        }
    }

    #[test]
    fn test_openai_format_verbatim() {
        let f = to_openai_function(&descriptor());
        assert_eq!(f["function"]["name"], "write_file");
        assert_eq!(
            f["function"]["parameters"]["properties"]["file_path"]["type"],
            "string"
        );
        assert_eq!(
            f["function"]["parameters"]["properties"]["file_path"]["description"],
            "target path"
        );
        assert_eq!(
            f["function"]["parameters"]["required"],
            json!(["file_path", "content"])
        );
    }

    #[test]
    fn test_mini_format_param_names() {
        let m = to_mini_format(&descriptor());
        assert_eq!(m["name"], "write_file");
        let params = m["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_render_shapes() {
        assert_eq!(ToolValue::Text("hi".into()).render(), "hi");
        assert_eq!(ToolValue::Empty.render(), "");
        assert_eq!(ToolValue::Binary(vec![0, 1]).render(), "<binary 2 bytes>");
        assert!(ToolValue::Structured(json!({"a": 1})).render().contains("\"a\""));
    }
}
