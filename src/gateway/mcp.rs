//! MCP streamable-HTTP 客户端
//!
//! 以 JSON-RPC over HTTP 对接 MCP 工具服务器：initialize → notifications/initialized
//! → tools/list / tools/call。会话 id 从 initialize 响应头取得并随后续请求携带。
//! 结果优先取 structuredContent，其次取文本 content，两者皆无时视为 Empty。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::core::AgentError;
use crate::gateway::{ToolDescriptor, ToolGateway, ToolValue};

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "Mcp-Session-Id";

/// MCP 工具网关客户端
pub struct McpClient {
    http: reqwest::Client,
    server_url: String,
    session_id: RwLock<Option<String>>,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(server_url: &str, request_timeout_secs: u64) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .map_err(|e| AgentError::GatewayError(e.to_string()))?;
        Ok(Self {
            http,
            server_url: server_url.to_string(),
            session_id: RwLock::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// 初始化会话：initialize 请求 + initialized 通知
    pub async fn initialize(&self) -> Result<(), AgentError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "wasp", "version": env!("CARGO_PKG_VERSION")},
            }
        });
        let response = self
            .http
            .post(&self.server_url)
            .header("Accept", "application/json, text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::GatewayError(e.to_string()))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.write().await = Some(session.to_string());
        }
        // 响应体当前不消费：能力协商结果对本客户端没有分支意义
        let _ = response.bytes().await;

        self.notify("notifications/initialized", json!({})).await
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), AgentError> {
        let notification = json!({"jsonrpc": "2.0", "method": method, "params": params});
        let mut req = self
            .http
            .post(&self.server_url)
            .header("Accept", "application/json, text/event-stream")
            .json(&notification);
        if let Some(session) = self.session_id.read().await.as_deref() {
            req = req.header(SESSION_HEADER, session);
        }
        req.send()
            .await
            .map_err(|e| AgentError::GatewayError(e.to_string()))?;
        Ok(())
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, AgentError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let mut req = self
            .http
            .post(&self.server_url)
            .header("Accept", "application/json, text/event-stream")
            .json(&request);
        if let Some(session) = self.session_id.read().await.as_deref() {
            req = req.header(SESSION_HEADER, session);
        }
        let response = req
            .send()
            .await
            .map_err(|e| AgentError::GatewayError(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::GatewayError(e.to_string()))?;
        let value = parse_rpc_body(&body)?;
        if let Some(err) = value.get("error") {
            return Err(AgentError::GatewayError(err.to_string()));
        }
        Ok(value.get("result").cloned().unwrap_or(Value::Null))
    }
}

/// 解析响应体：纯 JSON 或 SSE（取首个 data: 行）
fn parse_rpc_body(body: &str) -> Result<Value, AgentError> {
    let trimmed = body.trim();
    let json_text = if trimmed.starts_with('{') {
        trimmed
    } else {
        trimmed
            .lines()
            .find_map(|line| line.strip_prefix("data:").map(str::trim))
            .ok_or_else(|| AgentError::GatewayError(format!("unexpected body: {}", trimmed)))?
    };
    serde_json::from_str(json_text).map_err(|e| AgentError::GatewayError(e.to_string()))
}

#[async_trait::async_trait]
impl ToolGateway for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        let result = self.rpc("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                description: t
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                input_schema: t.get("inputSchema").cloned().unwrap_or(json!({})),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, params: Value) -> Result<ToolValue, AgentError> {
        let result = self
            .rpc("tools/call", json!({"name": name, "arguments": params}))
            .await?;

        if result
            .get("isError")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            let text = first_text_content(&result).unwrap_or_else(|| result.to_string());
            return Err(AgentError::ToolExecutionFailed(text));
        }

        if let Some(structured) = result.get("structuredContent") {
            if !structured.is_null() {
                return Ok(ToolValue::Structured(structured.clone()));
            }
        }
        if let Some(text) = first_text_content(&result) {
            return Ok(ToolValue::Text(text));
        }
        Ok(ToolValue::Empty)
    }
}

fn first_text_content(result: &Value) -> Option<String> {
    result
        .get("content")
        .and_then(|c| c.as_array())
        .and_then(|items| {
            items
                .iter()
                .find_map(|item| item.get("text").and_then(|t| t.as_str()))
        })
        .map(|s| s.to_string())
}
