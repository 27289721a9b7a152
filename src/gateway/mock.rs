//! Mock 工具网关（用于测试，无需服务器）
//!
//! 注册 (描述, 行为闭包)，list_tools 返回全部描述，call_tool 执行对应闭包。

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::core::AgentError;
use crate::gateway::{ToolDescriptor, ToolGateway, ToolValue};

type ToolBehavior = Box<dyn Fn(Value) -> Result<ToolValue, AgentError> + Send + Sync>;

/// Mock 网关：固定工具清单 + 可编程行为；记录全部调用供断言
#[derive(Default)]
pub struct MockGateway {
    descriptors: Vec<ToolDescriptor>,
    behaviors: HashMap<String, ToolBehavior>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个工具：最小 schema + 行为闭包
    pub fn with_tool(
        mut self,
        name: &str,
        description: &str,
        behavior: impl Fn(Value) -> Result<ToolValue, AgentError> + Send + Sync + 'static,
    ) -> Self {
        self.descriptors.push(ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: json!({"type": "object", "properties": {}, "required": []}),
        });
        self.behaviors.insert(name.to_string(), Box::new(behavior));
        self
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }
}

#[async_trait::async_trait]
impl ToolGateway for MockGateway {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        Ok(self.descriptors.clone())
    }

    async fn call_tool(&self, name: &str, params: Value) -> Result<ToolValue, AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), params.clone()));
        match self.behaviors.get(name) {
            Some(behavior) => behavior(params),
            None => Err(AgentError::ToolExecutionFailed(format!(
                "Unknown tool: {}",
                name
            ))),
        }
    }
}
