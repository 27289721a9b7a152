//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按脚本顺序吐出预置回复；脚本耗尽后返回 Err，恰好用于验证传输失败降级路径。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;

/// 脚本化 Mock 客户端；每次调用的完整提示词留档供断言
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: &str) {
        self.responses.lock().unwrap().push_back(response.to_string());
    }

    /// 按调用顺序返回收到过的提示词（各条消息以换行拼接）
    pub fn request_log(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.requests.lock().unwrap().push(prompt);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "mock responses exhausted".to_string())
    }
}
