//! 动作与保留控制动词
//!
//! LLM 计划中的每一项被映射为 Action；五个保留工具名承载循环控制语义
//! （submit_task / think_along / empty_action / error_llm / json_error_llm），
//! 用封闭的 ActionKind 枚举代替字符串比较，保留名永不路由到工具网关。

use serde_json::Value;

/// 动作类别：控制动词为封闭变体，普通工具调用为 Invoke(name)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionKind {
    /// 目标已达成，终止任务
    Submit,
    /// LLM 要求再推理一步，无工具副作用，不终止
    ThinkAlong,
    /// 解析不出可用决策，按任务结束处理（见 DESIGN.md：与 Submit 区分上报）
    Empty,
    /// LLM 传输层失败的哨兵，不终止
    OracleError,
    /// LLM 返回了无法解析的 JSON 的哨兵，不终止
    JsonError,
    /// 普通工具调用，按名路由到网关（或本地 retrieve_artifact）
    Invoke(String),
}

impl ActionKind {
    /// 从计划中的工具名解析类别
    pub fn from_tool_name(name: &str) -> Self {
        match name {
            "submit_task" => ActionKind::Submit,
            "think_along" => ActionKind::ThinkAlong,
            "empty_action" => ActionKind::Empty,
            "error_llm" => ActionKind::OracleError,
            "json_error_llm" => ActionKind::JsonError,
            other => ActionKind::Invoke(other.to_string()),
        }
    }

    /// 工具名（历史渲染与日志用）
    pub fn name(&self) -> &str {
        match self {
            ActionKind::Submit => "submit_task",
            ActionKind::ThinkAlong => "think_along",
            ActionKind::Empty => "empty_action",
            ActionKind::OracleError => "error_llm",
            ActionKind::JsonError => "json_error_llm",
            ActionKind::Invoke(name) => name,
        }
    }

    /// 是否为保留控制动词（永不发给网关）
    pub fn is_control(&self) -> bool {
        !matches!(self, ActionKind::Invoke(_))
    }

    /// 是否触发任务结束（Submit 与 Empty；ThinkAlong 与两类错误哨兵强制继续）
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionKind::Submit | ActionKind::Empty)
    }
}

/// 一次待执行的动作：工具类别 + 参数（构造后不可变）
#[derive(Clone, Debug)]
pub struct Action {
    pub kind: ActionKind,
    pub params: Value,
}

impl Action {
    pub fn new(tool_name: &str, params: Value) -> Self {
        Self {
            kind: ActionKind::from_tool_name(tool_name),
            params,
        }
    }

    /// 无参数动作（控制动词常用）
    pub fn bare(tool_name: &str) -> Self {
        Self::new(tool_name, Value::Object(serde_json::Map::new()))
    }

    pub fn tool_name(&self) -> &str {
        self.kind.name()
    }
}
