//! Wasp - 有界上下文的自主任务执行器
//!
//! 单任务的 ReAct 状态机：LLM 做决策，工具网关执行动作，观察折叠回
//! 压缩历史。大输出强制落入工件存储，按引用检索；跨任务经验写入
//! 长期记忆。
//!
//! 模块划分：
//! - core: 统一错误类型
//! - config: 分层配置加载
//! - memory: 任务上下文、观察历史与压缩渲染
//! - goal: pre-think 产出的压缩目标
//! - artifacts: 工件存储、体积门限策略与编号行工具
//! - gateway: 工具网关抽象与 MCP 客户端
//! - llm: LLM 客户端抽象与 OpenAI 实现
//! - thinking: 决策解析、降级哨兵与首尾思考
//! - rag: 长期记忆
//! - react: 动作、调度与任务循环
//! - observability: 日志初始化

pub mod artifacts;
pub mod config;
pub mod core;
pub mod gateway;
pub mod goal;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod rag;
pub mod react;
pub mod thinking;
