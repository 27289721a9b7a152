//! 核心类型：统一错误

mod error;

pub use error::AgentError;
