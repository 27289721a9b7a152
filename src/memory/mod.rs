//! 记忆模型
//!
//! - **message**: 推理端点的 role 消息
//! - **observation**: 动作执行结果（追加式历史的元素）
//! - **context**: Memory + Context（scratchpad 与两级历史压缩）
//! - **state_update**: LLM 申报的可恢复扫描进度

mod context;
mod message;
mod observation;
mod state_update;

pub use context::{Context, Memory};
pub use message::{Message, Role};
pub use observation::Observation;
pub use state_update::StateUpdate;
