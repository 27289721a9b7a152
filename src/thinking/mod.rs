//! 思考层：LLM 响应解析与降级、每步 / 首尾思考

mod manager;
mod thought;

pub use manager::ThoughtManager;
pub use thought::{
    parse_thought, thought_format_schema_json, PlanStep, Thought, ThoughtPayload, ThoughtSource,
};
