//! ReAct 循环：动作映射、调度执行与任务状态机

mod action;
mod dispatch;
mod loop_;

pub use action::{Action, ActionKind};
pub use dispatch::{thought_to_actions, Dispatcher};
pub use loop_::{TaskOutcome, TaskReport, TaskRunner};
