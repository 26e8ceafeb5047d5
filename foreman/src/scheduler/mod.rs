//! Task scheduling
//!
//! Selects the next eligible task from the requirement store and renders
//! the work prompt handed to the coding agent.

pub mod error;
pub mod picker;
pub mod prompt;

pub use error::{ScheduleError, ScheduleResult};
pub use picker::{next_task, TaskFilter};
pub use prompt::format_task_prompt;
