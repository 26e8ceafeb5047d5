//! Requirement store
//!
//! File-backed storage for the tasks driving the autonomous loop. One JSON
//! file per category; loads are forgiving, writes are atomic.

pub mod error;
pub mod repository;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use repository::{orphaned_tasks, RequirementFile, TaskRef};
pub use types::{
    CategorySummary, DocumentMetadata, RequirementDocument, Task, TaskPriority, TaskStatus,
    TaskSummary,
};
