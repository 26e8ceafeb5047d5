//! Task scheduling and validation gates for an autonomous coding loop
//!
//! foreman keeps the loop honest: it stores the work items, picks the
//! next eligible task, runs the package's validation gates as real
//! subprocesses, and refuses to let a session stop until the transcript
//! proves validation ran and passed.
//!
//! Components:
//! - `store`: JSON-file requirement store with forgiving loads and atomic saves
//! - `scheduler`: dependency-aware task selection and prompt rendering
//! - `gate`: build/test/lint subprocess execution with per-gate output classification
//! - `router`: file-path and category to package mapping
//! - `guard`: stop gatekeeper backed by transcript evidence
//! - `edit_lint`: advisory single-file lint after edits
//! - `command_policy`: approve/ask/block triage for proposed commands

#![allow(clippy::uninlined_format_args)]

pub mod command_policy;
pub mod config;
pub mod edit_lint;
pub mod gate;
pub mod guard;
pub mod router;
pub mod scheduler;
pub mod store;

// Re-export key store types
pub use store::{
    orphaned_tasks, RequirementFile, Task, TaskPriority, TaskRef, TaskStatus, TaskSummary,
};

// Re-export key scheduler types
pub use scheduler::{format_task_prompt, next_task, ScheduleError, TaskFilter};

// Re-export key gate types
pub use gate::{
    parse_custom_validations, GateOptions, GateResult, GateRunner, GateType, ValidationReport,
};

// Re-export key routing, policy, and guard types
pub use command_policy::{classify_command, CommandDecision};
pub use config::ForemanConfig;
pub use guard::{ContinuationGuard, StopDecision, StopRequest};
pub use router::{detect_packages_from_files, Package};
