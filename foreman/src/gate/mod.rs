//! Validation gates
//!
//! Build, test, and lint commands run as subprocesses against a package,
//! with per-gate output classification so a tool that lies with exit 0
//! still gets caught.

pub mod classify;
pub mod commands;
pub mod directives;
pub mod report;
pub mod runner;

pub use classify::{classifier_for, GateVerdict, OutputClassifier};
pub use commands::{command_for, configured_gates};
pub use directives::{parse_custom_validations, ValidationDirective};
pub use report::{GateResult, GateType, ValidationReport};
pub use runner::{GateOptions, GateRunner};
