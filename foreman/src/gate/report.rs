//! Gate result and report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind of validation gate. Declaration order is run order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GateType {
    Build,
    Test,
    Lint,
    Custom,
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateType::Build => write!(f, "build"),
            GateType::Test => write!(f, "test"),
            GateType::Lint => write!(f, "lint"),
            GateType::Custom => write!(f, "custom"),
        }
    }
}

/// Outcome of one gate execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateResult {
    pub gate: GateType,
    pub package: String,
    pub passed: bool,

    /// Combined stdout and stderr of the command
    pub output: String,

    /// One-line diagnosis when the gate failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,

    pub duration_ms: u64,
}

/// Aggregated outcome of a validation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub timestamp: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub gates_passed: usize,
    pub gates_total: usize,
    pub all_green: bool,
    pub gates: Vec<GateResult>,

    /// `gate:package` of the first failing gate, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            total_duration_ms: 0,
            gates_passed: 0,
            gates_total: 0,
            all_green: false,
            gates: Vec::new(),
            first_failure: None,
        }
    }

    /// Record one gate result, updating counts and first failure.
    pub fn add_gate(&mut self, result: GateResult) {
        if result.passed {
            self.gates_passed += 1;
        } else if self.first_failure.is_none() {
            self.first_failure = Some(format!("{}:{}", result.gate, result.package));
        }
        self.gates_total += 1;
        self.gates.push(result);
    }

    /// Stamp the total duration and compute the overall verdict. A report
    /// with zero gates is never green.
    pub fn finalize(&mut self, total_duration: Duration) {
        self.total_duration_ms = total_duration.as_millis() as u64;
        self.all_green = self.gates_passed == self.gates_total && self.gates_total > 0;
    }

    /// One-line human summary, e.g.
    /// `[RED] 1/2 gates passed (834ms) [build:PASS → test:FAIL]`
    pub fn summary(&self) -> String {
        let statuses: Vec<String> = self
            .gates
            .iter()
            .map(|g| format!("{}:{}", g.gate, if g.passed { "PASS" } else { "FAIL" }))
            .collect();

        format!(
            "[{}] {}/{} gates passed ({}ms) [{}]",
            if self.all_green { "GREEN" } else { "RED" },
            self.gates_passed,
            self.gates_total,
            self.total_duration_ms,
            statuses.join(" → "),
        )
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing(gate: GateType) -> GateResult {
        GateResult {
            gate,
            package: "frontend".to_string(),
            passed: true,
            output: String::new(),
            error_summary: None,
            duration_ms: 10,
        }
    }

    fn failing(gate: GateType) -> GateResult {
        GateResult {
            gate,
            package: "frontend".to_string(),
            passed: false,
            output: String::new(),
            error_summary: Some("boom".to_string()),
            duration_ms: 10,
        }
    }

    #[test]
    fn test_all_green_requires_at_least_one_gate() {
        let mut report = ValidationReport::new();
        report.finalize(Duration::from_millis(5));
        assert!(!report.all_green);
    }

    #[test]
    fn test_first_failure_is_recorded_once() {
        let mut report = ValidationReport::new();
        report.add_gate(passing(GateType::Build));
        report.add_gate(failing(GateType::Test));
        report.add_gate(failing(GateType::Lint));
        report.finalize(Duration::from_millis(5));

        assert!(!report.all_green);
        assert_eq!(report.gates_passed, 1);
        assert_eq!(report.first_failure.as_deref(), Some("test:frontend"));
    }

    #[test]
    fn test_summary_shows_gate_statuses() {
        let mut report = ValidationReport::new();
        report.add_gate(passing(GateType::Build));
        report.add_gate(failing(GateType::Test));
        report.finalize(Duration::from_millis(834));

        let summary = report.summary();
        assert!(summary.starts_with("[RED] 1/2 gates passed"));
        assert!(summary.contains("build:PASS"));
        assert!(summary.contains("test:FAIL"));
    }

    #[test]
    fn test_all_passing_is_green() {
        let mut report = ValidationReport::new();
        report.add_gate(passing(GateType::Build));
        report.add_gate(passing(GateType::Test));
        report.finalize(Duration::from_millis(5));

        assert!(report.all_green);
        assert!(report.first_failure.is_none());
        assert!(report.summary().starts_with("[GREEN] 2/2"));
    }
}
