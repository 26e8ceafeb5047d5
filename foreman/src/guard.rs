//! Continuation guard
//!
//! Decides whether the coding agent may stop. A stop is only allowed once
//! the transcript shows every expected validation command ran and
//! succeeded, with a continuation budget so a stuck loop cannot spin
//! forever. Guard state persists across invocations in a small JSON file.

use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ForemanConfig;
use crate::gate::{command_for, configured_gates, GateType};
use crate::router::Package;

/// Failure and success scanning only looks at the tail of the transcript,
/// so stale errors from earlier continuations do not block forever.
const RECENT_LINES: usize = 100;

static EXPECTED_COMMANDS: LazyLock<Vec<(Package, GateType, Regex)>> = LazyLock::new(|| {
    let mut patterns = Vec::new();
    for package in Package::ALL {
        for gate in configured_gates(package) {
            if let Some(command) = command_for(gate, package) {
                let pattern = format!(
                    r"(?i)cd {}\s*&&\s*{}",
                    regex::escape(package.dir_name()),
                    regex::escape(command)
                );
                patterns.push((package, gate, Regex::new(&pattern).unwrap()));
            }
        }
    }
    patterns
});

static FAILURE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"FAIL\s+",
        r"error TS\d+",
        r"[1-9]\d* errors?\b",
        r"npm ERR!",
        r"Command failed",
        r"Build failed",
        r"Test failed",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});

static SUCCESS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"Build completed",
        r"All tests passed",
        r"✓.*tests? passed",
        r"Found \d+ warnings? and 0 errors",
        r"\b0 errors\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});

/// Result type alias for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors raised while persisting guard state
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Guard state persisted between stop attempts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuardState {
    pub continuation_count: u32,
    pub session_id: Option<String>,
}

/// A stop attempt to evaluate
#[derive(Debug, Clone, Default)]
pub struct StopRequest {
    /// Session the attempt belongs to; a changed session resets the count
    pub session_id: Option<String>,

    /// Set when a previous block already sent the agent back to work
    pub already_continuing: bool,

    /// Transcript content to scan for validation evidence
    pub transcript: Option<String>,
}

impl StopRequest {
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn continuing(mut self) -> Self {
        self.already_continuing = true;
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }
}

/// Whether a stop attempt is allowed through or sent back to work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopDecision {
    Allow { reason: String },
    Block { reason: String },
}

impl StopDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self::Allow {
            reason: reason.into(),
        }
    }

    fn block(reason: impl Into<String>) -> Self {
        Self::Block {
            reason: reason.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Allow { reason } | Self::Block { reason } => reason,
        }
    }
}

/// What the transcript shows about validation for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEvidence {
    pub ran: Vec<GateType>,
    pub missing: Vec<GateType>,
    pub has_failures: bool,
    pub has_success: bool,
}

impl ValidationEvidence {
    /// Scan a transcript for the package's expected commands and for
    /// failure or success markers in the recent output.
    pub fn scan(transcript: &str, package: Package) -> Self {
        let mut ran = Vec::new();
        let mut missing = Vec::new();

        for (expected_package, gate, pattern) in EXPECTED_COMMANDS.iter() {
            if *expected_package != package {
                continue;
            }
            if pattern.is_match(transcript) {
                ran.push(*gate);
            } else {
                missing.push(*gate);
            }
        }

        let lines: Vec<&str> = transcript.lines().collect();
        let start = lines.len().saturating_sub(RECENT_LINES);
        let recent = lines[start..].join("\n");

        let has_failures = FAILURE_PATTERNS.iter().any(|p| p.is_match(&recent));
        let has_success = SUCCESS_PATTERNS.iter().any(|p| p.is_match(&recent));

        Self {
            ran,
            missing,
            has_failures,
            has_success,
        }
    }

    /// Every expected command seen, no failure markers, and an explicit
    /// success marker present.
    pub fn passed(&self) -> bool {
        self.missing.is_empty() && !self.has_failures && self.has_success
    }
}

/// Gatekeeper for stop attempts.
pub struct ContinuationGuard {
    state_path: PathBuf,
    max_continuations: u32,
    force_stop: bool,
}

impl ContinuationGuard {
    pub fn new(config: &ForemanConfig) -> Self {
        Self {
            state_path: config.state_path.clone(),
            max_continuations: config.max_continuations,
            force_stop: config.force_stop,
        }
    }

    /// Current guard state. A missing or corrupt state file reads as
    /// fresh rather than erroring.
    pub fn state(&self) -> GuardState {
        match fs::read_to_string(&self.state_path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => GuardState::default(),
        }
    }

    fn save_state(&self, state: &GuardState) -> GuardResult<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.state_path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    /// Evaluate one stop attempt against the transcript evidence for
    /// `package`.
    pub fn evaluate(&self, request: &StopRequest, package: Package) -> GuardResult<StopDecision> {
        if self.force_stop {
            return Ok(StopDecision::allow("Force stop requested"));
        }

        if request.already_continuing {
            let mut state = self.state();
            state.continuation_count = 0;
            self.save_state(&state)?;
            return Ok(StopDecision::allow("Continuation already in progress"));
        }

        if configured_gates(package).is_empty() {
            return Ok(StopDecision::allow(format!(
                "No validation gates configured for {package}"
            )));
        }

        let mut state = self.state();
        if state.session_id != request.session_id {
            state = GuardState {
                continuation_count: 0,
                session_id: request.session_id.clone(),
            };
        }
        state.continuation_count += 1;
        self.save_state(&state)?;

        if state.continuation_count > self.max_continuations {
            tracing::warn!(
                max = self.max_continuations,
                "Continuation limit reached, allowing stop"
            );
            return Ok(StopDecision::allow(format!(
                "Max continuations ({}) reached",
                self.max_continuations
            )));
        }

        let Some(transcript) = request.transcript.as_deref() else {
            return Ok(StopDecision::allow("No transcript available to verify"));
        };

        let evidence = ValidationEvidence::scan(transcript, package);
        if evidence.passed() {
            state.continuation_count = 0;
            self.save_state(&state)?;
            return Ok(StopDecision::allow("Validation passed"));
        }

        let mut reason = if !evidence.missing.is_empty() {
            let names: Vec<String> = evidence.missing.iter().map(|g| g.to_string()).collect();
            format!(
                "Run validation before completing. Missing: {}. Commands: {}",
                names.join(", "),
                expected_command_line(package)
            )
        } else if evidence.has_failures {
            "Validation errors detected. Fix the errors and re-run validation commands.".to_string()
        } else {
            format!(
                "Validation commands ran but success not confirmed. Re-run: {}",
                expected_command_line(package)
            )
        };
        reason.push_str(&format!(
            " (Continuation {}/{})",
            state.continuation_count, self.max_continuations
        ));

        Ok(StopDecision::block(reason))
    }
}

/// The full command line the agent is told to run, e.g.
/// `cd frontend && npm run build && npm test && npm run lint`.
fn expected_command_line(package: Package) -> String {
    let mut parts = vec![format!("cd {}", package.dir_name())];
    for gate in configured_gates(package) {
        if let Some(command) = command_for(gate, package) {
            parts.push(command.to_string());
        }
    }
    parts.join(" && ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn guard_in(dir: &Path) -> ContinuationGuard {
        ContinuationGuard {
            state_path: dir.join("guard-state.json"),
            max_continuations: 5,
            force_stop: false,
        }
    }

    fn passing_transcript() -> String {
        "\
$ cd frontend && npm run build\n\
Build completed in 2.3s\n\
$ cd frontend && npm test\n\
All tests passed\n\
$ cd frontend && npm run lint\n\
Found 3 warnings and 0 errors\n"
            .to_string()
    }

    #[test]
    fn test_force_stop_allows() {
        let dir = tempdir().unwrap();
        let mut guard = guard_in(dir.path());
        guard.force_stop = true;

        let decision = guard
            .evaluate(&StopRequest::default(), Package::Frontend)
            .unwrap();
        assert!(decision.is_allow());
        assert_eq!(decision.reason(), "Force stop requested");
    }

    #[test]
    fn test_already_continuing_resets_count() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());
        guard
            .save_state(&GuardState {
                continuation_count: 3,
                session_id: None,
            })
            .unwrap();

        let decision = guard
            .evaluate(&StopRequest::default().continuing(), Package::Frontend)
            .unwrap();
        assert!(decision.is_allow());
        assert_eq!(guard.state().continuation_count, 0);
    }

    #[test]
    fn test_blocks_count_continuations() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());
        let request = StopRequest::default().with_transcript("nothing ran");

        let first = guard.evaluate(&request, Package::Frontend).unwrap();
        assert!(!first.is_allow());
        assert!(first.reason().ends_with("(Continuation 1/5)"), "{}", first.reason());

        let second = guard.evaluate(&request, Package::Frontend).unwrap();
        assert!(second.reason().ends_with("(Continuation 2/5)"), "{}", second.reason());
    }

    #[test]
    fn test_limit_reached_allows_stop() {
        let dir = tempdir().unwrap();
        let mut guard = guard_in(dir.path());
        guard.max_continuations = 2;
        let request = StopRequest::default().with_transcript("nothing ran");

        assert!(!guard.evaluate(&request, Package::Frontend).unwrap().is_allow());
        assert!(!guard.evaluate(&request, Package::Frontend).unwrap().is_allow());

        let third = guard.evaluate(&request, Package::Frontend).unwrap();
        assert!(third.is_allow());
        assert!(third.reason().contains("Max continuations (2) reached"));
    }

    #[test]
    fn test_missing_transcript_allows() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());

        let decision = guard
            .evaluate(&StopRequest::default(), Package::Frontend)
            .unwrap();
        assert!(decision.is_allow());
        assert_eq!(decision.reason(), "No transcript available to verify");
        // The attempt still counted.
        assert_eq!(guard.state().continuation_count, 1);
    }

    #[test]
    fn test_new_session_resets_count() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());
        let request_a = StopRequest::default()
            .with_session("session-a")
            .with_transcript("nothing ran");
        guard.evaluate(&request_a, Package::Frontend).unwrap();
        guard.evaluate(&request_a, Package::Frontend).unwrap();

        let request_b = StopRequest::default()
            .with_session("session-b")
            .with_transcript("nothing ran");
        let decision = guard.evaluate(&request_b, Package::Frontend).unwrap();
        assert!(decision.reason().ends_with("(Continuation 1/5)"), "{}", decision.reason());
    }

    #[test]
    fn test_block_reports_missing_commands() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());

        let request = StopRequest::default().with_transcript("hello");
        let decision = guard.evaluate(&request, Package::Frontend).unwrap();
        assert!(!decision.is_allow());
        assert!(decision.reason().contains("Missing: build, test, lint"));
        assert!(decision
            .reason()
            .contains("cd frontend && npm run build && npm test && npm run lint"));
    }

    #[test]
    fn test_failures_block_with_fix_message() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());

        let transcript = "\
$ cd frontend && npm run build\n\
$ cd frontend && npm test\n\
$ cd frontend && npm run lint\n\
npm ERR! code ELIFECYCLE\n";
        let request = StopRequest::default().with_transcript(transcript);
        let decision = guard.evaluate(&request, Package::Frontend).unwrap();
        assert!(!decision.is_allow());
        assert!(decision.reason().starts_with("Validation errors detected"));
    }

    #[test]
    fn test_success_not_confirmed_blocks() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());

        let transcript = "\
$ cd frontend && npm run build\n\
$ cd frontend && npm test\n\
$ cd frontend && npm run lint\n\
done\n";
        let request = StopRequest::default().with_transcript(transcript);
        let decision = guard.evaluate(&request, Package::Frontend).unwrap();
        assert!(!decision.is_allow());
        assert!(decision.reason().contains("success not confirmed"));
        assert!(decision.reason().contains("Re-run: cd frontend"));
    }

    #[test]
    fn test_validation_passed_allows_and_resets() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());
        guard
            .save_state(&GuardState {
                continuation_count: 3,
                session_id: None,
            })
            .unwrap();

        let request = StopRequest::default().with_transcript(passing_transcript());
        let decision = guard.evaluate(&request, Package::Frontend).unwrap();
        assert!(decision.is_allow());
        assert_eq!(decision.reason(), "Validation passed");
        assert_eq!(guard.state().continuation_count, 0);
    }

    #[test]
    fn test_package_without_gates_allows() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());

        let decision = guard
            .evaluate(&StopRequest::default(), Package::ChromeExtension)
            .unwrap();
        assert!(decision.is_allow());
        assert!(decision.reason().contains("No validation gates configured"));
    }

    #[test]
    fn test_corrupt_state_reads_as_fresh() {
        let dir = tempdir().unwrap();
        let guard = guard_in(dir.path());
        fs::write(&guard.state_path, "{ not json").unwrap();
        assert_eq!(guard.state(), GuardState::default());
    }

    #[test]
    fn test_evidence_zero_errors_counts_as_success() {
        let evidence =
            ValidationEvidence::scan("Found 12 warnings and 0 errors", Package::Frontend);
        assert!(!evidence.has_failures);
        assert!(evidence.has_success);
    }

    #[test]
    fn test_evidence_nonzero_errors_count_as_failure() {
        let evidence =
            ValidationEvidence::scan("Found 0 warnings and 5 errors.", Package::Frontend);
        assert!(evidence.has_failures);
        assert!(!evidence.has_success);
    }

    #[test]
    fn test_evidence_ignores_old_failures() {
        let mut lines = vec!["npm ERR! boom"];
        lines.extend(std::iter::repeat("ok").take(120));
        let transcript = lines.join("\n");

        let evidence = ValidationEvidence::scan(&transcript, Package::Frontend);
        assert!(!evidence.has_failures);
    }

    #[test]
    fn test_evidence_commands_are_case_insensitive() {
        let evidence =
            ValidationEvidence::scan("CD FRONTEND && NPM RUN BUILD", Package::Frontend);
        assert!(evidence.ran.contains(&GateType::Build));
        assert!(evidence.missing.contains(&GateType::Test));
    }

    #[test]
    fn test_mobile_expects_tsc_build() {
        let evidence = ValidationEvidence::scan("cd mobile && npx tsc", Package::Mobile);
        assert!(evidence.ran.contains(&GateType::Build));
        assert_eq!(evidence.missing, [GateType::Test]);
    }
}
