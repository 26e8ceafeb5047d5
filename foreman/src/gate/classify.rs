//! Gate output classification
//!
//! npm scripts routinely exit 0 while printing failures, so the exit code
//! alone cannot be trusted. Each gate type gets its own classifier that
//! scans the captured output for the tool's failure shapes.

use regex::Regex;
use std::sync::LazyLock;

use super::report::GateType;

static TS_DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"error TS\d+").unwrap());

static LINT_ERROR_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Found (?:\d+ warnings? and )?(\d+) errors?").unwrap());

static TEST_FAIL_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*FAIL\b").unwrap());

static TEST_FAIL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+(?:tests?\s+)?failed").unwrap());

/// Verdict from classifying one gate's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Pass,
    Fail { summary: String },
}

impl GateVerdict {
    pub fn fail(summary: impl Into<String>) -> Self {
        Self::Fail {
            summary: summary.into(),
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Per-gate inspection of process output beyond the exit code.
///
/// One classifier is registered per gate type; adding a gate means adding
/// a classifier, not editing the runner.
pub trait OutputClassifier: Send + Sync {
    fn classify(&self, stdout: &str, stderr: &str, exit_code: Option<i32>) -> GateVerdict;
}

/// The classifier registered for a gate type.
pub fn classifier_for(gate: GateType) -> &'static dyn OutputClassifier {
    match gate {
        GateType::Build => &BuildClassifier,
        GateType::Test => &TestClassifier,
        GateType::Lint => &LintClassifier,
        GateType::Custom => &ExitCodeClassifier,
    }
}

/// Build gate: exit code first, then `error TSxxxx` diagnostics that tsc
/// emits even on exit 0 under some npm wrappers.
struct BuildClassifier;

impl OutputClassifier for BuildClassifier {
    fn classify(&self, stdout: &str, stderr: &str, exit_code: Option<i32>) -> GateVerdict {
        if exit_code != Some(0) {
            return GateVerdict::fail(summarize_failure(stdout, stderr));
        }
        for text in [stderr, stdout] {
            if let Some(line) = text.lines().find(|line| TS_DIAGNOSTIC.is_match(line)) {
                return GateVerdict::fail(line.trim());
            }
        }
        GateVerdict::Pass
    }
}

/// Test gate: exit code first, then `FAIL` suite markers and
/// `N tests failed` tallies.
struct TestClassifier;

impl OutputClassifier for TestClassifier {
    fn classify(&self, stdout: &str, stderr: &str, exit_code: Option<i32>) -> GateVerdict {
        if exit_code != Some(0) {
            return GateVerdict::fail(summarize_failure(stdout, stderr));
        }
        for text in [stdout, stderr] {
            if let Some(found) = TEST_FAIL_MARKER.find(text) {
                let line = text[found.start()..].lines().next().unwrap_or("FAIL").trim();
                return GateVerdict::fail(line);
            }
            for caps in TEST_FAIL_COUNT.captures_iter(text) {
                let failed: usize = caps[1].parse().unwrap_or(0);
                if failed > 0 {
                    return GateVerdict::fail(&caps[0]);
                }
            }
        }
        GateVerdict::Pass
    }
}

/// Lint gate: oxlint exits 0 even with errors, so the verdict comes from
/// the `Found N warnings and M errors` tally line.
struct LintClassifier;

impl OutputClassifier for LintClassifier {
    fn classify(&self, stdout: &str, stderr: &str, exit_code: Option<i32>) -> GateVerdict {
        if exit_code != Some(0) {
            return GateVerdict::fail(summarize_failure(stdout, stderr));
        }
        for text in [stdout, stderr] {
            for line in text.lines() {
                if let Some(caps) = LINT_ERROR_COUNT.captures(line) {
                    let errors: usize = caps[1].parse().unwrap_or(0);
                    if errors > 0 {
                        return GateVerdict::fail(line.trim());
                    }
                }
            }
        }
        GateVerdict::Pass
    }
}

/// Custom gate: nothing is known about the tool, so the exit code is the
/// whole verdict.
struct ExitCodeClassifier;

impl OutputClassifier for ExitCodeClassifier {
    fn classify(&self, stdout: &str, stderr: &str, exit_code: Option<i32>) -> GateVerdict {
        if exit_code == Some(0) {
            GateVerdict::Pass
        } else {
            GateVerdict::fail(summarize_failure(stdout, stderr))
        }
    }
}

/// Best-effort one-line diagnosis, preferring compiler-style `error TSxxxx`
/// lines over whatever meaningful line comes first. stderr wins over
/// stdout.
fn summarize_failure(stdout: &str, stderr: &str) -> String {
    for text in [stderr, stdout] {
        if let Some(line) = text.lines().find(|line| TS_DIAGNOSTIC.is_match(line)) {
            return line.trim().to_string();
        }
    }

    for text in [stderr, stdout] {
        if let Some(line) = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('>'))
        {
            return line.to_string();
        }
    }

    "Command failed".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(gate: GateType, stdout: &str, stderr: &str, exit_code: i32) -> GateVerdict {
        classifier_for(gate).classify(stdout, stderr, Some(exit_code))
    }

    #[test]
    fn test_build_passes_on_clean_exit() {
        assert!(classify(GateType::Build, "built in 2.3s", "", 0).passed());
    }

    #[test]
    fn test_build_nonzero_exit_prefers_ts_diagnostic() {
        let stderr = "npm warn old lockfile\nsrc/app.ts(3,1): error TS2304: Cannot find name 'foo'.";
        let verdict = classify(GateType::Build, "", stderr, 2);
        assert_eq!(
            verdict,
            GateVerdict::fail("src/app.ts(3,1): error TS2304: Cannot find name 'foo'.")
        );
    }

    #[test]
    fn test_build_ts_diagnostic_on_exit_zero_fails() {
        let stdout = "> app@1.0.0 build\nsrc/app.ts(3,1): error TS2304: Cannot find name 'foo'.";
        let verdict = classify(GateType::Build, stdout, "", 0);
        assert!(!verdict.passed());
    }

    #[test]
    fn test_lint_error_count_on_exit_zero_fails() {
        let stdout = "Found 0 warnings and 5 errors.";
        let verdict = classify(GateType::Lint, stdout, "", 0);
        assert_eq!(verdict, GateVerdict::fail("Found 0 warnings and 5 errors."));
    }

    #[test]
    fn test_lint_zero_errors_passes() {
        let stdout = "Found 12 warnings and 0 errors.\nFinished in 80ms";
        assert!(classify(GateType::Lint, stdout, "", 0).passed());
    }

    #[test]
    fn test_lint_bare_error_count_fails() {
        assert!(!classify(GateType::Lint, "Found 3 errors.", "", 0).passed());
    }

    #[test]
    fn test_test_fail_marker_on_exit_zero_fails() {
        let stdout = "PASS src/a.test.ts\n FAIL src/b.test.ts\n2 passed, 1 failed";
        let verdict = classify(GateType::Test, stdout, "", 0);
        assert_eq!(verdict, GateVerdict::fail("FAIL src/b.test.ts"));
    }

    #[test]
    fn test_test_failed_count_fails() {
        let verdict = classify(GateType::Test, "Tests: 2 failed, 10 passed", "", 0);
        assert_eq!(verdict, GateVerdict::fail("2 failed"));
    }

    #[test]
    fn test_test_zero_failed_passes() {
        assert!(classify(GateType::Test, "Tests: 0 failed, 12 passed", "", 0).passed());
    }

    #[test]
    fn test_test_failure_word_in_prose_passes() {
        // "failed" without a count is not a failure tally.
        assert!(classify(GateType::Test, "retries failed requests", "", 0).passed());
    }

    #[test]
    fn test_custom_gate_trusts_exit_code() {
        assert!(classify(GateType::Custom, "FAIL everything", "", 0).passed());
        assert!(!classify(GateType::Custom, "", "no such file", 1).passed());
    }

    #[test]
    fn test_summary_skips_npm_script_banner() {
        let stdout = "> app@1.0.0 test\n> vitest run\n\nsegfault";
        assert_eq!(summarize_failure(stdout, ""), "segfault");
    }

    #[test]
    fn test_summary_falls_back_to_command_failed() {
        assert_eq!(summarize_failure("", ""), "Command failed");
    }

    #[test]
    fn test_missing_exit_code_counts_as_failure() {
        let verdict = classifier_for(GateType::Test).classify("killed", "", None);
        assert!(!verdict.passed());
    }
}
