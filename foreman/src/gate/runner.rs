//! Gate execution
//!
//! Runs validation gate commands as real subprocesses: argv split up
//! front, package directory as cwd, `CI=true` in the environment, and a
//! hard wall-clock timeout. A gate run never errors out of the loop;
//! every failure mode folds into the returned `GateResult`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::classify::{classifier_for, GateVerdict};
use super::commands::{command_for, configured_gates};
use super::directives::ValidationDirective;
use super::report::{GateResult, GateType, ValidationReport};
use crate::config::ForemanConfig;
use crate::router::Package;

/// Per-invocation overrides for a gate run
#[derive(Debug, Clone, Default)]
pub struct GateOptions {
    /// Wall-clock budget; the runner default applies when unset
    pub timeout: Option<Duration>,

    /// Command to run instead of the configured table entry
    pub custom_command: Option<String>,
}

impl GateOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.custom_command = Some(command.into());
        self
    }
}

/// Executes validation gates for packages under a workspace root.
#[derive(Debug, Clone)]
pub struct GateRunner {
    root_dir: PathBuf,
    default_timeout: Duration,
}

impl GateRunner {
    /// Default wall-clock budget per gate.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            default_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(config: &ForemanConfig) -> Self {
        Self {
            root_dir: config.root_dir.clone(),
            default_timeout: Duration::from_secs(config.gate_timeout_secs),
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Run one gate against a package.
    ///
    /// A missing package directory or an unconfigured gate is a vacuous
    /// pass; anything that actually runs is judged by the gate's
    /// classifier.
    pub async fn run(&self, gate: GateType, package: &str, opts: &GateOptions) -> GateResult {
        let start = Instant::now();

        let package_dir = self.root_dir.join(package);
        if !package_dir.is_dir() {
            tracing::info!(gate = %gate, package, "Package not found, gate passes vacuously");
            return vacuous(
                gate,
                package,
                format!("Package not found: {}", package_dir.display()),
            );
        }

        let command = match &opts.custom_command {
            Some(command) => Some(command.clone()),
            None => package
                .parse::<Package>()
                .ok()
                .and_then(|p| command_for(gate, p))
                .map(str::to_string),
        };

        let command = match command {
            Some(command) => command,
            None => {
                tracing::info!(gate = %gate, package, "No command configured, gate passes vacuously");
                return vacuous(
                    gate,
                    package,
                    format!("No command configured for {gate} gate in {package}"),
                );
            }
        };

        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        self.execute(gate, package, &package_dir, &command, timeout, start)
            .await
    }

    /// Run every configured gate for a package, in order, and aggregate
    /// the results. Gates are not short-circuited; the report shows
    /// everything that is broken, not just the first failure.
    pub async fn run_package(&self, package: &str) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();

        let gates = package
            .parse::<Package>()
            .map(configured_gates)
            .unwrap_or_default();

        for gate in gates {
            let result = self.run(gate, package, &GateOptions::default()).await;
            report.add_gate(result);
        }

        report.finalize(start.elapsed());
        report
    }

    /// Run `VALIDATE:` directives from task notes as custom gates.
    pub async fn run_directives(&self, directives: &[ValidationDirective]) -> Vec<GateResult> {
        let mut results = Vec::with_capacity(directives.len());
        for directive in directives {
            let opts = GateOptions::default().with_command(directive.command.clone());
            results.push(self.run(GateType::Custom, &directive.package, &opts).await);
        }
        results
    }

    async fn execute(
        &self,
        gate: GateType,
        package: &str,
        package_dir: &Path,
        command_line: &str,
        timeout: Duration,
        start: Instant,
    ) -> GateResult {
        let argv = match shlex::split(command_line) {
            Some(argv) if !argv.is_empty() => argv,
            _ => {
                return failed(
                    gate,
                    package,
                    format!("Unparseable command: {command_line}"),
                    start,
                )
            }
        };

        tracing::debug!(gate = %gate, package, command = command_line, "Running gate");

        let mut cmd = tokio::process::Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .current_dir(package_dir)
            .env("CI", "true")
            .kill_on_drop(true);

        // New process group so a timeout kills npm's children, not just
        // npm itself.
        #[cfg(unix)]
        cmd.process_group(0);

        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let exit_code = output.status.code();
                let duration_ms = start.elapsed().as_millis() as u64;

                let verdict = classifier_for(gate).classify(&stdout, &stderr, exit_code);
                let output_text = combine_output(&stdout, &stderr);

                match verdict {
                    GateVerdict::Pass => GateResult {
                        gate,
                        package: package.to_string(),
                        passed: true,
                        output: output_text,
                        error_summary: None,
                        duration_ms,
                    },
                    GateVerdict::Fail { summary } => {
                        tracing::warn!(gate = %gate, package, summary = %summary, "Gate failed");
                        GateResult {
                            gate,
                            package: package.to_string(),
                            passed: false,
                            output: output_text,
                            error_summary: Some(summary),
                            duration_ms,
                        }
                    }
                }
            }
            Ok(Err(e)) => failed(gate, package, format!("Failed to execute: {e}"), start),
            Err(_) => {
                tracing::warn!(gate = %gate, package, timeout_secs = timeout.as_secs(), "Gate timed out");
                failed(
                    gate,
                    package,
                    format!("Timed out after {}s", timeout.as_secs()),
                    start,
                )
            }
        }
    }
}

fn vacuous(gate: GateType, package: &str, output: String) -> GateResult {
    GateResult {
        gate,
        package: package.to_string(),
        passed: true,
        output,
        error_summary: None,
        duration_ms: 0,
    }
}

fn failed(gate: GateType, package: &str, summary: String, start: Instant) -> GateResult {
    GateResult {
        gate,
        package: package.to_string(),
        passed: false,
        output: String::new(),
        error_summary: Some(summary),
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn combine_output(stdout: &str, stderr: &str) -> String {
    if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    }
}
