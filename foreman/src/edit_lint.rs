//! Post-edit lint feedback
//!
//! After the agent edits a source file, a quick single-file oxlint run
//! surfaces fresh diagnostics while the edit is still in context. This is
//! advisory only: any problem running the linter yields None rather than
//! interrupting the loop.

use std::path::Path;
use std::time::Duration;

use crate::router::Package;

const LINTABLE_EXTENSIONS: [&str; 6] = ["ts", "tsx", "js", "jsx", "mjs", "cjs"];

const LINT_TIMEOUT: Duration = Duration::from_secs(10);

/// Diagnostics are for the agent's context window, so only the first few
/// lines are kept.
const MAX_DIAGNOSTIC_LINES: usize = 15;

/// Whether the file is something oxlint can check.
pub fn is_lintable(file_path: &str) -> bool {
    Path::new(file_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| LINTABLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// The package a file path belongs to, by directory name anywhere in the
/// path. Edits arrive with both absolute and repo-relative paths, so this
/// is looser than the first-segment routing used for gates.
fn detect_package(file_path: &str) -> Option<Package> {
    Package::ALL
        .into_iter()
        .find(|package| file_path.contains(&format!("{}/", package.dir_name())))
}

/// Lint one edited file and return diagnostics worth showing, if any.
///
/// Runs `npx oxlint` against the file from its package directory, picking
/// up the package's `.oxlintrc.json` when present. Timeouts, a missing
/// linter, and clean output all yield None.
pub async fn lint_edited_file(root_dir: &Path, file_path: &str) -> Option<String> {
    if !is_lintable(file_path) {
        return None;
    }

    let package = detect_package(file_path)?;
    let package_dir = root_dir.join(package.dir_name());
    if !package_dir.is_dir() {
        return None;
    }

    let path = Path::new(file_path);
    let target = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root_dir.join(path)
    };

    let mut cmd = tokio::process::Command::new("npx");
    cmd.arg("oxlint");
    if package_dir.join(".oxlintrc.json").is_file() {
        cmd.arg("--config").arg(".oxlintrc.json");
    }
    cmd.arg(&target).current_dir(&package_dir).kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    let output = tokio::time::timeout(LINT_TIMEOUT, cmd.output())
        .await
        .ok()?
        .ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    relevant_diagnostics(&format!("{stdout}{stderr}"))
}

/// Keep only lines worth the agent's attention: drop timing noise and the
/// all-clear tally, cap the rest.
fn relevant_diagnostics(output: &str) -> Option<String> {
    let output = output.trim();
    let lowered = output.to_lowercase();
    if !lowered.contains("warning") && !lowered.contains("error") {
        return None;
    }

    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("Finished in")
                && !line.contains("Found 0 warnings")
        })
        .take(MAX_DIAGNOSTIC_LINES)
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
