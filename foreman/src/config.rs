//! Engine configuration
//!
//! Defaults are sensible for a checkout rooted at the current directory;
//! every knob can be overridden from the environment.

use std::path::PathBuf;

/// Configuration for the scheduling and validation engine
#[derive(Debug, Clone)]
pub struct ForemanConfig {
    /// Workspace root containing the package directories
    pub root_dir: PathBuf,

    /// Directory of requirement JSON files
    pub requirements_dir: PathBuf,

    /// Continuation guard state file
    pub state_path: PathBuf,

    /// Wall-clock budget per gate, in seconds
    pub gate_timeout_secs: u64,

    /// Continuations allowed before the guard lets a stop through
    pub max_continuations: u32,

    /// Escape hatch: allow every stop without checking validation
    pub force_stop: bool,
}

impl Default for ForemanConfig {
    fn default() -> Self {
        Self {
            root_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            requirements_dir: PathBuf::from("requirements"),
            state_path: PathBuf::from(".foreman/guard-state.json"),
            gate_timeout_secs: 300,
            max_continuations: 5,
            force_stop: false,
        }
    }
}

impl ForemanConfig {
    /// Build a config from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("FOREMAN_ROOT") {
            config.root_dir = PathBuf::from(root);
        }
        if let Ok(dir) = std::env::var("FOREMAN_REQUIREMENTS_DIR") {
            config.requirements_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("FOREMAN_STATE_PATH") {
            config.state_path = PathBuf::from(path);
        }
        if let Ok(secs) = std::env::var("FOREMAN_GATE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.gate_timeout_secs = secs;
            }
        }
        if let Ok(max) = std::env::var("FOREMAN_MAX_CONTINUATIONS") {
            if let Ok(max) = max.parse() {
                config.max_continuations = max;
            }
        }
        if let Ok(val) = std::env::var("FOREMAN_FORCE_STOP") {
            config.force_stop = val.to_lowercase() == "true" || val == "1";
        }

        config.resolve_paths();
        config
    }

    /// Anchor relative paths at the workspace root.
    pub fn resolve_paths(&mut self) {
        if self.requirements_dir.is_relative() {
            self.requirements_dir = self.root_dir.join(&self.requirements_dir);
        }
        if self.state_path.is_relative() {
            self.state_path = self.root_dir.join(&self.state_path);
        }
    }
}
