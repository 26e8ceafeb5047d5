//! Error types for task scheduling

use thiserror::Error;

/// Result type alias for scheduling operations
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors that make a requirement file unschedulable
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Unfinished tasks depend on each other in a loop. This is a
    /// configuration error in the requirement file; scheduling refuses to
    /// proceed rather than silently skipping the tangled tasks.
    #[error("Dependency cycle in {category}: {}", .path.join(" -> "))]
    DependencyCycle { category: String, path: Vec<String> },
}

impl ScheduleError {
    pub fn dependency_cycle(category: impl Into<String>, path: Vec<String>) -> Self {
        Self::DependencyCycle {
            category: category.into(),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_names_the_path() {
        let err = ScheduleError::dependency_cycle(
            "auth",
            vec!["a".to_string(), "b".to_string(), "a".to_string()],
        );
        assert_eq!(err.to_string(), "Dependency cycle in auth: a -> b -> a");
    }
}
