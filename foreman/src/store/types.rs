//! Task and document types shared across the requirement store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::repository::RequirementFile;

/// Priority level for a task. Ordering follows urgency, so
/// `High > Medium > Low` holds for comparisons.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
        }
    }
}

/// Lifecycle state of a task. Status only advances; `completed` is
/// terminal and only `reset_status` moves `in_progress` back to `pending`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A single unit of work stored in a requirement file.
///
/// Only `id` and `description` are required in the JSON; everything else
/// defaults so hand-written files stay terse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier within the file (e.g. "auth-1")
    pub id: String,

    /// What needs to be done
    pub description: String,

    /// Optional short display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub status: TaskStatus,

    /// Ids of tasks that must be done before this one is eligible
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Verification flag, orthogonal to `status`. `Some(true)` counts as
    /// done even when `status` says otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,

    /// Free-form notes; may carry `VALIDATE:` directives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Gate output recorded when the task was completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_results: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task with default priority.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            name: None,
            priority: TaskPriority::default(),
            status: TaskStatus::default(),
            dependencies: Vec::new(),
            passes: None,
            acceptance_criteria: Vec::new(),
            steps: Vec::new(),
            notes: None,
            validation_results: None,
            completed_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_passes(mut self, passes: bool) -> Self {
        self.passes = Some(passes);
        self
    }

    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn with_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.acceptance_criteria.push(criterion.into());
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Display title: `name` when present, else the description.
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.description)
    }

    /// Done-criteria list, preferring `acceptance_criteria` over `steps`.
    pub fn done_criteria(&self) -> &[String] {
        if self.acceptance_criteria.is_empty() {
            &self.steps
        } else {
            &self.acceptance_criteria
        }
    }

    /// Finished either by status or by the `passes` verification flag.
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Completed || self.passes == Some(true)
    }

    /// Stamp the task completed, optionally attaching gate output.
    pub fn complete(&mut self, validation_results: Option<Value>) {
        self.status = TaskStatus::Completed;
        self.passes = Some(true);
        self.completed_at = Some(Utc::now());
        if let Some(results) = validation_results {
            self.validation_results = Some(results);
        }
    }
}

/// Metadata block carried alongside the items in each requirement file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            version: default_version(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl DocumentMetadata {
    /// Advance `updated_at` to now, never moving it backwards.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = Some(match self.updated_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }
}

/// On-disk shape of a requirement file: `{"items": [...], "metadata": {...}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequirementDocument {
    #[serde(default)]
    pub items: Vec<Task>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

/// Per-category status counts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// Aggregated progress across every loaded requirement file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub completion_percent: f32,
    pub by_category: BTreeMap<String, CategorySummary>,
}

impl TaskSummary {
    /// Tally status counts per category and overall.
    pub fn from_files(files: &[RequirementFile]) -> Self {
        let mut summary = Self::default();

        for file in files {
            let category = summary
                .by_category
                .entry(file.category().to_string())
                .or_default();

            for task in file.items() {
                summary.total += 1;
                category.total += 1;
                match task.status {
                    TaskStatus::Pending => {
                        summary.pending += 1;
                        category.pending += 1;
                    }
                    TaskStatus::InProgress => {
                        summary.in_progress += 1;
                        category.in_progress += 1;
                    }
                    TaskStatus::Completed => {
                        summary.completed += 1;
                        category.completed += 1;
                    }
                }
            }
        }

        summary.completion_percent = if summary.total > 0 {
            (summary.completed as f32 / summary.total as f32) * 100.0
        } else {
            0.0
        };

        summary
    }
}
