//! Task selection
//!
//! Picks the next eligible task across the loaded requirement files.
//! Eligibility is strict: unfinished dependencies block, unknown
//! dependency ids block, and a cycle among unfinished tasks is refused
//! outright instead of being skipped over.

use std::collections::HashMap;

use super::error::{ScheduleError, ScheduleResult};
use crate::store::{RequirementFile, Task, TaskPriority, TaskRef};

/// Narrowing filter for task selection
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub category: Option<String>,
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Pick the next task to work on.
///
/// Scans files in load order and items in file order, keeping the first
/// eligible task of the highest priority seen. Ties go to the earlier
/// task, which keeps selection deterministic for a fixed set of files.
pub fn next_task<'a>(
    files: &'a [RequirementFile],
    filter: &TaskFilter,
) -> ScheduleResult<Option<TaskRef<'a>>> {
    let mut best: Option<TaskRef<'a>> = None;

    for file in files {
        if let Some(category) = &filter.category {
            if file.category() != category {
                continue;
            }
        }

        if let Some(cycle) = file
            .dependency_cycles(|task| !task.is_done())
            .into_iter()
            .next()
        {
            return Err(ScheduleError::dependency_cycle(file.category(), cycle));
        }

        let by_id: HashMap<&str, &Task> = file
            .items()
            .iter()
            .map(|task| (task.id.as_str(), task))
            .collect();

        for item in file.items() {
            if item.is_done() {
                continue;
            }
            if let Some(priority) = filter.priority {
                if item.priority != priority {
                    continue;
                }
            }
            if !dependencies_met(item, &by_id) {
                continue;
            }

            let outranks = match &best {
                Some(current) => item.priority > current.item.priority,
                None => true,
            };
            if outranks {
                best = Some(TaskRef { item, file });
            }
        }
    }

    Ok(best)
}

/// True when every dependency resolves to a finished task. Unknown ids
/// block the task rather than silently unblocking it.
fn dependencies_met(task: &Task, by_id: &HashMap<&str, &Task>) -> bool {
    task.dependencies.iter().all(|dep| {
        by_id
            .get(dep.as_str())
            .map(|dep_task| dep_task.is_done())
            .unwrap_or(false)
    })
}
