//! Work prompt rendering
//!
//! Formats the selected task as the markdown brief handed to the coding
//! agent. Output is deterministic for a given task so reruns produce
//! byte-identical prompts.

use crate::store::{RequirementFile, Task};

/// Render the work prompt for a task.
pub fn format_task_prompt(item: &Task, file: &RequirementFile) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("# Task: {}\n\n", item.title()));
    prompt.push_str(&format!(
        "**Category:** {} | **Priority:** {} | **ID:** {}\n\n",
        file.category(),
        item.priority,
        item.id
    ));

    prompt.push_str("## Description\n");
    prompt.push_str(&format!("{}\n\n", item.description));

    let criteria = item.done_criteria();
    if !criteria.is_empty() {
        prompt.push_str("## Acceptance Criteria\n");
        for criterion in criteria {
            prompt.push_str(&format!("- {}\n", criterion));
        }
        prompt.push('\n');
    }

    if let Some(notes) = &item.notes {
        prompt.push_str("## Notes\n");
        prompt.push_str(&format!("{}\n", notes));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskPriority;

    fn sample_file() -> RequirementFile {
        RequirementFile::new("auth.json")
    }

    #[test]
    fn test_prompt_has_header_and_metadata() {
        let task = Task::new("auth-1", "Add login flow").with_priority(TaskPriority::High);
        let prompt = format_task_prompt(&task, &sample_file());

        assert!(prompt.starts_with("# Task: Add login flow\n"));
        assert!(prompt.contains("**Category:** auth | **Priority:** high | **ID:** auth-1"));
        assert!(prompt.contains("## Description\nAdd login flow\n"));
    }

    #[test]
    fn test_prompt_lists_criteria_and_notes() {
        let task = Task::new("auth-1", "Add login flow")
            .with_criterion("login succeeds with valid credentials")
            .with_criterion("invalid password shows an error")
            .with_notes("VALIDATE: 'npm run test:auth'");
        let prompt = format_task_prompt(&task, &sample_file());

        assert!(prompt.contains("## Acceptance Criteria\n- login succeeds"));
        assert!(prompt.contains("- invalid password shows an error\n"));
        assert!(prompt.contains("## Notes\nVALIDATE: 'npm run test:auth'\n"));
    }

    #[test]
    fn test_prompt_skips_empty_sections() {
        let task = Task::new("auth-1", "Add login flow");
        let prompt = format_task_prompt(&task, &sample_file());

        assert!(!prompt.contains("## Acceptance Criteria"));
        assert!(!prompt.contains("## Notes"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let task = Task::new("auth-1", "Add login flow").with_step("one").with_step("two");
        let file = sample_file();
        assert_eq!(
            format_task_prompt(&task, &file),
            format_task_prompt(&task, &file)
        );
    }

    #[test]
    fn test_prompt_uses_steps_when_no_criteria() {
        let task = Task::new("auth-1", "Add login flow").with_step("write the form");
        let prompt = format_task_prompt(&task, &sample_file());
        assert!(prompt.contains("## Acceptance Criteria\n- write the form\n"));
    }
}
