//! Requirement file persistence
//!
//! Each category of work lives in one JSON file shaped as
//! `{"items": [...], "metadata": {...}}`. Loading is deliberately
//! forgiving (a corrupt file is skipped, never fatal) while writes go
//! through a backup-then-rename path so a crash cannot leave a truncated
//! file behind.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;

use super::error::StoreResult;
use super::types::{DocumentMetadata, RequirementDocument, Task, TaskStatus};

/// A requirement file bound to its on-disk location.
///
/// The category name is derived from the filename stem, so
/// `requirements/auth.json` holds the `auth` category.
#[derive(Debug, Clone)]
pub struct RequirementFile {
    document: RequirementDocument,
    path: PathBuf,
    filename: String,
    category: String,
}

impl RequirementFile {
    /// Create an empty requirement file rooted at `path`. Nothing touches
    /// disk until `save`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut file = Self::with_document(path.as_ref(), RequirementDocument::default());
        file.document.metadata = Some(DocumentMetadata {
            created_at: Some(Utc::now()),
            ..Default::default()
        });
        file
    }

    fn with_document(path: &Path, document: RequirementDocument) -> Self {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let category = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();

        Self {
            document,
            path: path.to_path_buf(),
            filename,
            category,
        }
    }

    /// Load a requirement file, returning None when the file is missing,
    /// unreadable, or not valid JSON. Load failures never propagate;
    /// callers see the file as absent.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Requirement file not readable");
                return None;
            }
        };

        let document: RequirementDocument = match serde_json::from_str(&text) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unparseable requirement file");
                return None;
            }
        };

        Some(Self::with_document(path, document))
    }

    /// Load every `*.json` file directly under `dir`, sorted by filename.
    /// Subdirectories are not descended into. A missing directory or an
    /// unparseable file simply yields fewer results.
    pub fn load_directory(dir: impl AsRef<Path>) -> Vec<Self> {
        let dir = dir.as_ref();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => {
                tracing::debug!(dir = %dir.display(), "Requirement directory missing or unreadable");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json")
            })
            .collect();
        paths.sort();

        paths.iter().filter_map(|path| Self::load(path)).collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn items(&self) -> &[Task] {
        &self.document.items
    }

    pub fn metadata(&self) -> Option<&DocumentMetadata> {
        self.document.metadata.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.document.items.is_empty()
    }

    /// Append a task to the file.
    pub fn add(&mut self, task: Task) {
        self.document.items.push(task);
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.document.items.iter().find(|task| task.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.document.items.iter_mut().find(|task| task.id == id)
    }

    /// Set a task to `in_progress`. Returns false for unknown ids and for
    /// completed tasks, which never regress.
    pub fn mark_in_progress(&mut self, id: &str) -> bool {
        match self.find_mut(id) {
            Some(task) if task.status != TaskStatus::Completed => {
                task.status = TaskStatus::InProgress;
                true
            }
            _ => false,
        }
    }

    /// Complete a task, optionally attaching gate output. Returns false
    /// when the id is unknown.
    pub fn mark_complete(&mut self, id: &str, validation_results: Option<Value>) -> bool {
        match self.find_mut(id) {
            Some(task) => {
                task.complete(validation_results);
                true
            }
            None => false,
        }
    }

    /// Move an `in_progress` task back to `pending`. Any other state is
    /// left alone and reported as false.
    pub fn reset_status(&mut self, id: &str) -> bool {
        match self.find_mut(id) {
            Some(task) if task.status == TaskStatus::InProgress => {
                task.status = TaskStatus::Pending;
                true
            }
            _ => false,
        }
    }

    /// Write the file back to disk.
    ///
    /// The previous version is copied to a `.json.backup` sibling first,
    /// then the new content lands via temp-file rename. `metadata.updated_at`
    /// advances on every save and never moves backwards.
    pub fn save(&mut self) -> StoreResult<()> {
        self.document
            .metadata
            .get_or_insert_with(DocumentMetadata::default)
            .touch();

        if self.path.exists() {
            let backup = self.path.with_extension("json.backup");
            if let Err(e) = fs::copy(&self.path, &backup) {
                eprintln!("Warning: Failed to create backup: {}", e);
            }
        }

        write_document(&self.path, &self.document)
    }

    /// Remove a task, stamp it completed, rewrite the file, and optionally
    /// append the removed task to an archive file (created on first use).
    /// Unknown ids return Ok(None) without touching disk.
    pub fn pop_task(&mut self, id: &str, archive_to: Option<&Path>) -> StoreResult<Option<Task>> {
        let index = match self.document.items.iter().position(|task| task.id == id) {
            Some(index) => index,
            None => return Ok(None),
        };

        let mut task = self.document.items.remove(index);
        task.complete(None);
        self.save()?;

        if let Some(archive) = archive_to {
            append_to_archive(archive, task.clone())?;
        }

        tracing::info!(task_id = %task.id, category = %self.category, "Task popped");
        Ok(Some(task))
    }

    /// Check structural consistency without failing the load: duplicate
    /// ids, dependencies on unknown ids, and dependency cycles.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for task in &self.document.items {
            if !seen.insert(task.id.as_str()) {
                issues.push(format!("Duplicate task id: {}", task.id));
            }
        }

        let all_ids: HashSet<&str> = self
            .document
            .items
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        for task in &self.document.items {
            for dep in &task.dependencies {
                if !all_ids.contains(dep.as_str()) {
                    issues.push(format!("Task {} depends on unknown id: {}", task.id, dep));
                }
            }
        }

        for cycle in self.dependency_cycles(|_| true) {
            issues.push(format!("Dependency cycle: {}", cycle.join(" -> ")));
        }

        issues
    }

    /// Find dependency cycles among the tasks selected by `include`.
    /// Each cycle comes back as an id path with the starting node repeated
    /// at the end, e.g. `["a", "b", "a"]`.
    pub fn dependency_cycles<F>(&self, include: F) -> Vec<Vec<String>>
    where
        F: Fn(&Task) -> bool,
    {
        let mut nodes: HashMap<&str, &Task> = HashMap::new();
        for task in &self.document.items {
            if include(task) {
                nodes.insert(task.id.as_str(), task);
            }
        }

        fn dfs<'a>(
            id: &'a str,
            nodes: &HashMap<&'a str, &'a Task>,
            visited: &mut HashSet<&'a str>,
            in_stack: &mut HashSet<&'a str>,
            path: &mut Vec<&'a str>,
            cycles: &mut Vec<Vec<String>>,
        ) {
            visited.insert(id);
            in_stack.insert(id);
            path.push(id);

            if let Some(task) = nodes.get(id) {
                for dep in &task.dependencies {
                    let dep = dep.as_str();
                    if !nodes.contains_key(dep) {
                        continue;
                    }
                    if in_stack.contains(dep) {
                        let start = path.iter().position(|node| *node == dep).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|node| node.to_string()).collect();
                        cycle.push(dep.to_string());
                        cycles.push(cycle);
                    } else if !visited.contains(dep) {
                        dfs(dep, nodes, visited, in_stack, path, cycles);
                    }
                }
            }

            in_stack.remove(id);
            path.pop();
        }

        let mut visited = HashSet::new();
        let mut in_stack = HashSet::new();
        let mut path = Vec::new();
        let mut cycles = Vec::new();

        for task in &self.document.items {
            let id = task.id.as_str();
            if nodes.contains_key(id) && !visited.contains(id) {
                dfs(id, &nodes, &mut visited, &mut in_stack, &mut path, &mut cycles);
            }
        }

        cycles
    }
}

fn write_document(path: &Path, document: &RequirementDocument) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(document)?;
    let temp = path.with_extension("json.tmp");
    fs::write(&temp, json)?;
    fs::rename(&temp, path)?;
    Ok(())
}

fn append_to_archive(path: &Path, task: Task) -> StoreResult<()> {
    let mut document: RequirementDocument = if path.exists() {
        serde_json::from_str(&fs::read_to_string(path)?)?
    } else {
        RequirementDocument::default()
    };
    document.items.push(task);
    write_document(path, &document)
}

/// A task paired with the requirement file that owns it.
#[derive(Debug, Clone, Copy)]
pub struct TaskRef<'a> {
    pub item: &'a Task,
    pub file: &'a RequirementFile,
}

/// Tasks left `in_progress` across all loaded files.
///
/// These represent work abandoned mid-run. They are reported for operator
/// review, never auto-reset.
pub fn orphaned_tasks(files: &[RequirementFile]) -> Vec<TaskRef<'_>> {
    files
        .iter()
        .flat_map(|file| {
            file.items()
                .iter()
                .filter(|item| item.status == TaskStatus::InProgress)
                .map(move |item| TaskRef { item, file })
        })
        .collect()
}
