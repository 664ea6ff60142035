use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::{error::StoreError, task::Task};

/// Task storage as seen by views and the recurring-task service.
///
/// `update` runs the mutation against the committed task under the store's
/// own lock, so two quick edits to the same task never overwrite each other
/// with a stale copy.
pub trait TaskRepository: Send + Sync {
    fn get(&self, id: &str) -> Result<Task, StoreError>;
    fn list(&self) -> Vec<Task>;
    fn insert(&self, task: Task) -> Result<(), StoreError>;
    fn update(&self, id: &str, apply: &mut dyn FnMut(&mut Task)) -> Result<Task, StoreError>;
    /// Removes the task and its direct subtasks, returning how many were dropped.
    fn remove(&self, id: &str) -> Result<usize, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<BTreeMap<String, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let tasks = tasks
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect();
        Self {
            tasks: RwLock::new(tasks),
        }
    }

    /// Loads a JSON array of tasks, as written by the application's
    /// persistence layer.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading tasks from `{}`", path.display()))?;
        let tasks: Vec<Task> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing tasks from `{}`", path.display()))?;
        debug!(path = %path.display(), count = tasks.len(), "loaded tasks");
        Ok(Self::with_tasks(tasks))
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn get(&self, id: &str) -> Result<Task, StoreError> {
        self.tasks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))
    }

    fn list(&self) -> Vec<Task> {
        self.tasks.read().values().cloned().collect()
    }

    fn insert(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write();
        if tasks.contains_key(&task.id) {
            return Err(StoreError::DuplicateTask(task.id));
        }
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    #[instrument(skip(self, apply))]
    fn update(&self, id: &str, apply: &mut dyn FnMut(&mut Task)) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))?;
        apply(task);
        debug!("task updated");
        Ok(task.clone())
    }

    #[instrument(skip(self))]
    fn remove(&self, id: &str) -> Result<usize, StoreError> {
        let mut tasks = self.tasks.write();
        if !tasks.contains_key(id) {
            return Err(StoreError::TaskNotFound(id.to_string()));
        }
        let before = tasks.len();
        tasks.retain(|key, task| key != id && task.parent_id.as_deref() != Some(id));
        let removed = before - tasks.len();
        debug!(removed, "tasks removed");
        Ok(removed)
    }
}
