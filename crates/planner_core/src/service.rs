use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::PlannerConfig,
    day::{DayFrame, Window},
    error::ConfigurationError,
    ledger::Toggle,
    occurrence::Recurrence,
    store::{InMemoryTaskRepository, TaskRepository},
    task::Task,
};

/// One occurrence of a recurring task, with its checkbox state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaEntry {
    pub task_id: String,
    pub title: String,
    pub occurrence: DateTime<FixedOffset>,
    pub completed: bool,
    pub pattern: String,
}

impl PartialEq for AgendaEntry {
    fn eq(&self, other: &Self) -> bool {
        self.task_id == other.task_id && self.occurrence == other.occurrence
    }
}

impl Eq for AgendaEntry {}

impl PartialOrd for AgendaEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AgendaEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.occurrence
            .cmp(&other.occurrence)
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.task_id.cmp(&other.task_id))
    }
}

/// A recurring task whose rule cannot be expanded. Views list these instead
/// of dropping the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedTask {
    pub task_id: String,
    pub title: String,
    pub error: ConfigurationError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurringOverview {
    pub entries: Vec<AgendaEntry>,
    pub flagged: Vec<FlaggedTask>,
}

impl RecurringOverview {
    pub fn entries_on(&self, frame: &DayFrame, day: NaiveDate) -> impl Iterator<Item = &AgendaEntry> {
        let frame = *frame;
        self.entries
            .iter()
            .filter(move |entry| frame.day_of(&entry.occurrence) == day)
    }
}

pub struct RecurringTaskService {
    repository: Arc<dyn TaskRepository>,
    frame: DayFrame,
    upcoming_count: usize,
    horizon_days: u32,
}

pub struct RecurringTaskServiceBuilder {
    repository: Option<Arc<dyn TaskRepository>>,
    config: PlannerConfig,
}

impl RecurringTaskServiceBuilder {
    pub fn new() -> Self {
        Self {
            repository: None,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn TaskRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_frame(mut self, frame: DayFrame) -> Self {
        self.config.frame = frame;
        self
    }

    /// Without an explicit repository, tasks are loaded from the configured
    /// task file, or the service starts empty.
    pub fn build(self) -> Result<RecurringTaskService> {
        let repository: Arc<dyn TaskRepository> = match (self.repository, &self.config.tasks_path) {
            (Some(repository), _) => repository,
            (None, Some(path)) => Arc::new(InMemoryTaskRepository::from_json_file(path)?),
            (None, None) => Arc::new(InMemoryTaskRepository::new()),
        };
        info!(
            offset_seconds = self.config.frame.offset().local_minus_utc(),
            "recurring task service ready"
        );
        Ok(RecurringTaskService {
            repository,
            frame: self.config.frame,
            upcoming_count: self.config.upcoming_count,
            horizon_days: self.config.horizon_days,
        })
    }
}

impl Default for RecurringTaskServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecurringTaskService {
    pub fn builder() -> RecurringTaskServiceBuilder {
        RecurringTaskServiceBuilder::new()
    }

    pub fn frame(&self) -> DayFrame {
        self.frame
    }

    pub fn repository(&self) -> &Arc<dyn TaskRepository> {
        &self.repository
    }

    pub fn recurring_tasks(&self) -> Vec<Task> {
        self.repository
            .list()
            .into_iter()
            .filter(Task::is_recurring)
            .collect()
    }

    pub fn occurrences(&self, task_id: &str, window: Window) -> Result<Vec<DateTime<FixedOffset>>> {
        let recurrence = self.recurrence_for(task_id)?;
        Ok(recurrence.between(window, None))
    }

    /// The next configured number of occurrences on or after `from`.
    pub fn upcoming(&self, task_id: &str, from: NaiveDate) -> Result<Vec<DateTime<FixedOffset>>> {
        let recurrence = self.recurrence_for(task_id)?;
        Ok(recurrence.between(
            Window::days(from, self.horizon_days),
            Some(self.upcoming_count),
        ))
    }

    pub fn is_occurrence_completed(&self, task_id: &str, date: &DateTime<FixedOffset>) -> Result<bool> {
        let task = self.repository.get(task_id)?;
        Ok(task.is_completed_on(&self.frame, date))
    }

    /// Flips the completion of the occurrence on `date`'s day and stores the
    /// new ledger on the task.
    #[instrument(skip(self))]
    pub fn toggle_occurrence(&self, task_id: &str, date: &DateTime<FixedOffset>) -> Result<Toggle> {
        let frame = self.frame;
        let mut outcome = Toggle::Completed;
        self.repository
            .update(task_id, &mut |task: &mut Task| {
                outcome = task.toggle_completed_on(&frame, date);
            })
            .with_context(|| format!("toggling occurrence of `{task_id}`"))?;
        debug!(?outcome, "occurrence toggled");
        Ok(outcome)
    }

    /// Recurring tasks falling due on `day`. Misconfigured tasks are skipped
    /// here; [`Self::overview`] reports them.
    pub fn tasks_due_on(&self, day: NaiveDate) -> Vec<Task> {
        self.recurring_tasks()
            .into_iter()
            .filter(|task| match task.recurrence_in(self.frame) {
                Ok(Some(recurrence)) => recurrence.is_due(day),
                Ok(None) | Err(_) => false,
            })
            .collect()
    }

    #[instrument(skip(self))]
    pub fn overview(&self, window: Window) -> RecurringOverview {
        let mut overview = RecurringOverview::default();
        for task in self.recurring_tasks() {
            let recurrence = match task.recurrence_in(self.frame) {
                Ok(Some(recurrence)) => recurrence,
                Ok(None) => continue,
                Err(error) => {
                    warn!(task_id = %task.id, %error, "recurring task flagged");
                    overview.flagged.push(FlaggedTask {
                        task_id: task.id.clone(),
                        title: task.title.clone(),
                        error,
                    });
                    continue;
                }
            };
            let pattern = task
                .recurrence
                .as_ref()
                .map(|rule| rule.describe())
                .unwrap_or_default();
            for occurrence in recurrence.between(window, None) {
                overview.entries.push(AgendaEntry {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                    completed: task.is_completed_on(&self.frame, &occurrence),
                    occurrence,
                    pattern: pattern.clone(),
                });
            }
        }
        overview.entries.sort();
        overview.flagged.sort_by(|a, b| a.title.cmp(&b.title));
        debug!(
            entries = overview.entries.len(),
            flagged = overview.flagged.len(),
            "overview built"
        );
        overview
    }

    pub fn stale_completions(&self, task_id: &str) -> Result<Vec<DateTime<FixedOffset>>> {
        let task = self.repository.get(task_id)?;
        let recurrence = self.recurrence_of(&task)?;
        Ok(task.completed_dates.stale_entries(&recurrence))
    }

    /// Explicit cleanup of ledger entries that no longer match the rule.
    /// Returns how many entries were removed.
    #[instrument(skip(self))]
    pub fn prune_stale_completions(&self, task_id: &str) -> Result<usize> {
        let frame = self.frame;
        let mut pruned = 0;
        let mut failure: Option<ConfigurationError> = None;
        self.repository.update(task_id, &mut |task: &mut Task| {
            match task.recurrence_in(frame) {
                Ok(Some(recurrence)) => {
                    let kept = task.completed_dates.without_stale(&recurrence);
                    pruned = task.completed_dates.len() - kept.len();
                    task.completed_dates = kept;
                }
                Ok(None) => {}
                Err(error) => failure = Some(error),
            }
        })?;
        if let Some(error) = failure {
            return Err(error).with_context(|| format!("pruning completions of `{task_id}`"));
        }
        debug!(pruned, "stale completions pruned");
        Ok(pruned)
    }

    fn recurrence_for(&self, task_id: &str) -> Result<Recurrence> {
        let task = self.repository.get(task_id)?;
        self.recurrence_of(&task)
    }

    fn recurrence_of(&self, task: &Task) -> Result<Recurrence> {
        task.recurrence_in(self.frame)
            .with_context(|| format!("expanding recurrence of `{}`", task.id))?
            .with_context(|| format!("task `{}` does not recur", task.id))
    }
}
