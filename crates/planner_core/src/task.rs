use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{
    day::{DayFrame, Window},
    error::ConfigurationError,
    ledger::{CompletedDates, Toggle},
    occurrence::Recurrence,
    rule::RecurrenceRule,
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Done,
    NotDone,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub client_id: Option<String>,
    pub list_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completed_dates: CompletedDates,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        list_id: impl Into<String>,
        created_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            completed: false,
            priority: Priority::default(),
            status: TaskStatus::default(),
            due_date: None,
            created_at,
            client_id: None,
            list_id: list_id.into(),
            parent_id: None,
            recurrence: None,
            tags: Vec::new(),
            completed_dates: CompletedDates::new(),
        }
    }

    pub fn with_due_date(mut self, due: DateTime<FixedOffset>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// `Ok(None)` for one-off tasks. A recurring task without a due date has
    /// no phase reference and is reported as misconfigured.
    pub fn recurrence_in(&self, frame: DayFrame) -> Result<Option<Recurrence>, ConfigurationError> {
        let Some(rule) = &self.recurrence else {
            return Ok(None);
        };
        let anchor = self.due_date.ok_or(ConfigurationError::MissingAnchor)?;
        Recurrence::new(rule, &anchor, frame).map(Some)
    }

    /// Occurrences of a recurring task within `window`; empty for one-off tasks.
    pub fn occurrences(
        &self,
        frame: DayFrame,
        window: Window,
        max_count: Option<usize>,
    ) -> Result<Vec<DateTime<FixedOffset>>, ConfigurationError> {
        Ok(self
            .recurrence_in(frame)?
            .map(|recurrence| recurrence.between(window, max_count))
            .unwrap_or_default())
    }

    pub fn is_completed_on(&self, frame: &DayFrame, date: &DateTime<FixedOffset>) -> bool {
        self.completed_dates.contains(frame, date)
    }

    pub fn toggle_completed_on(&mut self, frame: &DayFrame, date: &DateTime<FixedOffset>) -> Toggle {
        let (updated, toggle) = self.completed_dates.toggled(frame, date);
        self.completed_dates = updated;
        toggle
    }

    /// Flips the task's own lifecycle, independent of per-occurrence completion.
    pub fn toggle_completion(&mut self) {
        self.completed = !self.completed;
        self.status = if self.completed {
            TaskStatus::Done
        } else {
            TaskStatus::Open
        };
    }
}
