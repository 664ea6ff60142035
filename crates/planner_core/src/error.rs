use thiserror::Error;

/// A recurrence rule (or its anchor) that cannot produce occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("recurrence interval must be at least 1, got {0}")]
    NonPositiveInterval(i64),
    #[error("recurring task has no due date to anchor its pattern")]
    MissingAnchor,
    #[error("weekday index {0} is outside 0..=6")]
    WeekdayOutOfRange(u8),
    #[error("day of month {0} is outside 1..=31")]
    DayOfMonthOutOfRange(u32),
    #[error("month of year {0} is outside 1..=12")]
    MonthOutOfRange(u32),
    #[error("day {day} never occurs in month {month}")]
    DayOutOfRangeForMonth { month: u32, day: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("task `{0}` not found")]
    TaskNotFound(String),
    #[error("task `{0}` already exists")]
    DuplicateTask(String),
}
