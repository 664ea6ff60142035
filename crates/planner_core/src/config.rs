use std::path::PathBuf;

use tracing::{info, warn};

use crate::day::DayFrame;

/// Upper bound for `PLANNER_HORIZON_DAYS`, one hundred years.
pub const MAX_HORIZON_DAYS: u32 = 36_600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub tasks_path: Option<PathBuf>,
    pub frame: DayFrame,
    pub upcoming_count: usize,
    pub horizon_days: u32,
    pub agenda_span_days: u32,
}

impl PlannerConfig {
    /// Reads overrides from `PLANNER_*` variables; malformed values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("PLANNER_TASKS") {
            let path = PathBuf::from(path.trim());
            info!(path = %path.display(), "using task file");
            config.tasks_path = Some(path);
        }
        if let Some(offset) = lookup("PLANNER_UTC_OFFSET_MINUTES") {
            match offset.trim().parse::<i32>().ok().and_then(DayFrame::from_offset_minutes) {
                Some(frame) => config.frame = frame,
                None => warn!(%offset, "ignoring invalid UTC offset"),
            }
        }
        if let Some(count) = lookup("PLANNER_UPCOMING_COUNT") {
            if let Ok(value) = count.trim().parse::<usize>() {
                if value > 0 {
                    config.upcoming_count = value;
                }
            }
        }
        if let Some(horizon) = lookup("PLANNER_HORIZON_DAYS") {
            if let Ok(value) = horizon.trim().parse::<u32>() {
                if value > MAX_HORIZON_DAYS {
                    warn!(value, max = MAX_HORIZON_DAYS, "capping search horizon");
                }
                if value > 0 {
                    config.horizon_days = value.min(MAX_HORIZON_DAYS);
                }
            }
        }
        if let Some(span) = lookup("PLANNER_AGENDA_SPAN_DAYS") {
            if let Ok(value) = span.trim().parse::<u32>() {
                if value > 0 {
                    config.agenda_span_days = value;
                }
            }
        }
        config
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            tasks_path: None,
            frame: DayFrame::utc(),
            upcoming_count: 10,
            horizon_days: 366,
            agenda_span_days: 7,
        }
    }
}
