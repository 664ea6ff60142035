use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use planner_core::{
    config::PlannerConfig,
    ledger::Toggle,
    store::{InMemoryTaskRepository, TaskRepository},
    task::Task,
    ConfigurationError, DayFrame, RecurrenceRule, RecurringTaskService, Window,
};
use tempfile::tempdir;

fn write_file(path: &PathBuf, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write fixture");
}

fn ts(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).expect("valid timestamp")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

const TASKS: &str = r#"[
  {
    "id": "task-standup",
    "title": "Standup notes",
    "dueDate": "2024-01-01T09:30:00.000Z",
    "createdAt": "2023-12-01T08:00:00.000Z",
    "listId": "list-work",
    "recurrence": {"frequency": "weekly", "interval": 1, "endDate": null, "daysOfWeek": [1, 3, 5]},
    "completedDates": ["2024-01-03T00:00:00.000Z"]
  },
  {
    "id": "task-rent",
    "title": "Pay rent",
    "dueDate": "2024-01-31T12:00:00.000Z",
    "createdAt": "2023-12-01T08:00:00.000Z",
    "listId": "list-home",
    "recurrence": {"frequency": "monthly", "interval": 1, "endDate": null, "dayOfMonth": 31}
  },
  {
    "id": "task-broken",
    "title": "Broken rule",
    "dueDate": "2024-01-01T00:00:00.000Z",
    "createdAt": "2023-12-01T08:00:00.000Z",
    "listId": "list-home",
    "recurrence": {"frequency": "daily", "interval": 0, "endDate": null}
  },
  {
    "id": "task-undated",
    "title": "Undated habit",
    "dueDate": null,
    "createdAt": "2023-12-01T08:00:00.000Z",
    "listId": "list-home",
    "recurrence": {"frequency": "daily", "interval": 1, "endDate": null}
  },
  {
    "id": "task-once",
    "title": "One-off",
    "dueDate": "2024-01-02T00:00:00.000Z",
    "createdAt": "2023-12-01T08:00:00.000Z",
    "listId": "list-home"
  }
]"#;

fn service_from_file() -> RecurringTaskService {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("state").join("tasks.json");
    write_file(&path, TASKS);

    let config = PlannerConfig {
        tasks_path: Some(path),
        ..PlannerConfig::default()
    };
    RecurringTaskService::builder()
        .with_config(config)
        .build()
        .expect("build service")
}

#[test]
fn overview_lists_occurrences_and_flags_misconfigured_rules() {
    let service = service_from_file();
    let overview = service.overview(Window::new(date(2024, 1, 1), date(2024, 1, 7)));

    let standup: Vec<(NaiveDate, bool)> = overview
        .entries
        .iter()
        .filter(|entry| entry.task_id == "task-standup")
        .map(|entry| (entry.occurrence.date_naive(), entry.completed))
        .collect();
    assert_eq!(
        standup,
        vec![
            (date(2024, 1, 1), false),
            (date(2024, 1, 3), true),
            (date(2024, 1, 5), false)
        ]
    );
    assert!(overview
        .entries
        .iter()
        .all(|entry| entry.pattern == "Every 1 week (Monday, Wednesday, Friday)"));

    let flagged: Vec<(&str, &ConfigurationError)> = overview
        .flagged
        .iter()
        .map(|flag| (flag.task_id.as_str(), &flag.error))
        .collect();
    assert_eq!(
        flagged,
        vec![
            ("task-broken", &ConfigurationError::NonPositiveInterval(0)),
            ("task-undated", &ConfigurationError::MissingAnchor)
        ]
    );
}

#[test]
fn toggling_an_occurrence_persists_through_the_repository() {
    let service = service_from_file();
    let friday = ts("2024-01-05T09:30:00Z");

    assert!(!service
        .is_occurrence_completed("task-standup", &friday)
        .unwrap());
    assert_eq!(
        service.toggle_occurrence("task-standup", &friday).unwrap(),
        Toggle::Completed
    );
    assert!(service
        .is_occurrence_completed("task-standup", &ts("2024-01-05T18:00:00Z"))
        .unwrap());

    assert_eq!(
        service.toggle_occurrence("task-standup", &friday).unwrap(),
        Toggle::Reopened
    );
    assert!(!service
        .is_occurrence_completed("task-standup", &friday)
        .unwrap());

    let stored = service.repository().get("task-standup").unwrap();
    assert_eq!(stored.completed_dates.len(), 1);
    assert!(!stored.completed);
}

#[test]
fn rapid_toggles_on_different_days_are_all_kept() {
    let repository: Arc<dyn TaskRepository> = Arc::new(InMemoryTaskRepository::with_tasks([
        Task::new("t", "Stretch", "list-home", ts("2024-01-01T00:00:00Z"))
            .with_due_date(ts("2024-01-01T07:00:00Z"))
            .with_recurrence(RecurrenceRule::daily()),
    ]));
    let service = RecurringTaskService::builder()
        .with_repository(Arc::clone(&repository))
        .build()
        .unwrap();

    for day in 1..=4 {
        let occurrence = ts(&format!("2024-01-0{day}T07:00:00Z"));
        service.toggle_occurrence("t", &occurrence).unwrap();
    }
    assert_eq!(repository.get("t").unwrap().completed_dates.len(), 4);
}

#[test]
fn due_today_and_upcoming_views() {
    let service = service_from_file();

    let due: Vec<String> = service
        .tasks_due_on(date(2024, 3, 31))
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(due, vec!["task-rent"]);
    assert!(service.tasks_due_on(date(2024, 4, 30)).is_empty());

    let upcoming: Vec<NaiveDate> = service
        .upcoming("task-rent", date(2024, 2, 1))
        .unwrap()
        .iter()
        .map(|ts| ts.date_naive())
        .collect();
    assert_eq!(
        &upcoming[..4],
        &[
            date(2024, 3, 31),
            date(2024, 5, 31),
            date(2024, 7, 31),
            date(2024, 8, 31)
        ]
    );
    assert_eq!(upcoming.len(), 7, "seven 31-day months within a year of Feb 1");

    let err = service.upcoming("task-broken", date(2024, 1, 1)).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigurationError>(),
        Some(&ConfigurationError::NonPositiveInterval(0))
    );
    assert!(service.occurrences("task-once", Window::single(date(2024, 1, 2))).is_err());
}

#[test]
fn stale_completions_are_reported_until_pruned() {
    let service = service_from_file();
    service
        .toggle_occurrence("task-standup", &ts("2024-01-02T00:00:00Z"))
        .unwrap();

    let stale = service.stale_completions("task-standup").unwrap();
    assert_eq!(stale, vec![ts("2024-01-02T00:00:00Z")]);

    assert_eq!(service.prune_stale_completions("task-standup").unwrap(), 1);
    assert!(service.stale_completions("task-standup").unwrap().is_empty());
    assert!(service
        .is_occurrence_completed("task-standup", &ts("2024-01-03T09:30:00Z"))
        .unwrap());
}

#[test]
fn frame_offset_changes_the_calendar_day() {
    let repository: Arc<dyn TaskRepository> = Arc::new(InMemoryTaskRepository::with_tasks([
        Task::new("t", "Late call", "list-work", ts("2024-01-01T00:00:00Z"))
            .with_due_date(ts("2024-01-01T23:30:00-03:00"))
            .with_recurrence(RecurrenceRule::weekly([1])),
    ]));
    let local = DayFrame::from_offset_minutes(-180).unwrap();
    let service = RecurringTaskService::builder()
        .with_repository(repository)
        .with_frame(local)
        .build()
        .unwrap();

    let occurrences = service
        .occurrences("t", Window::new(date(2024, 1, 1), date(2024, 1, 14)))
        .unwrap();
    let local_days: Vec<NaiveDate> = occurrences.iter().map(|ts| local.day_of(ts)).collect();
    assert_eq!(local_days, vec![date(2024, 1, 1), date(2024, 1, 8)]);
}
