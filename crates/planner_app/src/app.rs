use std::fmt::{self, Write as _};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use planner_core::{
    config::PlannerConfig,
    service::{AgendaEntry, RecurringOverview},
    store::InMemoryTaskRepository,
    task::Task,
    DayFrame, RecurrenceRule, RecurringTaskService, Window,
};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub(crate) planner: PlannerConfig,
    pub(crate) today: Option<NaiveDate>,
}

impl AppConfig {
    /// Planner settings plus `PLANNER_TODAY` (YYYY-MM-DD); a malformed date
    /// falls back to the real today without dropping the other settings.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let today = lookup("PLANNER_TODAY").and_then(|raw| {
            match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(day) => Some(day),
                Err(err) => {
                    warn!(%raw, %err, "ignoring PLANNER_TODAY, expected YYYY-MM-DD");
                    None
                }
            }
        });
        Self {
            planner: PlannerConfig::from_lookup(&lookup),
            today,
        }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| {
            let now = Utc::now().with_timezone(&self.planner.frame.offset());
            now.date_naive()
        })
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let today = config.today();
    let service = build_service(&config, today)?;
    let text = render_agenda(&service, today, config.planner.agenda_span_days)
        .context("rendering agenda")?;
    print!("{text}");
    Ok(())
}

fn build_service(config: &AppConfig, today: NaiveDate) -> Result<RecurringTaskService> {
    let builder = RecurringTaskService::builder().with_config(config.planner.clone());
    if config.planner.tasks_path.is_some() {
        return builder.build();
    }
    info!("no task file configured, showing sample tasks");
    let frame = config.planner.frame;
    let repository = InMemoryTaskRepository::with_tasks(sample_tasks(frame, today));
    builder.with_repository(Arc::new(repository)).build()
}

/// Text rendition of the recurring-tasks view: today, tomorrow, the next
/// `span_days` days, then any task whose rule could not be expanded.
pub fn render_agenda(
    service: &RecurringTaskService,
    today: NaiveDate,
    span_days: u32,
) -> Result<String, fmt::Error> {
    let frame = service.frame();
    let overview = service.overview(Window::days(today, span_days.max(2)));
    debug!(entries = overview.entries.len(), "rendering agenda");

    let mut out = String::new();
    write_agenda(&mut out, &overview, &frame, today)?;
    Ok(out)
}

fn write_agenda(
    out: &mut impl fmt::Write,
    overview: &RecurringOverview,
    frame: &DayFrame,
    today: NaiveDate,
) -> fmt::Result {
    let tomorrow = today.succ_opt().unwrap_or(today);
    for (heading, day) in [("Today", today), ("Tomorrow", tomorrow)] {
        writeln!(out, "{heading} ({day})")?;
        write_day(out, overview, frame, day)?;
    }

    writeln!(out, "Upcoming")?;
    let later: Vec<&AgendaEntry> = overview
        .entries
        .iter()
        .filter(|entry| frame.day_of(&entry.occurrence) > tomorrow)
        .collect();
    if later.is_empty() {
        writeln!(out, "  nothing scheduled")?;
    }
    for entry in later {
        writeln!(
            out,
            "  {} {}",
            format_day_heading(frame.day_of(&entry.occurrence), today),
            format_entry(entry)
        )?;
    }

    if !overview.flagged.is_empty() {
        writeln!(out, "Needs attention")?;
        for flag in &overview.flagged {
            writeln!(out, "  ! {}: {}", flag.title, flag.error)?;
        }
    }
    Ok(())
}

fn write_day(
    out: &mut impl fmt::Write,
    overview: &RecurringOverview,
    frame: &DayFrame,
    day: NaiveDate,
) -> fmt::Result {
    let mut any = false;
    for entry in overview.entries_on(frame, day) {
        any = true;
        writeln!(out, "  {}", format_entry(entry))?;
    }
    if !any {
        writeln!(out, "  nothing scheduled")?;
    }
    Ok(())
}

fn format_entry(entry: &AgendaEntry) -> String {
    let mark = if entry.completed { 'x' } else { ' ' };
    format!(
        "[{mark}] {} {} ({})",
        entry.occurrence.format("%H:%M"),
        entry.title,
        entry.pattern
    )
}

fn format_day_heading(date: NaiveDate, today: NaiveDate) -> String {
    let diff = (date - today).num_days();
    format!("{} (in {diff} d.)", date.format("%a %d/%m"))
}

fn sample_tasks(frame: DayFrame, today: NaiveDate) -> Vec<Task> {
    let at = |day: NaiveDate, hour: u32| -> DateTime<FixedOffset> {
        frame.at_time(day, NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN))
    };
    let created = at(today - Duration::days(30), 8);

    let mut standup = Task::new("sample-standup", "Team standup", "list-work", created)
        .with_due_date(at(today, 9))
        .with_recurrence(RecurrenceRule::weekly([1, 2, 3, 4, 5]));
    standup.toggle_completed_on(&frame, &at(today, 9));

    vec![
        standup,
        Task::new("sample-plants", "Water plants", "list-home", created)
            .with_due_date(at(today - Duration::days(1), 18))
            .with_recurrence(RecurrenceRule::daily().every(2)),
        Task::new("sample-invoice", "Send invoices", "list-work", created)
            .with_due_date(at(today, 10))
            .with_recurrence(RecurrenceRule::monthly()),
        Task::new("sample-review", "Quarterly review", "list-work", created)
            .with_recurrence(RecurrenceRule::monthly().every(3)),
    ]
}
