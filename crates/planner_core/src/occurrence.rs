//! Occurrence generation for recurring tasks.
//!
//! A [`Recurrence`] pins a validated rule to its anchor: the anchor's calendar
//! day is the phase reference (day zero, week zero, month zero) and its
//! time-of-day is stamped onto every generated occurrence. Candidate days are
//! scanned one at a time, except for unfiltered daily rules which jump by the
//! interval. Output is strictly ascending and never repeats a day.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime};

use crate::{
    day::{DayFrame, Window},
    error::ConfigurationError,
    rule::{Pattern, RecurrenceRule, Schedule},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    schedule: Schedule,
    frame: DayFrame,
    anchor_day: NaiveDate,
    time: NaiveTime,
    last_day: Option<NaiveDate>,
}

impl Recurrence {
    pub fn new(
        rule: &RecurrenceRule,
        anchor: &DateTime<FixedOffset>,
        frame: DayFrame,
    ) -> Result<Self, ConfigurationError> {
        let anchor_day = frame.day_of(anchor);
        let schedule = rule.validate(anchor_day)?;
        let last_day = schedule.end_date.map(|end| frame.day_of(&end));
        Ok(Self {
            schedule,
            frame,
            anchor_day,
            time: frame.time_of(anchor),
            last_day,
        })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn anchor_day(&self) -> NaiveDate {
        self.anchor_day
    }

    pub fn frame(&self) -> DayFrame {
        self.frame
    }

    /// Whether the task falls due on `day`.
    pub fn is_due(&self, day: NaiveDate) -> bool {
        if day < self.anchor_day || self.last_day.is_some_and(|last| day > last) {
            return false;
        }
        let interval = self.schedule.interval;
        let elapsed_days = (day - self.anchor_day).num_days();
        match &self.schedule.pattern {
            Pattern::Daily { weekdays: None } => elapsed_days % interval == 0,
            // A weekday filter replaces interval skipping rather than composing with it.
            Pattern::Daily {
                weekdays: Some(weekdays),
            } => weekdays.contains(day.weekday()),
            Pattern::Weekly { weekdays } => {
                weekdays.contains(day.weekday()) && (elapsed_days / 7) % interval == 0
            }
            Pattern::Monthly { day: target } => {
                day.day() == *target && months_between(self.anchor_day, day) % interval == 0
            }
            Pattern::Yearly {
                month,
                day: target,
            } => {
                day.month() == *month
                    && day.day() == *target
                    && i64::from(day.year() - self.anchor_day.year()) % interval == 0
            }
        }
    }

    pub fn is_due_at(&self, ts: &DateTime<FixedOffset>) -> bool {
        self.is_due(self.frame.day_of(ts))
    }

    /// Unbounded stream of occurrences on or after `from`.
    ///
    /// The stream only ends on its own when the rule has an end date; callers
    /// must bound it with [`Occurrences::through`] or `take`.
    pub fn occurrences_from(&self, from: NaiveDate) -> Occurrences<'_> {
        let start = from.max(self.anchor_day);
        Occurrences {
            recurrence: self,
            cursor: self.align(start),
            last_day: self.last_day,
        }
    }

    /// Occurrences inside `window`, capped at `max_count` when given.
    pub fn between(&self, window: Window, max_count: Option<usize>) -> Vec<DateTime<FixedOffset>> {
        if window.is_empty() {
            return Vec::new();
        }
        let occurrences = self.occurrences_from(window.start).through(window.end);
        match max_count {
            Some(limit) => occurrences.take(limit).collect(),
            None => occurrences.collect(),
        }
    }

    fn align(&self, start: NaiveDate) -> Option<NaiveDate> {
        match &self.schedule.pattern {
            Pattern::Daily { weekdays: None } => {
                let interval = self.schedule.interval;
                let remainder = (start - self.anchor_day).num_days() % interval;
                if remainder == 0 {
                    Some(start)
                } else {
                    start.checked_add_signed(Duration::days(interval - remainder))
                }
            }
            _ => Some(start),
        }
    }

    fn advance(&self, day: NaiveDate) -> Option<NaiveDate> {
        match &self.schedule.pattern {
            Pattern::Daily { weekdays: None } => {
                day.checked_add_signed(Duration::days(self.schedule.interval))
            }
            _ => day.succ_opt(),
        }
    }
}

pub struct Occurrences<'a> {
    recurrence: &'a Recurrence,
    cursor: Option<NaiveDate>,
    last_day: Option<NaiveDate>,
}

impl<'a> Occurrences<'a> {
    /// Stops the stream after `last`, keeping the rule's own end date if earlier.
    pub fn through(mut self, last: NaiveDate) -> Self {
        self.last_day = Some(self.last_day.map_or(last, |current| current.min(last)));
        self
    }
}

impl<'a> Iterator for Occurrences<'a> {
    type Item = DateTime<FixedOffset>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let day = self.cursor?;
            if self.last_day.is_some_and(|last| day > last) {
                self.cursor = None;
                return None;
            }
            self.cursor = self.recurrence.advance(day);
            if self.recurrence.is_due(day) {
                return Some(self.recurrence.frame.at_time(day, self.recurrence.time));
            }
        }
    }
}

/// Enumerates the occurrences of `rule`, anchored at `anchor`, inside `window`.
///
/// An inverted window is not an error and yields nothing.
pub fn generate_occurrences(
    rule: &RecurrenceRule,
    anchor: &DateTime<FixedOffset>,
    frame: DayFrame,
    window: Window,
    max_count: Option<usize>,
) -> Result<Vec<DateTime<FixedOffset>>, ConfigurationError> {
    let recurrence = Recurrence::new(rule, anchor, frame)?;
    Ok(recurrence.between(window, max_count))
}

/// The next `count` occurrences on or after `from`, looking no further than
/// `horizon_days` ahead.
pub fn next_occurrences(
    rule: &RecurrenceRule,
    anchor: &DateTime<FixedOffset>,
    frame: DayFrame,
    from: NaiveDate,
    count: usize,
    horizon_days: u32,
) -> Result<Vec<DateTime<FixedOffset>>, ConfigurationError> {
    generate_occurrences(
        rule,
        anchor,
        frame,
        Window::days(from, horizon_days),
        Some(count),
    )
}

fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    i64::from(end.year() - start.year()) * 12 + (i64::from(end.month()) - i64::from(start.month()))
}
