use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn unit(self, count: i64) -> &'static str {
        match (self, count == 1) {
            (Frequency::Daily, true) => "day",
            (Frequency::Daily, false) => "days",
            (Frequency::Weekly, true) => "week",
            (Frequency::Weekly, false) => "weeks",
            (Frequency::Monthly, true) => "month",
            (Frequency::Monthly, false) => "months",
            (Frequency::Yearly, true) => "year",
            (Frequency::Yearly, false) => "years",
        }
    }
}

/// Recurrence pattern as edited by the user and stored on the task.
///
/// Fields that do not apply to `frequency` are kept untouched so the editor
/// can round-trip them; the generator only reads the validated [`Schedule`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<FixedOffset>>,
    /// Weekday indices, 0 = Sunday through 6 = Saturday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_of_year: Option<u32>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            end_date: None,
            days_of_week: None,
            day_of_month: None,
            month_of_year: None,
        }
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    pub fn weekly(days: impl IntoIterator<Item = u8>) -> Self {
        Self::new(Frequency::Weekly).on_weekdays(days)
    }

    pub fn monthly() -> Self {
        Self::new(Frequency::Monthly)
    }

    pub fn yearly() -> Self {
        Self::new(Frequency::Yearly)
    }

    pub fn every(mut self, interval: i64) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_weekdays(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = Some(days.into_iter().collect());
        self
    }

    pub fn on_day(mut self, day_of_month: u32) -> Self {
        self.day_of_month = Some(day_of_month);
        self
    }

    pub fn in_month(mut self, month_of_year: u32) -> Self {
        self.month_of_year = Some(month_of_year);
        self
    }

    pub fn until(mut self, end_date: DateTime<FixedOffset>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Checks the fields authoritative for `frequency` and resolves defaults
    /// against the anchor day.
    pub fn validate(&self, anchor: NaiveDate) -> Result<Schedule, ConfigurationError> {
        if self.interval < 1 {
            return Err(ConfigurationError::NonPositiveInterval(self.interval));
        }
        let interval = self.interval;

        let pattern = match self.frequency {
            Frequency::Daily => {
                let filter = weekday_set(self.days_of_week.as_deref())?;
                Pattern::Daily {
                    weekdays: (!filter.is_empty()).then_some(filter),
                }
            }
            Frequency::Weekly => {
                let mut weekdays = weekday_set(self.days_of_week.as_deref())?;
                if weekdays.is_empty() {
                    weekdays.insert(anchor.weekday());
                }
                Pattern::Weekly { weekdays }
            }
            Frequency::Monthly => Pattern::Monthly {
                day: day_of_month(self.day_of_month, anchor)?,
            },
            Frequency::Yearly => {
                let month = match self.month_of_year {
                    Some(month) if !(1..=12).contains(&month) => {
                        return Err(ConfigurationError::MonthOutOfRange(month))
                    }
                    Some(month) => month,
                    None => anchor.month(),
                };
                let day = day_of_month(self.day_of_month, anchor)?;
                if day > longest_month(month) {
                    return Err(ConfigurationError::DayOutOfRangeForMonth { month, day });
                }
                Pattern::Yearly { month, day }
            }
        };

        Ok(Schedule {
            interval,
            pattern,
            end_date: self.end_date,
        })
    }

    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Every {} {}",
            self.interval,
            self.frequency.unit(self.interval)
        )?;
        if matches!(self.frequency, Frequency::Daily | Frequency::Weekly) {
            let names: Vec<&str> = self
                .days_of_week
                .iter()
                .flatten()
                .filter_map(|index| weekday_from_index(*index))
                .map(weekday_name)
                .collect();
            if !names.is_empty() {
                write!(f, " ({})", names.join(", "))?;
            }
        }
        Ok(())
    }
}

/// A validated rule, ready for occurrence generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub(crate) interval: i64,
    pub(crate) pattern: Pattern,
    pub(crate) end_date: Option<DateTime<FixedOffset>>,
}

impl Schedule {
    pub fn interval(&self) -> i64 {
        self.interval
    }

    pub fn end_date(&self) -> Option<DateTime<FixedOffset>> {
        self.end_date
    }

    pub fn frequency(&self) -> Frequency {
        match self.pattern {
            Pattern::Daily { .. } => Frequency::Daily,
            Pattern::Weekly { .. } => Frequency::Weekly,
            Pattern::Monthly { .. } => Frequency::Monthly,
            Pattern::Yearly { .. } => Frequency::Yearly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pattern {
    Daily { weekdays: Option<WeekdaySet> },
    Weekly { weekdays: WeekdaySet },
    Monthly { day: u32 },
    Yearly { month: u32, day: u32 },
}

/// Bit set over the seven weekdays, indexed from Sunday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WeekdaySet(u8);

impl WeekdaySet {
    pub(crate) fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    pub(crate) fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

fn weekday_set(indices: Option<&[u8]>) -> Result<WeekdaySet, ConfigurationError> {
    let mut set = WeekdaySet::default();
    for index in indices.unwrap_or_default() {
        let day = weekday_from_index(*index).ok_or(ConfigurationError::WeekdayOutOfRange(*index))?;
        set.insert(day);
    }
    Ok(set)
}

fn day_of_month(explicit: Option<u32>, anchor: NaiveDate) -> Result<u32, ConfigurationError> {
    match explicit {
        Some(day) if !(1..=31).contains(&day) => Err(ConfigurationError::DayOfMonthOutOfRange(day)),
        Some(day) => Ok(day),
        None => Ok(anchor.day()),
    }
}

/// Longest a month gets in any year; February counts its leap day.
fn longest_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}
