use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

/// The one timezone rule used to turn stored timestamps into calendar days.
///
/// Occurrence generation and the completion ledger both go through the same
/// frame, so a checkbox always resolves to the day the generator produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayFrame {
    offset: FixedOffset,
}

impl DayFrame {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Returns `None` when the offset is a day or more away from UTC.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        let seconds = minutes.checked_mul(60)?;
        FixedOffset::east_opt(seconds).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn day_of(&self, ts: &DateTime<FixedOffset>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    pub fn time_of(&self, ts: &DateTime<FixedOffset>) -> NaiveTime {
        ts.with_timezone(&self.offset).time()
    }

    pub fn same_day(&self, a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>) -> bool {
        self.day_of(a) == self.day_of(b)
    }

    pub fn at_time(&self, day: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
        // A fixed offset has no gaps or folds, so local times map one-to-one.
        let local = day.and_time(time);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, self.offset)
    }

    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<FixedOffset> {
        self.at_time(day, NaiveTime::MIN)
    }
}

impl Default for DayFrame {
    fn default() -> Self {
        Self::utc()
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn between(
        frame: &DayFrame,
        start: &DateTime<FixedOffset>,
        end: &DateTime<FixedOffset>,
    ) -> Self {
        Self::new(frame.day_of(start), frame.day_of(end))
    }

    pub fn single(day: NaiveDate) -> Self {
        Self::new(day, day)
    }

    /// `days` calendar days starting at `start`; zero days yields an empty
    /// window. The end stops at the last representable date.
    pub fn days(start: NaiveDate, days: u32) -> Self {
        if days == 0 {
            return match start.pred_opt() {
                Some(end) => Self::new(start, end),
                None => Self::new(NaiveDate::MAX, NaiveDate::MIN),
            };
        }
        let end = start
            .checked_add_signed(Duration::days(i64::from(days) - 1))
            .unwrap_or(NaiveDate::MAX);
        Self::new(start, end)
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}
