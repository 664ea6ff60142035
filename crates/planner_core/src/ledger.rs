use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{day::DayFrame, occurrence::Recurrence};

/// Calendar days on which individual occurrences of a recurring task were
/// marked done. Membership is by calendar day under a [`DayFrame`], never by
/// exact timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CompletedDates(Vec<DateTime<FixedOffset>>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Completed,
    Reopened,
}

impl CompletedDates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<FixedOffset>> {
        self.0.iter()
    }

    pub fn contains(&self, frame: &DayFrame, date: &DateTime<FixedOffset>) -> bool {
        self.0.iter().any(|entry| frame.same_day(entry, date))
    }

    /// Returns the ledger with `date` flipped. Any date is accepted, whether
    /// or not the task's rule produces it.
    pub fn toggled(&self, frame: &DayFrame, date: &DateTime<FixedOffset>) -> (Self, Toggle) {
        if self.contains(frame, date) {
            let kept = self
                .0
                .iter()
                .filter(|entry| !frame.same_day(entry, date))
                .cloned()
                .collect();
            (Self(kept), Toggle::Reopened)
        } else {
            let mut entries = self.0.clone();
            entries.push(frame.start_of_day(frame.day_of(date)));
            (Self(entries), Toggle::Completed)
        }
    }

    /// Entries on days the recurrence never falls due, e.g. after the rule
    /// was edited.
    pub fn stale_entries(&self, recurrence: &Recurrence) -> Vec<DateTime<FixedOffset>> {
        self.0
            .iter()
            .filter(|entry| !recurrence.is_due_at(entry))
            .cloned()
            .collect()
    }

    pub fn without_stale(&self, recurrence: &Recurrence) -> Self {
        Self(
            self.0
                .iter()
                .filter(|entry| recurrence.is_due_at(entry))
                .cloned()
                .collect(),
        )
    }
}

impl FromIterator<DateTime<FixedOffset>> for CompletedDates {
    fn from_iter<I: IntoIterator<Item = DateTime<FixedOffset>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RecurrenceRule;

    fn ts(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    #[test]
    fn membership_ignores_time_of_day() {
        let frame = DayFrame::utc();
        let ledger: CompletedDates = [ts("2024-01-02T00:00:00Z")].into_iter().collect();
        assert!(ledger.contains(&frame, &ts("2024-01-02T17:30:00Z")));
        assert!(!ledger.contains(&frame, &ts("2024-01-03T00:00:00Z")));
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let frame = DayFrame::utc();
        let date = ts("2024-01-02T09:15:00Z");
        let original = CompletedDates::new();

        let (once, first) = original.toggled(&frame, &date);
        assert_eq!(first, Toggle::Completed);
        assert!(once.contains(&frame, &date));
        assert_eq!(once.iter().next(), Some(&ts("2024-01-02T00:00:00Z")));

        let (twice, second) = once.toggled(&frame, &date);
        assert_eq!(second, Toggle::Reopened);
        assert!(!twice.contains(&frame, &date));
        assert_eq!(twice, original);
    }

    #[test]
    fn reopening_removes_every_entry_on_that_day() {
        let frame = DayFrame::utc();
        let ledger: CompletedDates = [
            ts("2024-01-02T00:00:00Z"),
            ts("2024-01-02T12:00:00Z"),
            ts("2024-01-05T00:00:00Z"),
        ]
        .into_iter()
        .collect();
        let (reopened, toggle) = ledger.toggled(&frame, &ts("2024-01-02T08:00:00Z"));
        assert_eq!(toggle, Toggle::Reopened);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn reports_but_keeps_stale_entries() {
        let frame = DayFrame::utc();
        let recurrence = Recurrence::new(
            &RecurrenceRule::weekly([1]),
            &ts("2024-01-01T09:00:00Z"),
            frame,
        )
        .unwrap();
        let ledger: CompletedDates = [ts("2024-01-08T00:00:00Z"), ts("2024-01-09T00:00:00Z")]
            .into_iter()
            .collect();

        assert_eq!(ledger.stale_entries(&recurrence), vec![ts("2024-01-09T00:00:00Z")]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.without_stale(&recurrence).len(), 1);
    }

    #[test]
    fn serializes_as_plain_timestamp_list() {
        let ledger: CompletedDates = [ts("2024-01-02T00:00:00Z")].into_iter().collect();
        let json = serde_json::to_string(&ledger).unwrap();
        assert_eq!(json, r#"["2024-01-02T00:00:00+00:00"]"#);
    }
}
