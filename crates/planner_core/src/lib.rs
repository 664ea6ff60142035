pub mod config;
pub mod day;
pub mod error;
pub mod ledger;
pub mod occurrence;
pub mod rule;
pub mod service;
pub mod store;
pub mod task;

pub use crate::day::{DayFrame, Window};
pub use crate::error::{ConfigurationError, StoreError};
pub use crate::occurrence::{generate_occurrences, next_occurrences, Recurrence};
pub use crate::rule::{Frequency, RecurrenceRule};
pub use crate::service::{RecurringTaskService, RecurringTaskServiceBuilder};
