use crate::tasks::TaskError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Input format for due dates.
pub const FORMAT: &str = "%Y-%m-%d";
/// Edit value that removes a task's due date.
pub const CLEAR_SENTINEL: &str = "none";

/// What an edit does to a task's due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDateChange {
    Clear,
    Set(NaiveDate),
}

pub fn parse(input: &str) -> Result<NaiveDate, TaskError> {
    NaiveDate::parse_from_str(input, FORMAT).map_err(|_| TaskError::InvalidDate(input.to_string()))
}

/// Parses an edit value: either [`CLEAR_SENTINEL`] or a `YYYY-MM-DD` date.
pub fn parse_change(input: &str) -> Result<DueDateChange, TaskError> {
    if input == CLEAR_SENTINEL {
        Ok(DueDateChange::Clear)
    } else {
        parse(input).map(DueDateChange::Set)
    }
}

pub(crate) fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
        .transpose()
}
