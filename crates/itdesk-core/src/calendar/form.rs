//! Event form input and its conversion into a template.
//!
//! Users type dates either as `YYYY-MM-DD` or with a time of day. Date-only
//! values get default times filled in here, so the backend always receives
//! full datetimes.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::event::{CalendarEvent, EventType, RecurrenceType};
use crate::error::ValidationError;

/// A date as typed by the user: with or without a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DateInput {
    /// Parse `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DDTHH:MM:SS`.
    pub fn parse(field: &str, raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if !raw.contains('T') {
            return NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(DateInput::Date)
                .map_err(|e| invalid(field, raw, e));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .map(DateInput::DateTime)
            .map_err(|e| invalid(field, raw, e))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            DateInput::Date(d) => *d,
            DateInput::DateTime(dt) => dt.date(),
        }
    }

    fn or_time(self, time: NaiveTime) -> NaiveDateTime {
        match self {
            DateInput::Date(d) => d.and_time(time),
            DateInput::DateTime(dt) => dt,
        }
    }
}

fn invalid(field: &str, raw: &str, err: chrono::ParseError) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!("'{raw}': {err}"),
    }
}

/// Times used for date-only input on timed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormDefaults {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Raw event form, as filled in by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub event_type: EventType,
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_type: RecurrenceType,
    #[serde(default)]
    pub recurrence_interval: Option<u32>,
    #[serde(default)]
    pub recurrence_end: Option<String>,
}

impl EventForm {
    /// Form pre-filled for a day clicked in the month grid.
    pub fn for_day(date: NaiveDate) -> Self {
        let day = date.format("%Y-%m-%d").to_string();
        Self {
            start: day.clone(),
            end: Some(day),
            ..Self::default()
        }
    }

    /// Form pre-filled from an existing event, for editing.
    pub fn from_event(event: &CalendarEvent) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            event_type: event.event_type,
            start: event.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            end: event
                .end
                .map(|end| end.format("%Y-%m-%dT%H:%M:%S").to_string()),
            all_day: event.all_day,
            location: event.location.clone(),
            ..Self::default()
        }
    }

    /// Build a validated template, filling in default times.
    pub fn into_template(self, defaults: &FormDefaults) -> Result<CalendarEvent, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".into()));
        }
        if self.start.trim().is_empty() {
            return Err(ValidationError::MissingField("start".into()));
        }

        let start_input = DateInput::parse("start", &self.start)?;
        let end_input = match self.end.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(DateInput::parse("end", raw)?),
            _ => None,
        };

        let (start, end) = if self.all_day {
            let start = start_input.date().and_time(NaiveTime::MIN);
            let end = match end_input {
                Some(DateInput::Date(d)) => d.and_time(end_of_day()),
                Some(DateInput::DateTime(dt)) => dt,
                None => start.date().and_time(end_of_day()),
            };
            (start, Some(end))
        } else {
            (
                start_input.or_time(defaults.start_time),
                end_input.map(|e| e.or_time(defaults.end_time)),
            )
        };

        let recurrence_end = match self.recurrence_end.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(DateInput::parse("recurrence_end", raw)?.date()),
            _ => None,
        };

        let event = CalendarEvent {
            title: self.title.trim().to_string(),
            description: self.description,
            event_type: self.event_type,
            start,
            end,
            all_day: self.all_day,
            location: self.location.filter(|l| !l.trim().is_empty()),
            is_recurring: self.is_recurring,
            recurrence_type: self.recurrence_type,
            recurrence_interval: self.recurrence_interval.unwrap_or(1).max(1),
            recurrence_end,
        };
        event.validate()?;
        Ok(event)
    }
}
