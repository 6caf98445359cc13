//! Calendar event model shared by templates, expanded instances and
//! events returned by the backend.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Kind of calendar event. Unknown wire values decode as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Visit,
    Maintenance,
    Meeting,
    #[default]
    #[serde(other)]
    Other,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Visit,
        EventType::Maintenance,
        EventType::Meeting,
        EventType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Visit => "visit",
            EventType::Maintenance => "maintenance",
            EventType::Meeting => "meeting",
            EventType::Other => "other",
        }
    }

    /// Label shown to users of the calendar.
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Visit => "Visita",
            EventType::Maintenance => "Mantenimiento",
            EventType::Meeting => "Reunión",
            EventType::Other => "Otro",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "event_type".into(),
                message: format!("unknown event type '{s}'"),
            })
    }
}

/// How a template repeats.
///
/// Unknown wire values (say `"yearly"` from a newer backend) decode as
/// `None`. Such a template therefore expands to its first instance only,
/// keeps its title without the " (Recurrente)" suffix, and
/// [`needs_expansion`](CalendarEvent::needs_expansion) is false for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    CustomDays,
    // `#[serde(other)]` must be the last variant.
    #[default]
    #[serde(other)]
    None,
}

impl RecurrenceType {
    pub const ALL: [RecurrenceType; 6] = [
        RecurrenceType::None,
        RecurrenceType::Daily,
        RecurrenceType::Weekly,
        RecurrenceType::Biweekly,
        RecurrenceType::Monthly,
        RecurrenceType::CustomDays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::None => "none",
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Biweekly => "biweekly",
            RecurrenceType::Monthly => "monthly",
            RecurrenceType::CustomDays => "custom_days",
        }
    }

    pub fn repeats(&self) -> bool {
        !matches!(self, RecurrenceType::None)
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecurrenceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "recurrence_type".into(),
                message: format!("unknown recurrence type '{s}'"),
            })
    }
}

fn default_interval() -> u32 {
    1
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A calendar event: either a recurring template built from form input or
/// a single concrete instance ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event_type: EventType,
    #[serde(rename = "start_date")]
    pub start: NaiveDateTime,
    #[serde(rename = "end_date", default)]
    pub end: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub all_day: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_recurring: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recurrence_type: RecurrenceType,
    #[serde(default = "default_interval")]
    pub recurrence_interval: u32,
    #[serde(default)]
    pub recurrence_end: Option<NaiveDate>,
}

impl CalendarEvent {
    /// A one-off event of type `other` with no end.
    pub fn new(title: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            event_type: EventType::Other,
            start,
            end: None,
            all_day: false,
            location: None,
            is_recurring: false,
            recurrence_type: RecurrenceType::None,
            recurrence_interval: default_interval(),
            recurrence_end: None,
        }
    }

    /// Turn this event into a recurring template.
    pub fn recurring(
        mut self,
        recurrence_type: RecurrenceType,
        interval: u32,
        until: Option<NaiveDate>,
    ) -> Self {
        self.is_recurring = true;
        self.recurrence_type = recurrence_type;
        self.recurrence_interval = interval;
        self.recurrence_end = until;
        self
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Recurrence step multiplier; zero behaves as one.
    pub fn interval(&self) -> u32 {
        self.recurrence_interval.max(1)
    }

    /// `end - start`, when the event has an end.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }

    /// Whether saving this event goes through recurrence expansion.
    pub fn needs_expansion(&self) -> bool {
        self.is_recurring && self.recurrence_type.repeats()
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Check the model invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".into()));
        }
        if let Some(end) = self.end {
            if end < self.start {
                return Err(ValidationError::InvalidTimeRange {
                    start: self.start,
                    end,
                });
            }
        }
        if self.is_recurring && !self.recurrence_type.repeats() {
            return Err(ValidationError::InvalidValue {
                field: "recurrence_type".into(),
                message: "a recurring event needs a recurrence type".into(),
            });
        }
        Ok(())
    }
}

/// An event as stored by the backend, with its server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: CalendarEvent,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}
