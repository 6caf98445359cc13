//! Recurring event expansion.
//!
//! Turns one template plus its recurrence rule into a bounded list of
//! standalone instances. Instances keep no link to the template or to
//! each other: once persisted they are edited and deleted one by one.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::cursor::{DateCursor, Step};
use super::event::CalendarEvent;

/// Upper bound on instances produced by a single expansion.
pub const MAX_INSTANCES: usize = 100;

/// Window length used when the template has no `recurrence_end`.
pub const DEFAULT_WINDOW_DAYS: i64 = 365;

/// Marker appended to the title of every instance of a repeating template.
pub const RECURRING_SUFFIX: &str = "(Recurrente)";

/// Last moment an occurrence may start at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// Through the whole of this day.
    Through(NaiveDate),
    /// Up to and including this instant.
    At(NaiveDateTime),
}

impl WindowEnd {
    pub fn for_template(template: &CalendarEvent) -> Self {
        match template.recurrence_end {
            Some(date) => WindowEnd::Through(date),
            None => WindowEnd::At(
                template
                    .start
                    .checked_add_signed(Duration::days(DEFAULT_WINDOW_DAYS))
                    .unwrap_or(NaiveDateTime::MAX),
            ),
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        match *self {
            WindowEnd::Through(date) => at.date() <= date,
            WindowEnd::At(end) => at <= end,
        }
    }
}

/// Expand a template into its concrete instances, in chronological order.
///
/// Always returns at most [`MAX_INSTANCES`] events. A template whose
/// recurrence type does not repeat yields just its first occurrence.
pub fn expand(template: &CalendarEvent) -> Vec<CalendarEvent> {
    let window = WindowEnd::for_template(template);
    let step = Step::for_rule(
        template.recurrence_type,
        template.interval(),
        &template.title,
    );
    let duration = template.duration();

    let mut instances = Vec::new();
    for at in DateCursor::new(template.start, step) {
        if !window.contains(at) || instances.len() >= MAX_INSTANCES {
            break;
        }
        match instance_at(template, at, duration) {
            Some(instance) => instances.push(instance),
            None => break,
        }
    }

    tracing::debug!(
        title = %template.title,
        recurrence = %template.recurrence_type,
        count = instances.len(),
        "expanded recurring event"
    );
    instances
}

fn instance_at(
    template: &CalendarEvent,
    start: NaiveDateTime,
    duration: Option<Duration>,
) -> Option<CalendarEvent> {
    let end = match duration {
        Some(d) => start.checked_add_signed(d)?,
        None => start,
    };
    let title = if template.recurrence_type.repeats() {
        format!("{} {}", template.title, RECURRING_SUFFIX)
    } else {
        template.title.clone()
    };

    Some(CalendarEvent {
        title,
        start,
        end: Some(end),
        is_recurring: false,
        ..template.clone()
    })
}
