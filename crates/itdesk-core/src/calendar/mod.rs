//! Calendar events: model, recurrence expansion, form input, month grid
//! and the save flow used by the calendar screen.

pub mod cursor;
pub mod event;
pub mod expand;
pub mod form;
pub mod grid;
pub mod save;
pub mod view;

#[cfg(test)]
mod save_tests;

pub use cursor::{DateCursor, Step};
pub use event::{CalendarEvent, EventType, RecurrenceType, StoredEvent};
pub use expand::{expand, MAX_INSTANCES, RECURRING_SUFFIX};
pub use form::{DateInput, EventForm, FormDefaults};
pub use grid::{short_title, DayCell, Month, MonthGrid, DAY_NAMES};
pub use save::{save_new, FailureReason, SaveState};
pub use view::{CalendarView, Notice, NoticeLevel};
