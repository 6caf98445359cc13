//! # itdesk Core Library
//!
//! Business logic behind the itdesk calendar: event model, recurring-event
//! expansion, the REST backend client and the user session. The `itdesk`
//! CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Calendar**: pure expansion of a recurring template into concrete
//!   instances, plus the view state and save flow that persist them
//! - **API**: async HTTP client for `/api/calendar-events` and `/api/auth`
//! - **Session**: explicitly constructed login state with a time-limited
//!   action gate for destructive operations
//! - **Config**: TOML configuration under the user's config directory
//!
//! ## Key Components
//!
//! - [`expand`]: Recurring template to instance list
//! - [`SaveState`]: Draft to Done/PartialFailure state machine
//! - [`ApiClient`]: Backend client implementing [`EventStore`]
//! - [`Session`]: Token, user and action gate

pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod session;

pub use api::{ApiClient, AuthBackend, EventStore, User};
pub use calendar::{
    expand, CalendarEvent, CalendarView, EventForm, EventType, Month, MonthGrid, Notice,
    RecurrenceType, SaveState, StoredEvent,
};
pub use config::Config;
pub use error::{ApiError, ConfigError, CoreError, Result, SessionError, ValidationError};
pub use session::{ActionGate, CredentialStore, KeyringStore, MemoryStore, Session};
