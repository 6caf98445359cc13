//! Calendar screen state: the loaded event list, the visible month and the
//! save/delete actions.
//!
//! Backend failures never escape this layer. Each action reports a
//! [`Notice`] and leaves the in-memory list as it was; the list is
//! re-fetched after every mutation that reached the backend.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::event::StoredEvent;
use super::form::{EventForm, FormDefaults};
use super::grid::{upcoming, Month, MonthGrid};
use super::save::{save_new, SaveState};
use crate::api::EventStore;
use crate::error::SessionError;
use crate::session::{CredentialStore, Session};

pub const SAVE_FAILED: &str = "Error al guardar el evento";
pub const DELETE_FAILED: &str = "Error al eliminar el evento";
pub const LOAD_FAILED: &str = "Error al cargar los eventos";

/// Default look-ahead for the upcoming list.
pub const DEFAULT_UPCOMING_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A one-line message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub struct CalendarView<S: EventStore> {
    store: S,
    events: Vec<StoredEvent>,
    month: Month,
    defaults: FormDefaults,
    upcoming_days: i64,
}

impl<S: EventStore> CalendarView<S> {
    /// A view showing the month of `today`, with nothing loaded yet.
    pub fn new(store: S, today: NaiveDate) -> Self {
        Self {
            store,
            events: Vec::new(),
            month: Month::containing(today),
            defaults: FormDefaults::default(),
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }

    pub fn with_defaults(mut self, defaults: FormDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_upcoming_days(mut self, days: i64) -> Self {
        self.upcoming_days = days;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &[StoredEvent] {
        &self.events
    }

    pub fn month(&self) -> Month {
        self.month
    }

    /// Replace the list with the backend's. On failure the current list is
    /// kept and an error notice returned.
    pub async fn reload(&mut self) -> Option<Notice> {
        match self.store.list_events().await {
            Ok(events) => {
                tracing::debug!(count = events.len(), "events loaded");
                self.events = events;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "loading events failed");
                Some(Notice::error(LOAD_FAILED))
            }
        }
    }

    /// Save the form as a new event, or as an update of `editing`.
    ///
    /// New recurring events are expanded and stored one instance at a time;
    /// an update always touches exactly the one stored event.
    pub async fn save(
        &mut self,
        form: EventForm,
        editing: Option<i64>,
        cancel: &CancellationToken,
    ) -> Notice {
        let template = match form.into_template(&self.defaults) {
            Ok(template) => template,
            Err(e) => return Notice::error(e.to_string()),
        };

        let notice = match editing {
            Some(id) => match self.store.update_event(id, &template).await {
                Ok(_) => Notice::info("Evento actualizado"),
                Err(e) => {
                    tracing::warn!(id, error = %e, "updating event failed");
                    return Notice::error(SAVE_FAILED);
                }
            },
            None => match save_new(&self.store, template, cancel).await {
                SaveState::Done { persisted } if persisted.len() > 1 => {
                    Notice::info(format!("{} eventos creados", persisted.len()))
                }
                SaveState::Done { .. } => Notice::info("Evento creado"),
                failed => {
                    if failed.persisted().is_empty() {
                        return Notice::error(SAVE_FAILED);
                    }
                    Notice::error(format!(
                        "{SAVE_FAILED} ({} creados antes del error)",
                        failed.persisted().len()
                    ))
                }
            },
        };

        self.reload_after_mutation(notice).await
    }

    /// Delete one stored event. Needs an open action gate on `session`.
    pub async fn delete<C: CredentialStore>(
        &mut self,
        session: &Session<C>,
        id: i64,
        now: DateTime<Utc>,
    ) -> Notice {
        if let Err(e) = session.authorize_action(now) {
            return match e {
                SessionError::ConfirmationRequired => {
                    Notice::error("Confirma tu contraseña para eliminar eventos")
                }
                other => Notice::error(other.to_string()),
            };
        }

        match self.store.delete_event(id).await {
            Ok(()) => self.reload_after_mutation(Notice::info("Evento eliminado")).await,
            Err(e) => {
                tracing::warn!(id, error = %e, "deleting event failed");
                Notice::error(DELETE_FAILED)
            }
        }
    }

    async fn reload_after_mutation(&mut self, notice: Notice) -> Notice {
        match self.reload().await {
            Some(load_failed) if !notice.is_error() => load_failed,
            _ => notice,
        }
    }

    pub fn grid(&self, today: NaiveDate) -> MonthGrid<'_> {
        MonthGrid::build(self.month, &self.events, today)
    }

    pub fn upcoming(&self, now: NaiveDateTime) -> Vec<&StoredEvent> {
        upcoming(&self.events, now, self.upcoming_days)
    }

    pub fn next_month(&mut self) {
        if let Some(next) = self.month.next() {
            self.month = next;
        }
    }

    pub fn prev_month(&mut self) {
        if let Some(prev) = self.month.prev() {
            self.month = prev;
        }
    }

    pub fn go_to(&mut self, month: Month) {
        self.month = month;
    }

    pub fn today(&mut self, today: NaiveDate) {
        self.month = Month::containing(today);
    }
}
