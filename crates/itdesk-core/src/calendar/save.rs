//! Saving a new event, recurring or not, as an explicit state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Draft -> Expanding -> Persisting -> Done
//!   |                      |
//!   +--> Persisting        +--> PartialFailure
//! ```
//!
//! Non-recurring drafts skip `Expanding`. Instances are created one request
//! at a time. The first failed request (or a cancellation between requests)
//! ends the flow in `PartialFailure`; instances created before it stay
//! created and nothing is retried or rolled back.

use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;

use super::event::{CalendarEvent, StoredEvent};
use super::expand::expand;
use crate::api::EventStore;
use crate::error::ApiError;

/// Why a save stopped before every instance was stored.
#[derive(Debug)]
pub enum FailureReason {
    /// A create request failed.
    Api(ApiError),
    /// The caller cancelled between requests.
    Cancelled,
}

/// Where a save currently stands.
#[derive(Debug)]
pub enum SaveState {
    /// Template built from the form, nothing sent yet.
    Draft(CalendarEvent),
    /// Recurring template about to be expanded.
    Expanding(CalendarEvent),
    /// Creating instances, front of `pending` next.
    Persisting {
        pending: VecDeque<CalendarEvent>,
        persisted: Vec<StoredEvent>,
        total: usize,
    },
    /// Every instance was stored.
    Done { persisted: Vec<StoredEvent> },
    /// Stopped early. `failed` is the instance whose request failed, if any;
    /// `unsent` were never attempted.
    PartialFailure {
        persisted: Vec<StoredEvent>,
        failed: Option<CalendarEvent>,
        unsent: Vec<CalendarEvent>,
        reason: FailureReason,
    },
}

impl SaveState {
    pub fn new(template: CalendarEvent) -> Self {
        SaveState::Draft(template)
    }

    /// Take the next transition that needs no I/O: `Draft` and `Expanding`
    /// move forward, a `Persisting` state with nothing left becomes `Done`.
    /// Every other state is returned unchanged.
    pub fn advance(self) -> SaveState {
        match self {
            SaveState::Draft(template) if template.needs_expansion() => {
                SaveState::Expanding(template)
            }
            SaveState::Draft(template) => SaveState::persisting(vec![template]),
            SaveState::Expanding(template) => SaveState::persisting(expand(&template)),
            SaveState::Persisting {
                pending, persisted, ..
            } if pending.is_empty() => SaveState::Done { persisted },
            other => other,
        }
    }

    fn persisting(instances: Vec<CalendarEvent>) -> SaveState {
        SaveState::Persisting {
            total: instances.len(),
            pending: instances.into(),
            persisted: Vec::new(),
        }
    }

    /// The instance the next create request should send.
    pub fn next_request(&self) -> Option<&CalendarEvent> {
        match self {
            SaveState::Persisting { pending, .. } => pending.front(),
            _ => None,
        }
    }

    /// Apply the result of the create request for [`Self::next_request`].
    pub fn record(self, result: Result<StoredEvent, ApiError>) -> SaveState {
        let SaveState::Persisting {
            mut pending,
            mut persisted,
            total,
        } = self
        else {
            return self;
        };

        let sent = pending.pop_front();
        match result {
            Ok(stored) => {
                persisted.push(stored);
                SaveState::Persisting {
                    pending,
                    persisted,
                    total,
                }
                .advance()
            }
            Err(e) => SaveState::PartialFailure {
                persisted,
                failed: sent,
                unsent: pending.into(),
                reason: FailureReason::Api(e),
            },
        }
    }

    /// Stop a save that is still persisting. Already stored instances are
    /// kept as they are.
    pub fn cancel(self) -> SaveState {
        match self {
            SaveState::Persisting {
                pending, persisted, ..
            } => SaveState::PartialFailure {
                persisted,
                failed: None,
                unsent: pending.into(),
                reason: FailureReason::Cancelled,
            },
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SaveState::Done { .. } | SaveState::PartialFailure { .. }
        )
    }

    /// Instances stored so far.
    pub fn persisted(&self) -> &[StoredEvent] {
        match self {
            SaveState::Persisting { persisted, .. }
            | SaveState::Done { persisted }
            | SaveState::PartialFailure { persisted, .. } => persisted,
            SaveState::Draft(_) | SaveState::Expanding(_) => &[],
        }
    }

    /// `(stored, total)` while persisting.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match self {
            SaveState::Persisting {
                persisted, total, ..
            } => Some((persisted.len(), *total)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SaveState::Draft(_) => "draft",
            SaveState::Expanding(_) => "expanding",
            SaveState::Persisting { .. } => "persisting",
            SaveState::Done { .. } => "done",
            SaveState::PartialFailure { .. } => "partial_failure",
        }
    }
}

/// Drive a save to completion against `store`.
///
/// Returns `Done` or `PartialFailure`. `cancel` is checked before each
/// request.
pub async fn save_new<S: EventStore + ?Sized>(
    store: &S,
    template: CalendarEvent,
    cancel: &CancellationToken,
) -> SaveState {
    let mut state = SaveState::new(template);
    while !state.is_terminal() {
        state = match state.next_request().cloned() {
            Some(_) if cancel.is_cancelled() => state.cancel(),
            Some(request) => {
                let result = store.create_event(&request).await;
                state.record(result)
            }
            None => state.advance(),
        };
    }

    match &state {
        SaveState::Done { persisted } => {
            tracing::info!(count = persisted.len(), "event saved");
        }
        SaveState::PartialFailure {
            persisted,
            unsent,
            reason,
            failed,
        } => {
            tracing::warn!(
                persisted = persisted.len(),
                failed = failed.is_some(),
                unsent = unsent.len(),
                ?reason,
                "event save stopped early"
            );
        }
        _ => {}
    }
    state
}
