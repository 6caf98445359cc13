//! Tests for the save flow.

#[cfg(test)]
mod tests {
    use super::super::event::{CalendarEvent, RecurrenceType, StoredEvent};
    use super::super::save::*;
    use crate::api::EventStore;
    use crate::error::ApiError;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Store that fails the `fail_at`-th create (1-based) and optionally
    /// cancels a token after `cancel_after` successful creates.
    #[derive(Default)]
    struct ScriptedStore {
        fail_at: Option<usize>,
        cancel_after: Option<(usize, CancellationToken)>,
        sent: Mutex<Vec<CalendarEvent>>,
    }

    #[async_trait]
    impl EventStore for ScriptedStore {
        async fn list_events(&self) -> Result<Vec<StoredEvent>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_event(&self, event: &CalendarEvent) -> Result<StoredEvent, ApiError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(event.clone());
            let n = sent.len();
            if self.fail_at == Some(n) {
                return Err(ApiError::Status {
                    status: 500,
                    message: "Internal Server Error".into(),
                });
            }
            if let Some((after, token)) = &self.cancel_after {
                if n == *after {
                    token.cancel();
                }
            }
            Ok(StoredEvent {
                id: n as i64,
                event: event.clone(),
                user_id: Some(1),
                created_at: None,
                updated_at: None,
            })
        }

        async fn update_event(&self, _id: i64, _event: &CalendarEvent) -> Result<StoredEvent, ApiError> {
            unreachable!("save flow never updates")
        }

        async fn delete_event(&self, _id: i64) -> Result<(), ApiError> {
            unreachable!("save flow never deletes")
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn weekly_five() -> CalendarEvent {
        CalendarEvent::new("Ronda", at("2025-01-06T08:00:00")).recurring(
            RecurrenceType::Weekly,
            1,
            Some("2025-02-03".parse().unwrap()),
        )
    }

    #[test]
    fn draft_walks_through_expanding() {
        let state = SaveState::new(weekly_five());
        assert_eq!(state.name(), "draft");
        let state = state.advance();
        assert_eq!(state.name(), "expanding");
        let state = state.advance();
        assert_eq!(state.name(), "persisting");
        assert_eq!(state.progress(), Some((0, 5)));
        assert_eq!(
            state.next_request().map(|e| e.start),
            Some(at("2025-01-06T08:00:00"))
        );
    }

    #[test]
    fn single_event_skips_expanding() {
        let state = SaveState::new(CalendarEvent::new("Visita", at("2025-01-06T08:00:00"))).advance();
        assert_eq!(state.name(), "persisting");
        assert_eq!(state.progress(), Some((0, 1)));
        assert_eq!(state.next_request().unwrap().title, "Visita");
    }

    #[test]
    fn template_with_no_instances_finishes_done() {
        let mut template = weekly_five();
        template.recurrence_end = Some("2025-01-01".parse().unwrap());
        let state = SaveState::new(template).advance().advance().advance();
        assert!(matches!(state, SaveState::Done { ref persisted } if persisted.is_empty()));
    }

    #[test]
    fn cancel_outside_persisting_is_noop() {
        let state = SaveState::new(weekly_five()).cancel();
        assert_eq!(state.name(), "draft");
    }

    #[tokio::test]
    async fn all_instances_are_created_in_order() {
        let store = ScriptedStore::default();
        let state = save_new(&store, weekly_five(), &CancellationToken::new()).await;

        let SaveState::Done { persisted } = state else {
            panic!("expected done");
        };
        assert_eq!(persisted.len(), 5);
        let sent = store.sent.lock().unwrap();
        assert!(sent.windows(2).all(|w| w[0].start < w[1].start));
        assert!(sent.iter().all(|e| !e.is_recurring));
        assert!(sent.iter().all(|e| e.title == "Ronda (Recurrente)"));
    }

    #[tokio::test]
    async fn non_recurring_event_is_sent_once_unchanged() {
        let store = ScriptedStore::default();
        let event = CalendarEvent::new("Visita", at("2025-01-06T08:00:00"));
        let state = save_new(&store, event.clone(), &CancellationToken::new()).await;

        assert_eq!(state.persisted().len(), 1);
        assert_eq!(store.sent.lock().unwrap().as_slice(), &[event]);
    }

    #[tokio::test]
    async fn failure_keeps_earlier_instances_and_stops() {
        let store = ScriptedStore {
            fail_at: Some(3),
            ..Default::default()
        };
        let state = save_new(&store, weekly_five(), &CancellationToken::new()).await;

        let SaveState::PartialFailure {
            persisted,
            failed,
            unsent,
            reason,
        } = state
        else {
            panic!("expected partial failure");
        };
        assert_eq!(persisted.len(), 2);
        assert_eq!(failed.map(|e| e.start), Some(at("2025-01-20T08:00:00")));
        assert_eq!(unsent.len(), 2);
        assert!(matches!(reason, FailureReason::Api(ApiError::Status { status: 500, .. })));
        assert_eq!(store.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn single_create_failure_persists_nothing() {
        let store = ScriptedStore {
            fail_at: Some(1),
            ..Default::default()
        };
        let event = CalendarEvent::new("Visita", at("2025-01-06T08:00:00"));
        let state = save_new(&store, event, &CancellationToken::new()).await;
        assert!(matches!(
            state,
            SaveState::PartialFailure { ref persisted, .. } if persisted.is_empty()
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_between_requests() {
        let token = CancellationToken::new();
        let store = ScriptedStore {
            cancel_after: Some((2, token.clone())),
            ..Default::default()
        };
        let state = save_new(&store, weekly_five(), &token).await;

        let SaveState::PartialFailure {
            persisted,
            failed,
            unsent,
            reason,
        } = state
        else {
            panic!("expected partial failure");
        };
        assert_eq!(persisted.len(), 2);
        assert!(failed.is_none());
        assert_eq!(unsent.len(), 3);
        assert!(matches!(reason, FailureReason::Cancelled));
        assert_eq!(store.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_before_start_sends_nothing() {
        let store = ScriptedStore::default();
        let token = CancellationToken::new();
        token.cancel();
        let state = save_new(&store, weekly_five(), &token).await;
        assert!(matches!(state, SaveState::PartialFailure { .. }));
        assert!(store.sent.lock().unwrap().is_empty());
    }
}
