//! REST backend access.
//!
//! The backend is an opaque collaborator. Callers depend on the
//! [`EventStore`] and [`AuthBackend`] traits; [`ApiClient`] implements both
//! over HTTP.

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{LoginResponse, User, VerifyResponse};

use async_trait::async_trait;

use crate::calendar::{CalendarEvent, StoredEvent};
use crate::error::ApiError;

/// Persistence for calendar events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetch every stored event.
    async fn list_events(&self) -> Result<Vec<StoredEvent>, ApiError>;

    /// Store a new event; returns it with its server-assigned id.
    async fn create_event(&self, event: &CalendarEvent) -> Result<StoredEvent, ApiError>;

    /// Replace the fields of one stored event.
    async fn update_event(&self, id: i64, event: &CalendarEvent) -> Result<StoredEvent, ApiError>;

    /// Remove exactly one stored event.
    async fn delete_event(&self, id: i64) -> Result<(), ApiError>;
}

/// Backend login endpoints.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError>;

    async fn verify(&self, token: &str) -> Result<VerifyResponse, ApiError>;

    async fn logout(&self, token: &str) -> Result<(), ApiError>;
}
