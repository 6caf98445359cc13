//! User session: bearer token, current user and the action gate.
//!
//! A `Session` is created once at startup, restored from the credential
//! store, handed to whatever needs it, and cleared on logout. Nothing in
//! here is global.
//!
//! ## Action gate
//!
//! Destructive actions need a recent password confirmation. Confirming
//! opens the gate for a fixed time (10 minutes by default); it closes on
//! expiry or logout. Confirmation is checked by the backend's login
//! endpoint, never against a value stored on the client.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::{AuthBackend, User};
use crate::error::{ApiError, SessionError};

const TOKEN_KEY: &str = "session_token";
const GATE_KEY: &str = "action_gate_until";

/// Remaining gate time at which users get an expiry warning.
pub const GATE_WARNING_MINUTES: i64 = 2;

/// Key/value storage for session credentials.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn delete(&self, key: &str) -> Result<(), SessionError>;
}

/// Credentials kept in the OS keyring.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new("itdesk")
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let entry = keyring::Entry::new(&self.service, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let entry = keyring::Entry::new(&self.service, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SessionError> {
        let entry = keyring::Entry::new(&self.service, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process credential store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Time-limited permission for destructive actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionGate {
    ttl: Duration,
    open_until: Option<DateTime<Utc>>,
}

impl ActionGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            open_until: None,
        }
    }

    /// Open until `now + ttl`, saturating at the end of the calendar range.
    pub fn open(&mut self, now: DateTime<Utc>) {
        self.open_until = Some(
            now.checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
    }

    pub fn close(&mut self) {
        self.open_until = None;
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.open_until.is_some_and(|until| now <= until)
    }

    pub fn open_until(&self) -> Option<DateTime<Utc>> {
        self.open_until
    }

    /// Whole minutes left, zero when closed.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.open_until
            .map(|until| (until - now).num_minutes().max(0))
            .unwrap_or(0)
    }

    /// True while open with at most [`GATE_WARNING_MINUTES`] left.
    pub fn should_warn(&self, now: DateTime<Utc>) -> bool {
        self.open_until
            .is_some_and(|until| now <= until && until - now <= Duration::minutes(GATE_WARNING_MINUTES))
    }
}

impl Default for ActionGate {
    fn default() -> Self {
        Self::new(Duration::minutes(10))
    }
}

/// The logged-in (or anonymous) user session.
pub struct Session<S: CredentialStore> {
    store: S,
    token: Option<String>,
    user: Option<User>,
    gate: ActionGate,
}

impl<S: CredentialStore> Session<S> {
    /// An anonymous session backed by `store`.
    pub fn new(store: S, gate: ActionGate) -> Self {
        Self {
            store,
            token: None,
            user: None,
            gate,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn gate(&self) -> &ActionGate {
        &self.gate
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    /// Load the stored token and check it with the backend.
    ///
    /// An invalid token, a failed request, or a network error all clear the
    /// stored credentials. An unreadable credential store leaves the session
    /// anonymous. Returns whether the session is authenticated.
    pub async fn restore<A: AuthBackend + ?Sized>(
        &mut self,
        auth: &A,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let token = match self.store.get(TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, "credential store unreadable, continuing anonymously");
                return Ok(false);
            }
        };

        match auth.verify(&token).await {
            Ok(resp) if resp.valid => match resp.user {
                Some(user) => {
                    self.token = Some(token);
                    self.user = Some(user);
                    self.restore_gate(now);
                    tracing::debug!("session restored");
                    Ok(true)
                }
                None => {
                    self.clear_quietly();
                    Ok(false)
                }
            },
            Ok(_) => {
                tracing::info!("stored session token rejected by backend");
                self.clear_quietly();
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token verification failed");
                self.clear_quietly();
                Ok(false)
            }
        }
    }

    fn restore_gate(&mut self, now: DateTime<Utc>) {
        let until = match self.store.get(GATE_KEY) {
            Ok(raw) => raw
                .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!(error = %e, "stored action gate unreadable");
                None
            }
        };
        match until {
            Some(until) if now <= until => {
                self.gate.open_until = Some(until);
            }
            Some(_) => {
                self.gate.close();
                if let Err(e) = self.store.delete(GATE_KEY) {
                    tracing::warn!(error = %e, "could not remove expired action gate");
                }
            }
            None => self.gate.close(),
        }
    }

    /// Log in with the backend and persist the returned token.
    ///
    /// A fresh login also opens the action gate.
    pub async fn login<A: AuthBackend + ?Sized>(
        &mut self,
        auth: &A,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<&User, SessionError> {
        let resp = auth
            .login(username, password)
            .await
            .map_err(login_error)?;

        let (token, user) = match (resp.success, resp.token, resp.user) {
            (true, Some(token), Some(user)) => (token, user),
            _ => {
                return Err(SessionError::LoginRejected(
                    resp.error
                        .unwrap_or_else(|| "Invalid user data received".to_string()),
                ))
            }
        };

        self.store.set(TOKEN_KEY, &token)?;
        self.token = Some(token);
        self.open_gate(now)?;
        tracing::info!(user = %user.username, "logged in");
        Ok(&*self.user.insert(user))
    }

    /// Re-check the current user's password and open the action gate.
    pub async fn confirm_action<A: AuthBackend + ?Sized>(
        &mut self,
        auth: &A,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let username = self
            .user
            .as_ref()
            .map(|u| u.username.clone())
            .ok_or(SessionError::NotAuthenticated)?;

        let resp = auth
            .login(&username, password)
            .await
            .map_err(login_error)?;
        if !resp.success {
            return Err(SessionError::LoginRejected(
                resp.error.unwrap_or_else(|| "Contraseña incorrecta".to_string()),
            ));
        }
        self.open_gate(now)
    }

    /// Ok when a destructive action may proceed right now.
    pub fn authorize_action(&self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        if self.gate.is_open(now) {
            Ok(())
        } else {
            Err(SessionError::ConfirmationRequired)
        }
    }

    fn open_gate(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.gate.open(now);
        if let Some(until) = self.gate.open_until() {
            self.store.set(GATE_KEY, &until.to_rfc3339())?;
        }
        Ok(())
    }

    /// Tell the backend and drop local state. Local state is cleared even
    /// when the request fails.
    ///
    /// A credential store failure is reported after local state is gone.
    pub async fn logout<A: AuthBackend + ?Sized>(&mut self, auth: &A) -> Result<(), SessionError> {
        let token = match self.token.clone() {
            Some(token) => Some(token),
            None => self.store.get(TOKEN_KEY).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "credential store unreadable during logout");
                None
            }),
        };
        if let Some(token) = token {
            if let Err(e) = auth.logout(&token).await {
                tracing::warn!(error = %e, "logout request failed");
            }
        }
        self.clear()?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Drop in-memory state, then try every stored key. Returns the first
    /// store error.
    fn clear(&mut self) -> Result<(), SessionError> {
        self.token = None;
        self.user = None;
        self.gate.close();
        let token = self.store.delete(TOKEN_KEY);
        let gate = self.store.delete(GATE_KEY);
        token.and(gate)
    }

    fn clear_quietly(&mut self) {
        if let Err(e) = self.clear() {
            tracing::warn!(error = %e, "could not remove stored credentials");
        }
    }
}

fn login_error(err: ApiError) -> SessionError {
    match err {
        ApiError::Status { message, .. } => SessionError::LoginRejected(message),
        other => SessionError::Api(other),
    }
}
