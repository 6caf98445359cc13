pub mod auth;
pub mod config;
pub mod events;

use chrono::Utc;
use itdesk_core::{ActionGate, ApiClient, Config, KeyringStore, Session};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a backend-facing command needs.
pub struct Backend {
    pub config: Config,
    pub api: ApiClient,
    pub session: Session<KeyringStore>,
}

/// Load config, build the client and restore the stored session.
///
/// An unreadable credential store leaves the session anonymous.
pub async fn connect() -> itdesk_core::Result<Backend> {
    let config = Config::load()?;
    let mut api = ApiClient::from_config(&config.effective_backend())?;
    let gate = ActionGate::new(config.session.gate_ttl()?);
    let mut session = Session::new(KeyringStore::default(), gate);
    session.restore(&api, Utc::now()).await?;
    api.set_token(session.token().map(str::to_string));
    Ok(Backend {
        config,
        api,
        session,
    })
}
