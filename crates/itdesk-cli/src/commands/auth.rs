use chrono::Utc;
use clap::Subcommand;

use super::{connect, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in to the backend and store the session token
    Login {
        #[arg(long, short)]
        username: String,
        #[arg(long, short)]
        password: String,
    },
    /// Log out and remove the stored token
    Logout,
    /// Show the current user and action gate
    Status,
}

pub async fn run(action: AuthAction) -> CliResult {
    let mut backend = connect().await?;
    let now = Utc::now();

    match action {
        AuthAction::Login { username, password } => {
            let user = backend
                .session
                .login(&backend.api, &username, &password, now)
                .await?;
            println!("logged in as {}", user.username);
        }
        AuthAction::Logout => {
            backend.session.logout(&backend.api).await?;
            println!("logged out");
        }
        AuthAction::Status => {
            let Some(user) = backend.session.user() else {
                println!("not logged in");
                return Ok(());
            };
            println!("logged in as {}", user.username);
            if let Some(role) = &user.role {
                println!("role: {role}");
            }
            let gate = backend.session.gate();
            if gate.is_open(now) {
                println!(
                    "destructive actions allowed for {} more minute(s)",
                    gate.remaining_minutes(now)
                );
            } else {
                println!("destructive actions need password confirmation");
            }
        }
    }
    Ok(())
}
