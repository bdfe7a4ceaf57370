use scribe_core::auth::SessionPersistence;
use scribe_core::config::ProjectCredentials;

use crate::auth::{auth_client, AuthClient};
use crate::cli::AuthCommands;
use crate::error::CliError;

fn configured_client() -> Result<AuthClient, CliError> {
    let project = ProjectCredentials::from_env()?.ok_or(CliError::NotConfigured)?;
    Ok(auth_client(&project)?)
}

pub async fn run_auth(command: AuthCommands) -> Result<(), CliError> {
    let client = configured_client()?;

    match command {
        AuthCommands::Login { email, password } => {
            let session = client.sign_in(&email, &password).await?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in to {} as {email_label}", client.project_url());
        }
        AuthCommands::Status => match client.restore_session().await? {
            Some(session) => {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Signed in to {} as {} (expires_at={})",
                    client.project_url(),
                    email_label,
                    session.expires_at
                );
            }
            None => println!("Not signed in to {}", client.project_url()),
        },
        AuthCommands::Logout => {
            if let Some(session) = client.persistence().load()? {
                client.sign_out(&session.access_token).await?;
            } else {
                client.persistence().clear()?;
            }
            println!("Signed out of {}", client.project_url());
        }
    }

    Ok(())
}
