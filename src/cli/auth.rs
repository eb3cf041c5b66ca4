use std::io::IsTerminal;

use anyhow::{Context, Result, anyhow, bail};

use crate::auth::models::UserCreate;
use crate::cases::models::LearnerLevel;
use crate::client::ApiClient;

const PASSWORD_ENV: &str = "ECHO_PASSWORD";

/// Password from `ECHO_PASSWORD`, otherwise read from the terminal
/// without echo.
fn prompt_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    if !std::io::stdin().is_terminal() {
        bail!("Cannot prompt for a password without a terminal, set {}", PASSWORD_ENV);
    }
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    let password = password.trim().to_string();
    if password.is_empty() {
        return Err(anyhow!("Password is required"));
    }
    Ok(password)
}

pub async fn register(
    client: &ApiClient,
    email: String,
    name: Option<String>,
    level: LearnerLevel,
    institution: Option<String>,
) -> Result<()> {
    let password = prompt_password()?;
    if password.len() < 8 {
        return Err(anyhow!("Password must be at least 8 characters"));
    }
    let data = UserCreate {
        email,
        password,
        name,
        level,
        specialty_interest: None,
        institution,
    };
    let tokens = client.register(&data).await?;
    match tokens.user {
        Some(user) => println!("Registered and signed in as {}.", user.email),
        None => println!("Registered and signed in."),
    }
    Ok(())
}

pub async fn login(client: &ApiClient, email: &str) -> Result<()> {
    let password = prompt_password()?;
    let tokens = client.login(email, &password).await?;
    let who = tokens
        .user
        .as_ref()
        .and_then(|u| u.name.clone())
        .unwrap_or_else(|| email.to_string());
    println!("Signed in as {}.", who);
    Ok(())
}
