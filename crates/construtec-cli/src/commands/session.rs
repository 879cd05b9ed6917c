//! Account command implementations (login, signup, logout, whoami)

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use construtec_core::auth::CONFIRM_EMAIL_MESSAGE;
use construtec_core::{Services, SignUpOutcome};

use super::{clear_session, load_session, save_session};

pub async fn cmd_login(
    services: &Services,
    session_file: &Path,
    email: &str,
    password: &str,
) -> Result<()> {
    let session = services
        .auth
        .sign_in(email.trim(), password)
        .await
        .context("Login failed")?;
    save_session(session_file, &session)?;

    println!("✅ Signed in as {} ({})", session.email, services.auth.name());
    Ok(())
}

pub async fn cmd_signup(
    services: &Services,
    session_file: &Path,
    email: &str,
    password: &str,
) -> Result<()> {
    match services
        .auth
        .sign_up(email.trim(), password)
        .await
        .context("Sign-up failed")?
    {
        SignUpOutcome::SignedIn(session) => {
            save_session(session_file, &session)?;
            println!("✅ Account created, signed in as {}", session.email);
        }
        SignUpOutcome::ConfirmationRequired { email } => {
            println!("📧 {}", CONFIRM_EMAIL_MESSAGE);
            println!("   Then run: construtec login --email {}", email);
        }
    }
    Ok(())
}

pub async fn cmd_logout(services: &Services, session_file: &Path) -> Result<()> {
    let Some(session) = load_session(session_file)? else {
        println!("Not signed in.");
        return Ok(());
    };

    // The local copy goes even if the provider already forgot the token
    if let Err(e) = services.auth.sign_out(&session).await {
        warn!(error = %e, "Sign-out request failed");
    }
    clear_session(session_file)?;

    println!("👋 Signed out {}", session.email);
    Ok(())
}

pub async fn cmd_whoami(services: &Services, session_file: &Path) -> Result<()> {
    let Some(saved) = load_session(session_file)? else {
        if services.auth.name() == "local" {
            println!("Not signed in (searches are saved as the local user).");
        } else {
            println!("Not signed in. Run `construtec login`.");
        }
        return Ok(());
    };

    match services.auth.current_user(&saved.access_token).await {
        Ok(user) => {
            println!("{}", user.email);
            println!("   User ID: {}", user.user_id);
            println!("   Provider: {}", services.auth.name());
        }
        Err(e) => {
            println!("❌ Saved session for {} is no longer valid: {}", saved.email, e);
            println!("   Run `construtec login` again.");
        }
    }
    Ok(())
}
