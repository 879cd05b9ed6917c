//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `CliContext` - Resolved config and paths shared by every command
//! - `cmd_init` - Initialize the database and data directory
//! - `resolve_user` - The user a command acts as
//! - Saved login session helpers

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::debug;

use construtec_core::auth::{local_session, LOCAL_USER_EMAIL, LOCAL_USER_ID};
use construtec_core::config::{data_dir, default_config_path};
use construtec_core::{Config, Database, Error, Services, UserSession};

/// Everything resolved from global flags before a command runs
pub struct CliContext {
    pub db_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub config: Config,
}

impl CliContext {
    pub fn load(db_path: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path).context("Failed to load configuration")?;
        Ok(Self {
            db_path: db_path.to_path_buf(),
            config_path: config_path
                .map(Path::to_path_buf)
                .or_else(default_config_path),
            config,
        })
    }

    pub fn open_db(&self) -> Result<Database> {
        open_db(&self.db_path)
    }

    /// Advisor plus history/auth backends for this configuration
    pub fn services(&self) -> Result<Services> {
        Ok(Services::from_config(&self.config, self.open_db()?))
    }

    /// Where `login` keeps the access token
    pub fn session_file(&self) -> Result<PathBuf> {
        data_dir()
            .map(|dir| dir.join("session.json"))
            .context("Could not determine the data directory")
    }

    pub async fn resolve_user(&self, services: &Services) -> Result<UserSession> {
        resolve_user(services, &self.session_file()?).await
    }
}

/// Open (or create) the local database
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(ctx: &CliContext) -> Result<()> {
    println!("🔧 Initializing database at {}...", ctx.db_path.display());

    let db = ctx.open_db()?;

    // Searches made without logging in are stored under this user
    db.ensure_user(LOCAL_USER_ID, LOCAL_USER_EMAIL)
        .context("Failed to create the local user")?;
    println!("   Local user: {}", LOCAL_USER_EMAIL);

    if let Some(dir) = data_dir() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        println!("   Data directory: {}", dir.display());
    }

    if ctx.config.ai.api_key.is_none() && ctx.config.ai.backend == "gemini" {
        println!("   ⚠️  GEMINI_API_KEY is not set - searches will fail until it is");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Ask something: construtec search -c materiais tijolo 30x20");
    println!("  2. Start web UI: construtec serve");

    Ok(())
}

/// The user a command runs as
///
/// A saved login is checked against the auth provider. Without one, local
/// installs fall back to the fixed local user; Supabase installs need a login.
pub async fn resolve_user(services: &Services, session_file: &Path) -> Result<UserSession> {
    if let Some(saved) = load_session(session_file)? {
        return match services.auth.current_user(&saved.access_token).await {
            Ok(user) => {
                debug!(user = %user.user_id, "Using saved session");
                Ok(user)
            }
            Err(Error::Auth(_)) => {
                bail!("Session expired. Run `construtec login` again.")
            }
            Err(e) => Err(e.into()),
        };
    }

    if services.auth.name() == "local" {
        return Ok(local_session());
    }

    bail!("Not signed in. Run `construtec login` first.")
}

/// Saved login session, if any
pub fn load_session(path: &Path) -> Result<Option<UserSession>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&content) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            debug!(error = %e, "Ignoring unreadable session file");
            Ok(None)
        }
    }
}

pub fn save_session(path: &Path, session: &UserSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(session)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    // The file holds a bearer token
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Remove the saved session; true if there was one
pub fn clear_session(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(true)
}

/// Password from the flag, or one line from stdin
pub fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Palavra-passe: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}
