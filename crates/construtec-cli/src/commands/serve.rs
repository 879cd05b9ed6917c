//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::CliContext;

pub async fn cmd_serve(
    ctx: &CliContext,
    host: &str,
    port: u16,
    no_auth: bool,
    static_dir: Option<&Path>,
    allowed_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Construtec web server...");
    println!("   Database: {}", ctx.db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let services = ctx.services()?;

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: bearer tokens ({})", services.auth.name());
    }
    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let config = construtec_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
    };

    let static_dir_str = match static_dir {
        Some(dir) => Some(dir.to_str().context("static_dir path must be valid UTF-8")?),
        None => None,
    };
    construtec_server::serve(services, host, port, static_dir_str, config).await?;

    Ok(())
}
