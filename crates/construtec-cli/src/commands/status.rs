//! Status command implementation

use std::fs;

use anyhow::Result;

use construtec_core::AdviceBackend;

use super::{load_session, CliContext};

pub async fn cmd_status(ctx: &CliContext) -> Result<()> {
    let ai = &ctx.config.ai;

    println!();
    println!("📊 Construtec Status");
    println!("   ─────────────────────────────────────────────────────────────");

    match &ctx.config_path {
        Some(path) if path.exists() => println!("   Config: {}", path.display()),
        Some(path) => println!("   Config: built-in defaults ({} not found)", path.display()),
        None => println!("   Config: built-in defaults"),
    }

    // AI backend
    println!();
    println!("   AI backend: {} ({})", ai.backend, ai.host);
    println!("   Model: {}", ai.model);
    println!("   Timeout: {}s", ai.timeout.as_secs());
    if ai.api_key.is_some() {
        println!("   🔑 GEMINI_API_KEY: set");
    } else if ai.backend == "gemini" {
        println!("   ❌ GEMINI_API_KEY: not set");
    }

    // Storage
    println!();
    println!("   Database: {}", ctx.db_path.display());
    if ctx.db_path.exists() {
        if let Ok(metadata) = fs::metadata(&ctx.db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let services = match ctx.services() {
        Ok(services) => services,
        Err(e) => {
            println!();
            println!("   ❌ Error opening database: {}", e);
            println!();
            return Ok(());
        }
    };

    match &ctx.config.supabase {
        Some(supabase) => println!("   History & accounts: supabase ({})", supabase.url),
        None => println!(
            "   History & accounts: {} / {} (local)",
            services.history.name(),
            services.auth.name()
        ),
    }

    if let Ok(path) = ctx.session_file() {
        match load_session(&path)? {
            Some(session) => println!("   Signed in: {}", session.email),
            None => println!("   Signed in: no"),
        }
    }

    // Connectivity
    println!();
    if services.advisor.client().health_check().await {
        println!("   ✅ AI backend reachable");
    } else {
        println!("   ⚠️  AI backend not responding or key missing");
    }

    println!();
    Ok(())
}
