//! Construtec CLI - Construction advisory for the Portuguese market
//!
//! Usage:
//!   construtec init                              Initialize database
//!   construtec search -c materiais tijolo 30x20  Ask for prices
//!   construtec history                           Browse saved searches
//!   construtec serve --port 3000                 Start web server

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use commands::CliContext;
use construtec_core::Category;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // API keys may live in a .env file next to the project
    let _ = dotenvy::dotenv();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let ctx = CliContext::load(&cli.db, cli.config.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&ctx),
        Commands::Search {
            query,
            category,
            view,
            no_save,
            json,
        } => {
            let category: Category = category
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Use solucoes, materiais or empresas")?;
            let services = ctx.services()?;
            let user = ctx.resolve_user(&services).await?;
            commands::cmd_search(
                &services,
                &user,
                &query.join(" "),
                category,
                &view.table_state(),
                !no_save,
                json,
            )
            .await
        }
        Commands::History { action } => {
            let services = ctx.services()?;
            let user = ctx.resolve_user(&services).await?;
            match action {
                None | Some(HistoryAction::List) => commands::cmd_history_list(&services, &user).await,
                Some(HistoryAction::Show { id, view }) => {
                    commands::cmd_history_show(&services, &user, &id, &view.table_state()).await
                }
                Some(HistoryAction::Delete { id }) => {
                    commands::cmd_history_delete(&services, &user, &id).await
                }
            }
        }
        Commands::Login { email, password } => {
            let password = commands::password_or_prompt(password)?;
            let services = ctx.services()?;
            commands::cmd_login(&services, &ctx.session_file()?, &email, &password).await
        }
        Commands::Signup { email, password } => {
            let password = commands::password_or_prompt(password)?;
            let services = ctx.services()?;
            commands::cmd_signup(&services, &ctx.session_file()?, &email, &password).await
        }
        Commands::Logout => {
            let services = ctx.services()?;
            commands::cmd_logout(&services, &ctx.session_file()?).await
        }
        Commands::Whoami => {
            let services = ctx.services()?;
            commands::cmd_whoami(&services, &ctx.session_file()?).await
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
        Commands::Status => commands::cmd_status(&ctx).await,
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
            allowed_origins,
        } => {
            commands::cmd_serve(
                &ctx,
                &host,
                port,
                no_auth,
                static_dir.as_deref(),
                allowed_origins,
            )
            .await
        }
    }
}
