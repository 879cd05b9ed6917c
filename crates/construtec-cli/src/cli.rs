//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use construtec_core::TableState;

/// Construtec - Construction advice for the Portuguese market
#[derive(Parser)]
#[command(name = "construtec")]
#[command(about = "Construction solutions, material prices and companies, grounded in web search", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Local database path (history and accounts when Supabase is not configured)
    #[arg(long, default_value = "construtec.db", global = true)]
    pub db: PathBuf,

    /// Configuration file (defaults to the data directory's config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and data directory
    Init,

    /// Ask for advice
    Search {
        /// The question, e.g. "tijolo 30x20"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Category: solucoes, materiais, empresas
        #[arg(short, long, default_value = "solucoes")]
        category: String,

        #[command(flatten)]
        view: TableArgs,

        /// Don't save the search to history
        #[arg(long)]
        no_save: bool,

        /// Print the result message as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse saved searches
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage AI prompts (list, show, customize)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },

    /// Show configuration and backend status
    Status,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// Every request then runs as the fixed local user.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },
}

/// Sort and filter options for table results
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Sort rows by field (e.g. preco_numerico, loja, nome, local)
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Only rows containing this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,
}

impl TableArgs {
    /// `--desc` requests the same key twice, like a second header click
    pub fn table_state(&self) -> TableState {
        let mut state = TableState {
            sort: None,
            filter: self.filter.clone().unwrap_or_default(),
        };
        if let Some(key) = &self.sort {
            state.request_sort(key);
            if self.desc {
                state.request_sort(key);
            }
        }
        state
    }
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List saved searches, newest first
    List,

    /// Show one saved search
    Show {
        /// Session ID
        id: String,

        #[command(flatten)]
        view: TableArgs,
    },

    /// Delete a saved search
    Delete {
        /// Session ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (solucoes, materiais, empresas)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
