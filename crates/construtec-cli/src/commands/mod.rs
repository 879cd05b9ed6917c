//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared context, init, user resolution and the saved login
//! - `history` - Saved search commands (list, show, delete)
//! - `prompts` - Prompt library management commands
//! - `render` - Terminal rendering of prose and tables
//! - `search` - The search command
//! - `serve` - Web server command
//! - `session` - Account commands (login, signup, logout, whoami)
//! - `status` - Configuration and backend status

pub mod core;
pub mod history;
pub mod prompts;
pub mod render;
pub mod search;
pub mod serve;
pub mod session;
pub mod status;

// Re-export command functions for main.rs
pub use self::core::*;
pub use history::*;
pub use prompts::*;
pub use render::*;
pub use search::*;
pub use serve::*;
pub use session::*;
pub use status::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
