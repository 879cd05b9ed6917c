//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod health;
pub mod history;
pub mod search;
pub mod table;

// Re-export all handlers for use in router
pub use auth::*;
pub use health::*;
pub use history::*;
pub use search::*;
pub use table::*;
