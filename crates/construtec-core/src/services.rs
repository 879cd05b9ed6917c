//! Backend wiring shared by the CLI and the server
//!
//! A resolved Supabase pair moves history and accounts to Supabase;
//! otherwise both stay in the local SQLite database.

use std::sync::Arc;

use tracing::info;

use crate::advisor::Advisor;
use crate::ai::AdviceBackend;
use crate::auth::{AuthProvider, LocalAuth, SupabaseAuth};
use crate::config::Config;
use crate::db::Database;
use crate::history::{HistoryStore, SupabaseStore};

#[derive(Clone)]
pub struct Services {
    pub advisor: Advisor,
    pub history: Arc<dyn HistoryStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Services {
    pub fn new(advisor: Advisor, history: Arc<dyn HistoryStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            advisor,
            history,
            auth,
        }
    }

    pub fn from_config(config: &Config, db: Database) -> Self {
        let advisor = Advisor::from_config(config);
        let services = match &config.supabase {
            Some(supabase) => Self::new(
                advisor,
                Arc::new(SupabaseStore::from_config(supabase)),
                Arc::new(SupabaseAuth::from_config(supabase)),
            ),
            None => Self::local(advisor, db),
        };
        info!(
            ai = services.advisor.client().host(),
            history = services.history.name(),
            auth = services.auth.name(),
            "Backends configured"
        );
        services
    }

    /// History and accounts in `db`
    pub fn local(advisor: Advisor, db: Database) -> Self {
        Self::new(advisor, Arc::new(db.clone()), Arc::new(LocalAuth::new(db)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupabaseConfig;

    #[test]
    fn test_local_without_supabase_pair() {
        let db = Database::in_memory().unwrap();
        let services = Services::from_config(&Config::default(), db);
        assert_eq!(services.history.name(), "sqlite");
        assert_eq!(services.auth.name(), "local");
    }

    #[test]
    fn test_supabase_pair_selects_remote_backends() {
        let db = Database::in_memory().unwrap();
        let config = Config {
            supabase: Some(SupabaseConfig {
                url: "https://x.supabase.co".into(),
                anon_key: "anon".into(),
            }),
            ..Default::default()
        };
        let services = Services::from_config(&config, db);
        assert_eq!(services.history.name(), "supabase");
        assert_eq!(services.auth.name(), "supabase");
    }
}
