//! Service configuration
//!
//! ## Configuration Resolution
//!
//! Later layers win:
//! 1. Embedded defaults (compiled into binary)
//! 2. Override file (~/.local/share/construtec/config.toml, or an explicit path)
//! 3. Process environment (binaries load `.env` into it first)
//! 4. Values baked in at build time, used only when nothing above set them
//!
//! Missing secrets are not errors here. The Gemini key is checked when a
//! search runs; a missing Supabase pair selects local history and accounts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/construtec.toml");

/// AI backend settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Backend name (gemini, mock)
    pub backend: String,
    pub host: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Upper bound for one advice call
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            host: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Hosted history + auth backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

/// Resolved configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub ai: AiConfig,
    /// `None` means local SQLite history and accounts
    pub supabase: Option<SupabaseConfig>,
}

impl Config {
    /// Resolve configuration from every layer
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        Self::load_with(override_path, |name| std::env::var(name).ok())
    }

    /// Resolve every layer, reading the environment through `lookup`
    fn load_with<F>(override_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut supabase = SupabaseParts::default();
        let mut config = load_file(override_path, &mut supabase)?;
        config.apply_env(&mut supabase, lookup);
        config.apply_build_env(&mut supabase);
        config.supabase = supabase.resolve();
        Ok(config)
    }

    /// Whether history and accounts live in Supabase
    pub fn uses_supabase(&self) -> bool {
        self.supabase.is_some()
    }

    /// Apply environment variables through `lookup`
    ///
    /// Empty values count as unset.
    fn apply_env<F>(&mut self, supabase: &mut SupabaseParts, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |names: &[&str]| {
            names
                .iter()
                .filter_map(|n| lookup(n))
                .find(|v| !v.trim().is_empty())
        };

        if let Some(key) = get(&["GEMINI_API_KEY"]) {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = get(&["GEMINI_MODEL"]) {
            self.ai.model = model;
        }
        if let Some(host) = get(&["GEMINI_HOST"]) {
            self.ai.host = host;
        }
        if let Some(backend) = get(&["AI_BACKEND"]) {
            self.ai.backend = backend;
        }
        if let Some(secs) = get(&["CONSTRUTEC_AI_TIMEOUT_SECS"]) {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.ai.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %secs, "Ignoring invalid CONSTRUTEC_AI_TIMEOUT_SECS"),
            }
        }

        supabase.layer(
            get(&["SUPABASE_URL", "VITE_SUPABASE_URL"]),
            get(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"]),
        );
    }

    fn apply_build_env(&mut self, supabase: &mut SupabaseParts) {
        if self.ai.api_key.is_none() {
            self.ai.api_key = option_env!("GEMINI_API_KEY")
                .filter(|k| !k.is_empty())
                .map(str::to_string);
        }

        let baked = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);
        supabase.fill(
            baked(option_env!("SUPABASE_URL").or(option_env!("VITE_SUPABASE_URL"))),
            baked(option_env!("SUPABASE_ANON_KEY").or(option_env!("VITE_SUPABASE_ANON_KEY"))),
        );
    }
}

/// Supabase URL and anon key collected separately across layers
///
/// Each half resolves on its own, so the pair may come from different
/// layers. It is only checked once every layer has been applied.
#[derive(Debug, Default)]
struct SupabaseParts {
    url: Option<String>,
    anon_key: Option<String>,
}

impl SupabaseParts {
    /// Later layer: set halves replace earlier ones
    fn layer(&mut self, url: Option<String>, anon_key: Option<String>) {
        if url.is_some() {
            self.url = url;
        }
        if anon_key.is_some() {
            self.anon_key = anon_key;
        }
    }

    /// Fallback layer: only fills halves nothing else set
    fn fill(&mut self, url: Option<String>, anon_key: Option<String>) {
        self.url = self.url.take().or(url);
        self.anon_key = self.anon_key.take().or(anon_key);
    }

    /// The pair is only usable when both halves resolve
    fn resolve(self) -> Option<SupabaseConfig> {
        match (self.url, self.anon_key) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("Supabase URL and anon key must both be set; using local history");
                None
            }
            (None, None) => None,
        }
    }
}

/// Default override file location
pub fn default_config_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("config.toml"))
}

/// Per-user data directory (database, session token, overrides)
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("construtec"))
}

/// Load the file layers (embedded default, then override)
fn load_file(override_path: Option<&Path>, supabase: &mut SupabaseParts) -> Result<Config> {
    let mut config = Config::default();
    parse_raw(DEFAULT_CONFIG)?.apply(&mut config, supabase);

    let path = override_path
        .map(Path::to_path_buf)
        .or_else(default_config_path);

    if let Some(path) = path.filter(|p| p.exists()) {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?;
        parse_raw(&content)?.apply(&mut config, supabase);
        tracing::debug!(path = %path.display(), "Loaded config override");
    }

    Ok(config)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    ai: Option<RawAi>,
    supabase: Option<RawSupabase>,
}

#[derive(Debug, Deserialize)]
struct RawAi {
    backend: Option<String>,
    host: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawSupabase {
    url: Option<String>,
    anon_key: Option<String>,
}

impl RawConfig {
    fn apply(self, config: &mut Config, supabase: &mut SupabaseParts) {
        if let Some(ai) = self.ai {
            if let Some(backend) = ai.backend {
                config.ai.backend = backend;
            }
            if let Some(host) = ai.host {
                config.ai.host = host;
            }
            if let Some(model) = ai.model {
                config.ai.model = model;
            }
            if let Some(key) = ai.api_key.filter(|k| !k.is_empty()) {
                config.ai.api_key = Some(key);
            }
            if let Some(secs) = ai.timeout_secs.filter(|s| *s > 0) {
                config.ai.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(raw) = self.supabase {
            supabase.layer(
                raw.url.filter(|v| !v.is_empty()),
                raw.anon_key.filter(|v| !v.is_empty()),
            );
        }
    }
}

fn parse_raw(content: &str) -> Result<RawConfig> {
    toml::from_str(content).map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))
}
