//! Prompt Library for the advice call
//!
//! System instructions are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/construtec/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! This allows users to tune instructions without modifying the source,
//! while automatically getting new default prompts on upgrade.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::Category;

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const SOLUCOES: &str = include_str!("../../../prompts/solucoes.md");
    pub const MATERIAIS: &str = include_str!("../../../prompts/materiais.md");
    pub const EMPRESAS: &str = include_str!("../../../prompts/empresas.md");
}

/// Known prompt IDs, one per search category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    Solucoes,
    Materiais,
    Empresas,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solucoes => "solucoes",
            Self::Materiais => "materiais",
            Self::Empresas => "empresas",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[Self::Solucoes, Self::Materiais, Self::Empresas]
    }

    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Solucoes => Self::Solucoes,
            Category::Materiais => Self::Materiais,
            Category::Empresas => Self::Empresas,
        }
    }

    /// Get the default embedded content for this prompt
    fn default_content(&self) -> &'static str {
        match self {
            Self::Solucoes => defaults::SOLUCOES,
            Self::Materiais => defaults::MATERIAIS,
            Self::Empresas => defaults::EMPRESAS,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<Category>().map(Self::for_category)
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// Search category the prompt serves
    pub category: Category,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// Body after the frontmatter
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// The `# System` section, or the whole body when there is none
    pub fn system_instruction(&self) -> &str {
        extract_section(&self.content, "# System").unwrap_or(self.content.trim())
    }
}

/// Embedded prompts plus optional per-user overrides, cached after first load
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: RwLock<HashMap<PromptId, Prompt>>,
}

impl PromptLibrary {
    /// Overrides from the user's data directory
    pub fn new() -> Self {
        Self::from_dir(default_prompts_dir())
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self::from_dir(Some(path))
    }

    /// Ignore overrides entirely (tests, reproducible runs)
    pub fn embedded_only() -> Self {
        Self::from_dir(None)
    }

    fn from_dir(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: PromptId) -> Result<Prompt> {
        if let Some(hit) = self.cache.read().ok().and_then(|c| c.get(&id).cloned()) {
            return Ok(hit);
        }

        let prompt = match self.override_path(id).filter(|p| p.exists()) {
            Some(path) => {
                let text = fs::read_to_string(&path).map_err(|e| {
                    Error::InvalidData(format!("Cannot read prompt {}: {}", path.display(), e))
                })?;
                let (metadata, content) = parse_prompt(&text)?;
                tracing::debug!(prompt = id.as_str(), path = %path.display(), "Using prompt override");
                Prompt {
                    metadata,
                    content,
                    is_override: true,
                    override_path: Some(path),
                }
            }
            None => {
                let (metadata, content) = parse_prompt(id.default_content())?;
                Prompt {
                    metadata,
                    content,
                    is_override: false,
                    override_path: None,
                }
            }
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(id, prompt.clone());
        }
        Ok(prompt)
    }

    /// System instruction for a search category
    pub fn system_instruction(&self, category: Category) -> Result<String> {
        let prompt = self.get(PromptId::for_category(category))?;
        Ok(prompt.system_instruction().to_string())
    }

    /// One entry per category; a broken override shows as version 0
    pub fn list(&self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let loaded = self.get(id).ok();
                let override_path = self.override_path(id).filter(|p| p.exists());
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: loaded.as_ref().map_or(0, |p| p.metadata.version),
                    category: loaded
                        .as_ref()
                        .map(|p| p.metadata.category.to_string())
                        .unwrap_or_default(),
                    has_override: override_path.is_some(),
                    override_path,
                }
            })
            .collect()
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_path(id).is_some_and(|p| p.exists())
    }

    fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.md", id.as_str())))
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub category: String,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("construtec").join("prompts").join("overrides"))
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(Error::InvalidData(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    }

    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];

    // Next top-level header or end of content
    let end = after_header.find("\n# ").unwrap_or(after_header.len());

    Some(after_header[..end].trim())
}
