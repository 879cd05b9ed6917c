//! Domain models for Construtec

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Search category. Selects the prompt template, the response shape and the
/// presentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Technical construction solutions (markdown prose)
    #[default]
    Solucoes,
    /// Material pricing (table of line items)
    Materiais,
    /// Company directory (table of companies)
    Empresas,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solucoes => "solucoes",
            Self::Materiais => "materiais",
            Self::Empresas => "empresas",
        }
    }

    pub fn all() -> &'static [Category] {
        &[Self::Solucoes, Self::Materiais, Self::Empresas]
    }

    /// Whether responses for this category are expected to be a JSON array
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Materiais | Self::Empresas)
    }

    /// Presentation tag for results of this category
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Solucoes => DataType::Text,
            Self::Materiais => DataType::Materiais,
            Self::Empresas => DataType::Empresas,
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "solucoes" | "soluções" | "solutions" => Ok(Self::Solucoes),
            "materiais" | "materials" => Ok(Self::Materiais),
            "empresas" | "companies" => Ok(Self::Empresas),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a message is presented: prose or one of the two table shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Text,
    Materiais,
    Empresas,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Materiais => "materiais",
            Self::Empresas => "empresas",
        }
    }

    /// Report heading shown above the result
    pub fn title(&self) -> &'static str {
        match self {
            Self::Text => "Parecer Técnico",
            Self::Materiais => "Mapa de Quantidades & Custos",
            Self::Empresas => "Registo de Entidades",
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "materiais" => Ok(Self::Materiais),
            "empresas" => Ok(Self::Empresas),
            _ => Err(format!("Unknown data type: {}", s)),
        }
    }
}

/// Missing or `null` descriptive fields read as empty strings
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A priced material found at a Portuguese retailer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialItem {
    pub produto: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub marca: String,
    pub preco_numerico: f64,
    /// Display price with currency and unit, e.g. "12,50 €/un"
    #[serde(default, deserialize_with = "null_as_default")]
    pub preco_texto: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub loja: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs: Option<String>,
}

/// A construction company or professional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyItem {
    pub nome: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub local: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacto: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub especialidade: String,
}

/// Parsed line items. Serialized as a bare JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredData {
    Materials(Vec<MaterialItem>),
    Companies(Vec<CompanyItem>),
}

impl StructuredData {
    /// Parse a JSON array as the line-item shape of `category`
    pub fn from_json(json: &str, category: Category) -> crate::Result<Self> {
        match category {
            Category::Materiais => Ok(Self::Materials(serde_json::from_str(json)?)),
            Category::Empresas => Ok(Self::Companies(serde_json::from_str(json)?)),
            Category::Solucoes => Err(crate::Error::InvalidData(
                "solucoes has no structured shape".into(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Materials(items) => items.len(),
            Self::Companies(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Materials(_) => DataType::Materiais,
            Self::Companies(_) => DataType::Empresas,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A web source the AI service used to ground its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

/// Normalized outcome of one advice call
///
/// At most one of `text` (non-empty) and `structured` is populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdviceResult {
    pub text: String,
    pub structured: Option<StructuredData>,
    pub citations: Vec<Citation>,
}

impl AdviceResult {
    /// The string handed to the history store for the assistant message
    pub fn stored_content(&self) -> crate::Result<String> {
        match &self.structured {
            Some(data) => data.to_json(),
            None => Ok(self.text.clone()),
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Shown as the "model" side in the UI
    #[serde(alias = "model")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" | "model" => Ok(Self::Assistant),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Presentation-facing message, created once per search round-trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StructuredData>,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub sources: Vec<Citation>,
}

impl Message {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: Some(content.to_string()),
            data: None,
            data_type: DataType::Text,
            sources: Vec::new(),
        }
    }

    /// Prose-only assistant message (errors, fallbacks)
    pub fn assistant_text(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.to_string()),
            data: None,
            data_type: DataType::Text,
            sources: Vec::new(),
        }
    }
}

/// A stored search session (one query/response pair)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySession {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A raw message row as the history store returns it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    /// Present for rows written by this service; absent for legacy rows
    #[serde(default)]
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
}

/// The authenticated user, passed explicitly to anything that needs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for c in Category::all() {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), *c);
        }
        assert!("tijolos".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_data_type() {
        assert!(!Category::Solucoes.is_data());
        assert_eq!(Category::Materiais.data_type(), DataType::Materiais);
        assert_eq!(Category::Empresas.data_type(), DataType::Empresas);
    }

    #[test]
    fn test_structured_data_serializes_as_bare_array() {
        let data = StructuredData::Companies(vec![CompanyItem {
            nome: "Obras Lda".into(),
            local: "Braga".into(),
            contacto: "253 000 000".into(),
            especialidade: "Remodelações".into(),
        }]);
        let json = data.to_json().unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"contacto\""));
    }

    #[test]
    fn test_material_optional_fields_omitted() {
        let item = MaterialItem {
            produto: "Cimento 25kg".into(),
            marca: "Secil".into(),
            preco_numerico: 4.99,
            preco_texto: "4,99 €/saco".into(),
            loja: "Maxmat".into(),
            link: None,
            obs: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("link"));
        assert!(!json.contains("obs"));
    }

    #[test]
    fn test_role_accepts_model_alias() {
        let role: Role = serde_json::from_str("\"model\"").unwrap();
        assert_eq!(role, Role::Assistant);
        assert_eq!("model".parse::<Role>().unwrap(), Role::Assistant);
    }

    #[test]
    fn test_stored_content_prefers_structured() {
        let result = AdviceResult {
            text: String::new(),
            structured: Some(StructuredData::Materials(vec![])),
            citations: vec![],
        };
        assert_eq!(result.stored_content().unwrap(), "[]");
    }
}
