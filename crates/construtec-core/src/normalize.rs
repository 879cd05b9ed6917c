//! Result normalization
//!
//! Turns the raw AI reply into either prose or structured line items.
//! Parse failures never escape: the raw text is kept as prose instead.

use tracing::{debug, warn};

use crate::ai::parsing::{excerpt, parse_line_items};
use crate::models::{Category, StructuredData};

/// Normalized reply: exactly one of `text` (non-empty) or `data` is meaningful
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub text: String,
    pub data: Option<StructuredData>,
}

/// Normalize a raw reply for `category`
///
/// Prose categories pass through unchanged. Data categories try to extract a
/// JSON array; on success the prose is emptied so the result is not rendered
/// twice, on failure the raw reply is returned untouched with no data.
pub fn normalize(raw: &str, category: Category) -> Normalized {
    if !category.is_data() {
        return Normalized {
            text: raw.to_string(),
            data: None,
        };
    }

    match parse_line_items(raw, category) {
        Ok(data) => {
            debug!(category = %category, rows = data.len(), "Parsed structured reply");
            Normalized {
                text: String::new(),
                data: Some(data),
            }
        }
        Err(e) => {
            warn!(category = %category, error = %e, "Structured reply did not parse, keeping prose");
            debug!(raw = %excerpt(raw), "Raw reply");
            Normalized {
                text: raw.to_string(),
                data: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_material_array() {
        let raw = "```json\n[{\"produto\":\"Tijolo\",\"marca\":\"X\",\"preco_numerico\":5.5,\"preco_texto\":\"5,50 €/un\",\"loja\":\"Y\"}]\n```";
        let result = normalize(raw, Category::Materiais);
        assert_eq!(result.text, "");
        match result.data {
            Some(StructuredData::Materials(items)) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].produto, "Tijolo");
            }
            other => panic!("expected materials, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_for_data_category_falls_back() {
        let raw = "Sem resultados relevantes.";
        let result = normalize(raw, Category::Materiais);
        assert_eq!(result.text, raw);
        assert!(result.data.is_none());
    }

    #[test]
    fn test_invalid_json_returns_raw_text_untouched() {
        let raw = "```json\n[{\"nome\": \"Obras\",]\n```";
        let result = normalize(raw, Category::Empresas);
        assert_eq!(result.text, raw);
        assert!(result.data.is_none());
    }

    #[test]
    fn test_array_surrounded_by_prose() {
        let raw = "Encontrei estas empresas:\n[{\"nome\":\"Obras Lda\",\"local\":\"Braga\",\"contacto\":\"253 000 000\",\"especialidade\":\"Telhados\"}]\nBoa sorte!";
        let result = normalize(raw, Category::Empresas);
        assert!(result.text.is_empty());
        let data = result.data.unwrap();
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_rows_with_missing_or_null_fields_still_parse() {
        let raw = "```json\n[{\"produto\":\"Tijolo\",\"preco_numerico\":5.5,\"marca\":null},{\"produto\":\"Areia\",\"preco_numerico\":2.0,\"loja\":\"Y\"}]\n```";
        let result = normalize(raw, Category::Materiais);
        assert!(result.text.is_empty());
        match result.data {
            Some(StructuredData::Materials(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].marca, "");
                assert_eq!(items[0].loja, "");
                assert_eq!(items[1].preco_texto, "");
                assert_eq!(items[1].loja, "Y");
            }
            other => panic!("expected materials, got {:?}", other),
        }

        let raw = "[{\"nome\":\"Obras Lda\",\"local\":null,\"especialidade\":\"Telhados\"}]";
        match normalize(raw, Category::Empresas).data {
            Some(StructuredData::Companies(items)) => {
                assert_eq!(items[0].local, "");
                assert_eq!(items[0].contacto, "");
                assert_eq!(items[0].especialidade, "Telhados");
            }
            other => panic!("expected companies, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_array_is_valid_data() {
        let result = normalize("[]", Category::Empresas);
        assert!(result.text.is_empty());
        let data = result.data.unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_prose_category_is_untouched() {
        let raw = "```json\n[1,2,3]\n```\n**Nota**";
        let result = normalize(raw, Category::Solucoes);
        assert_eq!(result.text, raw);
        assert!(result.data.is_none());
    }
}
