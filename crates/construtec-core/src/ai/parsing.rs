//! JSON parsing helpers for AI backend responses
//!
//! The search-grounded models cannot be forced into a JSON response mode, so
//! replies for the data categories often arrive wrapped in markdown fences or
//! with commentary before/after the array. These helpers dig the array out.

use regex::Regex;

use crate::error::{Error, Result};
use crate::models::{Category, StructuredData};

/// Longest raw excerpt carried in parse error messages
const RAW_EXCERPT_CHARS: usize = 200;

/// Remove markdown code-fence markers (```` ```json ```` and ```` ``` ````) and trim
pub fn strip_code_fences(response: &str) -> String {
    let json_fence = Regex::new(r"```json\n?").expect("valid regex");
    let without_json = json_fence.replace_all(response, "");
    without_json.replace("```", "").trim().to_string()
}

/// Slice from the first `[` to the last `]`, or return the input unchanged
/// when there is no such pair
pub fn extract_json_array(response: &str) -> &str {
    match (response.find('['), response.rfind(']')) {
        (Some(s), Some(e)) if s < e => &response[s..=e],
        _ => response,
    }
}

/// Parse the line items for `category` out of a raw AI reply
pub fn parse_line_items(response: &str, category: Category) -> Result<StructuredData> {
    let cleaned = strip_code_fences(response);
    let json_str = extract_json_array(&cleaned);

    StructuredData::from_json(json_str, category).map_err(|e| {
        Error::Parse(format!(
            "Invalid {} JSON from AI: {} | Raw: {}",
            category,
            e,
            excerpt(json_str)
        ))
    })
}

/// First characters of `text` for log and error messages
pub fn excerpt(text: &str) -> String {
    if text.chars().count() > RAW_EXCERPT_CHARS {
        let head: String = text.chars().take(RAW_EXCERPT_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        let response = "```json\n[{\"a\": 1}]\n```";
        assert_eq!(strip_code_fences(response), "[{\"a\": 1}]");

        let bare = "```\n[]\n```";
        assert_eq!(strip_code_fences(bare), "[]");
    }

    #[test]
    fn test_extract_json_array_with_text() {
        let response = r#"Aqui estão os resultados:
[{"nome": "Obras Silva"}]
Espero que ajude!"#;
        assert_eq!(extract_json_array(response), r#"[{"nome": "Obras Silva"}]"#);
    }

    #[test]
    fn test_extract_json_array_without_brackets() {
        let response = "Sem resultados relevantes.";
        assert_eq!(extract_json_array(response), response);
    }

    #[test]
    fn test_extract_keeps_nested_arrays() {
        let response = r#"[{"a": [1, 2]}, {"b": []}] fim"#;
        assert_eq!(extract_json_array(response), r#"[{"a": [1, 2]}, {"b": []}]"#);
    }

    #[test]
    fn test_parse_line_items_materials() {
        let response = r#"```json
[{"produto":"Tijolo","marca":"X","preco_numerico":5.5,"preco_texto":"5,50 €/un","loja":"Y"}]
```"#;
        let data = parse_line_items(response, Category::Materiais).unwrap();
        match data {
            StructuredData::Materials(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].produto, "Tijolo");
                assert_eq!(items[0].preco_numerico, 5.5);
            }
            other => panic!("expected materials, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_items_wrong_shape_fails() {
        // A companies array is not a valid materials array
        let response = r#"[{"nome":"A","local":"B","contacto":"C","especialidade":"D"}]"#;
        let err = parse_line_items(response, Category::Materiais).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_excerpt_is_char_safe() {
        let long = "ção".repeat(150);
        let short = excerpt(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), RAW_EXCERPT_CHARS + 3);
    }
}
