//! Query enrichment
//!
//! Rewrites the raw user query into the category-specific prompt that is
//! sent to the AI service. The raw query is always embedded verbatim.

use crate::models::Category;

/// Build the enriched prompt for `query` in `category`
pub fn enrich_query(query: &str, category: Category) -> String {
    match category {
        Category::Materiais => format!(
            "Encontrar preços reais em Portugal para: \"{}\". Lojas como Leroy Merlin, Maxmat.",
            query
        ),
        Category::Empresas => format!(
            "Encontrar uma lista abrangente (mínimo 10 resultados) de empresas de construção em Portugal para: \"{}\". Priorizar quem tem contacto.",
            query
        ),
        Category::Solucoes => format!(
            "Solução técnica construtiva para: \"{}\". Contexto Portugal.",
            query
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_embeds_query_for_every_category() {
        let queries = [
            "tijolo 30x20x15",
            "canalizador em Setúbal",
            "isolamento de cobertura plana",
            "",
            "aspas \"dentro\" e {chavetas}",
        ];
        for query in queries {
            for category in Category::all() {
                let enriched = enrich_query(query, *category);
                assert!(
                    enriched.contains(query),
                    "{} prompt lost the query {:?}",
                    category,
                    query
                );
            }
        }
    }

    #[test]
    fn test_materials_mentions_vendors() {
        let enriched = enrich_query("cimento", Category::Materiais);
        assert!(enriched.contains("Leroy Merlin"));
        assert!(enriched.contains("Maxmat"));
        assert!(enriched.contains("Portugal"));
    }

    #[test]
    fn test_companies_asks_for_minimum_results() {
        let enriched = enrich_query("pintores Porto", Category::Empresas);
        assert!(enriched.contains("mínimo 10 resultados"));
        assert!(enriched.contains("contacto"));
    }

    #[test]
    fn test_solutions_sets_jurisdiction() {
        let enriched = enrich_query("humidade em paredes", Category::Solucoes);
        assert_eq!(
            enriched,
            "Solução técnica construtiva para: \"humidade em paredes\". Contexto Portugal."
        );
    }
}
