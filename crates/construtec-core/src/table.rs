//! Table view over structured results
//!
//! Sort and filter are always recomputed from the full source rows, never
//! from a previous view.

use std::cmp::Ordering;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Citation, CompanyItem, DataType, MaterialItem, StructuredData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Single-key sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Sort and filter state of one rendered table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    #[serde(default)]
    pub sort: Option<SortConfig>,
    #[serde(default)]
    pub filter: String,
}

impl TableState {
    /// Clicking the current ascending key flips it to descending; anything
    /// else sorts ascending by `key`
    pub fn request_sort(&mut self, key: &str) {
        let direction = match &self.sort {
            Some(current) if current.key == key && current.direction == SortDirection::Asc => {
                SortDirection::Desc
            }
            _ => SortDirection::Asc,
        };
        self.sort = Some(SortConfig {
            key: key.to_string(),
            direction,
        });
    }

    /// Filtered, then sorted, copy of `data`
    pub fn apply(&self, data: &StructuredData) -> StructuredData {
        match data {
            StructuredData::Materials(rows) => StructuredData::Materials(self.view(rows)),
            StructuredData::Companies(rows) => StructuredData::Companies(self.view(rows)),
        }
    }

    fn view<R: TableRow + Clone>(&self, rows: &[R]) -> Vec<R> {
        let needle = self.filter.to_lowercase();
        let mut out: Vec<R> = rows
            .iter()
            .filter(|row| needle.is_empty() || row.matches(&needle))
            .cloned()
            .collect();

        if let Some(sort) = &self.sort {
            // `sort_by` is stable: equal keys keep their source order
            out.sort_by(|a, b| {
                let ord = compare_cells(a.cell(&sort.key), b.cell(&sort.key));
                match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        out
    }
}

/// A sortable field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// Missing < number < text; numbers that do not compare (NaN) tie
fn compare_cells(a: Option<Cell<'_>>, b: Option<Cell<'_>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Cell::Number(x)), Some(Cell::Number(y))) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(Cell::Text(x)), Some(Cell::Text(y))) => x.cmp(y),
        (Some(Cell::Number(_)), Some(Cell::Text(_))) => Ordering::Less,
        (Some(Cell::Text(_)), Some(Cell::Number(_))) => Ordering::Greater,
    }
}

/// Row access for sorting and filtering
pub trait TableRow {
    /// Value of field `key`, if the row has it
    fn cell(&self, key: &str) -> Option<Cell<'_>>;

    /// String form of every present field
    fn field_strings(&self) -> Vec<String>;

    /// Case-insensitive substring match; `needle` must already be lowercase
    fn matches(&self, needle: &str) -> bool {
        self.field_strings()
            .iter()
            .any(|v| v.to_lowercase().contains(needle))
    }
}

impl TableRow for MaterialItem {
    fn cell(&self, key: &str) -> Option<Cell<'_>> {
        match key {
            "produto" => Some(Cell::Text(&self.produto)),
            "marca" => Some(Cell::Text(&self.marca)),
            "preco_numerico" => Some(Cell::Number(self.preco_numerico)),
            "preco_texto" => Some(Cell::Text(&self.preco_texto)),
            "loja" => Some(Cell::Text(&self.loja)),
            "link" => self.link.as_deref().map(Cell::Text),
            "obs" => self.obs.as_deref().map(Cell::Text),
            _ => None,
        }
    }

    fn field_strings(&self) -> Vec<String> {
        let mut fields = vec![
            self.produto.clone(),
            self.marca.clone(),
            self.preco_numerico.to_string(),
            self.preco_texto.clone(),
            self.loja.clone(),
        ];
        fields.extend(self.link.clone());
        fields.extend(self.obs.clone());
        fields
    }
}

impl TableRow for CompanyItem {
    fn cell(&self, key: &str) -> Option<Cell<'_>> {
        match key {
            "nome" => Some(Cell::Text(&self.nome)),
            "local" => Some(Cell::Text(&self.local)),
            "contacto" => Some(Cell::Text(&self.contacto)),
            "especialidade" => Some(Cell::Text(&self.especialidade)),
            _ => None,
        }
    }

    fn field_strings(&self) -> Vec<String> {
        vec![
            self.nome.clone(),
            self.local.clone(),
            self.contacto.clone(),
            self.especialidade.clone(),
        ]
    }
}

/// Column definition for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub header: &'static str,
    pub key: &'static str,
    pub sortable: bool,
}

const MATERIAL_COLUMNS: &[Column] = &[
    Column { header: "Item", key: "produto", sortable: true },
    Column { header: "Marca", key: "marca", sortable: true },
    Column { header: "Fornecedor", key: "loja", sortable: true },
    Column { header: "Custo Unit.", key: "preco_numerico", sortable: true },
];

const COMPANY_COLUMNS: &[Column] = &[
    Column { header: "Entidade", key: "nome", sortable: true },
    Column { header: "Zona", key: "local", sortable: true },
    Column { header: "Contacto", key: "contacto", sortable: false },
    Column { header: "Especialidade", key: "especialidade", sortable: false },
];

/// Columns shown for a data type (none for prose)
pub fn columns(data_type: DataType) -> &'static [Column] {
    match data_type {
        DataType::Materiais => MATERIAL_COLUMNS,
        DataType::Empresas => COMPANY_COLUMNS,
        DataType::Text => &[],
    }
}

/// Price cell, e.g. "5.50 €"
pub fn price_label(item: &MaterialItem) -> String {
    format!("{:.2} €", item.preco_numerico)
}

/// Unit taken from the display price ("5,50 €/m2" -> "m2"), default "un"
pub fn unit_label(item: &MaterialItem) -> &str {
    item.preco_texto
        .split('/')
        .nth(1)
        .filter(|unit| !unit.is_empty())
        .unwrap_or("un")
}

/// `tel:` link for a company contact, keeping only digits and `+`
pub fn tel_link(contact: &str) -> String {
    let strip = Regex::new(r"[^\d+]").expect("valid regex");
    format!("tel:{}", strip.replace_all(contact, ""))
}

/// Numbered citation lines: "[1] title - url"
pub fn citation_lines(citations: &[Citation]) -> Vec<String> {
    citations
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {} - {}", i + 1, c.title, c.url))
        .collect()
}
