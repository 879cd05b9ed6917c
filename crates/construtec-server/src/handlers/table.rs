//! Table view handler
//!
//! Sorting and filtering are recomputed from the full array on every call,
//! so clients send the full source rows back with the view state.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::AppError;
use construtec_core::history::detect_structured;
use construtec_core::table::{columns, Column};
use construtec_core::{Category, DataType, StructuredData, TableState};

/// Request body for a table view
#[derive(Debug, Deserialize)]
pub struct TableRequest {
    /// The full, unsorted rows
    pub data: serde_json::Value,
    /// Which line-item shape `data` holds; guessed from the rows when absent.
    /// Required for an empty array, which has no rows to guess from.
    pub category: Option<Category>,
    #[serde(flatten)]
    pub state: TableState,
}

/// A sorted and filtered view
#[derive(Serialize)]
pub struct TableResponse {
    pub data_type: DataType,
    pub title: &'static str,
    pub columns: &'static [Column],
    pub rows: StructuredData,
    /// Rows before filtering
    pub total: usize,
    #[serde(flatten)]
    pub state: TableState,
}

/// POST /api/table
pub async fn table_view(Json(req): Json<TableRequest>) -> Result<Json<TableResponse>, AppError> {
    let data = match req.category {
        Some(category) if category.is_data() => {
            StructuredData::from_json(&req.data.to_string(), category)
                .map_err(|_| AppError::bad_request("Dados da tabela inválidos."))?
        }
        Some(_) => return Err(AppError::bad_request("Categoria sem tabela.")),
        None if req.data.as_array().is_some_and(Vec::is_empty) => {
            return Err(AppError::bad_request("Categoria obrigatória para tabela vazia."))
        }
        None => detect_structured(&req.data.to_string())
            .ok_or_else(|| AppError::bad_request("Dados da tabela inválidos."))?,
    };

    let data_type = data.data_type();
    let rows = req.state.apply(&data);

    Ok(Json(TableResponse {
        data_type,
        title: data_type.title(),
        columns: columns(data_type),
        total: data.len(),
        rows,
        state: req.state,
    }))
}
