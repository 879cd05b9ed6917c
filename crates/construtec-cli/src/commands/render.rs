//! Terminal rendering of search results

use construtec_core::table::{citation_lines, columns, price_label, tel_link, unit_label};
use construtec_core::{DataType, Message, Role, SortDirection, StructuredData, TableState};

use super::truncate;

/// Widest a cell may get before it is cut
const MAX_CELL: usize = 40;

/// Render an assistant message: prose or a titled table, then sources
pub fn render_message(message: &Message, state: &TableState) -> String {
    let mut out = String::new();

    match &message.data {
        Some(data) => {
            out.push_str(&format!("📋 {}\n\n", message.data_type.title()));
            out.push_str(&render_table(data, state));
        }
        None => {
            let content = message.content.as_deref().unwrap_or_default();
            if message.role == Role::User {
                out.push_str(&format!("› {}", content));
            } else {
                out.push_str(content);
            }
        }
    }

    let sources = citation_lines(&message.sources);
    if !sources.is_empty() {
        out.push_str("\n\nFontes:\n");
        out.push_str(&sources.join("\n"));
    }

    out
}

/// Aligned text table of the filtered, sorted view
pub fn render_table(data: &StructuredData, state: &TableState) -> String {
    let data_type = data.data_type();
    let view = state.apply(data);

    let headers: Vec<String> = columns(data_type)
        .iter()
        .map(|col| match &state.sort {
            Some(sort) if sort.key == col.key => {
                let arrow = match sort.direction {
                    SortDirection::Asc => "▲",
                    SortDirection::Desc => "▼",
                };
                format!("{} {}", col.header, arrow)
            }
            _ => col.header.to_string(),
        })
        .collect();

    let rows = rows(&view);
    if rows.is_empty() {
        return if state.filter.is_empty() {
            "(sem resultados)".to_string()
        } else {
            format!("Nenhuma linha contém \"{}\".", state.filter)
        };
    }

    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.as_slice())];
    out.push("-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    out.extend(rows.iter().map(|row| line(row.as_slice())));

    if data_type == DataType::Materiais {
        out.push(String::new());
        out.push(format!("{} de {} itens", view.len(), data.len()));
    }

    out.join("\n")
}

fn rows(view: &StructuredData) -> Vec<Vec<String>> {
    match view {
        StructuredData::Materials(items) => items
            .iter()
            .map(|item| {
                vec![
                    truncate(&item.produto, MAX_CELL),
                    truncate(&item.marca, MAX_CELL),
                    truncate(&item.loja, MAX_CELL),
                    format!("{} / {}", price_label(item), unit_label(item)),
                ]
            })
            .collect(),
        StructuredData::Companies(items) => items
            .iter()
            .map(|item| {
                vec![
                    truncate(&item.nome, MAX_CELL),
                    truncate(&item.local, MAX_CELL),
                    format!("{} ({})", item.contacto, tel_link(&item.contacto)),
                    truncate(&item.especialidade, MAX_CELL),
                ]
            })
            .collect(),
    }
}
