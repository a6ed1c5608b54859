mod config;
pub mod quick_start;
mod text;
use log::{debug, info, warn};

use std::collections::HashSet;

pub use crate::config::*;
pub use crate::text::*;

// **** Loading ****

/// Builds a table from the raw cells of a feedback export.
///
/// The columns are mapped by position onto [SCHEMA]. The header must have
/// exactly [SCHEMA_SIZE] columns, and so must every row: nothing is returned if
/// one of them does not.
///
/// Arguments:
/// * `header` the first row of the source, as read
/// * `rows` the data rows, without the header
pub fn table_from_rows(header: &[String], rows: &[Vec<String>]) -> Result<Table, FeedbackError> {
    if header.len() != SCHEMA_SIZE {
        return Err(FeedbackError::SchemaMismatch {
            expected: SCHEMA_SIZE,
            actual: header.len(),
        });
    }
    let headers: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
    for (h, name) in headers.iter().zip(SCHEMA.iter()) {
        debug!("table_from_rows: column {:?} -> {}", h, name);
    }

    let mut res: Vec<Response> = Vec::new();
    for (idx, cells) in rows.iter().enumerate() {
        // The header is the first line.
        let lineno = idx + 2;
        if cells.len() != SCHEMA_SIZE {
            return Err(FeedbackError::RowLength {
                lineno,
                expected: SCHEMA_SIZE,
                actual: cells.len(),
            });
        }
        res.push(read_response(lineno, cells));
    }
    info!("Loaded {} responses", res.len());
    Ok(Table { headers, rows: res })
}

/// Removes the line breaks that form tools put in long question titles.
pub fn normalize_header(h: &str) -> String {
    h.trim().replace(['\n', '\r'], "")
}

fn read_response(lineno: usize, cells: &[String]) -> Response {
    let mut scores: [Option<f64>; NUM_SCORES] = [None; NUM_SCORES];
    for field in ScoreField::ALL {
        scores[field.index()] = read_score(lineno, field, &cells[field.column()]);
    }
    Response {
        role: cells[ROLE_COLUMN].trim().to_string(),
        scores,
        useful_content: read_text(&cells[USEFUL_CONTENT_COLUMN]),
        attractive_part: read_text(&cells[TextField::AttractivePart.column()]),
        suggestions: read_text(&cells[TextField::Suggestions.column()]),
        feedback_to_lecturer: read_text(&cells[TextField::FeedbackToLecturer.column()]),
        additional_comments: read_text(&cells[TextField::AdditionalComments.column()]),
    }
}

fn read_score(lineno: usize, field: ScoreField, cell: &str) -> Option<f64> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() => {
            if !(1.0..=5.0).contains(&x) {
                warn!(
                    "line {}: {} = {} is outside of the 1-5 scale",
                    lineno,
                    field.name(),
                    x
                );
            }
            Some(x)
        }
        _ => {
            warn!(
                "line {}: {}: could not read {:?} as a score, ignoring it",
                lineno,
                field.name(),
                s
            );
            None
        }
    }
}

/// Blank cells are absent. The others are kept verbatim.
fn read_text(cell: &str) -> Option<String> {
    if cell.trim().is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

// **** Filtering ****

/// Keeps the responses whose role is one of `selected_roles`.
///
/// An empty selection means that no filter is applied: the whole table is
/// returned, not an empty one.
///
/// ```
/// use feedback_stats::*;
///
/// let t = Table::default();
/// assert_eq!(filter_roles(&t, &[]), t);
/// ```
pub fn filter_roles(table: &Table, selected_roles: &[String]) -> Table {
    if selected_roles.is_empty() {
        debug!("filter_roles: empty selection, keeping all {} rows", table.len());
        return table.clone();
    }
    let selected: HashSet<&str> = selected_roles.iter().map(|s| s.as_str()).collect();
    let rows: Vec<Response> = table
        .rows
        .iter()
        .filter(|r| selected.contains(r.role.as_str()))
        .cloned()
        .collect();
    debug!(
        "filter_roles: {:?} -> {} of {} rows",
        selected_roles,
        rows.len(),
        table.len()
    );
    Table {
        headers: table.headers.clone(),
        rows,
    }
}

// **** Aggregation ****

/// The arithmetic mean of the values present in the column.
pub fn column_mean(table: &Table, field: ScoreField) -> Option<f64> {
    let values: Vec<f64> = table.rows.iter().filter_map(|r| r.score(field)).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / (values.len() as f64))
    }
}

/// Computes the mean of every column of the set, sorted by increasing mean.
///
/// Ties keep the order of the column set. Columns without any value are put
/// at the end.
pub fn aggregate(table: &Table, column_set: &ColumnSet) -> Vec<ColumnMean> {
    let mut res: Vec<ColumnMean> = column_set
        .columns
        .iter()
        .map(|(field, label)| ColumnMean {
            field: *field,
            label: label.clone(),
            mean: column_mean(table, *field),
        })
        .collect();
    // sort_by is stable.
    res.sort_by(|a, b| match (a.mean, b.mean) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    debug!("aggregate: {:?}", res);
    res
}

pub fn kpis(table: &Table) -> Kpis {
    Kpis {
        total_responses: table.len(),
        avg_overall_satisfaction: column_mean(table, ScoreField::SOverall),
    }
}

// **** Listing ****

/// Numbers the responses of the (filtered) table from 1.
///
/// The numbers say nothing about the position in the unfiltered table.
pub fn list_responses(table: &Table) -> Vec<ListedResponse> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, r)| ListedResponse {
            index: idx + 1,
            role: r.role.clone(),
            attractive_part: r.attractive_part.clone().unwrap_or_default(),
            suggestions: r.suggestions.clone().unwrap_or_default(),
            feedback_to_lecturer: r.feedback_to_lecturer.clone().unwrap_or_default(),
            additional_comments: r
                .additional_comments
                .clone()
                .filter(|s| !s.trim().is_empty()),
        })
        .collect()
}
