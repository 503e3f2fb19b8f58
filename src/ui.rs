use crate::domain::TVError;
use crate::model::TableView;
use crate::record::Record;

pub const COLUMN_WIDTH_MARGIN: usize = 2;
pub const MAX_COLUMN_WIDTH: usize = 40;

fn get_visible_name(name: &str, width: usize) -> String {
    if width < 3 {
        return String::new();
    }
    if name.chars().count() > width {
        let mut reduced: String = name.chars().take(width - 3).collect();
        reduced.push_str("...");
        reduced
    } else {
        name.to_string()
    }
}

fn cell(record: &Record, column: &str) -> String {
    record
        .get(column)
        .map(|v| v.to_string())
        .unwrap_or_default()
        .replace("\r\n", " ↵ ")
        .replace('\n', " ↵ ")
}

fn calculate_column_width(column: &str, cells: &[String]) -> usize {
    let content = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);
    std::cmp::min(
        std::cmp::max(column.chars().count(), content),
        MAX_COLUMN_WIDTH,
    )
}

/// The current page as an aligned text table followed by a status line.
pub fn render_table(view: &TableView) -> String {
    let rows = view.visible_slice();
    let columns = view.columns();
    let cells: Vec<Vec<String>> = columns
        .iter()
        .map(|c| rows.iter().map(|r| cell(r, c)).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .zip(cells.iter())
        .map(|(c, data)| calculate_column_width(c, data))
        .collect();

    let line = |values: Vec<String>| -> String {
        values
            .iter()
            .zip(widths.iter())
            .map(|(v, &w)| format!("{:<w$}", get_visible_name(v, w)))
            .collect::<Vec<String>>()
            .join(" ".repeat(COLUMN_WIDTH_MARGIN).as_str())
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 3);
    out.push(line(columns.to_vec()));
    out.push(line(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for ridx in 0..rows.len() {
        out.push(line(cells.iter().map(|c| c[ridx].clone()).collect()));
    }
    out.push(status_line(view));
    out.join("\n")
}

pub fn status_line(view: &TableView) -> String {
    let mut status = format!(
        "page {}/{} ({} rows)",
        view.page(),
        view.total_pages(),
        view.filtered().len()
    );
    if !view.filter_text().is_empty() {
        status.push_str(&format!(", filter \"{}\"", view.filter_text()));
    }
    if let Some(column) = view.sort_column() {
        status.push_str(&format!(", sorted by {} {}", column, view.sort_direction()));
    }
    status
}

/// The current page as a JSON array, restricted to the configured columns.
pub fn render_json(view: &TableView) -> Result<String, TVError> {
    let rows: Vec<Record> = view
        .visible_slice()
        .into_iter()
        .map(|r| r.project(view.columns()))
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}
