// src/utils/csv.rs

/// Builds a CSV block from a header row and data rows.
///
/// Plain comma-join, no quoting: the exported columns (numbers, names,
/// class labels) do not carry commas.
pub fn rows_to_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in rows {
        lines.push(row.join(","));
    }
    lines.join("\n")
}

/// Joins titled CSV blocks into one export document, one blank line
/// between sections.
pub fn sections_to_csv(sections: &[(&str, String)]) -> String {
    sections
        .iter()
        .map(|(title, body)| format!("{}\n{}", title, body))
        .collect::<Vec<_>>()
        .join("\n\n")
}
