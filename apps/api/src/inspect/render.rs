use serde_json::Value;

use super::{Report, Section};

const INDEX_HEADER: &str = "(index)";
const VALUES_HEADER: &str = "Values";

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Column headers in order of first appearance across the rows. Scalar rows
/// share a single `Values` column.
fn headers(rows: &[Value]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        match row.as_object() {
            Some(obj) => {
                for key in obj.keys() {
                    if !headers.iter().any(|h| h == key) {
                        headers.push(key.clone());
                    }
                }
            }
            None => {
                if !headers.iter().any(|h| h == VALUES_HEADER) {
                    headers.push(VALUES_HEADER.to_string());
                }
            }
        }
    }
    headers
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}", segments.join(&mid.to_string()))
}

fn line(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!(" {c:<w$} "))
        .collect();
    format!("│{}│", padded.join("│"))
}

/// Box-drawn table with an index column, in the spirit of `console.table`.
pub fn render_table(rows: &[Value]) -> String {
    let columns = headers(rows);

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    grid.push(
        std::iter::once(INDEX_HEADER.to_string())
            .chain(columns.iter().cloned())
            .collect(),
    );
    for (i, row) in rows.iter().enumerate() {
        let mut cells = vec![i.to_string()];
        for column in &columns {
            let value = match row.as_object() {
                Some(obj) => obj.get(column).map(cell).unwrap_or_default(),
                None if column == VALUES_HEADER => cell(row),
                None => String::new(),
            };
            cells.push(value);
        }
        grid.push(cells);
    }

    let widths: Vec<usize> = (0..grid[0].len())
        .map(|col| {
            grid.iter()
                .map(|r| r[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = vec![border(&widths, '┌', '┬', '┐'), line(&grid[0], &widths)];
    out.push(border(&widths, '├', '┼', '┤'));
    for r in &grid[1..] {
        out.push(line(r, &widths));
    }
    out.push(border(&widths, '└', '┴', '┘'));
    out.join("\n")
}

pub fn render_report(report: &Report) -> String {
    let mut out = Vec::new();
    for section in &report.sections {
        match section {
            Section::Text(text) => out.push(text.clone()),
            Section::Table(rows) => out.push(render_table(rows)),
            Section::Record(value) => {
                out.push(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
            }
            Section::Keys(keys) => out.extend(keys.iter().map(|k| format!("  - {k}"))),
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_layout() {
        let rows = vec![
            json!({ "table_name": "jobs" }),
            json!({ "table_name": "tracks_applicationrecord" }),
        ];
        let rendered = render_table(&rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("(index)"));
        assert!(lines[4].contains("tracks_applicationrecord"));
        let widths: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_scalar_rows_use_values_column() {
        let rendered = render_table(&[json!("jobs"), json!(3)]);
        assert!(rendered.contains("Values"));
        assert!(rendered.contains("jobs"));
    }

    #[test]
    fn test_missing_keys_render_blank() {
        let rows = vec![json!({ "a": 1 }), json!({ "b": null })];
        let rendered = render_table(&rows);
        assert!(rendered.contains("null"));
        assert_eq!(headers(&rows), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let rendered = render_table(&[]);
        assert_eq!(rendered.lines().count(), 4);
    }

    #[test]
    fn test_report_renders_keys_as_list() {
        let report = Report {
            sections: vec![
                Section::Text("Table columns (from record sample):".to_string()),
                Section::Keys(vec!["company".to_string(), "id".to_string()]),
            ],
            used_fallback: true,
        };
        assert_eq!(
            render_report(&report),
            "Table columns (from record sample):\n  - company\n  - id"
        );
    }
}
