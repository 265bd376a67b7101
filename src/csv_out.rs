use crate::errors::AppError;
use crate::grouping::GroupTree;
use crate::model::{DISPLAY_TIME_FIELD, SENTINEL_DISPLAY, SENTINEL_MINUTES, SORT_MINUTES_FIELD};
use csv::Writer;
use std::io::Write;
use std::path::Path;

// Spreadsheets evaluate cells starting with these as formulas.
fn excel_guard(s: &str) -> String {
    s.trim_start_matches(['=', '+', '@']).to_string()
}

pub fn write_tree_json<W: Write>(tree: &GroupTree<'_>, writer: W) -> Result<(), AppError> {
    serde_json::to_writer_pretty(writer, tree)
        .map_err(|e| AppError::IO(format!("json write: {}", e)))
}

/// One row per grouped record: level keys, display time, sort key, extra columns.
pub fn write_csv_to<W: Write>(
    tree: &GroupTree<'_>,
    level_names: &[String],
    columns: &[String],
    writer: W,
) -> Result<usize, AppError> {
    let mut wtr = Writer::from_writer(writer);

    // Header (once per file)
    let mut header: Vec<String> = level_names.to_vec();
    header.push("display_time".into());
    header.push("sort_minutes".into());
    header.extend(columns.iter().cloned());
    wtr.write_record(&header)
        .map_err(|e| AppError::IO(format!("csv write header: {}", e)))?;

    let rows = tree.flatten();
    for (path, r) in &rows {
        let mut row: Vec<String> = path.iter().map(|k| excel_guard(k)).collect();
        row.push(r.text(DISPLAY_TIME_FIELD).unwrap_or_else(|| SENTINEL_DISPLAY.to_string()));
        row.push(
            r.get(SORT_MINUTES_FIELD)
                .and_then(|v| v.as_u64())
                .unwrap_or(SENTINEL_MINUTES as u64)
                .to_string(),
        );
        for c in columns {
            row.push(excel_guard(&r.text(c).unwrap_or_default()));
        }
        wtr.write_record(&row)
            .map_err(|e| AppError::IO(format!("csv write row: {}", e)))?;
    }

    wtr.flush().map_err(|e| AppError::IO(format!("csv flush: {}", e)))?;
    Ok(rows.len())
}

pub fn write_csv(
    tree: &GroupTree<'_>,
    level_names: &[String],
    columns: &[String],
    out_path: &Path,
) -> Result<usize, AppError> {
    let f = std::fs::File::create(out_path)
        .map_err(|e| AppError::IO(format!("open out csv '{}': {}", out_path.display(), e)))?;
    write_csv_to(tree, level_names, columns, f)
}
