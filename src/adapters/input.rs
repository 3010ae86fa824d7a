use crate::utils::error::{HarvestError, Result};
use calamine::{open_workbook_auto, Reader};
use std::path::Path;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Reads the identifier column of the input table: the first sheet of a
/// workbook, or a CSV export.
///
/// Cells are trimmed, blanks and `nan` are skipped, and a trailing `.0`
/// left behind by spreadsheet float formatting is removed. Input order is
/// kept and duplicates are left in place; the scheduler collapses them.
pub fn load_identifiers<P: AsRef<Path>>(
    path: P,
    id_column: usize,
    has_headers: bool,
) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(input_error(path, "file does not exist".to_string()));
    }

    let identifiers = if is_spreadsheet(path) {
        load_from_workbook(path, id_column, has_headers)?
    } else {
        load_from_csv(path, id_column, has_headers)?
    };

    tracing::info!("📥 Loaded {} identifiers from {}", identifiers.len(), path.display());
    Ok(identifiers)
}

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn input_error(path: &Path, message: String) -> HarvestError {
    HarvestError::InputError {
        path: path.display().to_string(),
        message,
    }
}

fn missing_column(path: &Path, id_column: usize, width: usize) -> HarvestError {
    input_error(
        path,
        format!("expected at least {} columns, found {}", id_column + 1, width),
    )
}

fn load_from_workbook(path: &Path, id_column: usize, has_headers: bool) -> Result<Vec<String>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| input_error(path, e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| input_error(path, "workbook has no sheets".to_string()))?
        .map_err(|e| input_error(path, e.to_string()))?;

    if range.width() <= id_column {
        return Err(missing_column(path, id_column, range.width()));
    }

    let skip = usize::from(has_headers);
    Ok(range
        .rows()
        .skip(skip)
        .filter_map(|row| row.get(id_column))
        .filter_map(|cell| clean_identifier(&cell.to_string()))
        .collect())
}

fn load_from_csv(path: &Path, id_column: usize, has_headers: bool) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_path(path)?;

    let width = if has_headers {
        reader.headers()?.len()
    } else {
        // 沒有標題列時以第一列的欄數為準
        let mut probe = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        match probe.records().next() {
            Some(record) => record?.len(),
            None => 0,
        }
    };
    if width <= id_column {
        return Err(missing_column(path, id_column, width));
    }

    let mut identifiers = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(cell) = record.get(id_column).and_then(clean_identifier) {
            identifiers.push(cell);
        }
    }
    Ok(identifiers)
}

/// `None` for cells that do not hold an identifier.
pub fn clean_identifier(cell: &str) -> Option<String> {
    let value = cell.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return None;
    }
    let value = value.strip_suffix(".0").unwrap_or(value);
    Some(value.to_string())
}
