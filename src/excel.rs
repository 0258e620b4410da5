use calamine::{open_workbook_auto, Data, DataType, Reader};
use std::path::Path;

use crate::error::{ReportError, Result};
use crate::services::normalizer::ColumnMap;

/// Sheet the daily reports live in unless configured otherwise.
pub const DEFAULT_SHEET: &str = "Reports";

/// Rows read from one worksheet, below the header row.
#[derive(Debug, Clone)]
pub struct SheetRows {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Header-driven mapping when the headers name the date and site columns, else positional.
    pub columns: ColumnMap,
}

fn open(path: &Path) -> Result<calamine::Sheets<std::io::BufReader<std::fs::File>>> {
    if !path.exists() {
        return Err(ReportError::RowSource(format!(
            "Spreadsheet not found: {}",
            path.display()
        )));
    }
    open_workbook_auto(path)
        .map_err(|e| ReportError::RowSource(format!("Could not open spreadsheet {}: {}", path.display(), e)))
}

/// Cell as text. Dates come out day-first (`dd/mm/YYYY`), whole numbers without a decimal point.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| cell.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Read every non-empty row of `sheet_name`.
/// `header_row` is 1-based; `None` means the sheet has no header and all rows are data.
pub fn read_sheet_rows(path: &Path, sheet_name: &str, header_row: Option<u32>) -> Result<SheetRows> {
    let mut workbook = open(path)?;
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| ReportError::RowSource(format!("Sheet '{}' not found: {}", sheet_name, e)))?;

    let header_idx = header_row.map(|r| r.saturating_sub(1) as usize);
    let mut headers = Vec::new();
    let mut rows = Vec::new();
    for (idx, row) in range.rows().enumerate() {
        match header_idx {
            Some(h) if idx < h => continue,
            Some(h) if idx == h => {
                headers = row.iter().map(|c| cell_text(c).trim().to_string()).collect();
                continue;
            }
            _ => {}
        }
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(cells);
    }

    let columns = match ColumnMap::from_headers(&headers) {
        Some(map) => {
            tracing::debug!(mapped = map.mapped_fields(), "columns mapped from headers");
            map
        }
        None => ColumnMap::positional(),
    };
    tracing::info!(sheet = sheet_name, rows = rows.len(), "spreadsheet rows read");
    Ok(SheetRows { headers, rows, columns })
}

/// Get list of sheet names from workbook.
pub fn get_sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open(path)?;
    Ok(workbook.sheet_names().to_vec())
}
