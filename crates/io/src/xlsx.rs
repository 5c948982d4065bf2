// Spreadsheet import (xlsx, xls) via calamine.
//
// One-way conversion: the first worksheet becomes a header row plus data
// rows. Date cells stay numeric serials (days since 1899-12-30) so the
// downstream timestamp normalizer can recognize the serial window.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::decode::DecodeError;
use crate::value::CellValue;

/// Decode the first worksheet. The first non-empty row is the header row;
/// fully empty rows are dropped. An empty sheet yields empty headers.
pub(crate) fn open(path: &Path) -> Result<(Vec<String>, Vec<Vec<CellValue>>), DecodeError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| DecodeError::Spreadsheet(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DecodeError::Spreadsheet("workbook has no sheets".into()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| DecodeError::Spreadsheet(format!("cannot read sheet '{sheet_name}': {e}")))?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for row in range.rows() {
        let cells: Vec<CellValue> = row.iter().map(cell_from_data).collect();
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        match headers {
            None => {
                headers = Some(cells.iter().map(|c| c.to_text().trim().to_string()).collect())
            }
            Some(_) => rows.push(cells),
        }
    }

    Ok((headers.unwrap_or_default(), rows))
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Float(*f),
        Data::Int(i) => CellValue::Int(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}
