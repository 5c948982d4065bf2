// Delimited text (RFC 4180) decoding via the csv crate.

use std::fs::File;
use std::path::Path;

use crate::decode::DecodeError;
use crate::value::CellValue;

/// Open a delimited file. Rows whose fields are all empty are skipped; the
/// first survivor is the header row and the rest stream as records. Rows
/// may be shorter or longer than the header.
pub(crate) fn open(
    path: &Path,
) -> Result<(Vec<String>, csv::StringRecordsIntoIter<File>), DecodeError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(from_csv_error)?;

    // Same header discovery as the spreadsheet path: a leading ",,," line
    // is an all-empty record, not a header.
    let mut records = reader.into_records();
    let mut headers = Vec::new();
    for record in records.by_ref() {
        let record = record.map_err(from_csv_error)?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        headers = record.iter().map(|h| h.trim().to_string()).collect();
        break;
    }

    Ok((headers, records))
}

/// Align a record to the header width: short rows pad with `Empty`, surplus
/// fields beyond the headers are dropped.
pub(crate) fn record_to_cells(record: &csv::StringRecord, width: usize) -> Vec<CellValue> {
    (0..width)
        .map(|i| match record.get(i) {
            Some(s) if !s.is_empty() => CellValue::Text(s.to_string()),
            _ => CellValue::Empty,
        })
        .collect()
}

pub(crate) fn from_csv_error(e: csv::Error) -> DecodeError {
    if e.is_io_error() {
        DecodeError::Io(e.to_string())
    } else {
        DecodeError::Malformed(e.to_string())
    }
}
