// Format dispatch and the row-stream contract.

use std::fmt;
use std::fs::File;
use std::path::Path;

use crate::value::CellValue;
use crate::{archive, delimited, xlsx};

/// File format selected from the *declared* file name (the stored file may
/// be named by UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Delimited,
    Spreadsheet,
    Archive,
}

impl Format {
    pub fn from_declared_name(name: &str) -> Option<Self> {
        match extension_of(name).as_str() {
            "csv" => Some(Self::Delimited),
            "xlsx" | "xls" => Some(Self::Spreadsheet),
            "zip" => Some(Self::Archive),
            _ => None,
        }
    }
}

/// Lowercased extension of a file name, "" when there is none.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// A decoded tabular input: header names plus an ordered stream of data
/// rows. Row cells are aligned to the header width.
#[derive(Debug)]
pub struct Decoded {
    pub headers: Vec<String>,
    pub rows: RowIter,
}

/// Ordered stream of data rows. Delimited sources stream from disk;
/// spreadsheet sources iterate rows already held by the reader.
pub enum RowIter {
    Delimited {
        records: csv::StringRecordsIntoIter<File>,
        width: usize,
    },
    Loaded(std::vec::IntoIter<Vec<CellValue>>),
}

impl std::fmt::Debug for RowIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowIter::Delimited { width, .. } => {
                f.debug_struct("Delimited").field("width", width).finish()
            }
            RowIter::Loaded(_) => f.debug_tuple("Loaded").finish(),
        }
    }
}

impl Iterator for RowIter {
    type Item = Result<Vec<CellValue>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RowIter::Delimited { records, width } => loop {
                match records.next()? {
                    Ok(record) => {
                        let cells = delimited::record_to_cells(&record, *width);
                        if cells.iter().all(CellValue::is_empty) {
                            continue;
                        }
                        return Some(Ok(cells));
                    }
                    Err(e) => return Some(Err(delimited::from_csv_error(e))),
                }
            },
            RowIter::Loaded(rows) => rows.next().map(Ok),
        }
    }
}

/// Decode `path` as the format declared by `declared_name`. Archive members
/// are extracted into `scratch_dir` before the recursive decode; the caller
/// owns `scratch_dir` cleanup.
pub fn decode(path: &Path, declared_name: &str, scratch_dir: &Path) -> Result<Decoded, DecodeError> {
    let format = Format::from_declared_name(declared_name)
        .ok_or_else(|| DecodeError::UnsupportedExtension(extension_of(declared_name)))?;

    match format {
        Format::Delimited => {
            let (headers, records) = delimited::open(path)?;
            let width = headers.len();
            Ok(Decoded {
                headers,
                rows: RowIter::Delimited { records, width },
            })
        }
        Format::Spreadsheet => {
            let (headers, rows) = xlsx::open(path)?;
            Ok(Decoded {
                headers,
                rows: RowIter::Loaded(rows.into_iter()),
            })
        }
        Format::Archive => {
            let (member_path, member_name) = archive::extract_entry(path, scratch_dir)?;
            log::debug!("archive {declared_name}: decoding member {member_name}");
            decode(&member_path, &member_name, scratch_dir)
        }
    }
}

#[derive(Debug)]
pub enum DecodeError {
    /// Declared name has an extension outside the supported set.
    UnsupportedExtension(String),
    /// Zip archive without a decodable member.
    NoSupportedEntry(String),
    /// Spreadsheet reader failure.
    Spreadsheet(String),
    /// Malformed delimited or archive data.
    Malformed(String),
    /// Underlying file IO failure.
    Io(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedExtension(ext) => write!(f, "unsupported file extension '{ext}'"),
            Self::NoSupportedEntry(msg) => write!(f, "{msg}"),
            Self::Spreadsheet(msg) => write!(f, "spreadsheet error: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed input: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn format_dispatch_is_case_insensitive() {
        assert_eq!(Format::from_declared_name("calls.CSV"), Some(Format::Delimited));
        assert_eq!(Format::from_declared_name("calls.Xlsx"), Some(Format::Spreadsheet));
        assert_eq!(Format::from_declared_name("calls.xls"), Some(Format::Spreadsheet));
        assert_eq!(Format::from_declared_name("calls.zip"), Some(Format::Archive));
        assert_eq!(Format::from_declared_name("calls.txt"), None);
        assert_eq!(Format::from_declared_name("calls"), None);
    }

    #[test]
    fn delimited_rows_align_to_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "calls.csv",
            "ani,dnis,billsec\n5551234567,5559876543,120\n\"555,000\",x\n",
        );

        let decoded = decode(&path, "calls.csv", dir.path()).unwrap();
        assert_eq!(decoded.headers, vec!["ani", "dnis", "billsec"]);

        let rows: Vec<_> = decoded.rows.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][2], CellValue::Text("120".into()));
        // Quoted comma survives, short row pads with Empty.
        assert_eq!(rows[1][0], CellValue::Text("555,000".into()));
        assert_eq!(rows[1][2], CellValue::Empty);
    }

    #[test]
    fn delimited_skips_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "calls.csv", "a,b\n1,2\n,\n3,4\n");

        let decoded = decode(&path, "calls.csv", dir.path()).unwrap();
        let rows: Vec<_> = decoded.rows.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], CellValue::Text("3".into()));
    }

    #[test]
    fn delimited_headers_come_from_the_first_non_empty_row() {
        let dir = tempfile::tempdir().unwrap();
        // A leading ",,," line is an all-empty record, not a header.
        let path = write_file(dir.path(), "calls.csv", ",,\n\n ,,\nani,dnis,billsec\n1,2,3\n");

        let decoded = decode(&path, "calls.csv", dir.path()).unwrap();
        assert_eq!(decoded.headers, vec!["ani", "dnis", "billsec"]);

        let rows: Vec<_> = decoded.rows.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], CellValue::Text("1".into()));
        assert_eq!(rows[0][2], CellValue::Text("3".into()));
    }

    #[test]
    fn archive_prefers_csv_member() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("upload.zip");
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        writer.start_file("__MACOSX/calls.csv", options).unwrap();
        writer.write_all(b"junk").unwrap();
        writer.start_file("b.xlsx", options).unwrap();
        writer.write_all(b"junk").unwrap();
        writer.start_file("a.csv", options).unwrap();
        writer.write_all(b"ani,billsec\n5551234567,60\n").unwrap();
        writer.finish().unwrap();

        let decoded = decode(&zip_path, "upload.zip", dir.path()).unwrap();
        assert_eq!(decoded.headers, vec!["ani", "billsec"]);
        let rows: Vec<_> = decoded.rows.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn archive_without_supported_member_fails() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("upload.zip");
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("readme.txt", options).unwrap();
        writer.write_all(b"nope").unwrap();
        writer.finish().unwrap();

        let err = decode(&zip_path, "upload.zip", dir.path()).unwrap_err();
        assert!(matches!(err, DecodeError::NoSupportedEntry(_)));
    }

    #[test]
    fn spreadsheet_cells_keep_source_types() {
        use rust_xlsxwriter::Workbook;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "ani").unwrap();
        sheet.write_string(0, 1, "billsec").unwrap();
        sheet.write_number(1, 0, 5551234567.0).unwrap();
        sheet.write_number(1, 1, 120.0).unwrap();
        workbook.save(&path).unwrap();

        let decoded = decode(&path, "calls.xlsx", dir.path()).unwrap();
        assert_eq!(decoded.headers, vec!["ani", "billsec"]);
        let rows: Vec<_> = decoded.rows.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].as_number(), Some(5551234567.0));
        assert_eq!(rows[0][1].as_number(), Some(120.0));
    }
}
