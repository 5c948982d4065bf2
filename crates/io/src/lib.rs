//! `cdrecon-io` - tabular input decoding for reconciliation jobs.
//!
//! Turns a delimited text file, a spreadsheet, or a zip archive containing
//! one of those into a header row plus an ordered stream of typed cell rows.
//! No engine dependencies.

pub mod archive;
pub mod decode;
pub mod delimited;
pub mod value;
pub mod xlsx;

pub use decode::{decode, DecodeError, Decoded, Format, RowIter};
pub use value::CellValue;
