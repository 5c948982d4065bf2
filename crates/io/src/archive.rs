// Zip archive handling: pick the one decodable member and extract it.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::decode::{extension_of, DecodeError};

/// Members that can be decoded after extraction.
const SUPPORTED: [&str; 3] = ["csv", "xlsx", "xls"];

/// Select the archive member to decode and copy it into `scratch_dir`.
/// Returns the extracted path plus the member name (for format dispatch).
///
/// Directory entries, anything under `__MACOSX`, and dot-files are ignored.
/// Among the survivors, CSV members win over spreadsheets; ties break
/// lexicographically on the full member name.
pub(crate) fn extract_entry(
    path: &Path,
    scratch_dir: &Path,
) -> Result<(PathBuf, String), DecodeError> {
    let file = File::open(path).map_err(|e| DecodeError::Io(e.to_string()))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| DecodeError::Malformed(format!("not a zip archive: {e}")))?;

    let mut candidates: Vec<String> = zip
        .file_names()
        .filter(|name| is_candidate(name))
        .map(String::from)
        .collect();
    candidates.sort_by_key(|n| (usize::from(extension_of(n) != "csv"), n.clone()));

    let chosen = candidates.into_iter().next().ok_or_else(|| {
        DecodeError::NoSupportedEntry("archive has no csv/xlsx/xls member".into())
    })?;

    // Extract under the member's base name only; member paths are untrusted.
    let base = Path::new(&chosen)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entry".into());
    let out_path = scratch_dir.join(base);

    let mut member = zip
        .by_name(&chosen)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let mut out = File::create(&out_path).map_err(|e| DecodeError::Io(e.to_string()))?;
    io::copy(&mut member, &mut out).map_err(|e| DecodeError::Io(e.to_string()))?;

    Ok((out_path, chosen))
}

fn is_candidate(name: &str) -> bool {
    if name.ends_with('/') {
        return false;
    }
    if name.starts_with("__MACOSX") || name.contains("__MACOSX/") {
        return false;
    }
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if base.starts_with('.') {
        return false;
    }
    SUPPORTED.contains(&extension_of(name).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_filtering() {
        assert!(is_candidate("calls.csv"));
        assert!(is_candidate("data/calls.XLSX"));
        assert!(!is_candidate("data/"));
        assert!(!is_candidate("__MACOSX/calls.csv"));
        assert!(!is_candidate("data/__MACOSX/calls.csv"));
        assert!(!is_candidate(".hidden.csv"));
        assert!(!is_candidate("data/._calls.csv"));
        assert!(!is_candidate("readme.txt"));
    }

    #[test]
    fn csv_members_win_over_spreadsheets() {
        let mut names = vec![
            "b.xlsx".to_string(),
            "z.csv".to_string(),
            "a.xls".to_string(),
            "m.csv".to_string(),
        ];
        names.sort_by_key(|n| (usize::from(extension_of(n) != "csv"), n.clone()));
        assert_eq!(names[0], "m.csv");
        assert_eq!(names[1], "z.csv");
    }
}
