// The four canonicalization functions applied to mapped cells. Each is
// total on the decoder's value domain and idempotent on its own output.

use cdrecon_io::CellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Upper bound (exclusive) of the spreadsheet serial-date window.
const SERIAL_WINDOW_MAX: f64 = 100_000.0;
/// Numeric timestamps above this are epoch milliseconds.
const EPOCH_MILLIS_MIN: f64 = 10_000_000_000.0;

/// Digits-only phone number with NANP/international prefixes stripped once:
/// 11 digits starting "1", 12 starting "01", 13 starting "001".
pub fn normalize_phone(value: &CellValue) -> String {
    let digits: String = value
        .to_text()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    let strip = if digits.len() == 11 && digits.starts_with('1') {
        1
    } else if digits.len() == 12 && digits.starts_with("01") {
        2
    } else if digits.len() == 13 && digits.starts_with("001") {
        3
    } else {
        0
    };
    digits[strip..].to_string()
}

/// Optional Unix epoch seconds. Numeric cells route by magnitude: the
/// spreadsheet serial window `(0, 100000)` converts at 86400 seconds per
/// day, values above 1e10 are epoch milliseconds, the rest epoch seconds.
/// Unparseable input yields `None`, never an error.
pub fn normalize_timestamp(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Empty | CellValue::Bool(_) => None,
        CellValue::Int(_) | CellValue::Float(_) | CellValue::DateTime(_) => {
            numeric_timestamp(value.as_number()?)
        }
        CellValue::Text(s) => text_timestamp(s.trim()),
    }
}

fn numeric_timestamp(v: f64) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    if v > 0.0 && v < SERIAL_WINDOW_MAX {
        Some((v * 86_400.0).round() as i64)
    } else if v > EPOCH_MILLIS_MIN {
        Some((v / 1000.0).round() as i64)
    } else {
        Some(v.round() as i64)
    }
}

fn text_timestamp(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }

    // US wall-clock shape with no timezone, read as UTC.
    for format in ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp());
        }
    }

    if s.contains('+') || s.contains('Z') || s.contains(" UTC") || s.contains(" GMT") {
        return offset_aware_timestamp(s);
    }

    permissive_timestamp(s)
}

fn offset_aware_timestamp(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    let cleaned = s.replace(" UTC", " +0000").replace(" GMT", " +0000");
    for format in [
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S%z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%m/%d/%Y %H:%M:%S %z",
        "%m/%d/%Y %H:%M %z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(&cleaned, format) {
            return Some(dt.timestamp());
        }
    }
    None
}

/// Fallback for string shapes the explicit branches miss. All formats are
/// read as UTC; dates without a time component land at midnight.
fn permissive_timestamp(s: &str) -> Option<i64> {
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
        }
    }
    None
}

/// Integer seconds, rounded to nearest. Empty or unparseable input is 0.
/// Negative values survive here; billing treats them as free.
pub fn normalize_duration(value: &CellValue) -> i64 {
    match numeric_value(value) {
        Some(n) if n.is_finite() => n.round() as i64,
        _ => 0,
    }
}

/// Per-minute rate as-is. Empty or unparseable input is 0.
pub fn normalize_rate(value: &CellValue) -> f64 {
    match numeric_value(value) {
        Some(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

fn numeric_value(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Empty => None,
        CellValue::Text(s) => s.trim().parse::<f64>().ok(),
        other => other.as_number(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    #[test]
    fn phone_strips_to_digits() {
        assert_eq!(normalize_phone(&text("(555) 123-4567")), "5551234567");
        assert_eq!(normalize_phone(&text("15551234567")), "5551234567");
        assert_eq!(normalize_phone(&text("015551234567")), "5551234567");
        assert_eq!(normalize_phone(&text("0015551234567")), "5551234567");
        assert_eq!(normalize_phone(&CellValue::Float(5551234567.0)), "5551234567");
        assert_eq!(normalize_phone(&CellValue::Empty), "");
    }

    #[test]
    fn phone_prefix_strip_applies_once() {
        // 12 digits starting "11": not an "01" prefix, left alone.
        assert_eq!(normalize_phone(&text("115551234567")), "115551234567");
    }

    #[test]
    fn phone_is_shape_preserving_and_idempotent() {
        for digits in ["5551234567", "15551234567", "911", ""] {
            let wrapped = format!("x-{}-y", digits.chars().map(|c| format!("{c} ")).collect::<String>());
            assert_eq!(normalize_phone(&text(&wrapped)), normalize_phone(&text(digits)));

            let once = normalize_phone(&text(digits));
            assert_eq!(normalize_phone(&text(&once)), once);
        }
    }

    #[test]
    fn timestamp_numeric_windows() {
        // Serial day count converts at 86400 s/day.
        assert_eq!(normalize_timestamp(&CellValue::Float(2.0)), Some(172_800));
        assert_eq!(normalize_timestamp(&CellValue::DateTime(2.5)), Some(216_000));
        // Epoch milliseconds collapse to seconds.
        assert_eq!(
            normalize_timestamp(&CellValue::Int(1_705_314_600_000)),
            Some(1_705_314_600)
        );
        // Plain epoch seconds pass through.
        assert_eq!(
            normalize_timestamp(&CellValue::Int(1_705_314_600)),
            Some(1_705_314_600)
        );
    }

    #[test]
    fn timestamp_us_shape_is_utc() {
        // 2024-01-15T10:30:00Z
        assert_eq!(normalize_timestamp(&text("1/15/2024 10:30:00")), Some(1_705_314_600));
        assert_eq!(normalize_timestamp(&text("1/15/2024 10:30")), Some(1_705_314_600));
    }

    #[test]
    fn timestamp_offset_aware_shapes() {
        assert_eq!(
            normalize_timestamp(&text("2024-01-15T10:30:00Z")),
            Some(1_705_314_600)
        );
        assert_eq!(
            normalize_timestamp(&text("2024-01-15T05:30:00-05:00")),
            Some(1_705_314_600)
        );
        assert_eq!(
            normalize_timestamp(&text("2024-01-15 10:30:00 UTC")),
            Some(1_705_314_600)
        );
    }

    #[test]
    fn timestamp_permissive_and_failures() {
        assert_eq!(
            normalize_timestamp(&text("2024-01-15 10:30:00")),
            Some(1_705_314_600)
        );
        assert_eq!(normalize_timestamp(&text("2024-01-15")), Some(1_705_276_800));
        assert_eq!(normalize_timestamp(&text("not a date")), None);
        assert_eq!(normalize_timestamp(&text("")), None);
        assert_eq!(normalize_timestamp(&CellValue::Empty), None);
        assert_eq!(normalize_timestamp(&CellValue::Bool(true)), None);
    }

    #[test]
    fn duration_rounds_and_defaults() {
        assert_eq!(normalize_duration(&text("120")), 120);
        assert_eq!(normalize_duration(&text("89.6")), 90);
        assert_eq!(normalize_duration(&CellValue::Float(45.4)), 45);
        assert_eq!(normalize_duration(&text("")), 0);
        assert_eq!(normalize_duration(&text("abc")), 0);
        assert_eq!(normalize_duration(&text("NaN")), 0);
        assert_eq!(normalize_duration(&CellValue::Empty), 0);
        // Negatives survive normalization; billing treats them as zero.
        assert_eq!(normalize_duration(&text("-30")), -30);
    }

    #[test]
    fn rate_parses_and_defaults() {
        assert_eq!(normalize_rate(&text("0.015")), 0.015);
        assert_eq!(normalize_rate(&CellValue::Float(0.02)), 0.02);
        assert_eq!(normalize_rate(&text("")), 0.0);
        assert_eq!(normalize_rate(&text("n/a")), 0.0);
        assert_eq!(normalize_rate(&CellValue::Empty), 0.0);
    }

    #[test]
    fn normalization_is_idempotent_on_outputs() {
        let d = normalize_duration(&text("89.6"));
        assert_eq!(normalize_duration(&CellValue::Int(d)), d);

        let r = normalize_rate(&text("0.015"));
        assert_eq!(normalize_rate(&CellValue::Float(r)), r);

        let t = normalize_timestamp(&text("2024-01-15T10:30:00Z")).unwrap();
        assert_eq!(normalize_timestamp(&CellValue::Int(t)), Some(t));
    }
}
