//! CSV export of a job result: a summary preface, a blank separator row,
//! then one row per sampled discrepancy.

use std::path::Path;

use chrono::{DateTime, SecondsFormat};

use cdrecon_engine::{Discrepancy, DiscrepancyType, JobOutput};

const DISCREPANCY_HEADER: [&str; 15] = [
    "Type",
    "A-Number",
    "B-Number",
    "Seize Time (ISO-8601)",
    "Your Duration (s)",
    "Provider Duration (s)",
    "Your Rate",
    "Provider Rate",
    "Your Cost",
    "Provider Cost",
    "Difference ($)",
    "Your LRN",
    "Provider LRN",
    "Your Source Row",
    "Provider Source Row",
];

pub fn write_csv(output: &JobOutput, path: &Path) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| e.to_string())?;
    write_into(output, &mut writer).map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())
}

fn write_into<W: std::io::Write>(
    output: &JobOutput,
    writer: &mut csv::Writer<W>,
) -> Result<(), csv::Error> {
    let s = &output.summary;

    let preface: Vec<(&str, String)> = vec![
        ("Your Total Billed ($)", money(s.your_total_billed)),
        ("Provider Total Billed ($)", money(s.provider_total_billed)),
        ("Billing Difference ($)", money(s.billing_difference)),
        ("Your Total Minutes", money(s.your_total_minutes)),
        ("Provider Total Minutes", money(s.provider_total_minutes)),
        ("Minutes Difference", money(s.minutes_difference)),
        ("Your Records", s.total_records_a.to_string()),
        ("Provider Records", s.total_records_b.to_string()),
        ("Matched Records", s.matched_records.to_string()),
        ("Missing in Yours", s.missing_in_yours.to_string()),
        ("Missing in Provider", s.missing_in_provider.to_string()),
        ("Zero Duration in Yours", s.zero_duration_in_yours.to_string()),
        ("Zero Duration in Provider", s.zero_duration_in_provider.to_string()),
        ("Duration Mismatches", s.duration_mismatches.to_string()),
        ("Rate Mismatches", s.rate_mismatches.to_string()),
        ("Cost Mismatches", s.cost_mismatches.to_string()),
        ("LRN Mismatches", s.lrn_mismatches.to_string()),
        ("Hung Calls in Yours", s.hung_calls_in_yours.to_string()),
        ("Hung Calls in Provider", s.hung_calls_in_provider.to_string()),
        ("Total Discrepancies", s.total_discrepancies.to_string()),
        ("Monetary Impact ($)", money(s.monetary_impact)),
    ];
    for (label, value) in preface {
        writer.write_record([label.to_string(), value])?;
    }
    for (kind, sum) in &s.impact_breakdown {
        writer.write_record([format!("Impact: {kind}"), money(*sum)])?;
    }

    writer.write_record([""])?;

    writer.write_record(DISCREPANCY_HEADER)?;
    for d in &output.discrepancies {
        writer.write_record(discrepancy_record(d))?;
    }
    Ok(())
}

fn discrepancy_record(d: &Discrepancy) -> Vec<String> {
    let (your_row, provider_row) = source_rows(d);
    vec![
        d.kind.to_string(),
        d.a_number.clone(),
        d.b_number.clone(),
        d.seize_time.map(iso8601).unwrap_or_default(),
        opt_int(d.your_duration),
        opt_int(d.provider_duration),
        opt_num(d.your_rate),
        opt_num(d.provider_rate),
        opt_cost(d.your_cost),
        opt_cost(d.provider_cost),
        format!("{:.4}", d.cost_difference),
        d.your_lrn.clone().unwrap_or_default(),
        d.provider_lrn.clone().unwrap_or_default(),
        your_row,
        provider_row,
    ]
}

/// Spreadsheet-style source rows: `raw_index + 2` accounts for the header
/// row and 1-based numbering. One-sided types carry a single index on the
/// side that holds the record.
fn source_rows(d: &Discrepancy) -> (String, String) {
    let cell = |i: Option<i64>| i.map(|i| (i + 2).to_string()).unwrap_or_default();
    match d.kind {
        DiscrepancyType::MissingInB
        | DiscrepancyType::ZeroDurationInB
        | DiscrepancyType::HungCallYours => (cell(d.source_index), String::new()),
        DiscrepancyType::MissingInA
        | DiscrepancyType::ZeroDurationInA
        | DiscrepancyType::HungCallProvider => (String::new(), cell(d.source_index)),
        _ => (cell(d.source_index_a), cell(d.source_index_b)),
    }
}

fn iso8601(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn money(x: f64) -> String {
    format!("{x:.2}")
}

fn opt_int(x: Option<i64>) -> String {
    x.map(|x| x.to_string()).unwrap_or_default()
}

fn opt_num(x: Option<f64>) -> String {
    x.map(|x| x.to_string()).unwrap_or_default()
}

fn opt_cost(x: Option<f64>) -> String {
    x.map(|x| format!("{x:.4}")).unwrap_or_default()
}
