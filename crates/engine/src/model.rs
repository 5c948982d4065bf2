use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

/// The two reconciliation sides: A is the caller's own export ("yours"),
/// B is the upstream provider's export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn table(&self) -> &'static str {
        match self {
            Self::A => "records_a",
            Self::B => "records_b",
        }
    }

    pub fn matched_table(&self) -> &'static str {
        match self {
            Self::A => "matched_a_ids",
            Self::B => "matched_b_ids",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "yours",
            Self::B => "provider",
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Mapping from canonical field to source column name for one side.
/// `a_number`, `b_number`, `seize_time`, `billed_duration`, and `lrn` are
/// required; a missing `rate` means the side bills at rate 0.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    pub a_number: String,
    pub b_number: String,
    pub seize_time: String,
    #[serde(default)]
    pub answer_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    pub billed_duration: String,
    #[serde(default)]
    pub rate: Option<String>,
    pub lrn: String,
}

impl ColumnMapping {
    /// Names of required canonical fields whose source column is missing or
    /// blank. Empty means the mapping is usable.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("a_number", &self.a_number),
            ("b_number", &self.b_number),
            ("seize_time", &self.seize_time),
            ("billed_duration", &self.billed_duration),
            ("lrn", &self.lrn),
        ] {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        missing
    }
}

/// Everything the engine needs for one reconciliation job. Declared names
/// carry the original file names for format dispatch; the paths may point
/// at UUID-named copies.
#[derive(Debug, Clone)]
pub struct JobInput {
    pub file_a_path: PathBuf,
    pub file_a_declared_name: String,
    pub file_b_path: PathBuf,
    pub file_b_declared_name: String,
    pub mapping_a: ColumnMapping,
    pub mapping_b: ColumnMapping,
}

// ---------------------------------------------------------------------------
// Canonical row
// ---------------------------------------------------------------------------

/// A normalized CDR as staged for one side. Created at ingest, never
/// mutated, dropped with the job.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub a_number: String,
    pub b_number: String,
    pub seize_time: Option<i64>,
    pub answer_time: Option<i64>,
    pub end_time: Option<i64>,
    pub billed_duration: i64,
    pub rate: f64,
    pub lrn: String,
    pub raw_index: i64,
}

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

/// Discrepancy categories, declared in report order: the collector readout
/// concatenates per-type lists in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    MissingInA,
    LrnMismatch,
    DurationMismatch,
    RateMismatch,
    CostMismatch,
    MissingInB,
    ZeroDurationInA,
    ZeroDurationInB,
    HungCallYours,
    HungCallProvider,
}

impl DiscrepancyType {
    pub const ALL: [DiscrepancyType; 10] = [
        Self::MissingInA,
        Self::LrnMismatch,
        Self::DurationMismatch,
        Self::RateMismatch,
        Self::CostMismatch,
        Self::MissingInB,
        Self::ZeroDurationInA,
        Self::ZeroDurationInB,
        Self::HungCallYours,
        Self::HungCallProvider,
    ];
}

impl std::fmt::Display for DiscrepancyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MissingInA => "missing_in_a",
            Self::LrnMismatch => "lrn_mismatch",
            Self::DurationMismatch => "duration_mismatch",
            Self::RateMismatch => "rate_mismatch",
            Self::CostMismatch => "cost_mismatch",
            Self::MissingInB => "missing_in_b",
            Self::ZeroDurationInA => "zero_duration_in_a",
            Self::ZeroDurationInB => "zero_duration_in_b",
            Self::HungCallYours => "hung_call_yours",
            Self::HungCallProvider => "hung_call_provider",
        };
        write!(f, "{name}")
    }
}

/// One reported difference between the two sides. Positive `cost_difference`
/// means side A billed more than side B.
#[derive(Debug, Clone, Serialize)]
pub struct Discrepancy {
    #[serde(rename = "type")]
    pub kind: DiscrepancyType,
    pub a_number: String,
    pub b_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seize_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_cost: Option<f64>,
    pub cost_difference: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_lrn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_lrn: Option<String>,
    /// Source data-row index for a one-sided record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_index_a: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_index_b: Option<i64>,
    /// Cluster size for hung-call exemplars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hung_call_count: Option<i64>,
}

impl Discrepancy {
    /// Blank discrepancy of the given type; callers fill the relevant sides.
    pub fn new(kind: DiscrepancyType, a_number: String, b_number: String) -> Self {
        Self {
            kind,
            a_number,
            b_number,
            seize_time: None,
            your_duration: None,
            provider_duration: None,
            your_rate: None,
            provider_rate: None,
            your_cost: None,
            provider_cost: None,
            cost_difference: 0.0,
            your_lrn: None,
            provider_lrn: None,
            source_index: None,
            source_index_a: None,
            source_index_b: None,
            hung_call_count: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Aggregate job result. Counts keyed `*_yours` describe side-A records,
/// `*_provider` side-B records; dollar figures are rounded to 2 decimals.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_records_a: u64,
    pub total_records_b: u64,
    pub matched_records: u64,
    pub your_total_billed: f64,
    pub provider_total_billed: f64,
    pub billing_difference: f64,
    pub your_total_minutes: f64,
    pub provider_total_minutes: f64,
    pub minutes_difference: f64,
    pub missing_in_yours: u64,
    pub missing_in_provider: u64,
    pub zero_duration_in_yours: u64,
    pub billed_missing_in_yours: u64,
    pub zero_duration_in_provider: u64,
    pub billed_missing_in_provider: u64,
    pub duration_mismatches: u64,
    pub rate_mismatches: u64,
    pub cost_mismatches: u64,
    pub lrn_mismatches: u64,
    pub total_discrepancies: u64,
    pub monetary_impact: f64,
    pub impact_breakdown: BTreeMap<String, f64>,
    pub hung_calls_in_yours: u64,
    pub hung_calls_in_provider: u64,
    pub hung_call_groups_yours: u64,
    pub hung_call_groups_provider: u64,
}

/// Successful job result: summary plus the collector's sampled
/// discrepancies in report order.
#[derive(Debug, Serialize)]
pub struct JobOutput {
    pub job_id: String,
    pub summary: Summary,
    pub discrepancies: Vec<Discrepancy>,
    pub has_more: bool,
    pub total_discrepancy_count: u64,
}
