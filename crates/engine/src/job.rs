// Job orchestration: validate, stage both sides, match, classify, detect
// hung calls, aggregate. All-or-nothing; scratch dies with the job.

use std::path::Path;
use std::time::Instant;

use cdrecon_io::{decode, CellValue, Format};
use uuid::Uuid;

use crate::classify;
use crate::collector::BoundedCollector;
use crate::error::EngineError;
use crate::hung;
use crate::matcher;
use crate::model::{CanonicalRow, ColumnMapping, JobInput, JobOutput, Side};
use crate::normalize::{normalize_duration, normalize_phone, normalize_rate, normalize_timestamp};
use crate::scratch::Scratch;
use crate::staging::StagingStore;
use crate::summary;

/// Boundary limits. The upload boundary enforces these; the engine
/// re-checks them so a misbehaving caller fails cleanly.
pub const MAX_FILE_BYTES: u64 = 500 * 1024 * 1024;
pub const MAX_ROWS_PER_SIDE: u64 = 2_000_000;

/// Run one reconciliation job end to end. Returns a complete result or an
/// error; scratch resources are released on both paths.
pub fn reconcile(input: &JobInput) -> Result<JobOutput, EngineError> {
    validate(input)?;

    let job_id = Uuid::new_v4().to_string();
    let scratch = Scratch::create(&job_id)?;
    let started = Instant::now();

    let result = run(input, &scratch, &job_id);
    match &result {
        Ok(out) => log::info!(
            "job {job_id}: {}+{} records, {} matched, {} discrepancies in {:?}",
            out.summary.total_records_a,
            out.summary.total_records_b,
            out.summary.matched_records,
            out.summary.total_discrepancies,
            started.elapsed(),
        ),
        Err(e) => log::warn!("job {job_id} failed after {:?}: {e}", started.elapsed()),
    }
    result
}

fn validate(input: &JobInput) -> Result<(), EngineError> {
    for (side, mapping) in [("a", &input.mapping_a), ("b", &input.mapping_b)] {
        let missing = mapping.missing_required();
        if !missing.is_empty() {
            return Err(EngineError::Input(format!(
                "side {side} mapping is missing required fields: {}",
                missing.join(", ")
            )));
        }
    }
    for (name, path) in [
        (&input.file_a_declared_name, &input.file_a_path),
        (&input.file_b_declared_name, &input.file_b_path),
    ] {
        if Format::from_declared_name(name).is_none() {
            return Err(EngineError::Input(format!(
                "unsupported file extension for '{name}' (expected csv, xlsx, xls, or zip)"
            )));
        }
        let meta = std::fs::metadata(path)
            .map_err(|e| EngineError::Input(format!("cannot read {}: {e}", path.display())))?;
        if meta.len() > MAX_FILE_BYTES {
            return Err(EngineError::Limit(format!(
                "'{name}' exceeds the {} MB file limit",
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
    }
    Ok(())
}

fn run(input: &JobInput, scratch: &Scratch, job_id: &str) -> Result<JobOutput, EngineError> {
    let store = StagingStore::create(&scratch.db_path())?;

    let phase = Instant::now();
    let staged_a = stage_side(
        &store,
        Side::A,
        &input.file_a_path,
        &input.file_a_declared_name,
        &input.mapping_a,
        scratch,
    )?;
    let staged_b = stage_side(
        &store,
        Side::B,
        &input.file_b_path,
        &input.file_b_declared_name,
        &input.mapping_b,
        scratch,
    )?;
    store.create_indexes()?;
    log::debug!(
        "job {job_id}: staged {staged_a}+{staged_b} rows in {:?}",
        phase.elapsed()
    );

    let phase = Instant::now();
    let matched = matcher::run(&store)?;
    log::debug!("job {job_id}: matched {matched} pairs in {:?}", phase.elapsed());

    let mut collector = BoundedCollector::new();
    classify::classify_unmatched(&store, Side::A, &mut collector)?;
    classify::classify_unmatched(&store, Side::B, &mut collector)?;
    classify::classify_matched(&store, &mut collector)?;

    let hung_a = hung::detect(&store, Side::A, &mut collector)?;
    let hung_b = hung::detect(&store, Side::B, &mut collector)?;

    let summary = summary::aggregate(&store, matched, &collector, hung_a, hung_b)?;

    let total = summary.total_discrepancies;
    let discrepancies = collector.into_sorted();

    Ok(JobOutput {
        job_id: job_id.to_string(),
        has_more: total > discrepancies.len() as u64,
        total_discrepancy_count: total,
        summary,
        discrepancies,
    })
}

fn stage_side(
    store: &StagingStore,
    side: Side,
    path: &Path,
    declared_name: &str,
    mapping: &ColumnMapping,
    scratch: &Scratch,
) -> Result<u64, EngineError> {
    let decoded = decode(path, declared_name, scratch.dir())?;
    if decoded.headers.iter().all(|h| h.is_empty()) {
        return Err(EngineError::Input(format!(
            "'{declared_name}' is empty after decode"
        )));
    }

    let columns = ColumnIndexes::resolve(&decoded.headers, mapping, declared_name)?;
    let rows = decoded.rows.enumerate().map(move |(raw_index, cells)| {
        let cells = cells?;
        Ok(columns.canonical_row(&cells, raw_index as i64))
    });

    let inserted = store.load_side(side, rows, MAX_ROWS_PER_SIDE)?;
    if inserted == 0 {
        return Err(EngineError::Input(format!(
            "'{declared_name}' has no data rows"
        )));
    }
    Ok(inserted)
}

/// Mapped canonical fields resolved to header positions, done once per side
/// so row conversion is index lookups only.
#[derive(Clone, Copy, Debug)]
struct ColumnIndexes {
    a_number: usize,
    b_number: usize,
    seize_time: usize,
    answer_time: Option<usize>,
    end_time: Option<usize>,
    billed_duration: usize,
    rate: Option<usize>,
    lrn: usize,
}

impl ColumnIndexes {
    fn resolve(
        headers: &[String],
        mapping: &ColumnMapping,
        declared_name: &str,
    ) -> Result<Self, EngineError> {
        let find = |column: &str| -> Result<usize, EngineError> {
            headers.iter().position(|h| h == column).ok_or_else(|| {
                EngineError::Input(format!("'{declared_name}' has no column '{column}'"))
            })
        };
        let find_optional = |column: &Option<String>| -> Result<Option<usize>, EngineError> {
            match column {
                Some(c) if !c.trim().is_empty() => Ok(Some(find(c)?)),
                _ => Ok(None),
            }
        };

        Ok(Self {
            a_number: find(&mapping.a_number)?,
            b_number: find(&mapping.b_number)?,
            seize_time: find(&mapping.seize_time)?,
            answer_time: find_optional(&mapping.answer_time)?,
            end_time: find_optional(&mapping.end_time)?,
            billed_duration: find(&mapping.billed_duration)?,
            rate: find_optional(&mapping.rate)?,
            lrn: find(&mapping.lrn)?,
        })
    }

    fn canonical_row(&self, cells: &[CellValue], raw_index: i64) -> CanonicalRow {
        static EMPTY: CellValue = CellValue::Empty;
        let cell = |i: usize| cells.get(i).unwrap_or(&EMPTY);
        CanonicalRow {
            a_number: normalize_phone(cell(self.a_number)),
            b_number: normalize_phone(cell(self.b_number)),
            seize_time: normalize_timestamp(cell(self.seize_time)),
            answer_time: self.answer_time.and_then(|i| normalize_timestamp(cell(i))),
            end_time: self.end_time.and_then(|i| normalize_timestamp(cell(i))),
            billed_duration: normalize_duration(cell(self.billed_duration)),
            rate: self.rate.map_or(0.0, |i| normalize_rate(cell(i))),
            lrn: normalize_phone(cell(self.lrn)),
            raw_index,
        }
    }
}
