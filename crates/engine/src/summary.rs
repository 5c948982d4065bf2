// Job-level totals, computed by SQL aggregation over the staging store.
// Rows never travel into application memory for these figures.

use std::collections::BTreeMap;

use crate::billing::round2;
use crate::collector::BoundedCollector;
use crate::error::EngineError;
use crate::hung::HungStats;
use crate::model::{DiscrepancyType, Side, Summary};
use crate::staging::StagingStore;

struct SideTotals {
    records: u64,
    billed: f64,
    minutes: f64,
}

// The SQL billing expression mirrors billing::call_cost: integer division
// on (d + 5) / 6 is the ceiling for d > 0, and non-positive durations are
// free.
fn side_totals(store: &StagingStore, side: Side) -> Result<SideTotals, EngineError> {
    let sql = format!(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN billed_duration > 0
                                  THEN ((billed_duration + 5) / 6) * rate / 10.0
                                  ELSE 0 END), 0.0),
                COALESCE(SUM(billed_duration), 0)
           FROM {}",
        side.table()
    );
    let (records, billed, duration_secs): (i64, f64, i64) =
        store
            .conn
            .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
    Ok(SideTotals {
        records: records as u64,
        billed,
        minutes: duration_secs as f64 / 60.0,
    })
}

struct UnmatchedSplit {
    total: u64,
    billed: u64,
    zero: u64,
}

fn unmatched_split(store: &StagingStore, side: Side) -> Result<UnmatchedSplit, EngineError> {
    let sql = format!(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN r.billed_duration > 0 THEN 1 ELSE 0 END), 0)
           FROM {table} r
          WHERE NOT EXISTS (SELECT 1 FROM {matched} m WHERE m.id = r.id)",
        table = side.table(),
        matched = side.matched_table(),
    );
    let (total, billed): (i64, i64) = store
        .conn
        .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(UnmatchedSplit {
        total: total as u64,
        billed: billed as u64,
        zero: (total - billed) as u64,
    })
}

/// Assemble the job summary from staging-store aggregates, the collector's
/// running tallies, and the hung-call stats.
pub fn aggregate(
    store: &StagingStore,
    matched_records: u64,
    collector: &BoundedCollector,
    hung_a: HungStats,
    hung_b: HungStats,
) -> Result<Summary, EngineError> {
    let a = side_totals(store, Side::A)?;
    let b = side_totals(store, Side::B)?;
    let unmatched_a = unmatched_split(store, Side::A)?;
    let unmatched_b = unmatched_split(store, Side::B)?;

    let mut impact_breakdown = BTreeMap::new();
    let mut monetary_impact = 0.0;
    let mut total_discrepancies = 0u64;
    for kind in DiscrepancyType::ALL {
        let count = collector.count(kind);
        if count == 0 {
            continue;
        }
        let sum = collector.cost_total(kind);
        impact_breakdown.insert(kind.to_string(), round2(sum));
        monetary_impact += sum;
        total_discrepancies += count;
    }

    Ok(Summary {
        total_records_a: a.records,
        total_records_b: b.records,
        matched_records,
        your_total_billed: round2(a.billed),
        provider_total_billed: round2(b.billed),
        billing_difference: round2(a.billed - b.billed),
        your_total_minutes: round2(a.minutes),
        provider_total_minutes: round2(b.minutes),
        minutes_difference: round2(a.minutes - b.minutes),
        missing_in_yours: unmatched_a.total,
        missing_in_provider: unmatched_b.total,
        zero_duration_in_yours: unmatched_a.zero,
        billed_missing_in_yours: unmatched_a.billed,
        zero_duration_in_provider: unmatched_b.zero,
        billed_missing_in_provider: unmatched_b.billed,
        duration_mismatches: collector.count(DiscrepancyType::DurationMismatch),
        rate_mismatches: collector.count(DiscrepancyType::RateMismatch),
        cost_mismatches: collector.count(DiscrepancyType::CostMismatch),
        lrn_mismatches: collector.count(DiscrepancyType::LrnMismatch),
        total_discrepancies,
        monetary_impact: round2(monetary_impact),
        impact_breakdown,
        hung_calls_in_yours: hung_a.calls,
        hung_calls_in_provider: hung_b.calls,
        hung_call_groups_yours: hung_a.groups,
        hung_call_groups_provider: hung_b.groups,
    })
}
