// Discrepancy classification for unmatched rows and matched pairs.
//
// Orientation: positive cost differences mean side A billed more. One-sided
// A records carry +your_cost, one-sided B records -provider_cost.

use crate::billing::{call_cost, round4};
use crate::collector::BoundedCollector;
use crate::error::EngineError;
use crate::model::{Discrepancy, DiscrepancyType, Side};
use crate::staging::StagingStore;

/// Matched pairs with a smaller absolute cost delta are equal.
pub const COST_EPSILON: f64 = 1e-4;
/// Durations within this many seconds are equal.
pub const DURATION_EPSILON_SECS: i64 = 1;
/// Rates within this are equal.
pub const RATE_EPSILON: f64 = 1e-4;

/// Stream one side's unmatched rows out of the staging store and emit a
/// one-sided discrepancy for each.
pub fn classify_unmatched(
    store: &StagingStore,
    side: Side,
    collector: &mut BoundedCollector,
) -> Result<(), EngineError> {
    let sql = format!(
        "SELECT r.a_number, r.b_number, r.seize_time, r.billed_duration, r.rate, r.lrn, r.raw_index
           FROM {table} r
          WHERE NOT EXISTS (SELECT 1 FROM {matched} m WHERE m.id = r.id)",
        table = side.table(),
        matched = side.matched_table(),
    );
    let mut stmt = store.conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        collector.add(one_sided(
            side,
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ));
    }
    Ok(())
}

fn one_sided(
    side: Side,
    a_number: String,
    b_number: String,
    seize_time: Option<i64>,
    duration: i64,
    rate: f64,
    lrn: String,
    raw_index: i64,
) -> Discrepancy {
    let kind = match (side, duration > 0) {
        (Side::A, true) => DiscrepancyType::MissingInB,
        (Side::A, false) => DiscrepancyType::ZeroDurationInB,
        (Side::B, true) => DiscrepancyType::MissingInA,
        (Side::B, false) => DiscrepancyType::ZeroDurationInA,
    };
    let cost = round4(call_cost(duration, rate));

    let mut d = Discrepancy::new(kind, a_number, b_number);
    d.seize_time = seize_time;
    d.source_index = Some(raw_index);
    match side {
        Side::A => {
            d.your_duration = Some(duration);
            d.your_rate = Some(rate);
            d.your_cost = Some(cost);
            d.your_lrn = non_empty(lrn);
            d.cost_difference = cost;
        }
        Side::B => {
            d.provider_duration = Some(duration);
            d.provider_rate = Some(rate);
            d.provider_cost = Some(cost);
            d.provider_lrn = non_empty(lrn);
            d.cost_difference = -cost;
        }
    }
    d
}

/// Stream the matched pairs and emit a discrepancy for each pair that
/// disagrees. An LRN mismatch supersedes the cost variants; the dollar
/// delta rides on the LRN finding.
pub fn classify_matched(
    store: &StagingStore,
    collector: &mut BoundedCollector,
) -> Result<(), EngineError> {
    const MATCHED_SQL: &str = "\
SELECT a.a_number, a.b_number, a.seize_time, b.seize_time,
       a.billed_duration, b.billed_duration, a.rate, b.rate,
       a.lrn, b.lrn, a.raw_index, b.raw_index
  FROM matched_a_ids m
  JOIN records_a a ON a.id = m.id
  JOIN records_b b ON b.id = m.b_id";

    let mut stmt = store.conn.prepare(MATCHED_SQL)?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        let pair = MatchedPair {
            a_number: row.get(0)?,
            b_number: row.get(1)?,
            seize_a: row.get(2)?,
            seize_b: row.get(3)?,
            duration_a: row.get(4)?,
            duration_b: row.get(5)?,
            rate_a: row.get(6)?,
            rate_b: row.get(7)?,
            lrn_a: row.get(8)?,
            lrn_b: row.get(9)?,
            index_a: row.get(10)?,
            index_b: row.get(11)?,
        };
        if let Some(d) = classify_pair(pair) {
            collector.add(d);
        }
    }
    Ok(())
}

struct MatchedPair {
    a_number: String,
    b_number: String,
    seize_a: Option<i64>,
    seize_b: Option<i64>,
    duration_a: i64,
    duration_b: i64,
    rate_a: f64,
    rate_b: f64,
    lrn_a: String,
    lrn_b: String,
    index_a: i64,
    index_b: i64,
}

fn classify_pair(pair: MatchedPair) -> Option<Discrepancy> {
    let your_cost = call_cost(pair.duration_a, pair.rate_a);
    let provider_cost = call_cost(pair.duration_b, pair.rate_b);
    let cost_diff = your_cost - provider_cost;

    let lrn_differs =
        !pair.lrn_a.is_empty() && !pair.lrn_b.is_empty() && pair.lrn_a != pair.lrn_b;

    let kind = if lrn_differs {
        DiscrepancyType::LrnMismatch
    } else if cost_diff.abs() > COST_EPSILON {
        let duration_delta = (pair.duration_a - pair.duration_b).abs();
        let rate_delta = (pair.rate_a - pair.rate_b).abs();
        if duration_delta > DURATION_EPSILON_SECS && rate_delta <= RATE_EPSILON {
            DiscrepancyType::DurationMismatch
        } else if rate_delta > RATE_EPSILON && duration_delta <= DURATION_EPSILON_SECS {
            DiscrepancyType::RateMismatch
        } else {
            DiscrepancyType::CostMismatch
        }
    } else {
        return None;
    };

    let mut d = Discrepancy::new(kind, pair.a_number, pair.b_number);
    d.seize_time = pair.seize_a.or(pair.seize_b);
    d.your_duration = Some(pair.duration_a);
    d.provider_duration = Some(pair.duration_b);
    d.your_rate = Some(pair.rate_a);
    d.provider_rate = Some(pair.rate_b);
    d.your_cost = Some(round4(your_cost));
    d.provider_cost = Some(round4(provider_cost));
    d.cost_difference = round4(cost_diff);
    d.your_lrn = non_empty(pair.lrn_a);
    d.provider_lrn = non_empty(pair.lrn_b);
    d.source_index_a = Some(pair.index_a);
    d.source_index_b = Some(pair.index_b);
    Some(d)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
