// Hung-call detection: clusters of unmatched rows sharing one duration,
// the signature of a switch timing calls out at a fixed value.

use crate::billing::{call_cost, round4};
use crate::collector::BoundedCollector;
use crate::error::EngineError;
use crate::model::{Discrepancy, DiscrepancyType, Side};
use crate::staging::StagingStore;

/// Durations at or below this never cluster.
pub const MIN_HUNG_DURATION_SECS: i64 = 30;
/// Rows sharing one duration needed to form a cluster.
pub const MIN_CLUSTER_SIZE: i64 = 3;
/// Exemplar rows reported per side, highest rate x duration first.
pub const EXEMPLAR_CAP: i64 = 200;

#[derive(Debug, Default, Clone, Copy)]
pub struct HungStats {
    /// Unmatched rows belonging to any cluster.
    pub calls: u64,
    /// Distinct clustered duration values.
    pub groups: u64,
}

/// Find one side's hung-call clusters among its unmatched rows and emit up
/// to `EXEMPLAR_CAP` exemplar discrepancies carrying the cluster size.
pub fn detect(
    store: &StagingStore,
    side: Side,
    collector: &mut BoundedCollector,
) -> Result<HungStats, EngineError> {
    let groups_sql = format!(
        "SELECT r.billed_duration, COUNT(*)
           FROM {table} r
          WHERE NOT EXISTS (SELECT 1 FROM {matched} m WHERE m.id = r.id)
            AND r.billed_duration > {MIN_HUNG_DURATION_SECS}
          GROUP BY r.billed_duration
         HAVING COUNT(*) >= {MIN_CLUSTER_SIZE}",
        table = side.table(),
        matched = side.matched_table(),
    );
    let mut stmt = store.conn.prepare(&groups_sql)?;
    let groups: Vec<(i64, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;
    drop(stmt);

    let stats = HungStats {
        calls: groups.iter().map(|(_, n)| *n as u64).sum(),
        groups: groups.len() as u64,
    };
    if groups.is_empty() {
        return Ok(stats);
    }

    // Clustered durations drive the exemplar scan through a temp table.
    let cluster_table = match side {
        Side::A => "hung_durations_a",
        Side::B => "hung_durations_b",
    };
    store.conn.execute_batch(&format!(
        "CREATE TEMP TABLE {cluster_table} (duration INTEGER PRIMARY KEY, cluster INTEGER NOT NULL)"
    ))?;
    {
        let mut insert = store.conn.prepare(&format!(
            "INSERT INTO {cluster_table} (duration, cluster) VALUES (?1, ?2)"
        ))?;
        for (duration, cluster) in &groups {
            insert.execute(rusqlite::params![duration, cluster])?;
        }
    }

    let exemplar_sql = format!(
        "SELECT r.a_number, r.b_number, r.seize_time, r.billed_duration, r.rate, r.lrn,
                r.raw_index, h.cluster
           FROM {table} r
           JOIN {cluster_table} h ON h.duration = r.billed_duration
          WHERE NOT EXISTS (SELECT 1 FROM {matched} m WHERE m.id = r.id)
          ORDER BY r.rate * r.billed_duration DESC
          LIMIT {EXEMPLAR_CAP}",
        table = side.table(),
        matched = side.matched_table(),
    );
    let mut stmt = store.conn.prepare(&exemplar_sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        collector.add(exemplar(
            side,
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ));
    }
    Ok(stats)
}

#[allow(clippy::too_many_arguments)]
fn exemplar(
    side: Side,
    a_number: String,
    b_number: String,
    seize_time: Option<i64>,
    duration: i64,
    rate: f64,
    lrn: String,
    raw_index: i64,
    cluster: i64,
) -> Discrepancy {
    let kind = match side {
        Side::A => DiscrepancyType::HungCallYours,
        Side::B => DiscrepancyType::HungCallProvider,
    };
    let cost = round4(call_cost(duration, rate));

    let mut d = Discrepancy::new(kind, a_number, b_number);
    d.seize_time = seize_time;
    d.source_index = Some(raw_index);
    d.hung_call_count = Some(cluster);
    match side {
        Side::A => {
            d.your_duration = Some(duration);
            d.your_rate = Some(rate);
            d.your_cost = Some(cost);
            d.cost_difference = cost;
            if !lrn.is_empty() {
                d.your_lrn = Some(lrn);
            }
        }
        Side::B => {
            d.provider_duration = Some(duration);
            d.provider_rate = Some(rate);
            d.provider_cost = Some(cost);
            d.cost_difference = -cost;
            if !lrn.is_empty() {
                d.provider_lrn = Some(lrn);
            }
        }
    }
    d
}
