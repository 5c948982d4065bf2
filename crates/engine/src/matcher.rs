use std::collections::HashSet;

use crate::error::EngineError;
use crate::staging::StagingStore;

/// Two seize times match when they differ by at most this many seconds.
pub const SEIZE_TOLERANCE_SECS: i64 = 60;

// Best candidates first: smallest seize-time delta, then smallest duration
// delta, then lowest ids so equal-cost ties resolve deterministically.
const CANDIDATE_SQL: &str = "\
SELECT a.id, b.id
  FROM records_a a
  JOIN records_b b
    ON a.a_number = b.a_number
   AND a.b_number = b.b_number
 WHERE ABS(COALESCE(a.seize_time, 0) - COALESCE(b.seize_time, 0)) <= ?1
 ORDER BY ABS(COALESCE(a.seize_time, 0) - COALESCE(b.seize_time, 0)) ASC,
          ABS(a.billed_duration - b.billed_duration) ASC,
          a.id ASC,
          b.id ASC";

/// Greedy 1-to-1 selection over the candidate cursor: accept a pair only
/// when neither row has been taken. Returns the number of matched pairs.
///
/// The cursor must stay lazy. Under equal A/B numbers the cross product can
/// dwarf both inputs, so candidates are never materialized; only accepted
/// ids and the used-id sets live in memory.
pub fn run(store: &StagingStore) -> Result<u64, EngineError> {
    let mut stmt = store.conn.prepare(CANDIDATE_SQL)?;
    let mut rows = stmt.query([SEIZE_TOLERANCE_SECS])?;

    let mut used_a: HashSet<i64> = HashSet::new();
    let mut used_b: HashSet<i64> = HashSet::new();
    let mut accepted: Vec<(i64, i64)> = Vec::new();

    while let Some(row) = rows.next()? {
        let a_id: i64 = row.get(0)?;
        let b_id: i64 = row.get(1)?;
        if used_a.contains(&a_id) || used_b.contains(&b_id) {
            continue;
        }
        used_a.insert(a_id);
        used_b.insert(b_id);
        accepted.push((a_id, b_id));
    }
    drop(rows);
    drop(stmt);

    store.mark_matched(&accepted)?;
    Ok(accepted.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Side;
    use crate::staging::tests::{row, store_with};

    fn matched_pairs(store: &StagingStore) -> Vec<(i64, i64)> {
        let mut stmt = store
            .conn
            .prepare("SELECT id, b_id FROM matched_a_ids ORDER BY id")
            .unwrap();
        let pairs = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        pairs
    }

    #[test]
    fn tolerance_boundary_is_inclusive_at_60() {
        let (_dir, store) = store_with(
            vec![
                row("5551234567", "5559876543", Some(1000), 60, 0.015, "", 0),
                row("5551111111", "5552222222", Some(1000), 60, 0.015, "", 1),
            ],
            vec![
                row("5551234567", "5559876543", Some(1060), 60, 0.015, "", 0),
                row("5551111111", "5552222222", Some(1061), 60, 0.015, "", 1),
            ],
        );
        assert_eq!(run(&store).unwrap(), 1);
        assert_eq!(matched_pairs(&store), vec![(1, 1)]);
    }

    #[test]
    fn greedy_takes_closest_seize_time_first() {
        let (_dir, store) = store_with(
            vec![row("5551234567", "5559876543", Some(1000), 60, 0.015, "", 0)],
            vec![
                row("5551234567", "5559876543", Some(1040), 60, 0.015, "", 0),
                row("5551234567", "5559876543", Some(1005), 60, 0.015, "", 1),
            ],
        );
        assert_eq!(run(&store).unwrap(), 1);
        // b id 2 (seize 1005) wins over b id 1 (seize 1040).
        assert_eq!(matched_pairs(&store), vec![(1, 2)]);
    }

    #[test]
    fn duration_delta_breaks_time_ties() {
        let (_dir, store) = store_with(
            vec![row("5551234567", "5559876543", Some(1000), 60, 0.015, "", 0)],
            vec![
                row("5551234567", "5559876543", Some(1010), 95, 0.015, "", 0),
                row("5551234567", "5559876543", Some(1010), 61, 0.015, "", 1),
            ],
        );
        assert_eq!(run(&store).unwrap(), 1);
        assert_eq!(matched_pairs(&store), vec![(1, 2)]);
    }

    #[test]
    fn each_row_is_used_at_most_once() {
        let (_dir, store) = store_with(
            vec![
                row("5551234567", "5559876543", Some(1000), 60, 0.015, "", 0),
                row("5551234567", "5559876543", Some(1001), 60, 0.015, "", 1),
                row("5551234567", "5559876543", Some(1002), 60, 0.015, "", 2),
            ],
            vec![
                row("5551234567", "5559876543", Some(1000), 60, 0.015, "", 0),
                row("5551234567", "5559876543", Some(1001), 60, 0.015, "", 1),
            ],
        );
        assert_eq!(run(&store).unwrap(), 2);
        let pairs = matched_pairs(&store);
        let a_ids: HashSet<i64> = pairs.iter().map(|p| p.0).collect();
        let b_ids: HashSet<i64> = pairs.iter().map(|p| p.1).collect();
        assert_eq!(a_ids.len(), pairs.len());
        assert_eq!(b_ids.len(), pairs.len());
    }

    #[test]
    fn missing_seize_times_coalesce_to_zero() {
        let (_dir, store) = store_with(
            vec![row("5551234567", "5559876543", None, 60, 0.015, "", 0)],
            vec![row("5551234567", "5559876543", Some(30), 60, 0.015, "", 0)],
        );
        // COALESCE(NULL, 0) vs 30 is within tolerance.
        assert_eq!(run(&store).unwrap(), 1);
    }
}
