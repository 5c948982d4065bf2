// The scratch store backing one job: two canonical-row tables, the matched
// id tables, and nothing else. Created fresh per job and deleted with it.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::EngineError;
use crate::model::{CanonicalRow, Side};

/// Rows per insert transaction.
pub const INSERT_BATCH: u64 = 10_000;

const SCHEMA: &str = r#"
CREATE TABLE records_a (
    id INTEGER PRIMARY KEY,
    a_number TEXT NOT NULL,
    b_number TEXT NOT NULL,
    seize_time INTEGER,
    answer_time INTEGER,
    end_time INTEGER,
    billed_duration INTEGER NOT NULL,
    rate REAL NOT NULL,
    lrn TEXT NOT NULL,
    raw_index INTEGER NOT NULL
);

CREATE TABLE records_b (
    id INTEGER PRIMARY KEY,
    a_number TEXT NOT NULL,
    b_number TEXT NOT NULL,
    seize_time INTEGER,
    answer_time INTEGER,
    end_time INTEGER,
    billed_duration INTEGER NOT NULL,
    rate REAL NOT NULL,
    lrn TEXT NOT NULL,
    raw_index INTEGER NOT NULL
);

CREATE TABLE matched_a_ids (
    id INTEGER PRIMARY KEY,
    b_id INTEGER NOT NULL
);

CREATE TABLE matched_b_ids (
    id INTEGER PRIMARY KEY
);
"#;

pub struct StagingStore {
    pub(crate) conn: Connection,
}

impl StagingStore {
    /// Open a fresh scratch store. WAL with synchronous commit off: the
    /// store is job-scoped, single-process, and deleted with the job.
    pub fn create(path: &Path) -> Result<Self, EngineError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = OFF;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Bulk-load one side in transactions of `INSERT_BATCH` rows. Fails
    /// with a limit error as soon as `max_rows` is exceeded.
    pub fn load_side<I>(&self, side: Side, rows: I, max_rows: u64) -> Result<u64, EngineError>
    where
        I: IntoIterator<Item = Result<CanonicalRow, EngineError>>,
    {
        let sql = format!(
            "INSERT INTO {} (a_number, b_number, seize_time, answer_time, end_time, \
             billed_duration, rate, lrn, raw_index) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            side.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;

        self.conn.execute_batch("BEGIN")?;
        let mut inserted: u64 = 0;
        for row in rows {
            let row = row?;
            if inserted >= max_rows {
                return Err(EngineError::Limit(format!(
                    "side {} exceeds the {max_rows} row limit",
                    side.label()
                )));
            }
            stmt.execute(params![
                row.a_number,
                row.b_number,
                row.seize_time,
                row.answer_time,
                row.end_time,
                row.billed_duration,
                row.rate,
                row.lrn,
                row.raw_index,
            ])?;
            inserted += 1;
            if inserted % INSERT_BATCH == 0 {
                self.conn.execute_batch("COMMIT; BEGIN;")?;
            }
        }
        self.conn.execute_batch("COMMIT")?;
        Ok(inserted)
    }

    /// Secondary indexes, created after bulk load.
    pub fn create_indexes(&self) -> Result<(), EngineError> {
        self.conn.execute_batch(
            "CREATE INDEX idx_a_numbers ON records_a (a_number, b_number);
             CREATE INDEX idx_a_seize ON records_a (seize_time);
             CREATE INDEX idx_b_numbers ON records_b (a_number, b_number);
             CREATE INDEX idx_b_seize ON records_b (seize_time);",
        )?;
        Ok(())
    }

    pub fn record_count(&self, side: Side) -> Result<u64, EngineError> {
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", side.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Record the matcher's accepted pairs into the matched id tables.
    pub fn mark_matched(&self, pairs: &[(i64, i64)]) -> Result<(), EngineError> {
        let mut insert_a = self
            .conn
            .prepare("INSERT INTO matched_a_ids (id, b_id) VALUES (?1, ?2)")?;
        let mut insert_b = self.conn.prepare("INSERT INTO matched_b_ids (id) VALUES (?1)")?;

        for chunk in pairs.chunks(INSERT_BATCH as usize) {
            self.conn.execute_batch("BEGIN")?;
            for (a_id, b_id) in chunk {
                insert_a.execute(params![a_id, b_id])?;
                insert_b.execute(params![b_id])?;
            }
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }
}
