use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// Job-scoped scratch directory under the OS temp dir, keyed by job id. It
/// holds the staging database (plus WAL sidecars) and any archive members
/// extracted during decode.
///
/// Removal happens on drop, so every exit path releases the directory. A
/// cleanup failure is logged and never masks the job's own error.
pub struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    pub fn create(job_id: &str) -> Result<Self, EngineError> {
        let dir = std::env::temp_dir().join("cdrecon").join(job_id);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.join("staging.db")
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            log::warn!("scratch cleanup failed for {}: {e}", self.dir.display());
        }
    }
}
