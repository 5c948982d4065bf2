//! TOML job files: the two input files plus per-side column mappings.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use cdrecon_engine::{ColumnMapping, JobInput};

/// A `.toml` job description. `yours` is the carrier's own export (side A),
/// `provider` the upstream export (side B).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    #[serde(default)]
    pub name: Option<String>,
    pub yours: SideConfig,
    pub provider: SideConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SideConfig {
    pub file: PathBuf,
    /// Original file name for format dispatch; defaults to the file name of
    /// `file`. Useful when the data sits in a UUID-named upload copy.
    #[serde(default)]
    pub declared_name: Option<String>,
    pub columns: ColumnMapping,
}

impl SideConfig {
    fn declared_name(&self) -> String {
        self.declared_name.clone().unwrap_or_else(|| {
            self.file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

impl JobFile {
    pub fn from_toml(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| e.to_string())
    }

    /// Resolve to an engine job input, with relative paths taken against
    /// the job file's directory.
    pub fn to_job_input(&self, base_dir: &Path) -> JobInput {
        JobInput {
            file_a_path: resolve(base_dir, &self.yours.file),
            file_a_declared_name: self.yours.declared_name(),
            file_b_path: resolve(base_dir, &self.provider.file),
            file_b_declared_name: self.provider.declared_name(),
            mapping_a: self.yours.columns.clone(),
            mapping_b: self.provider.columns.clone(),
        }
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
