//! Execution settings, loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vecjoin_common::error::{Error, Result};
use vecjoin_storage::DEFAULT_BATCH_CAPACITY;

pub const DEFAULT_DUMP_FILE_PREFIX: &str = "mapjoin-";

fn default_batch_capacity() -> usize {
    DEFAULT_BATCH_CAPACITY
}

fn default_dump_file_prefix() -> String {
    DEFAULT_DUMP_FILE_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,

    #[serde(default)]
    pub hashtable: HashTableConfig,
}

/// Where published hash tables live and how they are read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashTableConfig {
    #[serde(default = "default_dump_file_prefix")]
    pub dump_file_prefix: String,

    /// Shared directory of published tables. Without it only direct fetch
    /// can fill the join tables.
    #[serde(default)]
    pub base_dir: Option<String>,

    #[serde(default)]
    pub bucket_map_join: bool,

    #[serde(default = "default_true")]
    pub verify_checksum: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            batch_capacity: default_batch_capacity(),
            hashtable: HashTableConfig::default(),
        }
    }
}

impl Default for HashTableConfig {
    fn default() -> Self {
        Self {
            dump_file_prefix: default_dump_file_prefix(),
            base_dir: None,
            bucket_map_join: false,
            verify_checksum: true,
        }
    }
}

impl ExecutionConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ExecutionConfig = toml::from_str(s)
            .map_err(|e| Error::configuration(format!("parse toml: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::storage(path.display().to_string(), e))?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity == 0 {
            return Err(Error::configuration("batch_capacity must be positive"));
        }
        self.hashtable.validate()
    }
}

impl HashTableConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dump_file_prefix.contains('/') {
            return Err(Error::configuration(format!(
                "dump_file_prefix {:?} must not contain '/'",
                self.dump_file_prefix
            )));
        }
        Ok(())
    }
}
