use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument};
use vecjoin_common::error::{Error, Result};

use crate::blob_store::{BlobStore, hashtable_path};
use crate::bucket::bucket_file_name;
use crate::config::HashTableConfig;
use crate::hashtable::{HashTableContainer, HashTableSerDe};

/// Build-stage side of the shared storage: writes a finished table where
/// the loader of every probing task will look for it.
#[derive(Clone)]
pub struct HashTablePublisher {
    store: Arc<dyn BlobStore>,
    base_dir: String,
    dump_file_prefix: String,
    serde: HashTableSerDe,
}

impl HashTablePublisher {
    pub fn new(
        store: Arc<dyn BlobStore>,
        base_dir: impl Into<String>,
        dump_file_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            base_dir: base_dir.into(),
            dump_file_prefix: dump_file_prefix.into(),
            serde: HashTableSerDe::default(),
        }
    }

    pub fn from_config(store: Arc<dyn BlobStore>, config: &HashTableConfig) -> Result<Self> {
        config.validate()?;
        let base_dir = config.base_dir.clone().ok_or_else(|| {
            Error::configuration("publishing hash tables requires hashtable.base_dir")
        })?;
        Ok(Self::new(store, base_dir, config.dump_file_prefix.clone()))
    }

    /// Path the table for `position` built against `big_file` is stored at.
    pub fn path_for(&self, position: usize, big_file: Option<&str>) -> String {
        hashtable_path(
            &self.base_dir,
            &self.dump_file_prefix,
            position,
            &bucket_file_name(big_file),
        )
    }

    /// Serializes `container` to its deterministic path and returns the path.
    /// Publishing to a path that already holds a table fails.
    #[instrument(skip(self, container), fields(keys = container.key_count()))]
    pub fn publish(
        &self,
        position: usize,
        big_file: Option<&str>,
        container: &HashTableContainer,
    ) -> Result<String> {
        let path = self.path_for(position, big_file);
        let bytes = self.serde.encode_to_vec(container)?;
        let len = bytes.len();
        self.store.put_if_absent(&path, bytes)?;
        info!(path = %path, bytes = len, rows = container.row_count(), "Published hash table");
        Ok(path)
    }
}

impl fmt::Debug for HashTablePublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTablePublisher")
            .field("base_dir", &self.base_dir)
            .field("dump_file_prefix", &self.dump_file_prefix)
            .finish()
    }
}
