//! Populates the hash tables of every build-side join position before a task
//! starts probing.
//!
//! Tables come from two places. Positions with a direct-fetch producer are
//! built in-task by running the producer into a [`CollectingSink`]. Every
//! other position is read from the blob store at
//! `{base}/{prefix}{position}/{file}`, where `file` is chosen by the
//! [`BucketPruner`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};
use vecjoin_common::error::{Error, Result};

use crate::blob_store::{BlobStore, hashtable_path};
use crate::bucket::BucketPruner;
use crate::config::HashTableConfig;
use crate::hashtable::{CollectingSink, HashTableContainer, HashTableSerDe};
use crate::metrics::LoaderMetrics;
use crate::plan::{LocalWork, MapJoinDesc, TaskContext};

/// Join tables indexed by position. The streamed position is always `None`.
pub type MapJoinTables = Vec<Option<Arc<HashTableContainer>>>;

#[derive(Clone)]
pub struct HashTableLoader {
    store: Arc<dyn BlobStore>,
    serde: HashTableSerDe,
    metrics: Arc<LoaderMetrics>,
}

impl HashTableLoader {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            serde: HashTableSerDe::default(),
            metrics: Arc::new(LoaderMetrics::new()),
        }
    }

    pub fn with_config(mut self, config: &HashTableConfig) -> Self {
        self.serde = HashTableSerDe::new(config.verify_checksum);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<LoaderMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<LoaderMetrics> {
        &self.metrics
    }

    /// Returns one table per build-side position, or fails without handing
    /// back a partial set.
    #[instrument(skip(self, ctx, desc, work), fields(task_id = %ctx.task_id))]
    pub fn load(
        &self,
        ctx: &TaskContext,
        desc: &MapJoinDesc,
        work: &LocalWork,
    ) -> Result<MapJoinTables> {
        let start = Instant::now();
        desc.validate()?;
        info!(
            current_input = ?ctx.current_input_path,
            positions = desc.num_positions(),
            "Loading map join hash tables"
        );

        let mut tables: MapJoinTables = vec![None; desc.num_positions()];
        self.fetch_directly(ctx, desc, work, &mut tables)?;

        match work.base_dir.as_deref() {
            Some(base_dir) => self.load_published(ctx, desc, base_dir, &mut tables)?,
            None => debug!("No base directory configured, skipping load of published tables"),
        }

        for position in desc.small_positions() {
            if tables[position].is_none() {
                return Err(Error::configuration(format!(
                    "no hash table for join position {}: not fetched directly and no base directory",
                    position
                )));
            }
        }

        self.metrics.record_load(start.elapsed());
        info!(
            elapsed_us = start.elapsed().as_micros() as u64,
            "Map join hash tables ready"
        );
        Ok(tables)
    }

    fn fetch_directly(
        &self,
        ctx: &TaskContext,
        desc: &MapJoinDesc,
        work: &LocalWork,
        tables: &mut MapJoinTables,
    ) -> Result<()> {
        if work.direct_fetch.is_empty() {
            return Ok(());
        }
        let mut sink = CollectingSink::new(desc);
        for (&position, producer) in &work.direct_fetch {
            debug!(position, "Running direct fetch producer");
            let mut position_sink = sink.position_sink(position)?;
            producer.produce(ctx, &mut position_sink)?;
        }
        let skipped = sink.skipped_null_keys();
        let mut built = 0u64;
        for (position, table) in sink.into_tables().into_iter().enumerate() {
            if let Some(table) = table {
                tables[position] = Some(Arc::new(table));
                built += 1;
            }
        }
        self.metrics.record_tables_built_directly(built);
        info!(built, skipped_null_keys = skipped, "Direct fetch complete");
        Ok(())
    }

    fn load_published(
        &self,
        ctx: &TaskContext,
        desc: &MapJoinDesc,
        base_dir: &str,
        tables: &mut MapJoinTables,
    ) -> Result<()> {
        let pruner = BucketPruner::new(desc.bucket_map_join, desc.bucket_context.as_ref());
        for position in desc.small_positions() {
            if tables[position].is_some() {
                continue;
            }
            let file_name = pruner.file_name(position, ctx.current_input_path.as_deref())?;
            let path = hashtable_path(base_dir, &desc.dump_file_prefix, position, &file_name);
            debug!(position, path = %path, "Loading hash table");

            let bytes = self.store.get(&path)?;
            let table = self.serde.decode_from_slice(&bytes).map_err(|e| match e {
                Error::Deserialization(msg) => {
                    Error::deserialization(format!("hash table {}: {}", path, msg))
                }
                other => other,
            })?;
            let input = desc.input(position)?;
            if table.key_types() != input.key_types.as_slice()
                || table.value_types() != input.value_types.as_slice()
            {
                return Err(Error::deserialization(format!(
                    "hash table {} has schema {:?} -> {:?}, join position {} expects {:?} -> {:?}",
                    path,
                    table.key_types(),
                    table.value_types(),
                    position,
                    input.key_types,
                    input.value_types
                )));
            }
            self.metrics.record_table_loaded(bytes.len() as u64);
            tables[position] = Some(Arc::new(table));
        }
        Ok(())
    }
}

impl fmt::Debug for HashTableLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTableLoader")
            .field("serde", &self.serde)
            .field("metrics", &self.metrics)
            .finish()
    }
}
