//! Bucket-aware selection of the published hash-table partition that
//! matches the streamed side's current file.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use vecjoin_common::error::{Error, Result};

/// File name used when there is no streamed-side file to key on.
pub const DEFAULT_BUCKET_FILE_NAME: &str = "-";

/// Final path component of `path`, or `"-"` when there is none.
pub fn bucket_file_name(path: Option<&str>) -> String {
    match path {
        None => DEFAULT_BUCKET_FILE_NAME.to_string(),
        Some(p) => {
            let trimmed = p.trim_end_matches('/');
            match trimmed.rsplit('/').next() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => DEFAULT_BUCKET_FILE_NAME.to_string(),
            }
        }
    }
}

/// Bucket layout of a bucketed map join.
///
/// For every build-side alias: big-table bucket file -> small-table files of
/// the matching bucket. Join positions are bound to one or more aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMapJoinContext {
    alias_bucket_file_mapping: IndexMap<String, IndexMap<String, Vec<String>>>,
    position_aliases: IndexMap<usize, IndexSet<String>>,
}

impl BucketMapJoinContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bucket_mapping(
        &mut self,
        alias: impl Into<String>,
        big_file: impl Into<String>,
        small_files: Vec<String>,
    ) -> &mut Self {
        self.alias_bucket_file_mapping
            .entry(alias.into())
            .or_default()
            .insert(big_file.into(), small_files);
        self
    }

    pub fn bind_position(&mut self, position: usize, alias: impl Into<String>) -> &mut Self {
        self.position_aliases
            .entry(position)
            .or_default()
            .insert(alias.into());
        self
    }

    pub fn aliases(&self, position: usize) -> Option<&IndexSet<String>> {
        self.position_aliases.get(&position)
    }

    pub fn small_files(&self, alias: &str, big_file: &str) -> Option<&[String]> {
        self.alias_bucket_file_mapping
            .get(alias)
            .and_then(|m| m.get(big_file))
            .map(Vec::as_slice)
    }

    /// The canonical big-table file for `small_file`: the lexicographically
    /// smallest big file whose bucket lists it.
    pub fn mapping_big_file(&self, alias: &str, small_file: &str) -> Option<&str> {
        self.alias_bucket_file_mapping
            .get(alias)?
            .iter()
            .filter(|(_, smalls)| smalls.iter().any(|s| s == small_file))
            .map(|(big, _)| big.as_str())
            .min()
    }

    /// Rejects layouts whose bucket counts do not line up: every bound alias
    /// must have a mapping, every big file must list at least one small file,
    /// and every alias must cover the same set of big files.
    pub fn validate(&self) -> Result<()> {
        for (pos, aliases) in &self.position_aliases {
            if aliases.is_empty() {
                return Err(Error::configuration(format!(
                    "join position {} is bound to no alias",
                    pos
                )));
            }
            for alias in aliases {
                if !self.alias_bucket_file_mapping.contains_key(alias) {
                    return Err(Error::configuration(format!(
                        "alias {} at position {} has no bucket file mapping",
                        alias, pos
                    )));
                }
            }
        }
        let mut reference: Option<(&String, Vec<&String>)> = None;
        for (alias, mapping) in &self.alias_bucket_file_mapping {
            if let Some((big, _)) = mapping.iter().find(|(_, smalls)| smalls.is_empty()) {
                return Err(Error::configuration(format!(
                    "bucket mismatch: big file {} has no {} bucket",
                    big, alias
                )));
            }
            let mut bigs: Vec<&String> = mapping.keys().collect();
            bigs.sort();
            match &reference {
                None => reference = Some((alias, bigs)),
                Some((ref_alias, ref_bigs)) if *ref_bigs != bigs => {
                    return Err(Error::configuration(format!(
                        "bucket mismatch: aliases {} and {} cover different big-table files ({} vs {})",
                        ref_alias,
                        alias,
                        ref_bigs.len(),
                        bigs.len()
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Resolves which published partition a join position should load.
#[derive(Debug, Clone, Copy)]
pub struct BucketPruner<'a> {
    enabled: bool,
    context: Option<&'a BucketMapJoinContext>,
}

impl<'a> BucketPruner<'a> {
    pub fn new(enabled: bool, context: Option<&'a BucketMapJoinContext>) -> Self {
        Self { enabled, context }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            context: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Big-table file whose partition holds the rows of `position` relevant
    /// to `current_input`. `None` means no pruning: the default partition.
    pub fn resolve(&self, position: usize, current_input: Option<&str>) -> Result<Option<String>> {
        if !self.enabled {
            return Ok(None);
        }
        let Some(current) = current_input else {
            return Ok(None);
        };
        let ctx = self.context.ok_or_else(|| {
            Error::configuration("bucket map join enabled without a bucket context")
        })?;
        let alias = ctx
            .aliases(position)
            .and_then(|a| a.first())
            .ok_or_else(|| {
                Error::configuration(format!("no alias bound to join position {}", position))
            })?;
        let small = ctx
            .small_files(alias, current)
            .and_then(|s| s.first())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "no {} bucket mapped for streamed file {}",
                    alias, current
                ))
            })?;
        let big = ctx.mapping_big_file(alias, small).ok_or_else(|| {
            Error::internal(format!(
                "small file {} of alias {} maps back to no big file",
                small, alias
            ))
        })?;
        Ok(Some(big.to_string()))
    }

    /// File name component of the partition to load for `position`.
    pub fn file_name(&self, position: usize, current_input: Option<&str>) -> Result<String> {
        let big = self.resolve(position, current_input)?;
        Ok(bucket_file_name(big.as_deref()))
    }
}
