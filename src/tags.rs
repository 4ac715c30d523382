use crate::{
    fs_util,
    library::{ModRecord, TagSet},
};
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    #[serde(default)]
    pub user_tags: Vec<String>,
    #[serde(default)]
    pub workshop_tags: Vec<String>,
}

/// Tags keyed by mod folder name, persisted as one JSON object.
#[derive(Debug, Clone, Default)]
pub struct TagStore {
    path: PathBuf,
    entries: BTreeMap<String, TagEntry>,
}

impl TagStore {
    /// A missing or malformed file is an empty store.
    pub fn load(path: &Path) -> Self {
        let entries = if path.exists() {
            match read_entries(path) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("ignoring tag store {}: {err:#}", path.display());
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn save(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.entries).context("serialize tag store")?;
        fs_util::write_atomic(&self.path, raw.as_bytes()).context("write tag store")
    }

    /// Trimmed, non-empty tags for `key`; empty sets when the key is unknown.
    pub fn lookup(&self, key: &str) -> (TagSet, TagSet) {
        match self.entries.get(key) {
            Some(entry) => (
                TagSet::from_raw(&entry.user_tags),
                TagSet::from_raw(&entry.workshop_tags),
            ),
            None => (TagSet::new(), TagSet::new()),
        }
    }

    pub fn apply_to(&self, record: &mut ModRecord) {
        let (user_tags, workshop_tags) = self.lookup(&record.key);
        record.user_tags = user_tags;
        record.workshop_tags = workshop_tags;
    }

    /// Stores the record's current tag lists under its key.
    pub fn record(&mut self, record: &ModRecord) {
        self.entries.insert(
            record.key.clone(),
            TagEntry {
                user_tags: record.user_tags.as_slice().to_vec(),
                workshop_tags: record.workshop_tags.as_slice().to_vec(),
            },
        );
    }

    /// Write-through variant of [`TagStore::record`].
    pub fn record_and_save(&mut self, record: &ModRecord) -> Result<()> {
        self.record(record);
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, TagEntry>> {
    let raw = fs::read_to_string(path).context("read tag store")?;
    serde_json::from_str(&raw).context("parse tag store")
}
