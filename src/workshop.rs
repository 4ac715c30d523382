use crate::{
    error::{SkipReason, SkippedEntry},
    noita::MOD_ID_FILE,
};
use log::{debug, warn};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Maps lowercase mod folder names to subscription item ids.
#[derive(Debug, Clone, Default)]
pub struct WorkshopIndex {
    ids: HashMap<String, String>,
    pub skipped: Vec<SkippedEntry>,
}

impl WorkshopIndex {
    /// Scans each numeric child of `root` for a `mod_id.txt` naming the mod's folder.
    /// Individual failures are recorded in `skipped`; a missing root gives an empty index.
    pub fn build(root: &Path) -> Self {
        let mut index = Self::default();
        if !root.is_dir() {
            debug!("workshop root {} not present", root.display());
            return index;
        }

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    index
                        .skipped
                        .push(SkippedEntry::new(path, SkipReason::Unreadable(err.to_string())));
                    continue;
                }
            };
            let item_id = entry.file_name().to_string_lossy().to_string();
            if !is_item_id(&item_id) {
                index
                    .skipped
                    .push(SkippedEntry::new(entry.path(), SkipReason::NotNumeric));
                continue;
            }
            if !entry.path().is_dir() {
                index
                    .skipped
                    .push(SkippedEntry::new(entry.path(), SkipReason::NotDirectory));
                continue;
            }
            match read_mod_id(entry.path()) {
                Ok(name) => {
                    index.ids.insert(name.to_lowercase(), item_id);
                }
                Err(reason) => {
                    index.skipped.push(SkippedEntry::new(entry.path(), reason));
                }
            }
        }

        for skipped in &index.skipped {
            if matches!(skipped.reason, SkipReason::Unreadable(_)) {
                warn!("workshop item skipped: {skipped}");
            } else {
                debug!("workshop item skipped: {skipped}");
            }
        }
        index
    }

    pub fn lookup(&self, folder_name: &str) -> Option<&str> {
        self.ids.get(&folder_name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            ids: pairs
                .iter()
                .map(|(name, id)| (name.to_lowercase(), id.to_string()))
                .collect(),
            skipped: Vec::new(),
        }
    }
}

/// Reads the folder name a workshop item installs under.
pub fn read_mod_id(item_dir: &Path) -> Result<String, SkipReason> {
    let path: PathBuf = item_dir.join(MOD_ID_FILE);
    if !path.is_file() {
        return Err(SkipReason::MissingNameFile);
    }
    let bytes = fs::read(&path).map_err(|err| SkipReason::Unreadable(err.to_string()))?;
    let name = String::from_utf8_lossy(&bytes).trim().to_string();
    if name.is_empty() {
        return Err(SkipReason::EmptyNameFile);
    }
    Ok(name)
}

fn is_item_id(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|ch| ch.is_ascii_digit())
}
