use crate::{
    error::{SkipReason, SkippedEntry},
    library::{ModList, ModRecord, LOCAL_ITEM_ID},
    mod_config,
    noita::GamePaths,
    scanner::{self, ScanEntry},
    tags::TagStore,
    workshop::WorkshopIndex,
};
use log::{info, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub workshop_items: usize,
    pub workshop_skipped: Vec<SkippedEntry>,
    pub scan_skipped: Vec<SkippedEntry>,
    /// Set when the config file existed but could not be parsed.
    pub config_error: Option<String>,
    /// Later config entries whose key repeated an earlier one, case-insensitively.
    pub duplicate_config_keys: Vec<String>,
    /// Folders found on disk that the config did not list.
    pub appended: Vec<String>,
    /// Config entries with no folder on disk; kept in place.
    pub missing_on_disk: Vec<String>,
}

impl ReconcileReport {
    pub fn skipped_count(&self) -> usize {
        self.workshop_skipped.len() + self.scan_skipped.len()
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} workshop item(s) indexed", self.workshop_items)];
        if !self.appended.is_empty() {
            parts.push(format!("{} new", self.appended.len()));
        }
        if !self.missing_on_disk.is_empty() {
            parts.push(format!("{} not on disk", self.missing_on_disk.len()));
        }
        if self.skipped_count() > 0 {
            parts.push(format!("{} skipped", self.skipped_count()));
        }
        if !self.duplicate_config_keys.is_empty() {
            parts.push(format!(
                "{} duplicate config entr(y/ies) dropped",
                self.duplicate_config_keys.len()
            ));
        }
        if self.config_error.is_some() {
            parts.push("config unreadable".to_string());
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub mods: ModList,
    pub report: ReconcileReport,
}

/// Rebuilds the canonical record set from the config file, the mods
/// directory, the workshop cache and the tag store.
pub fn reconcile(paths: &GamePaths, tags: &TagStore) -> Reconciliation {
    let index = WorkshopIndex::build(&paths.workshop_root);
    let mut report = ReconcileReport {
        workshop_items: index.len(),
        workshop_skipped: index.skipped.clone(),
        ..ReconcileReport::default()
    };

    let config_records = match mod_config::read_mod_config(&paths.mod_config_path) {
        Ok(records) => records,
        Err(err) => {
            warn!("mod config unreadable, starting from an empty list: {err:#}");
            report.config_error = Some(format!("{err:#}"));
            Vec::new()
        }
    };

    let scan = scanner::scan_mods_dir(&paths.mods_dir, &index);
    report.scan_skipped = scan.skipped;

    let mods = merge(config_records, scan.entries, tags, &mut report);
    info!("reconciled {} mod(s): {}", mods.len(), report.summary());
    Reconciliation { mods, report }
}

/// Merge policy: config order first, scanned folders overlay matching entries
/// case-insensitively, unmatched folders append disabled, then tags apply.
pub fn merge(
    config_records: Vec<ModRecord>,
    scanned: Vec<ScanEntry>,
    tags: &TagStore,
    report: &mut ReconcileReport,
) -> ModList {
    let mut records: Vec<ModRecord> = Vec::with_capacity(config_records.len() + scanned.len());
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for record in config_records {
        let lowered = record.key.to_lowercase();
        if by_key.contains_key(&lowered) {
            report.duplicate_config_keys.push(record.key);
            continue;
        }
        by_key.insert(lowered, records.len());
        records.push(record);
    }

    let mut on_disk = vec![false; records.len()];
    for entry in scanned {
        let lowered = entry.folder_name.to_lowercase();
        match by_key.get(&lowered).copied() {
            Some(index) if index < on_disk.len() && !on_disk[index] => {
                on_disk[index] = true;
                let record = &mut records[index];
                record.display_name = entry.display_name;
                record.is_symlink = entry.is_symlink;
                if record.workshop_id == LOCAL_ITEM_ID && entry.workshop_id != LOCAL_ITEM_ID {
                    record.workshop_id = entry.workshop_id;
                }
            }
            Some(_) => {
                report.scan_skipped.push(SkippedEntry::new(
                    entry.folder_name.as_str(),
                    SkipReason::Duplicate,
                ));
            }
            None => {
                let mut record = ModRecord::new(&entry.folder_name);
                record.display_name = entry.display_name;
                record.is_symlink = entry.is_symlink;
                record.workshop_id = entry.workshop_id;
                by_key.insert(lowered, records.len());
                report.appended.push(record.key.clone());
                records.push(record);
            }
        }
    }

    report.missing_on_disk = on_disk
        .iter()
        .zip(records.iter())
        .filter(|(found, _)| !**found)
        .map(|(_, record)| record.key.clone())
        .collect();

    for record in &mut records {
        tags.apply_to(record);
    }

    ModList::new(records)
}
