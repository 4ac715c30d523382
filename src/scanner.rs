use crate::{
    error::{SkipReason, SkippedEntry},
    library::LOCAL_ITEM_ID,
    links,
    noita::MOD_MANIFEST,
    workshop::WorkshopIndex,
};
use log::debug;
use quick_xml::{events::Event, Reader};
use std::{fs, path::Path};
use walkdir::WalkDir;

/// One installed mod directory as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub folder_name: String,
    pub display_name: String,
    pub is_symlink: bool,
    pub workshop_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub entries: Vec<ScanEntry>,
    pub skipped: Vec<SkippedEntry>,
}

/// Lists the immediate subdirectories of `mods_dir` in file-name order.
pub fn scan_mods_dir(mods_dir: &Path, index: &WorkshopIndex) -> ScanReport {
    let mut report = ScanReport::default();
    if !mods_dir.is_dir() {
        debug!("mods dir {} not present", mods_dir.display());
        return report;
    }

    for entry in WalkDir::new(mods_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                report
                    .skipped
                    .push(SkippedEntry::new(path, SkipReason::Unreadable(err.to_string())));
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            report
                .skipped
                .push(SkippedEntry::new(path, SkipReason::NotDirectory));
            continue;
        }

        let folder_name = entry.file_name().to_string_lossy().to_string();
        let display_name =
            read_manifest_name(&path.join(MOD_MANIFEST)).unwrap_or_else(|| folder_name.clone());
        let workshop_id = index
            .lookup(&folder_name)
            .unwrap_or(LOCAL_ITEM_ID)
            .to_string();

        report.entries.push(ScanEntry {
            is_symlink: entry.path_is_symlink() || links::is_junction(path),
            folder_name,
            display_name,
            workshop_id,
        });
    }

    report
}

/// The `name` attribute of the manifest's root element, if it can be read.
pub fn read_manifest_name(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    parse_manifest_name(&bytes)
}

pub fn parse_manifest_name(bytes: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"name" {
                        let value = attr.unescape_value().ok()?;
                        let value = value.trim();
                        return (!value.is_empty()).then(|| value.to_string());
                    }
                }
                return None;
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mod_dir(root: &Path, name: &str, manifest: Option<&str>) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        if let Some(xml) = manifest {
            fs::write(dir.join(MOD_MANIFEST), xml).unwrap();
        }
    }

    #[test]
    fn manifest_name_is_read_from_root_element() {
        let xml = br#"<?xml version="1.0"?>
<!-- comment -->
<Mod name="Graham&apos;s Things" description="Perks" request_no_api_restrictions="0">
</Mod>"#;
        assert_eq!(parse_manifest_name(xml).as_deref(), Some("Graham's Things"));
        assert_eq!(parse_manifest_name(b"<Mod description=\"x\"/>"), None);
        assert_eq!(parse_manifest_name(b"<Mod name=\"   \"/>"), None);
        assert_eq!(parse_manifest_name(b"not xml at all <<<"), None);
    }

    #[test]
    fn scan_resolves_names_and_ids() {
        let temp = tempfile::tempdir().unwrap();
        mod_dir(temp.path(), "spell_lab", Some(r#"<Mod name="Spell Lab"/>"#));
        mod_dir(temp.path(), "broken", Some("<Mod name=\"unterminated"));
        mod_dir(temp.path(), "plain", None);
        fs::write(temp.path().join("readme.txt"), b"not a mod").unwrap();

        let index = WorkshopIndex::from_pairs(&[("Spell_Lab", "1985468311")]);
        let report = scan_mods_dir(temp.path(), &index);

        let names: Vec<&str> = report
            .entries
            .iter()
            .map(|entry| entry.folder_name.as_str())
            .collect();
        assert_eq!(names, vec!["broken", "plain", "spell_lab"]);
        assert_eq!(report.entries[0].display_name, "broken");
        assert_eq!(report.entries[1].display_name, "plain");
        assert_eq!(report.entries[1].workshop_id, "0");
        assert_eq!(report.entries[2].display_name, "Spell Lab");
        assert_eq!(report.entries[2].workshop_id, "1985468311");
        assert!(report.entries.iter().all(|entry| !entry.is_symlink));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::NotDirectory);
    }

    #[cfg(unix)]
    #[test]
    fn linked_directories_are_flagged() {
        let temp = tempfile::tempdir().unwrap();
        let cache = temp.path().join("cache").join("42");
        fs::create_dir_all(&cache).unwrap();
        let mods = temp.path().join("mods");
        fs::create_dir_all(&mods).unwrap();
        std::os::unix::fs::symlink(&cache, mods.join("linked")).unwrap();

        let report = scan_mods_dir(&mods, &WorkshopIndex::default());
        assert_eq!(report.entries.len(), 1);
        assert!(report.entries[0].is_symlink);
    }
}
