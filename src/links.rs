use crate::workshop::read_mod_id;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFailure {
    pub item: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub created: usize,
    pub converted: usize,
    pub failures: Vec<LinkFailure>,
}

impl SyncReport {
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Linked {} new mod(s), converted {} cop(ies)",
            self.created, self.converted
        );
        if !self.failures.is_empty() {
            text.push_str(&format!(", {} failed", self.failures.len()));
        }
        text
    }
}

/// Links every subscribed item into the game's mods directory under the folder
/// name from its `mod_id.txt` (or the item id when that file is missing).
/// Existing entries are left alone unless `convert_copies` is set, in which case
/// plain copies are replaced by links.
pub fn sync_workshop_links(
    workshop_root: &Path,
    mods_dir: &Path,
    convert_copies: bool,
) -> Result<SyncReport> {
    if !workshop_root.is_dir() {
        bail!("workshop directory not found: {}", workshop_root.display());
    }
    fs::create_dir_all(mods_dir).context("create mods dir")?;

    let mut report = SyncReport::default();
    for entry in WalkDir::new(workshop_root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let item = err.path().map(Path::to_path_buf).unwrap_or_default();
                push_failure(&mut report, item, err.to_string());
                continue;
            }
        };
        if !entry.path().is_dir() {
            continue;
        }
        let item = entry.path().to_path_buf();
        let target = read_mod_id(&item)
            .unwrap_or_else(|_| entry.file_name().to_string_lossy().to_string());
        match sync_item(&item, mods_dir, &target, convert_copies) {
            Ok(LinkOutcome::Created) => report.created += 1,
            Ok(LinkOutcome::Converted) => report.converted += 1,
            Ok(LinkOutcome::Kept) => {}
            Err(err) => push_failure(&mut report, item, format!("{err:#}")),
        }
    }

    info!("{}", report.summary());
    Ok(report)
}

fn push_failure(report: &mut SyncReport, item: PathBuf, message: String) {
    warn!("link sync failed for {}: {message}", item.display());
    report.failures.push(LinkFailure { item, message });
}

enum LinkOutcome {
    Created,
    Converted,
    Kept,
}

fn sync_item(item: &Path, mods_dir: &Path, target: &str, convert: bool) -> Result<LinkOutcome> {
    if !is_single_component(target) {
        bail!("mod folder name {target:?} is not a plain directory name");
    }
    let dest = mods_dir.join(target);
    let meta = match fs::symlink_metadata(&dest) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            create_dir_link(item, &dest)
                .with_context(|| format!("link {} -> {}", dest.display(), item.display()))?;
            return Ok(LinkOutcome::Created);
        }
        Err(err) => return Err(err).with_context(|| format!("stat {}", dest.display())),
    };

    if !convert || meta.file_type().is_symlink() || is_junction(&dest) {
        return Ok(LinkOutcome::Kept);
    }
    if meta.is_dir() {
        fs::remove_dir_all(&dest).with_context(|| format!("remove copy {}", dest.display()))?;
    } else {
        fs::remove_file(&dest).with_context(|| format!("remove {}", dest.display()))?;
    }
    create_dir_link(item, &dest)
        .with_context(|| format!("link {} -> {}", dest.display(), item.display()))?;
    Ok(LinkOutcome::Converted)
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(unix)]
fn create_dir_link(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

/// Junctions need no symlink privilege, so ordinary accounts can create them.
#[cfg(windows)]
fn create_dir_link(source: &Path, dest: &Path) -> io::Result<()> {
    junction::create(source, dest)
}

/// True for a Windows directory junction; std reports those as plain dirs.
#[cfg(windows)]
pub fn is_junction(path: &Path) -> bool {
    junction::exists(path).unwrap_or(false)
}

#[cfg(not(windows))]
pub fn is_junction(_path: &Path) -> bool {
    false
}

#[cfg(not(any(unix, windows)))]
fn create_dir_link(_source: &Path, _dest: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Other,
        "directory links unavailable on this platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        workshop: PathBuf,
        mods: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let workshop = temp.path().join("881100");
        let mods = temp.path().join("mods");
        fs::create_dir_all(workshop.join("111")).unwrap();
        fs::write(workshop.join("111").join("mod_id.txt"), "spell_lab\n").unwrap();
        fs::create_dir_all(workshop.join("222")).unwrap();
        fs::create_dir_all(workshop.join("333")).unwrap();
        fs::write(workshop.join("333").join("mod_id.txt"), "copied_mod").unwrap();
        fs::write(workshop.join("notes.txt"), "x").unwrap();
        fs::create_dir_all(mods.join("copied_mod")).unwrap();
        fs::write(mods.join("copied_mod").join("init.lua"), "--").unwrap();
        Fixture {
            _temp: temp,
            workshop,
            mods,
        }
    }

    #[test]
    fn links_missing_mods_and_keeps_copies() {
        let fx = fixture();
        let report = sync_workshop_links(&fx.workshop, &fx.mods, false).unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.converted, 0);
        assert!(report.failures.is_empty());

        let link = fs::read_link(fx.mods.join("spell_lab")).unwrap();
        assert_eq!(link, fx.workshop.join("111"));
        assert!(fs::symlink_metadata(fx.mods.join("222"))
            .unwrap()
            .file_type()
            .is_symlink());
        assert!(!fs::symlink_metadata(fx.mods.join("copied_mod"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[test]
    fn conversion_replaces_copies_and_is_idempotent() {
        let fx = fixture();
        let report = sync_workshop_links(&fx.workshop, &fx.mods, true).unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.converted, 1);
        assert_eq!(
            fs::read_link(fx.mods.join("copied_mod")).unwrap(),
            fx.workshop.join("333")
        );

        let again = sync_workshop_links(&fx.workshop, &fx.mods, true).unwrap();
        assert_eq!((again.created, again.converted), (0, 0));
    }

    #[test]
    fn escaping_folder_names_are_reported() {
        let fx = fixture();
        fs::write(fx.workshop.join("111").join("mod_id.txt"), "../outside").unwrap();
        let report = sync_workshop_links(&fx.workshop, &fx.mods, false).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, fx.workshop.join("111"));
        assert!(!fx.mods.parent().unwrap().join("outside").exists());
    }

    #[test]
    fn missing_workshop_root_is_an_error() {
        let fx = fixture();
        assert!(sync_workshop_links(&fx.workshop.join("nope"), &fx.mods, false).is_err());
    }
}
