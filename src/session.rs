use crate::{
    catalog::{self, CatalogClient, FetchReport},
    config::{AppDirs, Settings},
    library::{ModList, ModRecord, Placement, TagKind},
    links::{self, SyncReport},
    mod_config,
    noita::GamePaths,
    preset,
    query::{self, Query},
    reconcile::{self, ReconcileReport, Reconciliation},
    tags::TagStore,
};
use anyhow::{anyhow, Context, Result};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One run of the manager: resolved paths, the canonical record set, the tag
/// store, the active query and the last status line. Every mutation goes through here
/// so the config file and tag store are written at the right points.
pub struct Session {
    pub dirs: AppDirs,
    pub settings: Settings,
    pub paths: GamePaths,
    pub mods: ModList,
    pub tags: TagStore,
    pub query: String,
    pub status: String,
    pub last_report: ReconcileReport,
    log_path: PathBuf,
}

impl Session {
    /// Loads settings and the tag store, then reconciles. Fails with a
    /// [`crate::error::SetupError`] when the game or workshop root is missing.
    pub fn open(dirs: AppDirs) -> Result<Self> {
        dirs.ensure()?;
        let settings = Settings::load(&dirs.settings_path());
        let tags = TagStore::load(&dirs.tags_path());
        log::debug!("tag store holds {} mod(s)", tags.len());
        let mut session = Self {
            paths: settings.game_paths(),
            settings,
            tags,
            mods: ModList::default(),
            query: String::new(),
            status: String::new(),
            last_report: ReconcileReport::default(),
            log_path: dirs.log_path(),
            dirs,
        };
        session.reload()?;
        Ok(session)
    }

    /// Re-validates the configured roots and rebuilds the canonical set from scratch.
    pub fn reload(&mut self) -> Result<&ReconcileReport> {
        if self.settings.validate()? {
            self.log_info(format!(
                "Workshop directory set to {}",
                self.settings.workshop_path.display()
            ));
            if let Err(err) = self.settings.save(&self.dirs.settings_path()) {
                self.log_warn(format!("Settings save failed: {err:#}"));
            }
        }
        self.paths = self.settings.game_paths();

        let Reconciliation { mods, report } = reconcile::reconcile(&self.paths, &self.tags);
        self.mods = mods;
        if let Some(err) = &report.config_error {
            self.log_warn(format!("Mod config unreadable: {err}"));
        }
        self.log_info(format!("Loaded {} mod(s): {}", self.mods.len(), report.summary()));
        self.last_report = report;
        Ok(&self.last_report)
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn add_tag_to_query(&mut self, tag: &str) {
        self.query = query::with_tag_term(&self.query, tag);
    }

    pub fn filtered_indices(&self) -> Vec<usize> {
        Query::parse(&self.query).filter_indices(&self.mods)
    }

    pub fn tag_cloud(&self) -> Vec<String> {
        self.mods.tag_cloud()
    }

    fn require(&self, key: &str) -> Result<usize> {
        self.mods
            .index_of(key)
            .ok_or_else(|| anyhow!("unknown mod: {key}"))
    }

    /// Writes the config file. A failure is logged to the status line; the
    /// in-memory records stay as they are so the action can be repeated.
    pub fn save_config(&mut self) -> Result<()> {
        let result =
            mod_config::write_mod_config(&self.paths.mod_config_path, self.mods.records());
        if let Err(err) = &result {
            self.log_error(format!("Failed to save mod config: {err:#}"));
        }
        result
    }

    pub fn toggle(&mut self, key: &str) -> Result<bool> {
        let index = self.require(key)?;
        let record = &mut self.mods.records_mut()[index];
        record.enabled = !record.enabled;
        let enabled = record.enabled;
        let label = record.display_name().to_string();
        self.save_config()?;
        self.log_info(format!(
            "{} {label}",
            if enabled { "Enabled" } else { "Disabled" }
        ));
        Ok(enabled)
    }

    /// Returns whether the flag changed. The config is written either way.
    pub fn set_enabled(&mut self, key: &str, enabled: bool) -> Result<bool> {
        let index = self.require(key)?;
        let record = &mut self.mods.records_mut()[index];
        let changed = record.enabled != enabled;
        record.enabled = enabled;
        self.save_config()?;
        Ok(changed)
    }

    /// Applies to every record in the filtered view; returns how many changed.
    pub fn set_all_enabled(&mut self, enabled: bool) -> Result<usize> {
        let indices = self.filtered_indices();
        let mut changed = 0;
        for index in &indices {
            let record = &mut self.mods.records_mut()[*index];
            if record.enabled != enabled {
                record.enabled = enabled;
                changed += 1;
            }
        }
        self.save_config()?;
        self.log_info(format!(
            "{} {} of {} shown mod(s)",
            if enabled { "Enabled" } else { "Disabled" },
            changed,
            indices.len()
        ));
        Ok(changed)
    }

    /// Drops `key` before or after `target`. Both are resolved against the full
    /// list, so an active filter never shifts the result.
    pub fn move_record(&mut self, key: &str, target: &str, placement: Placement) -> Result<usize> {
        let src = self.require(key)?;
        let dst = self.require(target)?;
        let moved = self
            .mods
            .move_record(src, dst, placement)
            .context("move out of range")?;
        self.save_config()?;
        self.log_info(format!("Moved {key} to position {}", moved + 1));
        Ok(moved)
    }

    /// Moves `key` to a zero-based position in the full list.
    pub fn move_to_position(&mut self, key: &str, position: usize) -> Result<usize> {
        let src = self.require(key)?;
        let moved = self
            .mods
            .move_to(src, position)
            .context("move out of range")?;
        self.save_config()?;
        self.log_info(format!("Moved {key} to position {}", moved + 1));
        Ok(moved)
    }

    pub fn add_tag(&mut self, key: &str, kind: TagKind, tag: &str) -> Result<bool> {
        self.edit_tags(key, kind, |tags| tags.insert(tag))
    }

    pub fn update_tag(&mut self, key: &str, kind: TagKind, index: usize, tag: &str) -> Result<bool> {
        self.edit_tags(key, kind, |tags| tags.replace(index, tag))
    }

    pub fn delete_tag(&mut self, key: &str, kind: TagKind, index: usize) -> Result<bool> {
        self.edit_tags(key, kind, |tags| tags.remove_at(index).is_some())
    }

    /// Applies `edit` to one tag list and writes the store through when it
    /// reports a change. The config file is not touched.
    fn edit_tags<F>(&mut self, key: &str, kind: TagKind, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut crate::library::TagSet) -> bool,
    {
        let index = self.require(key)?;
        let record = &mut self.mods.records_mut()[index];
        if !edit(record.tags_mut(kind)) {
            return Ok(false);
        }
        let result = self.tags.record_and_save(record);
        if let Err(err) = &result {
            self.log_error(format!("Failed to save tags: {err:#}"));
        }
        result.map(|()| true)
    }

    /// Fetches catalog tags for every subscribed mod, then saves the store once.
    pub fn fetch_tags(
        &mut self,
        client: &dyn CatalogClient,
        on_progress: impl FnMut(usize, usize, &ModRecord),
    ) -> Result<FetchReport> {
        let report =
            catalog::fetch_workshop_tags(&mut self.mods, &mut self.tags, client, on_progress)?;
        if let Err(err) = self.tags.save() {
            self.log_error(format!("Failed to save tags: {err:#}"));
            return Err(err);
        }
        if !report.failures.is_empty() {
            self.log_warn(format!(
                "Tag fetch failed for {} mod(s)",
                report.failures.len()
            ));
        }
        self.log_info(format!("Updated tags for {} mod(s)", report.updated));
        Ok(report)
    }

    pub fn list_presets(&self) -> Result<Vec<String>> {
        preset::list_presets(&self.dirs.presets_dir())
    }

    pub fn save_preset(&mut self, name: &str) -> Result<PathBuf> {
        let path = preset::save_preset(&self.dirs.presets_dir(), name, &self.mods)?;
        self.log_info(format!("Saved preset {name}"));
        Ok(path)
    }

    /// Replaces the canonical set with the preset's records, re-attaches tags
    /// from the store and writes the config.
    pub fn load_preset(&mut self, name: &str) -> Result<()> {
        let mut mods = preset::load_preset(&self.dirs.presets_dir(), name)?;
        for record in mods.records_mut() {
            self.tags.apply_to(record);
        }
        self.mods = mods;
        self.save_config()?;
        self.log_info(format!("Loaded preset {name}"));
        Ok(())
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<()> {
        preset::delete_preset(&self.dirs.presets_dir(), name)?;
        self.log_info(format!("Deleted preset {name}"));
        Ok(())
    }

    /// Links subscribed items into the mods directory, then reloads.
    pub fn sync_links(&mut self, convert_copies: bool) -> Result<SyncReport> {
        let report = links::sync_workshop_links(
            &self.paths.workshop_root,
            &self.paths.mods_dir,
            convert_copies,
        )?;
        for failure in &report.failures {
            self.log_warn(format!(
                "Link failed for {}: {}",
                failure.item.display(),
                failure.message
            ));
        }
        self.log_info(report.summary());
        self.reload()?;
        Ok(report)
    }

    pub fn log_info(&mut self, message: String) {
        log::info!("{message}");
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        log::warn!("{message}");
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        log::error!("{message}");
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        let _ = append_log_file(&self.log_path, level, &message);
        self.status = message;
    }
}

fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

fn append_log_file(path: &Path, level: LogLevel, message: &str) -> std::io::Result<()> {
    let label = log_level_label(level);
    let stamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{stamp} [{label}] {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SetupError;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        dirs: AppDirs,
        config_path: PathBuf,
    }

    const CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Mods>
  <Mod enabled="1" name="alpha" workshop_item_id="0"/>
  <Mod enabled="0" name="beta" workshop_item_id="0"/>
  <Mod enabled="0" name="gamma" workshop_item_id="0"/>
</Mods>
"#;

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let game = temp.path().join("Noita");
        let workshop = temp.path().join("workshop").join("content").join("881100");
        fs::create_dir_all(game.join("mods")).unwrap();
        fs::write(game.join("noita.exe"), "").unwrap();
        for key in ["alpha", "beta", "gamma", "delta"] {
            fs::create_dir_all(game.join("mods").join(key)).unwrap();
        }
        fs::write(
            game.join("mods").join("beta").join("mod.xml"),
            r#"<Mod name="Beta Fire" description="x"></Mod>"#,
        )
        .unwrap();
        fs::create_dir_all(workshop.join("555")).unwrap();
        fs::write(workshop.join("555").join("mod_id.txt"), "gamma").unwrap();

        let config_path = temp.path().join("save00").join("mod_config.xml");
        fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        fs::write(&config_path, CONFIG).unwrap();

        let dirs = AppDirs::from_root(temp.path().join("data"));
        let settings = Settings {
            noita_path: game,
            workshop_path: workshop,
            mod_config_path: config_path.clone(),
        };
        settings.save(&dirs.settings_path()).unwrap();
        Fixture {
            temp,
            dirs,
            config_path,
        }
    }

    fn keys(session: &Session) -> Vec<&str> {
        session
            .mods
            .records()
            .iter()
            .map(|record| record.key.as_str())
            .collect()
    }

    #[test]
    fn open_reconciles_all_sources() {
        let fx = fixture();
        let session = Session::open(fx.dirs.clone()).unwrap();
        assert_eq!(keys(&session), vec!["alpha", "beta", "gamma", "delta"]);
        assert_eq!(session.mods.records()[1].display_name(), "Beta Fire");
        assert_eq!(session.mods.records()[2].workshop_id, "555");
        assert!(!session.mods.records()[3].enabled);
        assert!(session.status.starts_with("Loaded 4 mod(s)"));
        let log = fs::read_to_string(fx.dirs.log_path()).unwrap();
        assert!(log.contains("[INFO] Loaded 4 mod(s)"));
    }

    #[test]
    fn missing_game_root_is_a_setup_error() {
        let fx = fixture();
        fs::remove_file(fx.temp.path().join("Noita").join("noita.exe")).unwrap();
        let err = Session::open(fx.dirs.clone()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::GameRootMissing(_))
        ));
    }

    #[test]
    fn toggle_writes_config_with_zeroed_ids() {
        let fx = fixture();
        let mut session = Session::open(fx.dirs.clone()).unwrap();
        assert!(session.toggle("GAMMA").unwrap());
        let xml = fs::read_to_string(&fx.config_path).unwrap();
        assert!(xml.contains(r#"<Mod enabled="1" name="gamma" workshop_item_id="0"/>"#));
        assert!(xml.contains(r#"name="delta" enabled="0" workshop_item_id="0""#));
        assert_eq!(session.mods.find("gamma").unwrap().workshop_id, "555");
        assert!(session.toggle("missing").is_err());
    }

    #[test]
    fn bulk_enable_only_touches_the_filtered_view() {
        let fx = fixture();
        let mut session = Session::open(fx.dirs.clone()).unwrap();
        session.set_query("@fire|@delta");
        assert_eq!(session.set_all_enabled(true).unwrap(), 2);
        let enabled: Vec<&str> = session
            .mods
            .records()
            .iter()
            .filter(|record| record.enabled)
            .map(|record| record.key.as_str())
            .collect();
        assert_eq!(enabled, vec!["alpha", "beta", "delta"]);
    }

    #[test]
    fn moves_resolve_keys_against_the_full_list() {
        let fx = fixture();
        let mut session = Session::open(fx.dirs.clone()).unwrap();
        session.set_query("delta");
        assert_eq!(session.move_record("delta", "alpha", Placement::Before).unwrap(), 0);
        assert_eq!(keys(&session), vec!["delta", "alpha", "beta", "gamma"]);
        assert_eq!(session.move_to_position("delta", 99).unwrap(), 3);
        assert_eq!(keys(&session), vec!["alpha", "beta", "gamma", "delta"]);

        let reopened = Session::open(fx.dirs.clone()).unwrap();
        assert_eq!(keys(&reopened), vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn tag_edits_write_the_store_but_not_the_config() {
        let fx = fixture();
        let mut session = Session::open(fx.dirs.clone()).unwrap();
        let before = fs::read_to_string(&fx.config_path).unwrap();

        assert!(session.add_tag("beta", TagKind::User, " wand ").unwrap());
        assert!(!session.add_tag("beta", TagKind::User, "wand").unwrap());
        assert!(session.add_tag("beta", TagKind::User, "qol").unwrap());
        assert!(session.update_tag("beta", TagKind::User, 1, "").unwrap());
        assert!(!session.delete_tag("beta", TagKind::User, 7).unwrap());

        assert_eq!(fs::read_to_string(&fx.config_path).unwrap(), before);
        let reopened = Session::open(fx.dirs.clone()).unwrap();
        assert_eq!(
            reopened.mods.find("beta").unwrap().user_tags.as_slice(),
            &["wand"]
        );
        assert_eq!(reopened.tag_cloud(), vec!["wand"]);
    }

    #[test]
    fn failed_config_write_keeps_memory_state_and_reports() {
        let fx = fixture();
        let mut session = Session::open(fx.dirs.clone()).unwrap();
        fs::remove_file(&fx.config_path).unwrap();
        fs::create_dir_all(fx.config_path.join("blocker")).unwrap();

        assert!(session.toggle("beta").is_err());
        assert!(session.mods.find("beta").unwrap().enabled);
        assert!(session.status.starts_with("Failed to save mod config"));
        let log = fs::read_to_string(fx.dirs.log_path()).unwrap();
        assert!(log.contains("[ERROR] Failed to save mod config"));
    }

    #[test]
    fn presets_restore_order_and_flags() {
        let fx = fixture();
        let mut session = Session::open(fx.dirs.clone()).unwrap();
        session.add_tag("alpha", TagKind::User, "core").unwrap();
        session.save_preset("baseline").unwrap();

        session.move_to_position("alpha", 3).unwrap();
        session.toggle("alpha").unwrap();
        session.add_tag("alpha", TagKind::User, "later").unwrap();

        assert_eq!(session.list_presets().unwrap(), vec!["baseline"]);
        session.load_preset("baseline").unwrap();
        assert_eq!(keys(&session), vec!["alpha", "beta", "gamma", "delta"]);
        let alpha = session.mods.find("alpha").unwrap();
        assert!(alpha.enabled);
        assert_eq!(alpha.user_tags.as_slice(), &["core", "later"]);
        let xml = fs::read_to_string(&fx.config_path).unwrap();
        assert!(xml.find("\"alpha\"").unwrap() < xml.find("\"delta\"").unwrap());

        session.delete_preset("baseline").unwrap();
        assert!(session.list_presets().unwrap().is_empty());
    }

    #[test]
    fn query_helpers_append_tag_terms() {
        let fx = fixture();
        let mut session = Session::open(fx.dirs.clone()).unwrap();
        session.add_tag("gamma", TagKind::Workshop, "Spells").unwrap();
        session.add_tag_to_query("Spells");
        session.add_tag_to_query("Spells");
        assert_eq!(session.query, "#Spells");
        assert_eq!(session.filtered_indices(), vec![2]);
    }

    struct PageCatalog {
        page: &'static str,
        tags_path: PathBuf,
        store_on_disk: RefCell<Vec<bool>>,
    }

    impl CatalogClient for PageCatalog {
        fn fetch_item_page(&self, item_id: &str) -> Result<String> {
            self.store_on_disk.borrow_mut().push(self.tags_path.exists());
            match item_id {
                "555" => Ok(self.page.to_string()),
                _ => Err(anyhow!("HTTP 503 for {item_id}")),
            }
        }
    }

    fn catalog_session() -> (Fixture, Session, PageCatalog) {
        let fx = fixture();
        let workshop = fx.temp.path().join("workshop").join("content").join("881100");
        fs::create_dir_all(workshop.join("556")).unwrap();
        fs::write(workshop.join("556").join("mod_id.txt"), "delta").unwrap();
        let session = Session::open(fx.dirs.clone()).unwrap();
        let catalog = PageCatalog {
            page: r#"<a href="?appid=881100&requiredtags[]=Spells">Spells</a>"#,
            tags_path: fx.dirs.tags_path(),
            store_on_disk: RefCell::new(Vec::new()),
        };
        (fx, session, catalog)
    }

    #[test]
    fn fetched_tags_are_saved_after_the_batch() {
        let (fx, mut session, catalog) = catalog_session();
        let report = session.fetch_tags(&catalog, |_, _, _| {}).unwrap();

        assert_eq!(report.requested, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(*catalog.store_on_disk.borrow(), vec![false, false]);
        assert_eq!(session.status, "Updated tags for 1 mod(s)");

        let reopened = Session::open(fx.dirs.clone()).unwrap();
        assert_eq!(
            reopened.mods.find("gamma").unwrap().workshop_tags.as_slice(),
            &["Spells"]
        );
        let log = fs::read_to_string(fx.dirs.log_path()).unwrap();
        assert!(log.contains("[WARN] Tag fetch failed for 1 mod(s)"));
    }

    #[test]
    fn failed_tag_store_save_is_reported() {
        let (fx, mut session, catalog) = catalog_session();
        let tags_path = fx.dirs.tags_path();
        fs::create_dir_all(tags_path.join("blocker")).unwrap();

        assert!(session.fetch_tags(&catalog, |_, _, _| {}).is_err());
        assert!(session.status.starts_with("Failed to save tags"));
        assert_eq!(
            session.mods.find("gamma").unwrap().workshop_tags.as_slice(),
            &["Spells"]
        );
        let log = fs::read_to_string(fx.dirs.log_path()).unwrap();
        assert!(log.contains("[ERROR] Failed to save tags"));
    }

    #[cfg(unix)]
    #[test]
    fn link_sync_reloads_the_new_folder() {
        let fx = fixture();
        let workshop = fx.temp.path().join("workshop").join("content").join("881100");
        fs::create_dir_all(workshop.join("777")).unwrap();
        fs::write(workshop.join("777").join("mod_id.txt"), "epsilon").unwrap();

        let mut session = Session::open(fx.dirs.clone()).unwrap();
        let report = session.sync_links(false).unwrap();
        assert_eq!(report.created, 1);
        let epsilon = session.mods.find("epsilon").unwrap();
        assert!(epsilon.is_symlink);
        assert_eq!(epsilon.workshop_id, "777");
        assert_eq!(session.mods.records().last().unwrap().key, "epsilon");
    }
}
