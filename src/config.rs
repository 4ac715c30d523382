use crate::{error::SetupError, fs_util, noita};
use anyhow::{Context, Result};
use directories::BaseDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const APP_DIR_NAME: &str = "wandkeeper";
const HOME_ENV: &str = "WANDKEEPER_HOME";

/// Where the manager keeps its own files.
#[derive(Debug, Clone)]
pub struct AppDirs {
    pub data_dir: PathBuf,
}

impl AppDirs {
    pub fn resolve() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV) {
            return Ok(Self::from_root(PathBuf::from(home)));
        }
        let base = BaseDirs::new().context("resolve home dir")?;
        Ok(Self::from_root(base.data_local_dir().join(APP_DIR_NAME)))
    }

    pub fn from_root(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).context("create app data dir")?;
        fs::create_dir_all(self.presets_dir()).context("create presets dir")?;
        Ok(())
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn tags_path(&self) -> PathBuf {
        self.data_dir.join("mod_tags.json")
    }

    pub fn presets_dir(&self) -> PathBuf {
        self.data_dir.join("presets")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("wandkeeper.log")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_game_root")]
    pub noita_path: PathBuf,
    #[serde(default = "default_workshop_root")]
    pub workshop_path: PathBuf,
    #[serde(default = "noita::default_mod_config_path")]
    pub mod_config_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let noita_path = default_game_root();
        let workshop_path = noita::default_workshop_root(&noita_path);
        Self {
            noita_path,
            workshop_path,
            mod_config_path: noita::default_mod_config_path(),
        }
    }
}

impl Settings {
    /// Missing keys fall back to defaults; an unreadable or malformed file yields defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let parsed = fs::read_to_string(path)
            .context("read settings")
            .and_then(|raw| serde_json::from_str::<Settings>(&raw).context("parse settings"));
        match parsed {
            Ok(settings) => settings,
            Err(err) => {
                warn!("ignoring settings file {}: {err:#}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("serialize settings")?;
        fs_util::write_atomic(path, raw.as_bytes()).context("write settings")
    }

    pub fn game_paths(&self) -> noita::GamePaths {
        noita::GamePaths::new(&self.noita_path, &self.workshop_path, &self.mod_config_path)
    }

    /// Checks both roots. A missing workshop root is replaced by the sibling
    /// guess next to the game install when that exists; returns whether anything changed.
    pub fn validate(&mut self) -> Result<bool, SetupError> {
        if !noita::looks_like_game_root(&self.noita_path) {
            return Err(SetupError::GameRootMissing(self.noita_path.clone()));
        }
        if noita::looks_like_workshop_root(&self.workshop_path) {
            return Ok(false);
        }
        let guess = noita::guess_workshop_root(&self.noita_path);
        if noita::looks_like_workshop_root(&guess) {
            self.workshop_path = normalize(&guess);
            return Ok(true);
        }
        Err(SetupError::WorkshopRootMissing(self.workshop_path.clone()))
    }
}

fn default_game_root() -> PathBuf {
    noita::default_game_root()
}

fn default_workshop_root() -> PathBuf {
    noita::default_workshop_root(&noita::default_game_root())
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
