use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const GAME_NAME: &str = "Noita";
pub const STEAM_APP_ID: &str = "881100";
pub const GAME_EXE: &str = "noita.exe";
pub const MOD_ID_FILE: &str = "mod_id.txt";
pub const MOD_MANIFEST: &str = "mod.xml";

const WINDOWS_STEAM_ROOT: &str = r"C:\Program Files (x86)\Steam";

/// Locations derived from the configured game root.
#[derive(Debug, Clone)]
pub struct GamePaths {
    pub game_root: PathBuf,
    pub mods_dir: PathBuf,
    pub workshop_root: PathBuf,
    pub mod_config_path: PathBuf,
}

impl GamePaths {
    pub fn new(game_root: &Path, workshop_root: &Path, mod_config_path: &Path) -> Self {
        Self {
            game_root: game_root.to_path_buf(),
            mods_dir: game_root.join("mods"),
            workshop_root: workshop_root.to_path_buf(),
            mod_config_path: mod_config_path.to_path_buf(),
        }
    }
}

pub fn looks_like_game_root(path: &Path) -> bool {
    path.join(GAME_EXE).is_file()
}

pub fn looks_like_workshop_root(path: &Path) -> bool {
    path.is_dir()
}

/// `<steam>/steamapps/common/Noita` -> `<steam>/steamapps/workshop/content/881100`.
pub fn guess_workshop_root(game_root: &Path) -> PathBuf {
    game_root
        .join("..")
        .join("..")
        .join("workshop")
        .join("content")
        .join(STEAM_APP_ID)
}

pub fn default_game_root() -> PathBuf {
    find_game_root().unwrap_or_else(|| {
        PathBuf::from(WINDOWS_STEAM_ROOT)
            .join("steamapps")
            .join("common")
            .join(GAME_NAME)
    })
}

pub fn default_workshop_root(game_root: &Path) -> PathBuf {
    let guess = guess_workshop_root(game_root);
    if guess.is_dir() {
        return guess;
    }
    PathBuf::from(WINDOWS_STEAM_ROOT)
        .join("steamapps")
        .join("workshop")
        .join("content")
        .join(STEAM_APP_ID)
}

pub fn default_mod_config_path() -> PathBuf {
    let save_dir = |base: PathBuf| {
        base.join("LocalLow")
            .join("Nolla_Games_Noita")
            .join("save00")
            .join("mod_config.xml")
    };

    if let Some(appdata) = std::env::var_os("APPDATA") {
        let roaming = PathBuf::from(appdata);
        if let Some(app_data) = roaming.parent() {
            return save_dir(app_data.to_path_buf());
        }
    }

    if let Some(home) = dirs_home() {
        let proton = home
            .join(".local/share/Steam/steamapps/compatdata")
            .join(STEAM_APP_ID)
            .join("pfx/drive_c/users/steamuser/AppData");
        return save_dir(proton);
    }

    save_dir(PathBuf::from("AppData"))
}

fn find_game_root() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(home) = dirs_home() {
        candidates.push(home.join(".local/share/Steam"));
        candidates.push(home.join(".steam/steam"));
    }
    candidates.push(PathBuf::from(WINDOWS_STEAM_ROOT));

    let mut libraries = Vec::new();
    for base in candidates {
        let vdf = base.join("steamapps/libraryfolders.vdf");
        if vdf.exists() {
            if let Ok(paths) = parse_steam_library_paths(&vdf) {
                libraries.extend(paths);
            }
        }
        libraries.push(base);
    }

    libraries
        .into_iter()
        .map(|lib| lib.join("steamapps/common").join(GAME_NAME))
        .find(|candidate| looks_like_game_root(candidate))
}

fn parse_steam_library_paths(path: &Path) -> Result<Vec<PathBuf>> {
    let raw = fs::read_to_string(path).context("read libraryfolders.vdf")?;
    Ok(parse_library_folders(&raw))
}

fn parse_library_folders(raw: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if !line.contains("\"path\"") {
            continue;
        }

        let parts: Vec<&str> = line.split('"').collect();
        if parts.len() >= 4 {
            let path = parts[3].replace("\\\\", "\\");
            paths.push(PathBuf::from(path));
        }
    }
    paths
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
