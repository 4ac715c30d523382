use crate::{fs_util, library::ModList, mod_config};
use anyhow::{bail, Context, Result};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

const JSON_EXT: &str = "json";
const XML_EXT: &str = "xml";

/// Preset file stem for a user-supplied name.
pub fn preset_stem(name: &str) -> Result<String> {
    let stem = fs_util::sanitize_filename_component(name.trim());
    if stem.trim_matches('_').trim().is_empty() {
        bail!("preset name {name:?} has no usable characters");
    }
    Ok(stem)
}

fn preset_path(presets_dir: &Path, name: &str, ext: &str) -> Result<PathBuf> {
    Ok(presets_dir.join(format!("{}.{ext}", preset_stem(name)?)))
}

/// Sorted names of the saved presets.
pub fn list_presets(presets_dir: &Path) -> Result<Vec<String>> {
    if !presets_dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(presets_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.context("read presets dir")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(JSON_EXT) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    Ok(names)
}

/// Writes the full record set as JSON plus the game's XML form of it.
pub fn save_preset(presets_dir: &Path, name: &str, mods: &ModList) -> Result<PathBuf> {
    fs::create_dir_all(presets_dir).context("create presets dir")?;
    let json_path = preset_path(presets_dir, name, JSON_EXT)?;
    let xml_path = preset_path(presets_dir, name, XML_EXT)?;

    let json = serde_json::to_string_pretty(mods).context("serialize preset")?;
    let xml = mod_config::render_mod_config(mods.records())?;
    fs_util::write_atomic(&json_path, json.as_bytes()).context("write preset json")?;
    fs_util::write_atomic(&xml_path, xml.as_bytes()).context("write preset xml")?;
    Ok(json_path)
}

/// Reads a preset back from its JSON form.
pub fn load_preset(presets_dir: &Path, name: &str) -> Result<ModList> {
    let path = preset_path(presets_dir, name, JSON_EXT)?;
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read preset {}", path.display()))?;
    let mods = serde_json::from_str(&raw).context("parse preset")?;
    Ok(mods)
}

/// Removes both files of a preset. Files that are already gone are fine.
pub fn delete_preset(presets_dir: &Path, name: &str) -> Result<()> {
    for ext in [JSON_EXT, XML_EXT] {
        let path = preset_path(presets_dir, name, ext)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("remove {}", path.display()));
            }
        }
    }
    Ok(())
}
