use anyhow::{Context, Result};
use std::{
    ffi::OsString,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

/// Writes `contents` to a sibling temp file, syncs it, then renames it over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().context("target has no parent dir")?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let temp_path = temp_path_for(path)?;

    let result = (|| -> Result<()> {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("create {}", temp_path.display()))?;
        file.write_all(contents)
            .with_context(|| format!("write {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("sync {}", temp_path.display()))?;
        Ok(())
    })();
    if let Err(err) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err).with_context(|| format!("finalize {}", path.display()));
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().context("target has no parent dir")?;
    let file_name = path.file_name().context("target has no file name")?;
    let mut temp_name = OsString::from(file_name);
    temp_name.push(".tmp");
    let temp_path = parent.join(temp_name);
    if !temp_path.exists() {
        return Ok(temp_path);
    }
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut temp_name = OsString::from(file_name);
    temp_name.push(format!(".{stamp}.tmp"));
    Ok(parent.join(temp_name))
}

/// Keeps letters, digits, spaces, `-` and `_`; everything else becomes `_`.
pub fn sanitize_filename_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == ' ' || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim().to_string()
}
