use crate::{
    fs_util,
    library::{ConfigAttr, ModRecord, LOCAL_ITEM_ID},
};
use anyhow::{bail, Context, Result};
use log::warn;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Reader, Writer,
};
use std::{fs, path::Path};

const ROOT_ELEMENT: &str = "Mods";
const MOD_ELEMENT: &str = "Mod";
const ATTR_NAME: &str = "name";
const ATTR_ENABLED: &str = "enabled";
const ATTR_WORKSHOP_ID: &str = "workshop_item_id";

/// Reads the game's mod list. A missing file is an empty list.
pub fn read_mod_config(path: &Path) -> Result<Vec<ModRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    parse_mod_config(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Parses `<Mod>` children of the root element in document order. Only the
/// config-backed fields are filled; everything else keeps its default.
pub fn parse_mod_config(bytes: &[u8]) -> Result<Vec<ModRecord>> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut records = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    saw_root = true;
                } else if depth == 1 && e.name().as_ref() == MOD_ELEMENT.as_bytes() {
                    push_record(&e, &mut records)?;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    saw_root = true;
                } else if depth == 1 && e.name().as_ref() == MOD_ELEMENT.as_bytes() {
                    push_record(&e, &mut records)?;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                bail!(
                    "malformed XML at byte {}: {err}",
                    reader.buffer_position()
                );
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        bail!("no root element");
    }
    Ok(records)
}

fn push_record(e: &BytesStart<'_>, records: &mut Vec<ModRecord>) -> Result<()> {
    let mut name = None;
    let mut enabled = false;
    let mut workshop_id = None;
    let mut layout = Vec::new();

    for attr in e.attributes() {
        let attr = attr.context("read Mod attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .context("decode Mod attribute")?
            .to_string();
        match key.as_str() {
            ATTR_NAME => {
                name = Some(value);
                layout.push(ConfigAttr::Name);
            }
            ATTR_ENABLED => {
                enabled = value.trim() == "1";
                layout.push(ConfigAttr::Enabled);
            }
            ATTR_WORKSHOP_ID => {
                let value = value.trim();
                workshop_id = Some(if value.is_empty() {
                    LOCAL_ITEM_ID.to_string()
                } else {
                    value.to_string()
                });
                layout.push(ConfigAttr::WorkshopItemId);
            }
            _ => layout.push(ConfigAttr::Other { key, value }),
        }
    }

    let Some(name) = name else {
        warn!("mod config entry without a name attribute ignored");
        return Ok(());
    };

    let mut record = ModRecord::new(&name);
    record.enabled = enabled;
    if let Some(id) = workshop_id {
        record.workshop_id = id;
    }
    record.config_layout = layout;
    records.push(record);
    Ok(())
}

/// Serialises the records in order. Every `workshop_item_id` is written as `"0"`
/// so the game loads linked workshop content as local mods.
pub fn render_mod_config(records: &[ModRecord]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .context("write XML declaration")?;
    writer
        .write_event(Event::Start(BytesStart::new(ROOT_ELEMENT)))
        .context("write Mods")?;

    for record in records {
        let mut element = BytesStart::new(MOD_ELEMENT);
        for attr in effective_layout(&record.config_layout) {
            match &attr {
                ConfigAttr::Name => element.push_attribute((ATTR_NAME, record.key.as_str())),
                ConfigAttr::Enabled => element
                    .push_attribute((ATTR_ENABLED, if record.enabled { "1" } else { "0" })),
                ConfigAttr::WorkshopItemId => {
                    element.push_attribute((ATTR_WORKSHOP_ID, LOCAL_ITEM_ID))
                }
                ConfigAttr::Other { key, value } => {
                    element.push_attribute((key.as_str(), value.as_str()))
                }
            }
        }
        writer
            .write_event(Event::Empty(element))
            .with_context(|| format!("write Mod {}", record.key))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))
        .context("write /Mods")?;
    let mut xml = String::from_utf8(writer.into_inner()).context("mod config is not UTF-8")?;
    xml.push('\n');
    Ok(xml)
}

/// Serialises in memory first, then replaces the file atomically.
pub fn write_mod_config(path: &Path, records: &[ModRecord]) -> Result<()> {
    let xml = render_mod_config(records)?;
    fs_util::write_atomic(path, xml.as_bytes())
        .with_context(|| format!("write mod config {}", path.display()))
}

/// The record's attribute order with the three required attributes present once each.
fn effective_layout(layout: &[ConfigAttr]) -> Vec<ConfigAttr> {
    let mut out: Vec<ConfigAttr> = Vec::with_capacity(layout.len() + 3);
    for attr in layout {
        let seen = match attr {
            ConfigAttr::Other { key, .. } => out
                .iter()
                .any(|existing| matches!(existing, ConfigAttr::Other { key: k, .. } if k == key)),
            required => out.contains(required),
        };
        if !seen {
            out.push(attr.clone());
        }
    }
    if !out.contains(&ConfigAttr::Name) {
        out.insert(0, ConfigAttr::Name);
    }
    if !out.contains(&ConfigAttr::Enabled) {
        out.push(ConfigAttr::Enabled);
    }
    if !out.contains(&ConfigAttr::WorkshopItemId) {
        out.push(ConfigAttr::WorkshopItemId);
    }
    out
}
