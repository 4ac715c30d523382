use crate::{
    catalog::SteamCatalog,
    config::{AppDirs, Settings},
    error::SetupError,
    instance::InstanceLock,
    library::{ModRecord, Placement, TagKind},
    session::Session,
};
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct GlobalOptions {
    format: Option<OutputFormat>,
    query: Option<String>,
}

#[derive(Debug)]
struct Invocation {
    command: CliCommand,
    format: OutputFormat,
    query: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Mods(ModsFilter),
    Toggle(String),
    SetEnabled { keys: Vec<String>, enabled: bool },
    SetAllEnabled(bool),
    Move { key: String, target: MoveTarget },
    Tags(TagsCommand),
    FetchTags,
    Presets(PresetCommand),
    Sync { convert: bool },
    Paths,
    Setup(SetupOptions),
    Help,
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModsFilter {
    All,
    Enabled,
    Disabled,
}

#[derive(Debug, PartialEq, Eq)]
enum MoveTarget {
    Before(String),
    After(String),
    Position(usize),
}

#[derive(Debug, PartialEq, Eq)]
enum TagsCommand {
    Cloud,
    Show(String),
    Add { key: String, kind: TagKind, tag: String },
    Edit { key: String, kind: TagKind, index: usize, tag: String },
    Remove { key: String, kind: TagKind, index: usize },
    Query(String),
}

#[derive(Debug, PartialEq, Eq)]
enum PresetCommand {
    List,
    Save(String),
    Load(String),
    Delete(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SetupOptions {
    game: Option<PathBuf>,
    workshop: Option<PathBuf>,
    mod_config: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;
    match invocation.command {
        CliCommand::Help => {
            print_help();
            Ok(())
        }
        CliCommand::Version => {
            println!("Wandkeeper v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let Some(_lock) = InstanceLock::acquire() else {
                return Ok(());
            };
            let dirs = AppDirs::resolve()?;
            match command {
                CliCommand::Setup(options) => run_setup(&dirs, options, invocation.format),
                CliCommand::Paths => show_paths(&dirs, invocation.format),
                command => {
                    let mut session = open_session(dirs)?;
                    if let Some(query) = &invocation.query {
                        session.set_query(query);
                    }
                    run_command(&mut session, command, invocation.format)
                }
            }
        }
    }
}

fn open_session(dirs: AppDirs) -> Result<Session> {
    match Session::open(dirs) {
        Ok(session) => Ok(session),
        Err(err) => match err.downcast_ref::<SetupError>() {
            Some(setup) => bail!(
                "Setup required: {setup}\nRun `wandkeeper setup --game <dir> [--workshop <dir>] [--config <file>]`"
            ),
            None => Err(err),
        },
    }
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let (global, tokens) = parse_global_options(args)?;
    let format = global.format.unwrap_or(OutputFormat::Text);
    let command = match tokens.first().map(String::as_str) {
        None | Some("help" | "--help" | "-h") => CliCommand::Help,
        Some("version" | "--version" | "-V") => CliCommand::Version,
        Some(_) => parse_subcommand(&tokens)?,
    };
    Ok(Invocation {
        command,
        format,
        query: global.query,
    })
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut global = GlobalOptions::default();
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            global.format = Some(parse_format(value)?);
            continue;
        }
        if arg == "--format" {
            let value = iter.next().context("--format requires a value")?;
            global.format = Some(parse_format(value)?);
            continue;
        }
        if let Some(value) = arg.strip_prefix("--query=") {
            global.query = Some(value.to_string());
            continue;
        }
        if arg == "--query" || arg == "-q" {
            let value = iter.next().context("--query requires a value")?;
            global.query = Some(value.to_string());
            continue;
        }
        tokens.push(arg.to_string());
    }
    Ok((global, tokens))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::parse(value).ok_or_else(|| anyhow!("Unknown format: {value} (use text or json)"))
}

fn parse_subcommand(tokens: &[String]) -> Result<CliCommand> {
    let head = tokens[0].as_str();
    let rest = &tokens[1..];
    let command = match head {
        "mods" => {
            let mut filter = ModsFilter::All;
            for arg in rest {
                match arg.as_str() {
                    "list" => {}
                    "--enabled" => filter = ModsFilter::Enabled,
                    "--disabled" => filter = ModsFilter::Disabled,
                    other => bail!("Unknown mods option: {other}"),
                }
            }
            CliCommand::Mods(filter)
        }
        "toggle" => CliCommand::Toggle(required(rest, 0, "toggle requires a mod key")?),
        "enable" | "disable" => {
            if rest.is_empty() {
                bail!("{head} requires one or more mod keys");
            }
            CliCommand::SetEnabled {
                keys: rest.to_vec(),
                enabled: head == "enable",
            }
        }
        "enable-all" => CliCommand::SetAllEnabled(true),
        "disable-all" => CliCommand::SetAllEnabled(false),
        "move" => parse_move(rest)?,
        "tags" => CliCommand::Tags(parse_tags(rest)?),
        "fetch-tags" => CliCommand::FetchTags,
        "presets" => CliCommand::Presets(parse_presets(rest)?),
        "sync" => {
            let mut convert = false;
            for arg in rest {
                match arg.as_str() {
                    "--convert" => convert = true,
                    other => bail!("Unknown sync option: {other}"),
                }
            }
            CliCommand::Sync { convert }
        }
        "paths" => CliCommand::Paths,
        "setup" => CliCommand::Setup(parse_setup(rest)?),
        other => bail!("Unknown command: {other} (see `wandkeeper help`)"),
    };
    Ok(command)
}

fn required(args: &[String], index: usize, message: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| anyhow!(message.to_string()))
}

/// Positions and tag indices are 1-based on the command line.
fn parse_index(value: &str) -> Result<usize> {
    let parsed: usize = value
        .parse()
        .with_context(|| format!("expected a number, got {value:?}"))?;
    if parsed == 0 {
        bail!("positions start at 1");
    }
    Ok(parsed - 1)
}

fn parse_move(args: &[String]) -> Result<CliCommand> {
    let key = required(args, 0, "move requires a mod key")?;
    let flag = required(args, 1, "move requires --before, --after or --to")?;
    let value = required(args, 2, &format!("{flag} requires a value"))?;
    let target = match flag.as_str() {
        "--before" => MoveTarget::Before(value),
        "--after" => MoveTarget::After(value),
        "--to" => MoveTarget::Position(parse_index(&value)?),
        other => bail!("Unknown move option: {other}"),
    };
    Ok(CliCommand::Move { key, target })
}

fn parse_tags(args: &[String]) -> Result<TagsCommand> {
    let mut kind = TagKind::User;
    let mut positional = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--workshop" => kind = TagKind::Workshop,
            "--user" => kind = TagKind::User,
            _ => positional.push(arg.to_string()),
        }
    }
    let sub = positional.first().map(String::as_str).unwrap_or("list");
    let rest = positional.get(1..).unwrap_or(&[]);
    let command = match sub {
        "list" => match rest.first() {
            Some(key) => TagsCommand::Show(key.to_string()),
            None => TagsCommand::Cloud,
        },
        "add" => TagsCommand::Add {
            key: required(rest, 0, "tags add requires a mod key")?,
            kind,
            tag: required(rest, 1, "tags add requires a tag")?,
        },
        "edit" => TagsCommand::Edit {
            key: required(rest, 0, "tags edit requires a mod key")?,
            kind,
            index: parse_index(&required(rest, 1, "tags edit requires a tag number")?)?,
            tag: rest.get(2).cloned().unwrap_or_default(),
        },
        "rm" | "remove" => TagsCommand::Remove {
            key: required(rest, 0, "tags rm requires a mod key")?,
            kind,
            index: parse_index(&required(rest, 1, "tags rm requires a tag number")?)?,
        },
        "query" => TagsCommand::Query(required(rest, 0, "tags query requires a tag")?),
        other => bail!("Unknown tags command: {other} (use list, add, edit, rm or query)"),
    };
    Ok(command)
}

fn parse_presets(args: &[String]) -> Result<PresetCommand> {
    let sub = args.first().map(String::as_str).unwrap_or("list");
    let name = || required(args, 1, &format!("presets {sub} requires a name"));
    let command = match sub {
        "list" => PresetCommand::List,
        "save" => PresetCommand::Save(name()?),
        "load" => PresetCommand::Load(name()?),
        "delete" | "rm" => PresetCommand::Delete(name()?),
        other => bail!("Unknown presets command: {other} (use list, save, load or delete)"),
    };
    Ok(command)
}

fn parse_setup(args: &[String]) -> Result<SetupOptions> {
    let mut options = SetupOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let slot = match arg.as_str() {
            "--game" => &mut options.game,
            "--workshop" => &mut options.workshop,
            "--config" => &mut options.mod_config,
            other => bail!("Unknown setup option: {other}"),
        };
        let value = iter.next().with_context(|| format!("{arg} requires a path"))?;
        *slot = Some(PathBuf::from(value));
    }
    Ok(options)
}

fn run_command(session: &mut Session, command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::Mods(filter) => list_mods(session, filter, format),
        CliCommand::Toggle(key) => {
            let enabled = session.toggle(&key)?;
            println!("{key}: {}", if enabled { "enabled" } else { "disabled" });
            Ok(())
        }
        CliCommand::SetEnabled { keys, enabled } => {
            for key in keys {
                session.set_enabled(&key, enabled)?;
                println!("{key}: {}", if enabled { "enabled" } else { "disabled" });
            }
            Ok(())
        }
        CliCommand::SetAllEnabled(enabled) => {
            session.set_all_enabled(enabled)?;
            println!("{}", session.status);
            Ok(())
        }
        CliCommand::Move { key, target } => {
            let position = match target {
                MoveTarget::Before(target) => session.move_record(&key, &target, Placement::Before)?,
                MoveTarget::After(target) => session.move_record(&key, &target, Placement::After)?,
                MoveTarget::Position(position) => session.move_to_position(&key, position)?,
            };
            println!("{key} -> {}", position + 1);
            Ok(())
        }
        CliCommand::Tags(command) => run_tags(session, command, format),
        CliCommand::FetchTags => {
            let catalog = SteamCatalog::new();
            let report = session.fetch_tags(&catalog, |current, total, record| {
                eprintln!("Fetching ({current}/{total}): {}", record.display_name());
            })?;
            for (key, error) in &report.failures {
                eprintln!("  {key}: {error}");
            }
            println!("{}", session.status);
            Ok(())
        }
        CliCommand::Presets(command) => run_presets(session, command, format),
        CliCommand::Sync { convert } => {
            let report = session.sync_links(convert)?;
            println!("{}", report.summary());
            for failure in report.failures {
                eprintln!("  {}: {}", failure.item.display(), failure.message);
            }
            Ok(())
        }
        CliCommand::Paths | CliCommand::Setup(_) | CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

#[derive(Serialize)]
struct ModListItem {
    order: usize,
    key: String,
    name: String,
    enabled: bool,
    kind: &'static str,
    workshop_id: String,
    workshop_url: Option<String>,
    symlink: bool,
    user_tags: Vec<String>,
    workshop_tags: Vec<String>,
}

impl ModListItem {
    fn new(order: usize, record: &ModRecord) -> Self {
        Self {
            order: order + 1,
            key: record.key.clone(),
            name: record.display_name().to_string(),
            enabled: record.enabled,
            kind: record.display_type(),
            workshop_id: record.workshop_id.clone(),
            workshop_url: record.workshop_url(),
            symlink: record.is_symlink,
            user_tags: record.user_tags.as_slice().to_vec(),
            workshop_tags: record.workshop_tags.as_slice().to_vec(),
        }
    }
}

fn list_mods(session: &Session, filter: ModsFilter, format: OutputFormat) -> Result<()> {
    let items: Vec<ModListItem> = session
        .filtered_indices()
        .into_iter()
        .filter_map(|index| session.mods.get(index).map(|record| (index, record)))
        .filter(|(_, record)| match filter {
            ModsFilter::All => true,
            ModsFilter::Enabled => record.enabled,
            ModsFilter::Disabled => !record.enabled,
        })
        .map(|(index, record)| ModListItem::new(index, record))
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Text => {
            if session.mods.is_empty() {
                println!("No mods found in {}", session.paths.mods_dir.display());
            }
            for item in &items {
                let enabled = if item.enabled { "x" } else { " " };
                let mut tags = item.user_tags.clone();
                tags.extend(item.workshop_tags.iter().cloned());
                let tags = if tags.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", tags.join(", "))
                };
                println!(
                    "{order:>3} [{enabled}] {kind:<16} {name}{tags}",
                    order = item.order,
                    kind = item.kind,
                    name = item.name
                );
            }
            println!(
                "{} of {} mod(s) shown, {} enabled",
                items.len(),
                session.mods.len(),
                session.mods.enabled_count()
            );
            let skipped = session.last_report.skipped_count();
            if skipped > 0 {
                println!("{skipped} folder(s) skipped while scanning (RUST_LOG=debug for details)");
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ModTagsOutput {
    key: String,
    user_tags: Vec<String>,
    workshop_tags: Vec<String>,
}

fn run_tags(session: &mut Session, command: TagsCommand, format: OutputFormat) -> Result<()> {
    match command {
        TagsCommand::Cloud => {
            let cloud = session.tag_cloud();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cloud)?),
                OutputFormat::Text => {
                    if cloud.is_empty() {
                        println!("No tags yet.");
                    }
                    for tag in cloud {
                        println!("{tag}");
                    }
                }
            }
        }
        TagsCommand::Show(key) => {
            let record = session
                .mods
                .find(&key)
                .ok_or_else(|| anyhow!("unknown mod: {key}"))?;
            let output = ModTagsOutput {
                key: record.key.clone(),
                user_tags: record.tags(TagKind::User).as_slice().to_vec(),
                workshop_tags: record.tags(TagKind::Workshop).as_slice().to_vec(),
            };
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => {
                    for (label, tags) in [
                        (TagKind::User.label(), &output.user_tags),
                        (TagKind::Workshop.label(), &output.workshop_tags),
                    ] {
                        println!("{label}:");
                        for (index, tag) in tags.iter().enumerate() {
                            println!("  {}. {tag}", index + 1);
                        }
                    }
                }
            }
        }
        TagsCommand::Add { key, kind, tag } => {
            let added = session.add_tag(&key, kind, &tag)?;
            report_tag_change(&key, kind, added);
        }
        TagsCommand::Edit {
            key,
            kind,
            index,
            tag,
        } => {
            let changed = session.update_tag(&key, kind, index, &tag)?;
            report_tag_change(&key, kind, changed);
        }
        TagsCommand::Remove { key, kind, index } => {
            let removed = session.delete_tag(&key, kind, index)?;
            report_tag_change(&key, kind, removed);
        }
        TagsCommand::Query(tag) => {
            session.add_tag_to_query(&tag);
            println!("{}", session.query);
        }
    }
    Ok(())
}

fn report_tag_change(key: &str, kind: TagKind, changed: bool) {
    if changed {
        println!("{key}: {} tags updated", kind.label());
    } else {
        println!("{key}: no change");
    }
}

fn run_presets(session: &mut Session, command: PresetCommand, format: OutputFormat) -> Result<()> {
    match command {
        PresetCommand::List => {
            let names = session.list_presets()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
                OutputFormat::Text => {
                    if names.is_empty() {
                        println!("No presets saved.");
                    }
                    for name in names {
                        println!("{name}");
                    }
                }
            }
        }
        PresetCommand::Save(name) => {
            let path = session.save_preset(&name)?;
            println!("Saved preset {name} ({})", path.display());
        }
        PresetCommand::Load(name) => {
            session.load_preset(&name)?;
            println!("{}", session.status);
        }
        PresetCommand::Delete(name) => {
            session.delete_preset(&name)?;
            println!("{}", session.status);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct PathsOutput {
    data_dir: String,
    game_root: String,
    mods_dir: String,
    workshop_root: String,
    mod_config_path: String,
    error: Option<String>,
}

fn paths_output(dirs: &AppDirs, settings: &Settings, error: Option<String>) -> PathsOutput {
    let paths = settings.game_paths();
    PathsOutput {
        data_dir: dirs.data_dir.display().to_string(),
        game_root: paths.game_root.display().to_string(),
        mods_dir: paths.mods_dir.display().to_string(),
        workshop_root: paths.workshop_root.display().to_string(),
        mod_config_path: paths.mod_config_path.display().to_string(),
        error,
    }
}

fn print_paths(output: &PathsOutput, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(output)?);
        }
        OutputFormat::Text => {
            println!("Data dir: {}", output.data_dir);
            println!("Game root: {}", output.game_root);
            println!("Mods dir: {}", output.mods_dir);
            println!("Workshop: {}", output.workshop_root);
            println!("Mod config: {}", output.mod_config_path);
            if let Some(error) = &output.error {
                println!("Warning: {error}");
            }
        }
    }
    Ok(())
}

fn show_paths(dirs: &AppDirs, format: OutputFormat) -> Result<()> {
    let mut settings = Settings::load(&dirs.settings_path());
    let error = settings.validate().err().map(|err| err.to_string());
    print_paths(&paths_output(dirs, &settings, error), format)
}

fn run_setup(dirs: &AppDirs, options: SetupOptions, format: OutputFormat) -> Result<()> {
    dirs.ensure()?;
    let settings_path = dirs.settings_path();
    let mut settings = Settings::load(&settings_path);
    if let Some(game) = options.game {
        settings.noita_path = game;
    }
    if let Some(workshop) = options.workshop {
        settings.workshop_path = workshop;
    }
    if let Some(mod_config) = options.mod_config {
        settings.mod_config_path = mod_config;
    }
    settings.validate()?;
    settings.save(&settings_path)?;
    print_paths(&paths_output(dirs, &settings, None), format)
}

fn print_help() {
    print!("{}", help_text());
}

fn help_text() -> String {
    let mut text = format!("Wandkeeper v{}\n", env!("CARGO_PKG_VERSION"));
    for line in [
        "Usage:",
        "  wandkeeper mods [--enabled|--disabled]   List mods in load order",
        "  wandkeeper toggle <key>                  Flip a mod's enabled flag",
        "  wandkeeper enable <key>...               Enable mods",
        "  wandkeeper disable <key>...              Disable mods",
        "  wandkeeper enable-all                    Enable every mod matching --query",
        "  wandkeeper disable-all                   Disable every mod matching --query",
        "  wandkeeper move <key> --before <key>     Move a mod above another",
        "  wandkeeper move <key> --after <key>      Move a mod below another",
        "  wandkeeper move <key> --to <n>           Move a mod to position n",
        "  wandkeeper tags [list [<key>]]           Show all tags, or one mod's tags",
        "  wandkeeper tags add <key> <tag>          Add a tag",
        "  wandkeeper tags edit <key> <n> [<tag>]   Replace tag n (empty removes it)",
        "  wandkeeper tags rm <key> <n>             Remove tag n",
        "  wandkeeper tags add|edit|rm ... --workshop  Act on workshop tags instead of user tags",
        "  wandkeeper tags query <tag>              Print --query with #tag appended",
        "  wandkeeper fetch-tags                    Fetch tags for subscribed mods",
        "  wandkeeper presets [list]                List presets",
        "  wandkeeper presets save|load|delete <n>  Manage presets",
        "  wandkeeper sync [--convert]              Link subscribed mods into the mods dir",
        "  wandkeeper paths                         Show configured paths",
        "  wandkeeper setup [--game <dir>] [--workshop <dir>] [--config <file>]",
        "",
        "Global options:",
        "  --format <json|text>                     Output format",
        "  -q, --query <query>                      Filter, e.g. \"#magic -@broken\"",
        "  -h, --help                               Show help",
        "  -V, --version                            Show version",
    ] {
        text.push_str(line);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Invocation> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        parse_args(&args)
    }

    #[test]
    fn workshop_flag_is_documented_with_tag_commands() {
        let help = help_text();
        let (usage, global) = help.split_once("Global options:").unwrap();
        assert!(usage.contains("tags add|edit|rm ... --workshop"));
        assert!(!global.contains("--workshop"));
    }

    #[test]
    fn no_arguments_prints_help() {
        assert_eq!(parse(&[]).unwrap().command, CliCommand::Help);
        assert_eq!(parse(&["-V"]).unwrap().command, CliCommand::Version);
    }

    #[test]
    fn global_options_can_appear_anywhere() {
        let invocation = parse(&["mods", "--format=json", "--query", "#magic -@broken"]).unwrap();
        assert_eq!(invocation.command, CliCommand::Mods(ModsFilter::All));
        assert_eq!(invocation.format, OutputFormat::Json);
        assert_eq!(invocation.query.as_deref(), Some("#magic -@broken"));
        assert!(parse(&["mods", "--format", "yaml"]).is_err());
    }

    #[test]
    fn move_targets() {
        assert_eq!(
            parse(&["move", "a", "--after", "b"]).unwrap().command,
            CliCommand::Move {
                key: "a".to_string(),
                target: MoveTarget::After("b".to_string()),
            }
        );
        assert_eq!(
            parse(&["move", "a", "--to", "1"]).unwrap().command,
            CliCommand::Move {
                key: "a".to_string(),
                target: MoveTarget::Position(0),
            }
        );
        assert!(parse(&["move", "a", "--to", "0"]).is_err());
        assert!(parse(&["move", "a"]).is_err());
    }

    #[test]
    fn tag_commands() {
        assert_eq!(
            parse(&["tags"]).unwrap().command,
            CliCommand::Tags(TagsCommand::Cloud)
        );
        assert_eq!(
            parse(&["tags", "add", "spell_lab", "wand", "--workshop"])
                .unwrap()
                .command,
            CliCommand::Tags(TagsCommand::Add {
                key: "spell_lab".to_string(),
                kind: TagKind::Workshop,
                tag: "wand".to_string(),
            })
        );
        assert_eq!(
            parse(&["tags", "edit", "spell_lab", "2"]).unwrap().command,
            CliCommand::Tags(TagsCommand::Edit {
                key: "spell_lab".to_string(),
                kind: TagKind::User,
                index: 1,
                tag: String::new(),
            })
        );
    }

    #[test]
    fn setup_and_presets() {
        assert_eq!(
            parse(&["setup", "--game", "/games/Noita"]).unwrap().command,
            CliCommand::Setup(SetupOptions {
                game: Some(PathBuf::from("/games/Noita")),
                ..SetupOptions::default()
            })
        );
        assert!(parse(&["setup", "--game"]).is_err());
        assert_eq!(
            parse(&["presets", "save", "run"]).unwrap().command,
            CliCommand::Presets(PresetCommand::Save("run".to_string()))
        );
        assert!(parse(&["presets", "load"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
    }
}
