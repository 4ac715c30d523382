use crate::{
    library::{ModList, ModRecord, TagSet},
    tags::TagStore,
};
use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;
use std::time::Duration;

const ITEM_URL: &str = "https://steamcommunity.com/sharedfiles/filedetails/?id=";
const USER_AGENT: &str = "Mozilla/5.0";
const REQUIRED_TAGS_PATTERN: &str = r#"requiredtags(?:%5B|\[)(?:%5D|\])=([^"&]+)"#;

/// Source of catalog pages for subscribed items.
pub trait CatalogClient {
    fn fetch_item_page(&self, item_id: &str) -> Result<String>;
}

pub struct SteamCatalog {
    agent: ureq::Agent,
}

impl SteamCatalog {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(10))
            .timeout_write(Duration::from_secs(10))
            .build();
        Self { agent }
    }
}

impl Default for SteamCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient for SteamCatalog {
    fn fetch_item_page(&self, item_id: &str) -> Result<String> {
        let url = format!("{ITEM_URL}{item_id}");
        let response = self
            .agent
            .get(&url)
            .set("User-Agent", USER_AGENT)
            .call()
            .with_context(|| format!("fetch {url}"))?;
        response.into_string().context("read item page")
    }
}

/// Pulls tag names out of the `requiredtags[]=` links on an item page.
pub struct TagExtractor {
    pattern: Regex,
}

impl TagExtractor {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(REQUIRED_TAGS_PATTERN).context("compile tag pattern")?;
        Ok(Self { pattern })
    }

    pub fn extract(&self, html: &str) -> TagSet {
        let decoded = self
            .pattern
            .captures_iter(html)
            .filter_map(|captures| captures.get(1))
            .map(|raw| decode_tag(raw.as_str()));
        TagSet::from_raw(decoded)
    }
}

fn decode_tag(raw: &str) -> String {
    let query = format!("t={raw}");
    url::form_urlencoded::parse(query.as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| raw.replace('+', " "))
}

#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub requested: usize,
    pub updated: usize,
    pub failures: Vec<(String, String)>,
}

/// Fetches tags for every subscribed record and merges them into its workshop
/// tags, recording each change in `store` (the caller saves it). A failed
/// request is logged and the loop moves on.
pub fn fetch_workshop_tags(
    mods: &mut ModList,
    store: &mut TagStore,
    client: &dyn CatalogClient,
    mut on_progress: impl FnMut(usize, usize, &ModRecord),
) -> Result<FetchReport> {
    let extractor = TagExtractor::new()?;
    let total = mods.len();
    let mut report = FetchReport::default();

    for (index, record) in mods.records_mut().iter_mut().enumerate() {
        if !record.is_workshop_item() {
            continue;
        }
        on_progress(index + 1, total, record);
        report.requested += 1;

        let page = match client.fetch_item_page(&record.workshop_id) {
            Ok(page) => page,
            Err(err) => {
                warn!("failed to fetch tags for {}: {err:#}", record.workshop_id);
                report
                    .failures
                    .push((record.key.clone(), format!("{err:#}")));
                continue;
            }
        };

        let found = extractor.extract(&page);
        if found.is_empty() {
            debug!("no tags on item page {}", record.workshop_id);
            continue;
        }
        debug!("{} tag(s) on item page {}", found.len(), record.workshop_id);
        record.workshop_tags.extend_from(&found);
        store.record(record);
        report.updated += 1;
    }

    Ok(report)
}
