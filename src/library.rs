use serde::{Deserialize, Serialize};

pub const LOCAL_ITEM_ID: &str = "0";
const WORKSHOP_URL: &str = "https://steamcommunity.com/sharedfiles/filedetails/?id=";

/// Ordered set of tags: insertion order kept, exact duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trims each value and drops empty strings and duplicates.
    pub fn from_raw<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for value in values {
            set.insert(value.as_ref());
        }
        set
    }

    /// Returns true when the trimmed tag was not present yet.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    /// Replaces the tag at `index`. An empty value removes it; a value that already
    /// sits at another position leaves the set untouched.
    pub fn replace(&mut self, index: usize, tag: &str) -> bool {
        if index >= self.0.len() {
            return false;
        }
        let tag = tag.trim();
        if tag.is_empty() {
            self.0.remove(index);
            return true;
        }
        if self.position(tag).is_some() {
            return false;
        }
        self.0[index] = tag.to_string();
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Option<String> {
        if index < self.0.len() {
            Some(self.0.remove(index))
        } else {
            None
        }
    }

    pub fn extend_from(&mut self, other: &TagSet) -> usize {
        other.iter().filter(|tag| self.insert(tag)).count()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|existing| existing == tag)
    }

    pub fn position(&self, tag: &str) -> Option<usize> {
        self.0.iter().position(|existing| existing == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    User,
    Workshop,
}

impl TagKind {
    pub fn label(self) -> &'static str {
        match self {
            TagKind::User => "user",
            TagKind::Workshop => "workshop",
        }
    }
}

/// One attribute slot of a `<Mod>` element, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigAttr {
    Name,
    Enabled,
    WorkshopItemId,
    Other { key: String, value: String },
}

pub fn default_config_layout() -> Vec<ConfigAttr> {
    vec![ConfigAttr::Name, ConfigAttr::Enabled, ConfigAttr::WorkshopItemId]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRecord {
    /// On-disk folder name.
    pub key: String,
    pub enabled: bool,
    #[serde(default = "local_item_id")]
    pub workshop_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_symlink: bool,
    #[serde(default)]
    pub user_tags: TagSet,
    #[serde(default)]
    pub workshop_tags: TagSet,
    #[serde(default = "default_config_layout")]
    pub config_layout: Vec<ConfigAttr>,
}

impl ModRecord {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            enabled: false,
            workshop_id: local_item_id(),
            display_name: key.to_string(),
            is_symlink: false,
            user_tags: TagSet::new(),
            workshop_tags: TagSet::new(),
            config_layout: default_config_layout(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.key
        } else {
            &self.display_name
        }
    }

    pub fn is_workshop_item(&self) -> bool {
        self.workshop_id != LOCAL_ITEM_ID && !self.workshop_id.is_empty()
    }

    pub fn workshop_url(&self) -> Option<String> {
        self.is_workshop_item()
            .then(|| format!("{WORKSHOP_URL}{}", self.workshop_id))
    }

    pub fn tags(&self, kind: TagKind) -> &TagSet {
        match kind {
            TagKind::User => &self.user_tags,
            TagKind::Workshop => &self.workshop_tags,
        }
    }

    pub fn tags_mut(&mut self, kind: TagKind) -> &mut TagSet {
        match kind {
            TagKind::User => &mut self.user_tags,
            TagKind::Workshop => &mut self.workshop_tags,
        }
    }

    pub fn all_tags(&self) -> impl Iterator<Item = &str> {
        self.user_tags.iter().chain(self.workshop_tags.iter())
    }

    pub fn display_type(&self) -> &'static str {
        match (self.is_workshop_item(), self.is_symlink) {
            (true, true) => "Workshop (link)",
            (true, false) => "Workshop (copy)",
            (false, true) => "Local (link)",
            (false, false) => "Local",
        }
    }
}

fn local_item_id() -> String {
    LOCAL_ITEM_ID.to_string()
}

/// Where a moved record lands relative to its drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// The canonical ordered record set. Position is load order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModList {
    records: Vec<ModRecord>,
}

impl ModList {
    pub fn new(records: Vec<ModRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ModRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [ModRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ModRecord> {
        self.records.get(index)
    }

    /// Exact key match first, then case-insensitive.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.key == key)
            .or_else(|| {
                let lowered = key.to_lowercase();
                self.records
                    .iter()
                    .position(|record| record.key.to_lowercase() == lowered)
            })
    }

    pub fn find(&self, key: &str) -> Option<&ModRecord> {
        self.index_of(key).map(|index| &self.records[index])
    }

    /// Moves the record at `src` onto the drop target at `dst`. Dropping on the
    /// lower half of the target (`Placement::After`) inserts after it. Returns the
    /// final index, or `None` when either index is out of range.
    pub fn move_record(&mut self, src: usize, dst: usize, placement: Placement) -> Option<usize> {
        if src >= self.records.len() || dst >= self.records.len() {
            return None;
        }
        let mut dst = dst;
        if placement == Placement::After {
            dst += 1;
        }
        if dst > src {
            dst -= 1;
        }
        let record = self.records.remove(src);
        self.records.insert(dst, record);
        Some(dst)
    }

    /// Moves the record at `src` so it ends up at `dst` (clamped to the end).
    pub fn move_to(&mut self, src: usize, dst: usize) -> Option<usize> {
        if src >= self.records.len() {
            return None;
        }
        let record = self.records.remove(src);
        let dst = dst.min(self.records.len());
        self.records.insert(dst, record);
        Some(dst)
    }

    /// Sorted union of every non-empty tag.
    pub fn tag_cloud(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .records
            .iter()
            .flat_map(|record| record.all_tags())
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    pub fn enabled_count(&self) -> usize {
        self.records.iter().filter(|record| record.enabled).count()
    }
}
