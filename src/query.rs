//! Filter queries over the mod list.
//!
//! A query is a whitespace-separated list of terms that must all match. A
//! term is one or more alternatives joined by `|`; a leading `-` negates the
//! whole term. Each alternative is a case-insensitive substring test:
//!
//! - `#text` matches any user or workshop tag,
//! - `@text` matches the display name only,
//! - `text` matches the display name or any tag.
//!
//! `#magic|#wand -@broken` keeps mods tagged with "magic" or "wand" whose
//! name does not contain "broken".

use crate::library::{ModList, ModRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Tag(String),
    Name(String),
    Any(String),
}

impl Matcher {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(rest) = raw.strip_prefix('#') {
            return Some(Matcher::Tag(rest.to_string()));
        }
        if let Some(rest) = raw.strip_prefix('@') {
            return Some(Matcher::Name(rest.to_string()));
        }
        Some(Matcher::Any(raw.to_string()))
    }

    fn matches(&self, name: &str, tags: &[String]) -> bool {
        match self {
            Matcher::Tag(needle) => tags.iter().any(|tag| tag.contains(needle.as_str())),
            Matcher::Name(needle) => name.contains(needle.as_str()),
            Matcher::Any(needle) => {
                name.contains(needle.as_str()) || tags.iter().any(|tag| tag.contains(needle.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub negated: bool,
    pub alternatives: Vec<Matcher>,
}

impl Term {
    /// A term whose alternatives are all empty (`|`) matches nothing.
    fn matches(&self, name: &str, tags: &[String]) -> bool {
        let any = self
            .alternatives
            .iter()
            .any(|matcher| matcher.matches(name, tags));
        any != self.negated
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<Term>,
}

impl Query {
    pub fn parse(input: &str) -> Self {
        let lowered = input.trim().to_lowercase();
        let mut terms = Vec::new();
        for raw in lowered.split_whitespace() {
            let (negated, body) = match raw.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            if body.is_empty() {
                continue;
            }
            let alternatives = body.split('|').filter_map(Matcher::parse).collect();
            terms.push(Term {
                negated,
                alternatives,
            });
        }
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, record: &ModRecord) -> bool {
        if self.is_empty() {
            return true;
        }
        let name = record.display_name().to_lowercase();
        let tags: Vec<String> = record
            .all_tags()
            .map(|tag| tag.trim().to_lowercase())
            .collect();
        self.terms.iter().all(|term| term.matches(&name, &tags))
    }

    /// Canonical indices of matching records, in canonical order.
    pub fn filter_indices(&self, mods: &ModList) -> Vec<usize> {
        mods.records()
            .iter()
            .enumerate()
            .filter(|(_, record)| self.matches(record))
            .map(|(index, _)| index)
            .collect()
    }
}

/// Appends `#tag` to `query` unless that token is already present.
pub fn with_tag_term(query: &str, tag: &str) -> String {
    let current = query.trim();
    let token = format!("#{tag}");
    if current.contains(&token) {
        return current.to_string();
    }
    if current.is_empty() {
        token
    } else {
        format!("{current} {token}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(key: &str, name: &str, user: &[&str], workshop: &[&str]) -> ModRecord {
        let mut record = ModRecord::new(key);
        record.display_name = name.to_string();
        for tag in user {
            record.user_tags.insert(tag);
        }
        for tag in workshop {
            record.workshop_tags.insert(tag);
        }
        record
    }

    fn sample() -> ModList {
        ModList::new(vec![
            record("fire_wands", "Fire Wands", &["Magic"], &["Gameplay"]),
            record("ice_world", "Ice World", &[], &["Biomes", "magical"]),
            record("broken_magic", "Broken Magic", &["magic", "BROKEN"], &[]),
            record("qol", "Quality of Life", &["ui"], &["Fire Support"]),
            record("plain", "", &[], &[]),
        ])
    }

    fn run(query: &str) -> Vec<String> {
        let mods = sample();
        Query::parse(query)
            .filter_indices(&mods)
            .into_iter()
            .map(|index| mods.records()[index].key.clone())
            .collect()
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let all = vec!["fire_wands", "ice_world", "broken_magic", "qol", "plain"];
        assert_eq!(run(""), all);
        assert_eq!(run("   \t "), all);
    }

    #[test]
    fn tag_terms_and_negation() {
        assert_eq!(run("#magic -#broken"), vec!["fire_wands", "ice_world"]);
    }

    #[test]
    fn name_only_alternatives_ignore_tags() {
        assert_eq!(run("@fire|@ice"), vec!["fire_wands", "ice_world"]);
    }

    #[test]
    fn bare_terms_search_name_and_tags() {
        assert_eq!(run("fire"), vec!["fire_wands", "qol"]);
        assert_eq!(run("FIRE wands"), vec!["fire_wands"]);
    }

    #[test]
    fn negated_alternatives_exclude_any_match() {
        assert_eq!(run("-@fire|@ice"), vec!["broken_magic", "qol", "plain"]);
    }

    #[test]
    fn display_name_falls_back_to_key() {
        assert_eq!(run("@plain"), vec!["plain"]);
    }

    #[test]
    fn degenerate_terms() {
        assert_eq!(run("-"), run(""));
        assert!(run("|").is_empty());
        assert_eq!(run("-|").len(), 5);
        assert_eq!(run("#"), vec!["fire_wands", "ice_world", "broken_magic", "qol"]);
        assert_eq!(run("a|"), run("a"));
    }

    #[test]
    fn records_without_tags_are_not_errors() {
        assert!(run("#anything").is_empty());
    }

    #[test]
    fn filter_indices_point_into_canonical_order() {
        let mods = sample();
        assert_eq!(Query::parse("#magic").filter_indices(&mods), vec![0, 1, 2]);
    }

    #[test]
    fn tag_term_is_appended_once() {
        assert_eq!(with_tag_term("", "Magic"), "#Magic");
        assert_eq!(with_tag_term("fire ", "Magic"), "fire #Magic");
        assert_eq!(with_tag_term("fire #Magic", "Magic"), "fire #Magic");
    }

    proptest! {
        #[test]
        fn filtered_view_is_an_ordered_subsequence(query in "[a-z#@|\\- ]{0,12}") {
            let mods = sample();
            let indices = Query::parse(&query).filter_indices(&mods);
            prop_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(indices.iter().all(|index| *index < mods.len()));
        }

        #[test]
        fn query_case_does_not_matter(query in "[a-zA-Z#@ ]{0,10}") {
            let mods = sample();
            prop_assert_eq!(
                Query::parse(&query).filter_indices(&mods),
                Query::parse(&query.to_uppercase()).filter_indices(&mods)
            );
        }
    }
}
