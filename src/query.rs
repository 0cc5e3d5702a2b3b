use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::data::Entry;
use crate::index::{EntryKeys, LexiconIndex};
use crate::nav::{Address, address_of};
use crate::normalize::{normalize, tokens};
use crate::rank;

pub const DEFAULT_RESULT_CAP: usize = 200;
pub const DEFAULT_TOP_TAGS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// Longest result slice handed to presentation.
    pub result_cap: usize,
    /// How many tags the facet list shows.
    pub top_tags: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            result_cap: DEFAULT_RESULT_CAP,
            top_tags: DEFAULT_TOP_TAGS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "letter", rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Search,
    /// `None` browses every letter.
    Browse(Option<char>),
}

impl Mode {
    pub fn letter(&self) -> Option<char> {
        match self {
            Mode::Search => None,
            Mode::Browse(letter) => *letter,
        }
    }

    pub fn is_browse(&self) -> bool {
        matches!(self, Mode::Browse(_))
    }
}

/// Everything that decides what the result list shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryState {
    pub query: String,
    #[serde(deserialize_with = "trimmed_pos")]
    pub pos: Option<String>,
    /// Normalized tag identities, all required.
    #[serde(deserialize_with = "normalized_tags")]
    pub tags: BTreeSet<String>,
    pub mode: Mode,
}

fn trimmed_pos<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let pos = Option::<String>::deserialize(deserializer)?;
    Ok(pos
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty()))
}

fn normalized_tags<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeSet<String>, D::Error> {
    let tags = Vec::<String>::deserialize(deserializer)?;
    Ok(tags
        .iter()
        .map(|tag| normalize(tag))
        .filter(|tag| !tag.is_empty())
        .collect())
}

impl QueryState {
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn browse(letter: Option<char>) -> Self {
        Self {
            mode: Mode::Browse(letter),
            ..Self::default()
        }
    }

    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.set_pos(Some(pos.into()));
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.add_tag(tag);
        self
    }

    /// Blank codes clear the filter.
    pub fn set_pos(&mut self, pos: Option<String>) {
        self.pos = pos
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());
    }

    pub fn add_tag(&mut self, tag: &str) -> bool {
        let key = normalize(tag);
        !key.is_empty() && self.tags.insert(key)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(&normalize(tag))
    }

    /// Returns whether the tag is selected afterwards.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.remove_tag(tag) {
            return false;
        }
        self.add_tag(tag)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&normalize(tag))
    }

    /// Part-of-speech equality (trimmed) and AND over selected tags.
    pub fn matches_facets(&self, entry: &Entry) -> bool {
        if !self.pos_matches(entry) {
            return false;
        }
        if self.tags.is_empty() {
            return true;
        }
        let entry_tags: BTreeSet<String> = entry.tags.iter().map(|tag| normalize(tag)).collect();
        self.tags.iter().all(|tag| entry_tags.contains(tag))
    }

    fn pos_matches(&self, entry: &Entry) -> bool {
        match self.pos.as_deref() {
            Some(code) => entry.pos.trim() == code.trim(),
            None => true,
        }
    }

    fn facets_match(&self, entry: &Entry, keys: &EntryKeys) -> bool {
        self.pos_matches(entry) && self.tags.iter().all(|tag| keys.tags.contains(tag))
    }
}

#[derive(Debug, Clone)]
pub struct Hit<'a> {
    pub position: usize,
    pub entry: &'a Entry,
    /// Present for ranked free-text results only.
    pub score: Option<i64>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct QueryResults<'a> {
    /// Number of matches before the display cap.
    pub total: usize,
    pub hits: Vec<Hit<'a>>,
}

impl QueryResults<'_> {
    pub fn is_truncated(&self) -> bool {
        self.total > self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Runs the facet filter plus the active mode over the whole dataset.
pub fn execute<'a>(
    entries: &'a [Entry],
    index: &LexiconIndex,
    state: &QueryState,
    result_cap: usize,
) -> QueryResults<'a> {
    let keys = index.keys.as_slice();
    let eligible = entries
        .iter()
        .zip(keys)
        .enumerate()
        .filter(|(_, (entry, keys))| state.facets_match(entry, keys));

    let normalized = normalize(&state.query);
    let ranked: Vec<(usize, Option<i64>)> = match state.mode {
        Mode::Search if !normalized.is_empty() => {
            let needles = tokens(&normalized);
            let mut scored: Vec<(usize, i64)> = eligible
                .filter(|(_, (_, keys))| needles.iter().all(|token| keys.blob.contains(token)))
                .map(|(position, (_, keys))| (position, rank::score(keys, &state.query)))
                .collect();
            rank::sort_ranked(&mut scored, keys);
            scored
                .into_iter()
                .map(|(position, score)| (position, Some(score)))
                .collect()
        }
        Mode::Search => alphabetical(eligible.map(|(position, _)| position), keys),
        Mode::Browse(letter) => alphabetical(
            eligible
                .filter(|(_, (_, keys))| letter.is_none() || keys.bucket == letter)
                .map(|(position, _)| position),
            keys,
        ),
    };

    let total = ranked.len();
    debug!(mode = ?state.mode, query = %normalized, total, "Executed lexicon query");
    let hits = ranked
        .into_iter()
        .take(result_cap)
        .map(|(position, score)| Hit {
            position,
            entry: &entries[position],
            score,
            address: address_of(entries, index, position),
        })
        .collect();
    QueryResults { total, hits }
}

fn alphabetical(
    positions: impl Iterator<Item = usize>,
    keys: &[EntryKeys],
) -> Vec<(usize, Option<i64>)> {
    let mut ordered: Vec<usize> = positions.collect();
    ordered.sort_by(|a, b| keys[*a].headword.cmp(&keys[*b].headword));
    ordered.into_iter().map(|position| (position, None)).collect()
}
