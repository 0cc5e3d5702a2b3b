use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::alphabet::bucket_of;
use crate::data::Entry;
use crate::normalize::normalize;

/// Searchable text of an entry: headword, id, pos, pronunciation, glosses,
/// notes and tags, space-joined then normalized.
pub fn build_search_blob(entry: &Entry) -> String {
    let mut parts: Vec<&str> = vec![
        entry.headword.as_str(),
        entry.id.as_deref().unwrap_or(""),
        entry.pos.as_str(),
        entry.pron.as_deref().unwrap_or(""),
    ];
    parts.extend(entry.glosses());
    parts.extend(entry.notes());
    parts.extend(entry.tags.iter().map(String::as_str));
    normalize(&parts.join(" "))
}

/// Normalized headword → position of the first entry carrying it.
pub fn build_headword_index(entries: &[Entry]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let key = normalize(&entry.headword);
        if key.is_empty() {
            continue;
        }
        index.entry(key).or_insert(position);
    }
    index
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    /// First-seen original spelling.
    pub label: String,
    /// Normalized identity.
    pub key: String,
    pub count: usize,
}

/// Tag occurrence counts in first-seen order. A tag repeated within one
/// entry counts once for that entry.
pub fn tag_frequencies(entries: &[Entry]) -> Vec<TagCount> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<TagCount> = Vec::new();
    for entry in entries {
        let mut seen = HashSet::new();
        for tag in &entry.tags {
            let key = normalize(tag);
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            match slots.get(&key) {
                Some(&slot) => counts[slot].count += 1,
                None => {
                    slots.insert(key.clone(), counts.len());
                    counts.push(TagCount {
                        label: tag.trim().to_string(),
                        key,
                        count: 1,
                    });
                }
            }
        }
    }
    counts
}

/// Highest counts first; equal counts keep first-seen order.
pub fn top_tags(frequencies: &[TagCount], limit: usize) -> Vec<TagCount> {
    let mut ranked = frequencies.to_vec();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

const POS_LABELS: &[(&str, &str)] = &[
    ("n", "noun"),
    ("v", "verb"),
    ("adj", "adjective"),
    ("adv", "adverb"),
    ("pron", "pronoun"),
    ("prep", "preposition"),
    ("conj", "conjunction"),
    ("interj", "interjection"),
    ("num", "numeral"),
    ("det", "determiner"),
    ("part", "particle"),
    ("phr", "phrase"),
];

pub const UNKNOWN_POS: &str = "?";

/// Display label for a part-of-speech code.
pub fn pos_label(code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return UNKNOWN_POS.to_string();
    }
    let lowered = code.to_lowercase();
    POS_LABELS
        .iter()
        .find(|(known, _)| *known == lowered)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| code.to_uppercase())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PosOption {
    pub code: String,
    pub label: String,
}

/// Distinct non-empty codes, sorted, each with its display label.
pub fn parts_of_speech(entries: &[Entry]) -> Vec<PosOption> {
    let mut codes: Vec<&str> = entries
        .iter()
        .map(|entry| entry.pos.trim())
        .filter(|code| !code.is_empty())
        .collect();
    codes.sort_unstable();
    codes.dedup();
    codes
        .into_iter()
        .map(|code| PosOption {
            code: code.to_string(),
            label: pos_label(code),
        })
        .collect()
}

/// Normalized per-entry fields the query engine and ranker read.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntryKeys {
    pub headword: String,
    pub blob: String,
    pub glosses: String,
    pub notes: String,
    pub tags: HashSet<String>,
    pub tag_text: String,
    pub bucket: Option<char>,
}

impl EntryKeys {
    fn from_entry(entry: &Entry) -> Self {
        let tags: Vec<String> = entry
            .tags
            .iter()
            .map(|tag| normalize(tag))
            .filter(|tag| !tag.is_empty())
            .collect();
        Self {
            headword: normalize(&entry.headword),
            blob: build_search_blob(entry),
            glosses: normalize(&entry.glosses().collect::<Vec<_>>().join(" ")),
            notes: normalize(&entry.notes().collect::<Vec<_>>().join(" ")),
            tag_text: tags.join(" "),
            tags: tags.into_iter().collect(),
            bucket: bucket_of(&entry.headword),
        }
    }
}

/// Every structure derived from an entry list. Always rebuilt whole.
#[derive(Debug, Clone, Default)]
pub struct LexiconIndex {
    pub(crate) keys: Vec<EntryKeys>,
    headwords: HashMap<String, usize>,
    tag_counts: Vec<TagCount>,
}

impl LexiconIndex {
    pub fn build(entries: &[Entry]) -> Self {
        let keys: Vec<EntryKeys> = entries.iter().map(EntryKeys::from_entry).collect();
        let headwords = build_headword_index(entries);
        let tag_counts = tag_frequencies(entries);
        debug!(
            entries = entries.len(),
            headwords = headwords.len(),
            tags = tag_counts.len(),
            "Built lexicon index"
        );
        Self {
            keys,
            headwords,
            tag_counts,
        }
    }

    /// Position of the entry owning a headword, compared in normalized form.
    pub fn lookup(&self, headword: &str) -> Option<usize> {
        self.lookup_normalized(&normalize(headword))
    }

    pub fn lookup_normalized(&self, key: &str) -> Option<usize> {
        self.headwords.get(key).copied()
    }

    pub fn blob(&self, position: usize) -> Option<&str> {
        self.keys.get(position).map(|keys| keys.blob.as_str())
    }

    pub fn normalized_headword(&self, position: usize) -> Option<&str> {
        self.keys.get(position).map(|keys| keys.headword.as_str())
    }

    pub fn headword_count(&self) -> usize {
        self.headwords.len()
    }

    pub fn tag_frequencies(&self) -> &[TagCount] {
        &self.tag_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Definition;

    fn entry(headword: &str, id: &str, tags: &[&str]) -> Entry {
        Entry {
            id: Some(id.to_string()),
            headword: headword.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Entry::default()
        }
    }

    #[test]
    fn blob_covers_every_searchable_field() {
        let entry = Entry {
            id: Some("E-1".into()),
            headword: "Aigüa".into(),
            pos: "n".into(),
            pron: Some("ˈaj.ɣwa".into()),
            defs: vec![Definition {
                gloss: "Water".into(),
                notes: Some("Feminine".into()),
            }],
            tags: vec!["Nature".into()],
            ..Entry::default()
        };
        let blob = build_search_blob(&entry);
        for needle in ["aigua", "e-1", "n", "ˈaj.ɣwa", "water", "feminine", "nature"] {
            assert!(blob.contains(needle), "{needle} missing from {blob:?}");
        }
        assert!(!blob.contains("undefined"));
        assert!(!blob.contains("none"));
    }

    #[test]
    fn blob_of_empty_entry_is_empty() {
        assert_eq!(build_search_blob(&Entry::default()), "");
    }

    #[test]
    fn headword_index_is_first_wins_and_skips_blank() {
        let entries = vec![
            entry("ca", "1", &[]),
            entry("CA", "2", &[]),
            entry("  ", "3", &[]),
            entry("cà", "4", &[]),
        ];
        let index = build_headword_index(&entries);
        assert_eq!(index.get("ca"), Some(&0));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn tag_frequencies_keep_first_casing_and_order() {
        let entries = vec![
            entry("a", "1", &["Color", "animal"]),
            entry("b", "2", &["color", "Animal", "wild"]),
            entry("c", "3", &["Wild", "wild", "cólor"]),
        ];
        let counts = tag_frequencies(&entries);
        let summary: Vec<(&str, usize)> = counts
            .iter()
            .map(|tag| (tag.label.as_str(), tag.count))
            .collect();
        assert_eq!(summary, vec![("Color", 3), ("animal", 2), ("wild", 2)]);
        assert_eq!(tag_frequencies(&entries), counts);
    }

    #[test]
    fn top_tags_break_ties_by_first_seen() {
        let entries = vec![
            entry("a", "1", &["x", "y"]),
            entry("b", "2", &["z", "y"]),
            entry("c", "3", &["z"]),
        ];
        let top = top_tags(&tag_frequencies(&entries), 2);
        let labels: Vec<&str> = top.iter().map(|tag| tag.label.as_str()).collect();
        assert_eq!(labels, vec!["y", "z"]);
    }

    #[test]
    fn pos_labels() {
        assert_eq!(pos_label("n"), "noun");
        assert_eq!(pos_label(" ADJ "), "adjective");
        assert_eq!(pos_label("clf"), "CLF");
        assert_eq!(pos_label(""), "?");
    }

    #[test]
    fn parts_of_speech_are_distinct_and_sorted() {
        let mut entries = vec![entry("a", "1", &[]), entry("b", "2", &[]), entry("c", "3", &[])];
        entries[0].pos = "v".into();
        entries[1].pos = "adj".into();
        entries[2].pos = " v".into();
        let options = parts_of_speech(&entries);
        let codes: Vec<&str> = options.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, vec!["adj", "v"]);
        assert_eq!(options[1].label, "verb");
    }
}
