use serde::Serialize;

use crate::Lexicon;
use crate::alphabet::ALPHABET;
use crate::data::{Entry, Meta};
use crate::index::{PosOption, TagCount, pos_label};
use crate::linkify::RichText;
use crate::nav::Address;
use crate::query::{Hit, QueryResults};

#[derive(Debug, Clone, Serialize)]
pub struct DefinitionView {
    pub gloss: RichText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<RichText>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleView {
    pub src: RichText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gloss: Option<String>,
}

/// A single entry, cross-referenced and ready to draw.
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub position: usize,
    pub headword: String,
    pub address: Option<Address>,
    pub pos: String,
    pub pos_label: String,
    pub pron: Option<String>,
    pub definitions: Vec<DefinitionView>,
    pub examples: Vec<ExampleView>,
    pub tags: Vec<String>,
}

impl EntryView {
    pub fn build(lexicon: &Lexicon, position: usize) -> Option<Self> {
        let entry = lexicon.entry(position)?;
        let definitions = entry
            .defs
            .iter()
            .map(|def| DefinitionView {
                gloss: lexicon.linkify(&def.gloss, entry),
                notes: def
                    .notes
                    .as_deref()
                    .filter(|notes| !notes.trim().is_empty())
                    .map(|notes| lexicon.linkify(notes, entry)),
            })
            .collect();
        let examples = entry
            .examples
            .iter()
            .map(|example| ExampleView {
                src: lexicon.linkify(&example.src, entry),
                gloss: example
                    .gloss
                    .clone()
                    .filter(|gloss| !gloss.trim().is_empty()),
            })
            .collect();
        Some(Self {
            position,
            headword: entry.headword.clone(),
            address: lexicon.address_of(position),
            pos: entry.pos.trim().to_string(),
            pos_label: pos_label(&entry.pos),
            pron: entry.pron.clone().filter(|pron| !pron.trim().is_empty()),
            definitions,
            examples,
            tags: entry.tags.clone(),
        })
    }
}

/// Compact line in a result list.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRow {
    pub position: usize,
    pub headword: String,
    pub address: Option<Address>,
    pub pos_label: String,
    pub primary_gloss: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

impl From<&Hit<'_>> for ResultRow {
    fn from(hit: &Hit<'_>) -> Self {
        Self {
            position: hit.position,
            headword: hit.entry.headword.clone(),
            address: hit.address.clone(),
            pos_label: pos_label(&hit.entry.pos),
            primary_gloss: hit.entry.primary_gloss().to_string(),
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub total: usize,
    pub truncated: bool,
    pub rows: Vec<ResultRow>,
}

impl From<&QueryResults<'_>> for ResultsView {
    fn from(results: &QueryResults<'_>) -> Self {
        Self {
            total: results.total,
            truncated: results.is_truncated(),
            rows: results.hits.iter().map(ResultRow::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LetterSlot {
    pub letter: char,
    pub enabled: bool,
}

/// Everything the page chrome needs besides the result list.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub title: String,
    pub subtitle: String,
    pub meta: Meta,
    pub letters: Vec<LetterSlot>,
    pub tags: Vec<TagCount>,
    pub parts_of_speech: Vec<PosOption>,
}

impl Overview {
    pub fn build(lexicon: &Lexicon) -> Self {
        let present = lexicon.present_letters();
        Self {
            title: lexicon.title().to_string(),
            subtitle: lexicon.subtitle(),
            meta: lexicon.meta().clone(),
            letters: ALPHABET
                .iter()
                .map(|&letter| LetterSlot {
                    letter,
                    enabled: present.contains(&letter),
                })
                .collect(),
            tags: lexicon.top_tags(),
            parts_of_speech: lexicon.parts_of_speech(),
        }
    }
}

/// Plain-text rendering used for terminal output and copy blocks.
pub fn entry_text(entry: &Entry) -> String {
    let mut lines: Vec<String> = Vec::new();
    match entry.pron.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(pron) => lines.push(format!("{}  {}", entry.headword, pron)),
        None => lines.push(entry.headword.clone()),
    }
    if !entry.pos.trim().is_empty() {
        lines.push(format!("Part of speech: {}", pos_label(&entry.pos)));
    }

    if !entry.defs.is_empty() {
        lines.push(String::new());
        lines.push("Definitions:".to_string());
        for (idx, def) in entry.defs.iter().enumerate() {
            match def.notes.as_deref().filter(|n| !n.trim().is_empty()) {
                Some(notes) => lines.push(format!("  {}. {} — {}", idx + 1, def.gloss, notes)),
                None => lines.push(format!("  {}. {}", idx + 1, def.gloss)),
            }
        }
    }

    if !entry.examples.is_empty() {
        lines.push(String::new());
        lines.push("Examples:".to_string());
        for example in &entry.examples {
            lines.push(format!("  • {}", example.src));
            if let Some(gloss) = example.gloss.as_deref().filter(|g| !g.trim().is_empty()) {
                lines.push(format!("    {gloss}"));
            }
        }
    }

    if !entry.tags.is_empty() {
        lines.push(String::new());
        lines.push(format!("Tags: {}", entry.tags.join(", ")));
    }
    lines.join("\n")
}
