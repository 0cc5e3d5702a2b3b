pub mod alphabet;
pub mod data;
pub mod index;
pub mod linkify;
pub mod nav;
pub mod normalize;
pub mod query;
mod rank;
pub mod view;

use std::collections::BTreeSet;
use std::path::Path;

pub use data::{Definition, Entry, Example, LexiconDataset, LoadError, Meta};
pub use index::{LexiconIndex, PosOption, TagCount};
pub use linkify::{RichText, Segment};
pub use nav::{Address, Event, MemoryHost, NavigationHost, Session, Update};
pub use normalize::normalize;
pub use query::{Hit, Mode, QueryConfig, QueryResults, QueryState};
pub use view::{EntryView, Overview, ResultRow, ResultsView};

const DEFAULT_TITLE: &str = "Dictionary";

/// A loaded dataset together with every structure derived from it.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    dataset: LexiconDataset,
    index: LexiconIndex,
    config: QueryConfig,
}

impl Lexicon {
    pub fn new(dataset: LexiconDataset) -> Self {
        Self::with_config(dataset, QueryConfig::default())
    }

    pub fn with_config(dataset: LexiconDataset, config: QueryConfig) -> Self {
        let index = LexiconIndex::build(&dataset.entries);
        Self {
            dataset,
            index,
            config,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        LexiconDataset::from_path(path).map(Self::new)
    }

    /// Swaps in a new dataset and rebuilds the index from scratch.
    pub fn reload(&mut self, dataset: LexiconDataset) {
        self.index = LexiconIndex::build(&dataset.entries);
        self.dataset = dataset;
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: QueryConfig) {
        self.config = config;
    }

    pub fn meta(&self) -> &Meta {
        &self.dataset.meta
    }

    pub fn entries(&self) -> &[Entry] {
        &self.dataset.entries
    }

    pub fn entry(&self, position: usize) -> Option<&Entry> {
        self.dataset.entries.get(position)
    }

    pub fn len(&self) -> usize {
        self.dataset.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.entries.is_empty()
    }

    pub fn index(&self) -> &LexiconIndex {
        &self.index
    }

    pub fn title(&self) -> &str {
        self.meta().lang().unwrap_or(DEFAULT_TITLE)
    }

    pub fn subtitle(&self) -> String {
        let count = self.len();
        let noun = if count == 1 { "entry" } else { "entries" };
        match self.meta().version() {
            Some(version) => format!("{count} {noun} • v{version}"),
            None => format!("{count} {noun}"),
        }
    }

    /// First entry whose normalized headword equals the normalized input.
    pub fn entry_by_headword(&self, headword: &str) -> Option<&Entry> {
        self.index.lookup(headword).and_then(|pos| self.entry(pos))
    }

    pub fn query(&self, state: &QueryState) -> QueryResults<'_> {
        query::execute(
            &self.dataset.entries,
            &self.index,
            state,
            self.config.result_cap,
        )
    }

    pub fn query_capped(&self, state: &QueryState, result_cap: usize) -> QueryResults<'_> {
        query::execute(&self.dataset.entries, &self.index, state, result_cap)
    }

    pub fn present_letters(&self) -> BTreeSet<char> {
        alphabet::present_letters(&self.dataset.entries)
    }

    pub fn tag_frequencies(&self) -> &[TagCount] {
        self.index.tag_frequencies()
    }

    /// The facet list: configured number of tags, most frequent first.
    pub fn top_tags(&self) -> Vec<TagCount> {
        index::top_tags(self.index.tag_frequencies(), self.config.top_tags)
    }

    pub fn parts_of_speech(&self) -> Vec<PosOption> {
        index::parts_of_speech(&self.dataset.entries)
    }

    pub fn address_of(&self, position: usize) -> Option<Address> {
        nav::address_of(&self.dataset.entries, &self.index, position)
    }

    pub fn resolve(&self, address: &str) -> Option<&Entry> {
        nav::resolve(self, address).and_then(|pos| self.entry(pos))
    }

    pub fn resolve_position(&self, address: &str) -> Option<usize> {
        nav::resolve(self, address)
    }

    pub fn linkify(&self, text: &str, current: &Entry) -> RichText {
        linkify::linkify(text, current, &self.dataset.entries, &self.index)
    }

    pub fn entry_view(&self, position: usize) -> Option<EntryView> {
        EntryView::build(self, position)
    }

    pub fn overview(&self) -> Overview {
        Overview::build(self)
    }
}

#[cfg(feature = "web")]
pub mod web;
