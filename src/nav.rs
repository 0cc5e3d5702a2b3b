//! Navigation state: the active query/browse mode, the open entry, and the
//! permalink scheme shared links depend on.
//!
//! Addresses come in two shapes and both must keep resolving:
//! `<escaped headword>` and `id:<escaped id>`. Escaping matches
//! `encodeURIComponent`.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Lexicon;
use crate::alphabet;
use crate::data::Entry;
use crate::index::LexiconIndex;
use crate::query::{Mode, QueryResults, QueryState};

const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const ID_PREFIX: &str = "id:";

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// `None` when the escapes do not decode to UTF-8.
pub fn decode_component(value: &str) -> Option<String> {
    percent_decode_str(value)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Shareable identifier of one entry, without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Accepts `#abc` or `abc`.
    pub fn from_fragment(fragment: &str) -> Self {
        Self(fragment.strip_prefix('#').unwrap_or(fragment).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn fragment(&self) -> String {
        format!("#{}", self.0)
    }

    pub fn is_id(&self) -> bool {
        self.0.starts_with(ID_PREFIX)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permalink of the entry at `position`.
///
/// The headword form is used when this entry is the one its headword
/// resolves to. A blank headword, or one already owned by an earlier entry,
/// falls back to the `id:` form when the entry has an id.
pub fn address_of(entries: &[Entry], index: &LexiconIndex, position: usize) -> Option<Address> {
    let entry = entries.get(position)?;
    let owns_headword = entry.has_headword()
        && index
            .normalized_headword(position)
            .and_then(|key| index.lookup_normalized(key))
            == Some(position);
    match entry.stable_id() {
        Some(id) if !owns_headword => {
            Some(Address(format!("{ID_PREFIX}{}", encode_component(id))))
        }
        _ if entry.has_headword() => Some(Address(encode_component(&entry.headword))),
        _ => None,
    }
}

/// Position of the entry an address points at.
pub fn resolve(lexicon: &Lexicon, address: &str) -> Option<usize> {
    let address = address.strip_prefix('#').unwrap_or(address);
    let resolved = match address.strip_prefix(ID_PREFIX) {
        Some(escaped) => {
            let id = decode_component(escaped)?;
            lexicon
                .entries()
                .iter()
                .position(|entry| entry.id.as_deref() == Some(id.as_str()))
        }
        None => {
            let headword = decode_component(address)?;
            lexicon.index().lookup(&headword)
        }
    };
    if resolved.is_none() {
        debug!(address, "Address did not resolve to an entry");
    }
    resolved
}

/// The host environment's location bar, seen from the core.
pub trait NavigationHost {
    fn current_address(&self) -> Option<Address>;
    fn publish(&mut self, address: &Address);
}

/// In-process host that records every published address.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    current: Option<Address>,
    history: Vec<Address>,
}

impl MemoryHost {
    pub fn at(address: Address) -> Self {
        Self {
            current: Some(address),
            history: Vec::new(),
        }
    }

    /// Addresses published by the core, oldest first.
    pub fn history(&self) -> &[Address] {
        &self.history
    }

    /// Simulates an outside location change (back/forward, edited fragment).
    pub fn navigate(&mut self, address: Address) {
        self.current = Some(address);
    }
}

impl NavigationHost for MemoryHost {
    fn current_address(&self) -> Option<Address> {
        self.current.clone()
    }

    fn publish(&mut self, address: &Address) {
        self.current = Some(address.clone());
        self.history.push(address.clone());
    }
}

/// Discrete presentation events the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    QueryInput(String),
    ClearQuery,
    SelectLetter(char),
    BrowseAll,
    SelectPos(Option<String>),
    ToggleTag(String),
    OpenEntry(usize),
    ExternalNavigation(String),
}

#[derive(Debug, Clone)]
pub enum Update<'a> {
    /// The result list must be redrawn.
    Results(QueryResults<'a>),
    /// An entry is now open.
    Opened(&'a Entry),
    /// The event changed nothing visible.
    Unchanged,
}

/// Per-user state, owned by the presentation layer and passed to the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    state: QueryState,
    selected: Option<usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Typing always returns to search mode.
    pub fn input_query(&mut self, text: impl Into<String>) {
        self.state.query = text.into();
        self.state.mode = Mode::Search;
    }

    pub fn clear_query(&mut self) {
        self.input_query(String::new());
    }

    /// Ignores letters outside the browse alphabet.
    pub fn select_letter(&mut self, letter: char) -> bool {
        match alphabet::parse_letter(&letter.to_string()) {
            Some(letter) => {
                self.state.mode = Mode::Browse(Some(letter));
                true
            }
            None => false,
        }
    }

    pub fn browse_all(&mut self) {
        self.state.mode = Mode::Browse(None);
    }

    pub fn select_pos(&mut self, pos: Option<String>) {
        self.state.set_pos(pos);
    }

    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        self.state.toggle_tag(tag)
    }

    pub fn results<'a>(&self, lexicon: &'a Lexicon) -> QueryResults<'a> {
        lexicon.query(&self.state)
    }

    /// User-initiated open; publishes the address unless the host already shows it.
    pub fn open_entry<'a, H: NavigationHost>(
        &mut self,
        lexicon: &'a Lexicon,
        host: &mut H,
        position: usize,
    ) -> Option<&'a Entry> {
        let entry = lexicon.entry(position)?;
        self.selected = Some(position);
        if let Some(address) = lexicon.address_of(position) {
            if host.current_address().as_ref() != Some(&address) {
                host.publish(&address);
            }
        }
        Some(entry)
    }

    /// Host-initiated location change; never publishes back.
    pub fn on_external_navigation<'a>(
        &mut self,
        lexicon: &'a Lexicon,
        address: &str,
    ) -> Option<&'a Entry> {
        let position = resolve(lexicon, address)?;
        self.selected = Some(position);
        lexicon.entry(position)
    }

    pub fn dispatch<'a, H: NavigationHost>(
        &mut self,
        lexicon: &'a Lexicon,
        host: &mut H,
        event: Event,
    ) -> Update<'a> {
        match event {
            Event::QueryInput(text) => self.input_query(text),
            Event::ClearQuery => self.clear_query(),
            Event::SelectLetter(letter) => {
                if !self.select_letter(letter) {
                    return Update::Unchanged;
                }
            }
            Event::BrowseAll => self.browse_all(),
            Event::SelectPos(pos) => self.select_pos(pos),
            Event::ToggleTag(tag) => {
                self.toggle_tag(&tag);
            }
            Event::OpenEntry(position) => {
                return self
                    .open_entry(lexicon, host, position)
                    .map(Update::Opened)
                    .unwrap_or(Update::Unchanged);
            }
            Event::ExternalNavigation(address) => {
                return self
                    .on_external_navigation(lexicon, &address)
                    .map(Update::Opened)
                    .unwrap_or(Update::Unchanged);
            }
        }
        Update::Results(self.results(lexicon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LexiconDataset;

    fn entry(headword: &str, id: Option<&str>) -> Entry {
        Entry {
            headword: headword.to_string(),
            id: id.map(str::to_string),
            ..Entry::default()
        }
    }

    fn lexicon() -> Lexicon {
        Lexicon::new(LexiconDataset::new(
            Default::default(),
            vec![
                entry("ca", Some("1")),
                entry("ca", Some("2")),
                entry("çò e aquò", Some("x/3")),
                entry("", Some("only id")),
                entry(" ", None),
                entry("l'aiga", None),
            ],
        ))
    }

    #[test]
    fn encoding_matches_uri_component_rules() {
        assert_eq!(encode_component("çò e aquò"), "%C3%A7%C3%B2%20e%20aqu%C3%B2");
        assert_eq!(encode_component("l'aiga (f.)"), "l'aiga%20(f.)");
        assert_eq!(encode_component("a/b?c#d"), "a%2Fb%3Fc%23d");
    }

    #[test]
    fn address_prefers_headword_then_id() {
        let lex = lexicon();
        assert_eq!(lex.address_of(0).unwrap().as_str(), "ca");
        assert_eq!(lex.address_of(3).unwrap().as_str(), "id:only%20id");
        assert_eq!(lex.address_of(4), None);
        assert_eq!(lex.address_of(99), None);
        assert_eq!(
            lex.address_of(2).unwrap().fragment(),
            "#%C3%A7%C3%B2%20e%20aqu%C3%B2"
        );
    }

    #[test]
    fn shared_headword_falls_back_to_id() {
        let lex = lexicon();
        assert_eq!(lex.address_of(1).unwrap().as_str(), "id:2");

        let without_id = Lexicon::new(LexiconDataset::new(
            Default::default(),
            vec![entry("Ca", Some("1")), entry("ca", None)],
        ));
        assert_eq!(without_id.address_of(1).unwrap().as_str(), "ca");
    }

    #[test]
    fn addresses_round_trip() {
        let lex = lexicon();
        for position in [0, 1, 2, 3, 5] {
            let address = lex.address_of(position).unwrap();
            assert_eq!(resolve(&lex, address.as_str()), Some(position));
            assert_eq!(resolve(&lex, &address.fragment()), Some(position));
        }
    }

    #[test]
    fn duplicate_headwords_resolve_to_first() {
        let lex = lexicon();
        assert_eq!(resolve(&lex, "CA"), Some(0));
        assert_eq!(resolve(&lex, "id:2"), Some(1));
    }

    #[test]
    fn unresolved_addresses_are_none() {
        let lex = lexicon();
        assert_eq!(resolve(&lex, "nobody"), None);
        assert_eq!(resolve(&lex, "id:404"), None);
        assert_eq!(resolve(&lex, "%FF%FE"), None);
        assert_eq!(resolve(&lex, ""), None);
    }

    #[test]
    fn typing_forces_search_mode() {
        let mut session = Session::new();
        assert!(session.select_letter('Ç'));
        assert_eq!(session.mode(), Mode::Browse(Some('ç')));
        session.input_query("aiga");
        assert_eq!(session.mode(), Mode::Search);
        session.browse_all();
        assert_eq!(session.mode(), Mode::Browse(None));
        session.clear_query();
        assert_eq!(session.mode(), Mode::Search);
        assert_eq!(session.state().query, "");
        assert!(!session.select_letter('k'));
        assert_eq!(session.mode(), Mode::Search);
    }

    #[test]
    fn opening_publishes_once() {
        let lex = lexicon();
        let mut host = MemoryHost::default();
        let mut session = Session::new();
        assert!(session.open_entry(&lex, &mut host, 0).is_some());
        assert!(session.open_entry(&lex, &mut host, 0).is_some());
        assert_eq!(host.history(), &[Address::new("ca")]);
        assert_eq!(session.selected(), Some(0));
        assert!(session.open_entry(&lex, &mut host, 99).is_none());
    }

    #[test]
    fn external_navigation_does_not_publish() {
        let lex = lexicon();
        let mut host = MemoryHost::at(Address::new("ca"));
        let mut session = Session::new();
        host.navigate(Address::new("id:only%20id"));
        let current = host.current_address().unwrap();
        let update = session.dispatch(
            &lex,
            &mut host,
            Event::ExternalNavigation(current.fragment()),
        );
        assert!(matches!(update, Update::Opened(entry) if entry.id.as_deref() == Some("only id")));
        assert!(host.history().is_empty());
        assert_eq!(session.selected(), Some(3));
    }

    #[test]
    fn mode_changes_rerun_the_query() {
        let lex = lexicon();
        let mut host = MemoryHost::default();
        let mut session = Session::new();
        match session.dispatch(&lex, &mut host, Event::SelectLetter('l')) {
            Update::Results(results) => {
                assert_eq!(results.total, 1);
                assert_eq!(results.hits[0].entry.headword, "l'aiga");
            }
            other => panic!("expected results, got {other:?}"),
        }
        assert!(matches!(
            session.dispatch(&lex, &mut host, Event::SelectLetter('w')),
            Update::Unchanged
        ));
    }
}
