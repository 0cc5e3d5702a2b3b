use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::data::Entry;
use crate::index::LexiconIndex;
use crate::nav::{Address, address_of};
use crate::normalize::normalize;

/// A letter followed by letters, combining marks, hyphens or apostrophes.
static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{L}[\p{L}\p{M}'-]*").expect("valid word pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Text { text: String },
    Link { text: String, address: Address },
}

/// Prose split into literal text and references to other entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RichText(Vec<Segment>);

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self(vec![Segment::Text { text }])
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &Address)> + '_ {
        self.0.iter().filter_map(|segment| match segment {
            Segment::Link { text, address } => Some((text.as_str(), address)),
            Segment::Text { .. } => None,
        })
    }

    /// The original text with references flattened away.
    pub fn plain_text(&self) -> String {
        self.0
            .iter()
            .map(|segment| match segment {
                Segment::Text { text } | Segment::Link { text, .. } => text.as_str(),
            })
            .collect()
    }

    /// Markup with `#address` fragment links.
    pub fn to_html(&self) -> String {
        self.to_html_with(|address| address.fragment())
    }

    /// Markup with caller-chosen link targets. Every literal is escaped.
    pub fn to_html_with<F>(&self, href: F) -> String
    where
        F: Fn(&Address) -> String,
    {
        let mut html = String::new();
        for segment in &self.0 {
            match segment {
                Segment::Text { text } => html.push_str(&escape_html(text)),
                Segment::Link { text, address } => {
                    html.push_str(r#"<a class="xref" href=""#);
                    html.push_str(&escape_html(&href(address)));
                    html.push_str(r#"">"#);
                    html.push_str(&escape_html(text));
                    html.push_str("</a>");
                }
            }
        }
        html
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.0.last_mut() {
            Some(Segment::Text { text: last }) => last.push_str(text),
            _ => self.0.push(Segment::Text {
                text: text.to_string(),
            }),
        }
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Wraps every word naming another known headword in a reference to it.
///
/// Words equal to `current`'s own headword stay literal, as do words with no
/// matching entry.
pub fn linkify(text: &str, current: &Entry, entries: &[Entry], index: &LexiconIndex) -> RichText {
    let own = normalize(&current.headword);
    let mut rich = RichText::default();
    let mut cursor = 0;
    for word in WORD.find_iter(text) {
        let key = normalize(word.as_str());
        let target = if key == own {
            None
        } else {
            index
                .lookup_normalized(&key)
                .and_then(|position| address_of(entries, index, position))
        };
        if let Some(address) = target {
            rich.push_text(&text[cursor..word.start()]);
            rich.0.push(Segment::Link {
                text: word.as_str().to_string(),
                address,
            });
            cursor = word.end();
        }
    }
    rich.push_text(&text[cursor..]);
    rich
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(headword: &str) -> Entry {
        Entry {
            headword: headword.to_string(),
            ..Entry::default()
        }
    }

    fn fixture() -> (Vec<Entry>, LexiconIndex) {
        let entries = vec![
            entry("aiga"),
            entry("ríu"),
            entry("pont-nòu"),
            entry("l'òme"),
            entry("<b>"),
        ];
        let index = LexiconIndex::build(&entries);
        (entries, index)
    }

    #[test]
    fn links_known_headwords_preserving_case() {
        let (entries, index) = fixture();
        let rich = linkify("L'Aiga del RIU.", &entries[4], &entries, &index);
        let links: Vec<(&str, &str)> = rich
            .links()
            .map(|(text, address)| (text, address.as_str()))
            .collect();
        assert_eq!(links, vec![("RIU", "r%C3%ADu")]);
        assert_eq!(rich.plain_text(), "L'Aiga del RIU.");
    }

    #[test]
    fn apostrophes_and_hyphens_belong_to_the_word() {
        let (entries, index) = fixture();
        let rich = linkify("lo pont-nòu e l'òme", &entries[0], &entries, &index);
        let linked: Vec<&str> = rich.links().map(|(text, _)| text).collect();
        assert_eq!(linked, vec!["pont-nòu", "l'òme"]);
    }

    #[test]
    fn own_headword_is_not_linked() {
        let (entries, index) = fixture();
        let rich = linkify("aiga e ríu", &entries[0], &entries, &index);
        let linked: Vec<&str> = rich.links().map(|(text, _)| text).collect();
        assert_eq!(linked, vec!["ríu"]);
    }

    #[test]
    fn literal_text_is_escaped() {
        let (entries, index) = fixture();
        let rich = linkify(r#"<script>"x"</script> & aiga"#, &entries[1], &entries, &index);
        assert_eq!(
            rich.to_html(),
            r##"&lt;script&gt;&quot;x&quot;&lt;/script&gt; &amp; <a class="xref" href="#aiga">aiga</a>"##
        );
    }

    #[test]
    fn unmatched_text_stays_a_single_segment() {
        let (entries, index) = fixture();
        let rich = linkify("res de conegut, 42!", &entries[0], &entries, &index);
        assert_eq!(rich.segments().len(), 1);
        assert_eq!(rich.links().count(), 0);
        assert!(linkify("", &entries[0], &entries, &index).is_empty());
    }

    #[test]
    fn custom_link_targets() {
        let (entries, index) = fixture();
        let rich = linkify("ríu", &entries[0], &entries, &index);
        let html = rich.to_html_with(|address| format!("/entry?a={address}"));
        assert_eq!(html, r#"<a class="xref" href="/entry?a=r%C3%ADu">ríu</a>"#);
    }
}
