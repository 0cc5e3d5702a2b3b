use crate::index::EntryKeys;
use crate::normalize::{normalize, tokens};

const WHOLE_EXACT: i64 = 1000;
const WHOLE_PREFIX: i64 = 700;
const WHOLE_CONTAINS: i64 = 350;
const TOKEN_EXACT: i64 = 200;
const TOKEN_PREFIX: i64 = 120;
const TOKEN_CONTAINS: i64 = 60;
const TOKEN_IN_GLOSS: i64 = 35;
const TOKEN_IN_TAGS: i64 = 20;
const TOKEN_IN_NOTES: i64 = 10;
const SHORT_HEADWORD_BASE: i64 = 40;

/// Relevance of one eligible entry for a raw query.
pub(crate) fn score(keys: &EntryKeys, query: &str) -> i64 {
    let normalized = normalize(query);
    let headword = keys.headword.as_str();
    let mut total = 0;

    if !normalized.is_empty() {
        if headword == normalized {
            total += WHOLE_EXACT;
        } else if headword.starts_with(&normalized) {
            total += WHOLE_PREFIX;
        } else if headword.contains(&normalized) {
            total += WHOLE_CONTAINS;
        }
    }

    for token in tokens(&normalized) {
        if headword == token {
            total += TOKEN_EXACT;
        } else if headword.starts_with(token) {
            total += TOKEN_PREFIX;
        } else if headword.contains(token) {
            total += TOKEN_CONTAINS;
        }
        if keys.glosses.contains(token) {
            total += TOKEN_IN_GLOSS;
        }
        if keys.tag_text.contains(token) {
            total += TOKEN_IN_TAGS;
        }
        if keys.notes.contains(token) {
            total += TOKEN_IN_NOTES;
        }
    }

    let length = headword.chars().count() as i64;
    total + (SHORT_HEADWORD_BASE - length).max(0)
}

/// Orders `(position, score)` pairs: best score first, then headword.
pub(crate) fn sort_ranked(ranked: &mut [(usize, i64)], keys: &[EntryKeys]) {
    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| keys[a.0].headword.cmp(&keys[b.0].headword))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(headword: &str) -> EntryKeys {
        EntryKeys {
            headword: headword.to_string(),
            ..EntryKeys::default()
        }
    }

    #[test]
    fn headword_match_tiers() {
        assert_eq!(score(&keys("sol"), "sol"), 1000 + 200 + 37);
        assert_eq!(score(&keys("solar"), "sol"), 700 + 120 + 35);
        assert_eq!(score(&keys("parasol"), "sol"), 350 + 60 + 33);
        assert_eq!(score(&keys("luna"), "sol"), 36);
    }

    #[test]
    fn whole_query_is_normalized() {
        assert_eq!(score(&keys("sol"), "  SÓL "), 1000 + 200 + 37);
    }

    #[test]
    fn field_bonuses_are_additive() {
        let entry = EntryKeys {
            headword: "sol".into(),
            glosses: "sun".into(),
            notes: "sun worship".into(),
            tag_text: "sun sky".into(),
            ..EntryKeys::default()
        };
        assert_eq!(score(&entry, "sun"), 35 + 20 + 10 + 37);
        assert_eq!(score(&entry, "sol sun"), 200 + 35 + 20 + 10 + 37);
    }

    #[test]
    fn long_headwords_get_no_length_bonus() {
        let long = "a".repeat(60);
        assert_eq!(score(&keys(&long), "zzz"), 0);
    }

    #[test]
    fn ties_break_alphabetically() {
        let all = vec![keys("beta"), keys("alfa"), keys("gama")];
        let mut ranked = vec![(0, 10), (1, 10), (2, 50)];
        sort_ranked(&mut ranked, &all);
        assert_eq!(ranked.iter().map(|r| r.0).collect::<Vec<_>>(), vec![2, 1, 0]);
    }
}
