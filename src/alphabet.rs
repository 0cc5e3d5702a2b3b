use std::collections::BTreeSet;

use unicode_normalization::UnicodeNormalization;

use crate::data::Entry;
use crate::normalize::normalize;

/// Browse buckets, in display order. `ç` is a letter of its own.
pub const ALPHABET: [char; 24] = [
    'a', 'b', 'c', 'ç', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'x', 'z',
];

const CEDILLA_LETTER: char = 'ç';

pub fn contains(letter: char) -> bool {
    ALPHABET.contains(&letter)
}

/// Position of a letter in [`ALPHABET`], used for ordering buckets.
pub fn position(letter: char) -> Option<usize> {
    ALPHABET.iter().position(|&ch| ch == letter)
}

/// Parses user input such as `"Ç"` or `" b "` into an alphabet letter.
pub fn parse_letter(input: &str) -> Option<char> {
    let mut chars = input.trim().nfc().flat_map(char::to_lowercase);
    let letter = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    contains(letter).then_some(letter)
}

/// Folded first letter of a headword; `ç` survives folding.
///
/// Returns the key even for letters outside the alphabet; see [`bucket_of`].
pub fn first_letter_key(headword: &str) -> Option<char> {
    let first = headword.trim_start().nfc().next()?;
    let lowered = first.to_lowercase().next()?;
    if lowered == CEDILLA_LETTER {
        return Some(lowered);
    }
    normalize(&lowered.to_string()).chars().next()
}

/// Alphabet bucket for a headword, or `None` when its first letter has no slot.
pub fn bucket_of(headword: &str) -> Option<char> {
    first_letter_key(headword).filter(|&key| contains(key))
}

/// Alphabet letters with at least one entry.
pub fn present_letters(entries: &[Entry]) -> BTreeSet<char> {
    entries
        .iter()
        .filter_map(|entry| bucket_of(&entry.headword))
        .collect()
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

    #[test]
    fn alphabet_has_twenty_four_distinct_letters() {
        let unique: BTreeSet<char> = ALPHABET.iter().copied().collect();
        assert_eq!(unique.len(), 24);
        for excluded in ['k', 'w', 'y'] {
            assert!(!contains(excluded));
        }
    }

    #[test]
    fn cedilla_letter_keeps_its_own_bucket() {
        assert_eq!(first_letter_key("çò"), Some('ç'));
        assert_eq!(first_letter_key("Çai"), Some('ç'));
        assert_eq!(first_letter_key("c\u{0327}a"), Some('ç'));
        assert_eq!(first_letter_key("casa"), Some('c'));
    }

    #[test]
    fn other_diacritics_fold_to_base_letter() {
        assert_eq!(first_letter_key("Éster"), Some('e'));
        assert_eq!(first_letter_key("òme"), Some('o'));
        assert_eq!(first_letter_key("   "), None);
        assert_eq!(first_letter_key(""), None);
    }

    #[test]
    fn letters_outside_alphabet_have_no_bucket() {
        assert_eq!(first_letter_key("kilo"), Some('k'));
        assert_eq!(bucket_of("kilo"), None);
        assert_eq!(bucket_of("9lives"), None);
    }

    #[test]
    fn present_letters_only_reports_populated_slots() {
        let entries = vec![entry("aiga"), entry("çò"), entry("casa"), entry("kilo"), entry("")];
        let letters = present_letters(&entries);
        assert_eq!(letters.into_iter().collect::<Vec<_>>(), vec!['a', 'c', 'ç']);
    }

    #[test]
    fn parse_letter_accepts_case_and_composition_variants() {
        assert_eq!(parse_letter("Ç"), Some('ç'));
        assert_eq!(parse_letter("c\u{0327}"), Some('ç'));
        assert_eq!(parse_letter(" B "), Some('b'));
        assert_eq!(parse_letter("k"), None);
        assert_eq!(parse_letter("ab"), None);
        assert_eq!(parse_letter(""), None);
    }
}
