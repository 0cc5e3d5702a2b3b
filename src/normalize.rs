use unicode_normalization::UnicodeNormalization;

/// Combining Diacritical Marks block.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036f}';

/// Canonical comparison form shared by headwords, tags and query tokens.
///
/// Lowercases, decomposes (NFD), drops combining diacritical marks and trims.
/// Lowercasing happens before decomposition so mappings such as `İ → i̇`
/// lose their mark too, which keeps the function idempotent.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|ch| !COMBINING_MARKS.contains(ch))
        .collect();
    folded.trim().to_string()
}

/// Same as [`normalize`], treating an absent value as empty.
pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize).unwrap_or_default()
}

/// Splits an already-normalized string into whitespace-separated tokens.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
