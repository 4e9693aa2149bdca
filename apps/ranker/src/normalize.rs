//! Text folding shared by extraction, scoring and retrieval.
//!
//! Skill names and free text are compared only after folding: NFD
//! decomposition, combining marks stripped, lowercase, whitespace collapsed.
//! "Power  BI" and "power bi" fold to the same key, as do "Équipe" and "equipe".

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Folds a short term (skill, language, keyword) to its comparison key.
pub fn normalize_term(term: &str) -> String {
    let folded: String = term
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits free text into folded word tokens.
///
/// A token is a maximal run of alphanumeric characters plus `+`, `#` and `.`
/// when they sit inside or at the end of a word (so "c++", "c#" and "node.js"
/// survive). Trailing dots are trimmed.
pub fn word_tokens(text: &str) -> Vec<String> {
    let folded = normalize_term(text);
    folded
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#' || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns true if `term` appears in `tokens` as a whole word sequence.
///
/// `tokens` must come from [`word_tokens`]; `term` is tokenized the same way.
pub fn contains_term(tokens: &[String], term: &str) -> bool {
    let needle = word_tokens(term);
    if needle.is_empty() || needle.len() > tokens.len() {
        return false;
    }
    tokens.windows(needle.len()).any(|w| w == needle.as_slice())
}
