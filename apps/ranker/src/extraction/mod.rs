//! Rule-based Profile Extractor.
//!
//! Turns free-text postings and CVs into validated `TargetProfile` and
//! `CandidateProfile` records. Text is folded with `normalize` first, so every
//! pattern below is written lowercase and without diacritics. English and
//! French wording are both recognized.

use crate::normalize::{contains_term, normalize_term};

pub mod candidate;
pub mod posting;

pub use candidate::extract_candidate;
pub use posting::{extract_posting, PostingOverrides};

/// Technical terms recognized as skills and recruiter keywords.
pub const TECH_VOCABULARY: &[&str] = &[
    "python", "r", "sql", "power bi", "tableau", "excel", "pandas", "spark", "dbt", "airflow",
    "machine learning", "deep learning", "nlp", "rag", "llm", "pytorch", "tensorflow", "azure",
    "aws", "gcp", "docker", "kubernetes", "terraform", "javascript", "typescript", "react",
    "vue", "node.js", "java", "c#", "c++", ".net", "go", "rust", "sap", "erp", "supply chain",
    "git", "linux", "scala", "kafka", "postgresql", "mongodb",
];

/// (folded trigger, canonical language name)
const LANGUAGE_TERMS: &[(&str, &str)] = &[
    ("english", "english"),
    ("anglais", "english"),
    ("french", "french"),
    ("francais", "french"),
    ("spanish", "spanish"),
    ("espagnol", "spanish"),
    ("german", "german"),
    ("allemand", "german"),
];

/// Vocabulary terms present in `tokens`, vocabulary order.
pub(crate) fn find_vocabulary(tokens: &[String]) -> Vec<String> {
    TECH_VOCABULARY
        .iter()
        .filter(|term| contains_term(tokens, term))
        .map(|term| term.to_string())
        .collect()
}

/// Canonical language names mentioned in `tokens`, deduplicated.
pub(crate) fn find_languages(tokens: &[String]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for (trigger, language) in LANGUAGE_TERMS {
        if contains_term(tokens, trigger) && !found.iter().any(|l| l == language) {
            found.push(language.to_string());
        }
    }
    found
}

/// Splits a section body into list items on newlines, commas, semicolons,
/// bullets and dash bullets. Items shorter than two characters are dropped.
pub(crate) fn split_items(body: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for line in body.lines() {
        let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
        for piece in line.split([',', ';', '•', '|']) {
            let item = piece.trim().trim_end_matches('.').trim();
            if item.chars().count() < 2 || items.iter().any(|i| i == item) {
                continue;
            }
            items.push(item.to_string());
        }
    }
    items
}

/// A heading found at the start of a line, and whatever follows it on that line.
pub(crate) struct Heading<'a, S> {
    pub section: S,
    pub rest: &'a str,
}

/// Matches `line` against `(folded prefix, section)` pairs. A heading line is
/// short, or ends its prefix with a colon ("Requirements: Python, SQL").
pub(crate) fn match_heading<'a, S: Copy>(
    line: &'a str,
    headings: &[(&str, S)],
) -> Option<Heading<'a, S>> {
    let trimmed = line.trim().trim_start_matches(['-', '*', '•', '#']).trim();
    let folded = normalize_term(trimmed);
    for (prefix, section) in headings {
        if !folded.starts_with(prefix) {
            continue;
        }
        // Prefix must end on a word boundary.
        let after = &folded[prefix.len()..];
        if after.chars().next().is_some_and(|c| c.is_alphanumeric()) {
            continue;
        }
        let rest = match trimmed.find(':') {
            Some(idx) => trimmed[idx + 1..].trim(),
            None if folded.chars().count() <= 40 => "",
            None => continue,
        };
        return Some(Heading {
            section: *section,
            rest,
        });
    }
    None
}
