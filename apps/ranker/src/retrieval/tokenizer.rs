//! Weighted feature tokens for the hashing embedder.
//!
//! Postings and candidates share one token vocabulary so their vectors live in
//! the same space:
//! - `skill:<name>`   (required skills weigh more than optional ones)
//! - `lang:<name>`
//! - `exp:<bucket>`   (years of experience bucket)
//! - `title:<word>`   (job title words, matched against CV words)
//! - `word:<word>`    (free text words, capped)

use crate::models::profile::{CandidateProfile, TargetProfile};
use crate::normalize::word_tokens;

/// Free-text words contributed per document. Keeps long CVs from drowning skills.
const MAX_TEXT_WORDS: usize = 64;
const MIN_WORD_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedToken {
    pub token: String,
    pub weight: f32,
}

impl WeightedToken {
    pub fn new(token: impl Into<String>, weight: f32) -> Self {
        Self {
            token: token.into(),
            weight,
        }
    }
}

pub fn exp_years_bucket(years: f64) -> &'static str {
    match years {
        y if y < 1.0 => "0-1",
        y if y < 3.0 => "1-3",
        y if y < 5.0 => "3-5",
        y if y < 10.0 => "5-10",
        _ => "10+",
    }
}

pub fn tokenize_target(target: &TargetProfile) -> Vec<WeightedToken> {
    let mut tokens = Vec::new();

    for skill in target.required_skills.iter() {
        tokens.push(WeightedToken::new(format!("skill:{skill}"), 2.0));
    }
    for skill in target.optional_skills.iter() {
        tokens.push(WeightedToken::new(format!("skill:{skill}"), 1.0));
    }
    for lang in target.required_languages.iter() {
        tokens.push(WeightedToken::new(format!("lang:{lang}"), 1.0));
    }

    // Midpoint of the wanted range; an open range uses its lower bound.
    let years = match target.experience.max {
        Some(max) => (f64::from(target.experience.min) + f64::from(max)) / 2.0,
        None => f64::from(target.experience.min),
    };
    tokens.push(WeightedToken::new(
        format!("exp:{}", exp_years_bucket(years)),
        1.0,
    ));

    for word in title_words(&target.job_title) {
        tokens.push(WeightedToken::new(format!("title:{word}"), 1.0));
    }
    for word in target.keywords.iter().flat_map(|k| word_tokens(k)) {
        tokens.push(WeightedToken::new(format!("word:{word}"), 0.5));
    }

    tokens
}

pub fn tokenize_candidate(candidate: &CandidateProfile) -> Vec<WeightedToken> {
    let mut tokens = Vec::new();

    for skill in candidate.skills.iter() {
        tokens.push(WeightedToken::new(format!("skill:{skill}"), 1.5));
    }
    for lang in candidate.languages.iter() {
        tokens.push(WeightedToken::new(format!("lang:{lang}"), 1.0));
    }
    if let Some(years) = candidate.years_experience {
        tokens.push(WeightedToken::new(
            format!("exp:{}", exp_years_bucket(years)),
            1.0,
        ));
    }

    let words = text_words(&candidate.cv_text);
    // CV words that look like title words let "data analyst" postings find analysts.
    for word in &words {
        tokens.push(WeightedToken::new(format!("title:{word}"), 0.25));
    }
    for word in words {
        tokens.push(WeightedToken::new(format!("word:{word}"), 0.5));
    }

    tokens
}

fn title_words(title: &str) -> Vec<String> {
    word_tokens(title)
        .into_iter()
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .collect()
}

/// Distinct words of at least three characters, first occurrence order, capped.
fn text_words(text: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in word_tokens(text) {
        if words.len() >= MAX_TEXT_WORDS {
            break;
        }
        if word.chars().count() >= MIN_WORD_LEN && !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{CandidateProfileDraft, TargetProfileDraft};

    #[test]
    fn test_exp_bucket_boundaries() {
        assert_eq!(exp_years_bucket(0.0), "0-1");
        assert_eq!(exp_years_bucket(3.0), "3-5");
        assert_eq!(exp_years_bucket(12.0), "10+");
    }

    #[test]
    fn test_required_skills_weigh_more() {
        let target = TargetProfile::try_from(TargetProfileDraft {
            required_skills: vec!["Rust".into()],
            optional_skills: vec!["Go".into()],
            ..Default::default()
        })
        .unwrap();
        let tokens = tokenize_target(&target);
        let rust = tokens.iter().find(|t| t.token == "skill:rust").unwrap();
        let go = tokens.iter().find(|t| t.token == "skill:go").unwrap();
        assert!(rust.weight > go.weight);
    }

    #[test]
    fn test_huge_experience_range_lands_in_top_bucket() {
        let target = TargetProfile::try_from(TargetProfileDraft {
            experience_min: u32::MAX - 1,
            experience_max: Some(u32::MAX),
            ..Default::default()
        })
        .unwrap();
        let tokens = tokenize_target(&target);
        assert!(tokens.iter().any(|t| t.token == "exp:10+"));
    }

    #[test]
    fn test_candidate_without_experience_has_no_exp_token() {
        let candidate = CandidateProfile::try_from(CandidateProfileDraft {
            candidate_id: "c1".into(),
            skills: vec!["SQL".into()],
            ..Default::default()
        })
        .unwrap();
        let tokens = tokenize_candidate(&candidate);
        assert!(tokens.iter().all(|t| !t.token.starts_with("exp:")));
        assert!(tokens.iter().any(|t| t.token == "skill:sql"));
    }

    #[test]
    fn test_text_words_capped_and_distinct() {
        let text = (0..200).map(|i| format!("word{i} word{i}")).collect::<Vec<_>>().join(" ");
        let words = text_words(&text);
        assert_eq!(words.len(), MAX_TEXT_WORDS);
        assert_eq!(words[0], "word0");
        assert_eq!(words[1], "word1");
    }
}
