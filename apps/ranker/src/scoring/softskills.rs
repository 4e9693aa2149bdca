use async_trait::async_trait;

use crate::config::{EngineConfig, SoftSkillCategory};
use crate::models::profile::{CandidateProfile, TargetProfile};
use crate::models::score::{ScoreRecord, ScorerBackend, ScorerKind};
use crate::normalize::{contains_term, normalize_term, word_tokens};
use crate::scoring::{list_preview, Scorer};

pub const MISSING_LETTER: &str = "motivation letter";
pub const NO_LETTER_COMMENT: &str = "No motivation letter provided; default score applied.";

/// Motivation letter signal: length, soft-skill categories, recruiter keywords.
///
/// Trigger terms are looked up as whole word sequences in the folded letter
/// followed by the CV body, so "team" never fires on "steam".
#[derive(Debug, Clone)]
pub struct SoftSkillScorer {
    default_score: f64,
    letter_base_max: f64,
    letter_full_words: usize,
    category_bonus: f64,
    keyword_bonus_max: f64,
    /// Folded terms, category order preserved.
    categories: Vec<SoftSkillCategory>,
}

impl SoftSkillScorer {
    pub fn from_config(config: &EngineConfig) -> Self {
        let categories = config
            .softskill_categories
            .iter()
            .map(|c| SoftSkillCategory {
                name: c.name.clone(),
                terms: c
                    .terms
                    .iter()
                    .map(|t| normalize_term(t))
                    .filter(|t| !t.is_empty())
                    .collect(),
            })
            .collect();

        Self {
            default_score: config.softskill_default_score,
            letter_base_max: config.letter_base_max,
            letter_full_words: config.letter_full_words.max(1),
            category_bonus: config.category_bonus,
            keyword_bonus_max: config.keyword_bonus_max,
            categories,
        }
    }

    /// "detailed" past the full-credit length, "adequate" past half of it.
    fn letter_length_label(&self, words: usize) -> &'static str {
        match words {
            w if w > self.letter_full_words => "detailed",
            w if w * 2 > self.letter_full_words => "adequate",
            _ => "short",
        }
    }

    /// Record used when the candidate sent no letter.
    pub fn no_letter_record(&self) -> ScoreRecord {
        ScoreRecord::new(
            ScorerKind::SoftSkills,
            ScorerBackend::Rules,
            self.default_score,
            Vec::new(),
            vec![MISSING_LETTER.to_string()],
            NO_LETTER_COMMENT,
        )
    }

    pub fn evaluate(&self, candidate: &CandidateProfile, target: &TargetProfile) -> ScoreRecord {
        let Some(letter) = candidate.motivation_letter.as_deref() else {
            return self.no_letter_record();
        };

        let words = letter.split_whitespace().count();
        let length_ratio = (words as f64 / self.letter_full_words as f64).min(1.0);
        let base = self.letter_base_max * length_ratio;

        let mut tokens = word_tokens(letter);
        tokens.extend(word_tokens(&candidate.cv_text));

        let mut detected = Vec::new();
        let mut undetected = Vec::new();
        for category in &self.categories {
            if category.terms.iter().any(|t| contains_term(&tokens, t)) {
                detected.push(category.name.clone());
            } else {
                undetected.push(category.name.clone());
            }
        }
        let category_part = self.category_bonus * detected.len() as f64;

        let found_keywords: Vec<String> = target
            .keywords
            .iter()
            .filter(|k| contains_term(&tokens, k))
            .cloned()
            .collect();
        let keyword_part = if target.keywords.is_empty() {
            0.0
        } else {
            self.keyword_bonus_max * found_keywords.len() as f64 / target.keywords.len() as f64
        };

        let mut comment = format!(
            "Soft skills: letter of {words} words ({}), {} of {} categories detected",
            self.letter_length_label(words),
            detected.len(),
            self.categories.len()
        );
        if !detected.is_empty() {
            comment.push_str(&format!(" ({})", list_preview(&detected, 5)));
        }
        if !target.keywords.is_empty() {
            comment.push_str(&format!(
                "; recruiter keywords found: {}/{}",
                found_keywords.len(),
                target.keywords.len()
            ));
            if !found_keywords.is_empty() {
                comment.push_str(&format!(" ({})", list_preview(&found_keywords, 3)));
            }
        }
        comment.push('.');

        ScoreRecord::new(
            ScorerKind::SoftSkills,
            ScorerBackend::Rules,
            base + category_part + keyword_part,
            detected,
            undetected,
            comment,
        )
    }
}


#[async_trait]
impl Scorer for SoftSkillScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::SoftSkills
    }

    fn backend(&self) -> ScorerBackend {
        ScorerBackend::Rules
    }

    async fn score(&self, candidate: &CandidateProfile, target: &TargetProfile) -> ScoreRecord {
        self.evaluate(candidate, target)
    }
}
