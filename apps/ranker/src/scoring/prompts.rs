// Prompts for the LLM soft-skill scorer.

use crate::llm_client::prompts::{EVIDENCE_INSTRUCTION, JSON_ONLY_SYSTEM};

pub fn softskill_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM} You are an experienced recruiter assessing soft skills and \
         motivation from a candidate's motivation letter. {EVIDENCE_INSTRUCTION}"
    )
}

pub const SOFTSKILL_PROMPT_TEMPLATE: &str = r#"Assess the candidate's soft skills for the position "{job_title}".

Soft-skill categories to look for: {categories}
Recruiter keywords: {keywords}

Motivation letter:
"""
{letter}
"""

Return a JSON object with exactly these fields:
{
  "score": <number between 0 and 100>,
  "detected": [<category names from the list above that the letter demonstrates>],
  "comment": "<one or two sentences justifying the score>"
}"#;

/// Fills the soft-skill template. Values are inserted verbatim.
pub fn build_softskill_prompt(
    job_title: &str,
    categories: &[String],
    keywords: &[String],
    letter: &str,
) -> String {
    let or_none = |items: &[String]| {
        if items.is_empty() {
            "(none)".to_string()
        } else {
            items.join(", ")
        }
    };
    SOFTSKILL_PROMPT_TEMPLATE
        .replace("{job_title}", job_title)
        .replace("{categories}", &or_none(categories))
        .replace("{keywords}", &or_none(keywords))
        .replace("{letter}", letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_fills_every_placeholder() {
        let prompt = build_softskill_prompt(
            "Data Analyst",
            &["teamwork".to_string(), "autonomy".to_string()],
            &[],
            "I love teamwork.",
        );
        assert!(prompt.contains("\"Data Analyst\""));
        assert!(prompt.contains("teamwork, autonomy"));
        assert!(prompt.contains("Recruiter keywords: (none)"));
        assert!(prompt.contains("I love teamwork."));
        assert!(!prompt.contains("{letter}"));
    }

    #[test]
    fn test_system_prompt_requires_json() {
        assert!(softskill_system().contains("valid JSON only"));
    }
}
