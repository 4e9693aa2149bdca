use once_cell::sync::Lazy;
use regex::Regex;

use crate::extraction::{find_languages, find_vocabulary, match_heading, split_items};
use crate::models::profile::{
    CandidateProfile, CandidateProfileDraft, Contact, EducationEntry, ProfileError,
};
use crate::normalize::{contains_term, normalize_term, word_tokens};

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static RE_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d .-]{7,}\d").unwrap());
// "5 years of experience", "3 ans d'expérience", "4+ years experience"
static RE_YEARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s*\+?\s*(?:ans?|years?)\s*(?:of\s*)?(?:d'\s*|d\s+)?(?:experience|exp)\b")
        .unwrap()
});
// "Expérience : 6"
static RE_YEARS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"experience\s*:\s*(\d{1,2})\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Skills,
    Experience,
    Education,
    Languages,
    Other,
}

const HEADINGS: &[(&str, Section)] = &[
    ("technical skills", Section::Skills),
    ("competences techniques", Section::Skills),
    ("skills", Section::Skills),
    ("competences", Section::Skills),
    ("work experience", Section::Experience),
    ("experience professionnelle", Section::Experience),
    ("experiences", Section::Experience),
    ("experience", Section::Experience),
    ("education", Section::Education),
    ("formation", Section::Education),
    ("studies", Section::Education),
    ("languages", Section::Languages),
    ("langues", Section::Languages),
    ("interests", Section::Other),
    ("centres d'interet", Section::Other),
    ("hobbies", Section::Other),
];

/// (folded marker, degree family), highest degree first.
const DEGREES: &[(&str, &str)] = &[
    ("phd", "phd"),
    ("ph.d", "phd"),
    ("doctorat", "phd"),
    ("master", "master"),
    ("msc", "master"),
    ("mba", "master"),
    ("m2", "master"),
    ("ingenieur", "master"),
    ("licence", "bachelor"),
    ("bachelor", "bachelor"),
    ("bsc", "bachelor"),
    ("bts", "associate"),
    ("dut", "associate"),
    ("baccalaureat", "high_school"),
    ("bac", "high_school"),
    ("high school", "high_school"),
];

#[derive(Default)]
struct Sections {
    skills: String,
    education: String,
    languages: String,
}

/// Extracts a `CandidateProfile` from CV text and an optional letter.
pub fn extract_candidate(
    candidate_id: &str,
    cv_text: &str,
    motivation_letter: Option<String>,
) -> Result<CandidateProfile, ProfileError> {
    let sections = split_sections(cv_text);
    let tokens = word_tokens(cv_text);

    let mut skills = split_items(&sections.skills);
    for term in find_vocabulary(&tokens) {
        if !skills.iter().any(|s| normalize_term(s) == term) {
            skills.push(term);
        }
    }

    let languages = if sections.languages.trim().is_empty() {
        find_languages(&tokens)
    } else {
        find_languages(&word_tokens(&sections.languages))
    };

    CandidateProfile::try_from(CandidateProfileDraft {
        candidate_id: candidate_id.to_string(),
        name: detect_name(cv_text),
        contact: Contact {
            email: RE_EMAIL.find(cv_text).map(|m| m.as_str().to_string()),
            phone: RE_PHONE.find(cv_text).map(|m| m.as_str().trim().to_string()),
        },
        years_experience: detect_years(cv_text),
        skills,
        languages,
        education: education_entries(&sections.education),
        cv_text: cv_text.to_string(),
        motivation_letter,
    })
}

fn split_sections(text: &str) -> Sections {
    let mut sections = Sections::default();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        let content = match match_heading(line, HEADINGS) {
            Some(heading) => {
                current = Some(heading.section);
                heading.rest
            }
            None => line,
        };
        let target = match current {
            Some(Section::Skills) => &mut sections.skills,
            Some(Section::Education) => &mut sections.education,
            Some(Section::Languages) => &mut sections.languages,
            _ => continue,
        };
        if !content.trim().is_empty() {
            target.push_str(content);
            target.push('\n');
        }
    }
    sections
}

/// Explicit "N years of experience" wording only; bare numbers are ignored.
fn detect_years(text: &str) -> Option<f64> {
    let folded = normalize_term(text).replace('’', "'");
    RE_YEARS
        .captures(&folded)
        .or_else(|| RE_YEARS_LABEL.captures(&folded))
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(f64::from)
}

fn education_entries(body: &str) -> Vec<EducationEntry> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            let tokens = word_tokens(line);
            let degree = DEGREES
                .iter()
                .find(|(marker, _)| contains_term(&tokens, marker))
                .map(|(_, family)| family.to_string());
            EducationEntry {
                degree,
                description: line.to_string(),
            }
        })
        .collect()
}

/// First line that reads like a personal name: two to four capitalized
/// alphabetic words, no digits, no e-mail.
fn detect_name(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(5)
        .find(|line| {
            let words: Vec<&str> = line.split_whitespace().collect();
            (2..=4).contains(&words.len())
                && !line.contains('@')
                && words.iter().all(|w| {
                    w.chars().next().is_some_and(char::is_uppercase)
                        && w.chars().all(|c| c.is_alphabetic() || c == '-' || c == '\'')
                })
        })
        .map(str::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CV: &str = "\
Marie Dupont
marie.dupont@example.com | +33 6 12 34 56 78
Data analyst avec 3 ans d'expérience en BI.

Compétences
- Python, SQL; Power BI
- Excel

Formation
Master Data Science - Université de Lyon
Baccalauréat S

Langues : Anglais (C1), Espagnol
";

    #[test]
    fn test_extracts_contact_and_name() {
        let profile = extract_candidate("cv-1", CV, None).unwrap();
        assert_eq!(profile.name, "Marie Dupont");
        assert_eq!(profile.contact.email.as_deref(), Some("marie.dupont@example.com"));
        assert_eq!(profile.contact.phone.as_deref(), Some("+33 6 12 34 56 78"));
        assert_eq!(profile.years_experience, Some(3.0));
    }

    #[test]
    fn test_extracts_skills_and_languages() {
        let profile = extract_candidate("cv-1", CV, None).unwrap();
        for skill in ["python", "sql", "power bi", "excel"] {
            assert!(profile.skills.contains(skill), "missing {skill}");
        }
        assert!(profile.languages.contains("english"));
        assert!(profile.languages.contains("spanish"));
        assert!(!profile.languages.contains("french"));
    }

    #[test]
    fn test_extracts_education() {
        let profile = extract_candidate("cv-1", CV, None).unwrap();
        assert_eq!(profile.education.len(), 2);
        assert_eq!(profile.education[0].degree.as_deref(), Some("master"));
        assert_eq!(profile.education[1].degree.as_deref(), Some("high_school"));
    }

    #[test]
    fn test_letter_is_kept_and_blank_dropped() {
        let profile = extract_candidate("cv-1", CV, Some("Motivé !".to_string())).unwrap();
        assert_eq!(profile.motivation_letter.as_deref(), Some("Motivé !"));
        let profile = extract_candidate("cv-1", CV, Some("  ".to_string())).unwrap();
        assert!(profile.motivation_letter.is_none());
    }

    #[test]
    fn test_missing_experience_is_none() {
        let profile = extract_candidate("cv-2", "John Smith\nBorn 1990, 25 rue de Paris", None).unwrap();
        assert_eq!(profile.years_experience, None);
        assert_eq!(profile.name, "John Smith");
    }

    #[test]
    fn test_years_wordings() {
        assert_eq!(detect_years("5 years of experience in Rust"), Some(5.0));
        assert_eq!(detect_years("4+ years experience"), Some(4.0));
        assert_eq!(detect_years("Expérience : 6"), Some(6.0));
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(extract_candidate(" ", CV, None).is_err());
    }
}
