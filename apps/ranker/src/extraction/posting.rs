use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::extraction::{find_languages, find_vocabulary, match_heading, split_items};
use crate::models::profile::{
    ContractType, ProfileError, Seniority, TargetProfile, TargetProfileDraft,
};
use crate::normalize::{contains_term, normalize_term, word_tokens};

const MAX_TITLE_CHARS: usize = 200;

// "3-5 years", "2 à 4 ans"
static RE_EXP_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s*(?:-|a|to)\s*(\d{1,2})\s*(?:ans?|years?)\b").unwrap()
});
// "5+ years", "3 ans d'expérience"
static RE_EXP_MIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s*\+?\s*(?:ans?|years?)\b").unwrap());
// "45k", "45 k€", "55ke"
static RE_SALARY_K: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2,3})\s*k(?:€|e|eur)?\b").unwrap());
static RE_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(paris|lyon|lille|nantes|bordeaux|marseille|toulouse|remote|teletravail|ile-de-france|idf|levallois-perret|levallois)\b",
    )
    .unwrap()
});

const JOB_TITLES: &[&str] = &[
    "data scientist", "data analyst", "data engineer", "analytics engineer",
    "machine learning engineer", "ml engineer", "ai engineer", "mlops engineer",
    "business analyst", "product manager", "product owner", "product designer",
    "ux designer", "ui designer", "software engineer", "backend engineer",
    "frontend engineer", "fullstack engineer", "mobile developer", "devops engineer",
    "site reliability engineer", "cloud engineer", "platform engineer",
    "security engineer", "network engineer", "supply chain manager",
    "supply chain analyst", "logistics manager", "operations manager",
    "financial analyst", "risk analyst", "data steward", "project manager",
    "scrum master", "qa engineer", "test engineer",
];

const ROLE_WORDS: &[&str] = &[
    "engineer", "developer", "developpeur", "manager", "analyst", "analyste", "designer",
    "scientist", "architect", "owner", "stagiaire", "consultant",
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Required,
    Optional,
    Other,
}

// Optional headings first: "compétences appréciées" must not read as required.
const HEADINGS: &[(&str, Section)] = &[
    ("nice to have", Section::Optional),
    ("nice-to-have", Section::Optional),
    ("optional", Section::Optional),
    ("bonus", Section::Optional),
    ("preferred", Section::Optional),
    ("competences appreciees", Section::Optional),
    ("souhaite", Section::Optional),
    ("apprecie", Section::Optional),
    ("un plus", Section::Optional),
    ("required skills", Section::Required),
    ("requirements", Section::Required),
    ("must have", Section::Required),
    ("technical skills", Section::Required),
    ("hard skills", Section::Required),
    ("skills", Section::Required),
    ("competences requises", Section::Required),
    ("competences techniques", Section::Required),
    ("competences", Section::Required),
    ("prerequis", Section::Required),
    ("requis", Section::Required),
    ("responsibilities", Section::Other),
    ("missions", Section::Other),
    ("vos missions", Section::Other),
    ("responsabilites", Section::Other),
    ("soft skills", Section::Other),
    ("qualites", Section::Other),
    ("savoir-etre", Section::Other),
    ("benefits", Section::Other),
    ("avantages", Section::Other),
    ("about us", Section::Other),
    ("a propos", Section::Other),
];

/// Recruiter-supplied values. Each one present replaces what the extractor found.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostingOverrides {
    pub job_title: Option<String>,
    pub seniority: Option<Seniority>,
    pub experience_min: Option<u32>,
    pub experience_max: Option<u32>,
    pub required_skills: Option<Vec<String>>,
    pub optional_skills: Option<Vec<String>>,
    pub skill_importance: Option<BTreeMap<String, f64>>,
    pub required_languages: Option<Vec<String>>,
    pub location: Option<String>,
    pub contract_type: Option<ContractType>,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub keywords: Option<Vec<String>>,
}

/// Extracts a `TargetProfile` from posting text, then applies `overrides`.
pub fn extract_posting(
    text: &str,
    overrides: PostingOverrides,
) -> Result<TargetProfile, ProfileError> {
    let mut draft = extract_draft(text);

    if let Some(v) = overrides.job_title {
        draft.job_title = v;
    }
    if let Some(v) = overrides.seniority {
        draft.seniority = v;
    }
    if let Some(v) = overrides.experience_min {
        draft.experience_min = v;
    }
    if overrides.experience_max.is_some() {
        draft.experience_max = overrides.experience_max;
    }
    if let Some(v) = overrides.required_skills {
        draft.required_skills = v;
    }
    if let Some(v) = overrides.optional_skills {
        draft.optional_skills = v;
    }
    if let Some(v) = overrides.skill_importance {
        draft.skill_importance = v;
    }
    if let Some(v) = overrides.required_languages {
        draft.required_languages = v;
    }
    if overrides.location.is_some() {
        draft.location = overrides.location;
    }
    if let Some(v) = overrides.contract_type {
        draft.contract_type = v;
    }
    if overrides.salary_min.is_some() {
        draft.salary_min = overrides.salary_min;
    }
    if overrides.salary_max.is_some() {
        draft.salary_max = overrides.salary_max;
    }
    if let Some(v) = overrides.keywords {
        draft.keywords = v;
    }

    TargetProfile::try_from(draft)
}

fn extract_draft(text: &str) -> TargetProfileDraft {
    let folded = normalize_term(text);
    let tokens = word_tokens(text);

    let (experience_min, experience_max) = detect_experience(&folded);
    let (salary_min, salary_max) = detect_salary(&folded);
    let keywords = find_vocabulary(&tokens);
    let (mut required_skills, optional_skills) = skill_sections(text);
    if required_skills.is_empty() {
        required_skills = keywords.clone();
    }

    TargetProfileDraft {
        job_title: detect_title(text, &folded),
        seniority: detect_seniority(&tokens),
        experience_min,
        experience_max,
        required_skills,
        optional_skills,
        skill_importance: BTreeMap::new(),
        required_languages: find_languages(&tokens),
        location: RE_LOCATION
            .captures(&folded)
            .map(|c| c[1].to_string()),
        contract_type: detect_contract(&tokens),
        salary_min,
        salary_max,
        keywords,
    }
}

fn detect_title(text: &str, folded: &str) -> String {
    if let Some(title) = JOB_TITLES.iter().find(|t| folded.contains(*t)) {
        return title.to_string();
    }
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let title = lines
        .iter()
        .find(|l| {
            let tokens = word_tokens(l);
            ROLE_WORDS.iter().any(|w| contains_term(&tokens, w))
        })
        .or_else(|| lines.first())
        .copied()
        .unwrap_or_default();
    title.chars().take(MAX_TITLE_CHARS).collect()
}

fn detect_seniority(tokens: &[String]) -> Seniority {
    let any = |terms: &[&str]| terms.iter().any(|t| contains_term(tokens, t));
    if any(&["junior", "debutant", "entry level"]) {
        Seniority::Junior
    } else if any(&["senior", "experimente", "lead", "confirme"]) {
        Seniority::Senior
    } else if any(&["intern", "internship", "stage", "stagiaire", "alternance", "apprentissage"]) {
        Seniority::Intern
    } else {
        Seniority::Intermediate
    }
}

fn detect_contract(tokens: &[String]) -> ContractType {
    let any = |terms: &[&str]| terms.iter().any(|t| contains_term(tokens, t));
    if any(&["cdi", "permanent"]) {
        ContractType::Permanent
    } else if any(&["cdd", "fixed term", "fixed-term"]) {
        ContractType::FixedTerm
    } else if any(&["alternance", "apprentissage", "apprenticeship"]) {
        ContractType::Apprenticeship
    } else if any(&["stage", "internship", "intern"]) {
        ContractType::Internship
    } else if any(&["freelance", "independant", "contractor"]) {
        ContractType::Freelance
    } else {
        ContractType::Unspecified
    }
}

/// An explicit range wins; otherwise the smallest "N years" becomes the minimum.
fn detect_experience(folded: &str) -> (u32, Option<u32>) {
    if let Some(c) = RE_EXP_RANGE.captures(folded) {
        if let (Ok(a), Ok(b)) = (c[1].parse::<u32>(), c[2].parse::<u32>()) {
            return (a.min(b), Some(a.max(b)));
        }
    }
    let min = RE_EXP_MIN
        .captures_iter(folded)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .min()
        .unwrap_or(0);
    (min, None)
}

fn detect_salary(folded: &str) -> (Option<u32>, Option<u32>) {
    let amounts: Vec<u32> = RE_SALARY_K
        .captures_iter(folded)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .map(|k| k * 1000)
        .collect();
    (amounts.iter().min().copied(), amounts.iter().max().copied())
}

/// Items listed under required and optional headings.
fn skill_sections(text: &str) -> (Vec<String>, Vec<String>) {
    let mut required = String::new();
    let mut optional = String::new();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        if let Some(heading) = match_heading(line, HEADINGS) {
            current = Some(heading.section);
            push_line(&mut required, &mut optional, current, heading.rest);
            continue;
        }
        push_line(&mut required, &mut optional, current, line);
    }

    (split_items(&required), split_items(&optional))
}

fn push_line(required: &mut String, optional: &mut String, section: Option<Section>, line: &str) {
    let target = match section {
        Some(Section::Required) => required,
        Some(Section::Optional) => optional,
        _ => return,
    };
    if !line.trim().is_empty() {
        target.push_str(line);
        target.push('\n');
    }
}
