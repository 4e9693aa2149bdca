//! Structured, validated job and candidate records.
//!
//! Both records are built once at the boundary (through their `*Draft` types,
//! which is also what JSON deserialization goes through) and are read-only
//! afterwards. Scorers never see raw dictionaries or unnormalized skill names.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::normalize_term;

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("candidate_id must not be empty")]
    EmptyCandidateId,

    #[error("years_experience must be a finite non-negative number, got {0}")]
    InvalidExperience(f64),

    #[error("experience range is inverted: min {min} > max {max}")]
    InvertedExperienceRange { min: u32, max: u32 },

    #[error("salary range is inverted: min {min} > max {max}")]
    InvertedSalaryRange { min: u32, max: u32 },

    #[error("importance weight for skill '{skill}' must be finite and > 0, got {weight}")]
    InvalidImportance { skill: String, weight: f64 },
}

// ────────────────────────────────────────────────────────────────────────────
// Shared value types
// ────────────────────────────────────────────────────────────────────────────

/// Set of folded skill (or language) names. Iterates in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn contains(&self, skill: &str) -> bool {
        self.0.contains(skill)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        SkillSet(
            iter.into_iter()
                .map(|s| normalize_term(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl From<Vec<String>> for SkillSet {
    fn from(v: Vec<String>) -> Self {
        v.into_iter().collect()
    }
}

impl From<SkillSet> for Vec<String> {
    fn from(s: SkillSet) -> Self {
        s.0.into_iter().collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    Intern,
    Junior,
    #[default]
    Intermediate,
    Senior,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Permanent,
    FixedTerm,
    Internship,
    Apprenticeship,
    Freelance,
    #[default]
    Unspecified,
}

/// Years of experience wanted. `max = None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceRange {
    pub min: u32,
    pub max: Option<u32>,
}

impl ExperienceRange {
    pub fn new(min: u32, max: Option<u32>) -> Result<Self, ProfileError> {
        if let Some(max) = max {
            if min > max {
                return Err(ProfileError::InvertedExperienceRange { min, max });
            }
        }
        Ok(Self { min, max })
    }

    /// Distance in years from `years` to the nearest edge of the range (0 inside).
    pub fn deviation(&self, years: f64) -> f64 {
        let min = f64::from(self.min);
        if years < min {
            return min - years;
        }
        match self.max {
            Some(max) if years > f64::from(max) => years - f64::from(max),
            _ => 0.0,
        }
    }
}

/// Yearly gross salary bounds, in currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl SalaryRange {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Result<Self, ProfileError> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ProfileError::InvertedSalaryRange { min, max });
            }
        }
        Ok(Self { min, max })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TargetProfile
// ────────────────────────────────────────────────────────────────────────────

/// Unvalidated posting fields, as produced by the extractor or sent by a client.
/// Also the wire shape `TargetProfile` serializes to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetProfileDraft {
    pub job_title: String,
    pub seniority: Seniority,
    pub experience_min: u32,
    pub experience_max: Option<u32>,
    pub required_skills: Vec<String>,
    pub optional_skills: Vec<String>,
    pub skill_importance: BTreeMap<String, f64>,
    pub required_languages: Vec<String>,
    pub location: Option<String>,
    pub contract_type: ContractType,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub keywords: Vec<String>,
}

/// The structured job posting every candidate is evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TargetProfileDraft", into = "TargetProfileDraft")]
pub struct TargetProfile {
    pub job_title: String,
    pub seniority: Seniority,
    pub experience: ExperienceRange,
    pub required_skills: SkillSet,
    pub optional_skills: SkillSet,
    /// Posting-level importance weights, keyed by folded skill name.
    pub skill_importance: BTreeMap<String, f64>,
    pub required_languages: SkillSet,
    pub location: Option<String>,
    pub contract_type: ContractType,
    pub salary: SalaryRange,
    /// Folded recruiter keywords, first occurrence order.
    pub keywords: Vec<String>,
}

impl TryFrom<TargetProfileDraft> for TargetProfile {
    type Error = ProfileError;

    fn try_from(draft: TargetProfileDraft) -> Result<Self, Self::Error> {
        let experience = ExperienceRange::new(draft.experience_min, draft.experience_max)?;
        let salary = SalaryRange::new(draft.salary_min, draft.salary_max)?;

        let mut skill_importance = BTreeMap::new();
        for (skill, weight) in draft.skill_importance {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(ProfileError::InvalidImportance { skill, weight });
            }
            let key = normalize_term(&skill);
            if !key.is_empty() {
                skill_importance.insert(key, weight);
            }
        }

        let required_skills: SkillSet = draft.required_skills.into();
        // A skill listed as both required and optional counts as required only.
        let optional_skills: SkillSet = draft
            .optional_skills
            .iter()
            .map(|s| normalize_term(s))
            .filter(|s| !required_skills.contains(s))
            .collect();

        let mut keywords: Vec<String> = Vec::new();
        for kw in draft.keywords.iter().map(|k| normalize_term(k)) {
            if !kw.is_empty() && !keywords.contains(&kw) {
                keywords.push(kw);
            }
        }

        Ok(TargetProfile {
            job_title: draft.job_title.trim().to_string(),
            seniority: draft.seniority,
            experience,
            required_skills,
            optional_skills,
            skill_importance,
            required_languages: draft.required_languages.into(),
            location: draft
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            contract_type: draft.contract_type,
            salary,
            keywords,
        })
    }
}

impl From<TargetProfile> for TargetProfileDraft {
    fn from(t: TargetProfile) -> Self {
        TargetProfileDraft {
            job_title: t.job_title,
            seniority: t.seniority,
            experience_min: t.experience.min,
            experience_max: t.experience.max,
            required_skills: t.required_skills.into(),
            optional_skills: t.optional_skills.into(),
            skill_importance: t.skill_importance,
            required_languages: t.required_languages.into(),
            location: t.location,
            contract_type: t.contract_type,
            salary_min: t.salary.min,
            salary_max: t.salary.max,
            keywords: t.keywords,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CandidateProfile
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    /// Diploma family ("master", "phd", ...) when recognized.
    pub degree: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfileDraft {
    pub candidate_id: String,
    pub name: String,
    pub contact: Contact,
    pub years_experience: Option<f64>,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub education: Vec<EducationEntry>,
    pub cv_text: String,
    pub motivation_letter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CandidateProfileDraft")]
pub struct CandidateProfile {
    pub candidate_id: String,
    pub name: String,
    pub contact: Contact,
    /// `None` when the source record has no experience value.
    pub years_experience: Option<f64>,
    pub skills: SkillSet,
    pub languages: SkillSet,
    pub education: Vec<EducationEntry>,
    pub cv_text: String,
    /// Blank letters are stored as `None`.
    pub motivation_letter: Option<String>,
}

impl TryFrom<CandidateProfileDraft> for CandidateProfile {
    type Error = ProfileError;

    fn try_from(draft: CandidateProfileDraft) -> Result<Self, Self::Error> {
        let candidate_id = draft.candidate_id.trim().to_string();
        if candidate_id.is_empty() {
            return Err(ProfileError::EmptyCandidateId);
        }
        if let Some(years) = draft.years_experience {
            if !years.is_finite() || years < 0.0 {
                return Err(ProfileError::InvalidExperience(years));
            }
        }

        Ok(CandidateProfile {
            candidate_id,
            name: draft.name.trim().to_string(),
            contact: draft.contact,
            years_experience: draft.years_experience,
            skills: draft.skills.into(),
            languages: draft.languages.into(),
            education: draft.education,
            cv_text: draft.cv_text,
            motivation_letter: draft.motivation_letter.filter(|l| !l.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_target() -> TargetProfileDraft {
        TargetProfileDraft {
            job_title: "Data Analyst".to_string(),
            experience_min: 2,
            experience_max: Some(5),
            required_skills: vec!["Python".to_string(), "Power  BI".to_string()],
            optional_skills: vec!["SQL".to_string(), "python".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_target_profile_normalizes_skills() {
        let target = TargetProfile::try_from(draft_target()).unwrap();
        assert!(target.required_skills.contains("python"));
        assert!(target.required_skills.contains("power bi"));
        // "python" is required, so it is dropped from the optional set
        assert_eq!(target.optional_skills.iter().collect::<Vec<_>>(), vec!["sql"]);
    }

    #[test]
    fn test_target_profile_rejects_inverted_experience() {
        let mut draft = draft_target();
        draft.experience_min = 6;
        draft.experience_max = Some(3);
        assert_eq!(
            TargetProfile::try_from(draft).unwrap_err(),
            ProfileError::InvertedExperienceRange { min: 6, max: 3 }
        );
    }

    #[test]
    fn test_target_profile_rejects_non_positive_importance() {
        let mut draft = draft_target();
        draft.skill_importance.insert("Python".to_string(), 0.0);
        assert!(matches!(
            TargetProfile::try_from(draft),
            Err(ProfileError::InvalidImportance { .. })
        ));
    }

    #[test]
    fn test_target_profile_json_goes_through_validation() {
        let json = r#"{"experience_min": 5, "experience_max": 1}"#;
        assert!(serde_json::from_str::<TargetProfile>(json).is_err());

        let json = r#"{"job_title": " BI dev ", "required_skills": ["Éxcel"]}"#;
        let target: TargetProfile = serde_json::from_str(json).unwrap();
        assert_eq!(target.job_title, "BI dev");
        assert!(target.required_skills.contains("excel"));
        assert_eq!(target.experience.max, None);
    }

    #[test]
    fn test_target_profile_serializes_flat() {
        let target = TargetProfile::try_from(draft_target()).unwrap();
        let value = serde_json::to_value(&target).unwrap();
        assert_eq!(value["experience_min"], 2);
        assert_eq!(value["required_skills"][0], "power bi");
        assert_eq!(value["contract_type"], "unspecified");
        assert_eq!(value["salary_min"], serde_json::Value::Null);
        assert_eq!(value.as_object().unwrap().len(), 13);
        let back: TargetProfile = serde_json::from_value(value).unwrap();
        assert_eq!(back, target);
    }

    #[test]
    fn test_keywords_deduplicated_in_order() {
        let mut draft = draft_target();
        draft.keywords = vec!["SQL".into(), "python".into(), "sql".into(), " ".into()];
        let target = TargetProfile::try_from(draft).unwrap();
        assert_eq!(target.keywords, vec!["sql", "python"]);
    }

    #[test]
    fn test_experience_deviation() {
        let range = ExperienceRange::new(2, Some(5)).unwrap();
        assert_eq!(range.deviation(3.0), 0.0);
        assert_eq!(range.deviation(0.5), 1.5);
        assert_eq!(range.deviation(7.0), 2.0);
        let open = ExperienceRange::new(2, None).unwrap();
        assert_eq!(open.deviation(30.0), 0.0);
    }

    #[test]
    fn test_candidate_requires_id() {
        let draft = CandidateProfileDraft {
            candidate_id: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            CandidateProfile::try_from(draft).unwrap_err(),
            ProfileError::EmptyCandidateId
        );
    }

    #[test]
    fn test_candidate_rejects_negative_experience() {
        let draft = CandidateProfileDraft {
            candidate_id: "c1".to_string(),
            years_experience: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            CandidateProfile::try_from(draft),
            Err(ProfileError::InvalidExperience(_))
        ));
    }

    #[test]
    fn test_candidate_blank_letter_is_none() {
        let draft = CandidateProfileDraft {
            candidate_id: "c1".to_string(),
            motivation_letter: Some("   \n".to_string()),
            skills: vec!["Rust".to_string(), "".to_string()],
            ..Default::default()
        };
        let candidate = CandidateProfile::try_from(draft).unwrap();
        assert!(candidate.motivation_letter.is_none());
        assert_eq!(candidate.skills.len(), 1);
    }

    #[test]
    fn test_candidate_round_trips_through_json() {
        let draft = CandidateProfileDraft {
            candidate_id: "c1".to_string(),
            years_experience: Some(3.0),
            skills: vec!["Python".to_string()],
            ..Default::default()
        };
        let candidate = CandidateProfile::try_from(draft).unwrap();
        let json = serde_json::to_string(&candidate).unwrap();
        let back: CandidateProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candidate);
    }
}
