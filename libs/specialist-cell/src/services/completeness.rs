use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::models::{
    FieldError, FieldErrorCode, SpecialistProfile, AVAILABILITY_SLOT_CATALOG, LANGUAGE_VOCABULARY,
};

pub const MIN_BIO_WORDS: usize = 20;
pub const MAX_YEARS_OF_EXPERIENCE: u32 = 50;
pub const MIN_AVAILABILITY_SLOTS: usize = 1;
pub const MAX_AVAILABILITY_SLOTS: usize = 8;

/// Number of mandatory checks behind the completion percentage.
pub const COMPLETION_CHECKS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    pub complete: bool,
    pub missing: Vec<FieldError>,
    pub satisfied_checks: usize,
    pub total_checks: usize,
}

impl CompletenessReport {
    pub fn completion_percentage(&self) -> u8 {
        if self.complete {
            return 100;
        }
        ((self.satisfied_checks * 100) / self.total_checks) as u8
    }
}

/// Pure mandatory-field rules for a specialist profile.
///
/// Every failing rule yields its own [`FieldError`]; the report never stops
/// at the first problem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileCompletenessEvaluator;

impl ProfileCompletenessEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, profile: &SpecialistProfile) -> CompletenessReport {
        let mut missing = Vec::new();
        let mut satisfied = 0usize;

        let mut check = |passed: bool, error: Option<FieldError>, missing: &mut Vec<FieldError>| {
            if passed {
                satisfied += 1;
            } else if let Some(error) = error {
                missing.push(error);
            }
        };

        check(
            !profile.phone.trim().is_empty(),
            Some(FieldError::new("phone", FieldErrorCode::Required, "Phone number is required")),
            &mut missing,
        );
        check(
            !profile.address.trim().is_empty(),
            Some(FieldError::new("address", FieldErrorCode::Required, "Address is required")),
            &mut missing,
        );

        let bio_present = !profile.bio.trim().is_empty();
        check(
            bio_present,
            Some(FieldError::new("bio", FieldErrorCode::Required, "Bio is required")),
            &mut missing,
        );
        let words = profile.bio_word_count();
        check(
            words >= MIN_BIO_WORDS,
            bio_present.then(|| {
                FieldError::new(
                    "bio",
                    FieldErrorCode::TooShort,
                    format!("Bio must contain at least {} words, found {}", MIN_BIO_WORDS, words),
                )
            }),
            &mut missing,
        );

        check(
            profile.consultation_fee.is_finite() && profile.consultation_fee > 0.0,
            Some(FieldError::new(
                "consultation_fee",
                FieldErrorCode::MustBePositive,
                "Consultation fee must be greater than zero",
            )),
            &mut missing,
        );

        check(
            !profile.languages_spoken.is_empty(),
            Some(FieldError::new(
                "languages_spoken",
                FieldErrorCode::Required,
                "At least one spoken language is required",
            )),
            &mut missing,
        );

        let has_specializations = !profile.specializations.is_empty();
        check(
            has_specializations,
            Some(FieldError::new(
                "specializations",
                FieldErrorCode::Required,
                "At least one specialization is required",
            )),
            &mut missing,
        );
        let primaries = profile.specializations.iter().filter(|s| s.is_primary).count();
        check(
            primaries == 1,
            has_specializations.then(|| {
                FieldError::new(
                    "specializations",
                    FieldErrorCode::PrimaryCount,
                    format!("Exactly one primary specialization is required, found {}", primaries),
                )
            }),
            &mut missing,
        );

        let slots = profile.availability_slots.len();
        check(
            (MIN_AVAILABILITY_SLOTS..=MAX_AVAILABILITY_SLOTS).contains(&slots),
            Some(if slots == 0 {
                FieldError::new(
                    "availability_slots",
                    FieldErrorCode::Required,
                    "At least one availability slot is required",
                )
            } else {
                FieldError::new(
                    "availability_slots",
                    FieldErrorCode::OutOfRange,
                    format!("At most {} availability slots are allowed", MAX_AVAILABILITY_SLOTS),
                )
            }),
            &mut missing,
        );

        // Rules below do not count toward the percentage but still block completeness.
        self.check_vocabulary(
            "languages_spoken",
            &profile.languages_spoken,
            |language| {
                LANGUAGE_VOCABULARY
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(language.trim()))
            },
            &mut missing,
        );
        self.check_vocabulary(
            "availability_slots",
            &profile.availability_slots,
            |slot| AVAILABILITY_SLOT_CATALOG.contains(&slot),
            &mut missing,
        );

        for (index, entry) in profile.specializations.iter().enumerate() {
            if entry.years_of_experience > MAX_YEARS_OF_EXPERIENCE {
                missing.push(FieldError::new(
                    format!("specializations[{}].years_of_experience", index),
                    FieldErrorCode::OutOfRange,
                    format!("Years of experience must be between 0 and {}", MAX_YEARS_OF_EXPERIENCE),
                ));
            }
        }

        Self::check_optional_text("clinic_name", profile.clinic_name.as_deref(), &mut missing);
        Self::check_optional_text("website_url", profile.website_url.as_deref(), &mut missing);
        for (platform, url) in &profile.social_media_links {
            if platform.trim().is_empty() || url.trim().is_empty() {
                missing.push(FieldError::new(
                    format!("social_media_links.{}", platform),
                    FieldErrorCode::Blank,
                    "Social media links need a platform name and a URL",
                ));
            }
        }

        let report = CompletenessReport {
            complete: missing.is_empty(),
            missing,
            satisfied_checks: satisfied,
            total_checks: COMPLETION_CHECKS,
        };

        debug!(
            "Profile evaluated: complete={}, {} error(s), {}/{} checks",
            report.complete,
            report.missing.len(),
            report.satisfied_checks,
            report.total_checks
        );

        report
    }

    fn check_vocabulary(
        &self,
        field: &str,
        values: &[String],
        known: impl Fn(&str) -> bool,
        missing: &mut Vec<FieldError>,
    ) {
        let mut seen = HashSet::new();
        for value in values {
            if !known(value.as_str()) {
                missing.push(FieldError::new(
                    field,
                    FieldErrorCode::UnknownValue,
                    format!("Unknown value: {}", value),
                ));
            } else if !seen.insert(value.trim().to_ascii_lowercase()) {
                missing.push(FieldError::new(
                    field,
                    FieldErrorCode::Duplicate,
                    format!("Duplicate value: {}", value),
                ));
            }
        }
    }

    // Present-but-empty is an error, not absence.
    fn check_optional_text(field: &str, value: Option<&str>, missing: &mut Vec<FieldError>) {
        if let Some(text) = value {
            if text.trim().is_empty() {
                missing.push(FieldError::new(
                    field,
                    FieldErrorCode::Blank,
                    format!("{} cannot be blank when provided", field),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Specialization, SpecializationEntry};

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn valid_profile() -> SpecialistProfile {
        SpecialistProfile {
            phone: "+212600000000".into(),
            address: "12 Rue Atlas, Rabat".into(),
            bio: words(25),
            consultation_fee: 300.0,
            languages_spoken: vec!["arabic".into(), "French".into()],
            specializations: vec![SpecializationEntry {
                specialization: Specialization::ClinicalPsychology,
                years_of_experience: 8,
                is_primary: true,
                certification_date: None,
            }],
            availability_slots: vec!["09:00-10:00".into(), "14:00-15:00".into()],
            ..SpecialistProfile::default()
        }
    }

    #[test]
    fn valid_profile_is_complete() {
        let report = ProfileCompletenessEvaluator::new().evaluate(&valid_profile());
        assert!(report.complete, "unexpected errors: {:?}", report.missing);
        assert_eq!(report.completion_percentage(), 100);
    }

    #[test]
    fn empty_profile_reports_every_required_field() {
        let report = ProfileCompletenessEvaluator::new().evaluate(&SpecialistProfile::default());
        assert!(!report.complete);
        assert_eq!(report.completion_percentage(), 0);

        let fields: Vec<&str> = report.missing.iter().map(|e| e.field.as_str()).collect();
        for field in [
            "phone",
            "address",
            "bio",
            "consultation_fee",
            "languages_spoken",
            "specializations",
            "availability_slots",
        ] {
            assert!(fields.contains(&field), "missing {} in {:?}", field, fields);
        }
    }

    #[test]
    fn partial_profile_reports_partial_percentage() {
        let profile = SpecialistProfile {
            phone: "0600".into(),
            address: "Casablanca".into(),
            bio: words(5),
            ..SpecialistProfile::default()
        };
        let report = ProfileCompletenessEvaluator::new().evaluate(&profile);
        // phone, address, bio present
        assert_eq!(report.satisfied_checks, 3);
        assert_eq!(report.completion_percentage(), 33);
    }

    #[test]
    fn two_primary_specializations_fail() {
        let mut profile = valid_profile();
        profile.specializations.push(SpecializationEntry {
            specialization: Specialization::Psychiatry,
            years_of_experience: 2,
            is_primary: true,
            certification_date: None,
        });

        let report = ProfileCompletenessEvaluator::new().evaluate(&profile);
        assert!(!report.complete);
        assert!(report.missing.iter().any(|e| e.code == FieldErrorCode::PrimaryCount));
    }

    #[test]
    fn unknown_and_duplicate_slots_fail() {
        let mut profile = valid_profile();
        profile.availability_slots = vec!["09:00-10:00".into(), "09:00-10:00".into(), "18:00-19:00".into()];

        let report = ProfileCompletenessEvaluator::new().evaluate(&profile);
        let codes: Vec<FieldErrorCode> = report.missing.iter().map(|e| e.code).collect();
        assert!(codes.contains(&FieldErrorCode::Duplicate));
        assert!(codes.contains(&FieldErrorCode::UnknownValue));
    }

    #[test]
    fn nine_slots_exceed_the_limit() {
        let mut profile = valid_profile();
        profile.availability_slots = AVAILABILITY_SLOT_CATALOG.iter().map(|s| s.to_string()).collect();
        assert!(ProfileCompletenessEvaluator::new().evaluate(&profile).complete);

        profile.availability_slots.push("16:00-17:00".into());
        let report = ProfileCompletenessEvaluator::new().evaluate(&profile);
        assert!(report.missing.iter().any(|e| e.code == FieldErrorCode::OutOfRange));
    }

    #[test]
    fn blank_optional_fields_are_errors() {
        let mut profile = valid_profile();
        profile.clinic_name = Some("   ".into());
        profile.website_url = Some(String::new());

        let report = ProfileCompletenessEvaluator::new().evaluate(&profile);
        let blank: Vec<&str> = report
            .missing
            .iter()
            .filter(|e| e.code == FieldErrorCode::Blank)
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(blank, vec!["clinic_name", "website_url"]);
    }

    #[test]
    fn experience_above_fifty_years_fails() {
        let mut profile = valid_profile();
        profile.specializations[0].years_of_experience = 51;

        let report = ProfileCompletenessEvaluator::new().evaluate(&profile);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].field, "specializations[0].years_of_experience");
    }
}
