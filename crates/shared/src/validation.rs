//! Client-side form checks. Pure: the same snapshot always yields the same
//! ordered error list, and every violated rule is reported.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    catalog::{MessageKey, Messages},
    domain::{FormField, FormSnapshot},
    error::{FieldError, Violation},
};

// Kanji, hiragana, katakana, prolonged sound mark, middle dot, Japanese and
// ASCII commas, ASCII word characters, whitespace.
static MEDICATION_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\u{4E00}-\u{9FAF}\u{3041}-\u{309F}\u{30A1}-\u{30F6}ー・、，,A-Za-z0-9_\s]*$")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub chief_complaint_max: usize,
    pub free_text_max: usize,
    pub concomitant_meds_max: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            chief_complaint_max: 200,
            free_text_max: 1000,
            concomitant_meds_max: 500,
        }
    }
}

pub fn is_allowed_medication_text(text: &str) -> bool {
    MEDICATION_CHARS.is_match(text)
}

pub fn validate(
    form: &FormSnapshot,
    rules: &ValidationRules,
    messages: &Messages,
) -> Vec<FieldError> {
    let lang = form.language;
    let mut errors = Vec::new();

    if form.chief_complaint.trim().is_empty() {
        errors.push(FieldError::new(
            FormField::ChiefComplaint,
            Violation::Required,
            messages.text(MessageKey::ChiefComplaintRequired, lang),
        ));
    }

    if char_len(&form.chief_complaint) > rules.chief_complaint_max {
        errors.push(FieldError::new(
            FormField::ChiefComplaint,
            Violation::TooLong {
                limit: rules.chief_complaint_max,
            },
            messages.text_with_limit(
                MessageKey::ChiefComplaintTooLong,
                lang,
                rules.chief_complaint_max,
            ),
        ));
    }

    if char_len(&form.free_text) > rules.free_text_max {
        errors.push(FieldError::new(
            FormField::FreeText,
            Violation::TooLong {
                limit: rules.free_text_max,
            },
            messages.text_with_limit(MessageKey::FreeTextTooLong, lang, rules.free_text_max),
        ));
    }

    if !form.concomitant_meds.is_empty() && !is_allowed_medication_text(&form.concomitant_meds) {
        errors.push(FieldError::new(
            FormField::ConcomitantMeds,
            Violation::InvalidCharacters,
            messages.text(MessageKey::MedsInvalidCharacters, lang),
        ));
    }

    if char_len(&form.concomitant_meds) > rules.concomitant_meds_max {
        errors.push(FieldError::new(
            FormField::ConcomitantMeds,
            Violation::TooLong {
                limit: rules.concomitant_meds_max,
            },
            messages.text_with_limit(
                MessageKey::MedsTooLong,
                lang,
                rules.concomitant_meds_max,
            ),
        ));
    }

    if !form.consent {
        errors.push(FieldError::new(
            FormField::Consent,
            Violation::ConsentRequired,
            messages.text(MessageKey::ConsentRequired, lang),
        ));
    }

    errors
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
