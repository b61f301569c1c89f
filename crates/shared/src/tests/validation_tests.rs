use super::*;
use crate::{domain::Language, error::ValidationFailure};

fn valid_form() -> FormSnapshot {
    FormSnapshot {
        chief_complaint: "腰痛".into(),
        consent: true,
        ..FormSnapshot::default()
    }
}

fn run(form: &FormSnapshot) -> Vec<FieldError> {
    validate(form, &ValidationRules::default(), &Messages::builtin())
}

fn violations(form: &FormSnapshot) -> Vec<(FormField, Violation)> {
    run(form)
        .into_iter()
        .map(|error| (error.field, error.violation))
        .collect()
}

#[test]
fn valid_form_has_no_errors() {
    assert!(run(&valid_form()).is_empty());
}

#[test]
fn blank_chief_complaint_is_required() {
    let form = FormSnapshot {
        chief_complaint: "   ".into(),
        ..valid_form()
    };
    assert_eq!(
        violations(&form),
        vec![(FormField::ChiefComplaint, Violation::Required)]
    );
}

#[test]
fn chief_complaint_length_boundary() {
    let at_limit = FormSnapshot {
        chief_complaint: "痛".repeat(200),
        ..valid_form()
    };
    assert!(run(&at_limit).is_empty());

    let over_limit = FormSnapshot {
        chief_complaint: "痛".repeat(201),
        ..valid_form()
    };
    let errors = run(&over_limit);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].violation, Violation::TooLong { limit: 200 });
    assert!(errors[0].message.contains("200"));
}

#[test]
fn free_text_over_limit_fails() {
    let form = FormSnapshot {
        free_text: "a".repeat(1001),
        ..valid_form()
    };
    assert_eq!(
        violations(&form),
        vec![(FormField::FreeText, Violation::TooLong { limit: 1000 })]
    );
}

#[test]
fn medications_reject_emoji_and_symbols() {
    for meds in ["アスピリン😀", "aspirin; drop table", "ロキソニン!"] {
        let form = FormSnapshot {
            concomitant_meds: meds.into(),
            ..valid_form()
        };
        assert_eq!(
            violations(&form),
            vec![(FormField::ConcomitantMeds, Violation::InvalidCharacters)],
            "{meds}"
        );
    }
}

#[test]
fn medications_accept_commas_japanese_and_ascii_words() {
    for meds in [
        "アスピリン, ロキソニン, 葛根湯",
        "あいう、カタカナ・ひらがな，Loxonin 60mg",
        "aspirin,ibuprofen_200",
        "",
    ] {
        let form = FormSnapshot {
            concomitant_meds: meds.into(),
            ..valid_form()
        };
        assert!(run(&form).is_empty(), "{meds}");
    }
}

#[test]
fn consent_false_always_reports_consent() {
    let form = FormSnapshot {
        consent: false,
        ..valid_form()
    };
    assert_eq!(
        violations(&form),
        vec![(FormField::Consent, Violation::ConsentRequired)]
    );
}

#[test]
fn every_violated_rule_is_reported_in_order() {
    let form = FormSnapshot {
        chief_complaint: String::new(),
        free_text: "x".repeat(1001),
        concomitant_meds: "★".repeat(501),
        consent: false,
        ..FormSnapshot::default()
    };
    assert_eq!(
        violations(&form),
        vec![
            (FormField::ChiefComplaint, Violation::Required),
            (FormField::FreeText, Violation::TooLong { limit: 1000 }),
            (FormField::ConcomitantMeds, Violation::InvalidCharacters),
            (FormField::ConcomitantMeds, Violation::TooLong { limit: 500 }),
            (FormField::Consent, Violation::ConsentRequired),
        ]
    );
}

#[test]
fn failure_carries_every_error_and_counts_them() {
    assert!(ValidationFailure::check(run(&valid_form())).is_ok());

    let failure = ValidationFailure::check(run(&FormSnapshot::default())).expect_err("invalid");
    let fields: Vec<FormField> = failure.errors.iter().map(|error| error.field).collect();
    assert_eq!(fields, vec![FormField::ChiefComplaint, FormField::Consent]);
    assert_eq!(failure.to_string(), "form has 2 invalid field(s)");
}

#[test]
fn validation_is_deterministic() {
    let form = FormSnapshot {
        chief_complaint: "x".repeat(250),
        concomitant_meds: "<b>".into(),
        ..FormSnapshot::default()
    };
    assert_eq!(run(&form), run(&form));
}

#[test]
fn messages_follow_the_form_language() {
    let form = FormSnapshot {
        consent: false,
        language: Language::En,
        ..valid_form()
    };
    assert_eq!(run(&form)[0].message, "Agreement to terms is required");

    let form = FormSnapshot {
        language: Language::Ja,
        ..form
    };
    assert_eq!(run(&form)[0].message, "利用規約への同意が必要です");
}

#[test]
fn custom_rules_are_honoured() {
    let rules = ValidationRules {
        chief_complaint_max: 3,
        ..ValidationRules::default()
    };
    let form = FormSnapshot {
        chief_complaint: "abcd".into(),
        ..valid_form()
    };
    let errors = validate(&form, &rules, &Messages::builtin());
    assert_eq!(errors[0].violation, Violation::TooLong { limit: 3 });
}
