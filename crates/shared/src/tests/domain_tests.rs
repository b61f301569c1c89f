use super::*;
use serde_json::json;

#[test]
fn set_tag_keeps_insertion_order_without_duplicates() {
    let mut form = FormSnapshot::empty(Language::Ja);
    form.set_tag(TagId::from("pain_back"), true);
    form.set_tag(TagId::from("pain_head"), true);
    form.set_tag(TagId::from("pain_back"), true);
    assert_eq!(
        form.symptom_tags,
        vec![TagId::from("pain_back"), TagId::from("pain_head")]
    );

    form.set_tag(TagId::from("pain_back"), false);
    assert_eq!(form.symptom_tags, vec![TagId::from("pain_head")]);
}

#[test]
fn medication_list_splits_trims_and_drops_empties() {
    let form = FormSnapshot {
        concomitant_meds: " アスピリン, ロキソニン ,, ,葛根湯".into(),
        ..FormSnapshot::default()
    };
    assert_eq!(
        form.medication_list(),
        vec!["アスピリン", "ロキソニン", "葛根湯"]
    );
}

#[test]
fn language_codes_round_trip_and_reject_unsupported() {
    for language in Language::SUPPORTED {
        assert_eq!(Language::from_code(language.code()), Some(language));
    }
    assert_eq!(Language::from_code("fr"), None);
    assert_eq!(Language::default(), Language::Ja);
}

#[test]
fn session_id_is_fixed_for_the_session() {
    let session = Session::start();
    assert_eq!(session.session_id(), session.session_id());
    assert_ne!(session.session_id(), Session::start().session_id());
}

#[test]
fn decodes_result_with_numeric_ids_and_missing_fields() {
    let result: DiagnosisResult = serde_json::from_value(json!({
        "topChoices": [{
            "id": 12,
            "chapter": "太陽病",
            "name_jp": "葛根湯",
            "score": 0.876,
            "why": "項背強ばる",
            "citations": [{"zh": "太陽病，項背強几几", "ja": "太陽病で項背がこわばる", "chapter": 31, "id": "c-1"}]
        }],
        "followUpQuestions": [{"id": 3, "question": "汗はかきますか？"}],
        "modelVersion": "m-1"
    }))
    .expect("decode");

    let choice = &result.top_choices[0];
    assert_eq!(choice.id.as_deref(), Some("12"));
    assert_eq!(choice.percent(), 88);
    assert!(choice.safety_notes.is_empty());
    assert_eq!(choice.citations[0].chapter.as_deref(), Some("31"));
    assert_eq!(result.follow_up_questions[0].id, QuestionId::from("3"));
    assert_eq!(result.model_version.as_deref(), Some("m-1"));
    assert!(result.data_version.is_none());
    assert!(result.alternatives.is_empty());
    assert!(result.audit_info.is_none());
}

#[test]
fn null_fields_decode_as_empty() {
    let result: DiagnosisResult = serde_json::from_value(json!({
        "topChoices": [{
            "name_jp": "葛根湯",
            "score": null,
            "why": null,
            "citations": null,
            "safety_notes": null
        }, {
            "name_jp": "桂枝湯",
            "score": 0.4,
            "citations": [{"zh": null, "ja": "汗が出る", "chapter": null, "id": null}]
        }],
        "alternatives": null,
        "followUpQuestions": null,
        "modelVersion": null
    }))
    .expect("decode");

    let choice = &result.top_choices[0];
    assert_eq!(choice.name_jp, "葛根湯");
    assert_eq!(choice.score, 0.0);
    assert!(choice.why.is_empty());
    assert!(choice.citations.is_empty());
    assert!(choice.safety_notes.is_empty());
    let citation = &result.top_choices[1].citations[0];
    assert!(citation.zh.is_empty());
    assert_eq!(citation.ja, "汗が出る");
    assert!(citation.chapter.is_none());
    assert!(result.alternatives.is_empty());
    assert!(result.follow_up_questions.is_empty());
    assert!(result.model_version.is_none());

    let empty: DiagnosisResult =
        serde_json::from_value(json!({"topChoices": null})).expect("decode");
    assert_eq!(empty, DiagnosisResult::default());
}

#[test]
fn audit_info_from_the_wire_is_ignored() {
    let result: DiagnosisResult = serde_json::from_value(json!({
        "topChoices": [],
        "auditInfo": {"responseTime": 1, "timestamp": "2024-01-01T00:00:00Z", "sessionId": "00000000-0000-0000-0000-000000000000"}
    }))
    .expect("decode");
    assert!(result.audit_info.is_none());
}

#[test]
fn normalized_truncates_lists_and_clamps_scores() {
    let choice = |score: f64| PrescriptionChoice {
        name_jp: "処方".into(),
        score,
        ..PrescriptionChoice::default()
    };
    let question = |id: &str| Question {
        id: QuestionId::from(id),
        question: "?".into(),
    };
    let result = DiagnosisResult {
        top_choices: vec![choice(1.7), choice(-0.2), choice(0.5), choice(0.4)],
        alternatives: (0..8).map(|_| choice(0.1)).collect(),
        follow_up_questions: ["a", "b", "c", "d"].iter().map(|id| question(id)).collect(),
        ..DiagnosisResult::default()
    }
    .normalized(ResultLimits::default());

    assert_eq!(result.top_choices.len(), 3);
    assert_eq!(result.alternatives.len(), 5);
    assert_eq!(result.follow_up_questions.len(), 3);
    assert_eq!(result.top_choices[0].score, 1.0);
    assert_eq!(result.top_choices[1].score, 0.0);
    assert!(result.has_question(&QuestionId::from("c")));
    assert!(!result.has_question(&QuestionId::from("d")));
}

#[test]
fn answer_codes_parse_case_insensitively() {
    assert_eq!(Answer::from_code("YES"), Some(Answer::Yes));
    assert_eq!(Answer::from_code(" unknown "), Some(Answer::Unknown));
    assert_eq!(Answer::from_code("maybe"), None);
}
