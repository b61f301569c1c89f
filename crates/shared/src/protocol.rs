use serde::{Deserialize, Serialize};

use crate::domain::{
    Answer, DiagnosisResult, FormSnapshot, Language, QuestionId, SessionId, TagId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub session_id: SessionId,
    pub chief_complaint: String,
    pub symptoms: Vec<TagId>,
    pub free_text: String,
    pub concomitant_meds: Vec<String>,
    pub lang: Language,
    pub app_version: String,
}

impl DiagnosisRequest {
    pub fn from_snapshot(
        form: &FormSnapshot,
        session_id: SessionId,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            chief_complaint: form.chief_complaint.trim().to_string(),
            symptoms: form.symptom_tags.clone(),
            free_text: form.free_text.trim().to_string(),
            concomitant_meds: form.medication_list(),
            lang: form.language,
            app_version: app_version.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupAnswer {
    pub id: QuestionId,
    pub value: Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupRequest {
    pub session_id: SessionId,
    pub answers: Vec<FollowupAnswer>,
}

/// One element of the webhook response array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookItem {
    pub message: WebhookMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub content: DiagnosisResult,
}

/// The webhook answers with an array; only `[0].message.content` is used.
pub fn first_content(items: Vec<WebhookItem>) -> Option<DiagnosisResult> {
    items.into_iter().next().map(|item| item.message.content)
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
