use std::collections::HashMap;

use client_core::ClientError;
use shared::{
    domain::{Answer, DiagnosisResult, FormSnapshot, QuestionId, Session, SessionId},
    error::{ErrorKind, FieldError},
    protocol::FollowupAnswer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    /// Local validation failed; nothing was sent.
    Invalid,
    Loading,
    Rendered,
    Errored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Diagnosis(FormSnapshot),
    Followup(Vec<FollowupAnswer>),
}

impl RequestKind {
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::Diagnosis(_) => "diagnosis",
            RequestKind::Followup(_) => "followup",
        }
    }
}

/// A request the controller has committed to; `seq` identifies it when the
/// completion comes back.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub seq: u64,
    pub session_id: SessionId,
    pub kind: RequestKind,
}

#[derive(Debug)]
pub struct Completion {
    pub seq: u64,
    pub kind: RequestKind,
    pub outcome: Result<DiagnosisResult, ClientError>,
}

/// Everything the page knows. Owned by the controller alone.
#[derive(Debug)]
pub struct IntakeState {
    pub session: Session,
    pub form: FormSnapshot,
    pub result: Option<DiagnosisResult>,
    pub error: Option<ErrorKind>,
    pub answers: HashMap<QuestionId, Answer>,
    /// Answer sets accepted by the webhook, oldest first.
    pub followup_history: Vec<Vec<FollowupAnswer>>,
    pub field_errors: Vec<FieldError>,
    pub phase: Phase,
    pub last_request: Option<RequestKind>,
    pub latest_seq: u64,
}

impl IntakeState {
    pub fn new(session: Session, form: FormSnapshot) -> Self {
        Self {
            session,
            form,
            result: None,
            error: None,
            answers: HashMap::new(),
            followup_history: Vec::new(),
            field_errors: Vec::new(),
            phase: Phase::Idle,
            last_request: None,
            latest_seq: 0,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session.session_id()
    }

    /// Answers in the order the current result asks its questions.
    pub fn collected_answers(&self) -> Vec<FollowupAnswer> {
        let Some(result) = &self.result else {
            return Vec::new();
        };
        result
            .follow_up_questions
            .iter()
            .filter_map(|question| {
                self.answers.get(&question.id).map(|value| FollowupAnswer {
                    id: question.id.clone(),
                    value: *value,
                })
            })
            .collect()
    }

    /// Drops everything but the session and language.
    pub fn reset(&mut self) {
        let language = self.form.language;
        self.form = FormSnapshot::empty(language);
        self.result = None;
        self.error = None;
        self.answers.clear();
        self.followup_history.clear();
        self.field_errors.clear();
        self.phase = Phase::Idle;
        self.last_request = None;
    }
}
