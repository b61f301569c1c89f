//! Inputs to the controller loop and the view capability it drives.

use shared::{
    domain::{Answer, FormSnapshot, Language, QuestionId, TagId},
    error::FieldError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    ChiefComplaint(String),
    FreeText(String),
    ConcomitantMeds(String),
    Consent(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    UpdateField(FieldUpdate),
    ToggleSymptom { tag: TagId, selected: bool },
    AnswerFollowup { question_id: QuestionId, answer: Answer },
    Submit,
    SubmitFollowup,
    Retry,
    Clear,
    SwitchLanguage(Language),
    /// Stop taking events; in-flight requests still complete.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Whatever displays the page. All calls happen on the controller's task.
pub trait RenderTarget: Send {
    /// Replaces the results area.
    fn show_results(&mut self, markup: &str);
    fn show_field_errors(&mut self, errors: &[FieldError]);
    fn clear_field_errors(&mut self);
    fn set_submit_busy(&mut self, busy: bool);
    fn notify(&mut self, notification: Notification);
    /// Reflects a restored or reset form back into the inputs.
    fn show_form(&mut self, _form: &FormSnapshot) {}
}
