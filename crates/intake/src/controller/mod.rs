//! Controller layer: UI events, state transitions and request orchestration.

use std::sync::Arc;

use client_core::RemoteClient;
use shared::{
    catalog::{Catalog, MessageKey},
    domain::{Answer, FormSnapshot, Language, QuestionId, Session, TagId},
    error::ValidationFailure,
    validation::{validate, ValidationRules},
};
use storage::FormPersistence;
use tracing::{debug, info, warn};

use crate::render;

pub mod events;
pub mod orchestration;
pub mod state;

use events::{FieldUpdate, Notification, RenderTarget};
use state::{Completion, IntakeState, PendingRequest, Phase, RequestKind};

/// Collaborators injected into the controller.
#[derive(Clone)]
pub struct Services {
    pub client: Arc<dyn RemoteClient>,
    pub persistence: FormPersistence,
    pub catalog: Arc<Catalog>,
    pub rules: ValidationRules,
}

impl Services {
    pub fn new(client: Arc<dyn RemoteClient>, persistence: FormPersistence) -> Self {
        Self {
            client,
            persistence,
            catalog: Arc::new(Catalog::builtin()),
            rules: ValidationRules::default(),
        }
    }
}

pub struct Controller<T: RenderTarget> {
    state: IntakeState,
    target: T,
    services: Services,
}

impl<T: RenderTarget> Controller<T> {
    /// Issues the session, restores language and any unexpired form, and shows
    /// the initial placeholder.
    pub async fn start(mut target: T, services: Services) -> Self {
        let session = Session::start();
        let persistence = &services.persistence;
        persistence.save_session_id(session.session_id()).await;

        let language = persistence.load_language().await.unwrap_or_default();
        let restored = persistence.load(language).await;
        let was_restored = restored.is_some();
        let mut form = restored.unwrap_or_else(|| FormSnapshot::empty(language));
        let before = form.symptom_tags.len();
        form.symptom_tags = services.catalog.retain_known(form.symptom_tags);
        if form.symptom_tags.len() != before {
            warn!(
                dropped = before - form.symptom_tags.len(),
                "dropped unknown symptom tags from saved form"
            );
        }

        target.show_form(&form);
        target.show_results(&render::render_initial(language));
        info!(
            session_id = %session.session_id(),
            %language,
            restored = was_restored,
            "intake session started"
        );

        Self {
            state: IntakeState::new(session, form),
            target,
            services,
        }
    }

    pub fn state(&self) -> &IntakeState {
        &self.state
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn language(&self) -> Language {
        self.state.form.language
    }

    fn message(&self, key: MessageKey) -> String {
        self.services.catalog.messages.text(key, self.language())
    }

    pub async fn update_field(&mut self, update: FieldUpdate) {
        let form = &mut self.state.form;
        match update {
            FieldUpdate::ChiefComplaint(text) => form.chief_complaint = text,
            FieldUpdate::FreeText(text) => form.free_text = text,
            FieldUpdate::ConcomitantMeds(text) => form.concomitant_meds = text,
            FieldUpdate::Consent(consent) => form.consent = consent,
        }
        self.services.persistence.save(&self.state.form).await;
    }

    /// Returns false for tags outside the catalog; the form is left alone.
    pub async fn toggle_symptom(&mut self, tag: TagId, selected: bool) -> bool {
        if !self.services.catalog.contains(&tag) {
            warn!(%tag, "ignoring unknown symptom tag");
            return false;
        }
        self.state.form.set_tag(tag, selected);
        self.services.persistence.save(&self.state.form).await;
        true
    }

    /// Records an answer for a question of the current result. Unknown ids are
    /// ignored.
    pub fn answer_followup(&mut self, question_id: QuestionId, answer: Answer) -> bool {
        let known = self
            .state
            .result
            .as_ref()
            .is_some_and(|result| result.has_question(&question_id));
        if !known {
            debug!(%question_id, "ignoring answer for unknown question");
            return false;
        }
        self.state.answers.insert(question_id, answer);
        true
    }

    pub async fn switch_language(&mut self, language: Language) {
        self.state.form.language = language;
        self.services.persistence.save_language(language).await;
        if self.state.phase == Phase::Invalid {
            self.state.field_errors = validate(
                &self.state.form,
                &self.services.rules,
                &self.services.catalog.messages,
            );
            self.target.show_field_errors(&self.state.field_errors);
        }
        self.render_current();
        debug!(%language, "language switched");
    }

    pub async fn autosave(&mut self) {
        self.services.persistence.save(&self.state.form).await;
    }

    /// Resets everything but the session and language. A request still in
    /// flight is superseded.
    pub async fn clear(&mut self) {
        self.state.reset();
        self.state.latest_seq += 1;
        self.services.persistence.clear().await;

        self.target.clear_field_errors();
        self.target.set_submit_busy(false);
        self.target.show_form(&self.state.form);
        self.target
            .show_results(&render::render_initial(self.language()));
        let message = self.message(MessageKey::FormCleared);
        self.target.notify(Notification::success(message));
        info!(session_id = %self.state.session_id(), "form cleared");
    }

    /// Validates the form and, when it passes, commits to a diagnosis request.
    pub fn begin_submit(&mut self) -> Option<PendingRequest> {
        self.state.phase = Phase::Validating;
        let checked = ValidationFailure::check(validate(
            &self.state.form,
            &self.services.rules,
            &self.services.catalog.messages,
        ));
        if let Err(failure) = checked {
            info!(%failure, "form failed validation");
            self.state.phase = Phase::Invalid;
            self.target.show_field_errors(&failure.errors);
            self.state.field_errors = failure.errors;
            let message = self.message(MessageKey::ValidationError);
            self.target.notify(Notification::error(message));
            return None;
        }

        self.state.field_errors.clear();
        self.target.clear_field_errors();
        Some(self.issue(RequestKind::Diagnosis(self.state.form.clone())))
    }

    /// Needs at least one answered question; otherwise nothing is sent.
    pub fn begin_followup(&mut self) -> Option<PendingRequest> {
        let answers = self.state.collected_answers();
        if answers.is_empty() {
            let message = self.message(MessageKey::FollowupUnanswered);
            self.target.notify(Notification::error(message));
            return None;
        }
        Some(self.issue(RequestKind::Followup(answers)))
    }

    /// Re-runs the last flow. A diagnosis is re-validated against the current
    /// form; follow-up answers are resent as they were.
    pub fn begin_retry(&mut self) -> Option<PendingRequest> {
        match self.state.last_request.clone() {
            Some(RequestKind::Followup(answers)) => {
                Some(self.issue(RequestKind::Followup(answers)))
            }
            Some(RequestKind::Diagnosis(_)) | None => self.begin_submit(),
        }
    }

    fn issue(&mut self, kind: RequestKind) -> PendingRequest {
        self.state.latest_seq += 1;
        self.state.phase = Phase::Loading;
        self.state.last_request = Some(kind.clone());
        self.target.set_submit_busy(true);
        self.target
            .show_results(&render::render_loading(self.language()));
        debug!(seq = self.state.latest_seq, request = kind.label(), "request issued");

        PendingRequest {
            seq: self.state.latest_seq,
            session_id: self.state.session_id(),
            kind,
        }
    }

    /// Applies a finished request unless a newer one has been issued since.
    pub fn complete(&mut self, completion: Completion) {
        if completion.seq != self.state.latest_seq {
            debug!(
                seq = completion.seq,
                latest = self.state.latest_seq,
                "discarding stale completion"
            );
            return;
        }

        self.target.set_submit_busy(false);
        let session_id = self.state.session_id();
        match completion.outcome {
            Ok(result) => {
                let success_key = match completion.kind {
                    RequestKind::Followup(answers) => {
                        self.state.followup_history.push(answers);
                        MessageKey::FollowupSuccess
                    }
                    RequestKind::Diagnosis(_) => MessageKey::SubmissionSuccess,
                };
                info!(
                    %session_id,
                    seq = completion.seq,
                    top_choices = result.top_choices.len(),
                    questions = result.follow_up_questions.len(),
                    "results rendered"
                );
                self.state.answers.clear();
                self.state.result = Some(result);
                self.state.error = None;
                self.state.phase = Phase::Rendered;
                self.render_current();
                let message = self.message(success_key);
                self.target.notify(Notification::success(message));
            }
            Err(error) => {
                let kind = error.kind();
                warn!(%session_id, seq = completion.seq, %error, kind = kind.code(), "request failed");
                self.state.error = Some(kind);
                self.state.phase = Phase::Errored;
                self.render_current();
                let message = self
                    .services
                    .catalog
                    .messages
                    .error_text(kind, self.language());
                self.target.notify(Notification::error(message));
            }
        }
    }

    fn render_current(&mut self) {
        let language = self.language();
        let markup = match (self.state.phase, &self.state.result, self.state.error) {
            (Phase::Loading, _, _) => render::render_loading(language),
            (Phase::Errored, _, Some(kind)) => {
                render::render_error(kind, &self.services.catalog.messages, language)
            }
            (Phase::Rendered, Some(result), _) => {
                render::render_results(result, &self.state.answers, language)
            }
            // a failed local check leaves whatever was showing in place
            (Phase::Invalid, _, Some(kind)) => {
                render::render_error(kind, &self.services.catalog.messages, language)
            }
            (Phase::Invalid, Some(result), None) => {
                render::render_results(result, &self.state.answers, language)
            }
            _ => render::render_initial(language),
        };
        self.target.show_results(&markup);
    }

    pub async fn submit(&mut self) {
        if let Some(pending) = self.begin_submit() {
            self.dispatch(pending).await;
        }
    }

    pub async fn submit_followup(&mut self) {
        if let Some(pending) = self.begin_followup() {
            self.dispatch(pending).await;
        }
    }

    pub async fn retry(&mut self) {
        if let Some(pending) = self.begin_retry() {
            self.dispatch(pending).await;
        }
    }

    async fn dispatch(&mut self, pending: PendingRequest) {
        let completion = orchestration::execute(self.services.client.as_ref(), pending).await;
        self.complete(completion);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
