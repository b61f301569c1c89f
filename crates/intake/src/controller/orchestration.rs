//! Event loop: UI events, request completions and the autosave ticker, all
//! applied on one task. Network calls run as spawned tasks.

use std::{sync::Arc, time::Duration};

use client_core::RemoteClient;
use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};

use super::{
    events::{RenderTarget, UiEvent},
    state::{Completion, PendingRequest, RequestKind},
    Controller,
};

pub async fn execute(client: &dyn RemoteClient, pending: PendingRequest) -> Completion {
    let outcome = match &pending.kind {
        RequestKind::Diagnosis(form) => client.submit_diagnosis(form, pending.session_id).await,
        RequestKind::Followup(answers) => {
            client.submit_followup(pending.session_id, answers).await
        }
    };
    Completion {
        seq: pending.seq,
        kind: pending.kind,
        outcome,
    }
}

fn event_name(event: &UiEvent) -> &'static str {
    match event {
        UiEvent::UpdateField(_) => "update_field",
        UiEvent::ToggleSymptom { .. } => "toggle_symptom",
        UiEvent::AnswerFollowup { .. } => "answer_followup",
        UiEvent::Submit => "submit",
        UiEvent::SubmitFollowup => "submit_followup",
        UiEvent::Retry => "retry",
        UiEvent::Clear => "clear",
        UiEvent::SwitchLanguage(_) => "switch_language",
        UiEvent::Shutdown => "shutdown",
    }
}

impl<T: RenderTarget> Controller<T> {
    /// Applies one event. A returned request still has to be executed.
    pub async fn handle_event(&mut self, event: UiEvent) -> Option<PendingRequest> {
        tracing::debug!(event = event_name(&event), "handling ui event");
        match event {
            UiEvent::UpdateField(update) => {
                self.update_field(update).await;
                None
            }
            UiEvent::ToggleSymptom { tag, selected } => {
                self.toggle_symptom(tag, selected).await;
                None
            }
            UiEvent::AnswerFollowup {
                question_id,
                answer,
            } => {
                self.answer_followup(question_id, answer);
                None
            }
            UiEvent::Submit => self.begin_submit(),
            UiEvent::SubmitFollowup => self.begin_followup(),
            UiEvent::Retry => self.begin_retry(),
            UiEvent::Clear => {
                self.clear().await;
                None
            }
            UiEvent::SwitchLanguage(language) => {
                self.switch_language(language).await;
                None
            }
            UiEvent::Shutdown => None,
        }
    }

    /// Runs until `Shutdown` arrives or every sender is dropped, then waits for
    /// requests already in flight before handing the controller back.
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>, autosave_every: Duration) -> Self {
        let (done_tx, mut done_rx) = mpsc::channel::<Completion>(8);
        // interval panics on a zero period
        let autosave_every = autosave_every.max(Duration::from_millis(1));
        let mut autosave = time::interval_at(time::Instant::now() + autosave_every, autosave_every);
        autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = 0usize;
        let mut accepting = true;

        loop {
            if !accepting && in_flight == 0 {
                break;
            }

            tokio::select! {
                event = events.recv(), if accepting => match event {
                    Some(UiEvent::Shutdown) | None => {
                        tracing::debug!(in_flight, "controller loop draining");
                        accepting = false;
                    }
                    Some(event) => {
                        if let Some(pending) = self.handle_event(event).await {
                            in_flight += 1;
                            spawn_request(Arc::clone(&self.services.client), pending, done_tx.clone());
                        }
                    }
                },
                Some(completion) = done_rx.recv() => {
                    in_flight = in_flight.saturating_sub(1);
                    self.complete(completion);
                }
                _ = autosave.tick() => self.autosave().await,
            }
        }

        tracing::info!(session_id = %self.state.session_id(), "controller loop stopped");
        self
    }
}

fn spawn_request(
    client: Arc<dyn RemoteClient>,
    pending: PendingRequest,
    done_tx: mpsc::Sender<Completion>,
) {
    tokio::spawn(async move {
        let seq = pending.seq;
        let completion = execute(client.as_ref(), pending).await;
        if done_tx.send(completion).await.is_err() {
            tracing::debug!(seq, "controller gone before request completed");
        }
    });
}
