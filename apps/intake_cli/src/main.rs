use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{load_settings, DiagnosisClient};
use intake::{
    Controller, FieldUpdate, Notification, NotificationLevel, Phase, RenderTarget, Services,
    UiEvent,
};
use shared::{
    domain::{Answer, FormSnapshot, Language, QuestionId, TagId},
    error::FieldError,
};
use storage::{FormPersistence, Storage};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Submit a Kampo symptom intake from the terminal")]
struct Args {
    #[arg(long)]
    chief_complaint: Option<String>,
    /// Symptom tag id; repeat for several.
    #[arg(long = "symptom")]
    symptoms: Vec<String>,
    #[arg(long)]
    free_text: Option<String>,
    /// Comma separated concomitant medications.
    #[arg(long)]
    meds: Option<String>,
    #[arg(long)]
    consent: bool,
    #[arg(long, value_parser = parse_language)]
    lang: Option<Language>,
    /// Overrides the configured host used to pick the deployment.
    #[arg(long)]
    host: Option<String>,
    /// Follow-up answer as ID=yes|no|unknown; repeat for several.
    #[arg(long = "answer", value_parser = parse_answer)]
    answers: Vec<(QuestionId, Answer)>,
    /// Clear the saved form before anything else.
    #[arg(long)]
    clear: bool,
}

impl Args {
    fn has_form_input(&self) -> bool {
        self.chief_complaint.is_some()
            || !self.symptoms.is_empty()
            || self.free_text.is_some()
            || self.meds.is_some()
            || self.consent
    }

    fn intake_events(&self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        if self.clear {
            events.push(UiEvent::Clear);
        }
        if let Some(language) = self.lang {
            events.push(UiEvent::SwitchLanguage(language));
        }
        if let Some(text) = &self.chief_complaint {
            events.push(UiEvent::UpdateField(FieldUpdate::ChiefComplaint(text.clone())));
        }
        events.extend(self.symptoms.iter().map(|tag| UiEvent::ToggleSymptom {
            tag: TagId::new(tag.as_str()),
            selected: true,
        }));
        if let Some(text) = &self.free_text {
            events.push(UiEvent::UpdateField(FieldUpdate::FreeText(text.clone())));
        }
        if let Some(text) = &self.meds {
            events.push(UiEvent::UpdateField(FieldUpdate::ConcomitantMeds(text.clone())));
        }
        if self.consent {
            events.push(UiEvent::UpdateField(FieldUpdate::Consent(true)));
        }
        if self.has_form_input() || !self.clear {
            events.push(UiEvent::Submit);
        }
        events
    }

    fn followup_events(&self) -> Vec<UiEvent> {
        let mut events: Vec<UiEvent> = self
            .answers
            .iter()
            .map(|(question_id, answer)| UiEvent::AnswerFollowup {
                question_id: question_id.clone(),
                answer: *answer,
            })
            .collect();
        events.push(UiEvent::SubmitFollowup);
        events
    }
}

fn parse_language(raw: &str) -> Result<Language, String> {
    Language::from_code(raw).ok_or_else(|| format!("unsupported language '{raw}' (use ja or en)"))
}

fn parse_answer(raw: &str) -> Result<(QuestionId, Answer), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=yes|no|unknown, got '{raw}'"))?;
    let answer =
        Answer::from_code(value).ok_or_else(|| format!("unknown answer '{value}' for '{id}'"))?;
    Ok((QuestionId::new(id.trim()), answer))
}

/// Keeps the latest results markup; everything else goes to stderr.
#[derive(Default)]
struct TerminalPage {
    results: String,
}

impl RenderTarget for TerminalPage {
    fn show_results(&mut self, markup: &str) {
        self.results = markup.to_string();
    }

    fn show_field_errors(&mut self, errors: &[FieldError]) {
        for error in errors {
            eprintln!("  {}: {}", error.field.element_id(), error.message);
        }
    }

    fn clear_field_errors(&mut self) {}

    fn set_submit_busy(&mut self, busy: bool) {
        if busy {
            eprintln!("...");
        }
    }

    fn notify(&mut self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => eprintln!("[ok] {}", notification.message),
            NotificationLevel::Error => eprintln!("[error] {}", notification.message),
        }
    }

    fn show_form(&mut self, form: &FormSnapshot) {
        if !form.chief_complaint.is_empty() {
            eprintln!("restored form: {}", form.chief_complaint);
        }
    }
}

async fn run_events(
    controller: Controller<TerminalPage>,
    events: Vec<UiEvent>,
    autosave_every: Duration,
) -> Result<Controller<TerminalPage>> {
    let (events_tx, events_rx) = mpsc::channel(events.len() + 1);
    for event in events.into_iter().chain([UiEvent::Shutdown]) {
        events_tx
            .send(event)
            .await
            .context("controller event queue closed")?;
    }
    Ok(controller.run(events_rx, autosave_every).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(host) = &args.host {
        settings.host = host.clone();
    }
    let deployment = settings.deployment();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(deployment.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::info!(?deployment, host = %settings.host, "starting intake");

    let storage = Storage::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open local store '{}'", settings.database_url))?;
    storage.health_check().await?;
    let client = DiagnosisClient::from_settings(&settings)?;
    let persistence =
        FormPersistence::new(Arc::new(storage)).with_expiry(settings.form_expiry());
    let services = Services::new(Arc::new(client), persistence);
    let autosave_every = settings.autosave_interval();

    let controller = Controller::start(TerminalPage::default(), services).await;
    let mut controller = run_events(controller, args.intake_events(), autosave_every).await?;

    if !args.answers.is_empty() {
        if controller.state().phase == Phase::Rendered {
            controller = run_events(controller, args.followup_events(), autosave_every).await?;
        } else {
            tracing::warn!("skipping follow-up answers; no results to answer");
        }
    }

    println!("{}", controller.target().results);
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
