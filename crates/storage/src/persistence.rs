//! Best-effort persistence of the intake form, language preference and
//! session id. Storage failures are logged and swallowed.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{null_as_default, FormSnapshot, Language, SessionId, TagId};
use tracing::{debug, warn};

use crate::{SlotKey, SlotStore};

pub const DEFAULT_FORM_EXPIRY_HOURS: i64 = 24;

/// On-disk shape of the form slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredForm {
    #[serde(deserialize_with = "null_as_default")]
    pub chief_complaint: String,
    #[serde(deserialize_with = "null_as_default")]
    pub symptom_tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub free_text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub concomitant_meds: String,
    #[serde(deserialize_with = "null_as_default")]
    pub consent: bool,
    /// Save time in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl StoredForm {
    pub fn capture(form: &FormSnapshot, saved_at: DateTime<Utc>) -> Self {
        Self {
            chief_complaint: form.chief_complaint.clone(),
            symptom_tags: form
                .symptom_tags
                .iter()
                .map(|tag| tag.as_str().to_string())
                .collect(),
            free_text: form.free_text.clone(),
            concomitant_meds: form.concomitant_meds.clone(),
            consent: form.consent,
            timestamp: Some(saved_at.timestamp_millis()),
        }
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    }

    pub fn into_snapshot(self, language: Language) -> FormSnapshot {
        FormSnapshot {
            chief_complaint: self.chief_complaint,
            symptom_tags: self.symptom_tags.into_iter().map(TagId).collect(),
            free_text: self.free_text,
            concomitant_meds: self.concomitant_meds,
            consent: self.consent,
            language,
        }
    }
}

#[derive(Clone)]
pub struct FormPersistence {
    store: Arc<dyn SlotStore>,
    expiry: Duration,
}

impl FormPersistence {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self {
            store,
            expiry: Duration::hours(DEFAULT_FORM_EXPIRY_HOURS),
        }
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn store(&self) -> &Arc<dyn SlotStore> {
        &self.store
    }

    pub async fn save(&self, form: &FormSnapshot) {
        self.save_at(form, Utc::now()).await;
    }

    pub async fn save_at(&self, form: &FormSnapshot, now: DateTime<Utc>) {
        let stored = StoredForm::capture(form, now);
        let raw = match serde_json::to_string(&stored) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "failed to encode form snapshot");
                return;
            }
        };
        if let Err(error) = self.store.put(SlotKey::FormData, &raw).await {
            warn!(%error, "failed to save form data");
        }
    }

    /// The saved form, unless missing, corrupt or older than the expiry window.
    /// The returned snapshot carries `language`, which is not part of the slot.
    pub async fn load(&self, language: Language) -> Option<FormSnapshot> {
        self.load_at(language, Utc::now()).await
    }

    pub async fn load_at(&self, language: Language, now: DateTime<Utc>) -> Option<FormSnapshot> {
        let raw = match self.store.get(SlotKey::FormData).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                warn!(%error, "failed to load form data");
                return None;
            }
        };

        let stored: StoredForm = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(error) => {
                warn!(%error, "discarding unreadable form data");
                return None;
            }
        };

        let saved_at = stored.saved_at()?;
        if now - saved_at >= self.expiry {
            debug!(%saved_at, "saved form data expired");
            return None;
        }

        Some(stored.into_snapshot(language))
    }

    /// Removes the form slot only; language and session id stay.
    pub async fn clear(&self) {
        if let Err(error) = self.store.remove(SlotKey::FormData).await {
            warn!(%error, "failed to clear form data");
        }
    }

    pub async fn save_language(&self, language: Language) {
        if let Err(error) = self.store.put(SlotKey::Language, language.code()).await {
            warn!(%error, "failed to save language preference");
        }
    }

    pub async fn load_language(&self) -> Option<Language> {
        match self.store.get(SlotKey::Language).await {
            Ok(Some(code)) => Language::from_code(&code),
            Ok(None) => None,
            Err(error) => {
                warn!(%error, "failed to load language preference");
                None
            }
        }
    }

    pub async fn save_session_id(&self, session_id: SessionId) {
        if let Err(error) = self
            .store
            .put(SlotKey::SessionId, &session_id.to_string())
            .await
        {
            warn!(%error, "failed to save session id");
        }
    }

    pub async fn load_session_id(&self) -> Option<String> {
        match self.store.get(SlotKey::SessionId).await {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, "failed to load session id");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/persistence_tests.rs"]
mod tests;
