use std::{collections::HashMap, fs, time::Duration};

use anyhow::Context;
use url::Url;

use crate::RetryPolicy;

pub const SETTINGS_FILE: &str = "intake.toml";
const DEFAULT_FORM_EXPIRY_HOURS: i64 = 24;

const TEST_WEBHOOK_URL: &str =
    "https://x-harumi-office.app.n8n.cloud/webhook-test/cd96acc0-ccfd-44fd-bf7c-27db3f87a203";
const LIVE_WEBHOOK_URL: &str =
    "https://x-harumi-office.app.n8n.cloud/webhook/cd96acc0-ccfd-44fd-bf7c-27db3f87a203";

/// Where the front-end is running, derived once from the host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    Development,
    Staging,
    Production,
}

impl Deployment {
    pub fn from_host(host: &str) -> Self {
        let host = host.trim().to_ascii_lowercase();
        if host == "localhost" || host == "127.0.0.1" {
            Deployment::Development
        } else if host.contains("staging") {
            Deployment::Staging
        } else {
            Deployment::Production
        }
    }

    pub fn default_webhook_url(self) -> &'static str {
        match self {
            Deployment::Development => TEST_WEBHOOK_URL,
            Deployment::Staging | Deployment::Production => LIVE_WEBHOOK_URL,
        }
    }

    pub fn debug_enabled(self) -> bool {
        !matches!(self, Deployment::Production)
    }

    pub fn default_log_filter(self) -> &'static str {
        if self.debug_enabled() {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub diagnosis: Url,
    pub followup: Url,
}

impl Endpoints {
    /// Follow-up answers go to the diagnosis webhook unless told otherwise.
    pub fn single(diagnosis: Url) -> Self {
        Self {
            followup: diagnosis.clone(),
            diagnosis,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub diagnosis_url: Option<String>,
    pub followup_url: Option<String>,
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub autosave_interval_ms: u64,
    pub form_expiry_hours: i64,
    pub database_url: String,
    pub app_version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            diagnosis_url: None,
            followup_url: None,
            request_timeout_ms: 90_000,
            max_retries: 3,
            retry_delay_ms: 1000,
            autosave_interval_ms: 5000,
            form_expiry_hours: DEFAULT_FORM_EXPIRY_HOURS,
            database_url: "sqlite://./data/intake.db".into(),
            app_version: "1.0.0".into(),
        }
    }
}

impl Settings {
    pub fn deployment(&self) -> Deployment {
        Deployment::from_host(&self.host)
    }

    pub fn endpoints(&self) -> anyhow::Result<Endpoints> {
        let diagnosis_raw = self
            .diagnosis_url
            .as_deref()
            .unwrap_or_else(|| self.deployment().default_webhook_url());
        let diagnosis = Url::parse(diagnosis_raw)
            .with_context(|| format!("invalid diagnosis url '{diagnosis_raw}'"))?;

        match self.followup_url.as_deref() {
            Some(raw) => Ok(Endpoints {
                diagnosis,
                followup: Url::parse(raw)
                    .with_context(|| format!("invalid follow-up url '{raw}'"))?,
            }),
            None => Ok(Endpoints::single(diagnosis)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms)
    }

    /// Falls back to the default window for zero, negative or out-of-range hours.
    pub fn form_expiry(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.form_expiry_hours)
            .filter(|expiry| *expiry > chrono::Duration::zero())
            .unwrap_or_else(|| {
                tracing::warn!(
                    hours = self.form_expiry_hours,
                    "ignoring unusable form expiry"
                );
                chrono::Duration::hours(DEFAULT_FORM_EXPIRY_HOURS)
            })
    }
}

/// Defaults, then `intake.toml` in the working directory, then `APP__*`
/// environment variables.
pub fn load_settings() -> Settings {
    let raw_file = fs::read_to_string(SETTINGS_FILE).ok();
    let env: HashMap<String, String> = std::env::vars().collect();
    settings_from_sources(raw_file.as_deref(), &env)
}

pub(crate) fn settings_from_sources(
    raw_file: Option<&str>,
    env: &HashMap<String, String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => {
                for (key, value) in file_cfg {
                    let value = match value {
                        toml::Value::String(text) => text,
                        other => other.to_string(),
                    };
                    apply_override(&mut settings, &key, value);
                }
            }
            Err(error) => {
                tracing::warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file");
            }
        }
    }

    for (key, value) in env {
        if let Some(key) = key.strip_prefix("APP__") {
            apply_override(&mut settings, &key.to_ascii_lowercase(), value.clone());
        }
    }

    settings
}

fn apply_override(settings: &mut Settings, key: &str, value: String) {
    match key {
        "host" => settings.host = value,
        "diagnosis_url" => settings.diagnosis_url = Some(value),
        "followup_url" => settings.followup_url = Some(value),
        "database_url" => settings.database_url = value,
        "app_version" => settings.app_version = value,
        "request_timeout_ms" => set_parsed(&mut settings.request_timeout_ms, key, &value),
        "max_retries" => set_parsed(&mut settings.max_retries, key, &value),
        "retry_delay_ms" => set_parsed(&mut settings.retry_delay_ms, key, &value),
        "autosave_interval_ms" => set_parsed(&mut settings.autosave_interval_ms, key, &value),
        "form_expiry_hours" => set_parsed(&mut settings.form_expiry_hours, key, &value),
        _ => {}
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => tracing::warn!(key, value, "ignoring non-numeric setting"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
