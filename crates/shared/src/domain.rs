use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id_newtype!(TagId);
string_id_newtype!(QuestionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl Language {
    pub const SUPPORTED: [Language; 2] = [Language::Ja, Language::En];

    pub fn code(self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "ja" => Some(Language::Ja),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One page load worth of interaction. The id never changes once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    session_id: SessionId,
}

impl Session {
    pub fn start() -> Self {
        Self {
            session_id: SessionId::generate(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

/// Identifies a form control; the string form matches the element ids the
/// markup layer uses for field-level error feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    ChiefComplaint,
    SymptomTags,
    FreeText,
    ConcomitantMeds,
    Consent,
}

impl FormField {
    pub fn element_id(self) -> &'static str {
        match self {
            FormField::ChiefComplaint => "chief-complaint",
            FormField::SymptomTags => "symptom-tags-container",
            FormField::FreeText => "free-text",
            FormField::ConcomitantMeds => "concomitant-meds",
            FormField::Consent => "consent-check",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormSnapshot {
    pub chief_complaint: String,
    /// Insertion ordered, no duplicates.
    pub symptom_tags: Vec<TagId>,
    pub free_text: String,
    pub concomitant_meds: String,
    pub consent: bool,
    pub language: Language,
}

impl FormSnapshot {
    pub fn empty(language: Language) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    pub fn has_tag(&self, tag: &TagId) -> bool {
        self.symptom_tags.contains(tag)
    }

    pub fn set_tag(&mut self, tag: TagId, selected: bool) {
        let present = self.has_tag(&tag);
        if selected && !present {
            self.symptom_tags.push(tag);
        } else if !selected && present {
            self.symptom_tags.retain(|existing| existing != &tag);
        }
    }

    /// Comma separated medication entries, trimmed, empties dropped.
    pub fn medication_list(&self) -> Vec<String> {
        self.concomitant_meds
            .split(',')
            .map(str::trim)
            .filter(|med| !med.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
    Unknown,
}

impl Answer {
    pub const ALL: [Answer; 3] = [Answer::Yes, Answer::No, Answer::Unknown];

    pub fn code(self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::Unknown => "unknown",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Answer::Yes),
            "no" => Some(Answer::No),
            "unknown" => Some(Answer::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultLimits {
    pub max_top_choices: usize,
    pub max_alternatives: usize,
    pub max_followup_questions: usize,
}

impl Default for ResultLimits {
    fn default() -> Self {
        Self {
            max_top_choices: 3,
            max_alternatives: 5,
            max_followup_questions: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosisResult {
    #[serde(alias = "top_choices", deserialize_with = "null_as_default")]
    pub top_choices: Vec<PrescriptionChoice>,
    #[serde(deserialize_with = "null_as_default")]
    pub alternatives: Vec<PrescriptionChoice>,
    #[serde(
        alias = "follow_up_questions",
        alias = "followups",
        deserialize_with = "null_as_default"
    )]
    pub follow_up_questions: Vec<Question>,
    #[serde(alias = "model_version", deserialize_with = "flexible_string")]
    pub model_version: Option<String>,
    #[serde(alias = "data_version", deserialize_with = "flexible_string")]
    pub data_version: Option<String>,
    /// Computed locally after each response; never read from the wire.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub audit_info: Option<AuditInfo>,
}

impl DiagnosisResult {
    /// Truncates the lists to the display limits and clamps scores into `[0, 1]`.
    pub fn normalized(mut self, limits: ResultLimits) -> Self {
        self.top_choices.truncate(limits.max_top_choices);
        self.alternatives.truncate(limits.max_alternatives);
        self.follow_up_questions
            .truncate(limits.max_followup_questions);
        for choice in self
            .top_choices
            .iter_mut()
            .chain(self.alternatives.iter_mut())
        {
            choice.score = clamp_score(choice.score);
        }
        self
    }

    pub fn citation_count(&self) -> usize {
        self.top_choices
            .iter()
            .map(|choice| choice.citations.len())
            .sum()
    }

    pub fn has_question(&self, id: &QuestionId) -> bool {
        self.follow_up_questions
            .iter()
            .any(|question| &question.id == id)
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescriptionChoice {
    #[serde(deserialize_with = "flexible_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    pub chapter: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub name_jp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub why: String,
    #[serde(deserialize_with = "null_as_default")]
    pub citations: Vec<Citation>,
    #[serde(deserialize_with = "null_as_default")]
    pub safety_notes: Vec<String>,
}

impl PrescriptionChoice {
    pub fn percent(&self) -> i64 {
        (self.score * 100.0).round() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Citation {
    #[serde(deserialize_with = "null_as_default")]
    pub zh: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ja: String,
    #[serde(deserialize_with = "flexible_string")]
    pub chapter: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(deserialize_with = "question_id")]
    pub id: QuestionId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditInfo {
    #[serde(rename = "responseTime")]
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_count: Option<u32>,
}

/// Reads an explicit `null` the same as an absent key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

fn flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        StringOrNumber::Text(text) if text.trim().is_empty() => None,
        StringOrNumber::Text(text) => Some(text),
        StringOrNumber::Number(number) => Some(number.to_string()),
    }))
}

fn question_id<'de, D>(deserializer: D) -> Result<QuestionId, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(text) => Ok(QuestionId(text)),
        StringOrNumber::Number(number) => Ok(QuestionId(number.to_string())),
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
