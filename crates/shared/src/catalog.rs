//! Static configuration data: the symptom tag catalog and the localized
//! message table. Both are plain values so callers can inject smaller sets.

use std::collections::HashMap;

use crate::{
    domain::{Language, TagId},
    error::ErrorKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomTag {
    pub id: TagId,
    pub label_ja: String,
    pub label_en: String,
}

impl SymptomTag {
    pub fn new(id: &str, label_ja: &str, label_en: &str) -> Self {
        Self {
            id: TagId::from(id),
            label_ja: label_ja.to_string(),
            label_en: label_en.to_string(),
        }
    }

    pub fn label(&self, language: Language) -> &str {
        match language {
            Language::Ja => &self.label_ja,
            Language::En => &self.label_en,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    NetworkError,
    TimeoutError,
    ServerError,
    ValidationError,
    UnknownError,
    SubmissionSuccess,
    FollowupSuccess,
    FormCleared,
    FollowupUnanswered,
    ChiefComplaintRequired,
    ChiefComplaintTooLong,
    FreeTextTooLong,
    MedsInvalidCharacters,
    MedsTooLong,
    ConsentRequired,
}

impl MessageKey {
    pub fn for_error(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Network => MessageKey::NetworkError,
            ErrorKind::Timeout => MessageKey::TimeoutError,
            ErrorKind::Server => MessageKey::ServerError,
            ErrorKind::Validation => MessageKey::ValidationError,
            ErrorKind::Unknown => MessageKey::UnknownError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localized {
    pub ja: String,
    pub en: String,
}

impl Localized {
    pub fn new(ja: &str, en: &str) -> Self {
        Self {
            ja: ja.to_string(),
            en: en.to_string(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Ja => &self.ja,
            Language::En => &self.en,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Messages {
    entries: HashMap<MessageKey, Localized>,
}

impl Messages {
    pub fn builtin() -> Self {
        use MessageKey::*;

        let entries = [
            (
                NetworkError,
                Localized::new(
                    "ネットワークエラーが発生しました。接続を確認して再試行してください。",
                    "Network error occurred. Please check your connection and try again.",
                ),
            ),
            (
                TimeoutError,
                Localized::new(
                    "リクエストがタイムアウトしました。時間をおいて再試行してください。",
                    "Request timed out. Please try again after a moment.",
                ),
            ),
            (
                ServerError,
                Localized::new(
                    "サーバーエラーが発生しました。しばらくしてから再試行してください。",
                    "Server error occurred. Please try again later.",
                ),
            ),
            (
                ValidationError,
                Localized::new(
                    "入力内容に問題があります。確認して修正してください。",
                    "There is an issue with your input. Please review and correct.",
                ),
            ),
            (
                UnknownError,
                Localized::new(
                    "予期しないエラーが発生しました。",
                    "An unexpected error occurred.",
                ),
            ),
            (
                SubmissionSuccess,
                Localized::new(
                    "診断結果を取得しました。",
                    "Diagnosis results retrieved successfully.",
                ),
            ),
            (
                FollowupSuccess,
                Localized::new(
                    "追加情報を反映して結果を更新しました。",
                    "Results updated with additional information.",
                ),
            ),
            (
                FormCleared,
                Localized::new("フォームをクリアしました", "The form has been cleared."),
            ),
            (
                FollowupUnanswered,
                Localized::new(
                    "質問に回答してください",
                    "Please answer at least one question.",
                ),
            ),
            (
                ChiefComplaintRequired,
                Localized::new("主訴を入力してください", "Please enter chief complaint"),
            ),
            (
                ChiefComplaintTooLong,
                Localized::new(
                    "主訴は{limit}文字以内で入力してください",
                    "Chief complaint must be {limit} characters or fewer",
                ),
            ),
            (
                FreeTextTooLong,
                Localized::new(
                    "詳細症状は{limit}文字以内で入力してください",
                    "Detailed symptoms must be {limit} characters or fewer",
                ),
            ),
            (
                MedsInvalidCharacters,
                Localized::new(
                    "併用薬には漢字、ひらがな、カタカナ、英数字、カンマ、中点のみ使用できます",
                    "Medications may only contain kanji, kana, letters, digits, commas and middle dots",
                ),
            ),
            (
                MedsTooLong,
                Localized::new(
                    "併用薬は{limit}文字以内で入力してください",
                    "Medications must be {limit} characters or fewer",
                ),
            ),
            (
                ConsentRequired,
                Localized::new(
                    "利用規約への同意が必要です",
                    "Agreement to terms is required",
                ),
            ),
        ];

        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn with(mut self, key: MessageKey, text: Localized) -> Self {
        self.entries.insert(key, text);
        self
    }

    /// Missing keys fall back to the generic unknown-error text, then to the
    /// key name itself.
    pub fn text(&self, key: MessageKey, language: Language) -> String {
        self.entries
            .get(&key)
            .or_else(|| self.entries.get(&MessageKey::UnknownError))
            .map(|text| text.get(language).to_string())
            .unwrap_or_else(|| format!("{key:?}"))
    }

    pub fn text_with_limit(&self, key: MessageKey, language: Language, limit: usize) -> String {
        self.text(key, language)
            .replace("{limit}", &limit.to_string())
    }

    pub fn error_text(&self, kind: ErrorKind, language: Language) -> String {
        self.text(MessageKey::for_error(kind), language)
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub tags: Vec<SymptomTag>,
    pub messages: Messages,
}

impl Catalog {
    pub fn new(tags: Vec<SymptomTag>, messages: Messages) -> Self {
        Self { tags, messages }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_tags(), Messages::builtin())
    }

    pub fn contains(&self, id: &TagId) -> bool {
        self.tags.iter().any(|tag| &tag.id == id)
    }

    pub fn tag(&self, id: &TagId) -> Option<&SymptomTag> {
        self.tags.iter().find(|tag| &tag.id == id)
    }

    /// Keeps known ids in their given order, dropping unknowns and repeats.
    pub fn retain_known(&self, ids: impl IntoIterator<Item = TagId>) -> Vec<TagId> {
        let mut kept: Vec<TagId> = Vec::new();
        for id in ids {
            if self.contains(&id) && !kept.contains(&id) {
                kept.push(id);
            }
        }
        kept
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_tags() -> Vec<SymptomTag> {
    [
        ("pain_head", "頭痛", "Headache"),
        ("pain_back", "腰痛", "Back pain"),
        ("pain_joint", "関節痛", "Joint pain"),
        ("pain_stomach", "腹痛", "Stomach pain"),
        ("digestive_nausea", "吐き気", "Nausea"),
        ("digestive_diarrhea", "下痢", "Diarrhea"),
        ("digestive_constipation", "便秘", "Constipation"),
        ("digestive_heartburn", "胸やけ", "Heartburn"),
        ("respiratory_cough", "咳", "Cough"),
        ("respiratory_phlegm", "痰", "Phlegm"),
        ("respiratory_shortness", "息切れ", "Shortness of breath"),
        ("neurological_insomnia", "不眠", "Insomnia"),
        ("neurological_anxiety", "不安", "Anxiety"),
        ("neurological_depression", "うつ", "Depression"),
        ("neurological_dizziness", "めまい", "Dizziness"),
        ("cardiovascular_palpitations", "動悸", "Palpitations"),
        ("cardiovascular_chest_pain", "胸痛", "Chest pain"),
        ("skin_itching", "かゆみ", "Itching"),
        ("skin_rash", "発疹", "Rash"),
        ("skin_dryness", "乾燥", "Dry skin"),
        ("gynecological_irregular", "月経不順", "Irregular menstruation"),
        ("gynecological_pain", "月経痛", "Menstrual pain"),
        ("general_fatigue", "疲労", "Fatigue"),
        ("general_fever", "発熱", "Fever"),
        ("general_sweating", "発汗", "Sweating"),
        ("general_cold_sensitivity", "冷え性", "Cold sensitivity"),
    ]
    .into_iter()
    .map(|(id, ja, en)| SymptomTag::new(id, ja, en))
    .collect()
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
