use shared::domain::{Answer, Language};

/// Fixed copy of the results area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub citation_aria: &'static str,
    pub provisional_translation: &'static str,
    pub safety_heading: &'static str,
    pub followup_heading: &'static str,
    pub yes: &'static str,
    pub no: &'static str,
    pub unknown: &'static str,
    pub submit_answers: &'static str,
    pub alternatives_heading: &'static str,
    pub score: &'static str,
    pub response_time: &'static str,
    pub reference_count: &'static str,
    pub timestamp: &'static str,
    pub loading_hidden: &'static str,
    pub loading: &'static str,
    pub error_heading: &'static str,
    pub retry: &'static str,
    pub initial_prompt: &'static str,
}

const JA: Labels = Labels {
    citation_aria: "漢方の引用文献",
    provisional_translation: "仮訳",
    safety_heading: "注意事項",
    followup_heading: "追加質問",
    yes: "はい",
    no: "いいえ",
    unknown: "わからない",
    submit_answers: "回答を送信",
    alternatives_heading: "代替案",
    score: "スコア",
    response_time: "応答時間",
    reference_count: "参照件数",
    timestamp: "時刻",
    loading_hidden: "読み込み中...",
    loading: "診断結果を取得しています...",
    error_heading: "エラーが発生しました",
    retry: "再試行",
    initial_prompt: "左側のフォームに入力して診断を開始してください",
};

const EN: Labels = Labels {
    citation_aria: "Kampo classical citation",
    provisional_translation: "Provisional",
    safety_heading: "Precautions",
    followup_heading: "Follow-up questions",
    yes: "Yes",
    no: "No",
    unknown: "Not sure",
    submit_answers: "Submit answers",
    alternatives_heading: "Alternatives",
    score: "Score",
    response_time: "Response time",
    reference_count: "References",
    timestamp: "Time",
    loading_hidden: "Loading...",
    loading: "Retrieving diagnosis results...",
    error_heading: "An error occurred",
    retry: "Retry",
    initial_prompt: "Fill in the form on the left to start a diagnosis",
};

impl Labels {
    pub fn for_language(language: Language) -> &'static Labels {
        match language {
            Language::Ja => &JA,
            Language::En => &EN,
        }
    }

    pub fn answer(&self, answer: Answer) -> &'static str {
        match answer {
            Answer::Yes => self.yes,
            Answer::No => self.no,
            Answer::Unknown => self.unknown,
        }
    }
}
