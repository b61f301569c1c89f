//! Pure markup builders for the results area. Every string that came from the
//! user or the webhook passes through [`escape_html`].

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use shared::{
    catalog::Messages,
    domain::{
        Answer, AuditInfo, Citation, DiagnosisResult, Language, PrescriptionChoice, Question,
        QuestionId,
    },
    error::ErrorKind,
};

mod labels;

pub use labels::Labels;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `YYYY/MM/DD HH:MM:SS` in the local time zone.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y/%m/%d %H:%M:%S")
        .to_string()
}

/// Cards, then follow-up questions, then alternatives, then the audit line.
/// Empty sections are omitted. `answers` pre-checks the matching radios.
pub fn render_results(
    result: &DiagnosisResult,
    answers: &HashMap<QuestionId, Answer>,
    language: Language,
) -> String {
    let labels = Labels::for_language(language);
    let mut html = String::new();

    for (index, choice) in result.top_choices.iter().enumerate() {
        html.push_str(&render_card(choice, index, labels));
    }
    if !result.follow_up_questions.is_empty() {
        html.push_str(&render_followups(&result.follow_up_questions, answers, labels));
    }
    if !result.alternatives.is_empty() {
        html.push_str(&render_alternatives(&result.alternatives, labels));
    }
    if let Some(audit) = &result.audit_info {
        html.push_str(&render_audit(audit, labels));
    }

    html
}

fn render_card(choice: &PrescriptionChoice, index: usize, labels: &Labels) -> String {
    let source_tag = [choice.chapter.as_deref(), choice.id.as_deref()]
        .into_iter()
        .flatten()
        .map(escape_html)
        .collect::<Vec<_>>()
        .join(" ");
    let citations: String = choice
        .citations
        .iter()
        .map(|citation| render_citation(citation, labels))
        .collect();

    format!(
        r#"<div class="card prescription-card" data-rank="{rank}">
<div class="card-header"><h6 class="text-prescription">{name}</h6><span class="score-badge">{percent}%</span><small class="chapter-id">{source_tag}</small></div>
<div class="card-body"><p class="card-text">{why}</p>{citations}{safety}</div>
</div>
"#,
        rank = index + 1,
        name = escape_html(&choice.name_jp),
        percent = choice.percent(),
        why = escape_html(&choice.why),
        safety = render_safety_notes(&choice.safety_notes, labels),
    )
}

fn render_citation(citation: &Citation, labels: &Labels) -> String {
    let source = [citation.chapter.as_deref(), citation.id.as_deref()]
        .into_iter()
        .flatten()
        .map(escape_html)
        .collect::<Vec<_>>()
        .join(" - ");

    format!(
        r#"<div class="quote-block" aria-label="{aria}"><div class="quote-chinese">{zh}</div><div class="quote-japanese">{ja}<span class="translation-badge">{badge}</span></div><div class="quote-source">{source}</div></div>"#,
        aria = labels.citation_aria,
        zh = escape_html(&citation.zh),
        ja = escape_html(&citation.ja),
        badge = labels.provisional_translation,
    )
}

fn render_safety_notes(notes: &[String], labels: &Labels) -> String {
    if notes.is_empty() {
        return String::new();
    }
    let items: String = notes
        .iter()
        .map(|note| format!(r#"<div class="alert-text">• {}</div>"#, escape_html(note)))
        .collect();
    format!(
        r#"<div class="safety-notes"><div class="alert-heading">{}</div>{items}</div>"#,
        labels.safety_heading
    )
}

fn render_followups(
    questions: &[Question],
    answers: &HashMap<QuestionId, Answer>,
    labels: &Labels,
) -> String {
    let mut html = format!(
        r#"<div class="card followup-card"><div class="card-header"><h6>{}</h6></div><div class="card-body">"#,
        labels.followup_heading
    );

    for question in questions {
        let id = escape_html(question.id.as_str());
        let selected = answers.get(&question.id).copied();
        html.push_str(&format!(
            r#"<div class="followup-item"><div class="followup-question">{}</div><div class="followup-options">"#,
            escape_html(&question.question)
        ));
        for answer in Answer::ALL {
            let value = answer.code();
            let checked = if selected == Some(answer) { " checked" } else { "" };
            html.push_str(&format!(
                r#"<div class="followup-option"><input type="radio" name="followup_{id}" id="followup_{id}_{value}" value="{value}"{checked}><label for="followup_{id}_{value}">{label}</label></div>"#,
                label = labels.answer(answer),
            ));
        }
        html.push_str("</div></div>");
    }

    html.push_str(&format!(
        r#"<button type="button" id="submit-followup-btn">{}</button></div></div>
"#,
        labels.submit_answers
    ));
    html
}

fn render_alternatives(alternatives: &[PrescriptionChoice], labels: &Labels) -> String {
    let items: String = alternatives
        .iter()
        .map(|alt| {
            format!(
                r#"<div class="alternative-card"><div class="alternative-name">{}</div><div class="alternative-score">{}: {}%</div></div>"#,
                escape_html(&alt.name_jp),
                labels.score,
                alt.percent()
            )
        })
        .collect();
    format!(
        r#"<div class="card alternatives-card"><div class="card-header"><h6>{}</h6></div><div class="card-body">{items}</div></div>
"#,
        labels.alternatives_heading
    )
}

fn render_audit(audit: &AuditInfo, labels: &Labels) -> String {
    format!(
        r#"<div class="audit-info"><span class="audit-item">{}: {}ms</span><span class="audit-item">{}: {}</span><span class="audit-item">{}: {}</span></div>
"#,
        labels.response_time,
        audit.response_time_ms,
        labels.reference_count,
        audit.reference_count.unwrap_or(0),
        labels.timestamp,
        format_timestamp(audit.timestamp),
    )
}

pub fn render_loading(language: Language) -> String {
    let labels = Labels::for_language(language);
    format!(
        r#"<div class="card"><div class="card-body results-loading"><div class="spinner-border" role="status"><span class="visually-hidden">{}</span></div><p>{}</p></div></div>
"#,
        labels.loading_hidden, labels.loading
    )
}

pub fn render_initial(language: Language) -> String {
    format!(
        r#"<div class="card"><div class="card-body text-center text-muted"><p>{}</p></div></div>
"#,
        Labels::for_language(language).initial_prompt
    )
}

pub fn render_error(kind: ErrorKind, messages: &Messages, language: Language) -> String {
    let labels = Labels::for_language(language);
    format!(
        r#"<div class="card border-danger" data-error="{code}"><div class="card-body text-center"><h5 class="text-danger">{heading}</h5><p class="text-muted">{message}</p><button type="button" class="retry-btn">{retry}</button></div></div>
"#,
        code = kind.code(),
        heading = labels.error_heading,
        message = escape_html(&messages.error_text(kind, language)),
        retry = labels.retry,
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
