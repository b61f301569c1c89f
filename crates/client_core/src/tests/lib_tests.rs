use super::*;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode as HttpStatus},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{Answer, Language, QuestionId, TagId};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct MockWebhook {
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<(String, Value)>>>,
    content_types: Arc<Mutex<Vec<String>>>,
    /// Popped per request; the last entry keeps answering once the rest are used.
    responses: Arc<Mutex<VecDeque<(HttpStatus, String)>>>,
    delay: Duration,
}

impl MockWebhook {
    fn answering(responses: Vec<(u16, String)>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (HttpStatus::from_u16(status).expect("status"), body))
                    .collect(),
            )),
            ..Self::default()
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn webhook_handler(
    State(state): State<MockWebhook>,
    axum::extract::OriginalUri(uri): axum::extract::OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (HttpStatus, String) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().await.push((uri.path().to_string(), body));
    if let Some(content_type) = headers.get("content-type") {
        state
            .content_types
            .lock()
            .await
            .push(content_type.to_str().unwrap_or_default().to_string());
    }
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let mut responses = state.responses.lock().await;
    if responses.len() > 1 {
        responses.pop_front().expect("response")
    } else {
        responses
            .front()
            .cloned()
            .unwrap_or((HttpStatus::OK, "[]".to_string()))
    }
}

async fn spawn_webhook(state: MockWebhook) -> Endpoints {
    let app = Router::new()
        .route("/diagnosis", post(webhook_handler))
        .route("/followup", post(webhook_handler))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    Endpoints {
        diagnosis: Url::parse(&format!("http://{addr}/diagnosis")).expect("url"),
        followup: Url::parse(&format!("http://{addr}/followup")).expect("url"),
    }
}

fn success_body(name: &str, score: f64) -> String {
    json!([{
        "message": {
            "content": {
                "topChoices": [{
                    "id": "K-1",
                    "chapter": "太陽病",
                    "name_jp": name,
                    "score": score,
                    "why": "根拠",
                    "citations": [
                        {"zh": "原文", "ja": "訳文", "chapter": "第31条", "id": "c1"},
                        {"zh": "原文2", "ja": "訳文2", "chapter": "第32条", "id": "c2"}
                    ],
                    "safety_notes": ["妊婦には慎重に"]
                }],
                "followUpQuestions": [{"id": "q1", "question": "汗をかきますか？"}],
                "modelVersion": "kampo-1"
            }
        }
    }])
    .to_string()
}

fn back_pain_form() -> FormSnapshot {
    let mut form = FormSnapshot::empty(Language::Ja);
    form.chief_complaint = "腰痛".into();
    form.set_tag(TagId::from("pain_back"), true);
    form.consent = true;
    form
}

fn client(endpoints: Endpoints) -> DiagnosisClient {
    DiagnosisClient::new(endpoints)
        .with_retry_policy(RetryPolicy::none())
        .with_app_version("1.0.0")
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        retry_delay: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn diagnosis_success_returns_content_with_audit_info() {
    let webhook = MockWebhook::answering(vec![(200, success_body("葛根湯", 0.874))]);
    let endpoints = spawn_webhook(webhook.clone()).await;
    let session_id = SessionId::generate();

    let result = client(endpoints)
        .submit_diagnosis(&back_pain_form(), session_id)
        .await
        .expect("diagnosis");

    assert_eq!(result.top_choices.len(), 1);
    assert_eq!(result.top_choices[0].name_jp, "葛根湯");
    assert_eq!(result.follow_up_questions[0].id, QuestionId::from("q1"));
    let audit = result.audit_info.expect("audit info");
    assert_eq!(audit.session_id, session_id);
    assert_eq!(audit.reference_count, Some(2));
    assert!(audit.timestamp <= Utc::now());

    assert_eq!(webhook.hits(), 1);
    let bodies = webhook.bodies.lock().await;
    let (path, body) = &bodies[0];
    assert_eq!(path, "/diagnosis");
    assert_eq!(body["chief_complaint"], "腰痛");
    assert_eq!(body["symptoms"], json!(["pain_back"]));
    assert_eq!(body["session_id"], session_id.to_string());
    assert_eq!(body["lang"], "ja");
    assert_eq!(body["app_version"], "1.0.0");
    assert_eq!(
        webhook.content_types.lock().await[0],
        "application/json"
    );
}

#[tokio::test]
async fn followup_posts_answers_to_followup_endpoint() {
    let webhook = MockWebhook::answering(vec![(200, success_body("桂枝湯", 0.5))]);
    let endpoints = spawn_webhook(webhook.clone()).await;
    let session_id = SessionId::generate();
    let answers = vec![FollowupAnswer {
        id: QuestionId::from("q1"),
        value: Answer::No,
    }];

    let result = client(endpoints)
        .submit_followup(session_id, &answers)
        .await
        .expect("followup");

    assert_eq!(result.top_choices[0].name_jp, "桂枝湯");
    let bodies = webhook.bodies.lock().await;
    let (path, body) = &bodies[0];
    assert_eq!(path, "/followup");
    assert_eq!(
        body,
        &json!({"session_id": session_id.to_string(), "answers": [{"id": "q1", "value": "no"}]})
    );
}

#[tokio::test]
async fn server_error_is_classified_as_server() {
    let webhook = MockWebhook::answering(vec![(500, "boom".into())]);
    let endpoints = spawn_webhook(webhook.clone()).await;

    let error = client(endpoints)
        .submit_diagnosis(&back_pain_form(), SessionId::generate())
        .await
        .expect_err("server error");

    assert!(matches!(error, ClientError::Server(500)));
    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(webhook.hits(), 1);
}

#[tokio::test]
async fn server_errors_are_retried_up_to_the_policy_limit() {
    let webhook = MockWebhook::answering(vec![(502, "bad gateway".into())]);
    let endpoints = spawn_webhook(webhook.clone()).await;

    let error = client(endpoints)
        .with_retry_policy(fast_retries(2))
        .submit_diagnosis(&back_pain_form(), SessionId::generate())
        .await
        .expect_err("server error");

    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(webhook.hits(), 3);
}

#[tokio::test]
async fn retry_recovers_after_transient_server_error() {
    let webhook = MockWebhook::answering(vec![
        (503, "unavailable".into()),
        (200, success_body("葛根湯", 0.9)),
    ]);
    let endpoints = spawn_webhook(webhook.clone()).await;

    let result = client(endpoints)
        .with_retry_policy(fast_retries(3))
        .submit_diagnosis(&back_pain_form(), SessionId::generate())
        .await
        .expect("recovered");

    assert_eq!(result.top_choices[0].name_jp, "葛根湯");
    assert_eq!(webhook.hits(), 2);
}

#[tokio::test]
async fn other_statuses_are_unknown_and_not_retried() {
    let webhook = MockWebhook::answering(vec![(404, "missing".into())]);
    let endpoints = spawn_webhook(webhook.clone()).await;

    let error = client(endpoints)
        .with_retry_policy(fast_retries(3))
        .submit_diagnosis(&back_pain_form(), SessionId::generate())
        .await
        .expect_err("not found");

    assert!(matches!(error, ClientError::Status(404)));
    assert_eq!(error.kind(), ErrorKind::Unknown);
    assert_eq!(webhook.hits(), 1);
}

#[tokio::test]
async fn slow_webhook_times_out_without_retry() {
    let webhook = MockWebhook::answering(vec![(200, success_body("葛根湯", 0.9))])
        .delayed(Duration::from_millis(500));
    let endpoints = spawn_webhook(webhook.clone()).await;

    let error = client(endpoints)
        .with_timeout(Duration::from_millis(50))
        .with_retry_policy(fast_retries(3))
        .submit_diagnosis(&back_pain_form(), SessionId::generate())
        .await
        .expect_err("timeout");

    assert!(matches!(error, ClientError::Timeout(_)));
    assert_eq!(error.kind(), ErrorKind::Timeout);
    assert_eq!(webhook.hits(), 1);
}

#[tokio::test]
async fn refused_connection_is_classified_as_network() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let endpoints =
        Endpoints::single(Url::parse(&format!("http://{addr}/diagnosis")).expect("url"));

    let error = client(endpoints)
        .with_retry_policy(fast_retries(1))
        .submit_diagnosis(&back_pain_form(), SessionId::generate())
        .await
        .expect_err("network");

    assert!(matches!(error, ClientError::Network(_)), "{error}");
    assert_eq!(error.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn malformed_or_empty_body_is_unknown() {
    for body in ["<html>oops</html>", "[]", r#"{"message": {}}"#] {
        let webhook = MockWebhook::answering(vec![(200, body.to_string())]);
        let endpoints = spawn_webhook(webhook).await;

        let error = client(endpoints)
            .submit_diagnosis(&back_pain_form(), SessionId::generate())
            .await
            .expect_err("decode");

        assert!(matches!(error, ClientError::Decode(_)), "{body}: {error}");
        assert_eq!(error.kind(), ErrorKind::Unknown);
    }
}

#[tokio::test]
async fn oversized_lists_are_truncated() {
    let choices: Vec<Value> = (0..6)
        .map(|i| json!({"name_jp": format!("処方{i}"), "score": 0.5}))
        .collect();
    let body = json!([{"message": {"content": {"topChoices": choices, "alternatives": choices}}}]);
    let webhook = MockWebhook::answering(vec![(200, body.to_string())]);
    let endpoints = spawn_webhook(webhook).await;

    let result = client(endpoints)
        .submit_diagnosis(&back_pain_form(), SessionId::generate())
        .await
        .expect("diagnosis");

    assert_eq!(result.top_choices.len(), 3);
    assert_eq!(result.alternatives.len(), 5);
}

#[test]
fn retry_policy_only_retries_transient_kinds() {
    let policy = fast_retries(2);
    assert!(policy.should_retry(0, &ClientError::Network("refused".into())));
    assert!(policy.should_retry(1, &ClientError::Server(500)));
    assert!(!policy.should_retry(2, &ClientError::Server(500)));
    assert!(!policy.should_retry(0, &ClientError::Timeout(Duration::from_secs(90))));
    assert!(!policy.should_retry(0, &ClientError::Status(400)));
    assert!(!policy.should_retry(0, &ClientError::Decode("bad".into())));
    assert!(!RetryPolicy::none().should_retry(0, &ClientError::Server(500)));
}

#[test]
fn default_request_timeout_is_ninety_seconds() {
    assert_eq!(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis(90_000));
    assert_eq!(RetryPolicy::default().max_retries, 3);
}
