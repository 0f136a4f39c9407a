use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{routing::post, Json, Router};
use serde_json::{json, Value};

use super::common::*;
use crate::workflows::loan_review::evaluation::Action;
use crate::workflows::loan_review::narrative::{
    generate_within, template_explanation, NarrativeError, NarrativeGenerator, NarrativeRequest,
    OllamaNarrator, OllamaSettings, PolicyExcerpt, PromptTemplate, EXCERPT_PREVIEW_CHARS,
};

fn flag_request() -> NarrativeRequest {
    NarrativeRequest {
        facts: json!({ "credit_score": 550 }),
        reasons: vec![
            "Low credit score: 550.".to_string(),
            "High DTI ratio: 0.52.".to_string(),
        ],
        action: Action::Flag,
        excerpts: vec![PolicyExcerpt {
            title: "## Credit Score".to_string(),
            text: "x".repeat(300),
        }],
    }
}

#[test]
fn template_lists_reasons_then_citations() {
    let explanation = template_explanation(&flag_request());

    assert_eq!(
        explanation,
        "Decision: FLAG. Key reasons:\n  - Low credit score: 550.\n  - High DTI ratio: 0.52.\n  \
         * Policy cite: ## Credit Score\nSummary: Based on policy checks and risk signals, the \
         recommended action is FLAG."
    );
}

#[test]
fn template_without_excerpts_has_no_citations() {
    let mut request = flag_request();
    request.excerpts.clear();
    request.action = Action::Approve;

    let explanation = template_explanation(&request);

    assert!(!explanation.contains("Policy cite"));
    assert_template_explanation(&explanation, "APPROVE");
}

#[test]
fn prompt_substitutes_placeholders_and_appends_excerpts() {
    let template =
        PromptTemplate::custom("Facts: {facts}\nReasons:\n{reasons}\nAction: {action}\n\n");

    let prompt = template.render(&flag_request());

    let expected_head = "Facts: {\"credit_score\":550}\nReasons:\nLow credit score: 550.\n\
                         High DTI ratio: 0.52.\nAction: FLAG\n\nRelevant policy excerpts:\n\
                         - ## Credit Score: ";
    assert!(prompt.starts_with(expected_head), "{prompt}");
    assert_eq!(prompt.len(), expected_head.len() + EXCERPT_PREVIEW_CHARS);
}

#[test]
fn builtin_prompt_never_cites_excerpts() {
    let request = flag_request();
    assert!(!request.excerpts.is_empty());

    let prompt = PromptTemplate::builtin().render(&request);

    assert!(prompt.starts_with("You are a senior credit analyst."));
    assert!(prompt.contains("Final recommendation: FLAG"));
    assert!(!prompt.contains("Relevant policy excerpts"));
}

#[test]
fn prompt_template_loads_from_disk_or_falls_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("prompt.txt");
    std::fs::write(&path, "Explain {action}").expect("write prompt");

    assert_eq!(PromptTemplate::load(Some(&path)), PromptTemplate::custom("Explain {action}"));
    assert_eq!(PromptTemplate::load(None), PromptTemplate::builtin());
    assert_eq!(
        PromptTemplate::load(Some(&dir.path().join("missing.txt"))),
        PromptTemplate::builtin()
    );
}

#[test]
fn generate_within_returns_prompt_answers() {
    let result = generate_within(
        Arc::new(FixedNarrator("Approved after review.")),
        flag_request(),
        Duration::from_secs(1),
    );

    assert_eq!(result.expect("fast backend answers"), "Approved after review.");
}

#[test]
fn generate_within_gives_up_after_timeout() {
    let timeout = Duration::from_millis(50);
    let result = generate_within(
        Arc::new(SlowNarrator(Duration::from_millis(500))),
        flag_request(),
        timeout,
    );

    match result {
        Err(NarrativeError::Timeout(waited)) => assert_eq!(waited, timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn generate_within_reports_crashed_workers() {
    let result = generate_within(
        Arc::new(PanickingNarrator),
        flag_request(),
        Duration::from_secs(1),
    );

    assert!(matches!(result, Err(NarrativeError::WorkerLost)));
}

#[test]
fn ollama_narrator_reports_unreachable_daemon() {
    let settings = OllamaSettings {
        base_url: "http://127.0.0.1:9".to_string(),
        model: "tinyllama".to_string(),
        timeout: Duration::from_secs(2),
    };
    let narrator = OllamaNarrator::new(settings, PromptTemplate::builtin());

    let result = narrator.generate(&flag_request());

    assert!(matches!(
        result,
        Err(NarrativeError::Transport(_)) | Err(NarrativeError::Timeout(_))
    ));
}

type Captured = Arc<Mutex<Vec<Value>>>;

async fn spawn_stub_ollama(captured: Captured) -> String {
    let app = Router::new().route(
        "/api/generate",
        post(move |Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                let model = body["model"].as_str().unwrap_or_default().to_string();
                captured.lock().expect("capture mutex").push(body);
                match model.as_str() {
                    "broken" => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
                    "silent" => (axum::http::StatusCode::OK, Json(json!({ "done": true }))),
                    _ => (
                        axum::http::StatusCode::OK,
                        Json(json!({ "response": "  1. Credit is weak.\n2. DTI is high.  " })),
                    ),
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    format!("http://{addr}/")
}

fn narrator_for(base_url: &str, model: &str) -> OllamaNarrator {
    OllamaNarrator::new(
        OllamaSettings {
            base_url: base_url.to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(5),
        },
        PromptTemplate::builtin(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_narrator_posts_rendered_prompt() {
    let captured = Captured::default();
    let base_url = spawn_stub_ollama(captured.clone()).await;

    let narrator = narrator_for(&base_url, "llama3");
    let result = tokio::task::spawn_blocking(move || narrator.generate(&flag_request()))
        .await
        .expect("blocking task");

    assert_eq!(result.expect("stub answers"), "1. Credit is weak.\n2. DTI is high.");

    let bodies = captured.lock().expect("capture mutex").clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], "llama3");
    assert_eq!(bodies[0]["stream"], false);
    let prompt = bodies[0]["prompt"].as_str().unwrap_or_default();
    assert!(prompt.contains("Final recommendation: FLAG"));
    assert!(!prompt.contains("Relevant policy excerpts"));
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_narrator_maps_http_failures() {
    let base_url = spawn_stub_ollama(Captured::default()).await;

    let broken = narrator_for(&base_url, "broken");
    let silent = narrator_for(&base_url, "silent");
    let (broken, silent) = tokio::task::spawn_blocking(move || {
        (broken.generate(&flag_request()), silent.generate(&flag_request()))
    })
    .await
    .expect("blocking task");

    assert!(matches!(broken, Err(NarrativeError::Status(500))));
    assert!(matches!(silent, Err(NarrativeError::Malformed(_))));
}
