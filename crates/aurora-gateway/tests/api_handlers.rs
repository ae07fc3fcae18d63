//! `/api` handlers served through the full server stack with an in-memory
//! store and a scripted AI provider.

use async_trait::async_trait;
use aurora_gateway::auth::ADMIN_COOKIE;
use aurora_gateway::gateway::SESSION_COOKIE;
use aurora_gateway::server::{GatewayServer, ServerConfig};
use aurora_gateway::store::{InMemoryJsonStore, KEY_AI_CONFIG, KEY_RESULTS};
use aurora_kernel::llm::{CompletionProvider, CompletionRequest, ProviderError, TokenStream};
use aurora_kernel::storage::JsonStore;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const IP: &str = "192.0.2.10";
const UA: &str = "api-handler-tests";

struct ScriptedProvider {
    reply: String,
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String, ProviderError> {
        Ok(self.reply.clone())
    }

    async fn stream(&self, _request: CompletionRequest) -> Result<TokenStream, ProviderError> {
        let parts: Vec<Result<String, ProviderError>> = self
            .reply
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(Box::pin(futures::stream::iter(parts)))
    }
}

struct Harness {
    app: Router,
    store: Arc<InMemoryJsonStore>,
    server: GatewayServer,
}

fn harness(admin_password: Option<&str>) -> Harness {
    let store = Arc::new(InMemoryJsonStore::new());
    let config = ServerConfig {
        session_secret: Some("handler-test-secret".into()),
        admin_password: admin_password.map(str::to_string),
        ..Default::default()
    };
    let server = GatewayServer::new(config, store.clone()).unwrap();
    Harness {
        app: server.router(),
        store,
        server,
    }
}

fn with_provider(h: &Harness, reply: &str) {
    h.server.state().ai.replace(Arc::new(ScriptedProvider {
        reply: reply.to_string(),
    }));
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::get(uri)
        .header("x-forwarded-for", IP)
        .header(header::USER_AGENT, UA)
}

fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri)
        .header("x-forwarded-for", IP)
        .header(header::USER_AGENT, UA)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(h: &Harness, req: Request<Body>) -> Response<Body> {
    h.app.clone().oneshot(req).await.unwrap()
}

async fn body_json(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn cookie_named(resp: &Response<Body>, name: &str) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// A valid visitor session, obtained the way a browser would.
async fn visitor_session(h: &Harness) -> String {
    let resp = send(h, get("/api/health").body(Body::empty()).unwrap()).await;
    cookie_named(&resp, SESSION_COOKIE).unwrap()
}

#[tokio::test]
async fn health_reports_ai_configuration() {
    let h = harness(None);
    let resp = send(&h, get("/api/health").body(Body::empty()).unwrap()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["version"], "v1");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ai_configured"], false);
}

#[tokio::test]
async fn builtin_bank_until_one_is_stored() {
    let h = harness(None);
    let body = body_json(send(&h, get("/api/questions").body(Body::empty()).unwrap()).await).await;
    assert_eq!(body["source"], "builtin");
    assert_eq!(body["locale"], "en");
    assert_eq!(body["questions"].as_array().unwrap().len(), 12);

    h.store
        .write(
            "questions-zh",
            &json!([{ "id": "z1", "text": "我喜欢聚会", "dimension": "EI" }]),
        )
        .await
        .unwrap();
    let zh = body_json(
        send(&h, get("/api/questions?locale=zh").body(Body::empty()).unwrap()).await,
    )
    .await;
    assert_eq!(zh["source"], "locale");
    assert_eq!(zh["questions"][0]["id"], "z1");

    let bad = send(&h, get("/api/questions?locale=xx").body(Body::empty()).unwrap()).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn results_are_scored_recorded_and_counted() {
    let h = harness(None);
    let answers = json!({
        "answers": [
            { "dimension": "EI", "score": -2 },
            { "dimension": "SN", "score": -1 },
            { "dimension": "TF", "score": 3 },
            { "dimension": "JP", "score": 2 }
        ]
    });
    let resp = send(&h, post_json("/api/results", None, answers)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["mbti_type"], "INTJ");
    assert_eq!(body["dimensions"].as_array().unwrap().len(), 4);

    let stored = h.store.read(KEY_RESULTS).await.unwrap().unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["id"], body["result_id"]);

    let stats = h.server.state().stats().await.unwrap();
    assert_eq!(stats.results, 1);
    assert_eq!(stats.types.get("INTJ"), Some(&1));

    let invalid = send(
        &h,
        post_json("/api/results", None, json!({ "answers": [{ "dimension": "EI", "score": 9 }] })),
    )
    .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    let malformed = send(&h, post_json("/api/results", None, json!({ "nope": true }))).await;
    assert_eq!(body_json(malformed).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn ai_endpoints_answer_not_configured_without_a_provider() {
    let h = harness(None);
    let session = visitor_session(&h).await;
    let resp = send(
        &h,
        post_json("/api/analysis", Some(&session), json!({ "mbti_type": "enfp" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(resp).await["error"]["code"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn generated_questions_are_parsed_and_bounded() {
    let h = harness(None);
    with_provider(
        &h,
        "Here you go:\n```json\n[{\"text\": \"I love parties\", \"dimension\": \"EI\"}, \
         {\"text\": \"I plan ahead\", \"dimension\": \"JP\"}]\n```",
    );
    let session = visitor_session(&h).await;

    let resp = send(
        &h,
        post_json("/api/questions/generate", Some(&session), json!({ "count": 5 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["source"], "generated");
    assert_eq!(body["questions"][1]["id"], "ai-2");
    assert_eq!(h.server.state().stats().await.unwrap().questions_generated, 2);

    let too_many = send(
        &h,
        post_json("/api/questions/generate", Some(&session), json!({ "count": 500 })),
    )
    .await;
    assert_eq!(too_many.status(), StatusCode::BAD_REQUEST);

    with_provider(&h, "sorry, I cannot help with that");
    let unusable = send(
        &h,
        post_json("/api/questions/generate", Some(&session), json!({})),
    )
    .await;
    assert_eq!(unusable.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn analysis_whole_and_streamed() {
    let h = harness(None);
    with_provider(&h, "Curious and warm.");
    let session = visitor_session(&h).await;

    let whole = send(
        &h,
        post_json("/api/analysis", Some(&session), json!({ "mbti_type": "enfp" })),
    )
    .await;
    let body = body_json(whole).await;
    assert_eq!(body["mbti_type"], "ENFP");
    assert_eq!(body["analysis"], "Curious and warm.");

    let bad_type = send(
        &h,
        post_json("/api/analysis", Some(&session), json!({ "mbti_type": "ABCD" })),
    )
    .await;
    assert_eq!(bad_type.status(), StatusCode::BAD_REQUEST);

    let streamed = send(
        &h,
        post_json("/api/analysis/stream", Some(&session), json!({ "mbti_type": "INTP" })),
    )
    .await;
    assert_eq!(streamed.status(), StatusCode::OK);
    assert!(
        streamed.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    let bytes = to_bytes(streamed.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: delta"));
    assert!(text.contains(r#"{"delta":"Curious "}"#));
    assert!(text.trim_end().ends_with("data: [DONE]"));
    assert_eq!(h.server.state().stats().await.unwrap().analyses, 2);
}

#[tokio::test]
async fn unknown_api_paths_and_methods_use_the_envelope() {
    let h = harness(None);
    let missing = send(&h, get("/api/nothing-here").body(Body::empty()).unwrap()).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await["error"]["code"], "NOT_FOUND");

    let wrong_method = send(&h, post_json("/api/health", None, json!({}))).await;
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(wrong_method).await["error"]["code"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn admin_panel_requires_configuration() {
    let h = harness(None);
    let resp = send(&h, post_json("/api/admin/login", None, json!({ "password": "x" }))).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let stats = send(&h, get("/api/admin/stats").body(Body::empty()).unwrap()).await;
    assert_eq!(body_json(stats).await["error"]["code"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn admin_login_and_protected_routes() {
    let h = harness(Some("open sesame"));

    let wrong = send(&h, post_json("/api/admin/login", None, json!({ "password": "nope" }))).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let anonymous = send(&h, get("/api/admin/stats").body(Body::empty()).unwrap()).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let login = send(
        &h,
        post_json("/api/admin/login", None, json!({ "password": "open sesame" })),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);
    let admin = cookie_named(&login, ADMIN_COOKIE).unwrap();

    let session = body_json(
        send(
            &h,
            get("/api/admin/session")
                .header(header::COOKIE, &admin)
                .body(Body::empty())
                .unwrap(),
        )
        .await,
    )
    .await;
    assert_eq!(session["authenticated"], true);

    // Replace the shared bank, then visitors see it.
    let bank = json!({
        "questions": [
            { "id": "c1", "text": "Custom one", "dimension": "TF" },
            { "id": "c2", "text": "Custom two", "dimension": "JP" }
        ]
    });
    let put = send(&h, post_json("/api/admin/questions", Some(&admin), bank)).await;
    assert_eq!(put.status(), StatusCode::OK);
    let listed = body_json(send(&h, get("/api/questions").body(Body::empty()).unwrap()).await).await;
    assert_eq!(listed["source"], "stored");
    assert_eq!(listed["questions"][0]["id"], "c1");

    let duplicate = json!({
        "questions": [
            { "id": "d", "text": "One", "dimension": "TF" },
            { "id": "d", "text": "Two", "dimension": "TF" }
        ]
    });
    let rejected = send(&h, post_json("/api/admin/questions", Some(&admin), duplicate)).await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let stats = send(
        &h,
        get("/api/admin/stats")
            .header(header::COOKIE, &admin)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(stats.status(), StatusCode::OK);
    assert_eq!(body_json(stats).await["stored_results"], 0);

    // A stolen admin cookie does not work from another client.
    let elsewhere = send(
        &h,
        Request::get("/api/admin/stats")
            .header("x-forwarded-for", "203.0.113.200")
            .header(header::USER_AGENT, UA)
            .header(header::COOKIE, &admin)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(elsewhere.status(), StatusCode::UNAUTHORIZED);

    let logout = send(&h, post_json("/api/admin/logout", Some(&admin), json!({}))).await;
    let cleared = logout.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cleared.starts_with(&format!("{ADMIN_COOKIE}=;")));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn admin_ai_config_persists_without_the_key() {
    let h = harness(Some("pw"));
    let login = send(&h, post_json("/api/admin/login", None, json!({ "password": "pw" }))).await;
    let admin = cookie_named(&login, ADMIN_COOKIE).unwrap();

    let resp = send(
        &h,
        post_json(
            "/api/admin/ai-config",
            Some(&admin),
            json!({
                "api_key": "sk-live-123",
                "model": "gpt-4.1-mini",
                "base_url": "https://llm.example.com/v1/",
                "temperature": 0.3
            }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view = body_json(resp).await;
    assert_eq!(view["api_key_set"], true);
    assert_eq!(view["configured"], true);
    assert_eq!(view["base_url"], "https://llm.example.com/v1");
    assert!(view.get("api_key").is_none());

    let persisted = h.store.read(KEY_AI_CONFIG).await.unwrap().unwrap();
    assert_eq!(persisted["model"], "gpt-4.1-mini");
    assert!(!persisted.to_string().contains("sk-live-123"));

    let invalid = send(
        &h,
        post_json("/api/admin/ai-config", Some(&admin), json!({ "temperature": 7.0 })),
    )
    .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.server.state().ai.settings().temperature, 0.3);
}
