use api_lib::{
    adapters::{MemoryStore, SimulatedAuthenticator},
    app::{Services, StudyStorage},
    config::Config,
    web::{
        dispatch::dispatch,
        protocol::{ClientMessage, LanguageCode, ModeName},
        router,
        state::Outbound,
        AppState,
    },
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use study_aid_core::{
    domain::{Language, MistakeAnalysis, Slide, TextbookInfo, Unit},
    ports::{ContentGenerationService, PortError, PortResult, TextToSpeechService},
};
use tower::ServiceExt;

// ==================== FAKES ====================

#[derive(Default)]
struct FakeContent {
    missing_credential: Mutex<bool>,
    unit_calls: Mutex<Vec<(TextbookInfo, Language)>>,
}

#[async_trait]
impl ContentGenerationService for FakeContent {
    async fn generate_units(&self, textbook: &TextbookInfo, lang: Language) -> PortResult<Vec<Unit>> {
        self.unit_calls.lock().unwrap().push((textbook.clone(), lang));
        if *self.missing_credential.lock().unwrap() {
            return Err(PortError::MissingCredential);
        }
        Ok((1..=5)
            .map(|i| Unit {
                id: i.to_string(),
                title: format!("Unit {}", i),
                description: format!("About unit {}", i),
            })
            .collect())
    }

    async fn generate_slides(&self, unit_title: &str, _grade: &str, _lang: Language) -> PortResult<Vec<Slide>> {
        Ok((1..=5)
            .map(|i| Slide {
                title: format!("{} / slide {}", unit_title, i),
                content: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                image_prompt: None,
            })
            .collect())
    }

    async fn analyze_wrong_answer(&self, _image_data_uri: &str, _lang: Language) -> PortResult<MistakeAnalysis> {
        Ok(MistakeAnalysis {
            analysis: "Dropped a minus sign".to_string(),
            correction: "Keep the sign when expanding".to_string(),
        })
    }
}

struct FakeTts;

#[async_trait]
impl TextToSpeechService for FakeTts {
    async fn generate_podcast_audio(&self, _text: &str, _lang: Language) -> PortResult<Option<Vec<u8>>> {
        Ok(Some(vec![0u8; 4_800]))
    }
}

struct TestApp {
    state: Arc<AppState>,
    content: Arc<FakeContent>,
    store: Arc<MemoryStore>,
}

async fn build_state(content: Arc<FakeContent>, store: Arc<MemoryStore>) -> Arc<AppState> {
    let services = Services {
        content: content.clone(),
        tts: Arc::new(FakeTts),
        auth: Arc::new(SimulatedAuthenticator::new()),
        storage: StudyStorage::new(store),
    };
    AppState::new(Arc::new(Config::default()), services).await
}

async fn build_test_app() -> TestApp {
    let content = Arc::new(FakeContent::default());
    let store = Arc::new(MemoryStore::new());
    let state = build_state(content.clone(), store.clone()).await;
    TestApp { state, content, store }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router(app.state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn login(app: &TestApp) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"email": "mina@example.com", "password": "secret"}).to_string(),
        ))
        .unwrap();
    send(app, request).await.0
}

async fn act(app: &TestApp, message: ClientMessage) {
    for task in dispatch(&app.state, message).await {
        task.await.unwrap();
    }
}

fn setup_message() -> ClientMessage {
    ClientMessage::Setup {
        grade: "5".to_string(),
        publisher: "Pearson".to_string(),
        subject: "Science".to_string(),
    }
}

// ==================== AUTH TESTS ====================

#[tokio::test]
async fn test_first_view_is_login() {
    let app = build_test_app().await;
    let (status, view) = get_json(&app, "/view").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["screen"]["screen"], "login");
    assert_eq!(view["chrome"]["navigation"], json!([]));
}

#[tokio::test]
async fn test_login_rejects_malformed_email() {
    let app = build_test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"email": "nope", "password": "x"}).to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_then_setup_screen() {
    let app = build_test_app().await;
    assert_eq!(login(&app).await, StatusCode::OK);

    let (_, view) = get_json(&app, "/view").await;
    assert_eq!(view["screen"]["screen"], "setup");
    assert_eq!(view["screen"]["grade"], "5");
    assert_eq!(view["chrome"]["user_name"], "mina");
}

#[tokio::test]
async fn test_protected_routes_need_a_user() {
    let app = build_test_app().await;
    let (status, _) = get_json(&app, "/mistakes").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get_json(&app, "/sketch").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_actions_are_ignored_while_logged_out() {
    let app = build_test_app().await;
    act(&app, setup_message()).await;
    act(&app, ClientMessage::SketchPress { x: 10.0, y: 10.0 }).await;
    act(&app, ClientMessage::SketchMove { x: 60.0, y: 10.0 }).await;

    assert!(app.content.unit_calls.lock().unwrap().is_empty());
    assert_eq!(app.state.services.storage.load_textbook().await, None);
    assert!(!app.state.sketch.lock().unwrap().drawing());

    let (_, view) = get_json(&app, "/view").await;
    assert_eq!(view["screen"]["screen"], "login");
}

// ==================== SHELL FLOW TESTS ====================

#[tokio::test]
async fn test_setup_fetches_units_for_the_exact_tuple() {
    let app = build_test_app().await;
    login(&app).await;
    act(&app, ClientMessage::SetLanguage { lang: LanguageCode::En }).await;
    act(&app, setup_message()).await;

    let calls = app.content.unit_calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![(
            TextbookInfo {
                grade: "5".to_string(),
                publisher: "Pearson".to_string(),
                subject: "Science".to_string(),
            },
            Language::En
        )]
    );

    let (_, view) = get_json(&app, "/view").await;
    assert_eq!(view["screen"]["screen"], "dashboard");
    assert_eq!(view["screen"]["units"].as_array().unwrap().len(), 5);
    assert_eq!(view["chrome"]["navigation"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_missing_credential_shows_message_and_retry_reissues() {
    let app = build_test_app().await;
    *app.content.missing_credential.lock().unwrap() = true;
    login(&app).await;
    act(&app, ClientMessage::SetLanguage { lang: LanguageCode::En }).await;
    act(&app, setup_message()).await;

    let (_, view) = get_json(&app, "/view").await;
    assert_eq!(view["screen"]["screen"], "error");
    assert_eq!(
        view["screen"]["message"],
        study_aid_core::strings(Language::En).credential_missing
    );

    *app.content.missing_credential.lock().unwrap() = false;
    act(&app, ClientMessage::Retry).await;

    let calls = app.content.unit_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
    let (_, view) = get_json(&app, "/view").await;
    assert_eq!(view["screen"]["screen"], "dashboard");
}

#[tokio::test]
async fn test_logout_then_restart_shows_login() {
    let app = build_test_app().await;
    login(&app).await;
    act(&app, setup_message()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    let restarted = build_state(Arc::new(FakeContent::default()), app.store.clone()).await;
    assert!(restarted.shell.restore().await.is_none());
    let restarted = TestApp {
        state: restarted,
        content: Arc::new(FakeContent::default()),
        store: app.store.clone(),
    };
    let (_, view) = get_json(&restarted, "/view").await;
    assert_eq!(view["screen"]["screen"], "login");
}

// ==================== LEARNING TESTS ====================

#[tokio::test]
async fn test_learning_slides_and_podcast_audio() {
    let app = build_test_app().await;
    login(&app).await;
    act(&app, setup_message()).await;
    act(&app, ClientMessage::SelectUnit { unit_id: "2".to_string() }).await;

    let (_, view) = get_json(&app, "/view").await;
    let learning = &view["screen"]["learning"];
    assert_eq!(view["screen"]["screen"], "learning");
    assert_eq!(learning["slide"]["page"], "1 / 5");
    assert_eq!(learning["can_prev"], false);
    assert_eq!(learning["caption"], "Pearson • Science");

    for _ in 0..8 {
        act(&app, ClientMessage::NextSlide).await;
    }
    let (_, view) = get_json(&app, "/view").await;
    assert_eq!(view["screen"]["learning"]["slide"]["page"], "5 / 5");
    assert_eq!(view["screen"]["learning"]["can_next"], false);

    let (status, _) = send(&app, Request::builder().uri("/learning/audio").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    act(&app, ClientMessage::SetMode { mode: ModeName::Podcast }).await;
    let response = router(app.state.clone())
        .oneshot(Request::builder().uri("/learning/audio").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..4], b"RIFF");
}

// ==================== MISTAKE TESTS ====================

#[tokio::test]
async fn test_mistake_upload_prepends_and_defaults_to_jpeg() {
    let app = build_test_app().await;
    login(&app).await;

    let boundary = "studyboundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"answer\"\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(&[0xff, 0xd8, 0xff, 0xe0]);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/mistakes")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, created) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&created).unwrap();
    assert!(created["imageUrl"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
    assert_eq!(created["analysis"], "Dropped a minus sign");

    let (_, list) = get_json(&app, "/mistakes").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], created["id"]);

    let (status, _) = get_json(&app, "/mistakes/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let app = build_test_app().await;
    login(&app).await;
    let request = Request::builder()
        .method("POST")
        .uri("/mistakes")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
        .body(Body::from("--x--\r\n"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==================== SKETCH TESTS ====================

#[tokio::test]
async fn test_sketch_release_saves_snapshot() {
    let app = build_test_app().await;
    login(&app).await;
    let mut events = app.state.events.subscribe();

    act(&app, ClientMessage::SketchPress { x: 10.0, y: 10.0 }).await;
    act(&app, ClientMessage::SketchMove { x: 60.0, y: 40.0 }).await;
    act(&app, ClientMessage::SketchRelease).await;

    let saved = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(Outbound::Text(api_lib::web::protocol::ServerMessage::SketchSaved { data_url })) =
                events.recv().await
            {
                return data_url;
            }
        }
    })
    .await
    .unwrap();
    assert!(saved.starts_with("data:image/png;base64,"));
    assert_eq!(app.state.services.storage.load_sketch().await, Some(saved));

    let (status, png) = send(&app, Request::builder().uri("/sketch").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}
