//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        openai_client,
        tts::{parse_speech_model, parse_voice},
        FileStore, OpenAiContentAdapter, OpenAiTtsAdapter, SimulatedAuthenticator,
    },
    app::{Services, StudyStorage},
    config::Config,
    error::ApiError,
    web::{dispatch::spawn_unit_fetch, router, AppState},
};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open Durable Storage ---
    info!("Opening storage in {}", config.data_dir.display());
    let store = Arc::new(FileStore::open(&config.data_dir).await?);

    // --- 3. Initialize Service Adapters ---
    let client = openai_client(&config);
    if client.is_none() {
        warn!("OPENAI_API_KEY is not set; generation requests will report a missing credential.");
    }

    let voice = |name: &str| {
        parse_voice(name)
            .ok_or_else(|| ApiError::Internal(format!("Invalid TTS voice specified in config: '{}'", name)))
    };
    let speech_model = parse_speech_model(&config.tts_model).ok_or_else(|| {
        ApiError::Internal(format!("Invalid TTS model specified in config: '{}'", config.tts_model))
    })?;

    let content_adapter = Arc::new(OpenAiContentAdapter::new(
        client.clone(),
        config.content_model.clone(),
        config.request_timeout,
    ));
    let tts_adapter = Arc::new(OpenAiTtsAdapter::new(
        client,
        config.content_model.clone(),
        speech_model,
        voice(&config.tts_voice_ko)?,
        voice(&config.tts_voice_en)?,
        config.request_timeout,
    ));

    let services = Services {
        content: content_adapter,
        tts: tts_adapter,
        auth: Arc::new(SimulatedAuthenticator::new()),
        storage: StudyStorage::new(store),
    };

    // --- 4. Build the Shared AppState & Restore the Last Session ---
    let app_state = AppState::new(config.clone(), services).await;
    if let Some(pending) = app_state.shell.restore().await {
        spawn_unit_fetch(&app_state, pending);
    }

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:5173".parse::<HeaderValue>().map_err(|e| ApiError::Internal(e.to_string()))?)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // --- 5. Create the Web Router ---
    let app = router(app_state).layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
