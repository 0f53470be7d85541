pub mod auth;
pub mod content_llm;
pub mod store;
pub mod tts;

pub use auth::SimulatedAuthenticator;
pub use content_llm::OpenAiContentAdapter;
pub use store::{FileStore, MemoryStore};
pub use tts::OpenAiTtsAdapter;

use crate::config::Config;
use async_openai::{config::OpenAIConfig, Client};
use std::future::Future;
use std::time::Duration;
use study_aid_core::ports::{PortError, PortResult};

/// Builds the shared OpenAI-compatible client, or `None` when no credential is configured.
pub fn openai_client(config: &Config) -> Option<Client<OpenAIConfig>> {
    let api_key = config.openai_api_key.as_ref()?;
    let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = &config.openai_api_base {
        openai_config = openai_config.with_api_base(base);
    }
    Some(Client::with_config(openai_config))
}

/// Bounds a remote call so a hung request surfaces as a failure instead of an endless wait.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> PortResult<T>
where
    F: Future<Output = PortResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PortError::Timeout(limit.as_secs())),
    }
}
