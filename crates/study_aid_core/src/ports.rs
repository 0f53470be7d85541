//! crates/study_aid_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like storage or AI APIs.

use async_trait::async_trait;
use crate::domain::{Credentials, Language, MistakeAnalysis, Slide, TextbookInfo, Unit, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., storage, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The generation credential is not configured. Detected before any request is sent.
    #[error("The generation API credential is missing")]
    MissingCredential,
    #[error("The remote response was malformed: {0}")]
    InvalidResponse(String),
    #[error("The remote call timed out after {0} seconds")]
    Timeout(u64),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, PortError::MissingCredential)
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Lists the major units of a textbook. Expected to return five, each with a
    /// non-empty id, title and description.
    async fn generate_units(&self, textbook: &TextbookInfo, lang: Language) -> PortResult<Vec<Unit>>;

    /// Generates a slide deck (five slides of three bullets) for one unit.
    async fn generate_slides(&self, unit_title: &str, grade: &str, lang: Language) -> PortResult<Vec<Slide>>;

    /// Analyzes a photographed wrong answer given as a `data:` URI.
    async fn analyze_wrong_answer(&self, image_data_uri: &str, lang: Language) -> PortResult<MistakeAnalysis>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Narrates the text as a podcast-style explanation.
    ///
    /// Returns raw 16-bit mono PCM, or `None` when the remote response carried no audio.
    async fn generate_podcast_audio(&self, text: &str, lang: Language) -> PortResult<Option<Vec<u8>>>;
}

/// Durable per-profile key-value storage of serialized state.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait AuthenticationService: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> PortResult<User>;
}
