//! services/api/src/app/mod.rs
//!
//! The application layer: state owners that orchestrate the ports on behalf of the
//! screens. Nothing in here knows about HTTP or WebSockets.

pub mod audio;
pub mod learning;
pub mod mistakes;
pub mod persistence;
pub mod shell;
pub mod sketch;

#[cfg(test)]
pub(crate) mod testing;

pub use audio::PlayableAudio;
pub use learning::{LearningViewer, LoadRequest};
pub use mistakes::MistakeManager;
pub use persistence::StudyStorage;
pub use shell::{AppShell, PendingFetch, ShellState};
pub use sketch::SketchPad;

use std::sync::Arc;
use study_aid_core::{
    domain::Language,
    locale::strings,
    ports::{AuthenticationService, ContentGenerationService, PortError, TextToSpeechService},
};

/// The adapters the application layer calls into.
#[derive(Clone)]
pub struct Services {
    pub content: Arc<dyn ContentGenerationService>,
    pub tts: Arc<dyn TextToSpeechService>,
    pub auth: Arc<dyn AuthenticationService>,
    pub storage: StudyStorage,
}

/// The user-facing outcome of a failed generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationError {
    MissingCredential,
    Failed,
}

impl GenerationError {
    pub fn message(&self, lang: Language) -> &'static str {
        let t = strings(lang);
        match self {
            GenerationError::MissingCredential => t.credential_missing,
            GenerationError::Failed => t.generation_failed,
        }
    }
}

impl From<&PortError> for GenerationError {
    fn from(err: &PortError) -> Self {
        if err.is_missing_credential() {
            GenerationError::MissingCredential
        } else {
            GenerationError::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_credential_gets_its_own_message() {
        assert_eq!(
            GenerationError::from(&PortError::MissingCredential),
            GenerationError::MissingCredential
        );
        for err in [
            PortError::Timeout(5),
            PortError::InvalidResponse("x".to_string()),
            PortError::Unexpected("x".to_string()),
        ] {
            assert_eq!(GenerationError::from(&err), GenerationError::Failed);
        }
        assert_eq!(
            GenerationError::MissingCredential.message(Language::En),
            strings(Language::En).credential_missing
        );
    }
}
