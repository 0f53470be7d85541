//! services/api/src/adapters/tts.rs
//!
//! This module contains the adapter for podcast-style narration.
//! It implements the `TextToSpeechService` port from the `core` crate: a short
//! narration script in a friendly classroom voice is written by the chat model, then spoken by the TTS model
//! with a voice preset chosen by language.

use crate::adapters::with_timeout;
use async_openai::{
    config::OpenAIConfig,
    types::audio::{CreateSpeechRequest, SpeechModel, SpeechResponseFormat, Voice},
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use std::time::Duration;
use study_aid_core::{
    domain::Language,
    ports::{PortError, PortResult, TextToSpeechService},
};
use tracing::{debug, warn};

/// The sample rate of the raw PCM the speech endpoint returns.
pub const PCM_SAMPLE_RATE: u32 = 24_000;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TextToSpeechService` port using the OpenAI TTS API.
#[derive(Clone)]
pub struct OpenAiTtsAdapter {
    client: Option<Client<OpenAIConfig>>,
    script_model: String,
    model: SpeechModel,
    voice_ko: Voice,
    voice_en: Voice,
    timeout: Duration,
}

impl OpenAiTtsAdapter {
    /// Creates a new `OpenAiTtsAdapter`. A `None` client means no credential is configured.
    pub fn new(
        client: Option<Client<OpenAIConfig>>,
        script_model: String,
        model: SpeechModel,
        voice_ko: Voice,
        voice_en: Voice,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            script_model,
            model,
            voice_ko,
            voice_en,
            timeout,
        }
    }

    fn voice_for(&self, lang: Language) -> Voice {
        match lang {
            Language::Ko => self.voice_ko.clone(),
            Language::En => self.voice_en.clone(),
        }
    }

    /// Turns the study material into something a friendly teacher would say out loud.
    async fn write_script(&self, client: &Client<OpenAIConfig>, text: &str, lang: Language) -> PortResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.script_model)
            .messages(vec![ChatCompletionRequestUserMessageArgs::default()
                .content(podcast_prompt(text, lang))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into()])
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = with_timeout(self.timeout, async {
            client
                .chat()
                .create(request)
                .await
                .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))
        })
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|script| !script.trim().is_empty())
            .ok_or_else(|| {
                PortError::InvalidResponse("Podcast script response contained no text.".to_string())
            })
    }

    /// Speaks a finished script, returning the raw PCM or `None` for an empty payload.
    async fn speak(&self, client: &Client<OpenAIConfig>, script: String, lang: Language) -> PortResult<Option<Vec<u8>>> {
        let request = CreateSpeechRequest {
            model: self.model.clone(),
            input: script,
            voice: self.voice_for(lang),
            response_format: Some(SpeechResponseFormat::Pcm),
            ..Default::default()
        };

        let response = with_timeout(self.timeout, async {
            client
                .audio()
                .speech()
                .create(request)
                .await
                .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))
        })
        .await?;

        if response.bytes.is_empty() {
            warn!("Speech response carried no audio payload.");
            return Ok(None);
        }
        Ok(Some(response.bytes.to_vec()))
    }
}

pub(crate) fn podcast_prompt(text: &str, lang: Language) -> String {
    format!(
        "Explain this study material like a friendly teacher in a podcast. Use {}. Reply with only the words to be spoken. Content: {}",
        lang.display_name(),
        text
    )
}

/// Maps a configured voice name onto a speech voice preset.
pub fn parse_voice(name: &str) -> Option<Voice> {
    match name.trim().to_lowercase().as_str() {
        "alloy" => Some(Voice::Alloy),
        "echo" => Some(Voice::Echo),
        "fable" => Some(Voice::Fable),
        "onyx" => Some(Voice::Onyx),
        "nova" => Some(Voice::Nova),
        "shimmer" => Some(Voice::Shimmer),
        _ => None,
    }
}

pub fn parse_speech_model(name: &str) -> Option<SpeechModel> {
    match name.trim().to_lowercase().as_str() {
        "tts-1" => Some(SpeechModel::Tts1),
        "tts-1-hd" => Some(SpeechModel::Tts1Hd),
        _ => None,
    }
}

//=========================================================================================
// `TextToSpeechService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextToSpeechService for OpenAiTtsAdapter {
    /// Returns raw 24 kHz 16-bit mono PCM, or `None` when the response carried no audio.
    async fn generate_podcast_audio(&self, text: &str, lang: Language) -> PortResult<Option<Vec<u8>>> {
        let client = self.client.as_ref().ok_or(PortError::MissingCredential)?;

        let script = self.write_script(client, text, lang).await?;
        debug!(%lang, chars = script.len(), "Podcast script written");

        self.speak(client, script, lang).await
    }
}
