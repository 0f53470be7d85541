//! services/api/src/adapters/content_llm.rs
//!
//! This module contains the adapter for the content-generating LLM.
//! It implements the `ContentGenerationService` port from the `core` crate: unit lists,
//! slide decks and wrong-answer analysis, each requested with a declared JSON shape.

use crate::adapters::with_timeout;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrlArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::time::Duration;
use study_aid_core::{
    domain::{Language, MistakeAnalysis, Slide, TextbookInfo, Unit},
    ports::{ContentGenerationService, PortError, PortResult},
};
use tracing::debug;

const SYSTEM_INSTRUCTIONS: &str = "You are a curriculum assistant for school students. Always answer with JSON that matches the requested schema exactly, with no commentary.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiContentAdapter {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    timeout: Duration,
}

impl OpenAiContentAdapter {
    /// Creates a new `OpenAiContentAdapter`. A `None` client means no credential is configured.
    pub fn new(client: Option<Client<OpenAIConfig>>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    fn client(&self) -> PortResult<&Client<OpenAIConfig>> {
        self.client.as_ref().ok_or(PortError::MissingCredential)
    }

    /// Sends one chat request constrained to `schema` and returns the raw JSON text.
    async fn complete_json(
        &self,
        client: &Client<OpenAIConfig>,
        user_message: ChatCompletionRequestMessage,
        schema_name: &str,
        schema: Value,
    ) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            user_message,
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: schema_name.to_string(),
                    schema: Some(schema),
                    strict: None,
                },
            })
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan rule.
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
            .ok_or_else(|| {
                PortError::InvalidResponse("LLM response contained no text content.".to_string())
            })
    }
}

fn text_message(text: String) -> PortResult<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(text)
        .build()
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .into())
}

//=========================================================================================
// Prompts and Declared Response Shapes
//=========================================================================================

pub(crate) fn units_prompt(textbook: &TextbookInfo, lang: Language) -> String {
    format!(
        "List 5 major units for a {} grade {} textbook published by {}. Provide titles and short descriptions in {}.",
        textbook.grade,
        textbook.subject,
        textbook.publisher,
        lang.display_name()
    )
}

pub(crate) fn slides_prompt(unit_title: &str, grade: &str, lang: Language) -> String {
    format!(
        "Generate 5 presentation slides for the unit \"{}\" for a {} grade student. Each slide should have a title and 3 bullet points. Language: {}.",
        unit_title,
        grade,
        lang.display_name()
    )
}

pub(crate) fn analysis_prompt(lang: Language) -> String {
    format!(
        "Analyze this student's wrong answer. Extract the problem, identify the mistake, and provide a correct explanation in {}.",
        lang.display_name()
    )
}

fn units_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "units": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "title": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["id", "title", "description"]
                }
            }
        },
        "required": ["units"]
    })
}

fn slides_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "slides": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "content": { "type": "array", "items": { "type": "string" } },
                        "imagePrompt": { "type": "string" }
                    },
                    "required": ["title", "content"]
                }
            }
        },
        "required": ["slides"]
    })
}

fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "analysis": { "type": "string" },
            "correction": { "type": "string" }
        },
        "required": ["analysis", "correction"]
    })
}

//=========================================================================================
// "Impure" Response Payload Structs
//=========================================================================================

/// Models sometimes emit numeric ids even when asked for strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdPayload {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
struct UnitPayload {
    id: IdPayload,
    title: String,
    description: String,
}
impl UnitPayload {
    fn to_domain(self) -> Option<Unit> {
        let id = match self.id {
            IdPayload::Text(text) => text.trim().to_string(),
            IdPayload::Number(n) => n.to_string(),
        };
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();
        if id.is_empty() || title.is_empty() || description.is_empty() {
            return None;
        }
        Some(Unit {
            id,
            title,
            description,
        })
    }
}

#[derive(Deserialize)]
struct SlidePayload {
    title: String,
    #[serde(default)]
    content: Vec<String>,
    #[serde(rename = "imagePrompt", default)]
    image_prompt: Option<String>,
}
impl SlidePayload {
    fn to_domain(self) -> Option<Slide> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(Slide {
            title,
            content: self
                .content
                .into_iter()
                .map(|bullet| bullet.trim().to_string())
                .filter(|bullet| !bullet.is_empty())
                .collect(),
            image_prompt: self.image_prompt.filter(|prompt| !prompt.trim().is_empty()),
        })
    }
}

#[derive(Deserialize)]
struct AnalysisPayload {
    analysis: String,
    correction: String,
}

//=========================================================================================
// Response Parsing
//=========================================================================================

/// Strips a Markdown code fence if the model wrapped its JSON in one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Accepts either a bare JSON array or an object holding the array under `field`.
fn parse_listing<T: DeserializeOwned>(raw: &str, field: &str) -> PortResult<Vec<T>> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| PortError::InvalidResponse(e.to_string()))?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map.remove(field).ok_or_else(|| {
            PortError::InvalidResponse(format!("response has no '{}' field", field))
        })?,
        _ => {
            return Err(PortError::InvalidResponse(
                "response is neither an array nor an object".to_string(),
            ))
        }
    };
    serde_json::from_value(list).map_err(|e| PortError::InvalidResponse(e.to_string()))
}

pub(crate) fn parse_units(raw: &str) -> PortResult<Vec<Unit>> {
    let payloads: Vec<UnitPayload> = parse_listing(raw, "units")?;
    let units = payloads
        .into_iter()
        .map(UnitPayload::to_domain)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            PortError::InvalidResponse("a unit is missing its id, title or description".to_string())
        })?;
    if units.is_empty() {
        return Err(PortError::InvalidResponse("no units were generated".to_string()));
    }
    Ok(units)
}

pub(crate) fn parse_slides(raw: &str) -> PortResult<Vec<Slide>> {
    let payloads: Vec<SlidePayload> = parse_listing(raw, "slides")?;
    let slides = payloads
        .into_iter()
        .map(SlidePayload::to_domain)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| PortError::InvalidResponse("a slide is missing its title".to_string()))?;
    if slides.is_empty() {
        return Err(PortError::InvalidResponse("no slides were generated".to_string()));
    }
    Ok(slides)
}

pub(crate) fn parse_analysis(raw: &str) -> PortResult<MistakeAnalysis> {
    let payload: AnalysisPayload = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| PortError::InvalidResponse(e.to_string()))?;
    let analysis = payload.analysis.trim().to_string();
    let correction = payload.correction.trim().to_string();
    if analysis.is_empty() || correction.is_empty() {
        return Err(PortError::InvalidResponse(
            "analysis or correction is empty".to_string(),
        ));
    }
    Ok(MistakeAnalysis {
        analysis,
        correction,
    })
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentGenerationService for OpenAiContentAdapter {
    async fn generate_units(&self, textbook: &TextbookInfo, lang: Language) -> PortResult<Vec<Unit>> {
        let client = self.client()?;
        debug!(grade = %textbook.grade, subject = %textbook.subject, publisher = %textbook.publisher, %lang, "Requesting unit list");
        let raw = self
            .complete_json(
                client,
                text_message(units_prompt(textbook, lang))?,
                "unit_list",
                units_schema(),
            )
            .await?;
        parse_units(&raw)
    }

    async fn generate_slides(&self, unit_title: &str, grade: &str, lang: Language) -> PortResult<Vec<Slide>> {
        let client = self.client()?;
        debug!(unit_title, grade, %lang, "Requesting slide deck");
        let raw = self
            .complete_json(
                client,
                text_message(slides_prompt(unit_title, grade, lang))?,
                "slide_deck",
                slides_schema(),
            )
            .await?;
        parse_slides(&raw)
    }

    async fn analyze_wrong_answer(&self, image_data_uri: &str, lang: Language) -> PortResult<MistakeAnalysis> {
        let client = self.client()?;
        if !image_data_uri.starts_with("data:") {
            return Err(PortError::Unexpected(
                "the uploaded image is not a data URI".to_string(),
            ));
        }

        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(image_data_uri)
                    .detail(ImageDetail::High)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            )
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(analysis_prompt(lang))
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(vec![image_part.into(), text_part.into()])
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into();

        let raw = self
            .complete_json(client, user_message, "mistake_analysis", analysis_schema())
            .await?;
        parse_analysis(&raw)
    }
}
