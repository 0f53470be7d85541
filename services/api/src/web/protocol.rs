//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server.
//! The browser sends user actions; the server answers with freshly rendered views.

use crate::web::views::View;
use serde::{Deserialize, Serialize};
use study_aid_core::domain::{AppSection, Language, LearningMode};
use utoipa::ToSchema;

//=========================================================================================
// Wire Enums
//=========================================================================================

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LanguageCode {
    Ko,
    En,
}

impl From<LanguageCode> for Language {
    fn from(code: LanguageCode) -> Self {
        match code {
            LanguageCode::Ko => Language::Ko,
            LanguageCode::En => Language::En,
        }
    }
}

impl From<Language> for LanguageCode {
    fn from(lang: Language) -> Self {
        match lang {
            Language::Ko => LanguageCode::Ko,
            Language::En => LanguageCode::En,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Setup,
    Dashboard,
    Learning,
    WrongAnswers,
    Notes,
}

impl From<SectionName> for AppSection {
    fn from(name: SectionName) -> Self {
        match name {
            SectionName::Setup => AppSection::Setup,
            SectionName::Dashboard => AppSection::Dashboard,
            SectionName::Learning => AppSection::Learning,
            SectionName::WrongAnswers => AppSection::WrongAnswers,
            SectionName::Notes => AppSection::Notes,
        }
    }
}

impl From<AppSection> for SectionName {
    fn from(section: AppSection) -> Self {
        match section {
            AppSection::Setup => SectionName::Setup,
            AppSection::Dashboard => SectionName::Dashboard,
            AppSection::Learning => SectionName::Learning,
            AppSection::WrongAnswers => SectionName::WrongAnswers,
            AppSection::Notes => SectionName::Notes,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModeName {
    Slides,
    Podcast,
}

impl From<ModeName> for LearningMode {
    fn from(name: ModeName) -> Self {
        match name {
            ModeName::Slides => LearningMode::Slides,
            ModeName::Podcast => LearningMode::Podcast,
        }
    }
}

impl From<LearningMode> for ModeName {
    fn from(mode: LearningMode) -> Self {
        match mode {
            LearningMode::Slides => ModeName::Slides,
            LearningMode::Podcast => ModeName::Podcast,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the user actions a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Asks for the current view without changing anything.
    Refresh,

    /// Submits the textbook setup form.
    Setup {
        grade: String,
        publisher: String,
        subject: String,
    },

    SetLanguage { lang: LanguageCode },

    /// Re-issues the unit fetch after a failure.
    Retry,

    Navigate { section: SectionName },

    SelectUnit { unit_id: String },

    SetMode { mode: ModeName },

    NextSlide,
    PrevSlide,
    ToggleNotes,

    /// Re-requests learning content after a failure.
    RetryLearning,

    OpenMistake { id: String },
    CloseMistake,

    SketchPress { x: f32, y: f32 },
    SketchMove { x: f32, y: f32 },
    SketchRelease,
    SketchColor { color: String },
    SketchWidth { width: u32 },
    SketchClear,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================
// NOTE: Podcast narration is sent as a raw Binary WAV frame, not as part of this enum.
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full screen to render.
    View { view: Box<View> },

    /// A blocking notification, e.g. a failed mistake analysis.
    Alert { message: String },

    /// Reports an invalid client message.
    Error { message: String },

    /// The sketch snapshot was exported and stored.
    SketchSaved { data_url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_actions_parse_from_tagged_json() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"setup","grade":"5","publisher":"Pearson","subject":"Science"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Setup {
                grade: "5".to_string(),
                publisher: "Pearson".to_string(),
                subject: "Science".to_string(),
            }
        );

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"set_language","lang":"en"}"#).unwrap();
        assert_eq!(msg, ClientMessage::SetLanguage { lang: LanguageCode::En });

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"navigate","section":"wrong_answers"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Navigate { section: SectionName::WrongAnswers });

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"sketch_move","x":1.5,"y":2}"#).unwrap();
        assert_eq!(msg, ClientMessage::SketchMove { x: 1.5, y: 2.0 });
    }

    #[test]
    fn unknown_actions_are_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"fly"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"set_language","lang":"fr"}"#).is_err());
    }

    #[test]
    fn server_messages_are_tagged() {
        let json = serde_json::to_value(ServerMessage::Alert {
            message: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "alert");
        assert_eq!(json["message"], "nope");
    }
}
