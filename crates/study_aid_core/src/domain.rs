//! crates/study_aid_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use std::fmt;
use std::str::FromStr;

/// Represents the learner using the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

// Only used for login - never stored
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// The (grade, publisher, subject) tuple that drives every generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextbookInfo {
    pub grade: String,
    pub publisher: String,
    pub subject: String,
}

/// One top-level topic within a textbook configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// A single presentation page generated for a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub title: String,
    pub content: Vec<String>,
    pub image_prompt: Option<String>,
}

/// What the analysis model said about an uploaded wrong answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistakeAnalysis {
    pub analysis: String,
    pub correction: String,
}

/// A logged incorrect-answer image plus its analysis and correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrongAnswer {
    pub id: String,
    /// The uploaded image as a `data:` URI.
    pub image_url: String,
    pub analysis: String,
    pub correction: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppSection {
    Setup,
    Dashboard,
    Learning,
    WrongAnswers,
    Notes,
}

impl AppSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppSection::Setup => "setup",
            AppSection::Dashboard => "dashboard",
            AppSection::Learning => "learning",
            AppSection::WrongAnswers => "wrong_answers",
            AppSection::Notes => "notes",
        }
    }
}

/// How the learning viewer presents a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LearningMode {
    #[default]
    Slides,
    Podcast,
}

/// UI and generation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl Language {
    /// The short code used in storage and on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
        }
    }

    /// The language name embedded in generation instructions.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Ko => "Korean",
            Language::En => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown language code: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ko" => Ok(Language::Ko),
            "en" => Ok(Language::En),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}
