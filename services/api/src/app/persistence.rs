//! services/api/src/app/persistence.rs
//!
//! Typed access to the durable key-value store. Values are stored as JSON under
//! fixed keys; absent or malformed entries read back as unset.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use study_aid_core::{
    domain::{Language, TextbookInfo, User, WrongAnswer},
    ports::{KeyValueStore, PortError, PortResult},
};
use tracing::warn;

pub const USER_KEY: &str = "ai_study_user";
pub const TEXTBOOK_KEY: &str = "ai_study_textbook";
pub const LANGUAGE_KEY: &str = "ai_study_lang";
pub const MISTAKES_KEY: &str = "ai_study_mistakes";
pub const SKETCH_KEY: &str = "ai_study_sketch";

//=========================================================================================
// "Impure" Storage Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct UserRecord {
    id: String,
    email: String,
    name: String,
}
impl UserRecord {
    fn from_domain(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            name: self.name,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TextbookRecord {
    grade: String,
    publisher: String,
    subject: String,
}
impl TextbookRecord {
    fn from_domain(info: &TextbookInfo) -> Self {
        Self {
            grade: info.grade.clone(),
            publisher: info.publisher.clone(),
            subject: info.subject.clone(),
        }
    }
    fn to_domain(self) -> TextbookInfo {
        TextbookInfo {
            grade: self.grade,
            publisher: self.publisher,
            subject: self.subject,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WrongAnswerRecord {
    id: String,
    image_url: String,
    analysis: String,
    correction: String,
    timestamp: i64,
}
impl WrongAnswerRecord {
    fn from_domain(item: &WrongAnswer) -> Self {
        Self {
            id: item.id.clone(),
            image_url: item.image_url.clone(),
            analysis: item.analysis.clone(),
            correction: item.correction.clone(),
            timestamp: item.timestamp,
        }
    }
    fn to_domain(self) -> WrongAnswer {
        WrongAnswer {
            id: self.id,
            image_url: self.image_url,
            analysis: self.analysis,
            correction: self.correction,
            timestamp: self.timestamp,
        }
    }
}

//=========================================================================================
// StudyStorage
//=========================================================================================

/// The persistence adapter the application talks to.
#[derive(Clone)]
pub struct StudyStorage {
    store: Arc<dyn KeyValueStore>,
}

impl StudyStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads and decodes a key, treating read failures and malformed JSON as absence.
    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read '{}' from storage: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring malformed '{}' entry: {}", key, e);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> PortResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.set(key, raw).await
    }

    pub async fn load_user(&self) -> Option<User> {
        self.read::<UserRecord>(USER_KEY).await.map(UserRecord::to_domain)
    }

    pub async fn save_user(&self, user: &User) -> PortResult<()> {
        self.write(USER_KEY, &UserRecord::from_domain(user)).await
    }

    pub async fn clear_user(&self) -> PortResult<()> {
        self.store.remove(USER_KEY).await
    }

    pub async fn load_textbook(&self) -> Option<TextbookInfo> {
        self.read::<TextbookRecord>(TEXTBOOK_KEY)
            .await
            .map(TextbookRecord::to_domain)
    }

    pub async fn save_textbook(&self, info: &TextbookInfo) -> PortResult<()> {
        self.write(TEXTBOOK_KEY, &TextbookRecord::from_domain(info)).await
    }

    pub async fn clear_textbook(&self) -> PortResult<()> {
        self.store.remove(TEXTBOOK_KEY).await
    }

    pub async fn load_language(&self) -> Option<Language> {
        let code: String = self.read(LANGUAGE_KEY).await?;
        match code.parse() {
            Ok(lang) => Some(lang),
            Err(e) => {
                warn!("Ignoring stored language: {}", e);
                None
            }
        }
    }

    pub async fn save_language(&self, lang: Language) -> PortResult<()> {
        self.write(LANGUAGE_KEY, &lang.code()).await
    }

    /// Newest first, as stored.
    pub async fn load_mistakes(&self) -> Vec<WrongAnswer> {
        self.read::<Vec<WrongAnswerRecord>>(MISTAKES_KEY)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(WrongAnswerRecord::to_domain)
            .collect()
    }

    pub async fn save_mistakes(&self, items: &[WrongAnswer]) -> PortResult<()> {
        let records: Vec<WrongAnswerRecord> = items.iter().map(WrongAnswerRecord::from_domain).collect();
        self.write(MISTAKES_KEY, &records).await
    }

    pub async fn load_sketch(&self) -> Option<String> {
        self.read(SKETCH_KEY).await
    }

    pub async fn save_sketch(&self, data_url: &str) -> PortResult<()> {
        self.write(SKETCH_KEY, &data_url).await
    }
}
