//! services/api/src/app/mistakes.rs
//!
//! The mistake log: photographed wrong answers, their analysis, and the detail view.

use crate::app::{GenerationError, StudyStorage};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use std::sync::{Mutex, PoisonError};
use study_aid_core::{
    domain::{Language, MistakeAnalysis, WrongAnswer},
    ports::{ContentGenerationService, PortResult},
};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("An analysis is already running")]
    Busy,
    #[error("Analysis failed: {0:?}")]
    Analysis(GenerationError),
}

/// Encodes raw file bytes as a `data:` URI.
pub fn to_data_uri(mime: Option<&str>, bytes: &[u8]) -> String {
    let mime = mime
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_IMAGE_MIME);
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// An analysis issued by the manager, run without holding it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub image_url: String,
    pub language: Language,
}

impl UploadRequest {
    pub async fn perform(&self, content: &dyn ContentGenerationService) -> PortResult<MistakeAnalysis> {
        content.analyze_wrong_answer(&self.image_url, self.language).await
    }
}

#[derive(Debug, Default)]
pub struct MistakeManager {
    items: Vec<WrongAnswer>,
    analyzing: bool,
    selected: Option<String>,
    retention: Option<usize>,
}

impl MistakeManager {
    pub fn new(items: Vec<WrongAnswer>, retention: Option<usize>) -> Self {
        let mut manager = Self {
            items,
            analyzing: false,
            selected: None,
            retention,
        };
        manager.enforce_retention();
        manager
    }

    pub async fn load(storage: &StudyStorage, retention: Option<usize>) -> Self {
        let items = storage.load_mistakes().await;
        info!(count = items.len(), "Loaded mistake log");
        Self::new(items, retention)
    }

    /// Newest first.
    pub fn items(&self) -> &[WrongAnswer] {
        &self.items
    }

    pub fn analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn get(&self, id: &str) -> Option<&WrongAnswer> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn selected(&self) -> Option<&WrongAnswer> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn open(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn close(&mut self) {
        self.selected = None;
    }

    pub fn begin_upload(
        &mut self,
        mime: Option<&str>,
        bytes: &[u8],
        language: Language,
    ) -> Result<UploadRequest, UploadError> {
        if self.analyzing {
            return Err(UploadError::Busy);
        }
        self.analyzing = true;
        Ok(UploadRequest {
            image_url: to_data_uri(mime, bytes),
            language,
        })
    }

    /// Records a successful analysis at the front of the log and opens it.
    /// On failure the log is left unchanged. The upload stays in progress until
    /// `end_upload`.
    pub fn finish_upload(
        &mut self,
        request: UploadRequest,
        result: PortResult<MistakeAnalysis>,
    ) -> Result<WrongAnswer, UploadError> {
        let analysis = result.map_err(|e| {
            warn!("Mistake analysis failed: {}", e);
            UploadError::Analysis(GenerationError::from(&e))
        })?;

        let record = WrongAnswer {
            id: Uuid::new_v4().to_string(),
            image_url: request.image_url,
            analysis: analysis.analysis,
            correction: analysis.correction,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.items.insert(0, record.clone());
        self.enforce_retention();
        self.selected = Some(record.id.clone());
        info!(id = %record.id, count = self.items.len(), "Mistake recorded");
        Ok(record)
    }

    pub fn end_upload(&mut self) {
        self.analyzing = false;
    }

    fn enforce_retention(&mut self) {
        if let Some(limit) = self.retention {
            if self.items.len() > limit {
                self.items.truncate(limit);
            }
        }
    }
}

/// Runs a full upload against a shared manager: analyze, record, persist.
///
/// `on_started` runs once the manager has entered the analyzing state, which is held
/// until the log has been persisted.
pub async fn upload_mistake(
    manager: &Mutex<MistakeManager>,
    content: &dyn ContentGenerationService,
    storage: &StudyStorage,
    upload: (Option<&str>, &[u8]),
    language: Language,
    on_started: impl FnOnce(),
) -> Result<WrongAnswer, UploadError> {
    let (mime, bytes) = upload;
    let request = manager
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .begin_upload(mime, bytes, language)?;
    let _analyzing = AnalyzingGuard(manager);
    on_started();

    let result = request.perform(content).await;

    let (record, items) = {
        let mut manager = manager.lock().unwrap_or_else(PoisonError::into_inner);
        let record = manager.finish_upload(request, result)?;
        (record, manager.items().to_vec())
    };

    if let Err(e) = storage.save_mistakes(&items).await {
        error!("Failed to persist mistake log: {}", e);
    }
    Ok(record)
}

// Ends the upload on every exit path, including a dropped future.
struct AnalyzingGuard<'a>(&'a Mutex<MistakeManager>);

impl Drop for AnalyzingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).end_upload();
    }
}
