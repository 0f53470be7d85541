//! services/api/src/app/learning.rs
//!
//! Per-unit study session: the slide deck, the podcast narration and the note panel.
//!
//! Loading is split in three steps so no lock is held while the remote call runs:
//! `begin_load` decides whether the active mode needs content, `LoadRequest::perform`
//! calls the ports, and `finish_load` applies the result if the session it was issued
//! for is still the current one.

use crate::app::{GenerationError, PlayableAudio};
use crate::adapters::tts::PCM_SAMPLE_RATE;
use std::collections::HashSet;
use study_aid_core::{
    domain::{Language, LearningMode, Slide, TextbookInfo, Unit},
    ports::{ContentGenerationService, PortResult, TextToSpeechService},
};
use tracing::{debug, info, warn};

/// A content request issued by the viewer, detached from it so it can run unlocked.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub session: u64,
    pub mode: LearningMode,
    pub unit: Unit,
    pub grade: String,
    pub language: Language,
    /// Narration source for podcast requests.
    pub source_text: String,
}

/// The content produced by a `LoadRequest`.
#[derive(Debug)]
pub enum Loaded {
    Slides(Vec<Slide>),
    Audio(Option<PlayableAudio>),
}

impl LoadRequest {
    pub async fn perform(
        &self,
        content: &dyn ContentGenerationService,
        tts: &dyn TextToSpeechService,
    ) -> PortResult<Loaded> {
        match self.mode {
            LearningMode::Slides => {
                let slides = content
                    .generate_slides(&self.unit.title, &self.grade, self.language)
                    .await?;
                Ok(Loaded::Slides(slides))
            }
            LearningMode::Podcast => {
                let pcm = tts.generate_podcast_audio(&self.source_text, self.language).await?;
                let audio = match pcm {
                    Some(pcm) => Some(PlayableAudio::from_pcm(&pcm, PCM_SAMPLE_RATE)?),
                    None => None,
                };
                Ok(Loaded::Audio(audio))
            }
        }
    }
}

pub struct LearningViewer {
    unit: Unit,
    textbook: TextbookInfo,
    language: Language,
    mode: LearningMode,
    slides: Option<Vec<Slide>>,
    current_slide: usize,
    audio: Option<PlayableAudio>,
    notes_open: bool,
    error: Option<GenerationError>,
    session: u64,
    pending: HashSet<LearningMode>,
}

impl LearningViewer {
    pub fn new(unit: Unit, textbook: TextbookInfo, language: Language) -> Self {
        Self {
            unit,
            textbook,
            language,
            mode: LearningMode::default(),
            slides: None,
            current_slide: 0,
            audio: None,
            notes_open: false,
            error: None,
            session: 0,
            pending: HashSet::new(),
        }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn textbook(&self) -> &TextbookInfo {
        &self.textbook
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn mode(&self) -> LearningMode {
        self.mode
    }

    pub fn slides(&self) -> &[Slide] {
        self.slides.as_deref().unwrap_or_default()
    }

    pub fn current_slide(&self) -> usize {
        self.current_slide
    }

    pub fn audio(&self) -> Option<&PlayableAudio> {
        self.audio.as_ref()
    }

    pub fn notes_open(&self) -> bool {
        self.notes_open
    }

    pub fn error(&self) -> Option<GenerationError> {
        self.error
    }

    /// True while content for the active mode is being fetched.
    pub fn loading(&self) -> bool {
        self.pending.contains(&self.mode)
    }

    /// Opens a unit. Re-entering the same unit in the same language keeps the cache.
    pub fn enter_unit(&mut self, unit: Unit, textbook: TextbookInfo, language: Language) {
        let same = self.unit.id == unit.id && self.language == language && self.textbook == textbook;
        self.unit = unit;
        self.textbook = textbook;
        self.language = language;
        if !same {
            self.reset_session();
        }
    }

    pub fn set_language(&mut self, language: Language) {
        if self.language != language {
            self.language = language;
            self.reset_session();
        }
    }

    pub fn set_mode(&mut self, mode: LearningMode) {
        if self.mode != mode {
            self.mode = mode;
            self.error = None;
        }
    }

    fn reset_session(&mut self) {
        self.session += 1;
        self.slides = None;
        self.current_slide = 0;
        self.audio = None;
        self.error = None;
        self.pending.clear();
        debug!(session = self.session, unit = %self.unit.id, "Learning session reset");
    }

    fn has_content(&self, mode: LearningMode) -> bool {
        match mode {
            LearningMode::Slides => self.slides.is_some(),
            LearningMode::Podcast => self.audio.is_some(),
        }
    }

    /// Returns a request when the active mode has no cached content and none is in flight.
    pub fn begin_load(&mut self) -> Option<LoadRequest> {
        let mode = self.mode;
        if self.has_content(mode) || self.pending.contains(&mode) || self.error.is_some() {
            return None;
        }
        self.pending.insert(mode);

        let source_text = match self.slides.as_deref() {
            Some(slides) if !slides.is_empty() => slides
                .iter()
                .map(|slide| slide.title.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            _ => self.unit.description.clone(),
        };

        info!(session = self.session, unit = %self.unit.id, ?mode, lang = %self.language, "Learning content requested");
        Some(LoadRequest {
            session: self.session,
            mode,
            unit: self.unit.clone(),
            grade: self.textbook.grade.clone(),
            language: self.language,
            source_text,
        })
    }

    /// Clears the error for the active mode and issues a fresh request.
    pub fn retry(&mut self) -> Option<LoadRequest> {
        self.error = None;
        self.begin_load()
    }

    /// Applies a finished load. Returns false when the result was discarded as stale.
    pub fn finish_load(&mut self, request: &LoadRequest, result: PortResult<Loaded>) -> bool {
        if request.session != self.session {
            debug!(
                session = request.session,
                current = self.session,
                "Discarding learning content for a previous session"
            );
            return false;
        }
        self.pending.remove(&request.mode);

        match result {
            Ok(Loaded::Slides(slides)) => {
                info!(count = slides.len(), "Slides loaded");
                self.slides = Some(slides);
                self.current_slide = 0;
            }
            Ok(Loaded::Audio(Some(audio))) => {
                info!(duration_ms = audio.duration_ms, "Podcast audio loaded");
                self.audio = Some(audio);
            }
            Ok(Loaded::Audio(None)) => {
                warn!("Podcast response carried no audio");
                if request.mode == self.mode {
                    self.error = Some(GenerationError::Failed);
                }
            }
            Err(e) => {
                warn!("Learning content failed: {}", e);
                if request.mode == self.mode {
                    self.error = Some(GenerationError::from(&e));
                }
            }
        }
        true
    }

    /// Moves forward one slide. No-op on the last slide.
    pub fn next_slide(&mut self) -> bool {
        if self.current_slide + 1 < self.slides().len() {
            self.current_slide += 1;
            true
        } else {
            false
        }
    }

    /// Moves back one slide. No-op on the first slide.
    pub fn prev_slide(&mut self) -> bool {
        if self.current_slide > 0 {
            self.current_slide -= 1;
            true
        } else {
            false
        }
    }

    pub fn toggle_notes(&mut self) -> bool {
        self.notes_open = !self.notes_open;
        self.notes_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{harness, sample_slides, sample_textbook, sample_units, Behaviour};

    fn viewer() -> LearningViewer {
        let unit = sample_units(Language::Ko).remove(0);
        LearningViewer::new(unit, sample_textbook(), Language::Ko)
    }

    async fn load(viewer: &mut LearningViewer, h: &crate::app::testing::Harness) -> bool {
        let request = viewer.begin_load().expect("a load should be issued");
        let result = request.perform(h.content.as_ref(), h.tts.as_ref()).await;
        viewer.finish_load(&request, result)
    }

    #[tokio::test]
    async fn slides_load_once_and_are_cached() {
        let h = harness();
        let mut viewer = viewer();
        assert!(load(&mut viewer, &h).await);
        assert_eq!(viewer.slides().len(), 5);
        assert!(!viewer.loading());

        assert!(viewer.begin_load().is_none());
        let unit = viewer.unit().clone();
        viewer.enter_unit(unit, sample_textbook(), Language::Ko);
        assert!(viewer.begin_load().is_none());
        assert_eq!(h.content.slide_call_count(), 1);
    }

    #[tokio::test]
    async fn second_request_is_not_issued_while_pending() {
        let mut viewer = viewer();
        let first = viewer.begin_load();
        assert!(first.is_some());
        assert!(viewer.loading());
        assert!(viewer.begin_load().is_none());
    }

    #[tokio::test]
    async fn podcast_uses_slide_titles_when_cached() {
        let h = harness();
        let mut viewer = viewer();
        load(&mut viewer, &h).await;

        viewer.set_mode(LearningMode::Podcast);
        assert!(load(&mut viewer, &h).await);
        assert!(viewer.audio().is_some());

        let calls = h.tts.calls.lock().unwrap().clone();
        let expected = sample_slides(&viewer.unit().title)
            .iter()
            .map(|s| s.title.clone())
            .collect::<Vec<_>>()
            .join(", ");
        assert_eq!(calls, vec![(expected, Language::Ko)]);

        // Switching back uses the cache.
        viewer.set_mode(LearningMode::Slides);
        assert!(viewer.begin_load().is_none());
        viewer.set_mode(LearningMode::Podcast);
        assert!(viewer.begin_load().is_none());
        assert_eq!(h.tts.call_count(), 1);
    }

    #[tokio::test]
    async fn podcast_falls_back_to_the_unit_description() {
        let h = harness();
        let mut viewer = viewer();
        viewer.set_mode(LearningMode::Podcast);
        load(&mut viewer, &h).await;

        let calls = h.tts.calls.lock().unwrap().clone();
        assert_eq!(calls[0].0, viewer.unit().description);
    }

    #[tokio::test]
    async fn missing_audio_surfaces_as_a_failure() {
        let h = harness();
        *h.tts.returns_audio.lock().unwrap() = false;
        let mut viewer = viewer();
        viewer.set_mode(LearningMode::Podcast);
        load(&mut viewer, &h).await;

        assert!(viewer.audio().is_none());
        assert_eq!(viewer.error(), Some(GenerationError::Failed));
        assert!(viewer.begin_load().is_none());
        assert!(viewer.retry().is_some());
    }

    #[tokio::test]
    async fn language_switch_discards_old_results_and_refetches() {
        let h = harness();
        let mut viewer = viewer();
        let stale = viewer.begin_load().unwrap();
        viewer.set_language(Language::En);

        let result = stale.perform(h.content.as_ref(), h.tts.as_ref()).await;
        assert!(!viewer.finish_load(&stale, result));
        assert!(viewer.slides().is_empty());

        assert!(load(&mut viewer, &h).await);
        let calls = h.content.slide_calls.lock().unwrap().clone();
        assert_eq!(calls.last().unwrap().2, Language::En);
    }

    #[tokio::test]
    async fn credential_failure_is_reported_distinctly() {
        let h = harness();
        h.content.set_behaviour(Behaviour::MissingCredential);
        let mut viewer = viewer();
        load(&mut viewer, &h).await;
        assert_eq!(viewer.error(), Some(GenerationError::MissingCredential));
        assert!(!viewer.loading());
    }

    #[tokio::test]
    async fn slide_navigation_is_clamped() {
        let h = harness();
        let mut viewer = viewer();
        assert!(!viewer.next_slide());
        load(&mut viewer, &h).await;

        assert!(!viewer.prev_slide());
        assert_eq!(viewer.current_slide(), 0);
        for _ in 0..10 {
            viewer.next_slide();
        }
        assert_eq!(viewer.current_slide(), 4);
        assert!(!viewer.next_slide());
        assert!(viewer.prev_slide());
        assert_eq!(viewer.current_slide(), 3);
    }

    #[test]
    fn notes_toggle() {
        let mut viewer = viewer();
        assert!(viewer.toggle_notes());
        assert!(!viewer.toggle_notes());
    }
}
