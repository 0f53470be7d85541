//! services/api/src/web/dispatch.rs
//!
//! Applies one client action to the shared state. Remote work is spawned so the
//! connection stays responsive; each spawned task publishes a fresh view when done.

use crate::app::{learning::LoadRequest, shell::ShellError, LearningViewer, PendingFetch};
use crate::web::{
    protocol::ClientMessage,
    state::{lock, AppState},
};
use std::sync::Arc;
use study_aid_core::domain::{AppSection, Language, LearningMode, TextbookInfo};
use study_aid_core::locale::strings;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handles an action and publishes the resulting view. Returns the background tasks
/// it started.
pub async fn dispatch(state: &Arc<AppState>, message: ClientMessage) -> Vec<JoinHandle<()>> {
    debug!(?message, "Dispatching client action");
    let mut tasks = Vec::new();

    if state.shell.snapshot().user.is_none() && !matches!(message, ClientMessage::Refresh) {
        debug!("Ignoring client action while logged out");
        state.publish_view();
        return tasks;
    }

    match message {
        ClientMessage::Refresh => {}

        ClientMessage::Setup {
            grade,
            publisher,
            subject,
        } => {
            let info = TextbookInfo {
                grade,
                publisher,
                subject,
            };
            match state.shell.submit_setup(info).await {
                Ok(pending) => tasks.push(spawn_unit_fetch(state, pending)),
                Err(ShellError::PublisherRequired) => {
                    state.alert(strings(state.shell.snapshot().language).publisher_required);
                }
                Err(e) => warn!("Setup rejected: {}", e),
            }
        }

        ClientMessage::SetLanguage { lang } => {
            let lang = Language::from(lang);
            info!(%lang, "Language change requested");
            if let Some(pending) = state.shell.change_language(lang).await {
                tasks.push(spawn_unit_fetch(state, pending));
            }
            let request = with_viewer(state, |viewer| {
                viewer.set_language(lang);
                viewer.begin_load()
            });
            tasks.extend(request.map(|r| spawn_learning_load(state, r)));
        }

        ClientMessage::Retry => {
            if let Some(pending) = state.shell.retry() {
                tasks.push(spawn_unit_fetch(state, pending));
            }
        }

        ClientMessage::Navigate { section } => {
            let section = AppSection::from(section);
            state.shell.navigate(section);
            if section == AppSection::Learning {
                let request = with_viewer(state, LearningViewer::begin_load);
                tasks.extend(request.map(|r| spawn_learning_load(state, r)));
            }
        }

        ClientMessage::SelectUnit { unit_id } => match state.shell.select_unit(&unit_id) {
            Ok(unit) => {
                let shell = state.shell.snapshot();
                let request = match shell.textbook {
                    Some(textbook) => {
                        let mut learning = lock(&state.learning);
                        match learning.as_mut() {
                            Some(viewer) => viewer.enter_unit(unit, textbook, shell.language),
                            None => *learning = Some(LearningViewer::new(unit, textbook, shell.language)),
                        }
                        learning.as_mut().and_then(LearningViewer::begin_load)
                    }
                    None => None,
                };
                tasks.extend(request.map(|r| spawn_learning_load(state, r)));
            }
            Err(e) => warn!("Unit selection failed: {}", e),
        },

        ClientMessage::SetMode { mode } => {
            let mode = LearningMode::from(mode);
            let request = with_viewer(state, |viewer| {
                viewer.set_mode(mode);
                viewer.begin_load()
            });
            tasks.extend(request.map(|r| spawn_learning_load(state, r)));
        }

        ClientMessage::NextSlide => {
            with_viewer(state, |viewer| Some(viewer.next_slide()));
        }
        ClientMessage::PrevSlide => {
            with_viewer(state, |viewer| Some(viewer.prev_slide()));
        }
        ClientMessage::ToggleNotes => {
            with_viewer(state, |viewer| Some(viewer.toggle_notes()));
        }
        ClientMessage::RetryLearning => {
            let request = with_viewer(state, LearningViewer::retry);
            tasks.extend(request.map(|r| spawn_learning_load(state, r)));
        }

        ClientMessage::OpenMistake { id } => {
            if !lock(&state.mistakes).open(&id) {
                warn!("Unknown mistake record: {}", id);
            }
        }
        ClientMessage::CloseMistake => lock(&state.mistakes).close(),

        ClientMessage::SketchPress { x, y } => lock(&state.sketch).press(x, y),
        ClientMessage::SketchMove { x, y } => {
            // Moves only change pixels; the snapshot is published on release.
            lock(&state.sketch).move_to(x, y);
            return tasks;
        }
        ClientMessage::SketchRelease => {
            if let Err(e) = lock(&state.sketch).release() {
                warn!("Failed to export sketch: {}", e);
            }
        }
        ClientMessage::SketchColor { color } => {
            if let Err(e) = lock(&state.sketch).set_color(&color) {
                warn!("{}", e);
            }
        }
        ClientMessage::SketchWidth { width } => {
            if let Err(e) = lock(&state.sketch).set_width(width) {
                warn!("{}", e);
            }
        }
        ClientMessage::SketchClear => lock(&state.sketch).clear(),
    }

    state.publish_view();
    tasks
}

fn with_viewer<T>(state: &AppState, f: impl FnOnce(&mut LearningViewer) -> Option<T>) -> Option<T> {
    lock(&state.learning).as_mut().and_then(f)
}

pub fn spawn_unit_fetch(state: &Arc<AppState>, pending: PendingFetch) -> JoinHandle<()> {
    let state = state.clone();
    tokio::spawn(async move {
        let outcome = state.shell.run_fetch(pending).await;
        debug!(?outcome, "Unit fetch finished");
        state.publish_view();
    })
}

pub fn spawn_learning_load(state: &Arc<AppState>, request: LoadRequest) -> JoinHandle<()> {
    let state = state.clone();
    tokio::spawn(async move {
        let result = request
            .perform(state.services.content.as_ref(), state.services.tts.as_ref())
            .await;

        let audio = {
            let mut learning = lock(&state.learning);
            match learning.as_mut() {
                Some(viewer) => {
                    let applied = viewer.finish_load(&request, result);
                    match request.mode {
                        LearningMode::Podcast if applied => viewer.audio().map(|audio| audio.wav.clone()),
                        _ => None,
                    }
                }
                None => None,
            }
        };

        if let Some(wav) = audio {
            state.publish_audio(wav);
        }
        state.publish_view();
    })
}
