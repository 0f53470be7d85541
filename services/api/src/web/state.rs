//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the events pushed to connected clients.

use crate::app::{AppShell, LearningViewer, MistakeManager, Services, SketchPad};
use crate::config::Config;
use crate::web::{
    protocol::ServerMessage,
    views::{render, RenderInput, View},
};
use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Something every connected client should receive.
#[derive(Debug, Clone)]
pub enum Outbound {
    Text(ServerMessage),
    /// A WAV-encoded podcast narration.
    Audio(Bytes),
}

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Locks are taken in field order (`learning`, `mistakes`, `sketch`) and never held
/// across an await.
pub struct AppState {
    pub config: Arc<Config>,
    pub services: Services,
    pub shell: AppShell,
    pub learning: Mutex<Option<LearningViewer>>,
    pub mistakes: Mutex<MistakeManager>,
    pub sketch: Mutex<SketchPad>,
    pub events: broadcast::Sender<Outbound>,
}

/// Locks a std mutex, recovering the data if a panicking holder poisoned it.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    /// Builds the state from persisted data and starts the sketch saver.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(config: Arc<Config>, services: Services) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let storage = services.storage.clone();

        let mistakes = MistakeManager::load(&storage, config.mistake_retention).await;

        let (sketch_tx, mut sketch_rx) = mpsc::unbounded_channel::<String>();
        let mut sketch = SketchPad::new(config.sketch_width).with_save_hook(Box::new(move |data_url| {
            let _ = sketch_tx.send(data_url);
        }));
        if let Some(snapshot) = storage.load_sketch().await {
            if let Err(e) = sketch.restore_data_url(&snapshot) {
                warn!("Ignoring stored sketch: {}", e);
            }
        }

        let saver_events = events.clone();
        tokio::spawn(async move {
            while let Some(data_url) = sketch_rx.recv().await {
                if let Err(e) = storage.save_sketch(&data_url).await {
                    error!("Failed to persist sketch: {}", e);
                }
                debug!(bytes = data_url.len(), "Sketch snapshot saved");
                let _ = saver_events.send(Outbound::Text(ServerMessage::SketchSaved { data_url }));
            }
            info!("Sketch saver stopped.");
        });

        Arc::new(Self {
            config,
            shell: AppShell::new(services.clone()),
            services,
            learning: Mutex::new(None),
            mistakes: Mutex::new(mistakes),
            sketch: Mutex::new(sketch),
            events,
        })
    }

    pub fn current_view(&self) -> View {
        let shell = self.shell.snapshot();
        let learning = lock(&self.learning);
        let mistakes = lock(&self.mistakes);
        let sketch = lock(&self.sketch);
        render(RenderInput {
            shell: &shell,
            learning: learning.as_ref(),
            mistakes: &mistakes,
            sketch: &sketch,
        })
    }

    pub fn publish_view(&self) {
        self.publish(ServerMessage::View {
            view: Box::new(self.current_view()),
        });
    }

    pub fn alert(&self, message: impl Into<String>) {
        self.publish(ServerMessage::Alert {
            message: message.into(),
        });
    }

    fn publish(&self, message: ServerMessage) {
        // No receivers just means no client is connected.
        let _ = self.events.send(Outbound::Text(message));
    }

    pub fn publish_audio(&self, wav: Vec<u8>) {
        let _ = self.events.send(Outbound::Audio(Bytes::from(wav)));
    }
}
