//! services/api/src/app/shell.rs
//!
//! The application shell: owns the top-level state (user, language, textbook,
//! unit list, navigation) and orchestrates unit generation and persistence.
//!
//! Unit fetches follow last-request-wins. Each fetch is issued with a generation
//! number and a cancellation token; issuing a new one cancels the previous token,
//! and a result is only applied when its generation is still the latest.

use crate::app::{GenerationError, Services};
use std::sync::{Mutex, MutexGuard, PoisonError};
use study_aid_core::{
    domain::{AppSection, Credentials, Language, TextbookInfo, Unit, User},
    ports::PortError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

//=========================================================================================
// State
//=========================================================================================

/// A snapshot of everything the screens render from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    pub user: Option<User>,
    pub language: Language,
    pub section: AppSection,
    pub textbook: Option<TextbookInfo>,
    pub units: Vec<Unit>,
    pub selected_unit: Option<Unit>,
    pub loading: bool,
    pub error: Option<GenerationError>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            user: None,
            language: Language::default(),
            section: AppSection::Setup,
            textbook: None,
            units: Vec::new(),
            selected_unit: None,
            loading: false,
            error: None,
        }
    }
}

struct Inner {
    state: ShellState,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("A publisher is required")]
    PublisherRequired,
    #[error("Login was rejected")]
    LoginRejected,
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
    #[error(transparent)]
    Port(#[from] PortError),
}

/// A unit fetch that has been issued but not yet run.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub generation: u64,
    pub textbook: TextbookInfo,
    pub language: Language,
    token: CancellationToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The unit list was replaced with this many units.
    Applied(usize),
    Failed(GenerationError),
    /// A newer fetch was issued first; this result was dropped.
    Superseded,
}

//=========================================================================================
// AppShell
//=========================================================================================

pub struct AppShell {
    services: Services,
    inner: Mutex<Inner>,
}

impl AppShell {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            inner: Mutex::new(Inner {
                state: ShellState::default(),
                generation: 0,
                in_flight: None,
            }),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    // The lock is never held across an await, so a poisoned guard still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ShellState {
        self.lock().state.clone()
    }

    /// Restores user, textbook and language from storage, in that order.
    ///
    /// Returns the unit fetch to run when a textbook was restored.
    pub async fn restore(&self) -> Option<PendingFetch> {
        let storage = &self.services.storage;
        let user = storage.load_user().await;
        let textbook = storage.load_textbook().await;
        let language = storage.load_language().await;

        info!(
            user = user.is_some(),
            textbook = textbook.is_some(),
            language = ?language,
            "Restored persisted state"
        );

        let restored = {
            let mut inner = self.lock();
            inner.state.user = user;
            if let Some(lang) = language {
                inner.state.language = lang;
            }
            if let Some(info) = &textbook {
                inner.state.textbook = Some(info.clone());
                inner.state.section = AppSection::Dashboard;
            }
            textbook.map(|info| (info, inner.state.language))
        };

        match restored {
            Some((info, lang)) => Some(self.issue_fetch(info, lang)),
            None => None,
        }
    }

    /// Runs the pluggable authenticator and signs the resulting user in.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<User, ShellError> {
        let user = self
            .services
            .auth
            .authenticate(credentials)
            .await
            .map_err(|e| match e {
                PortError::Unauthorized => ShellError::LoginRejected,
                other => ShellError::Port(other),
            })?;
        self.login(user.clone()).await;
        Ok(user)
    }

    pub async fn login(&self, user: User) {
        info!("User '{}' logged in", user.email);
        if let Err(e) = self.services.storage.save_user(&user).await {
            error!("Failed to persist user: {}", e);
        }
        self.lock().state.user = Some(user);
    }

    /// Full reset: forgets the user and textbook both in memory and in storage.
    pub async fn logout(&self) {
        {
            let mut inner = self.lock();
            if let Some(token) = inner.in_flight.take() {
                token.cancel();
            }
            inner.generation += 1;
            let language = inner.state.language;
            inner.state = ShellState {
                language,
                ..ShellState::default()
            };
        }
        let storage = &self.services.storage;
        if let Err(e) = storage.clear_user().await {
            error!("Failed to remove persisted user: {}", e);
        }
        if let Err(e) = storage.clear_textbook().await {
            error!("Failed to remove persisted textbook: {}", e);
        }
        info!("Logged out");
    }

    /// Stores the textbook, moves to the dashboard and issues a unit fetch.
    pub async fn submit_setup(&self, info: TextbookInfo) -> Result<PendingFetch, ShellError> {
        let info = TextbookInfo {
            grade: info.grade.trim().to_string(),
            publisher: info.publisher.trim().to_string(),
            subject: info.subject.trim().to_string(),
        };
        if info.publisher.is_empty() {
            return Err(ShellError::PublisherRequired);
        }
        if let Err(e) = self.services.storage.save_textbook(&info).await {
            error!("Failed to persist textbook: {}", e);
        }
        let lang = {
            let mut inner = self.lock();
            inner.state.textbook = Some(info.clone());
            inner.state.section = AppSection::Dashboard;
            inner.state.selected_unit = None;
            inner.state.language
        };
        Ok(self.issue_fetch(info, lang))
    }

    /// Switches language and, when a textbook is set, issues a fetch in the new language.
    pub async fn change_language(&self, lang: Language) -> Option<PendingFetch> {
        if let Err(e) = self.services.storage.save_language(lang).await {
            error!("Failed to persist language: {}", e);
        }
        let textbook = {
            let mut inner = self.lock();
            inner.state.language = lang;
            inner.state.textbook.clone()
        };
        textbook.map(|info| self.issue_fetch(info, lang))
    }

    /// Re-issues the fetch for the current textbook and language.
    pub fn retry(&self) -> Option<PendingFetch> {
        let (textbook, lang) = {
            let inner = self.lock();
            (inner.state.textbook.clone(), inner.state.language)
        };
        textbook.map(|info| self.issue_fetch(info, lang))
    }

    pub fn navigate(&self, section: AppSection) {
        debug!(section = section.as_str(), "Navigate");
        self.lock().state.section = section;
    }

    pub fn select_unit(&self, unit_id: &str) -> Result<Unit, ShellError> {
        let mut inner = self.lock();
        let unit = inner
            .state
            .units
            .iter()
            .find(|unit| unit.id == unit_id)
            .cloned()
            .ok_or_else(|| ShellError::UnknownUnit(unit_id.to_string()))?;
        inner.state.selected_unit = Some(unit.clone());
        inner.state.section = AppSection::Learning;
        Ok(unit)
    }

    /// Issues and runs a fetch in one step.
    pub async fn fetch_units(&self, info: TextbookInfo, lang: Language) -> FetchOutcome {
        let pending = self.issue_fetch(info, lang);
        self.run_fetch(pending).await
    }

    /// Makes a new fetch authoritative: cancels the previous one, marks the shell as
    /// loading and clears the error and the now-invalid unit list.
    pub fn issue_fetch(&self, info: TextbookInfo, lang: Language) -> PendingFetch {
        let mut inner = self.lock();
        if let Some(previous) = inner.in_flight.take() {
            previous.cancel();
        }
        inner.generation += 1;
        let token = CancellationToken::new();
        inner.in_flight = Some(token.clone());
        inner.state.loading = true;
        inner.state.error = None;
        inner.state.units.clear();
        info!(generation = inner.generation, %lang, "Unit fetch issued");
        PendingFetch {
            generation: inner.generation,
            textbook: info,
            language: lang,
            token,
        }
    }

    /// Runs a previously issued fetch and applies its result if it is still current.
    pub async fn run_fetch(&self, pending: PendingFetch) -> FetchOutcome {
        // Clears the loading flag if this future is dropped or panics mid-call.
        let _guard = LoadingGuard {
            shell: self,
            generation: pending.generation,
        };

        if pending.token.is_cancelled() {
            debug!(generation = pending.generation, "Skipping unit fetch superseded before it started");
            return FetchOutcome::Superseded;
        }

        let result = tokio::select! {
            biased;
            _ = pending.token.cancelled() => {
                info!(generation = pending.generation, "Unit fetch cancelled by a newer request");
                return FetchOutcome::Superseded;
            }
            result = self.services.content.generate_units(&pending.textbook, pending.language) => result,
        };

        let mut inner = self.lock();
        if inner.generation != pending.generation {
            debug!(generation = pending.generation, "Discarding superseded unit list");
            return FetchOutcome::Superseded;
        }
        inner.in_flight = None;
        inner.state.loading = false;
        match result {
            Ok(units) => {
                info!(generation = pending.generation, count = units.len(), "Unit list applied");
                let count = units.len();
                inner.state.units = units;
                FetchOutcome::Applied(count)
            }
            Err(e) => {
                warn!(generation = pending.generation, "Unit generation failed: {}", e);
                let err = GenerationError::from(&e);
                inner.state.error = Some(err);
                FetchOutcome::Failed(err)
            }
        }
    }
}

struct LoadingGuard<'a> {
    shell: &'a AppShell,
    generation: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.shell.lock();
        if inner.generation == self.generation && inner.state.loading {
            inner.state.loading = false;
            inner.in_flight = None;
        }
    }
}
