//! In-memory fakes of the ports for unit tests.

use crate::adapters::{MemoryStore, SimulatedAuthenticator};
use crate::app::{Services, StudyStorage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use study_aid_core::{
    domain::{Language, MistakeAnalysis, Slide, TextbookInfo, Unit},
    ports::{ContentGenerationService, PortError, PortResult, TextToSpeechService},
};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    MissingCredential,
    Fail,
}

impl Behaviour {
    fn check(&self) -> PortResult<()> {
        match self {
            Behaviour::Succeed => Ok(()),
            Behaviour::MissingCredential => Err(PortError::MissingCredential),
            Behaviour::Fail => Err(PortError::Unexpected("remote said no".to_string())),
        }
    }
}

pub fn sample_units(lang: Language) -> Vec<Unit> {
    (1..=5)
        .map(|i| Unit {
            id: i.to_string(),
            title: format!("{} unit {}", lang.code(), i),
            description: format!("{} description {}", lang.code(), i),
        })
        .collect()
}

pub fn sample_slides(unit_title: &str) -> Vec<Slide> {
    (1..=5)
        .map(|i| Slide {
            title: format!("{} slide {}", unit_title, i),
            content: vec!["one".to_string(), "two".to_string(), "three".to_string()],
            image_prompt: None,
        })
        .collect()
}

pub fn sample_textbook() -> TextbookInfo {
    TextbookInfo {
        grade: "5".to_string(),
        publisher: "Pearson".to_string(),
        subject: "Science".to_string(),
    }
}

/// Records every call. Unit requests can be held open with gates to control
/// the order in which responses arrive.
pub struct FakeContent {
    pub behaviour: Mutex<Behaviour>,
    pub unit_calls: Mutex<Vec<(TextbookInfo, Language)>>,
    pub slide_calls: Mutex<Vec<(String, String, Language)>>,
    pub analysis_calls: Mutex<Vec<(String, Language)>>,
    unit_gates: Mutex<VecDeque<oneshot::Receiver<PortResult<Vec<Unit>>>>>,
}

impl FakeContent {
    pub fn new() -> Self {
        Self {
            behaviour: Mutex::new(Behaviour::Succeed),
            unit_calls: Mutex::new(Vec::new()),
            slide_calls: Mutex::new(Vec::new()),
            analysis_calls: Mutex::new(Vec::new()),
            unit_gates: Mutex::new(VecDeque::new()),
        }
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    /// The next unit request waits for the returned sender instead of answering itself.
    pub fn gate_next_units(&self) -> oneshot::Sender<PortResult<Vec<Unit>>> {
        let (tx, rx) = oneshot::channel();
        self.unit_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn unit_call_count(&self) -> usize {
        self.unit_calls.lock().unwrap().len()
    }

    pub fn slide_call_count(&self) -> usize {
        self.slide_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentGenerationService for FakeContent {
    async fn generate_units(&self, textbook: &TextbookInfo, lang: Language) -> PortResult<Vec<Unit>> {
        self.unit_calls.lock().unwrap().push((textbook.clone(), lang));
        let gate = self.unit_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            return gate
                .await
                .unwrap_or_else(|_| Err(PortError::Unexpected("gate dropped".to_string())));
        }
        self.behaviour.lock().unwrap().check()?;
        Ok(sample_units(lang))
    }

    async fn generate_slides(&self, unit_title: &str, grade: &str, lang: Language) -> PortResult<Vec<Slide>> {
        self.slide_calls
            .lock()
            .unwrap()
            .push((unit_title.to_string(), grade.to_string(), lang));
        self.behaviour.lock().unwrap().check()?;
        Ok(sample_slides(unit_title))
    }

    async fn analyze_wrong_answer(&self, image_data_uri: &str, lang: Language) -> PortResult<MistakeAnalysis> {
        self.analysis_calls
            .lock()
            .unwrap()
            .push((image_data_uri.to_string(), lang));
        self.behaviour.lock().unwrap().check()?;
        Ok(MistakeAnalysis {
            analysis: "Sign error in step 2".to_string(),
            correction: "Flip the sign before dividing".to_string(),
        })
    }
}

pub struct FakeTts {
    pub calls: Mutex<Vec<(String, Language)>>,
    pub returns_audio: Mutex<bool>,
}

impl FakeTts {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            returns_audio: Mutex::new(true),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextToSpeechService for FakeTts {
    async fn generate_podcast_audio(&self, text: &str, lang: Language) -> PortResult<Option<Vec<u8>>> {
        self.calls.lock().unwrap().push((text.to_string(), lang));
        if *self.returns_audio.lock().unwrap() {
            Ok(Some(vec![0u8; 4_800]))
        } else {
            Ok(None)
        }
    }
}

pub struct Harness {
    pub content: Arc<FakeContent>,
    pub tts: Arc<FakeTts>,
    pub store: Arc<MemoryStore>,
    pub services: Services,
}

pub fn harness() -> Harness {
    let content = Arc::new(FakeContent::new());
    let tts = Arc::new(FakeTts::new());
    let store = Arc::new(MemoryStore::new());
    let services = Services {
        content: content.clone(),
        tts: tts.clone(),
        auth: Arc::new(SimulatedAuthenticator::new()),
        storage: StudyStorage::new(store.clone()),
    };
    Harness {
        content,
        tts,
        store,
        services,
    }
}

/// Yields to the runtime until `condition` holds.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition was never met");
}
