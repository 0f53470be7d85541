pub mod domain;
pub mod locale;
pub mod ports;

pub use domain::{
    AppSection, Credentials, Language, LearningMode, MistakeAnalysis, Slide, TextbookInfo, Unit,
    User, WrongAnswer,
};
pub use locale::{strings, Strings};
pub use ports::{
    AuthenticationService, ContentGenerationService, KeyValueStore, PortError, PortResult,
    TextToSpeechService,
};
