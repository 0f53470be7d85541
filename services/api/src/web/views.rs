//! services/api/src/web/views.rs
//!
//! Renders the application state into the screen model the browser draws.

use crate::app::{LearningViewer, MistakeManager, ShellState, SketchPad};
use crate::app::sketch::PALETTE;
use crate::web::protocol::{LanguageCode, ModeName, SectionName};
use chrono::DateTime;
use serde::Serialize;
use study_aid_core::{
    domain::{AppSection, Language, LearningMode, TextbookInfo, WrongAnswer},
    locale::{strings, Strings},
};
use utoipa::ToSchema;

pub const GRADE_OPTIONS: std::ops::RangeInclusive<u32> = 1..=12;
pub const DEFAULT_GRADE: &str = "5";

//=========================================================================================
// View Model
//=========================================================================================

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct View {
    pub language: LanguageCode,
    pub chrome: Chrome,
    pub screen: Screen,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct Chrome {
    pub title: String,
    pub subtitle: String,
    pub user_name: Option<String>,
    pub logout_label: String,
    pub change_textbook_label: String,
    /// Empty unless a user and a textbook exist and setup is not open.
    pub navigation: Vec<NavItem>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct NavItem {
    pub section: SectionName,
    pub label: String,
    pub active: bool,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Login {
        title: String,
        subtitle: String,
        email_label: String,
        password_label: String,
        login_label: String,
        signup_label: String,
    },
    Setup {
        grade_label: String,
        grade_suffix: String,
        grade_options: Vec<String>,
        grade: String,
        publisher_label: String,
        publisher_placeholder: String,
        publisher: String,
        subject_label: String,
        subject_options: Vec<String>,
        subject: String,
        start_label: String,
    },
    Dashboard {
        heading: String,
        loading: bool,
        loading_label: String,
        units: Vec<UnitCard>,
    },
    Error {
        title: String,
        message: String,
        retry_label: String,
    },
    Learning {
        learning: Box<LearningScreen>,
    },
    Mistakes {
        heading: String,
        intro: String,
        upload_label: String,
        analyzing: bool,
        analyzing_label: String,
        items: Vec<MistakeCard>,
        detail: Option<MistakeDetail>,
    },
    Placeholder {
        message: String,
    },
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct UnitCard {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct LearningScreen {
    pub unit_id: String,
    pub unit_title: String,
    /// `publisher • subject`
    pub caption: String,
    pub mode: ModeName,
    pub slides_label: String,
    pub audio_label: String,
    pub loading: bool,
    pub loading_label: String,
    pub error: Option<String>,
    pub retry_label: String,
    pub slide: Option<SlideCard>,
    pub prev_label: String,
    pub next_label: String,
    pub can_prev: bool,
    pub can_next: bool,
    pub audio_ready: bool,
    pub audio_duration_ms: Option<u64>,
    pub pro_tip: String,
    pub notes: NotePanel,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct SlideCard {
    /// `n / total`
    pub page: String,
    pub title: String,
    pub bullets: Vec<String>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct NotePanel {
    pub open: bool,
    pub title: String,
    pub hide_label: String,
    pub clear_label: String,
    pub palette: Vec<String>,
    pub color: String,
    pub stroke_width: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct MistakeCard {
    pub id: String,
    pub image_url: String,
    pub date: String,
    pub analysis: String,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct MistakeDetail {
    pub id: String,
    pub image_url: String,
    pub analysis_label: String,
    pub analysis: String,
    pub correction_label: String,
    pub correction: String,
}

//=========================================================================================
// Rendering
//=========================================================================================

pub struct RenderInput<'a> {
    pub shell: &'a ShellState,
    pub learning: Option<&'a LearningViewer>,
    pub mistakes: &'a MistakeManager,
    pub sketch: &'a SketchPad,
}

pub fn render(input: RenderInput<'_>) -> View {
    let shell = input.shell;
    let t = strings(shell.language);
    View {
        language: shell.language.into(),
        chrome: chrome(shell, t),
        screen: screen(&input, t),
    }
}

fn chrome(shell: &ShellState, t: &Strings) -> Chrome {
    let show_nav = shell.user.is_some() && shell.textbook.is_some() && shell.section != AppSection::Setup;
    let navigation = if show_nav {
        [
            (AppSection::Dashboard, t.units),
            (AppSection::Learning, t.study_room),
            (AppSection::WrongAnswers, t.mistake_note),
            (AppSection::Notes, t.my_notes),
        ]
        .into_iter()
        .map(|(section, label)| NavItem {
            section: section.into(),
            label: label.to_string(),
            active: shell.section == section,
        })
        .collect()
    } else {
        Vec::new()
    };

    Chrome {
        title: t.title.to_string(),
        subtitle: t.subtitle.to_string(),
        user_name: shell.user.as_ref().map(|u| u.name.clone()),
        logout_label: t.logout.to_string(),
        change_textbook_label: t.change_textbook.to_string(),
        navigation,
    }
}

fn screen(input: &RenderInput<'_>, t: &Strings) -> Screen {
    let shell = input.shell;
    if shell.user.is_none() {
        return Screen::Login {
            title: t.title.to_string(),
            subtitle: t.subtitle.to_string(),
            email_label: t.email.to_string(),
            password_label: t.password.to_string(),
            login_label: t.login.to_string(),
            signup_label: t.signup.to_string(),
        };
    }
    if let Some(err) = shell.error {
        return Screen::Error {
            title: t.error_title.to_string(),
            message: err.message(shell.language).to_string(),
            retry_label: t.retry.to_string(),
        };
    }
    let textbook = match &shell.textbook {
        Some(textbook) if shell.section != AppSection::Setup => textbook,
        _ => return setup_screen(shell, t),
    };

    match shell.section {
        AppSection::Dashboard => Screen::Dashboard {
            heading: t.units.to_string(),
            loading: shell.loading,
            loading_label: t.generating.to_string(),
            units: shell
                .units
                .iter()
                .map(|unit| UnitCard {
                    id: unit.id.clone(),
                    title: unit.title.clone(),
                    description: unit.description.clone(),
                })
                .collect(),
        },
        AppSection::Learning => match (&shell.selected_unit, input.learning) {
            (Some(unit), Some(viewer)) if viewer.unit().id == unit.id => {
                let learning = learning_screen(viewer, input.sketch, textbook, shell.language, t);
                Screen::Learning {
                    learning: Box::new(learning),
                }
            }
            _ => placeholder(t),
        },
        AppSection::WrongAnswers => mistakes_screen(input.mistakes, shell.language, t),
        AppSection::Notes | AppSection::Setup => placeholder(t),
    }
}

fn placeholder(t: &Strings) -> Screen {
    Screen::Placeholder {
        message: t.preparing.to_string(),
    }
}

fn setup_screen(shell: &ShellState, t: &Strings) -> Screen {
    let subject_options: Vec<String> = t.subjects.iter().map(|s| s.to_string()).collect();
    let (grade, publisher, subject) = match &shell.textbook {
        Some(info) => (info.grade.clone(), info.publisher.clone(), info.subject.clone()),
        None => (DEFAULT_GRADE.to_string(), String::new(), subject_options[0].clone()),
    };
    Screen::Setup {
        grade_label: t.grade.to_string(),
        grade_suffix: t.grade_suffix.to_string(),
        grade_options: GRADE_OPTIONS.map(|g| g.to_string()).collect(),
        grade,
        publisher_label: t.publisher.to_string(),
        publisher_placeholder: t.publisher_placeholder.to_string(),
        publisher,
        subject_label: t.subject.to_string(),
        subject_options,
        subject,
        start_label: t.start.to_string(),
    }
}

fn learning_screen(
    viewer: &LearningViewer,
    sketch: &SketchPad,
    textbook: &TextbookInfo,
    lang: Language,
    t: &Strings,
) -> LearningScreen {
    let slides = viewer.slides();
    let index = viewer.current_slide();
    let slide = match viewer.mode() {
        LearningMode::Slides => slides.get(index).map(|slide| SlideCard {
            page: format!("{} / {}", index + 1, slides.len()),
            title: slide.title.clone(),
            bullets: slide.content.clone(),
        }),
        LearningMode::Podcast => None,
    };
    let (width, height) = sketch.dimensions();

    LearningScreen {
        unit_id: viewer.unit().id.clone(),
        unit_title: viewer.unit().title.clone(),
        caption: format!("{} • {}", textbook.publisher, textbook.subject),
        mode: viewer.mode().into(),
        slides_label: t.slides.to_string(),
        audio_label: t.audio.to_string(),
        loading: viewer.loading(),
        loading_label: t.generating.to_string(),
        error: viewer.error().map(|err| err.message(lang).to_string()),
        retry_label: t.retry.to_string(),
        can_prev: slide.is_some() && index > 0,
        can_next: slide.is_some() && index + 1 < slides.len(),
        slide,
        prev_label: t.prev.to_string(),
        next_label: t.next.to_string(),
        audio_ready: viewer.audio().is_some(),
        audio_duration_ms: viewer.audio().map(|a| a.duration_ms),
        pro_tip: t.pro_tip.to_string(),
        notes: NotePanel {
            open: viewer.notes_open(),
            title: t.quick_note.to_string(),
            hide_label: t.hide.to_string(),
            clear_label: t.clear.to_string(),
            palette: PALETTE.iter().map(|c| c.to_string()).collect(),
            color: sketch.color().to_string(),
            stroke_width: sketch.stroke_width(),
            width,
            height,
        },
    }
}

fn mistakes_screen(mistakes: &MistakeManager, lang: Language, t: &Strings) -> Screen {
    Screen::Mistakes {
        heading: t.mistake_note.to_string(),
        intro: t.mistake_intro.to_string(),
        upload_label: t.upload_photo.to_string(),
        analyzing: mistakes.analyzing(),
        analyzing_label: t.analyzing_mistake.to_string(),
        items: mistakes
            .items()
            .iter()
            .map(|item| MistakeCard {
                id: item.id.clone(),
                image_url: item.image_url.clone(),
                date: format_date(item.timestamp, lang),
                analysis: item.analysis.clone(),
            })
            .collect(),
        detail: mistakes.selected().map(|item| mistake_detail(item, t)),
    }
}

pub fn mistake_detail(item: &WrongAnswer, t: &Strings) -> MistakeDetail {
    MistakeDetail {
        id: item.id.clone(),
        image_url: item.image_url.clone(),
        analysis_label: t.ai_analysis.to_string(),
        analysis: item.analysis.clone(),
        correction_label: t.how_to_fix.to_string(),
        correction: item.correction.clone(),
    }
}

/// Formats an epoch-millisecond timestamp the way each locale writes dates.
pub fn format_date(timestamp_ms: i64, lang: Language) -> String {
    let Some(at) = DateTime::from_timestamp_millis(timestamp_ms) else {
        return String::new();
    };
    match lang {
        Language::Ko => at.format("%Y. %-m. %-d.").to_string(),
        Language::En => at.format("%-m/%-d/%Y").to_string(),
    }
}
