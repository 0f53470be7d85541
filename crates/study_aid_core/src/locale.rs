//! crates/study_aid_core/src/locale.rs
//!
//! Static UI strings per language.

use crate::domain::Language;

/// Every label the screens render.
#[derive(Debug)]
pub struct Strings {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub login: &'static str,
    pub signup: &'static str,
    pub logout: &'static str,
    pub grade: &'static str,
    pub grade_suffix: &'static str,
    pub publisher: &'static str,
    pub publisher_placeholder: &'static str,
    pub publisher_required: &'static str,
    pub subject: &'static str,
    pub start: &'static str,
    pub change_textbook: &'static str,
    pub units: &'static str,
    pub study_room: &'static str,
    pub mistake_note: &'static str,
    pub mistake_intro: &'static str,
    pub my_notes: &'static str,
    pub generating: &'static str,
    pub prev: &'static str,
    pub next: &'static str,
    pub slides: &'static str,
    pub audio: &'static str,
    pub pro_tip: &'static str,
    pub quick_note: &'static str,
    pub hide: &'static str,
    pub clear: &'static str,
    pub upload_photo: &'static str,
    pub analyzing_mistake: &'static str,
    pub ai_analysis: &'static str,
    pub how_to_fix: &'static str,
    pub preparing: &'static str,
    pub error_title: &'static str,
    pub retry: &'static str,
    pub credential_missing: &'static str,
    pub generation_failed: &'static str,
    pub analysis_failed: &'static str,
    pub subjects: [&'static str; 5],
}

static KO: Strings = Strings {
    title: "AI 스터디 메이트",
    subtitle: "교과서 맞춤형 AI 학습 도우미",
    email: "이메일",
    password: "비밀번호",
    login: "로그인",
    signup: "회원가입",
    logout: "로그아웃",
    grade: "학년",
    grade_suffix: "학년",
    publisher: "출판사",
    publisher_placeholder: "예: 천재교육, 비상교육...",
    publisher_required: "출판사를 입력해 주세요.",
    subject: "과목",
    start: "학습 시작하기",
    change_textbook: "교과서 설정",
    units: "단원 목록",
    study_room: "학습실",
    mistake_note: "오답 노트",
    mistake_intro: "틀린 문제를 사진으로 찍어 올리세요. AI가 왜 틀렸는지 분석하고 정답에 도달하는 길을 안내합니다.",
    my_notes: "내 노트",
    generating: "AI가 학습 자료를 만들고 있어요...",
    prev: "이전",
    next: "다음",
    slides: "PPT",
    audio: "오디오",
    pro_tip: "핵심 내용을 손으로 직접 정리하면 기억에 오래 남아요.",
    quick_note: "빠른 필기",
    hide: "숨기기",
    clear: "지우기",
    upload_photo: "사진 올리기",
    analyzing_mistake: "분석 중...",
    ai_analysis: "AI 분석",
    how_to_fix: "바로잡기",
    preparing: "학습 데이터를 준비하고 있어요...",
    error_title: "오류가 발생했어요",
    retry: "다시 시도",
    credential_missing: "API 키가 없습니다. 배포 설정을 확인해 주세요.",
    generation_failed: "콘텐츠를 생성하는 중 문제가 발생했습니다. API 키를 확인하거나 다시 시도해 주세요.",
    analysis_failed: "분석에 실패했습니다.",
    subjects: ["과학", "수학", "역사", "영어", "사회"],
};

static EN: Strings = Strings {
    title: "AI Study Mate",
    subtitle: "Your textbook-aware AI study companion",
    email: "Email",
    password: "Password",
    login: "Log in",
    signup: "Sign up",
    logout: "Log out",
    grade: "Grade",
    grade_suffix: "th Grade",
    publisher: "Publisher",
    publisher_placeholder: "e.g. Pearson, McGraw Hill...",
    publisher_required: "Please enter a publisher.",
    subject: "Subject",
    start: "Start learning",
    change_textbook: "Textbook Setup",
    units: "Units",
    study_room: "Study Room",
    mistake_note: "Mistake Note",
    mistake_intro: "Snap a photo of a problem you got wrong. The AI explains the mistake and walks you to the right answer.",
    my_notes: "My Notes",
    generating: "The AI is preparing your material...",
    prev: "Prev",
    next: "Next",
    slides: "PPT",
    audio: "Audio",
    pro_tip: "Summarizing key points by hand helps them stick.",
    quick_note: "Quick Note",
    hide: "Hide",
    clear: "Clear",
    upload_photo: "Upload Photo",
    analyzing_mistake: "Analyzing...",
    ai_analysis: "AI Analysis",
    how_to_fix: "How to Fix",
    preparing: "Preparing Learning Data...",
    error_title: "Error Detected",
    retry: "Retry",
    credential_missing: "API Key is missing. Please check your deployment settings.",
    generation_failed: "Something went wrong while generating content. Please check your API key or try again.",
    analysis_failed: "Analysis failed.",
    subjects: ["Science", "Math", "History", "English", "Social Studies"],
};

/// Looks up the string table for a language.
pub fn strings(lang: Language) -> &'static Strings {
    match lang {
        Language::Ko => &KO,
        Language::En => &EN,
    }
}
