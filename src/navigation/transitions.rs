//! Forward transitions as data.
//!
//! Whether a transition can be undone with the back action is the `marker`
//! column of this table and nothing else.

use serde::{Deserialize, Serialize};

use self::NavAction as A;
use crate::history::MarkerKey;
use crate::history::MarkerKey as M;
use crate::stage::SelectionPhase::{Category, Subtopic};
use crate::stage::Stage as S;
use crate::stage::{SelectionPhase, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavAction {
    /// Open the language picker from Intro.
    ChangeLanguage,
    ChooseLanguage,
    Begin,
    EditProfile,
    SubmitProfile,
    OpenCategory,
    StartQuiz,
    QuizReady,
    BatchFinished,
    ResultsReady,
    PreviewResults,
    Fail,
    PlayAgain,
}

impl NavAction {
    /// Raised by finished async work rather than by the player. These still
    /// apply while a prompt is open.
    pub fn is_system(self) -> bool {
        matches!(
            self,
            NavAction::QuizReady | NavAction::BatchFinished | NavAction::ResultsReady | NavAction::Fail
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Stage,
    /// `None` matches any phase.
    pub phase: Option<SelectionPhase>,
    pub action: NavAction,
    pub marker: Option<MarkerKey>,
    pub to: Stage,
    pub to_phase: SelectionPhase,
}

const fn row(
    from: Stage,
    phase: Option<SelectionPhase>,
    action: NavAction,
    marker: Option<MarkerKey>,
    to: Stage,
    to_phase: SelectionPhase,
) -> Transition {
    Transition {
        from,
        phase,
        action,
        marker,
        to,
        to_phase,
    }
}

pub const TRANSITIONS: &[Transition] = &[
    row(S::LanguageSelect, None, A::ChooseLanguage, None, S::Intro, Category),
    row(S::Intro, None, A::ChangeLanguage, None, S::LanguageSelect, Category),
    row(S::Intro, None, A::Begin, Some(M::Step2), S::TopicSelection, Category),
    row(S::Intro, None, A::EditProfile, Some(M::Step2), S::Profile, Category),
    row(S::Intro, None, A::PreviewResults, Some(M::Results), S::Results, Category),
    row(S::Profile, None, A::SubmitProfile, None, S::TopicSelection, Category),
    row(S::TopicSelection, Some(Category), A::OpenCategory, Some(M::Subtopic), S::TopicSelection, Subtopic),
    row(S::TopicSelection, Some(Subtopic), A::StartQuiz, Some(M::QuizStart), S::LoadingQuiz, Category),
    row(S::LoadingQuiz, None, A::QuizReady, None, S::Quiz, Category),
    row(S::LoadingQuiz, None, A::Fail, None, S::Error, Category),
    row(S::Quiz, None, A::BatchFinished, None, S::Analyzing, Category),
    row(S::Quiz, None, A::Fail, None, S::Error, Category),
    row(S::Analyzing, None, A::ResultsReady, None, S::Results, Category),
    row(S::Analyzing, None, A::Fail, None, S::Error, Category),
    row(S::Results, None, A::PlayAgain, None, S::TopicSelection, Category),
    row(S::Error, None, A::PlayAgain, None, S::TopicSelection, Category),
];

pub fn lookup(from: Stage, phase: SelectionPhase, action: NavAction) -> Option<&'static Transition> {
    TRANSITIONS.iter().find(|t| {
        t.from == from && t.action == action && t.phase.map_or(true, |p| p == phase)
    })
}
