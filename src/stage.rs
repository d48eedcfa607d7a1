use serde::{Deserialize, Serialize};

/// The screen currently shown. Exactly one is active at a time and only
/// [`NavigationController`](crate::navigation::NavigationController) changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    LanguageSelect,
    Intro,
    Profile,
    TopicSelection,
    LoadingQuiz,
    Quiz,
    Analyzing,
    Results,
    Error,
}

impl Stage {
    /// Stages where a back navigation asks before throwing progress away.
    pub fn is_guarded(self) -> bool {
        matches!(self, Stage::Quiz | Stage::Results | Stage::Error)
    }
}

/// Sub-state of [`Stage::TopicSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionPhase {
    #[default]
    Category,
    Subtopic,
}
