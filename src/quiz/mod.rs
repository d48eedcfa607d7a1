pub mod ai_helper;
pub mod evaluation;
pub mod session;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Score the AI itself is credited with on this difficulty.
    pub fn ai_benchmark(self) -> u8 {
        match self {
            Difficulty::Hard => 98,
            Difficulty::Medium => 95,
            Difficulty::Easy => 92,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub label: String,
}

impl Topic {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct: String,
    pub hint: Option<String>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        options: Vec<String>,
        correct: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            options,
            correct: correct.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    fn validate(&self) -> Result<(), ProviderError> {
        let malformed = |problem: &str| {
            Err(ProviderError::Malformed(format!("question {} {problem}", self.id)))
        };
        if self.text.trim().is_empty() {
            return malformed("has no text");
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Err(ProviderError::Malformed(format!(
                "question {} has {} options",
                self.id,
                self.options.len()
            )));
        }
        let mut distinct = HashSet::new();
        for option in &self.options {
            let option = option.trim();
            if option.is_empty() {
                return malformed("has a blank option");
            }
            if !distinct.insert(option.to_lowercase()) {
                return malformed("repeats an option");
            }
        }
        if !self.has_option(&self.correct) {
            return Err(ProviderError::Malformed(format!(
                "question {} answer is not one of its options",
                self.id
            )));
        }
        Ok(())
    }
}

/// One topic's generated questions. Not modified after it is received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSet {
    pub topic: Topic,
    pub questions: Vec<Question>,
}

impl QuizSet {
    pub fn new(topic: Topic, questions: Vec<Question>) -> Self {
        Self { topic, questions }
    }
}

/// Checks a whole generated batch. Question ids must be unique across it.
pub fn validate_batch(sets: &[QuizSet]) -> Result<(), ProviderError> {
    if sets.is_empty() {
        return Err(ProviderError::Malformed("no question sets returned".into()));
    }
    let mut ids = HashSet::new();
    for set in sets {
        if set.questions.is_empty() {
            return Err(ProviderError::Malformed(format!(
                "no questions for {}",
                set.topic.label
            )));
        }
        for question in &set.questions {
            question.validate()?;
            if !ids.insert(question.id.as_str()) {
                return Err(ProviderError::Malformed(format!(
                    "duplicate question id {}",
                    question.id
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub question_id: String,
    pub question: String,
    pub selected: String,
    pub correct: String,
    pub is_correct: bool,
}

impl UserAnswer {
    pub fn new(question: &Question, selected: impl Into<String>) -> Self {
        let selected = selected.into();
        Self {
            is_correct: selected == question.correct,
            question_id: question.id.clone(),
            question: question.text.clone(),
            selected,
            correct: question.correct.clone(),
        }
    }
}

/// All answers given for one finished topic, in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAnswers {
    pub topic: Topic,
    pub answers: Vec<UserAnswer>,
}

impl TopicAnswers {
    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_correct).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    /// 1-based; 0 before the first set is active.
    pub current: usize,
    pub labels: Vec<String>,
}

impl BatchProgress {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            total: labels.len(),
            current: 0,
            labels,
        }
    }

    pub fn advance(&mut self) {
        if self.current < self.total {
            self.current += 1;
        }
    }

    pub fn current_label(&self) -> Option<&str> {
        self.current
            .checked_sub(1)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn question(id: &str, correct: &str) -> Question {
        Question::new(
            id,
            format!("Question {id}?"),
            ["A", "B", "C", "D"].map(String::from).to_vec(),
            correct,
        )
    }

    pub fn set(topic: &str, ids: &[&str]) -> QuizSet {
        QuizSet::new(
            Topic::new(topic.to_lowercase(), topic),
            ids.iter().map(|id| question(id, "A")).collect(),
        )
    }
}
