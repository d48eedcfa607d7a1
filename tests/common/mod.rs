#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use trivia_trail::error::ProviderError;
use trivia_trail::game::{Game, GameSettings};
use trivia_trail::history::MemoryHistory;
use trivia_trail::i18n::Language;
use trivia_trail::profile::{MemoryStore, UserProfile, STORAGE_KEY};
use trivia_trail::quiz::ai_helper::{ContentProvider, QuestionRequest};
use trivia_trail::quiz::evaluation::{Commentary, QuestionReview, TopicReport};
use trivia_trail::quiz::{Question, QuizSet, Topic};
use trivia_trail::topics;

/// Content provider that replays queued batches and comments on whatever it gets.
#[derive(Default)]
pub struct ScriptedProvider {
    batches: Mutex<VecDeque<Result<Vec<QuizSet>, ProviderError>>>,
    evaluation_error: Option<String>,
    requests: Mutex<Vec<QuestionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(self, sets: Vec<QuizSet>) -> Self {
        self.batches.lock().unwrap().push_back(Ok(sets));
        self
    }

    pub fn with_load_error(self, message: &str) -> Self {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(ProviderError::Malformed(message.to_string())));
        self
    }

    pub fn failing_evaluation(mut self, message: &str) -> Self {
        self.evaluation_error = Some(message.to_string());
        self
    }

    pub fn requests(&self) -> Vec<QuestionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ContentProvider for ScriptedProvider {
    async fn generate_questions(
        &self,
        request: &QuestionRequest,
    ) -> Result<Vec<QuizSet>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.batches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ProviderError::Malformed("no scripted batch".into())))
    }

    async fn evaluate_batch(
        &self,
        reports: &[TopicReport],
        _profile: &UserProfile,
        _language: Language,
    ) -> Result<Vec<Commentary>, ProviderError> {
        if let Some(message) = &self.evaluation_error {
            return Err(ProviderError::Malformed(message.clone()));
        }
        Ok(reports
            .iter()
            .map(|report| Commentary {
                percentile: report.score,
                demographic_percentile: report.score / 2,
                comparisons: vec![format!("{} like a pro", report.topic.label)],
                details: report
                    .answers
                    .iter()
                    .map(|answer| QuestionReview {
                        question_id: answer.question_id.clone(),
                        // Deliberately wrong; the game trusts its own record.
                        is_correct: !answer.is_correct,
                        commentary: "noted".into(),
                        correction: Some(answer.correct.clone()),
                    })
                    .collect(),
            })
            .collect())
    }
}

/// `count` questions for `topic`, all answered correctly with "A".
pub fn quiz_set(topic: &Topic, count: usize) -> QuizSet {
    QuizSet::new(
        topic.clone(),
        (1..=count)
            .map(|i| {
                Question::new(
                    format!("{}:q{i}", topic.id),
                    format!("{} question {i}?", topic.label),
                    ["A", "B", "C", "D"].map(String::from).to_vec(),
                    "A",
                )
                .with_hint(format!("think about {i}"))
            })
            .collect(),
    )
}

/// A started game with one foreign page behind it, already past language select.
pub fn started_game(store: &MemoryStore) -> Game {
    let mut game = Game::new(
        MemoryHistory::with_foreign_entries(1),
        UserProfile::default(),
        STORAGE_KEY,
        GameSettings::default(),
    );
    game.start();
    assert!(game.choose_language(Language::English, store));
    game
}

/// Goes Intro -> categories -> subtopics of `category` and picks the first `count`.
pub fn pick_topics(game: &mut Game, category: &str, count: usize) -> Vec<Topic> {
    assert!(game.begin());
    assert!(game.open_category(category));
    let picked: Vec<Topic> = topics::category(category)
        .expect("known category")
        .topics()
        .take(count)
        .collect();
    for topic in &picked {
        assert!(game.toggle_subtopic(topic.clone()));
    }
    picked
}
