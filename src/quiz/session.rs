//! The in-progress quiz: one generated batch, answered topic by topic.
//!
//! ```text
//! Idle -> Loading -> Active(i) -> Submitting(i) -> Active(i + 1)
//!                                               -> Active(0) of the next set
//!                                               -> BatchComplete
//! ```
//!
//! Every asynchronous step carries the [`SessionToken`] it started under.
//! Results that come back under an older token are dropped.

use std::collections::VecDeque;
use std::mem;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::quiz::{validate_batch, BatchProgress, Question, QuizSet, TopicAnswers, UserAnswer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SessionToken(u64);

impl SessionToken {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Active {
        index: usize,
        selected: Option<String>,
    },
    Submitting {
        index: usize,
    },
    BatchComplete,
}

/// Proof that an answer was confirmed, redeemed after the settling delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTicket {
    token: SessionToken,
    index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Started,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    NextQuestion,
    NextTopic,
    /// Every queued set is done; the finished topics in queue order.
    BatchComplete(Vec<TopicAnswers>),
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    token: SessionToken,
    state: SessionState,
    queue: VecDeque<QuizSet>,
    current: Option<QuizSet>,
    answers: Vec<UserAnswer>,
    finished: Vec<TopicAnswers>,
    progress: BatchProgress,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn progress(&self) -> &BatchProgress {
        &self.progress
    }

    pub fn answers(&self) -> &[UserAnswer] {
        &self.answers
    }

    pub fn current_set(&self) -> Option<&QuizSet> {
        self.current.as_ref()
    }

    /// Loading or submitting: new submissions and UI back are refused.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            SessionState::Loading | SessionState::Submitting { .. }
        )
    }

    pub fn question_index(&self) -> Option<usize> {
        match self.state {
            SessionState::Active { index, .. } | SessionState::Submitting { index } => Some(index),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        let index = self.question_index()?;
        self.current.as_ref()?.questions.get(index)
    }

    pub fn selected(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active { selected, .. } => selected.as_deref(),
            _ => None,
        }
    }

    /// Drops everything and invalidates outstanding tokens.
    pub fn reset(&mut self) {
        let token = self.token.next();
        *self = Self {
            token,
            ..Self::default()
        };
    }

    pub fn begin_loading(&mut self) -> SessionToken {
        self.reset();
        self.state = SessionState::Loading;
        self.token
    }

    /// Installs a freshly generated batch and activates its first set.
    pub fn accept_batch(
        &mut self,
        token: SessionToken,
        sets: Vec<QuizSet>,
    ) -> Result<LoadOutcome, ProviderError> {
        if token != self.token || self.state != SessionState::Loading {
            warn!("discarding question batch for stale session {token:?}");
            return Ok(LoadOutcome::Stale);
        }
        validate_batch(&sets)?;
        self.progress = BatchProgress::new(sets.iter().map(|s| s.topic.label.clone()).collect());
        self.queue = sets.into();
        self.activate_next_set();
        Ok(LoadOutcome::Started)
    }

    /// Whether a load failure under `token` still belongs to this session.
    pub fn fail_loading(&mut self, token: SessionToken) -> bool {
        if token != self.token || self.state != SessionState::Loading {
            warn!("discarding load failure for stale session {token:?}");
            return false;
        }
        self.state = SessionState::Idle;
        true
    }

    pub fn select_option(&mut self, option: &str) -> bool {
        let valid = self
            .current_question()
            .is_some_and(|question| question.has_option(option));
        match &mut self.state {
            SessionState::Active { selected, .. } if valid => {
                *selected = Some(option.to_string());
                true
            }
            _ => {
                debug!("ignoring selection {option:?}");
                false
            }
        }
    }

    /// Locks the session and records the answer. `None` without a selection
    /// or while a submission is already in flight.
    pub fn confirm_answer(&mut self) -> Option<SettleTicket> {
        let SessionState::Active {
            index,
            selected: Some(selected),
        } = &self.state
        else {
            debug!("ignoring confirm in {:?}", self.state);
            return None;
        };
        let index = *index;
        let answer = UserAnswer::new(self.current_question()?, selected.clone());
        self.answers.push(answer);
        self.state = SessionState::Submitting { index };
        Some(SettleTicket {
            token: self.token,
            index,
        })
    }

    /// Moves on once the settling delay has passed.
    pub fn settle(&mut self, ticket: SettleTicket) -> Settled {
        if ticket.token != self.token
            || self.state != (SessionState::Submitting { index: ticket.index })
        {
            warn!("discarding settle for stale session {:?}", ticket.token);
            return Settled::Stale;
        }
        let set_len = self.current.as_ref().map_or(0, |set| set.questions.len());
        if ticket.index + 1 < set_len {
            self.state = SessionState::Active {
                index: ticket.index + 1,
                selected: None,
            };
            return Settled::NextQuestion;
        }

        if let Some(set) = self.current.take() {
            self.finished.push(TopicAnswers {
                topic: set.topic,
                answers: mem::take(&mut self.answers),
            });
        }
        if self.activate_next_set() {
            Settled::NextTopic
        } else {
            self.state = SessionState::BatchComplete;
            Settled::BatchComplete(mem::take(&mut self.finished))
        }
    }

    fn activate_next_set(&mut self) -> bool {
        let Some(set) = self.queue.pop_front() else {
            return false;
        };
        debug!("starting topic {}", set.topic.label);
        self.current = Some(set);
        self.answers.clear();
        self.progress.advance();
        self.state = SessionState::Active {
            index: 0,
            selected: None,
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::set;

    fn answer(session: &mut QuizSession, option: &str) -> Settled {
        assert!(session.select_option(option));
        let ticket = session.confirm_answer().unwrap();
        session.settle(ticket)
    }

    #[test]
    fn confirm_requires_a_selection() {
        let mut session = QuizSession::new();
        let token = session.begin_loading();
        session.accept_batch(token, vec![set("History", &["h1"])]).unwrap();

        assert_eq!(session.confirm_answer(), None);
        assert!(!session.select_option("Z"));
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn double_submit_is_ignored() {
        let mut session = QuizSession::new();
        let token = session.begin_loading();
        session.accept_batch(token, vec![set("History", &["h1", "h2"])]).unwrap();
        session.select_option("B");
        let ticket = session.confirm_answer().unwrap();

        assert!(session.is_busy());
        assert_eq!(session.confirm_answer(), None);
        assert!(!session.select_option("A"));
        assert_eq!(session.answers().len(), 1);

        assert_eq!(session.settle(ticket), Settled::NextQuestion);
        assert_eq!(session.settle(ticket), Settled::Stale);
        assert_eq!(session.question_index(), Some(1));
    }

    #[test]
    fn finishing_a_set_moves_straight_to_the_next() {
        let mut session = QuizSession::new();
        let token = session.begin_loading();
        session
            .accept_batch(token, vec![set("History", &["h1", "h2"]), set("Science", &["s1"])])
            .unwrap();
        assert_eq!(session.progress().current, 1);

        answer(&mut session, "A");
        assert_eq!(answer(&mut session, "B"), Settled::NextTopic);
        assert_eq!(session.question_index(), Some(0));
        assert!(session.answers().is_empty());
        assert_eq!(session.progress().current, 2);
        assert_eq!(session.current_set().unwrap().topic.label, "Science");

        let Settled::BatchComplete(done) = answer(&mut session, "A") else {
            panic!("batch should be complete");
        };
        let labels: Vec<_> = done.iter().map(|t| t.topic.label.as_str()).collect();
        assert_eq!(labels, ["History", "Science"]);
        assert_eq!(done[0].correct_count(), 1);
        assert_eq!(session.state(), &SessionState::BatchComplete);
    }

    #[test]
    fn late_batch_after_reset_is_dropped() {
        let mut session = QuizSession::new();
        let token = session.begin_loading();
        session.reset();

        let outcome = session.accept_batch(token, vec![set("History", &["h1"])]);
        assert_eq!(outcome.unwrap(), LoadOutcome::Stale);
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(!session.fail_loading(token));
    }

    #[test]
    fn settle_after_reset_is_dropped() {
        let mut session = QuizSession::new();
        let token = session.begin_loading();
        session.accept_batch(token, vec![set("History", &["h1"])]).unwrap();
        session.select_option("A");
        let ticket = session.confirm_answer().unwrap();
        session.reset();

        assert_eq!(session.settle(ticket), Settled::Stale);
    }

    #[test]
    fn malformed_batch_keeps_loading_state() {
        let mut session = QuizSession::new();
        let token = session.begin_loading();
        assert!(session.accept_batch(token, Vec::new()).is_err());
        assert!(session.fail_loading(token));
        assert!(!session.is_busy());
    }
}
