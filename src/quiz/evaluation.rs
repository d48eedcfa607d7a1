//! Folds a finished batch into the profile and pairs it with provider commentary.
//!
//! Local scoring always happens first and is never undone: a failed
//! commentary request still leaves the updated scores, ratings and history
//! in place.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::profile::{SessionRecord, UserProfile};
use crate::quiz::{Difficulty, Topic, TopicAnswers, UserAnswer};

/// What the provider is asked to comment on for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicReport {
    pub topic: Topic,
    pub score: u8,
    pub answers: Vec<UserAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub is_correct: bool,
    pub commentary: String,
    /// Only for wrong answers.
    pub correction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub topic: Topic,
    pub score: u8,
    pub percentile: u8,
    pub demographic_percentile: u8,
    pub comparisons: Vec<String>,
    pub details: Vec<QuestionReview>,
}

/// round(100 * correct / total); an empty list scores 0.
pub fn score(answers: &[UserAnswer]) -> u8 {
    if answers.is_empty() {
        return 0;
    }
    let correct = answers.iter().filter(|a| a.is_correct).count();
    ((correct * 100) as f64 / answers.len() as f64).round() as u8
}

pub fn rating_step(score: u8) -> i64 {
    match score {
        80.. => 30,
        60.. => 10,
        40.. => -10,
        _ => -20,
    }
}

pub fn next_rating(current: u32, score: u8) -> u32 {
    (i64::from(current) + rating_step(score)).max(0) as u32
}

/// Applies every topic of the batch to `profile`, in order.
pub fn apply_batch(
    profile: &mut UserProfile,
    batch: &[TopicAnswers],
    difficulty: Difficulty,
    now: DateTime<Utc>,
) -> Vec<TopicReport> {
    batch
        .iter()
        .map(|topic| {
            let score = score(&topic.answers);

            let best = profile
                .best_scores
                .entry(topic.topic.label.clone())
                .or_insert(score);
            if score >= *best {
                *best = score;
            }

            for answer in &topic.answers {
                profile.mark_seen(&answer.question_id);
            }

            let rating = next_rating(profile.rating(&topic.topic.id), score);
            profile.ratings.insert(topic.topic.id.clone(), rating);

            profile.history.push(SessionRecord {
                timestamp: now,
                topic_id: topic.topic.id.clone(),
                score,
                ai_score: difficulty.ai_benchmark(),
                difficulty,
            });
            debug!(
                "{}: score {score}, rating {rating}",
                topic.topic.label
            );

            TopicReport {
                topic: topic.topic.clone(),
                score,
                answers: topic.answers.clone(),
            }
        })
        .collect()
}

/// Provider commentary for one topic, before it is tied back to that topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commentary {
    pub percentile: u8,
    pub demographic_percentile: u8,
    pub comparisons: Vec<String>,
    pub details: Vec<QuestionReview>,
}

/// Pairs commentary with reports by position. Counts must match exactly.
pub fn attach(
    reports: &[TopicReport],
    commentary: Vec<Commentary>,
) -> Result<Vec<EvaluationResult>, ProviderError> {
    if reports.len() != commentary.len() {
        return Err(ProviderError::Malformed(format!(
            "expected {} evaluations, got {}",
            reports.len(),
            commentary.len()
        )));
    }
    Ok(reports
        .iter()
        .zip(commentary)
        .map(|(report, c)| EvaluationResult {
            topic: report.topic.clone(),
            score: report.score,
            percentile: c.percentile.min(100),
            demographic_percentile: c.demographic_percentile.min(100),
            comparisons: c.comparisons,
            details: reconcile(report, c.details),
        })
        .collect())
}

/// Correctness comes from the recorded answers, not from the provider.
fn reconcile(report: &TopicReport, details: Vec<QuestionReview>) -> Vec<QuestionReview> {
    details
        .into_iter()
        .map(|mut review| {
            if let Some(answer) = report
                .answers
                .iter()
                .find(|a| a.question_id == review.question_id)
            {
                review.is_correct = answer.is_correct;
            }
            if review.is_correct {
                review.correction = None;
            }
            review
        })
        .collect()
}
