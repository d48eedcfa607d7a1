//! The content provider: question generation and batch commentary.

use std::future::Future;

use chatgpt::client::ChatGPT;
use chatgpt::types::CompletionResponse;
use log::{debug, error};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::i18n::Language;
use crate::profile::UserProfile;
use crate::quiz::evaluation::{Commentary, TopicReport};
use crate::quiz::{validate_batch, Difficulty, Question, QuizSet, Topic};

const RECENTLY_SEEN_LIMIT: usize = 50;

/// Profile facts that steer generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileContext {
    pub demographic: String,
    pub ratings: Vec<(String, u32)>,
    pub recently_seen: Vec<String>,
}

impl ProfileContext {
    pub fn from_profile(profile: &UserProfile, topics: &[Topic]) -> Self {
        Self {
            demographic: profile.demographic_summary(),
            ratings: topics
                .iter()
                .map(|t| (t.id.clone(), profile.rating(&t.id)))
                .collect(),
            recently_seen: profile
                .seen_questions
                .iter()
                .rev()
                .take(RECENTLY_SEEN_LIMIT)
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub topics: Vec<Topic>,
    pub difficulty: Difficulty,
    pub language: Language,
    pub questions_per_topic: usize,
    pub context: ProfileContext,
}

/// Generates quiz content. Implementations fail rather than return partial data.
pub trait ContentProvider {
    /// One set per requested topic, in request order.
    fn generate_questions(
        &self,
        request: &QuestionRequest,
    ) -> impl Future<Output = Result<Vec<QuizSet>, ProviderError>> + Send;

    /// One commentary per report, in report order.
    fn evaluate_batch(
        &self,
        reports: &[TopicReport],
        profile: &UserProfile,
        language: Language,
    ) -> impl Future<Output = Result<Vec<Commentary>, ProviderError>> + Send;
}

/// Voice used for the commentary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Persona {
    #[default]
    Professor,
    Sportscaster,
    Pirate,
}

impl Persona {
    pub fn describe(&self) -> &'static str {
        match self {
            Persona::Professor => "a warm, slightly pedantic university professor",
            Persona::Sportscaster => "an excitable sports commentator",
            Persona::Pirate => "a cheerful pirate captain",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "professor" => Some(Persona::Professor),
            "sportscaster" => Some(Persona::Sportscaster),
            "pirate" => Some(Persona::Pirate),
            _ => None,
        }
    }
}

pub struct QuizHelper {
    persona: Persona,
    chat_gpt: ChatGPT,
}

impl QuizHelper {
    pub fn new(chat_gpt: ChatGPT, persona: Persona) -> Self {
        Self { persona, chat_gpt }
    }

    async fn complete(&self, prompt: String) -> Result<String, ProviderError> {
        let response: CompletionResponse = self.chat_gpt.send_message(prompt).await.map_err(|e| {
            error!("ChatGPT request failed: {e}");
            e
        })?;
        let content = response.message().clone().content;
        debug!("Completion: {:?}", content);
        Ok(content)
    }
}

impl ContentProvider for QuizHelper {
    async fn generate_questions(
        &self,
        request: &QuestionRequest,
    ) -> Result<Vec<QuizSet>, ProviderError> {
        debug!(
            "Generating questions for {:?}",
            request.topics.iter().map(|t| &t.label).collect::<Vec<_>>()
        );
        let content = self.complete(question_prompt(request)).await?;
        parse_question_sets(&content, &request.topics)
    }

    async fn evaluate_batch(
        &self,
        reports: &[TopicReport],
        profile: &UserProfile,
        language: Language,
    ) -> Result<Vec<Commentary>, ProviderError> {
        debug!("Evaluating {} topics", reports.len());
        let content = self
            .complete(evaluation_prompt(reports, profile, language, self.persona)?)
            .await?;
        parse_commentary(&content)
    }
}

fn question_prompt(request: &QuestionRequest) -> String {
    let topics = request
        .topics
        .iter()
        .map(|t| format!("{{\"topic_id\": \"{}\", \"label\": \"{}\"}}", t.id, t.label))
        .collect::<Vec<_>>()
        .join(", ");
    let ratings = request
        .context
        .ratings
        .iter()
        .map(|(id, rating)| format!("{id}: {rating}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You write trivia quizzes. Write {count} multiple-choice questions for each of these topics, in this order: [{topics}].
        Difficulty: {difficulty}. Write every question, option and hint in {language}.
        The player is: {demographic}. Their skill ratings (1000 is average): {ratings}.
        Do not reuse these question ids: [{seen}].
        Every question has exactly 4 distinct options and exactly one of them is correct.
        Reply with JSON only, no prose, in this shape:
        {{\"sets\": [{{\"topic_id\": \"...\", \"questions\": [{{\"id\": \"short-unique-slug\", \"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \"answer\": \"exact text of the correct option\", \"hint\": \"...\"}}]}}]}}",
        count = request.questions_per_topic,
        difficulty = request.difficulty,
        language = request.language.native_name(),
        demographic = request.context.demographic,
        seen = request.context.recently_seen.join(", "),
    )
}

fn evaluation_prompt(
    reports: &[TopicReport],
    profile: &UserProfile,
    language: Language,
    persona: Persona,
) -> Result<String, ProviderError> {
    let reports = serde_json::to_string(reports)?;
    Ok(format!(
        "You grade trivia results. Speak like {persona} and write in {language}.
        The player is: {demographic}.
        Here are their results per topic, in order: {reports}
        For each topic, in the same order, estimate the percentile of the general population this score beats,
        and the percentile among people with the same demographic. Add one or two short comparisons,
        and for every answer a one-sentence commentary; for wrong answers also a correction.
        Reply with JSON only, no prose, in this shape:
        {{\"evaluations\": [{{\"percentile\": 0, \"demographic_percentile\": 0, \"comparisons\": [\"...\"], \"details\": [{{\"question_id\": \"...\", \"is_correct\": true, \"commentary\": \"...\", \"correction\": null}}]}}]}}",
        persona = persona.describe(),
        language = language.native_name(),
        demographic = profile.demographic_summary(),
    ))
}

/// The JSON object inside a completion, ignoring code fences or chatter around it.
fn json_payload(content: &str) -> Result<&str, ProviderError> {
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&content[start..=end]),
        _ => Err(ProviderError::Malformed("completion holds no JSON object".into())),
    }
}

#[derive(Deserialize)]
struct GeneratedBatch {
    sets: Vec<GeneratedSet>,
}

#[derive(Deserialize)]
struct GeneratedSet {
    #[serde(default)]
    topic_id: Option<String>,
    questions: Vec<GeneratedQuestion>,
}

#[derive(Deserialize)]
struct GeneratedQuestion {
    #[serde(default)]
    id: Option<String>,
    question: String,
    options: Vec<String>,
    answer: String,
    #[serde(default)]
    hint: Option<String>,
}

fn slug(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    words.join("-").chars().take(48).collect()
}

/// Turns a completion into validated sets, labelled with the requested topics.
pub fn parse_question_sets(content: &str, topics: &[Topic]) -> Result<Vec<QuizSet>, ProviderError> {
    let batch: GeneratedBatch = serde_json::from_str(json_payload(content)?)?;
    if batch.sets.len() != topics.len() {
        return Err(ProviderError::Malformed(format!(
            "asked for {} topics, got {}",
            topics.len(),
            batch.sets.len()
        )));
    }

    let mut rng = rand::thread_rng();
    let sets = topics
        .iter()
        .zip(batch.sets)
        .map(|(topic, set)| {
            if let Some(id) = set.topic_id.as_deref().filter(|id| *id != topic.id) {
                debug!("provider labelled {} as {id}", topic.id);
            }
            let questions = set
                .questions
                .into_iter()
                .map(|q| {
                    let raw_id = q.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| slug(&q.question));
                    // So the correct one isn't always in the same spot
                    let mut options = q.options;
                    options.shuffle(&mut rng);
                    Question {
                        id: format!("{}:{}", topic.id, raw_id.trim()),
                        text: q.question,
                        options,
                        correct: q.answer,
                        hint: q.hint.filter(|h| !h.trim().is_empty()),
                    }
                })
                .collect();
            QuizSet::new(topic.clone(), questions)
        })
        .collect::<Vec<_>>();

    validate_batch(&sets)?;
    Ok(sets)
}

#[derive(Deserialize)]
struct GeneratedEvaluation {
    evaluations: Vec<Commentary>,
}

pub fn parse_commentary(content: &str) -> Result<Vec<Commentary>, ProviderError> {
    let parsed: GeneratedEvaluation = serde_json::from_str(json_payload(content)?)?;
    Ok(parsed.evaluations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SETS: &str = r#"Sure! ```json
    {"sets": [
      {"topic_id": "history", "questions": [
        {"id": "h1", "question": "Who crossed the Rubicon?", "options": ["Caesar", "Nero", "Cato", "Sulla"], "answer": "Caesar", "hint": "Veni, vidi..."}
      ]},
      {"questions": [
        {"question": "H2O is?", "options": ["Water", "Salt", "Air", "Gold"], "answer": "Water", "hint": ""}
      ]}
    ]}
    ```"#;

    fn topics() -> Vec<Topic> {
        vec![Topic::new("history", "History"), Topic::new("science", "Science")]
    }

    #[test]
    fn parses_fenced_completion() {
        let sets = parse_question_sets(TWO_SETS, &topics()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].questions[0].id, "history:h1");
        assert_eq!(sets[1].questions[0].id, "science:h2o-is");
        assert_eq!(sets[1].topic.label, "Science");
        assert_eq!(sets[1].questions[0].hint, None);
        assert!(sets[0].questions[0].has_option("Caesar"));
    }

    #[test]
    fn topic_count_mismatch_fails() {
        let err = parse_question_sets(TWO_SETS, &topics()[..1]).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn answer_outside_options_fails() {
        let bad = TWO_SETS.replace("\"answer\": \"Water\"", "\"answer\": \"Fire\"");
        assert!(parse_question_sets(&bad, &topics()).is_err());
    }

    #[test]
    fn prose_without_json_fails() {
        assert!(matches!(
            parse_commentary("I cannot help with that."),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn commentary_parses() {
        let parsed = parse_commentary(
            r#"{"evaluations": [{"percentile": 71, "demographic_percentile": 64, "comparisons": ["Top third"],
                "details": [{"question_id": "history:h1", "is_correct": false, "commentary": "Close", "correction": "Caesar"}]}]}"#,
        )
        .unwrap();
        assert_eq!(parsed[0].percentile, 71);
        assert_eq!(parsed[0].details[0].correction.as_deref(), Some("Caesar"));
    }

    #[test]
    fn context_carries_ratings_for_requested_topics() {
        let mut profile = UserProfile::default();
        profile.ratings.insert("history".into(), 1030);
        let context = ProfileContext::from_profile(&profile, &topics());
        assert_eq!(
            context.ratings,
            vec![("history".to_string(), 1030), ("science".to_string(), 1000)]
        );
    }

    #[test]
    fn context_lists_the_newest_seen_ids_first() {
        let mut profile = UserProfile::default();
        for i in 0..20 {
            profile.mark_seen(&format!("zoology:q{i:02}"));
        }
        for i in 0..45 {
            profile.mark_seen(&format!("art:q{i:02}"));
        }
        let context = ProfileContext::from_profile(&profile, &topics());
        assert_eq!(context.recently_seen.len(), RECENTLY_SEEN_LIMIT);
        assert_eq!(context.recently_seen[0], "art:q44");
        assert_eq!(context.recently_seen[44], "art:q00");
        assert_eq!(context.recently_seen[45], "zoology:q19");
        assert!(!context.recently_seen.contains(&"zoology:q00".to_string()));
    }
}
