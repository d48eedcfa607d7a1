//! The single owner of all game state.
//!
//! Presentation code reads through accessors and acts only through the
//! methods here; nothing else mutates the stage, the session or the profile.
//! Asynchronous work is split into a `start`/`receive` pair carrying a
//! [`SessionToken`], so a response that arrives after the player moved on
//! is dropped. The `async` helpers just chain the two halves.

use std::mem;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, TriviaError};
use crate::history::{HostHistory, MemoryHistory};
use crate::i18n::{self, Labels, Language};
use crate::navigation::{
    Deferred, ExitResult, HomeRequest, NavAction, NavigationController, PopOutcome, Prompt,
    PromptOutcome,
};
use crate::profile::{AgeGroup, Gender, ProfileStore, UserProfile, STORAGE_KEY};
use crate::quiz::ai_helper::{ContentProvider, ProfileContext, QuestionRequest};
use crate::quiz::evaluation::{self, Commentary, EvaluationResult, TopicReport};
use crate::quiz::session::{LoadOutcome, QuizSession, SessionToken, SettleTicket, Settled};
use crate::quiz::{Difficulty, Question, QuizSet, Topic, TopicAnswers};
use crate::stage::{SelectionPhase, Stage};
use crate::topics::TopicPicker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub difficulty: Difficulty,
    pub questions_per_topic: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            questions_per_topic: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    pub token: SessionToken,
    pub request: QuestionRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub token: SessionToken,
    pub reports: Vec<TopicReport>,
    pub profile: UserProfile,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game<H = MemoryHistory> {
    nav: NavigationController,
    history: H,
    session: QuizSession,
    picker: TopicPicker,
    profile: UserProfile,
    profile_key: String,
    settings: GameSettings,
    results: Vec<EvaluationResult>,
    error: Option<String>,
    finished_batch: Vec<TopicAnswers>,
    evaluating: Option<SessionToken>,
    hint_shown: bool,
    exited: bool,
}

impl<H: HostHistory + Default> Default for Game<H> {
    fn default() -> Self {
        Self::new(
            H::default(),
            UserProfile::default(),
            STORAGE_KEY,
            GameSettings::default(),
        )
    }
}

impl<H: HostHistory> Game<H> {
    /// A profile that already remembers its language skips the language picker.
    pub fn new(
        history: H,
        profile: UserProfile,
        profile_key: impl Into<String>,
        settings: GameSettings,
    ) -> Self {
        let initial = if profile.language.is_some() {
            Stage::Intro
        } else {
            Stage::LanguageSelect
        };
        Self {
            nav: NavigationController::new(initial),
            history,
            session: QuizSession::new(),
            picker: TopicPicker::default(),
            profile,
            profile_key: profile_key.into(),
            settings,
            results: Vec::new(),
            error: None,
            finished_batch: Vec::new(),
            evaluating: None,
            hint_shown: false,
            exited: false,
        }
    }

    /// Loads the profile once and builds a game around it. A profile that
    /// cannot be read is replaced by a fresh one.
    pub fn load<S: ProfileStore>(
        history: H,
        store: &S,
        profile_key: impl Into<String>,
        settings: GameSettings,
    ) -> Self {
        let profile_key = profile_key.into();
        let profile = match store.load(&profile_key) {
            Ok(profile) => profile.unwrap_or_default(),
            Err(e) => {
                warn!("starting with a fresh profile, could not load {profile_key}: {e}");
                UserProfile::default()
            }
        };
        Self::new(history, profile, profile_key, settings)
    }

    /// Installs the history trap. Call once before the first action.
    pub fn start(&mut self) {
        self.nav.initialize(&mut self.history);
    }

    pub fn is_started(&self) -> bool {
        self.nav.is_initialized()
    }

    pub fn stage(&self) -> Stage {
        self.nav.stage()
    }

    pub fn phase(&self) -> SelectionPhase {
        self.nav.phase()
    }

    pub fn prompt(&self) -> Option<Prompt> {
        self.nav.prompt()
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.nav
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Host access, for hosts that are driven from outside (tests, bindings).
    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn picker(&self) -> &TopicPicker {
        &self.picker
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    pub fn results(&self) -> &[EvaluationResult] {
        &self.results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    pub fn language(&self) -> Language {
        self.profile.language.unwrap_or_default()
    }

    pub fn labels(&self) -> &'static Labels {
        self.language().labels()
    }

    /// A network request or the settling delay is in flight.
    pub fn is_pending(&self) -> bool {
        self.session.is_busy() || self.evaluating.is_some()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.current_question()
    }

    pub fn hint(&self) -> Option<&str> {
        if !self.hint_shown {
            return None;
        }
        self.current_question()?.hint.as_deref()
    }

    fn persist<S: ProfileStore>(&self, store: &S) {
        if let Err(e) = store.save(&self.profile_key, &self.profile) {
            warn!("could not save profile {}: {e}", self.profile_key);
        }
    }

    // Forward actions

    pub fn choose_language<S: ProfileStore>(&mut self, language: Language, store: &S) -> bool {
        if self.stage() != Stage::LanguageSelect {
            return false;
        }
        self.profile.language = Some(language);
        self.persist(store);
        self.nav.dispatch(NavAction::ChooseLanguage, &mut self.history).is_some()
    }

    pub fn change_language(&mut self) -> bool {
        self.nav.dispatch(NavAction::ChangeLanguage, &mut self.history).is_some()
    }

    pub fn begin(&mut self) -> bool {
        self.nav.dispatch(NavAction::Begin, &mut self.history).is_some()
    }

    pub fn edit_profile(&mut self) -> bool {
        self.nav.dispatch(NavAction::EditProfile, &mut self.history).is_some()
    }

    pub fn set_gender(&mut self, gender: Option<Gender>) -> bool {
        self.edit(|profile| profile.gender = gender)
    }

    pub fn set_age_group(&mut self, age_group: Option<AgeGroup>) -> bool {
        self.edit(|profile| profile.age_group = age_group)
    }

    /// Free text. Keyboard buttons from any language are refused.
    pub fn set_nationality(&mut self, nationality: &str) -> bool {
        if i18n::is_button_label(nationality) {
            debug!("refusing button label {nationality:?} as nationality");
            return false;
        }
        let nationality = nationality.trim();
        let value = (!nationality.is_empty()).then(|| nationality.to_string());
        self.edit(|profile| profile.nationality = value)
    }

    fn edit(&mut self, change: impl FnOnce(&mut UserProfile)) -> bool {
        if self.stage() != Stage::Profile || self.is_pending() || self.prompt().is_some() {
            return false;
        }
        change(&mut self.profile);
        true
    }

    /// Saves the profile and continues to topic selection without a marker.
    pub fn submit_profile<S: ProfileStore>(&mut self, store: &S) -> bool {
        if self.stage() != Stage::Profile || self.is_pending() {
            return false;
        }
        if self.nav.dispatch(NavAction::SubmitProfile, &mut self.history).is_none() {
            return false;
        }
        self.persist(store);
        true
    }

    /// Shows the last session from the profile history.
    pub fn preview_results(&mut self) -> bool {
        if self.profile.history.is_empty() {
            return false;
        }
        if self.nav.dispatch(NavAction::PreviewResults, &mut self.history).is_none() {
            return false;
        }
        self.results.clear();
        true
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.stage() != Stage::TopicSelection {
            return false;
        }
        self.settings.difficulty = difficulty;
        true
    }

    pub fn open_category(&mut self, id: &str) -> bool {
        if self.stage() != Stage::TopicSelection
            || self.phase() != SelectionPhase::Category
            || self.prompt().is_some()
        {
            return false;
        }
        if !self.picker.open_category(id) {
            return false;
        }
        self.nav.dispatch(NavAction::OpenCategory, &mut self.history).is_some()
    }

    pub fn toggle_subtopic(&mut self, topic: Topic) -> bool {
        if self.stage() != Stage::TopicSelection || self.phase() != SelectionPhase::Subtopic {
            return false;
        }
        self.picker.toggle(topic)
    }

    /// Moves to LoadingQuiz and hands back the request to send.
    pub fn start_quiz(&mut self) -> Option<QuizRequest> {
        if self.is_pending() || self.picker.selected().is_empty() {
            return None;
        }
        self.nav.dispatch(NavAction::StartQuiz, &mut self.history)?;
        let topics = self.picker.selected().to_vec();
        let token = self.session.begin_loading();
        self.results.clear();
        self.error = None;
        info!("loading quiz for {} topics", topics.len());
        Some(QuizRequest {
            token,
            request: QuestionRequest {
                context: ProfileContext::from_profile(&self.profile, &topics),
                topics,
                difficulty: self.settings.difficulty,
                language: self.language(),
                questions_per_topic: self.settings.questions_per_topic,
            },
        })
    }

    pub fn receive_questions(
        &mut self,
        token: SessionToken,
        response: Result<Vec<QuizSet>, ProviderError>,
    ) {
        match response.map(|sets| self.session.accept_batch(token, sets)) {
            Ok(Ok(LoadOutcome::Started)) => {
                self.hint_shown = false;
                self.nav.dispatch(NavAction::QuizReady, &mut self.history);
            }
            Ok(Ok(LoadOutcome::Stale)) => {}
            Ok(Err(e)) | Err(e) => {
                if self.session.fail_loading(token) {
                    self.fail(TriviaError::ContentGeneration(e.to_string()));
                }
            }
        }
    }

    pub async fn load_quiz<C: ContentProvider>(&mut self, provider: &C) -> bool {
        let Some(QuizRequest { token, request }) = self.start_quiz() else {
            return false;
        };
        let response = provider.generate_questions(&request).await;
        self.receive_questions(token, response);
        self.stage() == Stage::Quiz
    }

    pub fn select_option(&mut self, option: &str) -> bool {
        if self.stage() != Stage::Quiz || self.prompt().is_some() {
            return false;
        }
        self.session.select_option(option)
    }

    pub fn reveal_hint(&mut self) -> Option<&str> {
        if self.stage() != Stage::Quiz {
            return None;
        }
        self.hint_shown = true;
        self.hint()
    }

    pub fn confirm_answer(&mut self) -> Option<SettleTicket> {
        if self.stage() != Stage::Quiz || self.prompt().is_some() {
            return None;
        }
        self.session.confirm_answer()
    }

    /// Finishes a confirmed answer after the settling delay.
    pub fn settle(&mut self, ticket: SettleTicket) -> Settled {
        let settled = self.session.settle(ticket);
        match &settled {
            Settled::NextQuestion | Settled::NextTopic => self.hint_shown = false,
            Settled::BatchComplete(batch) => {
                self.finished_batch = batch.clone();
                self.hint_shown = false;
                self.nav.dispatch(NavAction::BatchFinished, &mut self.history);
            }
            Settled::Stale => {}
        }
        settled
    }

    /// Scores the finished batch into the profile, saves it, and hands back
    /// the commentary request.
    pub fn begin_evaluation<S: ProfileStore>(&mut self, store: &S) -> Option<EvaluationRequest> {
        if self.stage() != Stage::Analyzing || self.finished_batch.is_empty() {
            return None;
        }
        let batch = mem::take(&mut self.finished_batch);
        let reports = evaluation::apply_batch(
            &mut self.profile,
            &batch,
            self.settings.difficulty,
            Utc::now(),
        );
        self.persist(store);

        let token = self.session.token();
        self.evaluating = Some(token);
        Some(EvaluationRequest {
            token,
            reports,
            profile: self.profile.clone(),
            language: self.language(),
        })
    }

    pub fn receive_evaluation(
        &mut self,
        token: SessionToken,
        reports: &[TopicReport],
        response: Result<Vec<Commentary>, ProviderError>,
    ) {
        if self.evaluating != Some(token) || self.session.token() != token {
            warn!("discarding evaluation for stale session {token:?}");
            return;
        }
        self.evaluating = None;
        match response.and_then(|commentary| evaluation::attach(reports, commentary)) {
            Ok(results) => {
                self.results = results;
                self.session.reset();
                self.nav.dispatch(NavAction::ResultsReady, &mut self.history);
            }
            Err(e) => self.fail(TriviaError::Evaluation(e.to_string())),
        }
    }

    pub async fn evaluate<C: ContentProvider, S: ProfileStore>(&mut self, provider: &C, store: &S) {
        let Some(request) = self.begin_evaluation(store) else {
            return;
        };
        let response = provider
            .evaluate_batch(&request.reports, &request.profile, request.language)
            .await;
        self.receive_evaluation(request.token, &request.reports, response);
    }

    /// Confirm, wait out the settling delay, advance, and evaluate when done.
    pub async fn submit_answer<C: ContentProvider, S: ProfileStore>(
        &mut self,
        provider: &C,
        store: &S,
        settle_delay: Duration,
    ) -> Option<Settled> {
        let ticket = self.confirm_answer()?;
        tokio::time::sleep(settle_delay).await;
        let settled = self.settle(ticket);
        if matches!(settled, Settled::BatchComplete(_)) {
            self.evaluate(provider, store).await;
        }
        Some(settled)
    }

    pub fn play_again(&mut self) -> bool {
        if self.nav.dispatch(NavAction::PlayAgain, &mut self.history).is_none() {
            return false;
        }
        self.clear_session();
        true
    }

    fn fail(&mut self, error: TriviaError) {
        warn!("{:?} failed: {error}", self.stage());
        self.error = Some(error.to_string());
        self.evaluating = None;
        self.nav.dispatch(NavAction::Fail, &mut self.history);
    }

    // Backward movement

    /// UI back control: asks the host to go back; the pop does the rest.
    pub fn request_back(&mut self) -> bool {
        if self.is_pending() || self.prompt().is_some() {
            debug!("ignoring back while pending");
            return false;
        }
        self.history.go_back(1);
        self.pump();
        true
    }

    pub fn request_home(&mut self) -> HomeRequest {
        if self.is_pending() {
            debug!("ignoring home while pending");
            return HomeRequest::Ignored;
        }
        let request = self.nav.request_home();
        if request == HomeRequest::Reset {
            self.clear_session();
        }
        request
    }

    pub fn answer_prompt(&mut self, confirmed: bool) -> PromptOutcome {
        let outcome = self.nav.answer_prompt(confirmed, &mut self.history);
        if outcome == PromptOutcome::ResetHome {
            self.clear_session();
        }
        self.pump();
        outcome
    }

    /// Host pop notification for hosts that call in instead of queueing.
    pub fn on_popped(&mut self) -> PopOutcome {
        let outcome = self.nav.on_popped(&mut self.history);
        self.apply_pop(outcome);
        outcome
    }

    /// One tick of the event loop: delivers queued pops, runs deferred work,
    /// then replays pops held back by a prompt.
    pub fn pump(&mut self) {
        loop {
            let popped = self.history.take_popped();
            for _ in 0..popped {
                self.on_popped();
            }
            if let Some(task) = self.nav.take_deferred() {
                self.run_deferred(task);
                continue;
            }
            if let Some(outcome) = self.nav.take_held_pop(&mut self.history) {
                self.apply_pop(outcome);
                continue;
            }
            if popped == 0 {
                break;
            }
        }
    }

    fn apply_pop(&mut self, outcome: PopOutcome) {
        match outcome {
            PopOutcome::SubtopicsClosed => self.picker.clear_subtopics(),
            PopOutcome::StageChanged(Stage::Intro) => self.clear_session(),
            PopOutcome::StageChanged(_) | PopOutcome::Prompted(_) | PopOutcome::Held => {}
        }
    }

    fn run_deferred(&mut self, task: Deferred) {
        debug!("running deferred {task:?}");
        match task {
            Deferred::LeaveApp => {
                if self.nav.leave_app(&mut self.history) != ExitResult::SteppedBack {
                    self.exited = true;
                }
            }
            Deferred::ResetHome => {
                self.nav.enter_intro();
                self.clear_session();
            }
        }
    }

    /// Drops everything tied to the current run. Outstanding responses become stale.
    fn clear_session(&mut self) {
        self.session.reset();
        self.picker.clear();
        self.results.clear();
        self.error = None;
        self.finished_batch.clear();
        self.evaluating = None;
        self.hint_shown = false;
    }
}
