//! Stage bookkeeping and back-navigation handling.
//!
//! [`NavigationController`] is the only owner of [`Stage`] and
//! [`SelectionPhase`]. Forward moves go through [`NavigationController::dispatch`]
//! and the transition table; every backward move, including the UI back button,
//! arrives as a host pop and goes through [`NavigationController::on_popped`].

pub mod transitions;

use std::collections::VecDeque;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::history::{HostHistory, HostNav, Marker, MarkerKey};
use crate::stage::{SelectionPhase, Stage};

pub use transitions::NavAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptKind {
    ConfirmExit,
    ConfirmReturnHome,
}

/// Where a prompt came from decides what confirming it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptOrigin {
    Popped,
    HomeControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub kind: PromptKind,
    pub origin: PromptOrigin,
}

/// Work scheduled for the next tick so the prompt UI can settle first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deferred {
    LeaveApp,
    ResetHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    Prompted(PromptKind),
    /// Subtopic phase closed, the subtopic selection must be cleared.
    SubtopicsClosed,
    StageChanged(Stage),
    /// A prompt is open; the pop will be replayed once it is answered.
    Held,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Nothing was open.
    NoPrompt,
    Scheduled(Deferred),
    /// Trap restored after a cancelled exit.
    TrapRestored,
    /// A home-control confirmation reset the stage right away.
    ResetHome,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeRequest {
    Ignored,
    Prompted,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitResult {
    Left,
    Closed,
    SteppedBack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationController {
    stage: Stage,
    phase: SelectionPhase,
    /// Markers currently sitting above `root`, as far as pops have told us.
    depth: usize,
    initialized: bool,
    prompt: Option<Prompt>,
    held_pops: usize,
    deferred: VecDeque<Deferred>,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new(Stage::LanguageSelect)
    }
}

impl NavigationController {
    pub fn new(initial: Stage) -> Self {
        Self {
            stage: initial,
            phase: SelectionPhase::Category,
            depth: 0,
            initialized: false,
            prompt: None,
            held_pops: 0,
            deferred: VecDeque::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn prompt(&self) -> Option<Prompt> {
        self.prompt
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn deferred(&self) -> impl Iterator<Item = &Deferred> {
        self.deferred.iter()
    }

    /// Sets up the two-deep trap: `root` replaces whatever the host had, and
    /// `app_initialized` sits on top of it. A host already showing our
    /// `app_initialized` marker was set up earlier and is left alone.
    pub fn initialize<H: HostHistory>(&mut self, host: &mut H) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        if host.current_marker().map(|m| m.key) == Some(MarkerKey::AppInitialized) {
            debug!("history trap already present, keeping it");
            self.depth = 1;
            return false;
        }
        host.replace_current_marker(Marker::new(MarkerKey::Root));
        host.push_marker(Marker::for_stage(MarkerKey::AppInitialized, self.stage));
        self.depth = 1;
        info!("history trap installed");
        true
    }

    /// Applies a forward action. Returns the new stage, or `None` when the
    /// action is not allowed from here (ignored, never an error).
    pub fn dispatch<H: HostHistory>(&mut self, action: NavAction, host: &mut H) -> Option<Stage> {
        if self.prompt.is_some() && !action.is_system() {
            debug!("ignoring {action:?}: prompt is open");
            return None;
        }
        let Some(transition) = transitions::lookup(self.stage, self.phase, action) else {
            debug!(
                "ignoring {action:?} from {:?}/{:?}",
                self.stage, self.phase
            );
            return None;
        };
        if let Some(key) = transition.marker {
            self.push(host, Marker::for_stage(key, transition.to));
        }
        debug!("{:?} --{action:?}--> {:?}", self.stage, transition.to);
        self.stage = transition.to;
        self.phase = transition.to_phase;
        Some(self.stage)
    }

    /// Host pop notification. Decides from the live stage and phase only.
    pub fn on_popped<H: HostHistory>(&mut self, host: &mut H) -> PopOutcome {
        self.depth = self.depth.saturating_sub(1);
        if self.prompt.is_some() {
            self.held_pops += 1;
            return PopOutcome::Held;
        }
        self.handle_pop(host)
    }

    fn handle_pop<H: HostHistory>(&mut self, host: &mut H) -> PopOutcome {
        debug!("pop at {:?}/{:?}", self.stage, self.phase);
        match (self.stage, self.phase) {
            (Stage::Intro, _) => self.open_prompt(PromptKind::ConfirmExit, PromptOrigin::Popped),
            (Stage::TopicSelection, SelectionPhase::Subtopic) => {
                self.phase = SelectionPhase::Category;
                PopOutcome::SubtopicsClosed
            }
            (Stage::TopicSelection, SelectionPhase::Category) | (Stage::Profile, _) => {
                self.enter_intro();
                PopOutcome::StageChanged(Stage::Intro)
            }
            (stage, _) if stage.is_guarded() => {
                // Re-arm before asking so a second pop cannot slip out.
                self.push(host, Marker::for_stage(MarkerKey::Locked, stage));
                self.open_prompt(PromptKind::ConfirmReturnHome, PromptOrigin::Popped)
            }
            _ => {
                self.enter_intro();
                PopOutcome::StageChanged(Stage::Intro)
            }
        }
    }

    /// UI home control. Quiz and Results ask first; anything else resets at once.
    pub fn request_home(&mut self) -> HomeRequest {
        if self.prompt.is_some() {
            return HomeRequest::Ignored;
        }
        if matches!(self.stage, Stage::Quiz | Stage::Results) {
            self.open_prompt(PromptKind::ConfirmReturnHome, PromptOrigin::HomeControl);
            HomeRequest::Prompted
        } else {
            self.enter_intro();
            HomeRequest::Reset
        }
    }

    /// Resolves the open prompt.
    pub fn answer_prompt<H: HostHistory>(&mut self, confirmed: bool, host: &mut H) -> PromptOutcome {
        let Some(prompt) = self.prompt.take() else {
            return PromptOutcome::NoPrompt;
        };
        debug!("{:?} answered: confirmed={confirmed}", prompt.kind);
        match (prompt.kind, prompt.origin, confirmed) {
            (PromptKind::ConfirmExit, _, true) => {
                self.deferred.push_back(Deferred::LeaveApp);
                PromptOutcome::Scheduled(Deferred::LeaveApp)
            }
            (PromptKind::ConfirmExit, _, false) => {
                self.push(host, Marker::for_stage(MarkerKey::AppInitialized, self.stage));
                PromptOutcome::TrapRestored
            }
            (PromptKind::ConfirmReturnHome, PromptOrigin::Popped, true) => {
                self.deferred.push_back(Deferred::ResetHome);
                PromptOutcome::Scheduled(Deferred::ResetHome)
            }
            (PromptKind::ConfirmReturnHome, PromptOrigin::HomeControl, true) => {
                self.enter_intro();
                PromptOutcome::ResetHome
            }
            (PromptKind::ConfirmReturnHome, _, false) => PromptOutcome::Dismissed,
        }
    }

    /// Replays one pop that arrived while a prompt was open, once it is closed.
    pub fn take_held_pop<H: HostHistory>(&mut self, host: &mut H) -> Option<PopOutcome> {
        if self.held_pops == 0 || self.prompt.is_some() {
            return None;
        }
        self.held_pops -= 1;
        Some(self.handle_pop(host))
    }

    pub fn take_deferred(&mut self) -> Option<Deferred> {
        self.deferred.pop_front()
    }

    /// Leaves the app after a confirmed exit: pop every entry down past
    /// `root`, then try closing, then settle for a single step back.
    pub fn leave_app<H: HostHistory>(&mut self, host: &mut H) -> ExitResult {
        match host.go_back(self.depth + 1) {
            HostNav::Left => {
                info!("left the app through history");
                return ExitResult::Left;
            }
            HostNav::Popped => warn!("batch back stayed inside the app"),
            HostNav::Ignored => debug!("not enough history to leave"),
        }
        if host.close() {
            info!("host closed");
            return ExitResult::Closed;
        }
        if host.go_back(1) == HostNav::Left {
            return ExitResult::Left;
        }
        ExitResult::SteppedBack
    }

    /// Full reset of stage and phase to Intro. History is left as is.
    pub fn enter_intro(&mut self) {
        self.stage = Stage::Intro;
        self.phase = SelectionPhase::Category;
        self.prompt = None;
        self.held_pops = 0;
    }

    fn open_prompt(&mut self, kind: PromptKind, origin: PromptOrigin) -> PopOutcome {
        self.prompt = Some(Prompt { kind, origin });
        PopOutcome::Prompted(kind)
    }

    fn push<H: HostHistory>(&mut self, host: &mut H, marker: Marker) {
        host.push_marker(marker);
        self.depth += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;

    fn at_intro() -> (NavigationController, MemoryHistory) {
        let mut nav = NavigationController::new(Stage::Intro);
        let mut host = MemoryHistory::with_foreign_entries(1);
        assert!(nav.initialize(&mut host));
        (nav, host)
    }

    fn pop(nav: &mut NavigationController, host: &mut MemoryHistory) -> PopOutcome {
        assert_eq!(host.go_back(1), HostNav::Popped);
        assert_eq!(host.take_popped(), 1);
        nav.on_popped(host)
    }

    #[test]
    fn initialize_installs_root_and_trap() {
        let (nav, host) = at_intro();
        let keys: Vec<_> = host
            .entries()
            .iter()
            .map(|e| e.marker.map(|m| m.key))
            .collect();
        assert_eq!(
            keys,
            vec![None, Some(MarkerKey::Root), Some(MarkerKey::AppInitialized)]
        );
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn initialize_keeps_existing_trap() {
        let (_, mut host) = at_intro();
        let mut reloaded = NavigationController::new(Stage::Intro);
        assert!(!reloaded.initialize(&mut host));
        assert_eq!(host.len(), 3);
        assert_eq!(reloaded.depth(), 1);
    }

    #[test]
    fn cancelled_exit_restores_the_trap() {
        let (mut nav, mut host) = at_intro();
        let before = nav.clone();

        assert_eq!(pop(&mut nav, &mut host), PopOutcome::Prompted(PromptKind::ConfirmExit));
        assert_eq!(nav.answer_prompt(false, &mut host), PromptOutcome::TrapRestored);

        assert_eq!(nav, before);
        assert_eq!(
            host.current_marker().map(|m| m.key),
            Some(MarkerKey::AppInitialized)
        );
    }

    #[test]
    fn confirmed_exit_leaves_on_the_next_tick() {
        let (mut nav, mut host) = at_intro();
        pop(&mut nav, &mut host);
        assert_eq!(
            nav.answer_prompt(true, &mut host),
            PromptOutcome::Scheduled(Deferred::LeaveApp)
        );
        assert!(!host.has_left());

        assert_eq!(nav.take_deferred(), Some(Deferred::LeaveApp));
        assert_eq!(nav.leave_app(&mut host), ExitResult::Left);
        assert!(host.has_left());
    }

    #[test]
    fn exit_without_foreign_history_closes_or_steps_back() {
        let mut nav = NavigationController::new(Stage::Intro);
        let mut host = MemoryHistory::new();
        nav.initialize(&mut host);
        pop(&mut nav, &mut host);
        nav.answer_prompt(true, &mut host);
        nav.take_deferred();
        assert_eq!(nav.leave_app(&mut host), ExitResult::SteppedBack);
        assert!(!host.has_left());

        let mut nav = NavigationController::new(Stage::Intro);
        let mut host = MemoryHistory::new().closable();
        nav.initialize(&mut host);
        pop(&mut nav, &mut host);
        nav.answer_prompt(true, &mut host);
        assert_eq!(nav.leave_app(&mut host), ExitResult::Closed);
    }

    #[test]
    fn subtopic_pop_returns_to_category_without_pushing() {
        let (mut nav, mut host) = at_intro();
        nav.dispatch(NavAction::Begin, &mut host);
        nav.dispatch(NavAction::OpenCategory, &mut host);
        let pushes = host.pushes();

        assert_eq!(pop(&mut nav, &mut host), PopOutcome::SubtopicsClosed);
        assert_eq!(nav.stage(), Stage::TopicSelection);
        assert_eq!(nav.phase(), SelectionPhase::Category);
        assert_eq!(host.pushes(), pushes);

        assert_eq!(pop(&mut nav, &mut host), PopOutcome::StageChanged(Stage::Intro));
    }

    #[test]
    fn profile_submit_is_invisible_to_back() {
        let (mut nav, mut host) = at_intro();
        nav.dispatch(NavAction::EditProfile, &mut host);
        nav.dispatch(NavAction::SubmitProfile, &mut host);
        assert_eq!(nav.stage(), Stage::TopicSelection);

        assert_eq!(pop(&mut nav, &mut host), PopOutcome::StageChanged(Stage::Intro));
    }

    #[test]
    fn guarded_stage_rearms_before_prompting() {
        let (mut nav, mut host) = at_intro();
        nav.dispatch(NavAction::Begin, &mut host);
        nav.dispatch(NavAction::OpenCategory, &mut host);
        nav.dispatch(NavAction::StartQuiz, &mut host);
        nav.dispatch(NavAction::QuizReady, &mut host);
        let pushes = host.pushes();

        assert_eq!(
            pop(&mut nav, &mut host),
            PopOutcome::Prompted(PromptKind::ConfirmReturnHome)
        );
        assert_eq!(host.pushes(), pushes + 1);
        assert_eq!(host.current_marker().map(|m| m.key), Some(MarkerKey::Locked));

        assert_eq!(nav.answer_prompt(false, &mut host), PromptOutcome::Dismissed);
        assert_eq!(nav.stage(), Stage::Quiz);
    }

    #[test]
    fn confirmed_return_home_from_pop_is_deferred() {
        let (mut nav, mut host) = at_intro();
        nav.dispatch(NavAction::PreviewResults, &mut host);
        pop(&mut nav, &mut host);
        nav.answer_prompt(true, &mut host);
        assert_eq!(nav.stage(), Stage::Results);
        assert_eq!(nav.take_deferred(), Some(Deferred::ResetHome));
    }

    #[test]
    fn home_control_asks_only_in_quiz_and_results() {
        let (mut nav, mut host) = at_intro();
        nav.dispatch(NavAction::Begin, &mut host);
        assert_eq!(nav.request_home(), HomeRequest::Reset);
        assert_eq!(nav.stage(), Stage::Intro);

        nav.dispatch(NavAction::PreviewResults, &mut host);
        assert_eq!(nav.request_home(), HomeRequest::Prompted);
        assert_eq!(nav.request_home(), HomeRequest::Ignored);
        assert_eq!(nav.answer_prompt(true, &mut host), PromptOutcome::ResetHome);
        assert_eq!(nav.stage(), Stage::Intro);
        assert_eq!(nav.take_deferred(), None);
    }

    #[test]
    fn unlisted_stages_fall_back_to_intro() {
        for stage in [Stage::LanguageSelect, Stage::LoadingQuiz, Stage::Analyzing] {
            let mut nav = NavigationController::new(stage);
            let mut host = MemoryHistory::new();
            nav.initialize(&mut host);
            host.push_marker(Marker::new(MarkerKey::Step2));
            assert_eq!(pop(&mut nav, &mut host), PopOutcome::StageChanged(Stage::Intro));
        }
    }

    #[test]
    fn pops_during_a_prompt_are_replayed() {
        let (mut nav, mut host) = at_intro();
        nav.dispatch(NavAction::Begin, &mut host);
        nav.dispatch(NavAction::OpenCategory, &mut host);
        nav.dispatch(NavAction::StartQuiz, &mut host);
        nav.dispatch(NavAction::QuizReady, &mut host);

        pop(&mut nav, &mut host);
        assert_eq!(pop(&mut nav, &mut host), PopOutcome::Held);
        assert_eq!(nav.take_held_pop(&mut host), None);
        // Cancel: the held pop is replayed against Quiz and asks again.
        nav.answer_prompt(false, &mut host);
        assert_eq!(
            nav.take_held_pop(&mut host),
            Some(PopOutcome::Prompted(PromptKind::ConfirmReturnHome))
        );
        assert_eq!(nav.take_held_pop(&mut host), None);
        assert_eq!(
            nav.prompt().map(|p| p.kind),
            Some(PromptKind::ConfirmReturnHome)
        );
    }

    #[test]
    fn actions_are_ignored_while_prompting() {
        let (mut nav, mut host) = at_intro();
        pop(&mut nav, &mut host);
        assert_eq!(nav.dispatch(NavAction::Begin, &mut host), None);
        assert_eq!(nav.stage(), Stage::Intro);
    }

    #[test]
    fn finished_work_moves_on_under_a_prompt() {
        let (mut nav, mut host) = at_intro();
        nav.dispatch(NavAction::Begin, &mut host);
        nav.dispatch(NavAction::OpenCategory, &mut host);
        nav.dispatch(NavAction::StartQuiz, &mut host);
        nav.dispatch(NavAction::QuizReady, &mut host);
        pop(&mut nav, &mut host);
        let pushes = host.pushes();

        assert_eq!(
            nav.dispatch(NavAction::BatchFinished, &mut host),
            Some(Stage::Analyzing)
        );
        assert_eq!(host.pushes(), pushes);
        assert_eq!(
            nav.prompt().map(|p| p.kind),
            Some(PromptKind::ConfirmReturnHome)
        );

        assert_eq!(nav.answer_prompt(false, &mut host), PromptOutcome::Dismissed);
        assert_eq!(nav.stage(), Stage::Analyzing);
    }
}
