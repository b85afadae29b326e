use std::time::{Duration, Instant};

use postes_core::{update, EstablishmentId, Msg, SessionState, SessionView};
use postes_logging::{postes_debug, postes_warn};

use crate::effects::EffectRunner;

/// Drives one establishment session: feeds messages through `update`,
/// hands the resulting effects to the engine and pumps engine events back.
pub struct SessionDriver {
    state: SessionState,
    runner: EffectRunner,
    suggestions_answered: bool,
}

impl SessionDriver {
    pub fn new(establishment: EstablishmentId, runner: EffectRunner) -> Self {
        Self {
            state: SessionState::new(establishment),
            runner,
            suggestions_answered: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn view(&self) -> SessionView {
        self.state.view()
    }

    pub fn dispatch(&mut self, msg: Msg) {
        if matches!(msg, Msg::SuggestionsLoaded(_)) {
            self.suggestions_answered = true;
        }
        let placeholder = SessionState::new(self.state.establishment().clone());
        let state = std::mem::replace(&mut self.state, placeholder);
        let (state, effects) = update(state, msg);
        self.state = state;
        if self.state.consume_dirty() {
            postes_debug!(
                "Session {} changed: phase={:?} generation={}",
                self.state.establishment(),
                self.state.phase(),
                self.state.generation()
            );
        }
        self.runner.run(effects);
    }

    /// Feeds engine events into the session until `done` holds or `timeout`
    /// elapses. Returns whether `done` was reached.
    pub fn pump_until(&mut self, timeout: Duration, done: impl Fn(&SessionState) -> bool) -> bool {
        self.pump(Instant::now() + timeout, |driver| done(&driver.state))
    }

    /// Opens the session and waits until the catalog, stored grouping,
    /// suggestions and initial indicators have settled.
    pub fn enter(&mut self, timeout: Duration) -> bool {
        self.dispatch(Msg::Entered);
        self.pump(Instant::now() + timeout, |driver| {
            driver.state.is_quiescent() && (driver.suggestions_answered || !driver.state.is_ready())
        })
    }

    /// Waits for an in-flight submission, catalog fetch or indicator batch.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        self.pump_until(timeout, SessionState::is_quiescent)
    }

    pub fn leave(&mut self) {
        self.dispatch(Msg::Left);
    }

    fn pump(&mut self, deadline: Instant, done: impl Fn(&Self) -> bool) -> bool {
        while !done(self) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                postes_warn!(
                    "Timed out waiting for the backend on {}",
                    self.state.establishment()
                );
                return false;
            }
            let establishment = self.state.establishment().clone();
            match self.runner.next_msg(&establishment, remaining) {
                Some(Msg::NoOp) | None => {}
                Some(msg) => self.dispatch(msg),
            }
        }
        true
    }
}
