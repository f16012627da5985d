//! The roll orchestrator.
//!
//! A [`RollSession`] drives a [`DiceEngine`] through one roll at a time. Only
//! the most recent roll may touch what is on screen: starting a roll cancels
//! the one in flight and any pending fade-out of an earlier result. Rolls and
//! cleanups are identified by the ticket they hold, compared by address,
//! never by a counter.

use super::engine::{DiceEngine, DieResult, EngineError, GroupRequest, RollBase};
use super::outcome::RollOutcome;
use crate::config::DiceConfig;
use crate::notify::{HistoryEntry, Notifier, RollHistory, ToastKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// What the dice currently look like to the user.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Presentation {
    Hidden,
    Shown,
    Fading,
}

#[derive(Default)]
struct Ticket {
    cancel: CancellationToken,
}

impl Ticket {
    fn check(&self) -> Result<(), RollInterrupt> {
        if self.cancel.is_cancelled() {
            Err(RollInterrupt::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn is_current(slot: &Option<Arc<Ticket>>, ticket: &Arc<Ticket>) -> bool {
    slot.as_ref().map_or(false, |t| Arc::ptr_eq(t, ticket))
}

#[derive(thiserror::Error, Debug)]
enum RollInterrupt {
    #[error("superseded by a newer roll")]
    Cancelled,
    #[error("the dice did not settle in time")]
    TimedOut,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

struct SessionState {
    active: Option<Arc<Ticket>>,
    cleanup: Option<Arc<Ticket>>,
    presentation: Presentation,
    history: RollHistory,
}

struct Shared {
    engine: Arc<dyn DiceEngine>,
    notifier: Arc<dyn Notifier>,
    config: DiceConfig,
    state: Mutex<SessionState>,
}

#[derive(Clone)]
pub struct RollSession {
    shared: Arc<Shared>,
}

impl RollSession {
    pub fn new(
        engine: Arc<dyn DiceEngine>,
        notifier: Arc<dyn Notifier>,
        config: DiceConfig,
    ) -> Self {
        let history = RollHistory::from_config(&config);
        Self {
            shared: Arc::new(Shared {
                engine,
                notifier,
                config,
                state: Mutex::new(SessionState {
                    active: None,
                    cleanup: None,
                    presentation: Presentation::Hidden,
                    history,
                }),
            }),
        }
    }

    pub fn config(&self) -> &DiceConfig {
        &self.shared.config
    }

    pub fn engine(&self) -> &Arc<dyn DiceEngine> {
        &self.shared.engine
    }

    pub fn presentation(&self) -> Presentation {
        self.state().presentation
    }

    /// Live history entries, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state().history.entries().cloned().collect()
    }

    pub(crate) fn notify(&self, kind: ToastKind, message: &str) {
        self.shared.notifier.notify(kind, message);
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn roll_notation(&self, notation: &str) -> Option<RollOutcome> {
        self.roll_titled(notation, None).await
    }

    /// Rolls `notation` to completion.
    ///
    /// Returns `None` when the notation does not parse, the engine fails or
    /// times out (each reported through the notifier), or a newer roll
    /// superseded this one (not reported).
    pub async fn roll_titled(&self, notation: &str, title: Option<&str>) -> Option<RollOutcome> {
        tracing::debug!(notation, "parsing roll");
        let groups = match self.shared.engine.parse_notation(notation) {
            Ok(groups) => groups,
            Err(err) => {
                tracing::info!(notation, error = %err, "roll notation rejected");
                self.notify(ToastKind::Error, &format!("Invalid roll {:?}: {}", notation, err));
                return None;
            }
        };

        let ticket = self.begin();
        let result = self.run(&ticket, groups).await;
        match result {
            Ok(base) => {
                let outcome = RollOutcome::from_base(notation, &base);
                if self.finish(&ticket, title, &outcome) {
                    tracing::info!(notation, total = outcome.total, "roll done");
                    Some(outcome)
                } else {
                    tracing::debug!(notation, "roll superseded while finishing");
                    None
                }
            }
            Err(RollInterrupt::Cancelled) => {
                tracing::debug!(notation, "roll cancelled");
                None
            }
            Err(err) => {
                tracing::warn!(notation, error = %err, "roll failed");
                self.notify(ToastKind::Error, &format!("Roll {:?} failed: {}", notation, err));
                self.abort(&ticket);
                None
            }
        }
    }

    /// Makes a fresh ticket the active one, cancelling whatever was running.
    fn begin(&self) -> Arc<Ticket> {
        let ticket = Arc::new(Ticket::default());
        let mut state = self.state();
        if let Some(prev) = state.active.replace(Arc::clone(&ticket)) {
            tracing::debug!("superseding the active roll");
            prev.cancel.cancel();
        }
        if let Some(cleanup) = state.cleanup.take() {
            tracing::debug!("cancelling pending cleanup");
            cleanup.cancel.cancel();
        }
        state.presentation = Presentation::Shown;
        ticket
    }

    async fn run(
        &self,
        ticket: &Ticket,
        groups: Vec<GroupRequest>,
    ) -> Result<RollBase, RollInterrupt> {
        let engine = &self.shared.engine;
        let mut results = Vec::new();
        if groups.is_empty() {
            tracing::debug!("no dice to roll");
        } else {
            tracing::debug!(groups = groups.len(), "rolling");
            results = self.generate(ticket, &groups).await?;
            loop {
                ticket.check()?;
                let more = engine.request_reroll(&results)?;
                if more.is_empty() {
                    break;
                }
                tracing::debug!(groups = more.len(), "rerolling");
                results.extend(self.generate(ticket, &more).await?);
            }
        }

        ticket.check()?;
        tracing::debug!(dice = results.len(), "finalizing");
        Ok(engine.finalize(&results)?)
    }

    /// The one suspension point of a roll: generation raced against
    /// cancellation and the timeout.
    async fn generate(
        &self,
        ticket: &Ticket,
        groups: &[GroupRequest],
    ) -> Result<Vec<DieResult>, RollInterrupt> {
        let request = self.shared.engine.request_roll(groups);
        tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => Err(RollInterrupt::Cancelled),
            res = tokio::time::timeout(self.shared.config.roll_timeout, request) => match res {
                Ok(results) => Ok(results?),
                Err(_) => Err(RollInterrupt::TimedOut),
            },
        }
    }

    /// Records a finished roll and schedules its fade-out. `false` if the
    /// roll lost its ticket in the meantime.
    fn finish(&self, ticket: &Arc<Ticket>, title: Option<&str>, outcome: &RollOutcome) -> bool {
        let cleanup = Arc::new(Ticket::default());
        {
            let mut state = self.state();
            if !is_current(&state.active, ticket) {
                return false;
            }
            state.active = None;
            state.history.push(title.map(str::to_owned), outcome.clone());
            state.cleanup = Some(Arc::clone(&cleanup));
        }

        tracing::debug!("cleanup scheduled");
        let session = self.clone();
        tokio::spawn(async move { session.cleanup(cleanup).await });
        true
    }

    /// Clears the dice right away after a failed roll, unless a newer roll
    /// already owns them.
    fn abort(&self, ticket: &Arc<Ticket>) {
        let mut state = self.state();
        if is_current(&state.active, ticket) {
            state.active = None;
            state.presentation = Presentation::Hidden;
            self.shared.engine.clear();
        }
    }

    async fn cleanup(self, ticket: Arc<Ticket>) {
        let config = &self.shared.config;
        if !self.wait_for(&ticket, config.result_display).await {
            return;
        }
        self.with_cleanup(&ticket, |state| state.presentation = Presentation::Fading);

        if !self.wait_for(&ticket, config.fade_duration).await {
            return;
        }
        let cleared = self.with_cleanup(&ticket, |state| {
            state.cleanup = None;
            state.presentation = Presentation::Hidden;
        });
        if cleared {
            tracing::debug!("dice cleared");
        }
    }

    async fn wait_for(&self, ticket: &Ticket, duration: std::time::Duration) -> bool {
        tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => {
                tracing::debug!("cleanup skipped, a newer roll took over");
                false
            }
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Runs `f` only while `ticket` is still the pending cleanup. The engine
    /// is cleared under the same lock once `f` has dropped the ticket.
    fn with_cleanup<F>(&self, ticket: &Arc<Ticket>, f: F) -> bool
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.state();
        if !is_current(&state.cleanup, ticket) {
            return false;
        }
        f(&mut state);
        if state.cleanup.is_none() {
            self.shared.engine.clear();
        }
        true
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::{session, session_with};
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    const SECOND: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_roll_to_completion() {
        let (session, engine, toasts) = session(Some(SECOND));
        let outcome = session.roll_titled("2d6 + 1", Some("Damage")).await.unwrap();
        assert_eq!(outcome.notation, "2d6 + 1");
        assert_eq!(outcome.total, 3 + 4 + 1);
        assert_eq!(engine.calls(), 1);
        assert_eq!(session.presentation(), Presentation::Shown);
        assert!(toasts.lock().unwrap().drain().is_empty());

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].title.as_deref(), Some("Damage"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerolls_until_settled() {
        let (session, engine, toasts) = session(Some(SECOND));
        // 3 and 4 are rerolled, 5 stays
        let outcome = session.roll_notation("1d6rr<5").await.unwrap();
        assert_eq!(engine.calls(), 3);
        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.dice().next().map(|d| d.history.clone()), Some(vec![3, 4]));

        // 3 and 4, then the 4 explodes into a 5
        let (session, engine, _) = session_with(vec![Some(SECOND)]);
        let outcome = session.roll_notation("2d6e4").await.unwrap();
        assert_eq!(engine.calls(), 2);
        assert_eq!(outcome.total, 3 + 4 + 5);
        assert!(toasts.lock().unwrap().drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_supersede_during_reroll() {
        let (session, engine, toasts) = session(Some(SECOND));
        let first = tokio::spawn({
            let session = session.clone();
            async move { session.roll_notation("1d6rr<5").await }
        });
        // the first generation is done, the reroll is still rolling
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(engine.calls(), 2);

        let second = session.roll_notation("1d4").await.unwrap();
        assert_eq!(second.notation, "1d4");
        assert_eq!(first.await.unwrap(), None);
        assert_eq!(engine.calls(), 3);

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome.notation, "1d4");
        assert!(toasts.lock().unwrap().drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_during_reroll() {
        let (session, engine, toasts) = session_with(vec![Some(SECOND), None]);
        assert_eq!(session.roll_notation("1d6rr<5").await, None);
        assert_eq!(engine.calls(), 2);
        assert_eq!(engine.clears(), 1);
        assert_eq!(session.presentation(), Presentation::Hidden);
        assert!(session.history().is_empty());

        let toasts = toasts.lock().unwrap().drain();
        assert_eq!(toasts.len(), 1);
        assert!(toasts[0].message.contains("did not settle"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_numbers_only() {
        let (session, engine, _) = session(Some(SECOND));
        let outcome = session.roll_notation("4 - 1.5").await.unwrap();
        assert_eq!(outcome.total, 2);
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_failure() {
        let (session, engine, toasts) = session(Some(SECOND));
        assert_eq!(session.roll_notation("1d6 +").await, None);
        assert_eq!(engine.calls(), 0);
        assert_eq!(session.presentation(), Presentation::Hidden);

        let toasts = toasts.lock().unwrap().drain();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_roll_supersedes() {
        let (session, engine, toasts) = session(Some(SECOND));
        let first = tokio::spawn({
            let session = session.clone();
            async move { session.roll_notation("1d20").await }
        });
        while engine.calls() == 0 {
            tokio::task::yield_now().await;
        }

        let second = session.roll_notation("2d6").await;
        assert_eq!(second.map(|o| o.notation), Some("2d6".to_owned()));
        assert_eq!(first.await.unwrap(), None);
        assert_eq!(session.history().len(), 1);
        // superseded rolls are not errors
        assert!(toasts.lock().unwrap().drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let (session, engine, toasts) = session(None);
        assert_eq!(session.roll_notation("1d6").await, None);
        assert_eq!(session.presentation(), Presentation::Hidden);
        assert_eq!(engine.clears(), 1);

        let toasts = toasts.lock().unwrap().drain();
        assert_eq!(toasts.len(), 1);
        assert!(toasts[0].message.contains("did not settle"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_failure_clears() {
        let (session, engine, toasts) = session(Some(SECOND));
        assert_eq!(session.roll_notation("200d6").await, None);
        assert_eq!(session.presentation(), Presentation::Hidden);
        assert_eq!(engine.clears(), 1);
        assert_eq!(toasts.lock().unwrap().drain().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_timing() {
        let (session, engine, _) = session(Some(SECOND));
        session.roll_notation("1d6").await.unwrap();

        sleep(Duration::from_millis(2900)).await;
        assert_eq!(session.presentation(), Presentation::Shown);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(session.presentation(), Presentation::Fading);
        assert_eq!(engine.clears(), 0);
        sleep(SECOND).await;
        assert_eq!(session.presentation(), Presentation::Hidden);
        assert_eq!(engine.clears(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cleanup_skipped() {
        let (session, engine, _) = session(Some(SECOND));
        session.roll_notation("1d6").await.unwrap();
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(session.presentation(), Presentation::Fading);

        // the first cleanup would clear while this roll is in flight
        session.roll_notation("1d8").await.unwrap();
        assert_eq!(session.presentation(), Presentation::Shown);
        assert_eq!(engine.clears(), 0);
    }
}
