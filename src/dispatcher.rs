use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::animation::{self, AnimationStep, PlanContext};
use crate::error::{DataWarning, FeedError};
use crate::feed::{self, FeedClient, FeedSnapshot};
use crate::game::{GameState, StateChange, TeamId};
use crate::scheduler::{PollPlan, PollScheduler, PollingIntervals, Tick};
use crate::tracker;

/// Longest the coordination loop sleeps without re-checking its timers.
const MAX_WAIT: Duration = Duration::from_secs(1);

/// Receives everything the tracker produces. Only ever called from the coordination thread.
pub trait Presenter {
    fn on_state_change(&mut self, state: &Arc<GameState>, changes: &[StateChange]);
    fn on_animation_plan(&mut self, steps: &[AnimationStep]);
    fn on_poll_plan_updated(&mut self, plan: PollPlan);
    fn on_error(&mut self, error: &FeedError);
    fn on_data_warning(&mut self, _warning: &DataWarning) {}
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub team_id: TeamId,
    pub lookahead_days: u32,
    pub intervals: PollingIntervals,
    pub fetch_timeout: Duration,
    pub max_in_flight: usize,
}

#[derive(Debug)]
pub enum Inbound {
    Fetched {
        seq: u64,
        result: Result<FeedSnapshot, FeedError>,
    },
    Shutdown,
}

#[derive(Debug)]
enum Outcome {
    Fetched(Result<FeedSnapshot, FeedError>),
    TimedOut,
}

/// Releases items strictly in sequence order. Anything at or below an already released
/// sequence number is refused as stale.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next_expected: u64,
    pending: BTreeMap<u64, T>,
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self {
            next_expected: 0,
            pending: BTreeMap::new(),
        }
    }
}

impl<T> ReorderBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `seq` was already released.
    pub fn push(&mut self, seq: u64, item: T) -> bool {
        if seq < self.next_expected {
            return false;
        }
        self.pending.entry(seq).or_insert(item);
        true
    }

    pub fn pop_ready(&mut self) -> Option<(u64, T)> {
        let item = self.pending.remove(&self.next_expected)?;
        let seq = self.next_expected;
        self.next_expected += 1;
        Some((seq, item))
    }

    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Single writer of the game state. Fetches run on a small pool and report back over a
/// channel; every state update, event and plan is produced here, in poll order.
pub struct Dispatcher<F: FeedClient + 'static, P: Presenter> {
    settings: TrackerSettings,
    client: Arc<F>,
    presenter: P,
    state: Arc<GameState>,
    scheduler: PollScheduler,
    results: ReorderBuffer<Outcome>,
    pool: Option<rayon::ThreadPool>,
    tx: Sender<Inbound>,
    rx: Receiver<Inbound>,
}

impl<F: FeedClient + 'static, P: Presenter> Dispatcher<F, P> {
    pub fn new(settings: TrackerSettings, client: Arc<F>, presenter: P) -> Self {
        let (tx, rx) = mpsc::channel();
        let scheduler = PollScheduler::new(settings.intervals, settings.fetch_timeout)
            .with_max_in_flight(settings.max_in_flight);
        let pool = build_fetch_pool(settings.max_in_flight);
        Self {
            settings,
            client,
            presenter,
            state: Arc::new(GameState::default()),
            scheduler,
            results: ReorderBuffer::new(),
            pool,
            tx,
            rx,
        }
    }

    pub fn sender(&self) -> Sender<Inbound> {
        self.tx.clone()
    }

    pub fn snapshot(&self) -> Arc<GameState> {
        Arc::clone(&self.state)
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn start(&mut self, now: Instant) {
        let plan = self.scheduler.schedule(&self.state, Utc::now(), now);
        self.presenter.on_poll_plan_updated(plan);
    }

    /// Expire overdue fetches, then issue a new one if the timer is due. Returns the
    /// sequence number of the fetch issued, if any.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        for seq in self.scheduler.expire(now) {
            warn!(seq, "fetch timed out");
            self.accept(seq, Outcome::TimedOut, now);
        }
        match self.scheduler.tick(now) {
            Tick::Fetch { seq } => {
                debug!(seq, "issuing fetch");
                self.spawn_fetch(seq);
                Some(seq)
            }
            Tick::Busy { retry_in } => {
                debug!(retry_ms = retry_in.as_millis() as u64, "fetch still in flight");
                None
            }
            Tick::Idle => None,
        }
    }

    /// Hand a fetch result to the coordination context. The poll timer is re-armed from `now`.
    pub fn deliver(&mut self, seq: u64, result: Result<FeedSnapshot, FeedError>, now: Instant) {
        self.scheduler.settle(seq);
        self.accept(seq, Outcome::Fetched(result), now);
    }

    /// Give up on fetch `seq`; a result arriving for it later is dropped.
    pub fn abandon(&mut self, seq: u64, now: Instant) {
        self.scheduler.settle(seq);
        self.accept(seq, Outcome::TimedOut, now);
    }

    pub fn run(mut self) {
        info!(team_id = self.settings.team_id, "tracker started");
        self.start(Instant::now());
        loop {
            self.poll(Instant::now());
            let wait = self
                .scheduler
                .until_next_deadline(Instant::now())
                .unwrap_or(MAX_WAIT)
                .min(MAX_WAIT);
            match self.rx.recv_timeout(wait) {
                Ok(Inbound::Fetched { seq, result }) => self.deliver(seq, result, Instant::now()),
                Ok(Inbound::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("tracker stopped");
    }

    /// Run the coordination loop on its own thread.
    pub fn spawn(self) -> (thread::JoinHandle<()>, Sender<Inbound>)
    where
        P: Send + 'static,
    {
        let tx = self.sender();
        let handle = thread::Builder::new()
            .name("tracker".to_string())
            .spawn(move || self.run())
            .unwrap_or_else(|err| panic!("failed to spawn tracker thread: {err}"));
        (handle, tx)
    }

    fn accept(&mut self, seq: u64, outcome: Outcome, now: Instant) {
        if !self.results.push(seq, outcome) {
            debug!(seq, "dropping stale fetch result");
            return;
        }
        while let Some((seq, outcome)) = self.results.pop_ready() {
            self.resolve(seq, outcome, now);
        }
    }

    fn resolve(&mut self, seq: u64, outcome: Outcome, now: Instant) {
        let succeeded = match outcome {
            Outcome::Fetched(Ok(snapshot)) => {
                self.apply(&snapshot);
                true
            }
            Outcome::Fetched(Err(err)) => {
                self.report(&err);
                false
            }
            Outcome::TimedOut => {
                let err = FeedError::Timeout {
                    seq,
                    secs: self.settings.fetch_timeout.as_secs(),
                };
                self.report(&err);
                false
            }
        };
        let plan = self
            .scheduler
            .rearm(&self.state, succeeded, Utc::now(), now);
        debug!(
            seq,
            delay_secs = plan.delay.as_secs(),
            reason = plan.reason.label(),
            "poll re-armed"
        );
        self.presenter.on_poll_plan_updated(plan);
    }

    fn apply(&mut self, snapshot: &FeedSnapshot) {
        let normalized = tracker::apply(snapshot, &self.state);
        for warning in &normalized.warnings {
            self.presenter.on_data_warning(warning);
        }
        if normalized.state == *self.state {
            return;
        }
        let previous = mem::replace(&mut self.state, Arc::new(normalized.state));
        self.presenter.on_state_change(&self.state, &normalized.changes);

        if let Some(ctx) = PlanContext::between(&previous, &self.state, &normalized.changes) {
            let steps = animation::plan(&previous.bases, &self.state.bases, &ctx);
            if !steps.is_empty() {
                self.presenter.on_animation_plan(&steps);
            }
        }
    }

    fn report(&mut self, err: &FeedError) {
        warn!(error = %err, "poll failed; keeping last known state");
        self.presenter.on_error(err);
    }

    fn spawn_fetch(&self, seq: u64) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let team_id = self.settings.team_id;
        let lookahead_days = self.settings.lookahead_days;
        let job = move || {
            let result = feed::fetch_snapshot(client.as_ref(), team_id, lookahead_days, Utc::now());
            let _ = tx.send(Inbound::Fetched { seq, result });
        };
        if let Some(pool) = self.pool.as_ref() {
            pool.spawn(job);
        } else {
            thread::spawn(job);
        }
    }
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|idx| format!("feed-fetch-{idx}"))
        .build()
        .ok()
}

/// Presenter for headless runs: every callback becomes a log line.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn on_state_change(&mut self, state: &Arc<GameState>, changes: &[StateChange]) {
        info!(
            phase = ?state.phase,
            inning = ?state.inning,
            half = ?state.half_inning,
            score = %format!("{}-{}", state.away_score, state.home_score),
            bso = %format!("{}-{}-{}", state.balls, state.strikes, state.display_outs),
            "state updated"
        );
        for change in changes {
            info!(change = ?change, "{}", change.label());
        }
    }

    fn on_animation_plan(&mut self, steps: &[AnimationStep]) {
        for step in steps {
            debug!(step = ?step, "animation");
        }
    }

    fn on_poll_plan_updated(&mut self, plan: PollPlan) {
        info!(
            delay_secs = plan.delay.as_secs(),
            reason = plan.reason.label(),
            "next poll"
        );
    }

    fn on_error(&mut self, error: &FeedError) {
        if error.is_timeout() {
            info!(error = %error, "feed slow; retrying on the next poll");
        } else {
            warn!(error = %error, "feed error");
        }
    }

    fn on_data_warning(&mut self, warning: &DataWarning) {
        warn!(warning = %warning, "data quality");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_buffer_releases_in_sequence_order() {
        let mut buf = ReorderBuffer::new();
        assert!(buf.push(1, "b"));
        assert!(buf.pop_ready().is_none());
        assert!(buf.push(0, "a"));
        assert_eq!(buf.pop_ready(), Some((0, "a")));
        assert_eq!(buf.pop_ready(), Some((1, "b")));
        assert_eq!(buf.next_expected(), 2);
        assert!(!buf.push(1, "late"));
        assert_eq!(buf.pending(), 0);
    }
}
