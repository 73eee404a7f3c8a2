use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crate::animation::{AnimationStep, Destination, Origin};
use crate::dispatcher::Presenter;
use crate::error::{DataWarning, FeedError};
use crate::game::{BaseSlot, Bases, GameState, Occupancy, Phase, StateChange};
use crate::scheduler::PollPlan;
use crate::teams::TeamColor;

pub const MAX_LOGS: usize = 200;
const MAX_TAPE: usize = 40;
/// Time each move or clear stays on screen before the next step plays.
pub const STEP_PACE: Duration = Duration::from_millis(350);
/// Give up waiting for an animation plan after this long and show the final bases.
const PLAN_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub enum Delta {
    SetGame {
        game: Arc<GameState>,
        changes: Vec<StateChange>,
    },
    Animate(Vec<AnimationStep>),
    SetPollPlan(PollPlan),
    Log(String),
}

/// The diamond as drawn: steps are played back one at a time towards the latest bases.
#[derive(Debug, Clone, Default)]
pub struct BasePlayback {
    shown: Bases,
    target: Bases,
    queue: VecDeque<AnimationStep>,
    current: Option<(AnimationStep, Instant)>,
    awaiting_plan: Option<Instant>,
}

impl BasePlayback {
    pub fn shown(&self) -> Bases {
        self.shown
    }

    pub fn target(&self) -> Bases {
        self.target
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty() && self.awaiting_plan.is_none()
    }

    /// New bases from the tracker. With `expect_plan` the old diamond stays up until the
    /// plan arrives, so the steps play from where the runners actually were.
    pub fn set_target(&mut self, bases: Bases, expect_plan: bool, now: Instant) {
        self.target = bases;
        self.awaiting_plan = expect_plan.then_some(now);
        self.tick(now);
    }

    pub fn enqueue(&mut self, steps: Vec<AnimationStep>, now: Instant) {
        self.awaiting_plan = None;
        self.queue.extend(steps);
        self.tick(now);
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(since) = self.awaiting_plan
            && now.saturating_duration_since(since) >= PLAN_WAIT
        {
            self.awaiting_plan = None;
        }
        loop {
            if let Some((step, started)) = self.current {
                if now.saturating_duration_since(started) < step_duration(&step) {
                    return;
                }
                self.current = None;
            }
            match self.queue.pop_front() {
                Some(step) => {
                    self.play(step);
                    self.current = Some((step, now));
                }
                None => {
                    if self.awaiting_plan.is_none() {
                        self.shown = self.target;
                    }
                    return;
                }
            }
        }
    }

    /// Fade progress (0..=1) and color for a slot currently fading in.
    pub fn fade(&self, slot: BaseSlot, now: Instant) -> Option<(TeamColor, f32)> {
        let (step, started) = self.current?;
        let AnimationStep::OccupyFade {
            slot: fading,
            color,
            duration,
        } = step
        else {
            return None;
        };
        if fading != slot {
            return None;
        }
        let elapsed = now.saturating_duration_since(started).as_secs_f32();
        let t = if duration.is_zero() {
            1.0
        } else {
            elapsed / duration.as_secs_f32()
        };
        Some((color, t.clamp(0.0, 1.0)))
    }

    fn play(&mut self, step: AnimationStep) {
        match step {
            AnimationStep::Move { runner, from, to } => {
                if let Origin::Base(slot) = from
                    && self.shown.get(slot) == Occupancy::Occupied(runner)
                {
                    self.shown.set(slot, Occupancy::Empty);
                }
                if let Destination::Base(slot) = to {
                    self.shown.set(slot, Occupancy::Occupied(runner));
                }
            }
            AnimationStep::Clear(slot) => self.shown.set(slot, Occupancy::Empty),
            AnimationStep::OccupyFade { slot, .. } => {
                self.shown.set(slot, self.target.get(slot));
            }
        }
    }
}

fn step_duration(step: &AnimationStep) -> Duration {
    match step {
        AnimationStep::OccupyFade { duration, .. } => *duration,
        _ => STEP_PACE,
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub game: Arc<GameState>,
    /// Most recent first.
    pub tape: VecDeque<String>,
    pub playback: BasePlayback,
    pub poll_plan: Option<PollPlan>,
    pub next_poll_at: Option<Instant>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub max_innings: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            game: Arc::new(GameState::default()),
            tape: VecDeque::with_capacity(MAX_TAPE),
            playback: BasePlayback::default(),
            poll_plan: None,
            next_poll_at: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
            max_innings: 9,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn push_tape(&mut self, line: String) {
        self.tape.push_front(line);
        self.tape.truncate(MAX_TAPE);
    }

    /// Time left until the next scheduled poll.
    pub fn next_poll_in(&self, now: Instant) -> Option<Duration> {
        self.next_poll_at.map(|at| at.saturating_duration_since(now))
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    apply_delta_at(state, delta, Instant::now());
}

pub fn apply_delta_at(state: &mut AppState, delta: Delta, now: Instant) {
    match delta {
        Delta::SetGame { game, changes } => {
            let continuing = state.game.is_live() && state.game.game_pk == game.game_pk;
            let expect_plan = continuing
                && changes.iter().any(|c| {
                    matches!(
                        c,
                        StateChange::BaseOccupancyChanged { .. }
                            | StateChange::ThirdOutDetected { .. }
                    )
                });
            for change in &changes {
                if let Some(line) = describe_change(change) {
                    state.push_tape(line);
                }
                if let StateChange::PhaseChanged { new, .. } = change {
                    state.push_log(format!("[INFO] {}", phase_notice(*new, &game)));
                }
            }
            state.playback.set_target(game.bases, expect_plan, now);
            state.game = game;
        }
        Delta::Animate(steps) => state.playback.enqueue(steps, now),
        Delta::SetPollPlan(plan) => {
            state.poll_plan = Some(plan);
            state.next_poll_at = Some(now + plan.delay);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

fn phase_notice(phase: Phase, game: &GameState) -> String {
    let matchup = match (&game.away, &game.home) {
        (Some(away), Some(home)) => format!("{} @ {}", away.abbreviation, home.abbreviation),
        _ => "game".to_string(),
    };
    match phase {
        Phase::NoGame => "No game in the schedule window".to_string(),
        Phase::Scheduled => format!("Scheduled: {matchup}"),
        Phase::Live => format!("Live: {matchup}"),
        Phase::Final => format!("Final: {matchup} {}-{}", game.away_score, game.home_score),
    }
}

/// One tape line per change worth showing; count ticks are too noisy to list.
pub fn describe_change(change: &StateChange) -> Option<String> {
    match change {
        StateChange::PhaseChanged { old, new } => Some(format!("{old:?} -> {new:?}")),
        StateChange::ScoreChanged { old, new } => Some(format!(
            "Score {}-{} -> {}-{}",
            old.away, old.home, new.away, new.home
        )),
        StateChange::ThirdOutDetected { count, bases } => Some(format!(
            "Side retired ({}-{}, {} left on)",
            count.balls,
            count.strikes,
            bases.occupied_count()
        )),
        StateChange::BaseOccupancyChanged { new, .. } => {
            Some(format!("Bases: {}", bases_label(new)))
        }
        StateChange::BatterChanged { new: Some(p), .. } => Some(format!("At bat: {}", p.name)),
        StateChange::PitcherChanged { new: Some(p), .. } => Some(format!("Pitching: {}", p.name)),
        StateChange::CountChanged { .. }
        | StateChange::BatterChanged { new: None, .. }
        | StateChange::PitcherChanged { new: None, .. } => None,
    }
}

pub fn bases_label(bases: &Bases) -> String {
    let occupied: Vec<&str> = BaseSlot::ALL
        .into_iter()
        .filter(|slot| bases.get(*slot).is_occupied())
        .map(BaseSlot::label)
        .collect();
    if occupied.is_empty() {
        "empty".to_string()
    } else {
        occupied.join(" ")
    }
}

/// The terminal UI receives tracker output as deltas over its channel.
impl Presenter for Sender<Delta> {
    fn on_state_change(&mut self, state: &Arc<GameState>, changes: &[StateChange]) {
        let _ = self.send(Delta::SetGame {
            game: Arc::clone(state),
            changes: changes.to_vec(),
        });
    }

    fn on_animation_plan(&mut self, steps: &[AnimationStep]) {
        let _ = self.send(Delta::Animate(steps.to_vec()));
    }

    fn on_poll_plan_updated(&mut self, plan: PollPlan) {
        let _ = self.send(Delta::SetPollPlan(plan));
    }

    fn on_error(&mut self, error: &FeedError) {
        let _ = self.send(Delta::Log(format!("[WARN] Poll failed: {error}")));
    }

    fn on_data_warning(&mut self, warning: &DataWarning) {
        let _ = self.send(Delta::Log(format!("[INFO] Feed data: {warning}")));
    }
}
