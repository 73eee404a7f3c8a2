use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{GameState, Phase};

/// Seconds before first pitch at which polling switches to the pre-game cadence.
pub const FINAL_HOUR_SECS: i64 = 3600;
/// Re-arm delay for a tick that found the in-flight limit reached.
pub const BUSY_RETRY: Duration = Duration::from_secs(1);

/// Poll intervals in seconds, as they appear in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingIntervals {
    pub live: u64,
    pub scheduled: u64,
    pub none: u64,
}

impl Default for PollingIntervals {
    fn default() -> Self {
        Self {
            live: 15,
            scheduled: 300,
            none: 3600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollReason {
    LiveCadence,
    ScheduledFar,
    ScheduledNear,
    NoGameCadence,
}

impl PollReason {
    pub fn label(self) -> &'static str {
        match self {
            PollReason::LiveCadence => "live",
            PollReason::ScheduledFar => "scheduled (far)",
            PollReason::ScheduledNear => "scheduled (near)",
            PollReason::NoGameCadence => "idle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPlan {
    pub delay: Duration,
    pub reason: PollReason,
}

impl PollPlan {
    /// Never poll faster than `floor`. Applied after failed polls.
    pub fn floored(self, floor: Duration) -> Self {
        Self {
            delay: self.delay.max(floor),
            ..self
        }
    }
}

/// Cadence for the given state at `now`.
pub fn plan_for(state: &GameState, now: DateTime<Utc>, intervals: &PollingIntervals) -> PollPlan {
    match state.phase {
        Phase::Live => PollPlan {
            delay: secs(intervals.live),
            reason: PollReason::LiveCadence,
        },
        Phase::Scheduled => match state.start_time {
            Some(start) => plan_before_start(start, now, intervals),
            None => idle(intervals),
        },
        Phase::Final => match state.next_start() {
            Some(start) => plan_before_start(start, now, intervals),
            None => idle(intervals),
        },
        Phase::NoGame => idle(intervals),
    }
}

fn plan_before_start(
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    intervals: &PollingIntervals,
) -> PollPlan {
    let until = (start - now).num_seconds();
    if until > FINAL_HOUR_SECS {
        // Sleep until the final hour opens, re-checking at least every idle interval.
        let wait = (until - FINAL_HOUR_SECS) as u64;
        PollPlan {
            delay: secs(wait.clamp(1, intervals.none.max(1))),
            reason: PollReason::ScheduledFar,
        }
    } else {
        PollPlan {
            delay: secs(intervals.scheduled),
            reason: PollReason::ScheduledNear,
        }
    }
}

fn idle(intervals: &PollingIntervals) -> PollPlan {
    PollPlan {
        delay: secs(intervals.none),
        reason: PollReason::NoGameCadence,
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Timer not due yet.
    Idle,
    /// Issue fetch `seq` now.
    Fetch { seq: u64 },
    /// Due, but the in-flight limit is reached; re-armed for `retry_in`.
    Busy { retry_in: Duration },
}

/// Self-rescheduling poll timer with an in-flight limit. Time is passed in so the
/// scheduler can be driven deterministically.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    intervals: PollingIntervals,
    fetch_timeout: Duration,
    max_in_flight: usize,
    next_seq: u64,
    in_flight: BTreeMap<u64, Instant>,
    due: Option<Instant>,
    plan: Option<PollPlan>,
}

impl PollScheduler {
    pub fn new(intervals: PollingIntervals, fetch_timeout: Duration) -> Self {
        Self {
            intervals,
            fetch_timeout,
            max_in_flight: 1,
            next_seq: 0,
            in_flight: BTreeMap::new(),
            due: None,
            plan: None,
        }
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.due
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Arm the timer. The first poll is due immediately; the returned plan is the cadence
    /// the initial state implies.
    pub fn schedule(
        &mut self,
        initial: &GameState,
        now_utc: DateTime<Utc>,
        now: Instant,
    ) -> PollPlan {
        let plan = plan_for(initial, now_utc, &self.intervals);
        self.plan = Some(plan);
        self.due = Some(now);
        plan
    }

    pub fn tick(&mut self, now: Instant) -> Tick {
        match self.due {
            Some(due) if now >= due => {}
            _ => return Tick::Idle,
        }
        if self.in_flight.len() >= self.max_in_flight {
            self.due = Some(now + BUSY_RETRY);
            return Tick::Busy {
                retry_in: BUSY_RETRY,
            };
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(seq, now);
        // Provisional: replaced when the result is resolved.
        let delay = self
            .plan
            .map(|p| p.delay)
            .unwrap_or_else(|| secs(self.intervals.live));
        self.due = Some(now + delay);
        Tick::Fetch { seq }
    }

    /// Forget an in-flight fetch whose result has arrived (or been given up on).
    pub fn settle(&mut self, seq: u64) {
        self.in_flight.remove(&seq);
    }

    /// Fetches that have been in flight for at least the timeout. They are removed from
    /// the in-flight set.
    pub fn expire(&mut self, now: Instant) -> Vec<u64> {
        let expired: Vec<u64> = self
            .in_flight
            .iter()
            .filter(|(_, issued)| now.saturating_duration_since(**issued) >= self.fetch_timeout)
            .map(|(seq, _)| *seq)
            .collect();
        for seq in &expired {
            self.in_flight.remove(seq);
        }
        expired
    }

    /// Recompute the cadence after a resolved poll and re-arm the timer from `now`.
    pub fn rearm(
        &mut self,
        state: &GameState,
        succeeded: bool,
        now_utc: DateTime<Utc>,
        now: Instant,
    ) -> PollPlan {
        let mut plan = plan_for(state, now_utc, &self.intervals);
        if !succeeded {
            plan = plan.floored(secs(self.intervals.live));
        }
        self.plan = Some(plan);
        self.due = Some(now + plan.delay);
        plan
    }

    /// How long the coordination loop may sleep before something needs attention.
    pub fn until_next_deadline(&self, now: Instant) -> Option<Duration> {
        let timer = self.due.map(|due| due.saturating_duration_since(now));
        let timeout = self
            .in_flight
            .values()
            .map(|issued| (*issued + self.fetch_timeout).saturating_duration_since(now))
            .min();
        match (timer, timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
