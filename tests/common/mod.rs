#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{Value, json};

use mlb_terminal::animation::AnimationStep;
use mlb_terminal::dispatcher::Presenter;
use mlb_terminal::error::{DataWarning, FeedError};
use mlb_terminal::feed::FeedSnapshot;
use mlb_terminal::game::{GameState, StateChange};
use mlb_terminal::scheduler::PollPlan;

pub const GAME_PK: u64 = 745_001;
pub const AWAY: u32 = 147;
pub const HOME: u32 = 117;

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub fn noon() -> DateTime<Utc> {
    at("2025-06-01T18:00:00Z")
}

/// One observation of a live game, as the linescore reports it.
#[derive(Debug, Clone)]
pub struct LiveTick {
    pub inning: i64,
    pub top: bool,
    pub balls: i64,
    pub strikes: i64,
    pub outs: i64,
    pub first: Option<u64>,
    pub second: Option<u64>,
    pub third: Option<u64>,
    pub batter: Option<u64>,
    pub pitcher: Option<u64>,
    pub away_runs: i64,
    pub home_runs: i64,
}

impl Default for LiveTick {
    fn default() -> Self {
        Self {
            inning: 1,
            top: true,
            balls: 0,
            strikes: 0,
            outs: 0,
            first: None,
            second: None,
            third: None,
            batter: Some(500),
            pitcher: Some(900),
            away_runs: 0,
            home_runs: 0,
        }
    }
}

fn person(id: Option<u64>) -> Value {
    match id {
        Some(id) => json!({ "id": id, "fullName": format!("Player {id}") }),
        None => Value::Null,
    }
}

fn team(id: u32) -> Value {
    json!({ "id": id })
}

fn game(status: (&str, &str), start: DateTime<Utc>, pk: u64, scores: Option<(i64, i64)>) -> Value {
    let (abstract_state, detailed) = status;
    let mut game = json!({
        "gamePk": pk,
        "gameDate": start.to_rfc3339(),
        "status": { "abstractGameState": abstract_state, "detailedState": detailed },
        "teams": {
            "away": { "team": team(AWAY) },
            "home": { "team": team(HOME) }
        }
    });
    if let Some((away, home)) = scores {
        game["teams"]["away"]["score"] = json!(away);
        game["teams"]["home"]["score"] = json!(home);
    }
    game
}

fn snapshot(games: Vec<Value>, live: Option<Value>, fetched_at: DateTime<Utc>) -> FeedSnapshot {
    let schedule = json!({ "dates": [{ "games": games }] });
    FeedSnapshot {
        fetched_at,
        schedule: serde_json::from_value(schedule).expect("schedule payload"),
        live: live.map(|v| serde_json::from_value(v).expect("live payload")),
    }
}

pub fn linescore(tick: &LiveTick) -> Value {
    let (batting, fielding) = if tick.top { (AWAY, HOME) } else { (HOME, AWAY) };
    json!({
        "currentInning": tick.inning,
        "inningHalf": if tick.top { "Top" } else { "Bottom" },
        "isTopInning": tick.top,
        "balls": tick.balls,
        "strikes": tick.strikes,
        "outs": tick.outs,
        "teams": {
            "away": { "runs": tick.away_runs, "hits": 0, "errors": 0 },
            "home": { "runs": tick.home_runs, "hits": 0, "errors": 0 }
        },
        "offense": {
            "batter": person(tick.batter),
            "first": person(tick.first),
            "second": person(tick.second),
            "third": person(tick.third),
            "team": team(batting)
        },
        "defense": {
            "pitcher": person(tick.pitcher),
            "team": team(fielding)
        }
    })
}

pub fn live_snapshot(tick: &LiveTick, fetched_at: DateTime<Utc>) -> FeedSnapshot {
    let start = fetched_at - ChronoDuration::hours(1);
    let schedule_game = game(
        ("Live", "In Progress"),
        start,
        GAME_PK,
        Some((tick.away_runs, tick.home_runs)),
    );
    let live = json!({
        "gamePk": GAME_PK,
        "gameData": {
            "status": { "abstractGameState": "Live", "detailedState": "In Progress" },
            "teams": { "away": team(AWAY), "home": team(HOME) }
        },
        "liveData": { "linescore": linescore(tick) }
    });
    snapshot(vec![schedule_game], Some(live), fetched_at)
}

pub fn scheduled_snapshot(start: DateTime<Utc>, fetched_at: DateTime<Utc>) -> FeedSnapshot {
    let g = game(("Preview", "Scheduled"), start, GAME_PK, None);
    snapshot(vec![g], None, fetched_at)
}

pub fn final_snapshot(
    start: DateTime<Utc>,
    fetched_at: DateTime<Utc>,
    away: i64,
    home: i64,
) -> FeedSnapshot {
    let g = game(("Final", "Final"), start, GAME_PK, Some((away, home)));
    snapshot(vec![g], None, fetched_at)
}

/// A completed game followed by the next one on the schedule.
pub fn final_then_next(
    start: DateTime<Utc>,
    next_start: DateTime<Utc>,
    fetched_at: DateTime<Utc>,
) -> FeedSnapshot {
    let done = game(("Final", "Final"), start, GAME_PK, Some((3, 2)));
    let next = game(("Preview", "Scheduled"), next_start, GAME_PK + 1, None);
    snapshot(vec![done, next], None, fetched_at)
}

pub fn postponed_snapshot(start: DateTime<Utc>, fetched_at: DateTime<Utc>) -> FeedSnapshot {
    let g = game(("Final", "Postponed"), start, GAME_PK, None);
    snapshot(vec![g], None, fetched_at)
}

pub fn empty_snapshot(fetched_at: DateTime<Utc>) -> FeedSnapshot {
    snapshot(Vec::new(), None, fetched_at)
}

/// Presenter that keeps everything it is handed.
#[derive(Debug, Default)]
pub struct Recorder {
    pub states: Vec<Arc<GameState>>,
    pub changes: Vec<Vec<StateChange>>,
    pub plans: Vec<Vec<AnimationStep>>,
    pub polls: Vec<PollPlan>,
    pub errors: Vec<FeedError>,
    pub warnings: Vec<DataWarning>,
}

impl Presenter for Recorder {
    fn on_state_change(&mut self, state: &Arc<GameState>, changes: &[StateChange]) {
        self.states.push(Arc::clone(state));
        self.changes.push(changes.to_vec());
    }

    fn on_animation_plan(&mut self, steps: &[AnimationStep]) {
        self.plans.push(steps.to_vec());
    }

    fn on_poll_plan_updated(&mut self, plan: PollPlan) {
        self.polls.push(plan);
    }

    fn on_error(&mut self, error: &FeedError) {
        self.errors.push(error.clone());
    }

    fn on_data_warning(&mut self, warning: &DataWarning) {
        self.warnings.push(warning.clone());
    }
}
