mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use common::{at, read_fixture};
use mlb_terminal::error::FeedError;
use mlb_terminal::feed::{FeedClient, FeedSnapshot, LiveFeedPayload, SchedulePayload, fetch_snapshot};
use mlb_terminal::game::{GamePk, GameState, HalfInning, Occupancy, Phase, StateChange, TeamId};
use mlb_terminal::statsapi::{parse_live_feed_json, parse_schedule_json};
use mlb_terminal::tracker;

/// Serves the fixture schedule and counts live-feed requests.
struct FixtureFeed {
    live_calls: AtomicUsize,
}

impl FeedClient for FixtureFeed {
    fn fetch_schedule(&self, _: TeamId, _: u32) -> Result<SchedulePayload, FeedError> {
        parse_schedule_json(&read_fixture("schedule.json"))
            .map_err(|err| FeedError::Malformed(err.to_string()))
    }

    fn fetch_live_feed(&self, _: GamePk) -> Result<LiveFeedPayload, FeedError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        parse_live_feed_json(&read_fixture("live_feed.json"))
            .map_err(|err| FeedError::Malformed(err.to_string()))
    }
}

#[test]
fn parses_schedule_fixture() {
    let schedule = parse_schedule_json(&read_fixture("schedule.json")).expect("fixture should parse");
    assert_eq!(schedule.dates.len(), 2);
    let games: Vec<_> = schedule.games().collect();
    assert_eq!(games.len(), 2);
    assert_eq!(games[0].game_pk, 777001);
    assert_eq!(games[0].status.detailed_state.as_deref(), Some("Final"));
    let linescore = games[0].linescore.as_ref().expect("hydrated linescore");
    assert_eq!(linescore.innings.len(), 9);
    assert_eq!(games[1].game_pk, 777002);
}

#[test]
fn picks_last_and_next_games_from_fixture() {
    let schedule = parse_schedule_json(&read_fixture("schedule.json")).expect("fixture should parse");
    let selection = tracker::select_games(&schedule, at("2025-06-01T22:30:00Z"));
    assert!(selection.live.is_none());
    assert_eq!(selection.last.map(|s| s.game.game_pk), Some(777001));
    assert_eq!(selection.next.map(|s| s.game.game_pk), Some(777002));
}

#[test]
fn finished_game_fixture_normalizes_to_final() {
    let snapshot = FeedSnapshot {
        fetched_at: at("2025-06-01T22:30:00Z"),
        schedule: parse_schedule_json(&read_fixture("schedule.json")).expect("fixture should parse"),
        live: None,
    };
    let out = tracker::apply(&snapshot, &GameState::default());
    let state = out.state;
    assert_eq!(state.phase, Phase::Final);
    assert_eq!((state.away_score, state.home_score), (2, 4));
    assert_eq!(state.linescore.innings.len(), 9);
    assert_eq!(state.linescore.innings[8].home, None);
    assert_eq!(state.linescore.home.hits, 8);
    assert_eq!(state.linescore.away.errors, 1);
    assert_eq!(state.raw_outs, 0);
    assert_eq!(state.next_game.as_ref().map(|g| g.game_pk), Some(777002));
    assert_eq!(
        state.next_game.as_ref().map(|g| g.home.abbreviation.as_str()),
        Some("TEX")
    );
    assert!(out.warnings.is_empty());
}

#[test]
fn live_feed_fixture_fills_the_board() {
    let live = parse_live_feed_json(&read_fixture("live_feed.json")).expect("fixture should parse");
    assert_eq!(live.game_pk, Some(777003));

    let schedule: SchedulePayload = serde_json::from_value(json!({
        "dates": [{ "games": [{
            "gamePk": 777003,
            "gameDate": "2025-06-01T23:10:00Z",
            "status": { "abstractGameState": "Live", "detailedState": "In Progress" },
            "teams": {
                "away": { "team": { "id": 147 }, "score": 2 },
                "home": { "team": { "id": 117 }, "score": 3 }
            }
        }]}]
    }))
    .expect("schedule payload");
    let snapshot = FeedSnapshot {
        fetched_at: at("2025-06-02T00:45:00Z"),
        schedule,
        live: Some(live),
    };

    let out = tracker::apply(&snapshot, &GameState::default());
    let state = out.state;
    assert_eq!(state.phase, Phase::Live);
    assert_eq!(state.inning, Some(5));
    assert_eq!(state.half_inning, Some(HalfInning::Bottom));
    assert_eq!((state.balls, state.strikes, state.display_outs), (1, 2, 1));
    assert_eq!(state.bases.first, Occupancy::Occupied(514888));
    assert_eq!(state.bases.second, Occupancy::Empty);
    assert_eq!(state.batting_team_id, Some(117));
    assert_eq!(
        state.current_batter.as_ref().map(|p| p.name.as_str()),
        Some("Jeremy Pena")
    );
    assert_eq!(
        state.current_pitcher.as_ref().map(|p| p.name.as_str()),
        Some("Gerrit Cole")
    );
    assert_eq!((state.away_score, state.home_score), (2, 3));
    assert_eq!(state.away.as_ref().map(|t| t.abbreviation.as_str()), Some("NYY"));
    assert_eq!(state.linescore.innings[4].home, None);
    assert!(out.warnings.is_empty());
}

#[test]
fn null_and_empty_bodies_are_empty_payloads() {
    assert!(parse_schedule_json("null").expect("null schedule").dates.is_empty());
    assert!(parse_live_feed_json("").expect("empty feed").live_data.linescore.is_none());
    assert!(parse_live_feed_json("{\"gamePk\": ").is_err());
}

#[test]
fn snapshot_skips_live_feed_when_nothing_is_in_progress() {
    let feed = FixtureFeed {
        live_calls: AtomicUsize::new(0),
    };
    let snapshot =
        fetch_snapshot(&feed, 117, 7, at("2025-06-01T22:30:00Z")).expect("fixture snapshot");
    assert!(snapshot.live.is_none());
    assert_eq!(snapshot.schedule.games().count(), 2);
    assert_eq!(feed.live_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn replay_fixture_reports_one_third_out() {
    let snapshots: Vec<FeedSnapshot> =
        serde_json::from_str(&read_fixture("replay.json")).expect("replay fixture should parse");
    let mut state = GameState::default();
    let mut third_outs = 0;
    let mut phases = Vec::new();
    for snapshot in &snapshots {
        let out = tracker::apply(snapshot, &state);
        third_outs += out
            .changes
            .iter()
            .filter(|c| matches!(c, StateChange::ThirdOutDetected { .. }))
            .count();
        assert!(out.state.display_outs <= 2);
        phases.push(out.state.phase);
        state = out.state;
    }
    assert_eq!(third_outs, 1);
    assert_eq!(phases.first(), Some(&Phase::Scheduled));
    assert_eq!(state.phase, Phase::Live);
    assert_eq!(state.half_inning, Some(HalfInning::Bottom));
    assert_eq!((state.away_score, state.home_score), (2, 1));
}
