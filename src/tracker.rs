use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, warn};

use crate::error::DataWarning;
use crate::feed::{
    FeedSnapshot, GameStatus, InningLine, Linescore, LiveFeedPayload, PersonRef, SchedulePayload,
    ScheduleGame, TeamRef,
};
use crate::game::{
    Bases, Count, GameState, HalfInning, InningRuns, LineTotals, LinescoreView, NextGame,
    Occupancy, Person, Phase, StateChange, TeamInfo,
};
use crate::teams;

/// A completed game stays the headline this long after its first pitch.
const RECENT_FINAL_HOURS: i64 = 12;
/// Games still marked pre-game this long after their listed start are treated as delayed.
const PREGAME_GRACE_HOURS: i64 = 6;

#[derive(Debug, Clone)]
pub struct Normalized {
    pub state: GameState,
    pub changes: Vec<StateChange>,
    pub warnings: Vec<DataWarning>,
}

#[derive(Debug, Clone, Copy)]
pub struct Selected<'a> {
    pub start: DateTime<Utc>,
    pub game: &'a ScheduleGame,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GameSelection<'a> {
    pub live: Option<Selected<'a>>,
    pub last: Option<Selected<'a>>,
    pub next: Option<Selected<'a>>,
}

/// Pick the in-progress, most recently completed, and next upcoming games from a schedule window.
pub fn select_games(schedule: &SchedulePayload, now: DateTime<Utc>) -> GameSelection<'_> {
    let mut games: Vec<Selected<'_>> = schedule
        .games()
        .filter_map(|game| {
            let start = parse_game_date(game.game_date.as_deref()?)?;
            Some(Selected { start, game })
        })
        .collect();
    games.sort_by_key(|s| (s.start, s.game.game_pk));

    let grace = ChronoDuration::hours(PREGAME_GRACE_HOURS);
    let mut selection = GameSelection::default();
    for selected in games {
        let status = &selected.game.status;
        if is_cancelled(status) {
            continue;
        }
        if is_live(status) {
            selection.live = Some(selected);
        } else if is_final(status) {
            if selected.start <= now {
                selection.last = Some(selected);
            }
        } else if selection.next.is_none() && selected.start + grace >= now {
            selection.next = Some(selected);
        }
    }
    selection
}

/// Normalize one poll against the previously held state. Pure: the same inputs always
/// produce the same output.
pub fn apply(snapshot: &FeedSnapshot, previous: &GameState) -> Normalized {
    let now = snapshot.fetched_at;
    let selection = select_games(&snapshot.schedule, now);
    let mut warnings = Vec::new();

    let recent_final = selection
        .last
        .filter(|last| now - last.start <= ChronoDuration::hours(RECENT_FINAL_HOURS));

    let mut state = if let Some(live) = selection.live {
        let feed = snapshot
            .live
            .as_ref()
            .filter(|feed| feed.game_pk.is_none_or(|pk| pk == live.game.game_pk));
        live_state(live, feed, &mut warnings)
    } else if let Some(last) = recent_final {
        final_state(last, &mut warnings)
    } else if let Some(next) = selection.next {
        scheduled_state(next)
    } else if let Some(last) = selection.last {
        final_state(last, &mut warnings)
    } else {
        GameState::default()
    };
    state.next_game = selection.next.map(next_game);

    let third_out = suppress_third_out(&mut state, previous);
    let changes = diff(previous, &state, third_out);

    for warning in &warnings {
        warn!(field = warning.field, raw = warning.raw, "clamped out-of-range feed value");
    }
    if !changes.is_empty() {
        debug!(
            changes = ?changes.iter().map(StateChange::label).collect::<Vec<_>>(),
            "game state changed"
        );
    }

    Normalized {
        state,
        changes,
        warnings,
    }
}

/// Upstream briefly reports three outs with the old runners and count still on the board.
/// On the tick the third out first appears the board is reset and one event is emitted;
/// while upstream keeps reporting three outs the reset values are held silently.
fn suppress_third_out(state: &mut GameState, previous: &GameState) -> Option<(Count, Bases)> {
    if state.phase != Phase::Live || state.raw_outs < 3 {
        return None;
    }
    state.balls = 0;
    state.strikes = 0;
    state.display_outs = 0;
    state.bases = Bases::EMPTY;

    let edge = previous.phase == Phase::Live
        && previous.game_pk == state.game_pk
        && previous.raw_outs < 3;
    if edge {
        debug!(inning = ?state.inning, half = ?state.half_inning, "third out detected");
        Some((previous.count(), previous.bases))
    } else {
        None
    }
}

fn diff(
    previous: &GameState,
    next: &GameState,
    third_out: Option<(Count, Bases)>,
) -> Vec<StateChange> {
    let mut changes = Vec::new();
    if previous.phase != next.phase {
        changes.push(StateChange::PhaseChanged {
            old: previous.phase,
            new: next.phase,
        });
    }
    if previous.score() != next.score() {
        changes.push(StateChange::ScoreChanged {
            old: previous.score(),
            new: next.score(),
        });
    }
    if let Some((count, bases)) = third_out {
        changes.push(StateChange::ThirdOutDetected { count, bases });
    } else {
        if previous.count() != next.count() {
            changes.push(StateChange::CountChanged {
                old: previous.count(),
                new: next.count(),
            });
        }
        if previous.bases != next.bases {
            changes.push(StateChange::BaseOccupancyChanged {
                old: previous.bases,
                new: next.bases,
            });
        }
    }
    if person_id(&previous.current_batter) != person_id(&next.current_batter) {
        changes.push(StateChange::BatterChanged {
            old: previous.current_batter.clone(),
            new: next.current_batter.clone(),
        });
    }
    if person_id(&previous.current_pitcher) != person_id(&next.current_pitcher) {
        changes.push(StateChange::PitcherChanged {
            old: previous.current_pitcher.clone(),
            new: next.current_pitcher.clone(),
        });
    }
    changes
}

fn live_state(
    selected: Selected<'_>,
    feed: Option<&LiveFeedPayload>,
    warnings: &mut Vec<DataWarning>,
) -> GameState {
    let game = selected.game;
    let linescore = feed
        .and_then(|f| f.live_data.linescore.as_ref())
        .or(game.linescore.as_ref());
    let play = feed
        .and_then(|f| f.live_data.plays.as_ref())
        .and_then(|p| p.current_play.as_ref());
    let count = play.and_then(|p| p.count.as_ref());
    let matchup = play.and_then(|p| p.matchup.as_ref());

    let balls = count
        .and_then(|c| c.balls)
        .or(linescore.and_then(|l| l.balls))
        .unwrap_or(0);
    let strikes = count
        .and_then(|c| c.strikes)
        .or(linescore.and_then(|l| l.strikes))
        .unwrap_or(0);
    let outs = linescore
        .and_then(|l| l.outs)
        .or(count.and_then(|c| c.outs))
        .unwrap_or(0);
    let balls = clamp_field("balls", balls, 0, 3, warnings) as u8;
    let strikes = clamp_field("strikes", strikes, 0, 2, warnings) as u8;
    let raw_outs = clamp_field("outs", outs, 0, 3, warnings) as u8;

    let offense = linescore.and_then(|l| l.offense.as_ref());
    let bases = Bases {
        first: occupant(offense.and_then(|o| o.first.as_ref())),
        second: occupant(offense.and_then(|o| o.second.as_ref())),
        third: occupant(offense.and_then(|o| o.third.as_ref())),
    };
    let current_batter = offense
        .and_then(|o| o.batter.as_ref())
        .and_then(person)
        .or_else(|| matchup.and_then(|m| m.batter.as_ref()).and_then(person));
    let current_pitcher = linescore
        .and_then(|l| l.defense.as_ref())
        .and_then(|d| d.pitcher.as_ref())
        .and_then(person)
        .or_else(|| matchup.and_then(|m| m.pitcher.as_ref()).and_then(person));

    let (home, away) = team_infos(game, feed);
    let half_inning = linescore.and_then(half_inning);
    let batting_team_id = offense
        .and_then(|o| o.team.as_ref())
        .and_then(|t| t.id)
        .or(match half_inning {
            Some(HalfInning::Top) => away.id,
            Some(HalfInning::Bottom) => home.id,
            None => None,
        });

    let view = linescore_view(linescore, warnings);
    let (home_score, away_score) = scores(game, linescore, warnings);
    let status = feed
        .and_then(|f| f.game_data.status.detailed_state.clone())
        .or_else(|| game.status.detailed_state.clone());

    GameState {
        phase: Phase::Live,
        game_pk: Some(game.game_pk),
        start_time: Some(selected.start),
        inning: inning(linescore, warnings),
        half_inning,
        balls,
        strikes,
        raw_outs,
        display_outs: raw_outs.min(2),
        bases,
        batting_team_id,
        current_batter,
        current_pitcher,
        home_score,
        away_score,
        home: Some(home),
        away: Some(away),
        linescore: view,
        detailed_status: status,
        next_game: None,
    }
}

fn final_state(selected: Selected<'_>, warnings: &mut Vec<DataWarning>) -> GameState {
    let game = selected.game;
    let linescore = game.linescore.as_ref();
    let (home, away) = team_infos(game, None);
    let (home_score, away_score) = scores(game, linescore, warnings);
    GameState {
        phase: Phase::Final,
        game_pk: Some(game.game_pk),
        start_time: Some(selected.start),
        inning: inning(linescore, warnings),
        half_inning: linescore.and_then(half_inning),
        home_score,
        away_score,
        home: Some(home),
        away: Some(away),
        linescore: linescore_view(linescore, warnings),
        detailed_status: game.status.detailed_state.clone(),
        ..GameState::default()
    }
}

fn scheduled_state(selected: Selected<'_>) -> GameState {
    let game = selected.game;
    let (home, away) = team_infos(game, None);
    GameState {
        phase: Phase::Scheduled,
        game_pk: Some(game.game_pk),
        start_time: Some(selected.start),
        home: Some(home),
        away: Some(away),
        detailed_status: game.status.detailed_state.clone(),
        ..GameState::default()
    }
}

fn next_game(selected: Selected<'_>) -> NextGame {
    let (home, away) = team_infos(selected.game, None);
    NextGame {
        game_pk: selected.game.game_pk,
        start: selected.start,
        home,
        away,
    }
}

fn inning(linescore: Option<&Linescore>, warnings: &mut Vec<DataWarning>) -> Option<u8> {
    let raw = linescore?.current_inning?;
    Some(clamp_field("inning", raw, 1, 99, warnings) as u8)
}

fn half_inning(linescore: &Linescore) -> Option<HalfInning> {
    match linescore.inning_half.as_deref() {
        Some("Top") => Some(HalfInning::Top),
        Some("Bottom") => Some(HalfInning::Bottom),
        _ => linescore.is_top_inning.map(|top| {
            if top {
                HalfInning::Top
            } else {
                HalfInning::Bottom
            }
        }),
    }
}

fn scores(
    game: &ScheduleGame,
    linescore: Option<&Linescore>,
    warnings: &mut Vec<DataWarning>,
) -> (u32, u32) {
    let totals = linescore.and_then(|l| l.teams.as_ref());
    let matchup = game.teams.as_ref();
    let home = totals
        .and_then(|t| t.home.as_ref())
        .and_then(|l| l.runs)
        .or(matchup.and_then(|m| m.home.score))
        .unwrap_or(0);
    let away = totals
        .and_then(|t| t.away.as_ref())
        .and_then(|l| l.runs)
        .or(matchup.and_then(|m| m.away.score))
        .unwrap_or(0);
    (
        clamp_field("home runs", home, 0, i64::from(u32::MAX), warnings) as u32,
        clamp_field("away runs", away, 0, i64::from(u32::MAX), warnings) as u32,
    )
}

fn linescore_view(linescore: Option<&Linescore>, warnings: &mut Vec<DataWarning>) -> LinescoreView {
    let Some(linescore) = linescore else {
        return LinescoreView::default();
    };
    let innings = linescore
        .innings
        .iter()
        .enumerate()
        .map(|(idx, inning)| InningRuns {
            num: clamp_field("inning number", inning.num.unwrap_or(idx as i64 + 1), 1, 99, warnings)
                as u8,
            home: inning
                .home
                .as_ref()
                .and_then(|l| l.runs)
                .map(|r| clamp_field("inning runs", r, 0, 99, warnings) as u32),
            away: inning
                .away
                .as_ref()
                .and_then(|l| l.runs)
                .map(|r| clamp_field("inning runs", r, 0, 99, warnings) as u32),
        })
        .collect();
    let teams = linescore.teams.as_ref();
    LinescoreView {
        innings,
        home: line_totals(teams.and_then(|t| t.home.as_ref()), warnings),
        away: line_totals(teams.and_then(|t| t.away.as_ref()), warnings),
    }
}

fn line_totals(line: Option<&InningLine>, warnings: &mut Vec<DataWarning>) -> LineTotals {
    let Some(line) = line else {
        return LineTotals::default();
    };
    let mut total = |field: &'static str, value: Option<i64>| {
        clamp_field(field, value.unwrap_or(0), 0, i64::from(u32::MAX), warnings) as u32
    };
    LineTotals {
        runs: total("runs", line.runs),
        hits: total("hits", line.hits),
        errors: total("errors", line.errors),
    }
}

fn team_infos(game: &ScheduleGame, feed: Option<&LiveFeedPayload>) -> (TeamInfo, TeamInfo) {
    let feed_teams = feed.and_then(|f| f.game_data.teams.as_ref());
    let matchup = game.teams.as_ref();
    let home = feed_teams
        .and_then(|t| t.home.as_ref())
        .or(matchup.and_then(|m| m.home.team.as_ref()));
    let away = feed_teams
        .and_then(|t| t.away.as_ref())
        .or(matchup.and_then(|m| m.away.team.as_ref()));
    (team_info(home), team_info(away))
}

fn team_info(team: Option<&TeamRef>) -> TeamInfo {
    let Some(team) = team else {
        return TeamInfo {
            id: None,
            name: "UNKNOWN".to_string(),
            abbreviation: "UNK".to_string(),
        };
    };
    let known = team.id.and_then(teams::by_id);
    let name = team
        .name
        .clone()
        .or_else(|| known.map(|t| t.name.to_string()))
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let abbreviation = team
        .abbreviation
        .clone()
        .or_else(|| known.map(|t| t.abbreviation.to_string()))
        .unwrap_or_else(|| name.chars().take(3).collect::<String>().to_uppercase());
    TeamInfo {
        id: team.id,
        name,
        abbreviation,
    }
}

fn occupant(runner: Option<&PersonRef>) -> Occupancy {
    Occupancy::from(runner.and_then(|r| r.id))
}

fn person(person: &PersonRef) -> Option<Person> {
    let id = person.id?;
    Some(Person {
        id,
        name: person
            .full_name
            .clone()
            .unwrap_or_else(|| format!("#{id}")),
    })
}

fn person_id(person: &Option<Person>) -> Option<u64> {
    person.as_ref().map(|p| p.id)
}

fn clamp_field(
    field: &'static str,
    raw: i64,
    lo: i64,
    hi: i64,
    warnings: &mut Vec<DataWarning>,
) -> i64 {
    let clamped = raw.clamp(lo, hi);
    if clamped != raw {
        warnings.push(DataWarning {
            field,
            raw,
            clamped,
        });
    }
    clamped
}

pub fn parse_game_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn is_live(status: &GameStatus) -> bool {
    status.abstract_game_state.as_deref() == Some("Live")
        || status.detailed_state.as_deref() == Some("In Progress")
}

fn is_final(status: &GameStatus) -> bool {
    matches!(
        status.detailed_state.as_deref(),
        Some("Final" | "Game Over" | "Completed Early")
    ) || status.abstract_game_state.as_deref() == Some("Final")
}

fn is_cancelled(status: &GameStatus) -> bool {
    status
        .detailed_state
        .as_deref()
        .is_some_and(|s| s.contains("Postponed") || s.contains("Cancelled"))
}
