use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::game::{GamePk, TeamId};
use crate::tracker;

/// Upstream data source. Implementations block; they are only ever called from the fetch pool.
pub trait FeedClient: Send + Sync {
    fn fetch_schedule(&self, team_id: TeamId, lookahead_days: u32)
    -> Result<SchedulePayload, FeedError>;

    fn fetch_live_feed(&self, game_pk: GamePk) -> Result<LiveFeedPayload, FeedError>;
}

/// Everything one poll observed, stamped with the time it was fetched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub schedule: SchedulePayload,
    #[serde(default)]
    pub live: Option<LiveFeedPayload>,
}

/// Fetch the schedule window and, when a game is in progress, its live feed.
pub fn fetch_snapshot<F: FeedClient + ?Sized>(
    client: &F,
    team_id: TeamId,
    lookahead_days: u32,
    now: DateTime<Utc>,
) -> Result<FeedSnapshot, FeedError> {
    let schedule = client.fetch_schedule(team_id, lookahead_days)?;
    let live_pk = tracker::select_games(&schedule, now)
        .live
        .map(|selected| selected.game.game_pk);
    let live = match live_pk {
        Some(pk) => Some(client.fetch_live_feed(pk)?),
        None => None,
    };
    Ok(FeedSnapshot {
        fetched_at: now,
        schedule,
        live,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePayload {
    #[serde(default)]
    pub dates: Vec<ScheduleDate>,
}

impl SchedulePayload {
    pub fn games(&self) -> impl Iterator<Item = &ScheduleGame> {
        self.dates.iter().flat_map(|d| d.games.iter())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleDate {
    #[serde(default)]
    pub games: Vec<ScheduleGame>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleGame {
    pub game_pk: GamePk,
    #[serde(default)]
    pub game_date: Option<String>,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub teams: Option<MatchupTeams>,
    #[serde(default)]
    pub linescore: Option<Linescore>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    #[serde(default)]
    pub abstract_game_state: Option<String>,
    #[serde(default)]
    pub detailed_state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchupTeams {
    #[serde(default)]
    pub away: MatchupSide,
    #[serde(default)]
    pub home: MatchupSide,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchupSide {
    #[serde(default)]
    pub team: Option<TeamRef>,
    #[serde(default)]
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamRef {
    #[serde(default)]
    pub id: Option<TeamId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Linescore {
    #[serde(default)]
    pub current_inning: Option<i64>,
    #[serde(default)]
    pub inning_half: Option<String>,
    #[serde(default)]
    pub is_top_inning: Option<bool>,
    #[serde(default)]
    pub balls: Option<i64>,
    #[serde(default)]
    pub strikes: Option<i64>,
    #[serde(default)]
    pub outs: Option<i64>,
    #[serde(default)]
    pub innings: Vec<LinescoreInning>,
    #[serde(default)]
    pub teams: Option<LinescoreTeams>,
    #[serde(default)]
    pub offense: Option<Offense>,
    #[serde(default)]
    pub defense: Option<Defense>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinescoreInning {
    #[serde(default)]
    pub num: Option<i64>,
    #[serde(default)]
    pub home: Option<InningLine>,
    #[serde(default)]
    pub away: Option<InningLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InningLine {
    #[serde(default)]
    pub runs: Option<i64>,
    #[serde(default)]
    pub hits: Option<i64>,
    #[serde(default)]
    pub errors: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinescoreTeams {
    #[serde(default)]
    pub home: Option<InningLine>,
    #[serde(default)]
    pub away: Option<InningLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Offense {
    #[serde(default)]
    pub batter: Option<PersonRef>,
    #[serde(default)]
    pub first: Option<PersonRef>,
    #[serde(default)]
    pub second: Option<PersonRef>,
    #[serde(default)]
    pub third: Option<PersonRef>,
    #[serde(default)]
    pub team: Option<TeamRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defense {
    #[serde(default)]
    pub pitcher: Option<PersonRef>,
    #[serde(default)]
    pub team: Option<TeamRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeedPayload {
    #[serde(default)]
    pub game_pk: Option<GamePk>,
    #[serde(default)]
    pub game_data: GameData,
    #[serde(default)]
    pub live_data: LiveData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub teams: Option<GameDataTeams>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameDataTeams {
    #[serde(default)]
    pub away: Option<TeamRef>,
    #[serde(default)]
    pub home: Option<TeamRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveData {
    #[serde(default)]
    pub linescore: Option<Linescore>,
    #[serde(default)]
    pub plays: Option<Plays>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plays {
    #[serde(default)]
    pub current_play: Option<CurrentPlay>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentPlay {
    #[serde(default)]
    pub count: Option<PlayCount>,
    #[serde(default)]
    pub matchup: Option<Matchup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayCount {
    #[serde(default)]
    pub balls: Option<i64>,
    #[serde(default)]
    pub strikes: Option<i64>,
    #[serde(default)]
    pub outs: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Matchup {
    #[serde(default)]
    pub batter: Option<PersonRef>,
    #[serde(default)]
    pub pitcher: Option<PersonRef>,
}
