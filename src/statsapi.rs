use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

use crate::error::FeedError;
use crate::feed::{FeedClient, LiveFeedPayload, SchedulePayload};
use crate::game::{GamePk, TeamId};
use crate::http_client::{get_text, http_client};

const SCHEDULE_URL: &str = "https://statsapi.mlb.com/api/v1/schedule";
const LIVE_FEED_URL: &str = "https://statsapi.mlb.com/api/v1.1/game";
const SPORT_ID_MLB: &str = "1";

/// Client for the public MLB Stats API.
#[derive(Debug, Clone, Default)]
pub struct StatsApiClient;

impl StatsApiClient {
    pub fn new() -> Self {
        Self
    }
}

impl FeedClient for StatsApiClient {
    fn fetch_schedule(
        &self,
        team_id: TeamId,
        lookahead_days: u32,
    ) -> Result<SchedulePayload, FeedError> {
        let today = Utc::now().date_naive();
        let (start, end) = schedule_window(today, lookahead_days);
        let query = [
            ("sportId", SPORT_ID_MLB.to_string()),
            ("teamId", team_id.to_string()),
            ("startDate", start.format("%Y-%m-%d").to_string()),
            ("endDate", end.format("%Y-%m-%d").to_string()),
            ("hydrate", "team,linescore".to_string()),
        ];
        let body = fetch(SCHEDULE_URL, &query)?;
        parse_schedule_json(&body).map_err(|err| FeedError::Malformed(format!("{err:#}")))
    }

    fn fetch_live_feed(&self, game_pk: GamePk) -> Result<LiveFeedPayload, FeedError> {
        let url = format!("{LIVE_FEED_URL}/{game_pk}/feed/live");
        let body = fetch(&url, &[])?;
        parse_live_feed_json(&body).map_err(|err| FeedError::Malformed(format!("{err:#}")))
    }
}

fn fetch(url: &str, query: &[(&str, String)]) -> Result<String, FeedError> {
    let client = http_client().map_err(|err| FeedError::Network(format!("{err:#}")))?;
    get_text(client, url, query).map_err(|err| FeedError::Network(format!("{err:#}")))
}

/// Yesterday through `lookahead_days` from today, so a late game that crossed midnight is
/// still in the window.
pub fn schedule_window(today: NaiveDate, lookahead_days: u32) -> (NaiveDate, NaiveDate) {
    (
        today - ChronoDuration::days(1),
        today + ChronoDuration::days(i64::from(lookahead_days)),
    )
}

pub fn parse_schedule_json(raw: &str) -> Result<SchedulePayload> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(SchedulePayload::default());
    }
    serde_json::from_str(trimmed).context("invalid schedule json")
}

pub fn parse_live_feed_json(raw: &str) -> Result<LiveFeedPayload> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(LiveFeedPayload::default());
    }
    serde_json::from_str(trimmed).context("invalid live feed json")
}
