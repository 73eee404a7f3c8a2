use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dispatcher::TrackerSettings;
use crate::game::TeamId;
use crate::scheduler::PollingIntervals;
use crate::teams;

pub const DEFAULT_TEAM_ID: TeamId = 117;
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub team_id: TeamId,
    /// Extra name -> id aliases consulted before the built-in team table.
    pub teams: HashMap<String, TeamId>,
    pub polling_intervals: PollingIntervals,
    pub lookahead_days: u32,
    pub fetch_timeout_secs: u64,
    pub max_in_flight: usize,
    pub ui: UiConfig,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            team_id: DEFAULT_TEAM_ID,
            teams: HashMap::new(),
            polling_intervals: PollingIntervals::default(),
            lookahead_days: 7,
            fetch_timeout_secs: 12,
            max_in_flight: 1,
            ui: UiConfig::default(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub max_innings: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { max_innings: 9 }
    }
}

/// Missing keys fall back to their defaults; an empty file is the default config.
pub fn parse_config(raw: &str) -> Result<Config> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Config::default());
    }
    serde_json::from_str(trimmed).context("invalid config json")
}

/// `Ok(None)` when the file does not exist.
pub fn load_config(path: &Path) -> Result<Option<Config>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    parse_config(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))
        .map(Some)
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let num = |key: &str| lookup(key).and_then(|val| val.trim().parse::<u64>().ok());

        if let Some(id) = num("MLB_TEAM_ID") {
            self.team_id = id.clamp(1, u64::from(TeamId::MAX)) as TeamId;
        }
        if let Some(secs) = num("LIVE_POLL_SECS") {
            self.polling_intervals.live = secs.clamp(5, 600);
        }
        if let Some(secs) = num("SCHEDULED_POLL_SECS") {
            self.polling_intervals.scheduled = secs.clamp(30, 3600);
        }
        if let Some(secs) = num("IDLE_POLL_SECS") {
            self.polling_intervals.none = secs.clamp(60, 86_400);
        }
        if let Some(days) = num("LOOKAHEAD_DAYS") {
            self.lookahead_days = days.clamp(1, 30) as u32;
        }
        if let Some(secs) = num("FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = secs.clamp(1, 120);
        }
    }

    /// Look a team up in the configured aliases, then in the built-in table.
    pub fn resolve_team(&self, query: &str) -> Option<TeamId> {
        let query = query.trim();
        self.teams
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(query))
            .map(|(_, id)| *id)
            .or_else(|| teams::find(query).map(|t| t.id))
    }

    /// Bring the config back into its valid domain. Returns a notice per adjusted field.
    pub fn validate(&mut self) -> Vec<String> {
        let mut notices = Vec::new();
        let intervals = &mut self.polling_intervals;
        for (name, value) in [
            ("live", &mut intervals.live),
            ("scheduled", &mut intervals.scheduled),
            ("none", &mut intervals.none),
        ] {
            if *value == 0 {
                *value = 1;
                notices.push(format!("polling_intervals.{name} must be positive; using 1s"));
            }
        }
        let ceiling = self.polling_intervals.live.saturating_sub(1).max(1);
        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > ceiling {
            let adjusted = self.fetch_timeout_secs.clamp(1, ceiling);
            notices.push(format!(
                "fetch timeout {}s must be shorter than the live interval; using {adjusted}s",
                self.fetch_timeout_secs
            ));
            self.fetch_timeout_secs = adjusted;
        }
        if self.max_in_flight == 0 {
            self.max_in_flight = 1;
            notices.push("max_in_flight must be at least 1".to_string());
        }
        notices
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            team_id: self.team_id,
            lookahead_days: self.lookahead_days,
            intervals: self.polling_intervals,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_in_flight: self.max_in_flight,
        }
    }
}
