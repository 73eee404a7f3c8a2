use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::FeedError;
use crate::feed::{
    Defense, FeedClient, GameData, GameDataTeams, GameStatus, InningLine, LiveData, LiveFeedPayload,
    Linescore, LinescoreInning, LinescoreTeams, MatchupSide, MatchupTeams, Offense, PersonRef,
    SchedulePayload, ScheduleDate, ScheduleGame, TeamRef,
};
use crate::game::{GamePk, PlayerId, TeamId};
use crate::teams;

const DEMO_GAME_PK: GamePk = 700_001;
const AWAY_TEAM: TeamId = 147;
const HOME_TEAM: TeamId = 117;
const PREGAME_POLLS: u32 = 2;
const REGULATION_INNINGS: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Pregame,
    Live,
    Final,
}

/// Offline feed that plays out a simulated game, one pitch per poll.
pub struct DemoFeed {
    sim: Mutex<Sim>,
    failure_rate: f64,
}

impl DemoFeed {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy(), Utc::now())
    }

    pub fn with_seed(seed: u64, now: DateTime<Utc>) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), now)
    }

    /// Fail roughly this share of schedule fetches with a network error.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn from_rng(rng: StdRng, now: DateTime<Utc>) -> Self {
        Self {
            sim: Mutex::new(Sim::new(rng, now)),
            failure_rate: 0.0,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Sim>, FeedError> {
        self.sim
            .lock()
            .map_err(|_| FeedError::Network("demo feed lock poisoned".to_string()))
    }
}

impl Default for DemoFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient for DemoFeed {
    fn fetch_schedule(
        &self,
        _team_id: TeamId,
        _lookahead_days: u32,
    ) -> Result<SchedulePayload, FeedError> {
        let mut sim = self.lock()?;
        if self.failure_rate > 0.0 && sim.rng.gen_bool(self.failure_rate) {
            return Err(FeedError::Network("simulated outage".to_string()));
        }
        sim.step();
        Ok(sim.schedule())
    }

    fn fetch_live_feed(&self, game_pk: GamePk) -> Result<LiveFeedPayload, FeedError> {
        let sim = self.lock()?;
        if game_pk != sim.game_pk {
            return Err(FeedError::Malformed(format!("unknown game {game_pk}")));
        }
        Ok(sim.live_feed())
    }
}

struct Sim {
    rng: StdRng,
    game_pk: GamePk,
    start: DateTime<Utc>,
    stage: Stage,
    polls: u32,
    inning: u8,
    top: bool,
    balls: u8,
    strikes: u8,
    outs: u8,
    /// Third out recorded; the board still shows it until the next poll.
    side_retired: bool,
    bases: [Option<PlayerId>; 3],
    lineup_pos: [usize; 2],
    /// Runs per inning, (away, home).
    innings: Vec<(u32, u32)>,
    hits: [u32; 2],
    errors: [u32; 2],
}

impl Sim {
    fn new(rng: StdRng, now: DateTime<Utc>) -> Self {
        Self {
            rng,
            game_pk: DEMO_GAME_PK,
            start: now + ChronoDuration::minutes(2),
            stage: Stage::Pregame,
            polls: 0,
            inning: 1,
            top: true,
            balls: 0,
            strikes: 0,
            outs: 0,
            side_retired: false,
            bases: [None; 3],
            lineup_pos: [0, 0],
            innings: vec![(0, 0)],
            hits: [0, 0],
            errors: [0, 0],
        }
    }

    fn side(&self) -> usize {
        if self.top { 0 } else { 1 }
    }

    fn runs(&self, side: usize) -> u32 {
        self.innings
            .iter()
            .map(|(away, home)| if side == 0 { *away } else { *home })
            .sum()
    }

    fn batter(&self) -> PlayerId {
        let side = self.side();
        roster_base(side) + self.lineup_pos[side] as PlayerId + 1
    }

    fn pitcher(&self) -> PlayerId {
        roster_base(1 - self.side()) + 99
    }

    fn step(&mut self) {
        self.polls += 1;
        match self.stage {
            Stage::Pregame => {
                if self.polls > PREGAME_POLLS {
                    self.stage = Stage::Live;
                }
            }
            Stage::Live => {
                if self.side_retired {
                    self.end_half();
                } else {
                    self.pitch();
                }
            }
            Stage::Final => {}
        }
    }

    fn pitch(&mut self) {
        let roll = self.rng.gen_range(0..100);
        match roll {
            0..=33 => {
                self.balls += 1;
                if self.balls == 4 {
                    self.walk();
                }
            }
            34..=57 => {
                self.strikes += 1;
                if self.strikes == 3 {
                    self.record_out();
                }
            }
            58..=67 => {
                if self.strikes < 2 {
                    self.strikes += 1;
                }
            }
            68..=81 => self.record_out(),
            82..=92 => self.hit(1),
            93..=96 => self.hit(2),
            97 => {
                self.errors[1 - self.side()] += 1;
                self.hit_without_credit(1);
            }
            _ => self.hit(4),
        }
    }

    fn record_out(&mut self) {
        self.outs += 1;
        self.strikes = self.strikes.min(2);
        if self.outs >= 3 {
            // The feed keeps the last count and runners on the board for a poll.
            self.side_retired = true;
        } else {
            self.next_batter();
        }
    }

    fn walk(&mut self) {
        let batter = self.batter();
        let mut carry = Some(batter);
        for slot in 0..3 {
            match carry {
                Some(runner) => carry = self.bases[slot].replace(runner),
                None => break,
            }
        }
        if carry.is_some() {
            self.score(1);
        }
        self.next_batter();
    }

    fn hit(&mut self, bases: usize) {
        self.hits[self.side()] += 1;
        self.hit_without_credit(bases);
    }

    fn hit_without_credit(&mut self, bases: usize) {
        let batter = self.batter();
        let mut runs = 0;
        let mut next = [None; 3];
        for slot in (0..3).rev() {
            if let Some(runner) = self.bases[slot] {
                let to = slot + bases;
                if to >= 3 {
                    runs += 1;
                } else {
                    next[to] = Some(runner);
                }
            }
        }
        if bases >= 4 {
            runs += 1;
        } else {
            next[bases - 1] = Some(batter);
        }
        self.bases = next;
        self.score(runs);
        self.next_batter();
    }

    fn score(&mut self, runs: u32) {
        let idx = usize::from(self.inning - 1);
        if let Some(line) = self.innings.get_mut(idx) {
            if self.top {
                line.0 += runs;
            } else {
                line.1 += runs;
            }
        }
    }

    fn next_batter(&mut self) {
        let side = self.side();
        self.lineup_pos[side] = (self.lineup_pos[side] + 1) % 9;
        self.balls = 0;
        self.strikes = 0;
    }

    fn end_half(&mut self) {
        self.side_retired = false;
        self.balls = 0;
        self.strikes = 0;
        self.outs = 0;
        self.bases = [None; 3];
        self.next_batter();

        let (away, home) = (self.runs(0), self.runs(1));
        let late = self.inning >= REGULATION_INNINGS;
        if late && ((self.top && home > away) || (!self.top && home != away)) {
            self.stage = Stage::Final;
            return;
        }
        if self.top {
            self.top = false;
        } else {
            self.top = true;
            self.inning = self.inning.saturating_add(1);
            self.innings.push((0, 0));
        }
    }

    fn status(&self) -> GameStatus {
        let (abstract_state, detailed) = match self.stage {
            Stage::Pregame => ("Preview", "Pre-Game"),
            Stage::Live => ("Live", "In Progress"),
            Stage::Final => ("Final", "Final"),
        };
        GameStatus {
            abstract_game_state: Some(abstract_state.to_string()),
            detailed_state: Some(detailed.to_string()),
        }
    }

    fn schedule(&self) -> SchedulePayload {
        let mut game = ScheduleGame {
            game_pk: self.game_pk,
            game_date: Some(self.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            status: self.status(),
            teams: Some(MatchupTeams {
                away: MatchupSide {
                    team: Some(team_ref(AWAY_TEAM)),
                    score: Some(i64::from(self.runs(0))),
                },
                home: MatchupSide {
                    team: Some(team_ref(HOME_TEAM)),
                    score: Some(i64::from(self.runs(1))),
                },
            }),
            linescore: None,
        };
        if self.stage != Stage::Pregame {
            game.linescore = Some(self.linescore());
        }
        let tomorrow = ScheduleGame {
            game_pk: self.game_pk + 1,
            game_date: Some(
                (self.start + ChronoDuration::days(1)).to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            status: GameStatus {
                abstract_game_state: Some("Preview".to_string()),
                detailed_state: Some("Scheduled".to_string()),
            },
            teams: Some(MatchupTeams {
                away: MatchupSide {
                    team: Some(team_ref(AWAY_TEAM)),
                    score: None,
                },
                home: MatchupSide {
                    team: Some(team_ref(HOME_TEAM)),
                    score: None,
                },
            }),
            linescore: None,
        };
        SchedulePayload {
            dates: vec![
                ScheduleDate { games: vec![game] },
                ScheduleDate {
                    games: vec![tomorrow],
                },
            ],
        }
    }

    fn live_feed(&self) -> LiveFeedPayload {
        LiveFeedPayload {
            game_pk: Some(self.game_pk),
            game_data: GameData {
                status: self.status(),
                teams: Some(GameDataTeams {
                    away: Some(team_ref(AWAY_TEAM)),
                    home: Some(team_ref(HOME_TEAM)),
                }),
            },
            live_data: LiveData {
                linescore: Some(self.linescore()),
                plays: None,
            },
        }
    }

    fn linescore(&self) -> Linescore {
        let batting = if self.top { AWAY_TEAM } else { HOME_TEAM };
        let fielding = if self.top { HOME_TEAM } else { AWAY_TEAM };
        let runner = |slot: usize| self.bases[slot].map(person);
        let innings = self
            .innings
            .iter()
            .enumerate()
            .map(|(idx, (away, home))| {
                let num = idx as i64 + 1;
                let home_batted = num < i64::from(self.inning) || !self.top;
                LinescoreInning {
                    num: Some(num),
                    away: Some(runs_line(*away)),
                    home: home_batted.then(|| runs_line(*home)),
                }
            })
            .collect();
        Linescore {
            current_inning: Some(i64::from(self.inning)),
            inning_half: Some(if self.top { "Top" } else { "Bottom" }.to_string()),
            is_top_inning: Some(self.top),
            balls: Some(i64::from(self.balls)),
            strikes: Some(i64::from(self.strikes)),
            outs: Some(i64::from(self.outs)),
            innings,
            teams: Some(LinescoreTeams {
                away: Some(InningLine {
                    runs: Some(i64::from(self.runs(0))),
                    hits: Some(i64::from(self.hits[0])),
                    errors: Some(i64::from(self.errors[0])),
                }),
                home: Some(InningLine {
                    runs: Some(i64::from(self.runs(1))),
                    hits: Some(i64::from(self.hits[1])),
                    errors: Some(i64::from(self.errors[1])),
                }),
            }),
            offense: (self.stage == Stage::Live).then(|| Offense {
                batter: Some(person(self.batter())),
                first: runner(0),
                second: runner(1),
                third: runner(2),
                team: Some(team_ref(batting)),
            }),
            defense: (self.stage == Stage::Live).then(|| Defense {
                pitcher: Some(person(self.pitcher())),
                team: Some(team_ref(fielding)),
            }),
        }
    }
}

fn roster_base(side: usize) -> PlayerId {
    if side == 0 { 1000 } else { 2000 }
}

fn runs_line(runs: u32) -> InningLine {
    InningLine {
        runs: Some(i64::from(runs)),
        hits: None,
        errors: None,
    }
}

fn person(id: PlayerId) -> PersonRef {
    let role = if id % 100 == 99 { "Pitcher" } else { "Batter" };
    PersonRef {
        id: Some(id),
        full_name: Some(format!("{role} {}", id % 100)),
    }
}

fn team_ref(id: TeamId) -> TeamRef {
    let known = teams::by_id(id);
    TeamRef {
        id: Some(id),
        name: known.map(|t| t.name.to_string()),
        abbreviation: known.map(|t| t.abbreviation.to_string()),
    }
}
