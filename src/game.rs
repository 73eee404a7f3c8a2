use chrono::{DateTime, Utc};

pub type PlayerId = u64;
pub type TeamId = u32;
pub type GamePk = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NoGame,
    Scheduled,
    Live,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfInning {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseSlot {
    First,
    Second,
    Third,
}

impl BaseSlot {
    pub const ALL: [BaseSlot; 3] = [BaseSlot::First, BaseSlot::Second, BaseSlot::Third];
    /// Lead runner first: the order runners are walked when planning moves.
    pub const LEAD_FIRST: [BaseSlot; 3] = [BaseSlot::Third, BaseSlot::Second, BaseSlot::First];

    pub fn label(self) -> &'static str {
        match self {
            BaseSlot::First => "1B",
            BaseSlot::Second => "2B",
            BaseSlot::Third => "3B",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occupancy {
    #[default]
    Empty,
    Occupied(PlayerId),
}

impl Occupancy {
    pub fn runner(self) -> Option<PlayerId> {
        match self {
            Occupancy::Empty => None,
            Occupancy::Occupied(id) => Some(id),
        }
    }

    pub fn is_occupied(self) -> bool {
        matches!(self, Occupancy::Occupied(_))
    }
}

impl From<Option<PlayerId>> for Occupancy {
    fn from(id: Option<PlayerId>) -> Self {
        id.map_or(Occupancy::Empty, Occupancy::Occupied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bases {
    pub first: Occupancy,
    pub second: Occupancy,
    pub third: Occupancy,
}

impl Bases {
    pub const EMPTY: Bases = Bases {
        first: Occupancy::Empty,
        second: Occupancy::Empty,
        third: Occupancy::Empty,
    };

    pub fn get(&self, slot: BaseSlot) -> Occupancy {
        match slot {
            BaseSlot::First => self.first,
            BaseSlot::Second => self.second,
            BaseSlot::Third => self.third,
        }
    }

    pub fn set(&mut self, slot: BaseSlot, occupancy: Occupancy) {
        match slot {
            BaseSlot::First => self.first = occupancy,
            BaseSlot::Second => self.second = occupancy,
            BaseSlot::Third => self.third = occupancy,
        }
    }

    pub fn find(&self, runner: PlayerId) -> Option<BaseSlot> {
        BaseSlot::ALL
            .into_iter()
            .find(|slot| self.get(*slot) == Occupancy::Occupied(runner))
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }

    pub fn occupied_count(&self) -> usize {
        BaseSlot::ALL
            .iter()
            .filter(|slot| self.get(**slot).is_occupied())
            .count()
    }
}

/// Balls, strikes and the outs value exposed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Count {
    pub balls: u8,
    pub strikes: u8,
    pub outs: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TeamInfo {
    pub id: Option<TeamId>,
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InningRuns {
    pub num: u8,
    pub home: Option<u32>,
    pub away: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineTotals {
    pub runs: u32,
    pub hits: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinescoreView {
    pub innings: Vec<InningRuns>,
    pub home: LineTotals,
    pub away: LineTotals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextGame {
    pub game_pk: GamePk,
    pub start: DateTime<Utc>,
    pub home: TeamInfo,
    pub away: TeamInfo,
}

/// Normalized view of the tracked game. Replaced wholesale on every successful poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameState {
    pub phase: Phase,
    pub game_pk: Option<GamePk>,
    pub start_time: Option<DateTime<Utc>>,
    pub inning: Option<u8>,
    pub half_inning: Option<HalfInning>,
    pub balls: u8,
    pub strikes: u8,
    /// Outs exactly as reported upstream (0..=3).
    pub raw_outs: u8,
    /// Outs shown downstream (0..=2). Zero while a third out is being suppressed.
    pub display_outs: u8,
    pub bases: Bases,
    pub batting_team_id: Option<TeamId>,
    pub current_batter: Option<Person>,
    pub current_pitcher: Option<Person>,
    pub home_score: u32,
    pub away_score: u32,
    pub home: Option<TeamInfo>,
    pub away: Option<TeamInfo>,
    pub linescore: LinescoreView,
    pub detailed_status: Option<String>,
    pub next_game: Option<NextGame>,
}

impl GameState {
    pub fn count(&self) -> Count {
        Count {
            balls: self.balls,
            strikes: self.strikes,
            outs: self.display_outs,
        }
    }

    pub fn score(&self) -> Score {
        Score {
            home: self.home_score,
            away: self.away_score,
        }
    }

    pub fn next_start(&self) -> Option<DateTime<Utc>> {
        self.next_game.as_ref().map(|g| g.start)
    }

    pub fn is_live(&self) -> bool {
        self.phase == Phase::Live
    }

    /// Runs of the side currently at bat.
    pub fn batting_side_runs(&self) -> Option<u32> {
        match self.half_inning? {
            HalfInning::Top => Some(self.away_score),
            HalfInning::Bottom => Some(self.home_score),
        }
    }
}

/// One observed transition between two consecutive game states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    PhaseChanged { old: Phase, new: Phase },
    ScoreChanged { old: Score, new: Score },
    CountChanged { old: Count, new: Count },
    /// Carries the count and bases as they stood before the inning-ending reset.
    ThirdOutDetected { count: Count, bases: Bases },
    BaseOccupancyChanged { old: Bases, new: Bases },
    BatterChanged { old: Option<Person>, new: Option<Person> },
    PitcherChanged { old: Option<Person>, new: Option<Person> },
}

impl StateChange {
    pub fn label(&self) -> &'static str {
        match self {
            StateChange::PhaseChanged { .. } => "phase",
            StateChange::ScoreChanged { .. } => "score",
            StateChange::CountChanged { .. } => "count",
            StateChange::ThirdOutDetected { .. } => "third-out",
            StateChange::BaseOccupancyChanged { .. } => "bases",
            StateChange::BatterChanged { .. } => "batter",
            StateChange::PitcherChanged { .. } => "pitcher",
        }
    }
}
