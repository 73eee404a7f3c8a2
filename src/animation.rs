use std::time::Duration;

use crate::game::{BaseSlot, Bases, GameState, PlayerId, StateChange};
use crate::teams::{self, TeamColor};

pub const OCCUPY_FADE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Batter,
    Base(BaseSlot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Base(BaseSlot),
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStep {
    Move {
        runner: PlayerId,
        from: Origin,
        to: Destination,
    },
    /// A base emptied without an observed advance (out, or unknown).
    Clear(BaseSlot),
    OccupyFade {
        slot: BaseSlot,
        color: TeamColor,
        duration: Duration,
    },
}

/// What the sequencer needs to know about the tick besides the two base records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanContext {
    pub third_out: bool,
    /// Runs the batting side scored this tick; used to send vanished runners home.
    pub runs_scored: u32,
    /// Who was at the plate before this tick. Only this runner is ever moved from the plate.
    pub batter: Option<PlayerId>,
    pub color: TeamColor,
}

impl Default for PlanContext {
    fn default() -> Self {
        Self {
            third_out: false,
            runs_scored: 0,
            batter: None,
            color: TeamColor::NEUTRAL,
        }
    }
}

impl PlanContext {
    /// Build the context for the transition `previous -> next`. Returns `None` when the tick
    /// has nothing to animate.
    pub fn between(
        previous: &GameState,
        next: &GameState,
        changes: &[StateChange],
    ) -> Option<PlanContext> {
        let third_out = changes
            .iter()
            .any(|c| matches!(c, StateChange::ThirdOutDetected { .. }));
        let bases_moved = changes
            .iter()
            .any(|c| matches!(c, StateChange::BaseOccupancyChanged { .. }));

        // Joining a game already under way: the board is shown as is.
        if !previous.is_live() || previous.game_pk != next.game_pk {
            return None;
        }
        let same_half = next.is_live()
            && previous.inning == next.inning
            && previous.half_inning == next.half_inning;
        let runs_scored = if same_half {
            match (previous.batting_side_runs(), next.batting_side_runs()) {
                (Some(before), Some(after)) => after.saturating_sub(before),
                _ => 0,
            }
        } else {
            0
        };

        if !third_out && !bases_moved && runs_scored == 0 {
            return None;
        }
        let (color, _) = teams::colors(next.batting_team_id.or(previous.batting_team_id));
        Some(PlanContext {
            third_out,
            runs_scored,
            batter: previous.current_batter.as_ref().map(|p| p.id),
            color,
        })
    }
}

/// Turn a base-occupancy delta into ordered, advisory animation steps. Existing runners are
/// advanced lead runner first, then new arrivals are placed.
pub fn plan(previous: &Bases, next: &Bases, ctx: &PlanContext) -> Vec<AnimationStep> {
    if ctx.third_out {
        return BaseSlot::LEAD_FIRST
            .into_iter()
            .map(AnimationStep::Clear)
            .collect();
    }

    let mut steps = Vec::new();
    let mut runs_left = ctx.runs_scored;

    for slot in BaseSlot::LEAD_FIRST {
        let Some(runner) = previous.get(slot).runner() else {
            continue;
        };
        match next.find(runner) {
            Some(to) if to == slot => {}
            Some(to) if to > slot => steps.push(AnimationStep::Move {
                runner,
                from: Origin::Base(slot),
                to: Destination::Base(to),
            }),
            // Sent back a base: treat as a correction, the arrival is faded in below.
            Some(_) => steps.push(AnimationStep::Clear(slot)),
            None if runs_left > 0 => {
                runs_left -= 1;
                steps.push(AnimationStep::Move {
                    runner,
                    from: Origin::Base(slot),
                    to: Destination::Home,
                });
            }
            None => steps.push(AnimationStep::Clear(slot)),
        }
    }

    for slot in BaseSlot::LEAD_FIRST {
        let Some(runner) = next.get(slot).runner() else {
            continue;
        };
        if previous.find(runner).is_some_and(|from| from <= slot) {
            continue;
        }
        if ctx.batter == Some(runner) && previous.find(runner).is_none() {
            steps.push(AnimationStep::Move {
                runner,
                from: Origin::Batter,
                to: Destination::Base(slot),
            });
        }
        steps.push(AnimationStep::OccupyFade {
            slot,
            color: ctx.color,
            duration: OCCUPY_FADE,
        });
    }

    if runs_left > 0
        && let Some(batter) = ctx.batter
        && previous.find(batter).is_none()
        && next.find(batter).is_none()
    {
        steps.push(AnimationStep::Move {
            runner: batter,
            from: Origin::Batter,
            to: Destination::Home,
        });
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Occupancy;

    #[test]
    fn unchanged_bases_plan_nothing() {
        let bases = Bases {
            first: Occupancy::Occupied(1),
            ..Bases::EMPTY
        };
        assert!(plan(&bases, &bases, &PlanContext::default()).is_empty());
    }

    #[test]
    fn pinch_runner_fades_in_without_a_move_from_the_plate() {
        let previous = Bases {
            first: Occupancy::Occupied(1),
            ..Bases::EMPTY
        };
        let next = Bases {
            first: Occupancy::Occupied(2),
            ..Bases::EMPTY
        };
        let ctx = PlanContext {
            batter: Some(9),
            ..PlanContext::default()
        };
        let steps = plan(&previous, &next, &ctx);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], AnimationStep::Clear(BaseSlot::First));
        assert!(matches!(
            steps[1],
            AnimationStep::OccupyFade {
                slot: BaseSlot::First,
                ..
            }
        ));
    }

    #[test]
    fn unknown_batter_never_moves_anyone_from_the_plate() {
        let next = Bases {
            first: Occupancy::Occupied(5),
            ..Bases::EMPTY
        };
        let steps = plan(&Bases::EMPTY, &next, &PlanContext::default());
        assert_eq!(
            steps,
            vec![AnimationStep::OccupyFade {
                slot: BaseSlot::First,
                color: TeamColor::NEUTRAL,
                duration: OCCUPY_FADE,
            }]
        );
    }
}
