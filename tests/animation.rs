mod common;

use common::{LiveTick, live_snapshot, noon};
use mlb_terminal::animation::{AnimationStep, Destination, OCCUPY_FADE, Origin, PlanContext, plan};
use mlb_terminal::game::{BaseSlot, Bases, GameState, Occupancy};
use mlb_terminal::teams::TeamColor;
use mlb_terminal::tracker;

const RUNNER_A: u64 = 11;
const BATTER: u64 = 500;

fn bases(first: Option<u64>, second: Option<u64>, third: Option<u64>) -> Bases {
    Bases {
        first: first.into(),
        second: second.into(),
        third: third.into(),
    }
}

fn ctx(runs_scored: u32) -> PlanContext {
    PlanContext {
        third_out: false,
        runs_scored,
        batter: Some(BATTER),
        color: TeamColor::hex(0x002d62),
    }
}

fn fade(slot: BaseSlot) -> AnimationStep {
    AnimationStep::OccupyFade {
        slot,
        color: TeamColor::hex(0x002d62),
        duration: OCCUPY_FADE,
    }
}

#[test]
fn single_with_runner_on_first_moves_him_one_base() {
    let previous = bases(Some(RUNNER_A), None, None);
    let next = bases(Some(BATTER), Some(RUNNER_A), None);
    let steps = plan(&previous, &next, &ctx(0));
    assert_eq!(
        steps,
        vec![
            AnimationStep::Move {
                runner: RUNNER_A,
                from: Origin::Base(BaseSlot::First),
                to: Destination::Base(BaseSlot::Second),
            },
            AnimationStep::Move {
                runner: BATTER,
                from: Origin::Batter,
                to: Destination::Base(BaseSlot::First),
            },
            fade(BaseSlot::First),
        ]
    );
}

#[test]
fn runner_from_third_scores_when_a_run_came_in() {
    let previous = bases(None, None, Some(RUNNER_A));
    let next = bases(Some(BATTER), None, None);
    let steps = plan(&previous, &next, &ctx(1));
    assert_eq!(
        steps[0],
        AnimationStep::Move {
            runner: RUNNER_A,
            from: Origin::Base(BaseSlot::Third),
            to: Destination::Home,
        }
    );
    assert_eq!(steps.len(), 3);
}

#[test]
fn vanished_runner_without_a_run_is_cleared() {
    let previous = bases(Some(RUNNER_A), None, None);
    let steps = plan(&previous, &Bases::EMPTY, &ctx(0));
    assert_eq!(steps, vec![AnimationStep::Clear(BaseSlot::First)]);
}

#[test]
fn solo_home_run_sends_the_batter_around() {
    let steps = plan(&Bases::EMPTY, &Bases::EMPTY, &ctx(1));
    assert_eq!(
        steps,
        vec![AnimationStep::Move {
            runner: BATTER,
            from: Origin::Batter,
            to: Destination::Home,
        }]
    );
}

#[test]
fn third_out_clears_every_base_lead_runner_first() {
    let previous = bases(Some(1), Some(2), Some(3));
    let context = PlanContext {
        third_out: true,
        ..ctx(0)
    };
    assert_eq!(
        plan(&previous, &Bases::EMPTY, &context),
        vec![
            AnimationStep::Clear(BaseSlot::Third),
            AnimationStep::Clear(BaseSlot::Second),
            AnimationStep::Clear(BaseSlot::First),
        ]
    );
}

#[test]
fn runner_sent_back_is_cleared_then_faded_in() {
    let previous = bases(None, Some(RUNNER_A), None);
    let next = bases(Some(RUNNER_A), None, None);
    let steps = plan(&previous, &next, &ctx(0));
    assert_eq!(
        steps,
        vec![AnimationStep::Clear(BaseSlot::Second), fade(BaseSlot::First)]
    );
}

#[test]
fn context_counts_runs_only_within_the_same_half() {
    let before = tracker::apply(
        &live_snapshot(
            &LiveTick {
                third: Some(RUNNER_A),
                ..LiveTick::default()
            },
            noon(),
        ),
        &GameState::default(),
    );
    let scored = tracker::apply(
        &live_snapshot(
            &LiveTick {
                first: Some(BATTER),
                batter: Some(501),
                away_runs: 1,
                ..LiveTick::default()
            },
            noon(),
        ),
        &before.state,
    );
    let context = PlanContext::between(&before.state, &scored.state, &scored.changes)
        .expect("bases changed");
    assert_eq!(context.runs_scored, 1);
    assert_eq!(context.batter, Some(BATTER));
    assert!(!context.third_out);
    assert_eq!(scored.state.bases.first, Occupancy::Occupied(BATTER));

    let steps = plan(&before.state.bases, &scored.state.bases, &context);
    assert!(steps.contains(&AnimationStep::Move {
        runner: RUNNER_A,
        from: Origin::Base(BaseSlot::Third),
        to: Destination::Home,
    }));
}

#[test]
fn quiet_ticks_have_no_context() {
    let state = tracker::apply(&live_snapshot(&LiveTick::default(), noon()), &GameState::default())
        .state;
    assert!(PlanContext::between(&state, &state, &[]).is_none());
}

#[test]
fn joining_mid_game_never_runs_anyone_from_the_plate() {
    let joined = tracker::apply(
        &live_snapshot(
            &LiveTick {
                first: Some(RUNNER_A),
                batter: Some(BATTER),
                ..LiveTick::default()
            },
            noon(),
        ),
        &GameState::default(),
    );
    assert!(PlanContext::between(&GameState::default(), &joined.state, &joined.changes).is_none());

    let unknown_batter = PlanContext {
        batter: None,
        ..ctx(0)
    };
    let steps = plan(&Bases::EMPTY, &joined.state.bases, &unknown_batter);
    assert!(!steps.iter().any(|step| matches!(
        step,
        AnimationStep::Move {
            from: Origin::Batter,
            ..
        }
    )));
    assert_eq!(steps, vec![fade(BaseSlot::First)]);
}
