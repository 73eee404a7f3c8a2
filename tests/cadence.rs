use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use mlb_terminal::game::{GameState, NextGame, Phase, TeamInfo};
use mlb_terminal::scheduler::{
    PollPlan, PollReason, PollScheduler, PollingIntervals, Tick, plan_for,
};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T18:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn scheduled_in(secs: i64) -> GameState {
    GameState {
        phase: Phase::Scheduled,
        start_time: Some(now() + ChronoDuration::seconds(secs)),
        ..GameState::default()
    }
}

fn plan(state: &GameState) -> PollPlan {
    plan_for(state, now(), &PollingIntervals::default())
}

#[test]
fn live_polls_at_live_interval() {
    let state = GameState {
        phase: Phase::Live,
        ..GameState::default()
    };
    assert_eq!(
        plan(&state),
        PollPlan {
            delay: Duration::from_secs(15),
            reason: PollReason::LiveCadence
        }
    );
}

#[test]
fn scheduled_wakes_when_the_final_hour_opens() {
    let far = plan(&scheduled_in(3601));
    assert_eq!(far.reason, PollReason::ScheduledFar);
    assert_eq!(far.delay, Duration::from_secs(1));

    let two_hours = plan(&scheduled_in(7200));
    assert_eq!(two_hours.reason, PollReason::ScheduledFar);
    assert_eq!(two_hours.delay, Duration::from_secs(3600));

    let near = plan(&scheduled_in(3599));
    assert_eq!(near.reason, PollReason::ScheduledNear);
    assert_eq!(near.delay, Duration::from_secs(300));

    let late = plan(&scheduled_in(-600));
    assert_eq!(late.reason, PollReason::ScheduledNear);
    assert_eq!(late.delay, Duration::from_secs(300));
}

#[test]
fn far_off_games_still_recheck_at_the_idle_interval() {
    let tomorrow = plan(&scheduled_in(26 * 3600));
    assert_eq!(tomorrow.reason, PollReason::ScheduledFar);
    assert_eq!(tomorrow.delay, Duration::from_secs(3600));
}

#[test]
fn no_game_and_bare_final_poll_at_idle_interval() {
    let idle = plan(&GameState::default());
    assert_eq!(idle.reason, PollReason::NoGameCadence);
    assert_eq!(idle.delay, Duration::from_secs(3600));

    let done = GameState {
        phase: Phase::Final,
        ..GameState::default()
    };
    assert_eq!(plan(&done).reason, PollReason::NoGameCadence);
}

#[test]
fn final_with_next_game_uses_its_start() {
    let done = GameState {
        phase: Phase::Final,
        next_game: Some(NextGame {
            game_pk: 2,
            start: now() + ChronoDuration::seconds(1800),
            home: TeamInfo::default(),
            away: TeamInfo::default(),
        }),
        ..GameState::default()
    };
    let next = plan(&done);
    assert_eq!(next.reason, PollReason::ScheduledNear);
    assert_eq!(next.delay, Duration::from_secs(300));
}

#[test]
fn scheduler_keeps_at_most_one_fetch_in_flight() {
    let intervals = PollingIntervals {
        live: 15,
        scheduled: 300,
        none: 2,
    };
    let mut scheduler = PollScheduler::new(intervals, Duration::from_secs(12));
    let t0 = Instant::now();
    scheduler.schedule(&GameState::default(), now(), t0);

    assert_eq!(scheduler.tick(t0), Tick::Fetch { seq: 0 });
    assert_eq!(scheduler.tick(t0 + Duration::from_secs(1)), Tick::Idle);
    assert_eq!(
        scheduler.tick(t0 + Duration::from_secs(3)),
        Tick::Busy {
            retry_in: Duration::from_secs(1)
        }
    );
    assert_eq!(scheduler.in_flight(), 1);

    scheduler.settle(0);
    assert_eq!(scheduler.tick(t0 + Duration::from_secs(4)), Tick::Fetch { seq: 1 });
}

#[test]
fn expired_fetches_are_released() {
    let mut scheduler = PollScheduler::new(PollingIntervals::default(), Duration::from_secs(12));
    let t0 = Instant::now();
    scheduler.schedule(&GameState::default(), now(), t0);
    assert_eq!(scheduler.tick(t0), Tick::Fetch { seq: 0 });

    assert!(scheduler.expire(t0 + Duration::from_secs(11)).is_empty());
    assert_eq!(
        scheduler.until_next_deadline(t0 + Duration::from_secs(2)),
        Some(Duration::from_secs(10))
    );
    assert_eq!(scheduler.expire(t0 + Duration::from_secs(12)), vec![0]);
    assert_eq!(scheduler.in_flight(), 0);
}

#[test]
fn failed_polls_never_retry_faster_than_live() {
    let mut scheduler = PollScheduler::new(PollingIntervals::default(), Duration::from_secs(12));
    let t0 = Instant::now();
    let state = scheduled_in(3601);

    let ok = scheduler.rearm(&state, true, now(), t0);
    assert_eq!(ok.delay, Duration::from_secs(1));

    let failed = scheduler.rearm(&state, false, now(), t0);
    assert_eq!(failed.delay, Duration::from_secs(15));
    assert_eq!(failed.reason, PollReason::ScheduledFar);
    assert_eq!(scheduler.next_due(), Some(t0 + Duration::from_secs(15)));
}
