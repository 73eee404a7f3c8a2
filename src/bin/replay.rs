use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use mlb_terminal::animation::{self, PlanContext};
use mlb_terminal::feed::FeedSnapshot;
use mlb_terminal::game::GameState;
use mlb_terminal::scheduler::{PollingIntervals, plan_for};
use mlb_terminal::state::describe_change;
use mlb_terminal::tracker;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/replay.json"));

    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let snapshots: Vec<FeedSnapshot> =
        serde_json::from_str(&raw).context("expected a JSON array of feed snapshots")?;

    // No network and no timers: every snapshot is applied in order, as the dispatcher would.
    let intervals = PollingIntervals::default();
    let mut state = GameState::default();
    for (idx, snapshot) in snapshots.iter().enumerate() {
        let normalized = tracker::apply(snapshot, &state);
        let poll = plan_for(&normalized.state, snapshot.fetched_at, &intervals);
        println!(
            "#{idx} {} {:?} outs={} next poll {}s ({})",
            snapshot.fetched_at.format("%H:%M:%S"),
            normalized.state.phase,
            normalized.state.display_outs,
            poll.delay.as_secs(),
            poll.reason.label()
        );
        for warning in &normalized.warnings {
            println!("  warning: {warning}");
        }
        for change in &normalized.changes {
            match describe_change(change) {
                Some(line) => println!("  {}: {line}", change.label()),
                None => println!("  {}", change.label()),
            }
        }
        if let Some(ctx) = PlanContext::between(&state, &normalized.state, &normalized.changes) {
            for step in animation::plan(&state.bases, &normalized.state.bases, &ctx) {
                println!("    {step:?}");
            }
        }
        state = normalized.state;
    }

    Ok(())
}
