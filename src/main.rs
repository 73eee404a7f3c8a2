use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::{info, warn};

use mlb_terminal::config::{Config, load_config};
use mlb_terminal::demo_feed::DemoFeed;
use mlb_terminal::dispatcher::{Dispatcher, Inbound, LogPresenter, TrackerSettings};
use mlb_terminal::feed::FeedClient;
use mlb_terminal::game::{BaseSlot, GameState, HalfInning, Occupancy, Phase, TeamInfo};
use mlb_terminal::logging::{LogSink, init_logging};
use mlb_terminal::scheduler::PollingIntervals;
use mlb_terminal::state::{AppState, Delta, apply_delta};
use mlb_terminal::statsapi::StatsApiClient;
use mlb_terminal::teams::{self, TeamColor};

#[derive(Debug, Parser)]
#[command(name = "mlb_terminal", about = "Live scoreboard for one MLB team")]
struct Args {
    /// Path to config.json
    #[arg(long, default_value = mlb_terminal::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Team name, abbreviation or nickname (overrides the configured team)
    #[arg(long)]
    team: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Play a simulated game instead of polling StatsAPI
    #[arg(long)]
    demo: bool,

    /// Log state changes instead of drawing the scoreboard
    #[arg(long)]
    headless: bool,
}

struct App {
    state: AppState,
    should_quit: bool,
}

impl App {
    fn new(max_innings: usize) -> Self {
        let mut state = AppState::new();
        state.max_innings = max_innings.max(1);
        Self {
            state,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let args = Args::parse();

    let loaded = load_config(&args.config);
    let mut config = match &loaded {
        Ok(Some(cfg)) => cfg.clone(),
        _ => Config::default(),
    };
    config.apply_env_overrides();
    config.debug |= args.debug;

    let sink = if args.headless {
        LogSink::Stderr
    } else {
        LogSink::CacheFile
    };
    let log_path = init_logging(config.debug, sink);
    match &loaded {
        Ok(Some(_)) => info!(path = %args.config.display(), "config loaded"),
        Ok(None) => info!(path = %args.config.display(), "config not found; using defaults"),
        Err(err) => warn!(error = %format!("{err:#}"), "failed to load config; using defaults"),
    }

    if let Some(team) = args.team.as_deref() {
        match config.resolve_team(team) {
            Some(id) => config.team_id = id,
            None => warn!(team, "unknown team; keeping configured team"),
        }
    }
    if args.demo {
        config.polling_intervals = PollingIntervals {
            live: 2,
            scheduled: 3,
            none: 30,
        };
        config.fetch_timeout_secs = 1;
    }
    for notice in config.validate() {
        warn!("{notice}");
    }

    let settings = config.tracker_settings();
    info!(
        team_id = settings.team_id,
        team = teams::by_id(settings.team_id).map(|t| t.name).unwrap_or("unknown"),
        demo = args.demo,
        "starting tracker"
    );
    if args.demo {
        run(DemoFeed::new().with_failure_rate(0.02), settings, &args, &config, log_path)
    } else {
        run(StatsApiClient::new(), settings, &args, &config, log_path)
    }
}

fn run<F: FeedClient + 'static>(
    client: F,
    settings: TrackerSettings,
    args: &Args,
    config: &Config,
    log_path: Option<PathBuf>,
) -> Result<()> {
    let client = Arc::new(client);
    if args.headless {
        Dispatcher::new(settings, client, LogPresenter).run();
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<Delta>();
    let (tracker, control) = Dispatcher::new(settings, client, tx).spawn();

    let mut app = App::new(config.ui.max_innings);
    if let Some(path) = log_path {
        app.state.push_log(format!("[INFO] Logging to {}", path.display()));
    }

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let _ = control.send(Inbound::Shutdown);
    let _ = tracker.join();

    res.context("terminal loop failed")
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.state.playback.tick(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let state = &app.state;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(7),
            Constraint::Length(5),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&state.game))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let linescore = Paragraph::new(linescore_lines(&state.game, state.max_innings))
        .block(Block::default().title("Linescore").borders(Borders::ALL));
    frame.render_widget(linescore, chunks[1]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(24),
            Constraint::Length(36),
            Constraint::Min(20),
        ])
        .split(chunks[2]);
    let diamond = Paragraph::new(diamond_lines(state))
        .block(Block::default().title("Bases").borders(Borders::ALL));
    frame.render_widget(diamond, middle[0]);
    let situation = Paragraph::new(situation_lines(&state.game))
        .block(Block::default().title("Situation").borders(Borders::ALL));
    frame.render_widget(situation, middle[1]);
    let tape = Paragraph::new(tape_text(state))
        .block(Block::default().title("Plays").borders(Borders::ALL));
    frame.render_widget(tape, middle[2]);

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[3]);

    let footer = Paragraph::new(footer_text(state, Instant::now()))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[4]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(game: &GameState) -> String {
    let matchup = match (&game.away, &game.home) {
        (Some(away), Some(home)) => format!("{} @ {}", away.name, home.name),
        _ => "No game".to_string(),
    };
    let status = match game.phase {
        Phase::NoGame => "NO GAME".to_string(),
        Phase::Scheduled => game
            .start_time
            .map(|start| format!("FIRST PITCH {}", format_local(start)))
            .unwrap_or_else(|| "SCHEDULED".to_string()),
        Phase::Live => match (game.half_inning, game.inning) {
            (Some(half), Some(inning)) => format!("{} {}", half_label(half), ordinal(inning)),
            _ => "LIVE".to_string(),
        },
        Phase::Final => "FINAL".to_string(),
    };
    let detail = game.detailed_status.as_deref().unwrap_or("");
    format!("  MLB TERMINAL | {matchup}\n  {status}  {detail}")
}

fn linescore_lines(game: &GameState, max_innings: usize) -> Vec<Line<'static>> {
    let played = game
        .linescore
        .innings
        .iter()
        .map(|i| usize::from(i.num))
        .max()
        .unwrap_or(0);
    let columns = played.max(max_innings);

    let mut head = format!("{:<6}", "");
    for n in 1..=columns {
        head.push_str(&format!("{n:>3}"));
    }
    head.push_str("    R  H  E");

    let row = |team: Option<&TeamInfo>, home: bool| {
        let (bg, fg) = teams::colors(team.and_then(|t| t.id));
        let label = team.map(|t| t.abbreviation.clone()).unwrap_or_else(|| "---".to_string());
        let mut cells = String::new();
        for n in 1..=columns {
            let runs = game
                .linescore
                .innings
                .iter()
                .find(|i| usize::from(i.num) == n)
                .and_then(|i| if home { i.home } else { i.away });
            match runs {
                Some(r) => cells.push_str(&format!("{r:>3}")),
                None => cells.push_str("  -"),
            }
        }
        let totals = if home {
            game.linescore.home
        } else {
            game.linescore.away
        };
        Line::from(vec![
            Span::styled(
                format!(" {label:<4} "),
                Style::default()
                    .bg(rgb(bg))
                    .fg(rgb(fg))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(cells),
            Span::styled(
                format!(
                    "  {:>3}{:>3}{:>3}",
                    totals.runs, totals.hits, totals.errors
                ),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ])
    };

    vec![
        Line::from(Span::styled(head, Style::default().fg(Color::DarkGray))),
        row(game.away.as_ref(), false),
        row(game.home.as_ref(), true),
    ]
}

fn diamond_lines(state: &AppState) -> Vec<Line<'static>> {
    let now = Instant::now();
    let shown = state.playback.shown();
    let (team_color, _) = teams::colors(state.game.batting_team_id);
    let base = |slot: BaseSlot| {
        let occupied = shown.get(slot) != Occupancy::Empty;
        let style = match state.playback.fade(slot, now) {
            Some((color, t)) => Style::default().fg(rgb(TeamColor::NEUTRAL.blend(color, t))),
            None if occupied => Style::default().fg(rgb(team_color)),
            None => Style::default().fg(Color::DarkGray),
        };
        Span::styled(if occupied { "◆" } else { "◇" }, style)
    };
    vec![
        Line::raw(""),
        Line::from(vec![Span::raw("         "), base(BaseSlot::Second)]),
        Line::raw(""),
        Line::from(vec![
            Span::raw("     "),
            base(BaseSlot::Third),
            Span::raw("       "),
            base(BaseSlot::First),
        ]),
        Line::raw(""),
        Line::from(Span::styled("         ⌂", Style::default().fg(Color::Gray))),
    ]
}

fn situation_lines(game: &GameState) -> Vec<Line<'static>> {
    if game.phase != Phase::Live {
        return vec![Line::raw(match game.phase {
            Phase::Final => "Game over",
            Phase::Scheduled => "Waiting for first pitch",
            _ => "Nothing on",
        })];
    }
    let dots = |n: u8, of: u8, color: Color| {
        let mut spans = Vec::new();
        for i in 0..of {
            if i < n {
                spans.push(Span::styled("● ", Style::default().fg(color)));
            } else {
                spans.push(Span::styled("○ ", Style::default().fg(Color::DarkGray)));
            }
        }
        spans
    };
    let mut lines = Vec::new();
    for (label, n, of, color) in [
        ("B ", game.balls, 3, Color::Green),
        ("S ", game.strikes, 2, Color::Yellow),
        ("O ", game.display_outs, 2, Color::Red),
    ] {
        let mut spans = vec![Span::raw(label)];
        spans.extend(dots(n, of, color));
        lines.push(Line::from(spans));
    }
    lines.push(Line::raw(""));
    let name = |p: &Option<mlb_terminal::game::Person>| {
        p.as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "-".to_string())
    };
    lines.push(Line::raw(format!("AB: {}", name(&game.current_batter))));
    lines.push(Line::raw(format!("P:  {}", name(&game.current_pitcher))));
    lines
}

fn tape_text(state: &AppState) -> String {
    if state.tape.is_empty() {
        return "Nothing yet".to_string();
    }
    state
        .tape
        .iter()
        .take(8)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn footer_text(state: &AppState, now: Instant) -> String {
    let mut parts = Vec::new();
    match (state.next_poll_in(now), state.poll_plan) {
        (Some(left), Some(plan)) => parts.push(format!(
            "Next update in {}s ({})",
            left.as_secs(),
            plan.reason.label()
        )),
        _ => parts.push("Waiting for first update".to_string()),
    }
    if let Some(next) = state.game.next_game.as_ref()
        && state.game.game_pk != Some(next.game_pk)
    {
        parts.push(format!(
            "Next: {} @ {} {}",
            next.away.abbreviation,
            next.home.abbreviation,
            format_local(next.start)
        ));
    }
    parts.push("? Help | q Quit".to_string());
    parts.join(" | ")
}

fn format_local(start: DateTime<Utc>) -> String {
    start
        .with_timezone(&Local)
        .format("%a %b %-d %-I:%M %p")
        .to_string()
}

fn half_label(half: HalfInning) -> &'static str {
    match half {
        HalfInning::Top => "TOP",
        HalfInning::Bottom => "BOT",
    }
}

fn ordinal(n: u8) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn rgb(color: TeamColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(50, 40, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "MLB Terminal - Help",
        "",
        "  ?            Toggle help",
        "  Esc          Close help",
        "  q            Quit",
        "",
        "Flags: --team <name> --demo --headless --debug",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
