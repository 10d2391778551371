//! UN-ION - a charged falling-block puzzle
//!
//! Opposite charges in a row or column cancel out; tall same-charge stacks
//! brew electrical storms.

mod arc;
mod audio;
mod block;
mod board;
mod effects;
mod events;
mod game;
mod geometry;
mod gravity;
mod input;
mod logic;
mod piece;
mod randomizer;
mod reaction;
mod score;
mod settings;
mod storm;
mod tetromino;
mod ui;

use audio::AudioManager;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use effects::Effects;
use events::GameEvent;
use game::{Action, Game, GameState};
use input::InputHandler;
use ratatui::{backend::CrosstermBackend, Terminal};
use settings::Settings;
use std::{
    io::{self, stdout},
    sync::mpsc::{self, Receiver},
    time::{Duration, Instant},
};

/// Target frame rate
const TARGET_FPS: u64 = 60;
const FRAME_DURATION: Duration = Duration::from_micros(1_000_000 / TARGET_FPS);

/// Longest step fed to the simulation, so a stalled terminal doesn't teleport blocks
const MAX_FRAME_DT: f64 = 0.1;

/// Get the union temp directory, creating it if needed
fn union_temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("union");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

fn main() -> io::Result<()> {
    // Generate session ID for this instance
    let session_id: u32 = rand::random();

    let union_dir = union_temp_dir();
    let log_file = format!("{:08x}.log", session_id);

    // Setup tracing to log file; the terminal belongs to the game
    let file_appender = tracing_appender::rolling::never(&union_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "union_tui=debug".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .init();

    tracing::info!(
        "UN-ION starting up, session={:08x}, log={}",
        session_id,
        union_dir.join(&log_file).display()
    );

    let settings = Settings::load();

    // Optional: the game runs silently without a device or assets
    let mut audio = AudioManager::new(&settings.audio);

    let (tx, rx) = mpsc::channel::<GameEvent>();
    let mut game = Game::new(settings.game_config(), Box::new(tx));

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut game, &rx, &settings, &mut audio);

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;

    if let Some(audio) = &mut audio {
        audio.stop_bgm();
    }

    if result.is_ok() {
        println!("\nThanks for playing UN-ION!");
        println!("Final Score: {}", game.score.points);
        println!(
            "Blocks cleared: {} | Reactions: {} | Largest: {}",
            game.score.blocks_cleared, game.score.reactions, game.score.largest_reaction
        );
    }
    tracing::info!("Shutting down with {} points", game.score.points);

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    game: &mut Game,
    events: &Receiver<GameEvent>,
    settings: &Settings,
    audio: &mut Option<AudioManager>,
) -> io::Result<()> {
    let mut input = InputHandler::from_settings(settings);
    let mut effects = Effects::default();
    let mut last_frame = Instant::now();
    let mut last_state = game.state;

    if let Some(audio) = audio {
        audio.play_bgm();
    }

    loop {
        terminal.draw(|frame| ui::render_game(frame, game, &mut effects, settings))?;

        // Handle input
        if event::poll(FRAME_DURATION)? {
            if let Event::Key(key) = event::read()? {
                match key.kind {
                    KeyEventKind::Release => input.key_up(key),
                    _ => {
                        for action in input.key_down(key) {
                            match action {
                                Action::Quit => return Ok(()),
                                Action::Restart => {
                                    effects.clear();
                                    input.clear();
                                    game.restart();
                                }
                                other => game.process_action(other),
                            }
                        }
                    }
                }
            }
        }

        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f64().min(MAX_FRAME_DT);
        last_frame = now;

        // Process held keys for DAS/ARR
        if game.state == GameState::Playing {
            for action in input.update() {
                game.process_action(action);
            }
        }

        game.update(dt);

        for event in events.try_iter() {
            if let Some(audio) = audio {
                audio.handle_event(&event);
            }
            if settings.visual.show_effects {
                effects.handle_event(&event);
            }
        }
        effects.update(dt);

        if game.state != last_state {
            on_state_change(last_state, game.state, &mut input, audio);
            last_state = game.state;
        }
    }
}

/// Keep music and held keys in step with pause and game over
fn on_state_change(from: GameState, to: GameState, input: &mut InputHandler, audio: &mut Option<AudioManager>) {
    tracing::debug!("State {:?} -> {:?}", from, to);
    input.clear();
    let Some(audio) = audio else { return };
    match to {
        GameState::Paused => audio.pause_bgm(),
        GameState::GameOver => audio.stop_bgm(),
        GameState::Playing => {
            if from == GameState::GameOver {
                audio.play_bgm();
            } else {
                audio.resume_bgm();
            }
        }
    }
}
