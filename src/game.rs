//! Play session: the pieces in play, the fall timer and the score

use crate::events::EventSink;
use crate::geometry::BoardGeometry;
use crate::logic::{GameLogic, TickReport};
use crate::piece::Piece;
use crate::randomizer::Randomizer;
use crate::reaction::{ReactionMode, ReactionPass};
use crate::score::Score;

/// Default seconds between automatic one-row drops
pub const DEFAULT_FALL_INTERVAL: f64 = 1.0;

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Paused,
    GameOver,
}

/// Input actions the game can process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    HardDrop,
    Rotate,
    Pause,
    Restart,
    Quit,
}

/// Knobs for a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    pub reaction_mode: ReactionMode,
    /// Seconds per automatic drop
    pub fall_interval: f64,
    /// Fixed seed for a reproducible game
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            reaction_mode: ReactionMode::default(),
            fall_interval: DEFAULT_FALL_INTERVAL,
            seed: None,
        }
    }
}

/// The main game struct
pub struct Game {
    /// Rules engine holding the board
    pub logic: GameLogic,
    /// Current falling piece
    pub current_piece: Option<Piece>,
    /// Piece shown in the preview, charges already rolled
    pub next_piece: Piece,
    /// Score tracking
    pub score: Score,
    /// Current game state
    pub state: GameState,
    /// Seconds since the piece last dropped a row
    fall_timer: f64,
    fall_interval: f64,
    /// Last reaction text to display
    pub last_action: Option<String>,
}

impl Game {
    /// Create a new game. Events from the rules engine go to `events`.
    pub fn new(config: GameConfig, events: Box<dyn EventSink>) -> Self {
        let rng = match config.seed {
            Some(seed) => Randomizer::with_seed(seed),
            None => Randomizer::new(),
        };
        let mut logic = GameLogic::new(BoardGeometry::default(), config.reaction_mode, rng, events);

        let first_kind = logic.random_kind();
        let first = logic.spawn_new_piece(first_kind);
        let next_kind = logic.random_kind();
        let next_piece = logic.spawn_new_piece(next_kind);

        tracing::info!(
            "New game: {} reactions, {:.2}s fall interval",
            config.reaction_mode.name(),
            config.fall_interval
        );

        Self {
            logic,
            current_piece: Some(first),
            next_piece,
            score: Score::new(),
            state: GameState::Playing,
            fall_timer: 0.0,
            fall_interval: config.fall_interval.max(0.05),
            last_action: None,
        }
    }

    /// Drop shadow for the current piece
    pub fn ghost_piece(&self) -> Option<Piece> {
        self.current_piece
            .as_ref()
            .map(|piece| self.logic.ghost_piece(piece))
    }

    /// Process an action
    pub fn process_action(&mut self, action: Action) {
        if action == Action::Restart {
            self.restart();
            return;
        }

        match self.state {
            GameState::Paused => {
                if action == Action::Pause {
                    self.state = GameState::Playing;
                }
            }
            GameState::Playing => match action {
                Action::MoveLeft => self.shift(-1),
                Action::MoveRight => self.shift(1),
                Action::SoftDrop => self.soft_drop(),
                Action::HardDrop => self.hard_drop(),
                Action::Rotate => self.rotate(),
                Action::Pause => {
                    self.state = GameState::Paused;
                }
                // Handled by main loop
                Action::Quit | Action::Restart => {}
            },
            GameState::GameOver => {
                // No actions, handled by main loop
            }
        }
    }

    /// Update game state (call every frame with the seconds since the last call)
    pub fn update(&mut self, dt: f64) -> TickReport {
        if self.state != GameState::Playing {
            return TickReport::default();
        }

        let report = self.logic.update(dt);
        self.record(report.reaction);
        // Immediate-mode removals are already counted by `record`
        self.score
            .add_cleared(report.removed - report.reaction.removed);

        self.fall_timer += dt;
        if self.fall_timer >= self.fall_interval {
            self.fall_timer = 0.0;
            let moved = match &mut self.current_piece {
                Some(piece) => self.logic.try_move_piece(piece, 0, 1),
                None => false,
            };
            if !moved {
                self.lock_piece();
            }
        }

        if self.state == GameState::Playing && self.logic.is_game_over() {
            self.game_over();
        }

        report
    }

    fn shift(&mut self, d_col: i32) {
        if let Some(piece) = &mut self.current_piece {
            self.logic.try_move_piece(piece, d_col, 0);
        }
    }

    fn rotate(&mut self) {
        if let Some(piece) = &mut self.current_piece {
            self.logic.try_rotate_piece(piece);
        }
    }

    fn soft_drop(&mut self) {
        if let Some(piece) = &mut self.current_piece {
            if self.logic.try_move_piece(piece, 0, 1) {
                self.fall_timer = 0.0;
            }
        }
    }

    fn hard_drop(&mut self) {
        if let Some(piece) = &mut self.current_piece {
            self.logic.hard_drop_piece(piece);
            self.lock_piece();
        }
    }

    /// Place the current piece, resolve reactions and bring in the next one
    fn lock_piece(&mut self) {
        let Some(piece) = self.current_piece.take() else {
            return;
        };

        self.logic.place_piece(&piece);
        let pass = self.logic.check_reactions();
        self.record(pass);

        self.spawn_next();
    }

    fn spawn_next(&mut self) {
        let kind = self.logic.random_kind();
        let upcoming = self.logic.spawn_new_piece(kind);
        let piece = std::mem::replace(&mut self.next_piece, upcoming);
        self.fall_timer = 0.0;

        // Storm debris on the spawn cells doesn't end the game; the piece absorbs it
        if self.logic.is_game_over() || !self.logic.is_valid_position_ignoring_neutral(&piece, 0, 0) {
            self.game_over();
            return;
        }
        self.logic.absorb_neutral_blocks(&piece);
        self.current_piece = Some(piece);
    }

    fn record(&mut self, pass: ReactionPass) {
        if pass.matched == 0 {
            return;
        }
        self.score.add_reaction(pass.matched, pass.score);
        self.score.add_cleared(pass.removed);
        self.last_action = Some(format!("{} block reaction +{}", pass.matched, pass.score));
    }

    fn game_over(&mut self) {
        self.state = GameState::GameOver;
        self.current_piece = None;
        tracing::info!(
            "Game over: {} points, {} blocks cleared",
            self.score.points,
            self.score.blocks_cleared
        );
    }

    /// Start over on an empty board
    pub fn restart(&mut self) {
        self.logic.reset();
        self.score = Score::new();
        self.state = GameState::Playing;
        self.fall_timer = 0.0;
        self.last_action = None;

        let kind = self.logic.random_kind();
        self.current_piece = Some(self.logic.spawn_new_piece(kind));
        let next_kind = self.logic.random_kind();
        self.next_piece = self.logic.spawn_new_piece(next_kind);
        tracing::info!("Game restarted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, Charge};
    use crate::geometry::GridPos;
    use crate::reaction::WOBBLE_DURATION;
    use crate::tetromino::TetrominoType;

    fn game() -> Game {
        let config = GameConfig {
            seed: Some(77),
            ..GameConfig::default()
        };
        Game::new(config, Box::new(()))
    }

    fn piece_row(game: &Game) -> i32 {
        game.current_piece.as_ref().map(|p| p.row).unwrap_or(-1)
    }

    #[test]
    fn test_new_game_spawns_at_top_centre() {
        let game = game();
        assert_eq!(game.state, GameState::Playing);
        let piece = game.current_piece.as_ref();
        assert!(piece.is_some_and(|p| p.col == 6 && p.row == 0));
        assert_eq!((game.next_piece.col, game.next_piece.row), (6, 0));
    }

    #[test]
    fn test_piece_falls_once_per_interval() {
        let mut game = game();
        game.update(0.5);
        assert_eq!(piece_row(&game), 0);
        game.update(0.5);
        assert_eq!(piece_row(&game), 1);
    }

    #[test]
    fn test_soft_drop_moves_one_row() {
        let mut game = game();
        game.process_action(Action::SoftDrop);
        assert_eq!(piece_row(&game), 1);
    }

    #[test]
    fn test_hard_drop_places_and_spawns_next() {
        let mut game = game();
        let expected_next = game.next_piece.clone();
        game.process_action(Action::HardDrop);

        assert_eq!(game.logic.placed_blocks().len(), 4);
        assert_eq!(game.current_piece, Some(expected_next));
    }

    #[test]
    fn test_pause_blocks_input() {
        let mut game = game();
        game.process_action(Action::Pause);
        assert_eq!(game.state, GameState::Paused);

        game.process_action(Action::SoftDrop);
        game.update(5.0);
        assert_eq!(piece_row(&game), 0);

        game.process_action(Action::Pause);
        assert_eq!(game.state, GameState::Playing);
    }

    #[test]
    fn test_move_stops_at_wall() {
        let mut game = game();
        for _ in 0..20 {
            game.process_action(Action::MoveLeft);
        }
        let cells = game.current_piece.as_ref().map(|p| p.cells());
        assert!(cells.is_some_and(|cells| cells.iter().any(|c| c.col == 0)));
    }

    #[test]
    fn test_blocked_spawn_ends_game() {
        let mut game = game();
        for col in 0..12 {
            game.logic
                .add_neutral_block(Block::new(GridPos::new(col, 1), Charge::Positive));
        }
        game.process_action(Action::HardDrop);
        assert_eq!(game.state, GameState::GameOver);
        assert!(game.current_piece.is_none());
    }

    #[test]
    fn test_telegraphed_match_in_top_row_keeps_playing() {
        let config = GameConfig {
            reaction_mode: ReactionMode::Telegraph,
            seed: Some(77),
            ..GameConfig::default()
        };
        let mut game = Game::new(config, Box::new(()));
        for col in 0..4 {
            for row in 1..20 {
                game.logic
                    .add_neutral_block(Block::new(GridPos::new(col, row), Charge::Neutral));
            }
        }
        let (p, n) = (Charge::Positive, Charge::Negative);
        game.current_piece = Some(Piece::with_charges(TetrominoType::I, 0, 0, [p, p, n, n]));

        game.process_action(Action::HardDrop);
        assert_eq!(game.state, GameState::Playing);
        let top: Vec<_> = game
            .logic
            .placed_blocks()
            .iter()
            .filter(|b| b.pos.row == 0)
            .collect();
        assert_eq!(top.len(), 4);
        assert!(top.iter().all(|b| b.is_wobbling()));

        game.update(WOBBLE_DURATION + 0.05);
        assert_eq!(game.state, GameState::Playing);
        assert!(game.logic.placed_blocks().iter().all(|b| b.pos.row > 0));
    }

    #[test]
    fn test_restart_clears_board_and_score() {
        let mut game = game();
        game.process_action(Action::HardDrop);
        game.score.points = 120;
        game.process_action(Action::Restart);

        assert!(game.logic.placed_blocks().is_empty());
        assert_eq!(game.score.points, 0);
        assert_eq!(game.state, GameState::Playing);
        assert!(game.current_piece.is_some());
    }
}
