//! Rules engine
//!
//! `GameLogic` owns the placed blocks and the storm timers and advances them
//! once per frame. The pieces in play belong to the caller; the engine only
//! answers questions about them and takes them over when they are placed.

use crate::arc;
use crate::block::{Block, Motion};
use crate::board::Board;
use crate::events::{EventSink, GameEvent};
use crate::geometry::BoardGeometry;
use crate::gravity;
use crate::piece::Piece;
use crate::randomizer::Randomizer;
use crate::reaction::{self, ReactionMode, ReactionPass};
use crate::score::score_for;
use crate::storm::{self, StormField, StormWarning};
use crate::tetromino::TetrominoType;

/// Share of a cell a wobbling block shakes sideways
const WOBBLE_AMPLITUDE: f64 = 0.1;

/// What happened during one `update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Reactions found after blocks settled
    pub reaction: ReactionPass,
    /// Blocks removed from the board
    pub removed: usize,
    /// A falling block landed
    pub landed: bool,
    /// A storm block finished its flight
    pub arcs_finished: bool,
    /// Neutral blocks thrown by storms
    pub ejected: usize,
}

/// Where and how to draw a block, in board pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTransform {
    /// Top-left corner
    pub x: f64,
    pub y: f64,
    /// Degrees
    pub rotation: f64,
    pub scale: f64,
}

pub struct GameLogic {
    board: Board,
    storms: StormField,
    rng: Randomizer,
    mode: ReactionMode,
    events: Box<dyn EventSink>,
}

impl GameLogic {
    pub fn new(
        geometry: BoardGeometry,
        mode: ReactionMode,
        rng: Randomizer,
        events: Box<dyn EventSink>,
    ) -> Self {
        tracing::debug!(
            "Rules engine ready: {}x{} cells, {} reactions",
            geometry.columns(),
            geometry.rows(),
            mode.name()
        );
        Self {
            board: Board::new(geometry),
            storms: StormField::new(),
            rng,
            mode,
            events,
        }
    }

    pub fn geometry(&self) -> &BoardGeometry {
        self.board.geometry()
    }

    pub fn mode(&self) -> ReactionMode {
        self.mode
    }

    pub fn placed_blocks(&self) -> &[Block] {
        self.board.blocks()
    }

    pub fn storms(&self) -> &StormField {
        &self.storms
    }

    /// Empty the board for a new game
    pub fn reset(&mut self) {
        self.board.clear();
        self.storms.clear();
        tracing::debug!("Board reset");
    }

    // --- pieces ---

    pub fn random_kind(&mut self) -> TetrominoType {
        self.rng.next_kind()
    }

    /// New piece with random charges at the centre column, row 0
    pub fn spawn_new_piece(&mut self, kind: TetrominoType) -> Piece {
        let col = self.board.geometry().spawn_column();
        Piece::new(kind, col, 0, &mut self.rng)
    }

    pub fn is_valid_position(&self, piece: &Piece, d_col: i32, d_row: i32) -> bool {
        self.board.is_valid_position(piece, d_col, d_row)
    }

    pub fn is_valid_position_ignoring_neutral(&self, piece: &Piece, d_col: i32, d_row: i32) -> bool {
        self.board.is_valid_position_ignoring_neutral(piece, d_col, d_row)
    }

    pub fn try_move_piece(&self, piece: &mut Piece, d_col: i32, d_row: i32) -> bool {
        self.board.try_move_piece(piece, d_col, d_row)
    }

    pub fn try_rotate_piece(&self, piece: &mut Piece) -> bool {
        self.board.try_rotate_piece(piece)
    }

    /// Where the piece would land; drawn as the drop shadow
    pub fn calculate_drop_position(&self, piece: &Piece) -> Piece {
        self.board.calculate_drop_position(piece)
    }

    /// Move the piece straight to its landing spot. Returns rows dropped.
    pub fn hard_drop_piece(&mut self, piece: &mut Piece) -> i32 {
        let landing = self.board.calculate_drop_position(piece);
        let height = landing.row - piece.row;
        piece.row = landing.row;
        self.events.emit(GameEvent::HardDrop { height });
        height
    }

    /// Remove resting neutral blocks under the piece's cells, as happens when a
    /// piece spawns into storm debris. Returns how many were absorbed.
    pub fn absorb_neutral_blocks(&mut self, piece: &Piece) -> usize {
        let cells = piece.cells();
        let doomed: Vec<usize> = self
            .board
            .blocks()
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_resting() && b.charge.is_neutral() && cells.contains(&b.pos))
            .map(|(index, _)| index)
            .collect();

        if doomed.is_empty() {
            return 0;
        }
        let removed = self.board.remove_indices(&doomed);
        for block in &removed {
            self.explode(block);
        }
        tracing::debug!("Piece absorbed {} neutral blocks", removed.len());
        removed.len()
    }

    /// Turn the piece into placed blocks.
    ///
    /// Neutral blocks in the way are absorbed. If a charged block has landed
    /// in the piece's cells, the piece is placed higher up instead.
    pub fn place_piece(&mut self, piece: &Piece) {
        self.absorb_neutral_blocks(piece);

        let mut placed = piece.clone();
        let floor = -self.board.height();
        while !self.is_valid_position(&placed, 0, 0) && placed.row > floor {
            placed.row -= 1;
        }
        if placed.row != piece.row {
            tracing::debug!("Piece lifted {} rows to avoid landed blocks", piece.row - placed.row);
        }

        let cells = placed.cells();
        for (pos, charge) in cells.iter().zip(placed.charges()) {
            self.board.insert(Block::new(*pos, charge));
        }

        let height = self.board.height();
        for pos in cells {
            let below = pos.offset(0, 1);
            let supported = below.row >= height
                || (self.board.is_occupied(below) && !cells.contains(&below));
            if supported {
                let (x, y) = self
                    .board
                    .geometry()
                    .grid_to_pixel(pos.col as f64 + 0.5, below.row as f64);
                self.events.emit(GameEvent::Dust { x, y });
            }
        }

        tracing::trace!("Placed {} at ({}, {})", placed.kind.name(), placed.col, placed.row);
    }

    /// True once a charged block rests on the top row or above it
    pub fn is_game_over(&self) -> bool {
        self.board.is_topped_out()
    }

    // --- reactions ---

    /// Resolve reactions the way the current mode does it
    pub fn check_reactions(&mut self) -> ReactionPass {
        match self.mode {
            ReactionMode::Telegraph => reaction::mark_reactions(&mut self.board),
            ReactionMode::Immediate => self.process_reactions(),
        }
    }

    /// Start matched blocks wobbling. Returns the score for the match.
    #[allow(dead_code)]
    pub fn check_for_new_reactions(&mut self) -> i32 {
        reaction::mark_reactions(&mut self.board).score
    }

    /// Remove matches on the spot and settle the board, until nothing matches.
    /// Returns the total score.
    #[allow(dead_code)]
    pub fn check_and_process_reactions(&mut self) -> i32 {
        self.process_reactions().score
    }

    fn process_reactions(&mut self) -> ReactionPass {
        let mut total = ReactionPass::default();
        loop {
            let matched = reaction::find_removable_blocks(&self.board);
            if matched.is_empty() {
                break;
            }
            let removed = self.remove_blocks(&matched);
            total.merge(ReactionPass {
                matched: matched.len(),
                score: score_for(matched.len()),
                removed,
            });
            gravity::settle_instantly(&mut self.board);
        }
        total
    }

    pub fn update_wobbling_blocks(&mut self, dt: f64) -> bool {
        reaction::update_wobbling_blocks(&mut self.board, dt)
    }

    /// Remove blocks whose wobble has run out. Returns how many went.
    pub fn remove_finished_wobbling_blocks(&mut self) -> usize {
        let finished = reaction::finished_wobbling(&self.board);
        self.remove_blocks(&finished)
    }

    fn remove_blocks(&mut self, indices: &[usize]) -> usize {
        if indices.is_empty() {
            return 0;
        }
        let removed = self.board.remove_indices(indices);
        for block in &removed {
            self.explode(block);
        }
        self.events.emit(GameEvent::BlocksRemoved {
            count: removed.len(),
        });
        tracing::debug!("Removed {} blocks", removed.len());
        removed.len()
    }

    fn explode(&mut self, block: &Block) {
        let (x, y) = self.board.geometry().cell_center(block.pos);
        self.events.emit(GameEvent::Explosion {
            x,
            y,
            charge: block.charge,
        });
    }

    // --- motion ---

    pub fn update_falling_blocks(&mut self, dt: f64) -> bool {
        gravity::update_falling_blocks(&mut self.board, dt)
    }

    pub fn update_arcing_blocks(&mut self, dt: f64) -> bool {
        arc::update_arcing_blocks(&mut self.board, dt)
    }

    /// Start falls for everything left hanging
    pub fn apply_gravity(&mut self) -> usize {
        gravity::apply_gravity(&mut self.board)
    }

    // --- storms ---

    /// Put qualifying stacks into a storm. Always returns 0; storms never score.
    pub fn check_for_electrical_storms(&mut self) -> i32 {
        let found = storm::find_vertical_electrical_storms(&self.board);
        storm::start_electrical_storm(&mut self.board, &found);
        0
    }

    pub fn clear_invalid_storms(&mut self) {
        storm::clear_invalid_storms(&mut self.board);
    }

    pub fn update_active_storms(&mut self) {
        self.storms.update_active_storms(&self.board, &mut self.rng);
    }

    pub fn update_electrical_storms(&mut self, dt: f64) {
        storm::update_electrical_storms(&mut self.board, dt);
    }

    /// Neutral blocks thrown this step, not yet on the board
    pub fn update_storm_timers(&mut self, dt: f64) -> Vec<Block> {
        self.storms
            .update_storm_timers(&self.board, dt, &mut self.rng)
    }

    pub fn add_neutral_block(&mut self, block: Block) {
        self.board.insert(block);
    }

    pub fn storm_warnings(&self) -> Vec<StormWarning> {
        self.storms.warnings(&self.board)
    }

    // --- tick ---

    /// Advance the board by `dt` seconds.
    ///
    /// Order matters: flights, then falls, then wobbles and removal, then
    /// storms, then storm drops, and only then a new reaction check, so no
    /// block is matched before it has come to rest.
    pub fn update(&mut self, dt: f64) -> TickReport {
        let mut report = TickReport::default();

        report.arcs_finished = self.update_arcing_blocks(dt);
        if report.arcs_finished {
            self.apply_gravity();
        }

        report.landed = self.update_falling_blocks(dt);
        if report.landed {
            self.apply_gravity();
        }

        if self.update_wobbling_blocks(dt) {
            report.removed = self.remove_finished_wobbling_blocks();
            if report.removed > 0 {
                self.apply_gravity();
            }
        }

        self.check_for_electrical_storms();
        self.clear_invalid_storms();
        self.update_active_storms();
        self.update_electrical_storms(dt);

        let thrown = self.update_storm_timers(dt);
        report.ejected = thrown.len();
        for block in thrown {
            self.add_neutral_block(block);
        }

        if report.arcs_finished || report.landed || report.removed > 0 {
            report.reaction = self.check_reactions();
            report.removed += report.reaction.removed;
        }

        report
    }

    // --- render queries ---

    /// Fractional (col, row) a block should be drawn at
    pub fn block_render_position(&self, block: &Block) -> (f64, f64) {
        let col = block.pos.col as f64;
        match block.motion {
            Motion::Resting => (col, block.pos.row as f64),
            Motion::Falling(fall) => (col, fall.current_row()),
            Motion::Arcing(flight) => flight.position(),
        }
    }

    /// Pixel placement of a block including wobble shake, spin and scale
    pub fn block_transform(&self, block: &Block) -> BlockTransform {
        let (col, row) = self.block_render_position(block);
        let (mut x, y) = self.board.geometry().grid_to_pixel(col, row);

        if let Some(wobble) = block.wobble {
            x += wobble.phase.sin() * WOBBLE_AMPLITUDE * self.board.geometry().cell_size();
        }

        let (rotation, scale) = match block.motion {
            Motion::Arcing(flight) => (flight.rotation, flight.scale),
            _ => (0.0, 1.0),
        };

        BlockTransform {
            x,
            y,
            rotation,
            scale,
        }
    }

    /// Drop shadow for the piece
    pub fn ghost_piece(&self, piece: &Piece) -> Piece {
        self.calculate_drop_position(piece)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Charge;
    use crate::geometry::GridPos;
    use std::collections::HashSet;
    use std::sync::mpsc::{self, Receiver};

    use crate::block::Charge::{Negative as N, Neutral as O, Positive as P};

    fn logic(mode: ReactionMode) -> (GameLogic, Receiver<GameEvent>) {
        let (tx, rx) = mpsc::channel();
        let logic = GameLogic::new(
            BoardGeometry::default(),
            mode,
            Randomizer::with_seed(11),
            Box::new(tx),
        );
        (logic, rx)
    }

    fn put(logic: &mut GameLogic, col: i32, row: i32, charge: Charge) {
        logic.board.insert(Block::new(GridPos::new(col, row), charge));
    }

    fn drain(rx: &Receiver<GameEvent>) -> Vec<GameEvent> {
        rx.try_iter().collect()
    }

    /// Run the engine for `seconds` in small steps, summing the reports
    fn run(logic: &mut GameLogic, seconds: f64) -> TickReport {
        let mut total = TickReport::default();
        let steps = (seconds / 0.05).round() as usize;
        for _ in 0..steps {
            let report = logic.update(0.05);
            total.reaction.merge(report.reaction);
            total.removed += report.removed;
            total.landed |= report.landed;
            total.arcs_finished |= report.arcs_finished;
            total.ejected += report.ejected;
        }
        total
    }

    #[test]
    fn test_spawn_at_centre_top() {
        let (mut logic, _rx) = logic(ReactionMode::Telegraph);
        let piece = logic.spawn_new_piece(TetrominoType::T);
        assert_eq!((piece.col, piece.row), (6, 0));
        assert!(logic.is_valid_position(&piece, 0, 0));
    }

    #[test]
    fn test_horizontal_i_reaction_wobbles_then_clears() {
        let (mut logic, rx) = logic(ReactionMode::Telegraph);
        let mut piece = Piece::with_charges(TetrominoType::I, 4, 0, [P, P, N, N]);

        let height = logic.hard_drop_piece(&mut piece);
        assert_eq!(height, 19);
        logic.place_piece(&piece);

        let pass = logic.check_reactions();
        assert_eq!(pass.matched, 4);
        assert_eq!(pass.score, 10);
        assert!(logic.placed_blocks().iter().all(|b| b.is_wobbling()));

        let report = run(&mut logic, 1.0);
        assert_eq!(report.removed, 4);
        assert!(logic.placed_blocks().is_empty());

        let events = drain(&rx);
        assert_eq!(events[0], GameEvent::HardDrop { height: 19 });
        let dust = events.iter().filter(|e| matches!(e, GameEvent::Dust { .. })).count();
        assert_eq!(dust, 4);
        let explosions = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Explosion { .. }))
            .count();
        assert_eq!(explosions, 4);
        assert!(events.contains(&GameEvent::BlocksRemoved { count: 4 }));
    }

    #[test]
    fn test_immediate_mode_clears_on_the_spot() {
        let (mut logic, rx) = logic(ReactionMode::Immediate);
        let mut piece = Piece::with_charges(TetrominoType::I, 0, 0, [P, N, P, N]);
        logic.hard_drop_piece(&mut piece);
        logic.place_piece(&piece);

        let pass = logic.check_reactions();
        assert_eq!((pass.matched, pass.score, pass.removed), (4, 10, 4));
        assert!(logic.placed_blocks().is_empty());
        assert!(drain(&rx).contains(&GameEvent::BlocksRemoved { count: 4 }));
    }

    #[test]
    fn test_immediate_mode_cascades() {
        let (mut logic, _rx) = logic(ReactionMode::Immediate);
        // Bottom row cancels; the pair above then drops beside two negatives
        for (col, charge) in [(0, P), (1, N), (2, P), (3, N), (4, N), (5, N)] {
            put(&mut logic, col, 19, charge);
        }
        put(&mut logic, 2, 18, P);
        put(&mut logic, 3, 18, P);

        assert_eq!(logic.check_and_process_reactions(), 20);
        assert!(logic.placed_blocks().is_empty());
    }

    #[test]
    fn test_telegraph_cascade_after_landing() {
        let (mut logic, _rx) = logic(ReactionMode::Telegraph);
        for (col, charge) in [(0, P), (1, N), (2, P), (3, N), (4, N), (5, N)] {
            put(&mut logic, col, 19, charge);
        }
        put(&mut logic, 2, 18, P);
        put(&mut logic, 3, 18, P);

        assert_eq!(logic.check_for_new_reactions(), 10);

        // Wobble, removal, a one-row fall, then the second match
        let report = run(&mut logic, 1.2);
        assert_eq!(report.removed, 4);
        assert!(report.landed);
        assert_eq!(report.reaction.matched, 4);
        assert_eq!(report.reaction.score, 10);
    }

    #[test]
    fn test_no_overlap_through_a_long_game() {
        let (tx, _rx) = mpsc::channel();
        let mut logic = GameLogic::new(
            BoardGeometry::default(),
            ReactionMode::Telegraph,
            Randomizer::with_seed(2024),
            Box::new(tx),
        );
        let mut steer = Randomizer::with_seed(99);

        for _ in 0..150 {
            let kind = logic.random_kind();
            let mut piece = logic.spawn_new_piece(kind);
            if !logic.is_valid_position_ignoring_neutral(&piece, 0, 0) {
                break;
            }
            logic.absorb_neutral_blocks(&piece);
            if steer.unit() < 0.5 {
                logic.try_rotate_piece(&mut piece);
            }
            let shift = steer.column(11) - 5;
            let step = shift.signum();
            for _ in 0..shift.abs() {
                logic.try_move_piece(&mut piece, step, 0);
            }
            logic.hard_drop_piece(&mut piece);
            logic.place_piece(&piece);
            logic.check_reactions();

            for _ in 0..20 {
                logic.update(0.05);
                let mut seen = HashSet::new();
                for block in logic.placed_blocks().iter().filter(|b| !b.is_arcing()) {
                    assert!(seen.insert(block.settled_pos()), "two blocks share {:?}", block.settled_pos());
                }
            }
            if logic.is_game_over() {
                break;
            }
        }
    }

    #[test]
    fn test_game_over_ignores_neutral_top_row() {
        let (mut logic, _rx) = logic(ReactionMode::Telegraph);
        put(&mut logic, 6, 0, O);
        assert!(!logic.is_game_over());

        let piece = logic.spawn_new_piece(TetrominoType::O);
        assert!(!logic.is_valid_position(&piece, 0, 0));
        assert!(logic.is_valid_position_ignoring_neutral(&piece, 0, 0));

        assert_eq!(logic.absorb_neutral_blocks(&piece), 1);
        assert!(logic.is_valid_position(&piece, 0, 0));

        put(&mut logic, 0, 0, P);
        assert!(logic.is_game_over());
    }

    #[test]
    fn test_place_lifts_piece_over_landed_block() {
        let (mut logic, _rx) = logic(ReactionMode::Telegraph);
        let piece = Piece::with_charges(TetrominoType::O, 2, 18, [P, P, P, P]);
        put(&mut logic, 2, 19, N);
        logic.place_piece(&piece);

        let mut seen = HashSet::new();
        for block in logic.placed_blocks() {
            assert!(seen.insert(block.pos));
        }
        assert_eq!(logic.placed_blocks().len(), 5);
    }

    #[test]
    fn test_storm_forms_and_throws_blocks() {
        let (mut logic, _rx) = logic(ReactionMode::Telegraph);
        for row in 16..20 {
            put(&mut logic, 0, row, N);
        }

        logic.update(0.01);
        assert!(logic.placed_blocks().iter().all(|b| b.is_in_storm()));
        assert!(logic.storms().storms().any(|s| s.column == 0));

        // Delays never exceed five seconds
        let report = run(&mut logic, 5.0);
        assert!(report.ejected >= 1);
        assert!(logic.placed_blocks().iter().any(|b| b.charge == O));
    }

    #[test]
    fn test_storm_warning_before_drop() {
        let (mut logic, _rx) = logic(ReactionMode::Telegraph);
        for row in 16..20 {
            put(&mut logic, 9, row, P);
        }
        logic.update(0.01);
        assert!(logic.storm_warnings().is_empty());

        let next_drop = logic
            .storms()
            .storms()
            .find(|s| s.column == 9)
            .map(|s| s.next_drop).unwrap_or_default();
        logic.update(next_drop - 0.5);
        let warnings = logic.storm_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].top_row, 16);
    }

    #[test]
    fn test_render_queries_follow_motion() {
        let (mut logic, _rx) = logic(ReactionMode::Telegraph);
        put(&mut logic, 3, 11, P);
        logic.apply_gravity();
        logic.update_falling_blocks(0.5);

        let block = logic.placed_blocks()[0];
        assert_eq!(logic.block_render_position(&block), (3.0, 13.0));
        assert_eq!(block.settled_pos(), GridPos::new(3, 19));

        let transform = logic.block_transform(&block);
        assert_eq!((transform.x, transform.y), (48.0, 208.0));
        assert_eq!((transform.rotation, transform.scale), (0.0, 1.0));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut logic, _rx) = logic(ReactionMode::Telegraph);
        for row in 16..20 {
            put(&mut logic, 2, row, P);
        }
        logic.update(0.01);
        logic.reset();
        assert!(logic.placed_blocks().is_empty());
        assert!(logic.storms().storms().next().is_none());
    }
}
