//! Terminal UI rendering with ratatui

use crate::block::{Block as Cell, Charge};
use crate::effects::{Effects, Particle, ParticleKind};
use crate::game::{Game, GameState};
use crate::geometry::GridPos;
use crate::logic::BlockTransform;
use crate::piece::Piece;
use crate::settings::Settings;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Terminal columns per board cell: left edge, glyph, right edge
const CELL_WIDTH: u16 = 3;

/// Board(12*3 + 2) + side panel(18)
const GAME_WIDTH: u16 = 56;
/// Board(20) + 2 for borders
const GAME_HEIGHT: u16 = 22;
const SIDE_WIDTH: u16 = 18;

/// One board cell as it will be drawn
#[derive(Debug, Clone, Copy, PartialEq)]
struct CellView {
    glyph: char,
    style: Style,
    /// Draw without the block edges
    bare: bool,
}

impl CellView {
    const EMPTY: CellView = CellView {
        glyph: ' ',
        style: Style::new(),
        bare: true,
    };

    fn block(glyph: char, style: Style) -> Self {
        Self {
            glyph,
            style,
            bare: false,
        }
    }

    fn mark(glyph: char, style: Style) -> Self {
        Self {
            glyph,
            style,
            bare: true,
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

fn charge_color(charge: Charge) -> Color {
    match charge {
        Charge::Positive => Color::Red,
        Charge::Negative => Color::Cyan,
        Charge::Neutral => Color::Gray,
    }
}

/// Style for a placed block: wobbling blocks blink and storm blocks crackle.
/// A glyph can't be rotated or scaled, so a block in flight draws dim while
/// it is small and inverts on every other half turn of its spin.
fn placed_style(block: &Cell, transform: &BlockTransform) -> Style {
    let base = Style::default().fg(charge_color(block.charge)).bold();
    if let Some(wobble) = block.wobble {
        return if wobble.phase.sin() >= 0.0 {
            base.fg(Color::Yellow).add_modifier(Modifier::REVERSED)
        } else {
            base
        };
    }
    if let Some(storm) = block.storm {
        return if storm.spark_phase.sin() >= 0.0 {
            base.fg(Color::LightYellow)
        } else {
            base.fg(Color::LightBlue)
        };
    }
    if !block.is_arcing() {
        return base;
    }
    if transform.scale < 0.5 {
        base.remove_modifier(Modifier::BOLD).dim()
    } else if (transform.rotation / 180.0).floor() as i64 % 2 == 1 {
        base.add_modifier(Modifier::REVERSED)
    } else {
        base
    }
}

/// Build the grid of cells for the board, top row first
fn compose_board(game: &Game, particles: &[Particle], show_ghost: bool) -> Vec<Vec<CellView>> {
    let geometry = game.logic.geometry();
    let (cols, rows) = (geometry.columns(), geometry.rows());
    let mut grid = vec![vec![CellView::EMPTY; cols.max(0) as usize]; rows.max(0) as usize];

    let put = |grid: &mut Vec<Vec<CellView>>, pos: GridPos, view: CellView| {
        if geometry.contains(pos) {
            grid[pos.row as usize][pos.col as usize] = view;
        }
    };

    if show_ghost {
        if let (Some(ghost), Some(piece)) = (game.ghost_piece(), game.current_piece.as_ref()) {
            // Only worth drawing when it sits below the piece
            if ghost.row != piece.row {
                for (pos, charge) in ghost.cells().into_iter().zip(ghost.charges()) {
                    put(
                        &mut grid,
                        pos,
                        CellView::mark('.', Style::default().fg(charge_color(charge)).dim()),
                    );
                }
            }
        }
    }

    // Blocks in flight are drawn last so they pass over the stack
    let half = geometry.cell_size() / 2.0;
    let (arcing, placed): (Vec<&Cell>, Vec<&Cell>) =
        game.logic.placed_blocks().iter().partition(|b| b.is_arcing());
    for block in placed.into_iter().chain(arcing) {
        let transform = game.logic.block_transform(block);
        let pos = geometry.pixel_to_grid(transform.x + half, transform.y + half);
        put(
            &mut grid,
            pos,
            CellView::block(block.charge.symbol(), placed_style(block, &transform)),
        );
    }

    if let Some(piece) = &game.current_piece {
        for (pos, charge) in piece.cells().into_iter().zip(piece.charges()) {
            put(
                &mut grid,
                pos,
                CellView::block(charge.symbol(), Style::default().fg(charge_color(charge)).bold()),
            );
        }
    }

    for warning in game.logic.storm_warnings() {
        // Blink at 4Hz
        if (warning.warning_time * 8.0) as i64 % 2 != 0 {
            continue;
        }
        let pos = GridPos::new(warning.column, warning.top_row - 1);
        put(&mut grid, pos, CellView::mark('!', Style::default().fg(Color::LightYellow).bold()));
    }

    for particle in particles {
        let pos = geometry.pixel_to_grid(particle.x, particle.y);
        if !geometry.contains(pos) || !grid[pos.row as usize][pos.col as usize].is_empty() {
            continue;
        }
        let (glyph, color) = match particle.kind {
            ParticleKind::Spark(charge) => ('*', charge_color(charge)),
            ParticleKind::Dust => ('.', Color::DarkGray),
        };
        let mut style = Style::default().fg(color);
        if particle.fade() < 0.5 {
            style = style.dim();
        }
        put(&mut grid, pos, CellView::mark(glyph, style));
    }

    grid
}

/// Render the entire game UI
pub fn render_game(frame: &mut Frame, game: &Game, effects: &mut Effects, settings: &Settings) {
    let area = frame.area();
    let game_area = center_rect(area, GAME_WIDTH, GAME_HEIGHT);

    let main_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(GAME_WIDTH - SIDE_WIDTH),
            Constraint::Length(SIDE_WIDTH),
        ])
        .split(game_area);

    let (shake, particles) = if settings.visual.show_effects {
        let shake = shake_cells(effects.shake_offset(), game);
        (shake, effects.particles())
    } else {
        ((0, 0), &[][..])
    };

    let board_area = offset_rect(main_layout[0], shake, area);
    render_board(frame, board_area, game, particles, settings);

    let right_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Next piece
            Constraint::Min(10),   // Stats
        ])
        .split(main_layout[1]);

    render_next(frame, right_layout[0], &game.next_piece, settings);
    render_stats(frame, right_layout[1], game);

    match game.state {
        GameState::Paused => render_overlay(frame, area, "PAUSED", "Press P to resume"),
        GameState::GameOver => render_overlay(frame, area, "GAME OVER", "R restart  Q quit"),
        GameState::Playing => {}
    }
}

/// Pixel shake to whole terminal cells
fn shake_cells((dx, dy): (f64, f64), game: &Game) -> (i32, i32) {
    let cell = game.logic.geometry().cell_size();
    if cell <= 0.0 {
        return (0, 0);
    }
    let x = (dx / cell * CELL_WIDTH as f64).round() as i32;
    let y = (dy / cell).round() as i32;
    (x, y)
}

/// Shift a rect, keeping it inside `bounds`
fn offset_rect(rect: Rect, (dx, dy): (i32, i32), bounds: Rect) -> Rect {
    let max_x = (bounds.x + bounds.width).saturating_sub(rect.width) as i32;
    let max_y = (bounds.y + bounds.height).saturating_sub(rect.height) as i32;
    Rect {
        x: (rect.x as i32 + dx).clamp(bounds.x as i32, max_x.max(bounds.x as i32)) as u16,
        y: (rect.y as i32 + dy).clamp(bounds.y as i32, max_y.max(bounds.y as i32)) as u16,
        ..rect
    }
}

/// Center a rect within another rect
fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn cell_spans(view: &CellView, edges: (&'static str, &'static str)) -> [Span<'static>; 3] {
    let (left, right) = if view.bare { (" ", " ") } else { edges };
    [
        Span::styled(left, view.style),
        Span::styled(view.glyph.to_string(), view.style),
        Span::styled(right, view.style),
    ]
}

/// Render the game board
fn render_board(frame: &mut Frame, area: Rect, game: &Game, particles: &[Particle], settings: &Settings) {
    let edges = settings.visual.block_chars();

    let title = format!(" UN-ION · {} ", game.logic.mode().name());
    let block = Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = compose_board(game, particles, settings.visual.show_ghost)
        .iter()
        .map(|row| Line::from(row.iter().flat_map(|view| cell_spans(view, edges)).collect::<Vec<_>>()))
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render the upcoming piece with its charges
fn render_next(frame: &mut Frame, area: Rect, piece: &Piece, settings: &Settings) {
    let block = Block::default()
        .title(" NEXT ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let edges = settings.visual.block_chars();
    let mut grid = [[CellView::EMPTY; 4]; 4];
    for ((col, row), charge) in piece.normalized_offsets().into_iter().zip(piece.charges()) {
        if (0..4).contains(&col) && (0..4).contains(&row) {
            grid[row as usize][col as usize] =
                CellView::block(charge.symbol(), Style::default().fg(charge_color(charge)).bold());
        }
    }

    let lines: Vec<Line> = grid
        .iter()
        .filter(|row| row.iter().any(|v| !v.is_empty()))
        .map(|row| Line::from(row.iter().flat_map(|view| cell_spans(view, edges)).collect::<Vec<_>>()))
        .collect();

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn stat(lines: &mut Vec<Line<'static>>, label: &'static str, value: String, color: Color) {
    lines.push(Line::from(Span::styled(label, Style::default().fg(Color::Gray))));
    lines.push(Line::from(Span::styled(value, Style::default().fg(color).bold())));
}

/// Render stats panel
fn render_stats(frame: &mut Frame, area: Rect, game: &Game) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let score = &game.score;
    let mut lines = Vec::new();
    stat(&mut lines, "SCORE", score.points.to_string(), Color::Yellow);
    stat(&mut lines, "CLEARED", score.blocks_cleared.to_string(), Color::Cyan);
    stat(&mut lines, "REACTIONS", score.reactions.to_string(), Color::Cyan);
    stat(&mut lines, "BEST", score.largest_reaction.to_string(), Color::Magenta);

    let storms: Vec<_> = game.logic.storms().storms().filter(|s| s.active).collect();
    if !storms.is_empty() {
        let next_drop = storms
            .iter()
            .map(|s| s.time_remaining())
            .fold(f64::INFINITY, f64::min);
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            format!("STORMS {}", storms.len()),
            Style::default().fg(Color::LightYellow).bold(),
        )));
        lines.push(Line::from(Span::styled(
            format!("DROP IN {:.1}s", next_drop),
            Style::default().fg(Color::LightYellow),
        )));
    }

    if let Some(action) = &game.last_action {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(action.clone(), Style::default().fg(Color::Green))));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render an overlay (for pause/game over)
fn render_overlay(frame: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let popup_area = center_rect(area, 24, 5);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = vec![
        Line::styled(title, Style::default().fg(Color::Yellow).bold()),
        Line::raw(""),
        Line::styled(subtitle, Style::default().fg(Color::Gray)),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}
