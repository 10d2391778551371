//! Board geometry: grid dimensions and grid/pixel conversions
//!
//! The board is designed as 12 cells wide by 20 cells tall. Whatever pixel
//! size the presentation layer gives it, the cell size is chosen so that the
//! design ratio is preserved and every conversion derives from that one value.

/// Design width of the board in cells
pub const DESIGN_COLUMNS: f64 = 12.0;
/// Design height of the board in cells
pub const DESIGN_ROWS: f64 = 20.0;

/// Pixel size the board was originally laid out for (16px cells)
pub const BASE_WIDTH_PX: f64 = 192.0;
pub const BASE_HEIGHT_PX: f64 = 320.0;

/// A cell coordinate. Origin is top-left, row grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridPos {
    pub col: i32,
    pub row: i32,
}

impl GridPos {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn offset(self, d_col: i32, d_row: i32) -> Self {
        Self::new(self.col + d_col, self.row + d_row)
    }
}

/// Fixed-size grid derived from the board's pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    cell_size: f64,
    columns: i32,
    rows: i32,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self::new(BASE_WIDTH_PX, BASE_HEIGHT_PX)
    }
}

impl BoardGeometry {
    /// Compute the grid for a board of the given pixel size
    pub fn new(width_px: f64, height_px: f64) -> Self {
        let cell_size = cell_size_for(width_px, height_px);
        let (columns, rows) = if cell_size > 0.0 {
            (
                (width_px / cell_size) as i32,
                (height_px / cell_size) as i32,
            )
        } else {
            (0, 0)
        };

        Self {
            cell_size,
            columns,
            rows,
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Grid width in cells
    pub fn columns(&self) -> i32 {
        self.columns
    }

    /// Grid height in cells
    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Column where new pieces are anchored
    pub fn spawn_column(&self) -> i32 {
        self.columns / 2
    }

    /// True if the column is on the board and the row is not below it.
    /// Rows above the board (negative) are allowed while a piece spawns.
    pub fn accepts(&self, pos: GridPos) -> bool {
        pos.col >= 0 && pos.col < self.columns && pos.row < self.rows
    }

    /// True if the cell lies fully inside the grid
    pub fn contains(&self, pos: GridPos) -> bool {
        self.accepts(pos) && pos.row >= 0
    }

    /// Top-left pixel of a (possibly fractional) grid position
    pub fn grid_to_pixel(&self, col: f64, row: f64) -> (f64, f64) {
        (col * self.cell_size, row * self.cell_size)
    }

    /// Pixel centre of a cell
    pub fn cell_center(&self, pos: GridPos) -> (f64, f64) {
        let half = self.cell_size / 2.0;
        let (x, y) = self.grid_to_pixel(pos.col as f64, pos.row as f64);
        (x + half, y + half)
    }

    /// Cell containing a pixel coordinate
    pub fn pixel_to_grid(&self, x: f64, y: f64) -> GridPos {
        if self.cell_size <= 0.0 {
            return GridPos::default();
        }
        GridPos::new(
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }
}

/// Cell size preserving the 12x20 design ratio: min(width/12, height/20)
pub fn cell_size_for(width_px: f64, height_px: f64) -> f64 {
    (width_px / DESIGN_COLUMNS).min(height_px / DESIGN_ROWS)
}
