use frame_timeline_protocol::{GuideBarStyle, Renderer};
use ratatui::{buffer::Buffer, layout::Rect, style::Color};

const PALETTE: [Color; 8] = [
    Color::Rgb(86, 156, 214),
    Color::Rgb(220, 160, 80),
    Color::Rgb(106, 190, 120),
    Color::Rgb(200, 100, 100),
    Color::Rgb(170, 130, 210),
    Color::Rgb(90, 180, 180),
    Color::Rgb(210, 190, 90),
    Color::Rgb(160, 160, 160),
];

/// Background for a collector's bars. Whole-frame bars get a muted color
/// so nested collectors stand out against them.
fn collector_color(collector_index: usize) -> Color {
    if collector_index == 0 {
        Color::Rgb(60, 60, 70)
    } else {
        PALETTE[(collector_index - 1) % PALETTE.len()]
    }
}

fn guide_color(style: GuideBarStyle) -> Color {
    match style {
        GuideBarStyle::Normal => Color::DarkGray,
        GuideBarStyle::Frame => Color::Gray,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Reset,
            bg: Color::Reset,
        }
    }
}

/// A [`Renderer`] that rasterizes bars onto a grid of terminal cells, one
/// column per pixel and one line per timeline row.
///
/// The grid persists between redraws, so partial updates from
/// `new_data` land on top of the last full redraw.
#[derive(Debug, Default)]
pub struct TuiRenderer {
    width: usize,
    rows: Vec<Vec<Cell>>,
    guides: Vec<Option<GuideBarStyle>>,
}

impl TuiRenderer {
    pub fn new(width: u16) -> Self {
        let mut renderer = Self::default();
        renderer.resize(width);
        renderer
    }

    pub fn resize(&mut self, width: u16) {
        self.width = usize::from(width);
        self.rows.clear();
        self.guides = vec![None; self.width];
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn row_mut(&mut self, row: usize) -> &mut Vec<Cell> {
        if row >= self.rows.len() {
            let width = self.width;
            self.rows.resize_with(row + 1, || vec![Cell::default(); width]);
        }
        &mut self.rows[row]
    }

    fn cell(&self, row: usize, x: usize) -> Cell {
        let cell = self
            .rows
            .get(row)
            .and_then(|r| r.get(x))
            .copied()
            .unwrap_or_default();
        if cell != Cell::default() {
            return cell;
        }
        match self.guides.get(x).copied().flatten() {
            Some(style) => Cell {
                ch: '│',
                fg: guide_color(style),
                bg: Color::Reset,
            },
            None => cell,
        }
    }

    /// Copy the grid into `buf`, starting at timeline row `first_row`.
    pub fn paint(&self, buf: &mut Buffer, area: Rect, first_row: usize) {
        for dy in 0..area.height {
            let row = first_row + usize::from(dy);
            for dx in 0..area.width {
                let cell = self.cell(row, usize::from(dx));
                buf[(area.x + dx, area.y + dy)]
                    .set_char(cell.ch)
                    .set_fg(cell.fg)
                    .set_bg(cell.bg);
            }
        }
    }
}

impl Renderer for TuiRenderer {
    fn clear(&mut self) {
        self.rows.clear();
        self.guides.fill(None);
    }

    fn draw_bar(&mut self, row: usize, from_x: i32, to_x: i32, collector_index: usize, label: &str) {
        let width = self.width;
        let from = usize::try_from(from_x.max(0)).unwrap_or(0);
        let to = usize::try_from(to_x.max(0)).unwrap_or(0).min(width);
        if from >= to {
            return;
        }
        let bg = collector_color(collector_index);
        let cells = &mut self.row_mut(row)[from..to];
        for cell in cells.iter_mut() {
            *cell = Cell {
                ch: ' ',
                fg: Color::Black,
                bg,
            };
        }
        // Leave one blank column on the left; skip labels that would not fit.
        if label.chars().count() + 1 < cells.len() {
            for (cell, ch) in cells[1..].iter_mut().zip(label.chars()) {
                cell.ch = ch;
            }
        }
    }

    fn draw_guide_bar(&mut self, x: i32, style: GuideBarStyle) {
        if let Some(slot) = usize::try_from(x).ok().and_then(|x| self.guides.get_mut(x)) {
            *slot = Some(style);
        }
    }

    fn draw_separator(&mut self, row: usize) {
        for cell in self.row_mut(row).iter_mut() {
            *cell = Cell {
                ch: '─',
                fg: Color::DarkGray,
                bg: Color::Reset,
            };
        }
    }
}
