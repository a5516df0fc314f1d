//! Widget rendering a [`Grid`] to a ratatui buffer.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use super::events::Highlight;
use super::grid::Grid;

/// Default colours set by `update_fg` / `update_bg` / `update_sp`.
///
/// `None` means the terminal's own default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultColors {
    /// Default foreground.
    pub foreground: Option<u32>,
    /// Default background.
    pub background: Option<u32>,
    /// Default special colour.
    pub special: Option<u32>,
}

/// A widget that draws the editor grid.
pub struct GridWidget<'a> {
    grid: &'a Grid,
    defaults: DefaultColors,
}

impl std::fmt::Debug for GridWidget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridWidget")
            .field("size", &self.grid.size())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl<'a> GridWidget<'a> {
    /// Create a widget over `grid`.
    pub fn new(grid: &'a Grid) -> Self {
        Self {
            grid,
            defaults: DefaultColors::default(),
        }
    }

    /// Colours used where a cell's highlight leaves them unset.
    pub fn defaults(mut self, defaults: DefaultColors) -> Self {
        self.defaults = defaults;
        self
    }
}

impl Widget for GridWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (columns, rows) = self.grid.size();
        for row in 0..area.height.min(rows) {
            for col in 0..area.width.min(columns) {
                let Some(cell) = self.grid.cell(row, col) else {
                    continue;
                };
                let buf_cell = &mut buf[(area.x + col, area.y + row)];
                // Right half of a wide character: ratatui fills it itself.
                if !cell.text.is_empty() {
                    buf_cell.set_symbol(&cell.text);
                }
                buf_cell.set_style(style_for(&cell.highlight, self.defaults));
            }
        }
    }
}

/// Combine a cell's highlight with the default colours.
pub fn style_for(highlight: &Highlight, defaults: DefaultColors) -> Style {
    let mut style = Style::default()
        .fg(convert_color(highlight.foreground.or(defaults.foreground)))
        .bg(convert_color(highlight.background.or(defaults.background)));

    if highlight.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if highlight.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if highlight.underline || highlight.undercurl {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if highlight.reverse {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

/// `0xRRGGBB` → ratatui colour; `None` is the terminal default.
fn convert_color(color: Option<u32>) -> Color {
    match color {
        None => Color::Reset,
        Some(rgb) => {
            let [_, r, g, b] = rgb.to_be_bytes();
            Color::Rgb(r, g, b)
        }
    }
}
