//! Board colors. Styling is limited to pane focus and the selected row.

use ratatui::style::{Color, Modifier, Style};

pub mod colors {
    use ratatui::style::Color;

    /// Border color - subtle separators
    pub const BORDER: Color = Color::Rgb(59, 66, 97); // #3b4261

    /// Border accent - focused pane
    pub const BORDER_FOCUS: Color = Color::Rgb(125, 145, 200); // #7d91c8

    /// Primary text
    pub const TEXT_PRIMARY: Color = Color::Rgb(192, 202, 245); // #c0caf5

    /// Muted text - hints, empty panes, footer legend
    pub const TEXT_MUTED: Color = Color::Rgb(105, 114, 158); // #696e9e

    /// Primary accent - pane titles
    pub const ACCENT_PRIMARY: Color = Color::Rgb(122, 162, 247); // #7aa2f7

    pub const STATUS_ERROR: Color = Color::Rgb(247, 118, 142); // #f7768e
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemePalette {
    pub accent: Color,
    pub fg: Color,
    pub hint: Color,
    pub border: Color,
    pub border_focus: Color,
    pub selection_fg: Color,
    pub selection_bg: Color,
    pub error: Color,
}

impl ThemePalette {
    pub fn dark() -> Self {
        Self {
            accent: colors::ACCENT_PRIMARY,
            fg: colors::TEXT_PRIMARY,
            hint: colors::TEXT_MUTED,
            border: colors::BORDER,
            border_focus: colors::BORDER_FOCUS,
            selection_fg: Color::Black,
            selection_bg: Color::White,
            error: colors::STATUS_ERROR,
        }
    }

    /// Title style - accent colored with bold modifier
    pub fn title(self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn hint_style(self) -> Style {
        Style::default().fg(self.hint)
    }

    pub fn border_style(self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.border_focus)
        } else {
            Style::default().fg(self.border)
        }
    }

    /// Row under the cursor of the focused pane.
    pub fn selection(self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    pub fn row(self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn error_style(self) -> Style {
        Style::default().fg(self.error)
    }
}

impl Default for ThemePalette {
    fn default() -> Self {
        Self::dark()
    }
}
