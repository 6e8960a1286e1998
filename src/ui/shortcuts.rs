//! Keyboard shortcut constants for consistent documentation.

pub const NEXT_PANE: &str = "n";
pub const PREV_PANE: &str = "N";
pub const CURSOR_DOWN: &str = "j";
pub const CURSOR_UP: &str = "k";
pub const SAVE: &str = "s";
pub const QUIT: &str = "q/Esc";

// Status panes only
pub const DEMOTE: &str = "J";
pub const PROMOTE: &str = "K";
