//! Terminal front end for the board.

pub mod components;
pub mod shortcuts;
pub mod tui;
