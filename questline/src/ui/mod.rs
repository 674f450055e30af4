//! UI module for the quest TUI

pub mod render;
pub mod theme;
pub mod widgets;
