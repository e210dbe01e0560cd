//! uvm TUI.
//!
//! The wizard state machine, its phase handlers and the ratatui front end.

pub mod input;
pub mod keymap;
pub mod widgets;
pub mod wizard;
