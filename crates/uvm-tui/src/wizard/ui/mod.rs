//! Ratatui rendering for the wizard.

mod content;
mod dump;
mod render;
mod sidebar;

pub use dump::dump_phase;
pub use render::draw;
