//! UI layer: presentation only.
//!
//! Widgets are functions of the service snapshots passed in; they emit
//! actions for the root composition and never touch the network. A
//! failure surfaced in one widget never blocks another.

pub mod history_grid;
pub mod stats_tiles;
pub mod stream_view;
