//! Single-writer marker controller and its event stream.

/// Handle and command loop implementation.
pub mod controller;
/// Event stream types emitted by the controller.
pub mod events;
