//! Synchronous marker state owned by the controller task.

/// Handles, overlay bindings, selection, and the creation guard.
pub mod state;
