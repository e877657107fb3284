//! Controller event stream payloads.

use crate::types::{LatLng, MarkerId};

/// Events emitted from the controller loop.
///
/// Failure variants carry the error text so a page shell can show it and
/// offer a retry.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerEvent {
    /// Store contents were rendered.
    Loaded {
        /// Handles held after reconciling.
        held: usize,
        /// Records skipped for a missing or malformed location.
        skipped: usize,
    },
    /// Fetching the collection failed. Current state is unchanged.
    LoadFailed {
        /// Error text.
        reason: String,
    },
    /// A clicked position was stored and bound to its overlay.
    Created {
        /// New marker id.
        id: MarkerId,
        /// Stored position.
        position: LatLng,
    },
    /// Storing a clicked position failed and its overlay was removed.
    CreateFailed {
        /// Position to retry.
        position: LatLng,
        /// Error text.
        reason: String,
    },
    /// A marker became the selection.
    Selected {
        /// Selected marker id.
        id: MarkerId,
    },
    /// The selection was cleared.
    SelectionCleared,
    /// A dragged marker was dropped. The stored location is not changed.
    PinDropped {
        /// Dragged marker id.
        id: MarkerId,
        /// Position the overlay was dropped at.
        position: LatLng,
    },
    /// A selected marker was deleted from the store.
    Deleted {
        /// Deleted marker id.
        id: MarkerId,
    },
    /// Deleting the selected marker failed and it was restored.
    DeleteFailed {
        /// Marker id that is still stored.
        id: MarkerId,
        /// Error text.
        reason: String,
    },
    /// Every stored marker was deleted in one batch.
    AllDeleted {
        /// Number of records deleted.
        count: usize,
    },
    /// The batch delete failed. Nothing was cleared.
    DeleteAllFailed {
        /// Error text.
        reason: String,
    },
}
