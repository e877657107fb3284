use hashbrown::{HashMap, HashSet};

use crate::types::{LatLng, MarkerId, OverlayId};

/// Rejected state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A handle with this id is already bound.
    #[error("marker already held: {0}")]
    DuplicateMarker(MarkerId),
    /// The overlay is not waiting on an insert.
    #[error("overlay has no pending marker: {0}")]
    UnknownOverlay(OverlayId),
}

/// Why a map click does not create a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationBlocked {
    /// No surface has been handed over yet.
    MapNotReady,
    /// Creation stays disabled while any marker is selected.
    MarkerSelected,
}

/// In-memory binding between a stored record and its rendered overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHandle {
    /// Store-assigned id.
    pub id: MarkerId,
    /// Overlay drawn for the record.
    pub overlay: OverlayId,
    /// Location as last known to be stored.
    pub location: LatLng,
    /// True for markers whose drag ends are reported back to the controller.
    pub reports_drag: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum OverlayBinding {
    /// Rendered optimistically, insert not yet confirmed.
    Pending { location: LatLng },
    Durable { id: MarkerId },
}

/// Every handle the controller holds, plus the selection and readiness flag.
///
/// Handles keep insertion order. `pos` maps an id to its index in `handles`.
#[derive(Debug, Default)]
pub struct MarkerState {
    map_ready: bool,
    handles: Vec<MarkerHandle>,
    pos: HashMap<MarkerId, usize>,
    overlays: HashMap<OverlayId, OverlayBinding>,
    selected: Option<MarkerId>,
}

impl MarkerState {
    /// Empty state with the map not ready.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the surface as mounted.
    pub fn set_map_ready(&mut self) {
        self.map_ready = true;
    }

    /// True once a surface has been mounted.
    pub fn is_map_ready(&self) -> bool {
        self.map_ready
    }

    /// Why a map click would not create a marker right now, if it would not.
    pub fn creation_blocked(&self) -> Option<CreationBlocked> {
        if !self.map_ready {
            Some(CreationBlocked::MapNotReady)
        } else if self.selected.is_some() {
            Some(CreationBlocked::MarkerSelected)
        } else {
            None
        }
    }

    /// Held handles in insertion order.
    pub fn handles(&self) -> &[MarkerHandle] {
        &self.handles
    }

    /// Number of held handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True when no handle is held.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handle for `id`.
    pub fn get(&self, id: &str) -> Option<&MarkerHandle> {
        self.pos.get(id).and_then(|idx| self.handles.get(*idx))
    }

    /// True when `id` is held.
    pub fn contains(&self, id: &str) -> bool {
        self.pos.contains_key(id)
    }

    /// Held ids in insertion order.
    pub fn ids(&self) -> Vec<MarkerId> {
        self.handles.iter().map(|h| h.id.clone()).collect()
    }

    /// Currently selected marker.
    pub fn selected(&self) -> Option<&MarkerId> {
        self.selected.as_ref()
    }

    /// Overlays rendered but not yet backed by a stored record.
    pub fn pending_overlays(&self) -> Vec<OverlayId> {
        self.overlays
            .iter()
            .filter(|(_, b)| matches!(b, OverlayBinding::Pending { .. }))
            .map(|(overlay, _)| *overlay)
            .collect()
    }

    /// Binds an already-stored record to a freshly rendered overlay.
    pub fn bind(&mut self, handle: MarkerHandle) -> Result<(), StateError> {
        if self.pos.contains_key(&handle.id) {
            return Err(StateError::DuplicateMarker(handle.id));
        }
        self.overlays.insert(
            handle.overlay,
            OverlayBinding::Durable {
                id: handle.id.clone(),
            },
        );
        self.pos.insert(handle.id.clone(), self.handles.len());
        self.handles.push(handle);
        Ok(())
    }

    /// Tracks an overlay drawn ahead of its insert.
    pub fn begin_pending(&mut self, overlay: OverlayId, location: LatLng) {
        self.overlays
            .insert(overlay, OverlayBinding::Pending { location });
    }

    /// Promotes a pending overlay to a durable, drag-reporting handle.
    pub fn confirm_pending(&mut self, overlay: OverlayId, id: MarkerId) -> Result<&MarkerHandle, StateError> {
        let Some(OverlayBinding::Pending { location }) = self.overlays.get(&overlay).cloned() else {
            return Err(StateError::UnknownOverlay(overlay));
        };
        if self.pos.contains_key(&id) {
            return Err(StateError::DuplicateMarker(id));
        }
        self.bind(MarkerHandle {
            id,
            overlay,
            location,
            reports_drag: true,
        })?;
        Ok(&self.handles[self.handles.len() - 1])
    }

    /// Forgets a pending overlay whose insert failed.
    pub fn abandon_pending(&mut self, overlay: OverlayId) -> Option<LatLng> {
        match self.overlays.get(&overlay) {
            Some(OverlayBinding::Pending { location }) => {
                let location = *location;
                self.overlays.remove(&overlay);
                Some(location)
            }
            _ => None,
        }
    }

    /// Marker owning `overlay`, only once its record is confirmed.
    pub fn marker_for_overlay(&self, overlay: OverlayId) -> Option<&MarkerId> {
        match self.overlays.get(&overlay) {
            Some(OverlayBinding::Durable { id }) => Some(id),
            _ => None,
        }
    }

    /// Handle whose drag ends are reported for `overlay`.
    pub fn drag_target(&self, overlay: OverlayId) -> Option<&MarkerHandle> {
        self.marker_for_overlay(overlay)
            .and_then(|id| self.get(id))
            .filter(|h| h.reports_drag)
    }

    /// Selects a held marker. Returns false for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    /// Selects the marker bound to `overlay`. Pending overlays select nothing.
    pub fn select_overlay(&mut self, overlay: OverlayId) -> Option<MarkerId> {
        let id = self.marker_for_overlay(overlay)?.clone();
        self.selected = Some(id.clone());
        Some(id)
    }

    /// Clears the selection, returning what was selected.
    pub fn clear_selection(&mut self) -> Option<MarkerId> {
        self.selected.take()
    }

    /// Drops a handle and its overlay binding, clearing the selection if it pointed here.
    pub fn remove(&mut self, id: &str) -> Option<MarkerHandle> {
        let idx = self.pos.remove(id)?;
        let handle = self.handles.remove(idx);
        for (i, h) in self.handles.iter().enumerate().skip(idx) {
            self.pos.insert(h.id.clone(), i);
        }
        self.overlays.remove(&handle.overlay);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Some(handle)
    }

    /// Removes every handle whose id is not in `keep`.
    pub fn retain_ids(&mut self, keep: &HashSet<MarkerId>) -> Vec<MarkerHandle> {
        let stale: Vec<MarkerId> = self
            .handles
            .iter()
            .filter(|h| !keep.contains(&h.id))
            .map(|h| h.id.clone())
            .collect();
        stale.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Drops every durable handle and the selection. Pending overlays stay tracked.
    pub fn clear(&mut self) -> Vec<MarkerHandle> {
        self.pos.clear();
        self.selected = None;
        self.overlays
            .retain(|_, b| matches!(b, OverlayBinding::Pending { .. }));
        std::mem::take(&mut self.handles)
    }
}
