use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    config::SurfaceConfig,
    types::{LatLng, OverlayId},
};

use super::{MapError, MapProvider, MapResult, MapSurface, OverlaySpec};

/// Overlay as currently drawn on a [`RecordingSurface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedOverlay {
    /// Current position.
    pub position: LatLng,
    /// Drawn as draggable.
    pub draggable: bool,
}

/// Info display opened on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub struct InfoWindow {
    /// Anchor position.
    pub position: LatLng,
    /// Text shown.
    pub content: String,
}

#[derive(Debug, Default)]
struct SurfaceLog {
    next_overlay: OverlayId,
    overlays: BTreeMap<OverlayId, RecordedOverlay>,
    detached: Vec<OverlayId>,
    info: Vec<InfoWindow>,
}

/// Surface that keeps overlays in memory.
///
/// Clones share state, so a caller can hand one clone to the controller and
/// inspect or drag overlays through another.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overlays currently attached, in creation order.
    pub fn overlays(&self) -> Vec<(OverlayId, RecordedOverlay)> {
        self.lock()
            .overlays
            .iter()
            .map(|(id, o)| (*id, *o))
            .collect()
    }

    /// Overlay by id, if still attached.
    pub fn overlay(&self, overlay: OverlayId) -> Option<RecordedOverlay> {
        self.lock().overlays.get(&overlay).copied()
    }

    /// Number of attached overlays.
    pub fn overlay_count(&self) -> usize {
        self.lock().overlays.len()
    }

    /// Overlay ids detached so far, in detach order.
    pub fn detached(&self) -> Vec<OverlayId> {
        self.lock().detached.clone()
    }

    /// Info displays opened so far.
    pub fn info_windows(&self) -> Vec<InfoWindow> {
        self.lock().info.clone()
    }

    /// Moves a draggable overlay the way a user drag would.
    pub fn drag_to(&self, overlay: OverlayId, position: LatLng) -> MapResult<()> {
        let mut log = self.lock();
        match log.overlays.get_mut(&overlay) {
            Some(o) if o.draggable => {
                o.position = position;
                Ok(())
            }
            Some(_) => Err(MapError::Message(format!("overlay {overlay} is not draggable"))),
            None => Err(MapError::UnknownOverlay(overlay)),
        }
    }
}

impl MapSurface for RecordingSurface {
    fn create_overlay(&mut self, spec: OverlaySpec) -> MapResult<OverlayId> {
        if !spec.position.is_well_formed() {
            return Err(MapError::InvalidPosition(spec.position));
        }
        let mut log = self.lock();
        log.next_overlay += 1;
        let id = log.next_overlay;
        log.overlays.insert(
            id,
            RecordedOverlay {
                position: spec.position,
                draggable: spec.draggable,
            },
        );
        Ok(id)
    }

    fn overlay_position(&self, overlay: OverlayId) -> Option<LatLng> {
        self.lock().overlays.get(&overlay).map(|o| o.position)
    }

    fn detach(&mut self, overlay: OverlayId) {
        let mut log = self.lock();
        if log.overlays.remove(&overlay).is_some() {
            log.detached.push(overlay);
        }
    }

    fn show_info(&mut self, position: LatLng, content: &str) {
        self.lock().info.push(InfoWindow {
            position,
            content: content.to_string(),
        });
    }
}

/// Provider handing out one shared [`RecordingSurface`].
#[derive(Debug, Default)]
pub struct RecordingProvider {
    surface: RecordingSurface,
    rendered_with: Vec<SurfaceConfig>,
}

impl RecordingProvider {
    /// Provider with a fresh surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the surface every `render` call returns.
    pub fn surface(&self) -> RecordingSurface {
        self.surface.clone()
    }

    /// Config of every successful `render` call.
    pub fn rendered_with(&self) -> &[SurfaceConfig] {
        &self.rendered_with
    }
}

impl MapProvider for RecordingProvider {
    fn render(&mut self, config: &SurfaceConfig) -> MapResult<Box<dyn MapSurface>> {
        if !config.center.is_well_formed() {
            return Err(MapError::InvalidPosition(config.center));
        }
        self.rendered_with.push(config.clone());
        Ok(Box::new(self.surface.clone()))
    }
}
