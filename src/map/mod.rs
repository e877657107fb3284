//! Map-provider capability traits consumed by the controller.

/// In-process provider that records what it was asked to draw.
pub mod recording;

use crate::{
    config::SurfaceConfig,
    types::{LatLng, OverlayId},
};

/// Failures reported by a map provider.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The coordinate cannot be drawn.
    #[error("position is not a valid coordinate: {0:?}")]
    InvalidPosition(LatLng),
    /// The overlay is not on this surface.
    #[error("unknown overlay: {0}")]
    UnknownOverlay(OverlayId),
    /// Provider-specific failure.
    #[error("map provider error: {0}")]
    Message(String),
}

/// Result alias for map-provider calls.
pub type MapResult<T> = Result<T, MapError>;

/// Overlay creation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySpec {
    /// Where to draw the overlay.
    pub position: LatLng,
    /// Whether the user may drag it.
    pub draggable: bool,
}

/// User gesture reported by the map provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapGesture {
    /// Click on empty map at a position.
    MapClicked(LatLng),
    /// Click on a rendered overlay.
    OverlayClicked(OverlayId),
    /// A drag of an overlay finished.
    OverlayDragEnded(OverlayId),
}

/// Bootstraps a ready surface.
pub trait MapProvider {
    /// Draws a map with `config` and returns it once it is ready for overlays.
    fn render(&mut self, config: &SurfaceConfig) -> MapResult<Box<dyn MapSurface>>;
}

/// A rendered map the controller draws overlays onto.
pub trait MapSurface: Send {
    /// Draws an overlay and returns its id.
    fn create_overlay(&mut self, spec: OverlaySpec) -> MapResult<OverlayId>;
    /// Current position of an overlay, which moves when the user drags it.
    fn overlay_position(&self, overlay: OverlayId) -> Option<LatLng>;
    /// Removes an overlay. Unknown ids are ignored.
    fn detach(&mut self, overlay: OverlayId);
    /// Opens a transient info display at `position`.
    fn show_info(&mut self, position: LatLng, content: &str);
}
