//! Controller and map-surface configuration.

use crate::{marker::MARKER_COLLECTION, types::LatLng};

const DEFAULT_COMMAND_QUEUE_BOUND: usize = 256;
const DEFAULT_EVENT_CAPACITY: usize = 1024;
const DEFAULT_ZOOM: u8 = 4;

/// Settings handed to [`crate::map::MapProvider::render`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    /// Provider access credential.
    pub access_key: String,
    /// Initial map center.
    pub center: LatLng,
    /// Initial zoom level.
    pub zoom: u8,
    /// Request access to the provider's underlying API objects.
    pub use_provider_api: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            center: LatLng::new(0.0, 0.0),
            zoom: DEFAULT_ZOOM,
            use_provider_api: true,
        }
    }
}

/// Tuning knobs for the marker controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Store collection holding marker records.
    pub collection: String,
    /// Capacity of the command queue feeding the controller task.
    pub command_queue_bound: usize,
    /// Capacity of the broadcast event channel.
    pub event_capacity: usize,
    /// Surface bootstrap settings used by [`crate::runtime::controller::ControllerHandle::mount`].
    pub surface: SurfaceConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            collection: MARKER_COLLECTION.to_string(),
            command_queue_bound: DEFAULT_COMMAND_QUEUE_BOUND,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            surface: SurfaceConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Loads overrides from `QUESTMAP_*` environment variables.
    ///
    /// Missing or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            collection: std::env::var("QUESTMAP_COLLECTION")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.collection),
            command_queue_bound: env_parse("QUESTMAP_COMMAND_QUEUE", defaults.command_queue_bound)
                .max(1),
            event_capacity: env_parse("QUESTMAP_EVENT_CAPACITY", defaults.event_capacity).max(1),
            surface: SurfaceConfig {
                access_key: std::env::var("QUESTMAP_MAP_KEY").unwrap_or_default(),
                zoom: env_parse("QUESTMAP_ZOOM", defaults.surface.zoom),
                ..defaults.surface
            },
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
