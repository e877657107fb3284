//! Map marker lifecycle controller backed by a remote document collection.
//!
//! A single controller task owns the rendered overlays, the in-memory
//! handles and the selection, and keeps them in step with the stored
//! marker records. Gestures from the map provider and button presses from
//! the page shell arrive as queued commands on a [`runtime::controller::ControllerHandle`].
//!
//! # Examples
//!
//! ```
//! use questmap::{
//!     config::ControllerConfig,
//!     map::recording::RecordingSurface,
//!     persist::memory::MemoryDocumentStore,
//!     runtime::controller::spawn_controller,
//!     types::LatLng,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryDocumentStore::new();
//! let surface = RecordingSurface::new();
//! let handle = spawn_controller(Box::new(store.clone()), ControllerConfig::default());
//!
//! handle.initialize(Box::new(surface.clone())).await.expect("initialize");
//! let id = handle
//!     .map_click(LatLng::new(5.0, 5.0))
//!     .await
//!     .expect("create")
//!     .expect("not guarded");
//! assert_eq!(store.ids("quests"), vec![id]);
//! assert_eq!(surface.overlay_count(), 1);
//!
//! handle.delete_all().await.expect("delete all");
//! assert!(store.is_empty("quests"));
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Controller and surface configuration.
pub mod config;
/// In-memory marker state and selection policy.
pub mod core;
/// Map-provider capability interface.
pub mod map;
/// Marker records and raw documents.
pub mod marker;
/// Document store abstraction with memory and SQLite implementations.
pub mod persist;
/// Single-writer controller handle and events.
pub mod runtime;
/// Shared primitive types.
pub mod types;
