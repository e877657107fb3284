use std::sync::Arc;

use hashbrown::HashSet;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    config::{ControllerConfig, SurfaceConfig},
    core::state::{MarkerHandle, MarkerState, StateError},
    map::{MapError, MapGesture, MapProvider, MapSurface, OverlaySpec},
    marker::{MarkerDraft, MarkerRecord},
    persist::{DocumentStore, StoreError, StoreResult},
    types::{LatLng, MarkerId, OverlayId},
};

use super::events::MarkerEvent;

/// Errors returned through a [`ControllerHandle`].
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// No surface has been handed to the controller yet.
    #[error("map surface is not ready")]
    MapNotReady,
    /// `initialize` was called a second time.
    #[error("controller is already initialized")]
    AlreadyInitialized,
    /// Clicked position is outside coordinate bounds.
    #[error("invalid marker location: {0:?}")]
    InvalidLocation(LatLng),
    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Map provider failure.
    #[error(transparent)]
    Map(#[from] MapError),
    /// Rejected state transition.
    #[error(transparent)]
    State(#[from] StateError),
    /// The controller task has stopped.
    #[error("controller channel closed")]
    ChannelClosed,
}

/// What the page shell should currently render.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerView {
    /// A surface is mounted.
    pub map_ready: bool,
    /// Held handles in insertion order.
    pub markers: Vec<MarkerHandle>,
    /// Selected marker, if any.
    pub selected: Option<MarkerId>,
}

impl ControllerView {
    /// "Delete Selected Marker" is only offered while something is selected.
    pub fn delete_selected_visible(&self) -> bool {
        self.selected.is_some()
    }

    /// "Delete All Markers" is always offered.
    pub fn delete_all_visible(&self) -> bool {
        true
    }

    /// Held ids in insertion order.
    pub fn ids(&self) -> Vec<MarkerId> {
        self.markers.iter().map(|h| h.id.clone()).collect()
    }
}

/// Cloneable front end of the controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<MarkerEvent>,
    surface_config: Arc<SurfaceConfig>,
}

enum Command {
    Initialize {
        surface: Box<dyn MapSurface>,
        resp: oneshot::Sender<Result<usize, ControllerError>>,
    },
    Reload {
        resp: oneshot::Sender<Result<usize, ControllerError>>,
    },
    MapClick {
        position: LatLng,
        resp: oneshot::Sender<Result<Option<MarkerId>, ControllerError>>,
    },
    OverlayClick {
        overlay: OverlayId,
        resp: oneshot::Sender<Option<MarkerId>>,
    },
    DragEnd {
        overlay: OverlayId,
        resp: oneshot::Sender<Result<Option<LatLng>, ControllerError>>,
    },
    Deselect {
        resp: oneshot::Sender<Option<MarkerId>>,
    },
    DeleteSelected {
        resp: oneshot::Sender<Result<Option<MarkerId>, ControllerError>>,
    },
    DeleteAll {
        resp: oneshot::Sender<Result<usize, ControllerError>>,
    },
    View {
        resp: oneshot::Sender<ControllerView>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Starts the controller task that owns all marker state.
///
/// Commands are processed one at a time, so concurrent gestures never
/// interleave inside an operation.
pub fn spawn_controller(store: Box<dyn DocumentStore>, config: ControllerConfig) -> ControllerHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<MarkerEvent>(config.event_capacity.max(1));

    let mut controller = Controller {
        state: MarkerState::new(),
        surface: None,
        store: Arc::new(Mutex::new(store)),
        events_tx: events_tx.clone(),
        collection: config.collection,
    };

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            if controller.handle_command(cmd).await {
                break;
            }
        }
        controller.teardown();
    });

    ControllerHandle {
        cmd_tx,
        events_tx,
        surface_config: Arc::new(config.surface),
    }
}

impl ControllerHandle {
    /// New receiver for controller events.
    pub fn subscribe(&self) -> broadcast::Receiver<MarkerEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| ControllerError::ChannelClosed)?;
        rx.await.map_err(|_| ControllerError::ChannelClosed)
    }

    /// Hands a ready surface to the controller and loads stored markers onto it.
    pub async fn initialize(&self, surface: Box<dyn MapSurface>) -> Result<usize, ControllerError> {
        self.request(|resp| Command::Initialize { surface, resp }).await?
    }

    /// Renders a surface through `provider` with the configured settings, then initializes with it.
    pub async fn mount<P>(&self, provider: &mut P) -> Result<usize, ControllerError>
    where
        P: MapProvider + ?Sized,
    {
        let surface = provider.render(&self.surface_config)?;
        self.initialize(surface).await
    }

    /// Reconciles the rendered markers with the stored collection.
    ///
    /// On failure nothing is drawn or dropped and `LoadFailed` is emitted.
    pub async fn reload_all(&self) -> Result<usize, ControllerError> {
        self.request(|resp| Command::Reload { resp }).await?
    }

    /// Creates a marker at `position` unless the creation guard blocks it.
    ///
    /// Returns `Ok(None)` when blocked: the map is not ready or a marker is selected.
    pub async fn map_click(&self, position: LatLng) -> Result<Option<MarkerId>, ControllerError> {
        self.request(|resp| Command::MapClick { position, resp }).await?
    }

    /// Selects the marker bound to `overlay`.
    pub async fn overlay_click(&self, overlay: OverlayId) -> Result<Option<MarkerId>, ControllerError> {
        self.request(|resp| Command::OverlayClick { overlay, resp }).await
    }

    /// Reports where a dragged marker was dropped.
    pub async fn drag_end(&self, overlay: OverlayId) -> Result<Option<LatLng>, ControllerError> {
        self.request(|resp| Command::DragEnd { overlay, resp }).await?
    }

    /// Routes a provider gesture to the matching operation.
    pub async fn dispatch(&self, gesture: MapGesture) -> Result<(), ControllerError> {
        match gesture {
            MapGesture::MapClicked(position) => self.map_click(position).await.map(|_| ()),
            MapGesture::OverlayClicked(overlay) => self.overlay_click(overlay).await.map(|_| ()),
            MapGesture::OverlayDragEnded(overlay) => self.drag_end(overlay).await.map(|_| ()),
        }
    }

    /// Clears the selection.
    pub async fn deselect(&self) -> Result<Option<MarkerId>, ControllerError> {
        self.request(|resp| Command::Deselect { resp }).await
    }

    /// Deletes the selected marker, restoring it if the store refuses.
    pub async fn delete_selected(&self) -> Result<Option<MarkerId>, ControllerError> {
        self.request(|resp| Command::DeleteSelected { resp }).await?
    }

    /// Deletes every stored marker in one batch. On failure nothing is cleared.
    pub async fn delete_all(&self) -> Result<usize, ControllerError> {
        self.request(|resp| Command::DeleteAll { resp }).await?
    }

    /// Snapshot of what the shell should render.
    pub async fn view(&self) -> Result<ControllerView, ControllerError> {
        self.request(|resp| Command::View { resp }).await
    }

    /// Detaches every owned overlay and stops the controller task.
    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        self.request(|resp| Command::Shutdown { resp }).await
    }
}

struct Controller {
    state: MarkerState,
    surface: Option<Box<dyn MapSurface>>,
    store: Arc<Mutex<Box<dyn DocumentStore>>>,
    events_tx: broadcast::Sender<MarkerEvent>,
    collection: String,
}

impl Controller {
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Initialize { surface, resp } => {
                let out = self.initialize(surface).await;
                let _ = resp.send(out);
            }
            Command::Reload { resp } => {
                let out = self.reload_all().await;
                let _ = resp.send(out);
            }
            Command::MapClick { position, resp } => {
                let out = self.map_click(position).await;
                let _ = resp.send(out);
            }
            Command::OverlayClick { overlay, resp } => {
                let _ = resp.send(self.overlay_click(overlay));
            }
            Command::DragEnd { overlay, resp } => {
                let _ = resp.send(self.drag_end(overlay));
            }
            Command::Deselect { resp } => {
                let out = self.state.clear_selection();
                if out.is_some() {
                    self.emit(MarkerEvent::SelectionCleared);
                }
                let _ = resp.send(out);
            }
            Command::DeleteSelected { resp } => {
                let out = self.delete_selected().await;
                let _ = resp.send(out);
            }
            Command::DeleteAll { resp } => {
                let out = self.delete_all().await;
                let _ = resp.send(out);
            }
            Command::View { resp } => {
                let _ = resp.send(self.view());
            }
            Command::Shutdown { resp } => {
                self.teardown();
                let _ = resp.send(());
                return true;
            }
        }

        false
    }

    fn emit(&self, event: MarkerEvent) {
        let _ = self.events_tx.send(event);
    }

    fn view(&self) -> ControllerView {
        ControllerView {
            map_ready: self.state.is_map_ready(),
            markers: self.state.handles().to_vec(),
            selected: self.state.selected().cloned(),
        }
    }

    async fn initialize(&mut self, surface: Box<dyn MapSurface>) -> Result<usize, ControllerError> {
        if self.surface.is_some() {
            warn!("initialize called on a mounted controller, ignoring");
            return Err(ControllerError::AlreadyInitialized);
        }
        self.surface = Some(surface);
        self.state.set_map_ready();
        info!(collection = %self.collection, "map surface ready");
        self.reload_all().await
    }

    async fn reload_all(&mut self) -> Result<usize, ControllerError> {
        if !self.state.is_map_ready() {
            return Err(ControllerError::MapNotReady);
        }

        let fetched = run_store(Arc::clone(&self.store), self.collection.clone(), |store, collection| {
            store.get_all(collection)
        })
        .await;
        let docs = match fetched {
            Ok(docs) => docs,
            Err(err) => {
                warn!(error = %err, "failed to fetch markers");
                self.emit(MarkerEvent::LoadFailed {
                    reason: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let total = docs.len();
        let records: Vec<MarkerRecord> = docs
            .iter()
            .filter_map(|doc| {
                let record = MarkerRecord::from_document(doc);
                if record.is_none() {
                    debug!(id = %doc.id, "skipping marker without a well-formed location");
                }
                record
            })
            .collect();
        let skipped = total - records.len();
        let keep: HashSet<MarkerId> = records.iter().map(|r| r.id.clone()).collect();

        let had_selection = self.state.selected().is_some();
        let Some(surface) = self.surface.as_mut() else {
            return Err(ControllerError::MapNotReady);
        };

        // Every new overlay is drawn before the state changes.
        let mut drawn: Vec<MarkerHandle> = Vec::new();
        let mut seen: HashSet<MarkerId> = HashSet::new();
        for record in records {
            if self.state.contains(&record.id) || !seen.insert(record.id.clone()) {
                continue;
            }
            let spec = OverlaySpec {
                position: record.location,
                draggable: true,
            };
            match surface.create_overlay(spec) {
                Ok(overlay) => drawn.push(MarkerHandle {
                    id: record.id,
                    overlay,
                    location: record.location,
                    reports_drag: false,
                }),
                Err(err) => {
                    for handle in &drawn {
                        surface.detach(handle.overlay);
                    }
                    warn!(error = %err, drawn = drawn.len(), "failed to draw fetched markers");
                    self.emit(MarkerEvent::LoadFailed {
                        reason: err.to_string(),
                    });
                    return Err(err.into());
                }
            }
        }

        for stale in self.state.retain_ids(&keep) {
            debug!(id = %stale.id, "dropping marker missing from the store");
            surface.detach(stale.overlay);
        }
        for handle in drawn {
            self.state.bind(handle)?;
        }

        if had_selection && self.state.selected().is_none() {
            self.emit(MarkerEvent::SelectionCleared);
        }
        let held = self.state.len();
        info!(held, skipped, "markers loaded");
        self.emit(MarkerEvent::Loaded { held, skipped });
        Ok(held)
    }

    async fn map_click(&mut self, position: LatLng) -> Result<Option<MarkerId>, ControllerError> {
        if let Some(reason) = self.state.creation_blocked() {
            debug!(?reason, "map click ignored");
            return Ok(None);
        }
        if !position.is_well_formed() {
            return Err(ControllerError::InvalidLocation(position));
        }

        let surface = self.surface.as_mut().ok_or(ControllerError::MapNotReady)?;
        let overlay = surface.create_overlay(OverlaySpec {
            position,
            draggable: true,
        })?;
        self.state.begin_pending(overlay, position);

        let fields = MarkerDraft::new(position).to_fields();
        let inserted = run_store(Arc::clone(&self.store), self.collection.clone(), move |store, collection| {
            store.insert(collection, fields)
        })
        .await
        .map_err(ControllerError::from)
        .and_then(|id| {
            self.state.confirm_pending(overlay, id.clone())?;
            Ok(id)
        });

        match inserted {
            Ok(id) => {
                info!(%id, lat = position.lat, lng = position.lng, "marker created");
                self.emit(MarkerEvent::Created {
                    id: id.clone(),
                    position,
                });
                Ok(Some(id))
            }
            Err(err) => {
                self.state.abandon_pending(overlay);
                if let Some(surface) = self.surface.as_mut() {
                    surface.detach(overlay);
                }
                warn!(error = %err, lat = position.lat, lng = position.lng, "failed to store new marker");
                self.emit(MarkerEvent::CreateFailed {
                    position,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn overlay_click(&mut self, overlay: OverlayId) -> Option<MarkerId> {
        let Some(id) = self.state.select_overlay(overlay) else {
            debug!(overlay, "click on an overlay without a stored marker");
            return None;
        };
        debug!(%id, "marker selected");
        self.emit(MarkerEvent::Selected { id: id.clone() });
        Some(id)
    }

    fn drag_end(&mut self, overlay: OverlayId) -> Result<Option<LatLng>, ControllerError> {
        let Some(id) = self.state.drag_target(overlay).map(|h| h.id.clone()) else {
            return Ok(None);
        };
        let surface = self.surface.as_mut().ok_or(ControllerError::MapNotReady)?;
        let Some(position) = surface.overlay_position(overlay) else {
            return Ok(None);
        };

        // The stored location is left as is.
        surface.show_info(
            position,
            &format!("Pin dropped at: {}, {}", position.lat, position.lng),
        );
        if self.state.clear_selection().is_some() {
            self.emit(MarkerEvent::SelectionCleared);
        }
        self.emit(MarkerEvent::PinDropped { id, position });
        Ok(Some(position))
    }

    async fn delete_selected(&mut self) -> Result<Option<MarkerId>, ControllerError> {
        let Some(id) = self.state.selected().cloned() else {
            return Ok(None);
        };
        let Some(handle) = self.state.remove(&id) else {
            self.state.clear_selection();
            return Ok(None);
        };
        if let Some(surface) = self.surface.as_mut() {
            surface.detach(handle.overlay);
        }

        let target = id.clone();
        let deleted = run_store(Arc::clone(&self.store), self.collection.clone(), move |store, collection| {
            store.delete(collection, &target)
        })
        .await;

        match deleted {
            Ok(()) => {
                info!(%id, "marker deleted");
                self.emit(MarkerEvent::Deleted { id: id.clone() });
                self.emit(MarkerEvent::SelectionCleared);
                Ok(Some(id))
            }
            Err(err) => {
                warn!(%id, error = %err, "failed to delete marker, restoring it");
                if let Err(restore_err) = self.restore(handle) {
                    warn!(%id, error = %restore_err, "failed to restore marker overlay");
                }
                self.emit(MarkerEvent::DeleteFailed {
                    id,
                    reason: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    fn restore(&mut self, handle: MarkerHandle) -> Result<(), ControllerError> {
        let surface = self.surface.as_mut().ok_or(ControllerError::MapNotReady)?;
        let overlay = surface.create_overlay(OverlaySpec {
            position: handle.location,
            draggable: true,
        })?;
        let id = handle.id.clone();
        self.state.bind(MarkerHandle { overlay, ..handle })?;
        self.state.select(&id);
        Ok(())
    }

    async fn delete_all(&mut self) -> Result<usize, ControllerError> {
        let result = run_store(Arc::clone(&self.store), self.collection.clone(), |store, collection| {
            let ids: Vec<MarkerId> = store
                .get_all(collection)?
                .into_iter()
                .map(|doc| doc.id)
                .collect();
            store.batch_delete(collection, &ids)?;
            Ok(ids.len())
        })
        .await;

        match result {
            Ok(count) => {
                let had_selection = self.state.selected().is_some();
                let cleared = self.state.clear();
                if let Some(surface) = self.surface.as_mut() {
                    for handle in &cleared {
                        surface.detach(handle.overlay);
                    }
                }
                info!(count, "all markers deleted");
                if had_selection {
                    self.emit(MarkerEvent::SelectionCleared);
                }
                self.emit(MarkerEvent::AllDeleted { count });
                Ok(count)
            }
            Err(err) => {
                error!(error = %err, "error deleting all markers");
                self.emit(MarkerEvent::DeleteAllFailed {
                    reason: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    fn teardown(&mut self) {
        let handles = self.state.clear();
        let pending = self.state.pending_overlays();
        if let Some(surface) = self.surface.as_mut() {
            for handle in &handles {
                surface.detach(handle.overlay);
            }
            for overlay in pending {
                self.state.abandon_pending(overlay);
                surface.detach(overlay);
            }
        }
        if !handles.is_empty() {
            debug!(count = handles.len(), "controller torn down");
        }
    }
}

async fn run_store<T, F>(store: Arc<Mutex<Box<dyn DocumentStore>>>, collection: String, f: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Box<dyn DocumentStore>, &str) -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut store = store.blocking_lock();
        f(&mut *store, collection.as_str())
    })
    .await
    .map_err(|e| StoreError::Message(format!("join error: {e}")))?
}
