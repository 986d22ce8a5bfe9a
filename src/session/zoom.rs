//! Per-timeline zoom controllers and their observable zoom values.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::model::{TimeRange, TimelineId, TimelineViewport};

/// Zoom and pan surface of one timeline, owned by whatever renders it.
pub trait ZoomController: Send {
    fn zoom_in(&mut self);
    fn zoom_out(&mut self);
    fn set_zoom(&mut self, value: f32);
    fn reset_zoom(&mut self);
    fn fit_to_range(&mut self, range: TimeRange);
    /// Current zoom, in pixels per hour.
    fn zoom(&self) -> f32;
}

/// A viewport shared between its canvas and the registry.
pub type SharedViewport = Arc<Mutex<TimelineViewport>>;

impl ZoomController for SharedViewport {
    fn zoom_in(&mut self) {
        self.lock().zoom_in();
    }

    fn zoom_out(&mut self) {
        self.lock().zoom_out();
    }

    fn set_zoom(&mut self, value: f32) {
        self.lock().set_zoom(value);
    }

    fn reset_zoom(&mut self) {
        self.lock().reset();
    }

    fn fit_to_range(&mut self, range: TimeRange) {
        self.lock().fit(range);
    }

    fn zoom(&self) -> f32 {
        self.lock().pixels_per_hour
    }
}

/// Registered controller plus the channel its zoom is published on.
#[derive(Clone)]
pub struct ZoomHandle {
    controller: Arc<Mutex<Box<dyn ZoomController>>>,
    value: Arc<watch::Sender<f32>>,
}

impl ZoomHandle {
    fn new(controller: Box<dyn ZoomController>, initial_zoom: f32) -> Self {
        let (tx, _rx) = watch::channel(initial_zoom);
        Self {
            controller: Arc::new(Mutex::new(controller)),
            value: Arc::new(tx),
        }
    }

    /// Run `op` on the controller, then publish the resulting zoom.
    fn with_controller(&self, op: impl FnOnce(&mut dyn ZoomController)) {
        let zoom = {
            let mut controller = self.controller.lock();
            op(controller.as_mut());
            controller.zoom()
        };
        self.value.send_if_modified(|current| {
            if *current == zoom {
                false
            } else {
                *current = zoom;
                true
            }
        });
    }

    pub fn zoom_in(&self) {
        self.with_controller(|c| c.zoom_in());
    }

    pub fn zoom_out(&self) {
        self.with_controller(|c| c.zoom_out());
    }

    pub fn set_zoom(&self, value: f32) {
        self.with_controller(|c| c.set_zoom(value));
    }

    pub fn reset_zoom(&self) {
        self.with_controller(|c| c.reset_zoom());
    }

    pub fn fit_to_range(&self, range: TimeRange) {
        self.with_controller(|c| c.fit_to_range(range));
    }

    /// Last published zoom.
    pub fn zoom_value(&self) -> f32 {
        *self.value.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.value.subscribe()
    }
}

/// Brokers access to the zoom controller of each timeline.
#[derive(Clone, Default)]
pub struct ZoomRegistry {
    entries: Arc<RwLock<HashMap<TimelineId, ZoomHandle>>>,
}

impl ZoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `controller` for `id`. An existing registration is kept and returned.
    pub fn register(
        &self,
        id: TimelineId,
        controller: Box<dyn ZoomController>,
        initial_zoom: f32,
    ) -> ZoomHandle {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&id) {
            warn!("Zoom controller for {id} already registered; keeping the existing one");
            return existing.clone();
        }
        let handle = ZoomHandle::new(controller, initial_zoom);
        entries.insert(id, handle.clone());
        debug!("Registered zoom controller for {id}");
        handle
    }

    pub fn get(&self, id: TimelineId) -> Option<ZoomHandle> {
        self.entries.read().get(&id).cloned()
    }

    pub fn unregister(&self, id: TimelineId) -> bool {
        self.entries.write().remove(&id).is_some()
    }

    pub fn zoom_value(&self, id: TimelineId) -> Option<f32> {
        self.get(id).map(|h| h.zoom_value())
    }

    pub fn subscribe(&self, id: TimelineId) -> Option<watch::Receiver<f32>> {
        self.get(id).map(|h| h.subscribe())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `op` to every registered controller.
    pub fn for_each(&self, op: impl Fn(&ZoomHandle)) {
        let handles: Vec<ZoomHandle> = self.entries.read().values().cloned().collect();
        for handle in &handles {
            op(handle);
        }
    }
}
