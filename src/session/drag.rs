use std::sync::Arc;

use parking_lot::Mutex;

use crate::model::{ActivityRecord, TimelineId};

/// The single in-flight row drag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragState {
    pub active: bool,
    pub group_key: Option<String>,
    pub records: Vec<ActivityRecord>,
    pub source: Option<TimelineId>,
    /// Current top of the dragged row, in screen space.
    pub visual_y: f32,
    /// Pointer offset from the top of the row when the drag began.
    pub pointer_offset_y: f32,
}

#[derive(Debug, Clone, Default)]
pub struct DragCoordinator {
    slot: Arc<Mutex<DragState>>,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a drag, replacing any drag already in progress.
    pub fn begin(
        &self,
        source: TimelineId,
        group_key: impl Into<String>,
        records: Vec<ActivityRecord>,
        visual_y: f32,
        pointer_offset_y: f32,
    ) {
        *self.slot.lock() = DragState {
            active: true,
            group_key: Some(group_key.into()),
            records,
            source: Some(source),
            visual_y,
            pointer_offset_y,
        };
    }

    pub fn update_visual_y(&self, visual_y: f32) {
        let mut slot = self.slot.lock();
        if slot.active {
            slot.visual_y = visual_y;
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot.lock().active
    }

    pub fn snapshot(&self) -> DragState {
        self.slot.lock().clone()
    }

    /// Take the active drag and clear the slot.
    pub fn take(&self) -> Option<DragState> {
        let state = std::mem::take(&mut *self.slot.lock());
        state.active.then_some(state)
    }

    pub fn reset(&self) {
        *self.slot.lock() = DragState::default();
    }
}
