//! Video slot bookkeeping: one live slot per role, each moving through
//! requested → candidate → bound → removed.
//!
//! Every asynchronous answer from the video transport names either the
//! [`SlotId`] it was requested for or the [`ViewHandle`] it delivered. Both
//! are checked against the live slot before anything is touched, so late
//! callbacks for a released slot fall on the floor.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Timing;
use crate::scheduler::{Scheduler, TimerId};
use crate::screen::ScreenTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Incoming,
    Outgoing,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Incoming, Role::Outgoing];

    fn index(self) -> usize {
        match self {
            Role::Incoming => 0,
            Role::Outgoing => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId {
    pub role: Role,
    pub generation: u64,
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.role, self.generation)
    }
}

/// Opaque view handle minted by the video transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl Orientation {
    pub fn is_sideways(self) -> bool {
        matches!(self, Orientation::Rotation90 | Orientation::Rotation270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Requested,
    Candidate,
    Bound,
    Removed,
}

/// Collaborator that owns the actual video views.
pub trait VideoTransport {
    /// Start creating a view for `slot`. The answer comes back later through
    /// `CallScreen::on_view_created`, or never.
    fn create_view(&mut self, slot: SlotId);
    fn release(&mut self, view: ViewHandle);
}

#[derive(Debug, Clone)]
pub struct VideoSlot {
    pub id: SlotId,
    pub lifecycle: Lifecycle,
    pub view: Option<ViewHandle>,
    pub is_ready: bool,
    pub orientation: Orientation,
    pub aspect_ratio: f32,
    ready_timer: Option<TimerId>,
    settle_timer: Option<TimerId>,
}

impl VideoSlot {
    fn requested(id: SlotId) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::Requested,
            view: None,
            is_ready: false,
            orientation: Orientation::Rotation0,
            aspect_ratio: 1.0,
            ready_timer: None,
            settle_timer: None,
        }
    }

    fn candidate(id: SlotId, view: ViewHandle) -> Self {
        Self {
            lifecycle: Lifecycle::Candidate,
            view: Some(view),
            ..Self::requested(id)
        }
    }

    pub fn role(&self) -> Role {
        self.id.role
    }

    fn cancel_timers(&mut self, sched: &mut Scheduler<ScreenTask>) {
        if let Some(t) = self.ready_timer.take() {
            sched.cancel(t);
        }
        if let Some(t) = self.settle_timer.take() {
            sched.cancel(t);
        }
    }
}

/// What the caller should do after a readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Stale, duplicate, or not yet a candidate.
    Ignored,
    /// Ready; promotion is waiting on the settle timer.
    Settling,
    /// Ready and promotable right away.
    PromoteNow,
}

#[derive(Debug)]
pub struct SlotRegistry {
    timing: Timing,
    next_generation: u64,
    live: [Option<VideoSlot>; 2],
    removed: Vec<VideoSlot>,
}

impl SlotRegistry {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            next_generation: 1,
            live: [None, None],
            removed: Vec::new(),
        }
    }

    pub fn slot(&self, role: Role) -> Option<&VideoSlot> {
        self.live[role.index()].as_ref()
    }

    pub fn get(&self, id: SlotId) -> Option<&VideoSlot> {
        self.slot(id.role).filter(|s| s.id == id)
    }

    fn get_mut(&mut self, id: SlotId) -> Option<&mut VideoSlot> {
        self.live[id.role.index()]
            .as_mut()
            .filter(|s| s.id == id)
    }

    pub fn by_view(&self, view: ViewHandle) -> Option<&VideoSlot> {
        self.live
            .iter()
            .flatten()
            .find(|s| s.view == Some(view))
    }

    pub fn bound(&self, role: Role) -> Option<&VideoSlot> {
        self.slot(role).filter(|s| s.lifecycle == Lifecycle::Bound)
    }

    /// False while the role is unrequested, still waiting for its view, or
    /// not yet promoted.
    pub fn video_available(&self, role: Role) -> bool {
        self.bound(role).is_some()
    }

    pub fn request_slot(
        &mut self,
        role: Role,
        transport: &mut dyn VideoTransport,
    ) -> Option<SlotId> {
        if self.live[role.index()].is_some() {
            return None;
        }
        let id = SlotId {
            role,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        self.live[role.index()] = Some(VideoSlot::requested(id));
        debug!("slot {id}: requested");
        transport.create_view(id);
        Some(id)
    }

    /// Returns true when a candidate was installed.
    pub fn on_view_created(
        &mut self,
        id: SlotId,
        view: Option<ViewHandle>,
        sched: &mut Scheduler<ScreenTask>,
        transport: &mut dyn VideoTransport,
    ) -> bool {
        let Some(view) = view else {
            debug!("slot {id}: transport produced no view");
            return false;
        };
        let assume_ready = self.timing.assume_ready();
        let Some(entry) = self.get_mut(id) else {
            debug!("slot {id}: view {view:?} arrived after release, handing it back");
            transport.release(view);
            return false;
        };
        if entry.lifecycle == Lifecycle::Bound {
            debug!("slot {id}: duplicate view {view:?} for bound slot, handing it back");
            transport.release(view);
            return false;
        }

        if let Some(old) = entry.view.filter(|v| *v != view) {
            transport.release(old);
        }
        entry.cancel_timers(sched);
        let mut fresh = VideoSlot::candidate(id, view);
        if id.role == Role::Outgoing {
            fresh.ready_timer = Some(sched.schedule(assume_ready, ScreenTask::AssumeReady(id)));
        }
        *entry = fresh;
        debug!("slot {id}: candidate with view {view:?}");
        true
    }

    pub fn mark_ready(&mut self, id: SlotId, sched: &mut Scheduler<ScreenTask>) -> Readiness {
        let settle = match id.role {
            Role::Incoming => self.timing.incoming_settle(),
            Role::Outgoing => self.timing.outgoing_settle(),
        };
        let Some(slot) = self.get_mut(id) else {
            debug!("slot {id}: ready signal for released slot dropped");
            return Readiness::Ignored;
        };
        if slot.lifecycle != Lifecycle::Candidate || slot.is_ready {
            return Readiness::Ignored;
        }
        slot.is_ready = true;
        if let Some(t) = slot.ready_timer.take() {
            sched.cancel(t);
        }
        if settle.is_zero() {
            Readiness::PromoteNow
        } else {
            slot.settle_timer = Some(sched.schedule(settle, ScreenTask::Promote(id)));
            Readiness::Settling
        }
    }

    /// Candidate + ready → bound. Returns false for anything else.
    pub fn promote(&mut self, id: SlotId) -> bool {
        let Some(slot) = self.get_mut(id) else {
            return false;
        };
        if slot.lifecycle != Lifecycle::Candidate || !slot.is_ready {
            return false;
        }
        slot.settle_timer = None;
        slot.lifecycle = Lifecycle::Bound;
        info!("slot {id}: bound");
        true
    }

    /// Returns true when the metadata changed.
    pub fn set_orientation(
        &mut self,
        view: ViewHandle,
        orientation: Orientation,
        aspect_ratio: f32,
    ) -> bool {
        if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
            debug!("view {view:?}: ignoring non-positive aspect {aspect_ratio}");
            return false;
        }
        let Some(slot) = self
            .live
            .iter_mut()
            .flatten()
            .find(|s| s.view == Some(view))
        else {
            debug!("view {view:?}: orientation update for released slot dropped");
            return false;
        };
        if slot.orientation == orientation && slot.aspect_ratio == aspect_ratio {
            return false;
        }
        slot.orientation = orientation;
        slot.aspect_ratio = aspect_ratio;
        true
    }

    /// Tears down whatever the role holds. A bound slot is queued for the
    /// layout coordinator; the rest are forgotten at once.
    pub fn release_slot(
        &mut self,
        role: Role,
        sched: &mut Scheduler<ScreenTask>,
        transport: &mut dyn VideoTransport,
    ) -> bool {
        let Some(mut slot) = self.live[role.index()].take() else {
            return false;
        };
        slot.cancel_timers(sched);
        if let Some(view) = slot.view {
            transport.release(view);
        }
        let was_bound = slot.lifecycle == Lifecycle::Bound;
        slot.lifecycle = Lifecycle::Removed;
        debug!("slot {}: removed", slot.id);
        if was_bound {
            self.removed.push(slot);
        }
        true
    }

    /// Removed bound slots not yet consumed by the layout coordinator.
    pub fn take_removed(&mut self) -> Vec<VideoSlot> {
        std::mem::take(&mut self.removed)
    }

    pub fn bound_count(&self) -> usize {
        self.live
            .iter()
            .flatten()
            .filter(|s| s.lifecycle == Lifecycle::Bound)
            .count()
    }
}
