//! The call screen: single-threaded owner of every component.
//!
//! Every external input (call update, transport callback, gesture, timer)
//! enters through one `CallScreen` method. All mutations caused by that
//! input are applied first; then the resulting layout is compared with the
//! last one handed to the presenter and at most one relayout request goes
//! out. Callbacks produced on other threads are wrapped in [`ScreenEvent`]
//! and sent to the owning thread, which feeds them to [`CallScreen::handle`].

use log::{debug, info};
use serde::Serialize;
use std::time::Duration;

use crate::background::{BackgroundSelector, BackgroundStyle, StyleTransition};
use crate::config::{Profile, Screen};
use crate::corner::{Corner, FlingThresholds};
use crate::frames::{self, PreviewSource};
use crate::geometry::{Point, Rect, Vector};
use crate::layout::{LayoutCoordinator, LayoutRoles};
use crate::phase::{CallUpdate, VideoState};
use crate::pip::{HitTarget, PanMode, PanOutcome, PipController, PipGestureState};
use crate::scheduler::Scheduler;
use crate::slots::{
    Orientation, Readiness, Role, SlotId, SlotRegistry, VideoSlot, VideoTransport, ViewHandle,
};
use crate::tracker::TouchOutput;
use crate::visibility::VisibilityScheduler;

/// Work parked on the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTask {
    AssumeReady(SlotId),
    Promote(SlotId),
    AutoHide,
    AmbientIdle,
    FadeDone,
}

/// Receives everything the presentation layer has to act on.
pub trait Presenter {
    fn relayout(&mut self, request: &RelayoutRequest);

    fn style_transition(&mut self, _transition: StyleTransition, _duration: Duration) {}

    fn ambient_animation(&mut self, _running: bool) {}

    fn dismissed(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotView {
    pub id: SlotId,
    pub view: Option<ViewHandle>,
    pub orientation: Orientation,
    pub aspect_ratio: f32,
}

impl From<&VideoSlot> for SlotView {
    fn from(slot: &VideoSlot) -> Self {
        Self {
            id: slot.id,
            view: slot.view,
            orientation: slot.orientation,
            aspect_ratio: slot.aspect_ratio,
        }
    }
}

/// Everything a frame of the call screen depends on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    pub expanded: Option<SlotView>,
    pub minimized: Option<SlotView>,
    pub pip_fraction: f32,
    pub pip_corner: Corner,
    pub pip_drag_position: Option<Point>,
    pub preview_corner: Corner,
    pub preview_drag_position: Option<Point>,
    pub dismiss_offset: f32,
    pub chrome_visible: bool,
    pub incoming_paused: bool,
    pub screen: Screen,
}

impl Default for LayoutSnapshot {
    fn default() -> Self {
        Self {
            expanded: None,
            minimized: None,
            pip_fraction: 0.0,
            pip_corner: Corner::TopRight,
            pip_drag_position: None,
            preview_corner: Corner::BottomRight,
            preview_drag_position: None,
            dismiss_offset: 0.0,
            chrome_visible: true,
            incoming_paused: false,
            screen: Screen::default(),
        }
    }
}

/// How the presenter should move from the previous frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutTransition {
    /// Finger tracking; apply as-is.
    Immediate,
    /// Ease between states after a call or video change.
    Animated,
    /// Settle after a release.
    Spring,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayoutRequest {
    pub at_ms: u64,
    pub transition: LayoutTransition,
    #[serde(flatten)]
    pub layout: LayoutSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanEvent {
    Began { position: Point, hit: HitTarget },
    Changed { translation: Vector },
    Ended { translation: Vector, velocity: Vector },
    Cancelled { translation: Vector, velocity: Vector },
}

/// Owned, `Send` form of every input, for crossing threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScreenEvent {
    Call(CallUpdate),
    ViewCreated {
        slot: SlotId,
        view: Option<ViewHandle>,
    },
    FirstFrame(ViewHandle),
    Orientation {
        view: ViewHandle,
        orientation: Orientation,
        aspect_ratio: f32,
    },
    Pan(PanEvent),
    Tap(HitTarget),
    /// Raw pointer output; hit-tested against the current frames.
    Touch(TouchOutput),
    Interaction,
    ExpandFromPip,
    Proximity(bool),
    Resize(Screen),
}

pub struct CallScreen<T: VideoTransport, P: Presenter> {
    profile: Profile,
    screen: Screen,
    transport: T,
    presenter: P,
    sched: Scheduler<ScreenTask>,
    slots: SlotRegistry,
    layout: LayoutCoordinator,
    pip: PipController,
    visibility: VisibilityScheduler,
    background: BackgroundSelector,
    call: Option<CallUpdate>,
    shown: LayoutSnapshot,
    ambient_shown: bool,
}

impl<T: VideoTransport, P: Presenter> CallScreen<T, P> {
    pub fn new(profile: Profile, transport: T, presenter: P) -> Self {
        let timing = profile.timing.clone();
        Self {
            screen: profile.screen,
            slots: SlotRegistry::new(timing.clone()),
            layout: LayoutCoordinator::new(timing.swap_cooldown()),
            pip: PipController::new(profile.gestures.clone()),
            visibility: VisibilityScheduler::new(timing),
            background: BackgroundSelector::new(profile.background.degraded_below),
            sched: Scheduler::new(),
            call: None,
            shown: LayoutSnapshot {
                screen: profile.screen,
                ..LayoutSnapshot::default()
            },
            ambient_shown: true,
            transport,
            presenter,
            profile,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    pub fn now(&self) -> Duration {
        self.sched.now()
    }

    pub fn roles(&self) -> LayoutRoles {
        self.layout.roles()
    }

    pub fn slot(&self, role: Role) -> Option<&VideoSlot> {
        self.slots.slot(role)
    }

    /// "No video currently available" covers roles whose view never arrived.
    pub fn video_available(&self, role: Role) -> bool {
        self.slots.video_available(role)
    }

    pub fn pip_state(&self) -> PipGestureState {
        self.pip.state()
    }

    pub fn background(&self) -> BackgroundStyle {
        self.background.current()
    }

    pub fn chrome_visible(&self) -> bool {
        self.visibility.chrome_visible()
    }

    pub fn ambient_running(&self) -> bool {
        self.visibility.ambient_running()
    }

    /// The layout as it would be shown right now.
    pub fn snapshot(&self) -> LayoutSnapshot {
        let view_of = |id: Option<SlotId>| id.and_then(|id| self.slots.get(id)).map(SlotView::from);
        LayoutSnapshot {
            expanded: view_of(self.layout.expanded()),
            minimized: view_of(self.layout.minimized()),
            pip_fraction: self.pip.fraction(),
            pip_corner: self.pip.corner(),
            pip_drag_position: self.pip.drag_position(),
            preview_corner: self.layout.preview_corner(),
            preview_drag_position: self.layout.preview_drag_position(),
            dismiss_offset: self.pip.dismiss_offset(),
            chrome_visible: self.visibility.chrome_visible(),
            incoming_paused: self.incoming_paused(),
            screen: self.screen,
        }
    }

    fn incoming_paused(&self) -> bool {
        self.call.is_some_and(|c| {
            !c.phase.is_ending() && c.remote_video == VideoState::Paused
        })
    }

    pub fn preview_rect(&self) -> Rect {
        let source = self
            .layout
            .minimized()
            .and_then(|id| self.slots.get(id))
            .map(|s| PreviewSource {
                role: s.role(),
                orientation: s.orientation,
                aspect_ratio: s.aspect_ratio,
            });
        frames::preview_rect(
            &self.screen,
            self.layout.preview_corner(),
            self.pip.fraction(),
            !self.visibility.chrome_visible(),
            source.as_ref(),
        )
    }

    pub fn pip_container_rect(&self) -> Rect {
        frames::pip_container_rect(&self.screen, self.pip.corner())
    }

    /// Hit target of a screen point, for drivers without their own hit tests.
    pub fn hit_test(&self, point: Point) -> HitTarget {
        if self.pip.is_active() {
            if self.pip_container_rect().contains(point) {
                HitTarget::Container
            } else {
                HitTarget::Outside
            }
        } else if self.layout.minimized().is_some() && self.preview_rect().contains(point) {
            HitTarget::MinimizedPreview
        } else {
            HitTarget::Outside
        }
    }

    fn fling(&self) -> FlingThresholds {
        FlingThresholds::from(&self.profile.gestures)
    }

    // ---- video slots ------------------------------------------------------

    pub fn request_slot(&mut self, role: Role) -> Option<SlotId> {
        let id = self.slots.request_slot(role, &mut self.transport);
        self.flush(LayoutTransition::Animated);
        id
    }

    pub fn release_slot(&mut self, role: Role) -> bool {
        let released = self.release(role);
        self.sync_layout();
        self.flush(LayoutTransition::Animated);
        released
    }

    pub fn on_view_created(&mut self, slot: SlotId, view: Option<ViewHandle>) {
        self.slots
            .on_view_created(slot, view, &mut self.sched, &mut self.transport);
        self.flush(LayoutTransition::Animated);
    }

    pub fn on_first_frame(&mut self, view: ViewHandle) {
        match self.slots.by_view(view).map(|s| s.id) {
            Some(id) => self.mark_ready(id),
            None => debug!("view {view:?}: first frame for released slot dropped"),
        }
        self.flush(LayoutTransition::Animated);
    }

    pub fn on_orientation_changed(&mut self, view: ViewHandle, orientation: Orientation, aspect_ratio: f32) {
        self.slots.set_orientation(view, orientation, aspect_ratio);
        self.flush(LayoutTransition::Animated);
    }

    fn release(&mut self, role: Role) -> bool {
        self.slots
            .release_slot(role, &mut self.sched, &mut self.transport)
    }

    fn mark_ready(&mut self, id: SlotId) {
        if self.slots.mark_ready(id, &mut self.sched) == Readiness::PromoteNow {
            self.promote(id);
        }
    }

    fn promote(&mut self, id: SlotId) {
        if self.slots.promote(id) {
            self.layout.promote(id);
            self.video_changed();
        }
    }

    /// Hands removed bound slots to the coordinator, then lets the registry
    /// forget them.
    fn sync_layout(&mut self) {
        let removed = self.slots.take_removed();
        if removed.is_empty() {
            return;
        }
        for slot in &removed {
            self.layout.remove(slot.id);
        }
        self.video_changed();
    }

    fn video_changed(&mut self) {
        let both = self.slots.bound_count() == 2;
        self.visibility
            .on_video_changed(self.layout.has_video(), both, &mut self.sched);
        if !self.layout.has_video() && self.pip.cancel() {
            info!("pip: nothing left to show, restored full screen");
        }
    }

    // ---- call state -------------------------------------------------------

    pub fn update_call_state(&mut self, update: CallUpdate) {
        debug!("call: {update:?}");
        self.call = Some(update);

        if update.phase.is_ending() {
            for role in Role::ALL {
                self.release(role);
            }
            self.sync_layout();
            self.layout.clear();
        } else {
            self.apply_video_state(Role::Incoming, update.remote_video);
            self.apply_video_state(Role::Outgoing, update.local_video);
            self.sync_layout();
        }

        let both = self.slots.bound_count() == 2;
        self.visibility.on_phase(
            update.phase,
            self.layout.has_video(),
            both,
            &mut self.sched,
        );

        if let Some(t) = self.background.update(update.phase, update.reception) {
            self.start_fade(t);
        }
        self.flush(LayoutTransition::Animated);
    }

    fn apply_video_state(&mut self, role: Role, state: VideoState) {
        if state.wants_view() {
            self.slots.request_slot(role, &mut self.transport);
        } else {
            self.release(role);
        }
    }

    fn start_fade(&mut self, transition: StyleTransition) {
        let duration = self.profile.timing.cross_fade();
        info!("background: {:?} -> {:?}", transition.from, transition.to);
        self.presenter.style_transition(transition, duration);
        self.sched.schedule(duration, ScreenTask::FadeDone);
    }

    // ---- gestures ---------------------------------------------------------

    pub fn pan(&mut self, event: PanEvent) {
        let screen = self.screen.size();
        // every callback counts, so a long drag keeps the ambient timer fresh
        self.visibility.on_interaction(&mut self.sched);
        let transition = match event {
            PanEvent::Began { hit, .. } => {
                let center = self.pip_container_rect().center();
                let mode = self.pip.begin(
                    hit,
                    self.layout.has_video(),
                    self.layout.minimized().is_some(),
                    center,
                );
                if mode == PanMode::Preview {
                    let origin = self.preview_rect().center();
                    self.layout.begin_preview_drag(origin);
                }
                LayoutTransition::Immediate
            }
            PanEvent::Changed { translation } => {
                if self.pip.mode() == Some(PanMode::Preview) {
                    self.layout.drag_preview(translation);
                } else {
                    self.pip.changed(translation, screen);
                }
                LayoutTransition::Immediate
            }
            PanEvent::Ended {
                translation,
                velocity,
            }
            | PanEvent::Cancelled {
                translation,
                velocity,
            } => {
                if self.pip.mode() == Some(PanMode::Preview) {
                    let fling = self.fling();
                    self.layout
                        .end_preview_drag(translation, velocity, screen, &fling);
                }
                if self.pip.end(translation, velocity, screen) == PanOutcome::Dismissed {
                    self.presenter.dismissed();
                }
                LayoutTransition::Spring
            }
        };
        self.flush(transition);
    }

    pub fn tap(&mut self, hit: HitTarget) {
        self.visibility.on_interaction(&mut self.sched);
        if self.pip.restore() {
            self.flush(LayoutTransition::Spring);
            return;
        }
        if self.layout.has_video() {
            if hit == HitTarget::MinimizedPreview && self.layout.minimized().is_some() {
                let now = self.sched.now();
                self.layout.swap(now);
            } else {
                self.visibility.toggle_chrome(true);
            }
        }
        self.flush(LayoutTransition::Animated);
    }

    pub fn touch(&mut self, output: TouchOutput) {
        match output {
            TouchOutput::PanBegan { position } => {
                let hit = self.hit_test(position);
                self.pan(PanEvent::Began { position, hit });
            }
            TouchOutput::PanChanged { translation } => self.pan(PanEvent::Changed { translation }),
            TouchOutput::PanEnded {
                translation,
                velocity,
            } => self.pan(PanEvent::Ended {
                translation,
                velocity,
            }),
            TouchOutput::Tap { position } => {
                let hit = self.hit_test(position);
                self.tap(hit);
            }
        }
    }

    pub fn swap(&mut self) -> bool {
        let now = self.sched.now();
        let swapped = self.layout.swap(now);
        self.flush(LayoutTransition::Animated);
        swapped
    }

    /// Mute, speaker, camera toggle and other button presses.
    pub fn user_interaction(&mut self) {
        self.visibility.on_interaction(&mut self.sched);
        self.flush(LayoutTransition::Animated);
    }

    pub fn expand_from_pip(&mut self) -> bool {
        let expanded = self.pip.expand_from_pip();
        self.flush(LayoutTransition::Spring);
        expanded
    }

    pub fn set_proximity_hold(&mut self, hold: bool) {
        self.visibility.set_proximity_hold(hold);
    }

    /// New screen metrics; frames and hit tests follow at once.
    pub fn resize(&mut self, screen: Screen) {
        info!("screen: resized to {}x{}", screen.width, screen.height);
        self.screen = screen;
        self.flush(LayoutTransition::Animated);
    }

    // ---- time -------------------------------------------------------------

    pub fn advance(&mut self, by: Duration) {
        let target = self.sched.now() + by;
        self.advance_to(target);
    }

    /// Fires every task due by `now`, each as its own event.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some((_, task)) = self.sched.pop_due(now) {
            self.run_task(task);
            self.flush(LayoutTransition::Animated);
        }
        self.sched.settle(now);
    }

    fn run_task(&mut self, task: ScreenTask) {
        debug!("timer: {task:?} at {:?}", self.sched.now());
        match task {
            ScreenTask::AssumeReady(id) => self.mark_ready(id),
            ScreenTask::Promote(id) => self.promote(id),
            ScreenTask::AutoHide => {
                self.visibility.auto_hide_fired(self.layout.has_video());
            }
            ScreenTask::AmbientIdle => {
                self.visibility.ambient_fired();
            }
            ScreenTask::FadeDone => {
                if let Some(t) = self.background.fade_finished() {
                    self.start_fade(t);
                }
            }
        }
    }

    pub fn handle(&mut self, event: ScreenEvent) {
        match event {
            ScreenEvent::Call(update) => self.update_call_state(update),
            ScreenEvent::ViewCreated { slot, view } => self.on_view_created(slot, view),
            ScreenEvent::FirstFrame(view) => self.on_first_frame(view),
            ScreenEvent::Orientation {
                view,
                orientation,
                aspect_ratio,
            } => self.on_orientation_changed(view, orientation, aspect_ratio),
            ScreenEvent::Pan(pan) => self.pan(pan),
            ScreenEvent::Tap(hit) => self.tap(hit),
            ScreenEvent::Touch(output) => self.touch(output),
            ScreenEvent::Interaction => self.user_interaction(),
            ScreenEvent::ExpandFromPip => {
                self.expand_from_pip();
            }
            ScreenEvent::Proximity(hold) => self.set_proximity_hold(hold),
            ScreenEvent::Resize(screen) => self.resize(screen),
        }
    }

    // ---- output -----------------------------------------------------------

    fn flush(&mut self, transition: LayoutTransition) {
        let running = self.visibility.ambient_running();
        if running != self.ambient_shown {
            self.ambient_shown = running;
            self.presenter.ambient_animation(running);
        }

        let layout = self.snapshot();
        if layout == self.shown {
            return;
        }
        self.shown = layout.clone();
        let request = RelayoutRequest {
            at_ms: self.sched.now().as_millis() as u64,
            transition,
            layout,
        };
        self.presenter.relayout(&request);
    }
}

