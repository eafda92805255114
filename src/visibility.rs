//! Call-control chrome visibility and the ambient idle animation.

use log::{debug, info};

use crate::config::Timing;
use crate::phase::CallPhase;
use crate::scheduler::{Scheduler, TimerId};
use crate::screen::ScreenTask;

#[derive(Debug)]
pub struct VisibilityScheduler {
    timing: Timing,
    phase: Option<CallPhase>,
    chrome_hidden: bool,
    auto_hide: Option<TimerId>,
    auto_hide_used: bool,
    ambient_running: bool,
    ambient_timer: Option<TimerId>,
    proximity_hold: bool,
}

impl VisibilityScheduler {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            phase: None,
            chrome_hidden: false,
            auto_hide: None,
            auto_hide_used: false,
            ambient_running: true,
            ambient_timer: None,
            proximity_hold: false,
        }
    }

    pub fn chrome_visible(&self) -> bool {
        !self.chrome_hidden
    }

    pub fn ambient_running(&self) -> bool {
        self.ambient_running
    }

    pub fn auto_hide_pending(&self) -> bool {
        self.auto_hide.is_some()
    }

    fn is_active(&self) -> bool {
        self.phase == Some(CallPhase::Active)
    }

    fn cancel_auto_hide(&mut self, sched: &mut Scheduler<ScreenTask>) {
        if let Some(t) = self.auto_hide.take() {
            sched.cancel(t);
            debug!("visibility: auto-hide cancelled");
        }
    }

    fn restart_ambient_timer(&mut self, sched: &mut Scheduler<ScreenTask>) {
        if let Some(t) = self.ambient_timer.take() {
            sched.cancel(t);
        }
        self.ambient_timer = Some(sched.schedule(self.timing.ambient_idle(), ScreenTask::AmbientIdle));
    }

    fn enforce_visible(&mut self, has_video: bool) {
        let may_hide = has_video && self.phase.is_some_and(CallPhase::allows_hidden_chrome);
        if !may_hide {
            self.chrome_hidden = false;
        }
    }

    pub fn on_phase(
        &mut self,
        phase: CallPhase,
        has_video: bool,
        both_bound: bool,
        sched: &mut Scheduler<ScreenTask>,
    ) {
        let was_active = self.is_active();
        self.phase = Some(phase);
        let active = self.is_active();

        if was_active && !active {
            self.cancel_auto_hide(sched);
            if let Some(t) = self.ambient_timer.take() {
                sched.cancel(t);
            }
        } else if !was_active && active {
            self.restart_ambient_timer(sched);
        }
        self.on_video_changed(has_video, both_bound, sched);
    }

    /// Called after every change to the set of bound slots.
    pub fn on_video_changed(
        &mut self,
        has_video: bool,
        both_bound: bool,
        sched: &mut Scheduler<ScreenTask>,
    ) {
        self.enforce_visible(has_video);
        if self.is_active() && both_bound && !self.auto_hide_used {
            self.auto_hide_used = true;
            self.auto_hide = Some(sched.schedule(self.timing.auto_hide(), ScreenTask::AutoHide));
            debug!("visibility: auto-hide armed");
        }
    }

    /// Tap, pan, mute, camera toggle, ... Cancels a pending auto-hide for
    /// good and keeps the ambient animation alive.
    pub fn on_interaction(&mut self, sched: &mut Scheduler<ScreenTask>) {
        self.cancel_auto_hide(sched);
        self.ambient_running = true;
        if self.is_active() {
            self.restart_ambient_timer(sched);
        }
    }

    /// Tap on the video area. Returns true if visibility flipped.
    pub fn toggle_chrome(&mut self, has_video: bool) -> bool {
        if !has_video || !self.phase.is_some_and(CallPhase::allows_hidden_chrome) {
            return false;
        }
        self.chrome_hidden = !self.chrome_hidden;
        true
    }

    pub fn auto_hide_fired(&mut self, has_video: bool) -> bool {
        self.auto_hide = None;
        if self.chrome_hidden || !has_video || !self.phase.is_some_and(CallPhase::allows_hidden_chrome) {
            return false;
        }
        self.chrome_hidden = true;
        info!("visibility: chrome auto-hidden");
        true
    }

    pub fn ambient_fired(&mut self) -> bool {
        self.ambient_timer = None;
        if self.proximity_hold || !self.is_active() || !self.ambient_running {
            return false;
        }
        self.ambient_running = false;
        debug!("visibility: ambient animation stopped");
        true
    }

    pub fn set_proximity_hold(&mut self, hold: bool) {
        self.proximity_hold = hold;
    }
}
