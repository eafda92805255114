//! Picture-in-picture pan handling.
//!
//! A vertical pan over full-screen video shrinks the whole call view toward
//! a corner (`Collapsing`); once collapsed, panning the container moves it
//! freely (`Dragging`) and release docks it at the predicted corner. Pans
//! that start on the floating preview belong to the layout coordinator, and
//! pans with no video at all drag the screen for interactive dismissal.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::Gestures;
use crate::corner::{self, Corner, FlingThresholds};
use crate::geometry::{Point, Size, Vector};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipGestureState {
    Idle,
    Collapsing { corner_locked_in: bool },
    Dragging { initial: Point, current: Point },
}

/// What the pointer was over when the pan started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitTarget {
    MinimizedPreview,
    Container,
    #[default]
    Outside,
}

/// Which consumer owns the pan in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanMode {
    /// Moving the floating preview inside the screen.
    Preview,
    /// Collapsing into or dragging the PiP container.
    Pip,
    /// Dragging the whole screen with nothing to collapse.
    Dismiss,
    /// Pan outside the PiP container; nothing reacts.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanOutcome {
    Restored,
    EnteredPip,
    Docked(Corner),
    SnappedBack,
    Dismissed,
    Nothing,
}

/// `min(1, |dy| / min(max_offset, height / 2))`, 0 at no travel.
pub fn collapse_fraction(offset_y: f32, screen_height: f32, max_offset: f32) -> f32 {
    let limit = max_offset.min(screen_height / 2.0);
    if offset_y == 0.0 {
        return 0.0;
    }
    if limit <= 0.0 {
        return 1.0;
    }
    (offset_y.abs() / limit).min(1.0)
}

#[derive(Debug)]
pub struct PipController {
    gestures: Gestures,
    state: PipGestureState,
    mode: Option<PanMode>,
    corner: Corner,
    fraction: f32,
    dismiss_offset: f32,
}

impl PipController {
    pub fn new(gestures: Gestures) -> Self {
        Self {
            gestures,
            state: PipGestureState::Idle,
            mode: None,
            corner: Corner::TopRight,
            fraction: 0.0,
            dismiss_offset: 0.0,
        }
    }

    pub fn state(&self) -> PipGestureState {
        self.state
    }

    pub fn mode(&self) -> Option<PanMode> {
        self.mode
    }

    pub fn corner(&self) -> Corner {
        self.corner
    }

    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    pub fn is_active(&self) -> bool {
        self.fraction > 0.0
    }

    pub fn dismiss_offset(&self) -> f32 {
        self.dismiss_offset
    }

    pub fn drag_position(&self) -> Option<Point> {
        match self.state {
            PipGestureState::Dragging { current, .. } => Some(current),
            _ => None,
        }
    }

    fn fling(&self) -> FlingThresholds {
        FlingThresholds::from(&self.gestures)
    }

    /// `container_center` is where the PiP container currently rests.
    pub fn begin(
        &mut self,
        hit: HitTarget,
        has_video: bool,
        has_minimized: bool,
        container_center: Point,
    ) -> PanMode {
        let mode = if hit == HitTarget::MinimizedPreview && !self.is_active() && has_minimized {
            PanMode::Preview
        } else if self.is_active() {
            if hit == HitTarget::Container {
                self.state = PipGestureState::Dragging {
                    initial: container_center,
                    current: container_center,
                };
                PanMode::Pip
            } else {
                PanMode::Ignored
            }
        } else if has_video {
            self.state = PipGestureState::Collapsing {
                corner_locked_in: false,
            };
            PanMode::Pip
        } else {
            PanMode::Dismiss
        };
        debug!("pip: pan began as {mode:?}");
        self.mode = Some(mode);
        mode
    }

    /// Returns true when anything visible moved.
    pub fn changed(&mut self, translation: Vector, screen: Size) -> bool {
        match (self.mode, self.state) {
            (Some(PanMode::Pip), PipGestureState::Collapsing { corner_locked_in }) => {
                let mut locked = corner_locked_in;
                let mut left = self.corner.is_left();
                if !locked && translation.dx.abs() >= self.gestures.corner_lock_min_dx {
                    locked = true;
                    left = translation.dx < 0.0;
                }
                self.state = PipGestureState::Collapsing {
                    corner_locked_in: locked,
                };
                let corner = Corner::from_sides(left, translation.dy < 0.0);
                let fraction = collapse_fraction(
                    translation.dy,
                    screen.height,
                    self.gestures.collapse_max_offset,
                );
                let moved = corner != self.corner || fraction != self.fraction;
                self.corner = corner;
                self.fraction = fraction;
                moved
            }
            (Some(PanMode::Pip), PipGestureState::Dragging { initial, current }) => {
                let next = initial + translation;
                self.state = PipGestureState::Dragging {
                    initial,
                    current: next,
                };
                next != current
            }
            (Some(PanMode::Dismiss), _) => {
                let moved = self.dismiss_offset != translation.dy;
                self.dismiss_offset = translation.dy;
                moved
            }
            _ => false,
        }
    }

    /// Release or cancel.
    pub fn end(&mut self, translation: Vector, velocity: Vector, screen: Size) -> PanOutcome {
        let mode = self.mode.take();
        let state = std::mem::replace(&mut self.state, PipGestureState::Idle);
        match (mode, state) {
            (Some(PanMode::Pip), PipGestureState::Collapsing { .. }) => {
                if velocity.length() < self.gestures.settle_speed && self.fraction < 0.5 {
                    self.fraction = 0.0;
                    PanOutcome::Restored
                } else {
                    self.fraction = 1.0;
                    info!("pip: entered at {:?}", self.corner);
                    PanOutcome::EnteredPip
                }
            }
            (Some(PanMode::Pip), PipGestureState::Dragging { initial, .. }) => {
                let released_at = initial + translation;
                self.corner = corner::resting_corner(released_at, velocity, screen, &self.fling());
                debug!("pip: docked at {:?}", self.corner);
                PanOutcome::Docked(self.corner)
            }
            (Some(PanMode::Dismiss), _) => {
                self.dismiss_offset = 0.0;
                if velocity.dy.abs() < self.gestures.settle_speed {
                    PanOutcome::SnappedBack
                } else {
                    info!("pip: screen dismissed interactively");
                    PanOutcome::Dismissed
                }
            }
            _ => PanOutcome::Nothing,
        }
    }

    /// Restores full screen from a fully collapsed PiP.
    pub fn expand_from_pip(&mut self) -> bool {
        if self.fraction == 1.0 && self.state == PipGestureState::Idle {
            self.fraction = 0.0;
            info!("pip: expanded");
            true
        } else {
            false
        }
    }

    /// Any partial or full collapse goes back to full screen; used on tap.
    pub fn restore(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = PipGestureState::Idle;
        self.mode = None;
        self.fraction = 0.0;
        true
    }

    /// Drops any collapse or container gesture, including one still at zero
    /// travel. Returns true if anything was reset.
    pub fn cancel(&mut self) -> bool {
        let pip_pan = self.mode == Some(PanMode::Pip);
        if !pip_pan && !self.is_active() {
            return false;
        }
        if pip_pan {
            self.mode = None;
        }
        self.state = PipGestureState::Idle;
        self.fraction = 0.0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Size = Size::new(400.0, 800.0);

    fn controller() -> PipController {
        PipController::new(Gestures::default())
    }

    #[test]
    fn fraction_endpoints_and_cap() {
        assert_eq!(collapse_fraction(0.0, 800.0, 300.0), 0.0);
        assert_eq!(collapse_fraction(300.0, 800.0, 300.0), 1.0);
        assert_eq!(collapse_fraction(-450.0, 800.0, 300.0), 1.0);
        assert_eq!(collapse_fraction(150.0, 800.0, 300.0), 0.5);
        // short screens cap at half their height
        assert_eq!(collapse_fraction(200.0, 400.0, 300.0), 1.0);
        assert_eq!(collapse_fraction(100.0, 400.0, 300.0), 0.5);
    }

    #[test]
    fn fraction_is_monotonic() {
        let mut last = 0.0;
        for step in 0..=400 {
            let f = collapse_fraction(step as f32, 800.0, 300.0);
            assert!(f >= last, "fraction dropped at offset {step}");
            assert!((0.0..=1.0).contains(&f));
            last = f;
        }
    }

    #[test]
    fn degenerate_screen_collapses_on_any_travel() {
        assert_eq!(collapse_fraction(0.0, 0.0, 300.0), 0.0);
        assert_eq!(collapse_fraction(1.0, 0.0, 300.0), 1.0);
    }

    #[test]
    fn pan_over_video_starts_collapsing() {
        let mut c = controller();
        assert_eq!(c.begin(HitTarget::Outside, true, false, Point::default()), PanMode::Pip);
        assert_eq!(
            c.state(),
            PipGestureState::Collapsing {
                corner_locked_in: false
            }
        );
    }

    #[test]
    fn preview_hit_goes_to_preview_mode() {
        let mut c = controller();
        let mode = c.begin(HitTarget::MinimizedPreview, true, true, Point::default());
        assert_eq!(mode, PanMode::Preview);
        assert_eq!(c.state(), PipGestureState::Idle);
    }

    #[test]
    fn corner_family_locks_on_first_horizontal_move() {
        let mut c = controller();
        c.begin(HitTarget::Outside, true, false, Point::default());
        c.changed(Vector::new(-5.0, 40.0), SCREEN);
        assert_eq!(c.corner(), Corner::BottomLeft);
        // later rightward motion does not flip the family
        c.changed(Vector::new(50.0, -40.0), SCREEN);
        assert_eq!(c.corner(), Corner::TopLeft);
        assert_eq!(
            c.state(),
            PipGestureState::Collapsing {
                corner_locked_in: true
            }
        );
    }

    #[test]
    fn pure_vertical_pan_keeps_previous_family() {
        let mut c = controller();
        c.begin(HitTarget::Outside, true, false, Point::default());
        c.changed(Vector::new(0.0, 120.0), SCREEN);
        assert_eq!(c.corner(), Corner::BottomRight);
        assert!((c.fraction() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn slow_short_release_restores() {
        let mut c = controller();
        c.begin(HitTarget::Outside, true, false, Point::default());
        c.changed(Vector::new(0.0, 100.0), SCREEN);
        let out = c.end(Vector::new(0.0, 100.0), Vector::new(0.0, 50.0), SCREEN);
        assert_eq!(out, PanOutcome::Restored);
        assert_eq!(c.fraction(), 0.0);
        assert_eq!(c.state(), PipGestureState::Idle);
    }

    #[test]
    fn fast_release_enters_pip_even_when_short() {
        let mut c = controller();
        c.begin(HitTarget::Outside, true, false, Point::default());
        c.changed(Vector::new(3.0, 30.0), SCREEN);
        let out = c.end(Vector::new(3.0, 30.0), Vector::new(0.0, 800.0), SCREEN);
        assert_eq!(out, PanOutcome::EnteredPip);
        assert_eq!(c.fraction(), 1.0);
        assert_eq!(c.corner(), Corner::BottomRight);
    }

    #[test]
    fn long_slow_release_enters_pip() {
        let mut c = controller();
        c.begin(HitTarget::Outside, true, false, Point::default());
        c.changed(Vector::new(-2.0, -200.0), SCREEN);
        let out = c.end(Vector::new(-2.0, -200.0), Vector::ZERO, SCREEN);
        assert_eq!(out, PanOutcome::EnteredPip);
        assert_eq!(c.corner(), Corner::TopLeft);
    }

    #[test]
    fn dragging_container_docks_by_prediction() {
        let mut c = controller();
        c.begin(HitTarget::Outside, true, false, Point::default());
        c.changed(Vector::new(5.0, -300.0), SCREEN);
        c.end(Vector::new(5.0, -300.0), Vector::ZERO, SCREEN);
        assert_eq!(c.corner(), Corner::TopRight);

        let center = Point::new(330.0, 150.0);
        assert_eq!(c.begin(HitTarget::Container, true, false, center), PanMode::Pip);
        assert!(c.changed(Vector::new(-250.0, 10.0), SCREEN));
        assert_eq!(c.drag_position(), Some(Point::new(80.0, 160.0)));
        // released in the top-left quadrant, flung downward
        let out = c.end(Vector::new(-250.0, 10.0), Vector::new(0.0, 900.0), SCREEN);
        assert_eq!(out, PanOutcome::Docked(Corner::BottomLeft));
        assert_eq!(c.fraction(), 1.0);
        assert!(c.drag_position().is_none());
    }

    #[test]
    fn pan_outside_container_is_ignored_in_pip() {
        let mut c = controller();
        c.begin(HitTarget::Outside, true, false, Point::default());
        c.changed(Vector::new(0.0, 400.0), SCREEN);
        c.end(Vector::new(0.0, 400.0), Vector::ZERO, SCREEN);
        assert_eq!(c.begin(HitTarget::Outside, true, false, Point::default()), PanMode::Ignored);
        assert!(!c.changed(Vector::new(10.0, 10.0), SCREEN));
        assert_eq!(c.end(Vector::new(10.0, 10.0), Vector::ZERO, SCREEN), PanOutcome::Nothing);
        assert_eq!(c.fraction(), 1.0);
    }

    #[test]
    fn dismiss_pan_without_video() {
        let mut c = controller();
        assert_eq!(c.begin(HitTarget::Outside, false, false, Point::default()), PanMode::Dismiss);
        assert!(c.changed(Vector::new(0.0, 80.0), SCREEN));
        assert_eq!(c.dismiss_offset(), 80.0);
        assert_eq!(
            c.end(Vector::new(0.0, 80.0), Vector::new(0.0, 20.0), SCREEN),
            PanOutcome::SnappedBack
        );
        c.begin(HitTarget::Outside, false, false, Point::default());
        assert_eq!(
            c.end(Vector::new(0.0, 80.0), Vector::new(0.0, 1200.0), SCREEN),
            PanOutcome::Dismissed
        );
        assert_eq!(c.dismiss_offset(), 0.0);
    }

    #[test]
    fn cancel_clears_collapse_at_zero_travel() {
        let mut c = controller();
        c.begin(HitTarget::Outside, true, false, Point::default());
        assert!(!c.restore());
        assert!(c.cancel());
        assert_eq!(c.state(), PipGestureState::Idle);
        assert_eq!(c.mode(), None);
        assert!(!c.changed(Vector::new(0.0, 400.0), SCREEN));
        assert_eq!(
            c.end(Vector::new(0.0, 400.0), Vector::new(0.0, 1200.0), SCREEN),
            PanOutcome::Nothing
        );
        assert_eq!(c.fraction(), 0.0);
        assert_eq!(c.begin(HitTarget::Outside, false, false, Point::default()), PanMode::Dismiss);
    }

    #[test]
    fn cancel_leaves_dismiss_pan_alone() {
        let mut c = controller();
        c.begin(HitTarget::Outside, false, false, Point::default());
        assert!(!c.cancel());
        assert_eq!(c.mode(), Some(PanMode::Dismiss));
    }

    #[test]
    fn expand_only_from_full_collapse() {
        let mut c = controller();
        assert!(!c.expand_from_pip());
        c.begin(HitTarget::Outside, true, false, Point::default());
        c.changed(Vector::new(0.0, 100.0), SCREEN);
        // mid-gesture: not fully collapsed
        assert!(!c.expand_from_pip());
        c.end(Vector::new(0.0, 400.0), Vector::new(0.0, 900.0), SCREEN);
        assert!(c.expand_from_pip());
        assert_eq!(c.fraction(), 0.0);
    }
}
