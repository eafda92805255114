//! Expanded/minimized role assignment and floating-preview positioning.

use log::{debug, info};
use serde::Serialize;
use std::time::Duration;

use crate::corner::{self, Corner, FlingThresholds};
use crate::geometry::{Point, Size, Vector};
use crate::slots::{Role, SlotId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LayoutRoles {
    pub expanded: Option<SlotId>,
    pub minimized: Option<SlotId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PreviewDrag {
    initial: Point,
    current: Point,
}

#[derive(Debug)]
pub struct LayoutCoordinator {
    roles: LayoutRoles,
    swap_cooldown: Duration,
    swap_blocked_until: Option<Duration>,
    preview_corner: Corner,
    preview_drag: Option<PreviewDrag>,
}

impl LayoutCoordinator {
    pub fn new(swap_cooldown: Duration) -> Self {
        Self {
            roles: LayoutRoles::default(),
            swap_cooldown,
            swap_blocked_until: None,
            preview_corner: Corner::BottomRight,
            preview_drag: None,
        }
    }

    pub fn roles(&self) -> LayoutRoles {
        self.roles
    }

    pub fn expanded(&self) -> Option<SlotId> {
        self.roles.expanded
    }

    pub fn minimized(&self) -> Option<SlotId> {
        self.roles.minimized
    }

    pub fn has_video(&self) -> bool {
        self.roles.expanded.is_some()
    }

    pub fn preview_corner(&self) -> Corner {
        self.preview_corner
    }

    pub fn preview_drag_position(&self) -> Option<Point> {
        self.preview_drag.map(|d| d.current)
    }

    /// Writes both roles. A slot assigned to both is a caller bug; outside
    /// debug builds the newer assignment (`minimized`) wins.
    fn assign(&mut self, expanded: Option<SlotId>, minimized: Option<SlotId>) {
        debug_assert!(
            expanded.is_none() || expanded != minimized,
            "slot {expanded:?} assigned to both layout roles"
        );
        let mut next = LayoutRoles { expanded, minimized };
        if next.expanded.is_some() && next.expanded == next.minimized {
            next.expanded = None;
        }
        if next.expanded.is_none() && next.minimized.is_some() {
            // a lone slot is always shown full-screen
            next.expanded = next.minimized.take();
        }
        self.roles = next;
    }

    /// Places a freshly bound slot.
    pub fn promote(&mut self, id: SlotId) {
        if self.roles.expanded == Some(id) || self.roles.minimized == Some(id) {
            return;
        }
        match (id.role, self.roles.expanded) {
            (_, None) => self.assign(Some(id), self.roles.minimized),
            (Role::Incoming, Some(current)) => self.assign(Some(id), Some(current)),
            (Role::Outgoing, Some(current)) => self.assign(Some(current), Some(id)),
        }
        info!(
            "layout: {} promoted, expanded={:?} minimized={:?}",
            id, self.roles.expanded, self.roles.minimized
        );
    }

    pub fn remove(&mut self, id: SlotId) -> bool {
        if self.roles.expanded == Some(id) {
            let survivor = self.roles.minimized;
            self.assign(survivor, None);
        } else if self.roles.minimized == Some(id) {
            self.assign(self.roles.expanded, None);
        } else {
            return false;
        }
        if self.roles.minimized.is_none() {
            self.preview_drag = None;
        }
        info!("layout: {id} removed, expanded={:?}", self.roles.expanded);
        true
    }

    pub fn clear(&mut self) {
        self.assign(None, None);
        self.preview_drag = None;
    }

    /// Exchanges expanded and minimized. Rejected while a previous swap is
    /// cooling down or when there is nothing to swap.
    pub fn swap(&mut self, now: Duration) -> bool {
        if self.swap_blocked_until.is_some_and(|until| now < until) {
            debug!("layout: swap rejected, cooling down");
            return false;
        }
        let LayoutRoles {
            expanded: Some(e),
            minimized: Some(m),
        } = self.roles
        else {
            return false;
        };
        self.assign(Some(m), Some(e));
        self.swap_blocked_until = Some(now + self.swap_cooldown);
        info!("layout: swapped, {m} now expanded");
        true
    }

    pub fn begin_preview_drag(&mut self, center: Point) -> bool {
        if self.roles.minimized.is_none() {
            return false;
        }
        self.preview_drag = Some(PreviewDrag {
            initial: center,
            current: center,
        });
        true
    }

    pub fn is_dragging_preview(&self) -> bool {
        self.preview_drag.is_some()
    }

    pub fn drag_preview(&mut self, translation: Vector) {
        if let Some(drag) = self.preview_drag.as_mut() {
            drag.current = drag.initial + translation;
        }
    }

    /// Drops the drag and picks the preview's new resting corner.
    pub fn end_preview_drag(
        &mut self,
        translation: Vector,
        velocity: Vector,
        screen: Size,
        th: &FlingThresholds,
    ) -> Option<Corner> {
        let drag = self.preview_drag.take()?;
        let released_at = drag.initial + translation;
        self.preview_corner = corner::resting_corner(released_at, velocity, screen, th);
        debug!("layout: preview rests at {:?}", self.preview_corner);
        Some(self.preview_corner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCOMING: SlotId = SlotId {
        role: Role::Incoming,
        generation: 2,
    };
    const OUTGOING: SlotId = SlotId {
        role: Role::Outgoing,
        generation: 1,
    };

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn coordinator() -> LayoutCoordinator {
        LayoutCoordinator::new(ms(300))
    }

    #[test]
    fn outgoing_alone_is_expanded() {
        let mut c = coordinator();
        c.promote(OUTGOING);
        assert_eq!(c.expanded(), Some(OUTGOING));
        assert_eq!(c.minimized(), None);
    }

    #[test]
    fn incoming_pushes_outgoing_down() {
        let mut c = coordinator();
        c.promote(OUTGOING);
        c.promote(INCOMING);
        assert_eq!(c.expanded(), Some(INCOMING));
        assert_eq!(c.minimized(), Some(OUTGOING));
    }

    #[test]
    fn outgoing_joins_as_minimized() {
        let mut c = coordinator();
        c.promote(INCOMING);
        c.promote(OUTGOING);
        assert_eq!(c.expanded(), Some(INCOMING));
        assert_eq!(c.minimized(), Some(OUTGOING));
    }

    #[test]
    fn removing_expanded_promotes_minimized() {
        let mut c = coordinator();
        c.promote(OUTGOING);
        c.promote(INCOMING);
        assert!(c.remove(INCOMING));
        assert_eq!(c.expanded(), Some(OUTGOING));
        assert_eq!(c.minimized(), None);
        assert!(!c.remove(INCOMING));
    }

    #[test]
    fn removing_minimized_keeps_expanded() {
        let mut c = coordinator();
        c.promote(OUTGOING);
        c.promote(INCOMING);
        assert!(c.remove(OUTGOING));
        assert_eq!(c.expanded(), Some(INCOMING));
        assert_eq!(c.minimized(), None);
    }

    #[test]
    fn swap_is_rate_limited() {
        let mut c = coordinator();
        c.promote(OUTGOING);
        c.promote(INCOMING);
        assert!(c.swap(ms(1000)));
        assert_eq!(c.expanded(), Some(OUTGOING));
        assert!(!c.swap(ms(1299)));
        assert_eq!(c.expanded(), Some(OUTGOING));
        assert!(c.swap(ms(1300)));
        assert_eq!(c.expanded(), Some(INCOMING));
    }

    #[test]
    fn swap_needs_two_slots() {
        let mut c = coordinator();
        c.promote(OUTGOING);
        assert!(!c.swap(ms(0)));
        // a rejected swap does not start the cooldown
        c.promote(INCOMING);
        assert!(c.swap(ms(1)));
    }

    #[test]
    fn preview_drag_snaps_to_predicted_corner() {
        let mut c = coordinator();
        let screen = Size::new(400.0, 800.0);
        assert!(!c.begin_preview_drag(Point::new(300.0, 700.0)));
        c.promote(INCOMING);
        c.promote(OUTGOING);
        assert!(c.begin_preview_drag(Point::new(300.0, 700.0)));
        c.drag_preview(Vector::new(-50.0, -500.0));
        assert_eq!(c.preview_drag_position(), Some(Point::new(250.0, 200.0)));
        let corner = c.end_preview_drag(
            Vector::new(-50.0, -500.0),
            Vector::ZERO,
            screen,
            &FlingThresholds::default(),
        );
        assert_eq!(corner, Some(Corner::TopRight));
        assert_eq!(c.preview_corner(), Corner::TopRight);
        assert!(!c.is_dragging_preview());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn double_assignment_prefers_latest() {
        let mut c = coordinator();
        c.assign(Some(OUTGOING), Some(OUTGOING));
        assert_eq!(c.expanded(), Some(OUTGOING));
        assert_eq!(c.minimized(), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "assigned to both layout roles")]
    fn double_assignment_asserts_in_debug() {
        let mut c = coordinator();
        c.assign(Some(OUTGOING), Some(OUTGOING));
    }
}
