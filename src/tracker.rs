//! Single-pointer touch tracking: raw multitouch axes in, pans and taps out.
//!
//! Only the first finger down is followed; later contacts are ignored until
//! it lifts. Positions are normalised against the profile's axis ranges and
//! scaled to screen points.

use crate::config::Touch;
use crate::geometry::{Point, Size, Vector};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchOutput {
    PanBegan { position: Point },
    PanChanged { translation: Vector },
    PanEnded { translation: Vector, velocity: Vector },
    Tap { position: Point },
}

#[derive(Debug, Clone, Copy, Default)]
struct Contact {
    current: Point,
    seen_x: bool,
    seen_y: bool,
    // set on the first report with both axes known
    start: Option<(Point, u64)>,
    last: Point,
    last_ms: u64,
    velocity: Vector,
    panning: bool,
    lifted: bool,
}

#[derive(Debug)]
pub struct Tracker {
    touch: Touch,
    screen: Size,
    cur_slot: i32,
    primary: Option<i32>,
    contact: Option<Contact>,
}

impl Tracker {
    pub fn new(touch: Touch, screen: Size) -> Self {
        Self {
            touch,
            screen,
            cur_slot: 0,
            primary: None,
            contact: None,
        }
    }

    pub fn is_touching(&self) -> bool {
        self.contact.is_some()
    }

    pub fn on_slot(&mut self, slot: i32) {
        self.cur_slot = slot.max(0);
    }

    pub fn on_tracking_id(&mut self, tracking_id: i32) {
        if tracking_id >= 0 {
            if self.primary.is_none() {
                self.primary = Some(self.cur_slot);
                self.contact = Some(Contact::default());
            }
        } else if self.primary == Some(self.cur_slot) {
            if let Some(c) = self.contact.as_mut() {
                c.lifted = true;
            }
        }
    }

    fn primary_contact(&mut self) -> Option<&mut Contact> {
        if self.primary != Some(self.cur_slot) {
            return None;
        }
        self.contact.as_mut()
    }

    pub fn on_pos_x(&mut self, raw: i32) {
        let (min, max) = (self.touch.x_min, self.touch.x_max.max(self.touch.x_min + 1));
        let x = ((raw - min) as f32 / (max - min) as f32).clamp(0.0, 1.0) * self.screen.width;
        if let Some(c) = self.primary_contact() {
            c.current.x = x;
            c.seen_x = true;
        }
    }

    pub fn on_pos_y(&mut self, raw: i32) {
        let (min, max) = (self.touch.y_min, self.touch.y_max.max(self.touch.y_min + 1));
        let y = ((raw - min) as f32 / (max - min) as f32).clamp(0.0, 1.0) * self.screen.height;
        if let Some(c) = self.primary_contact() {
            c.current.y = y;
            c.seen_y = true;
        }
    }

    fn moved_norm(&self, delta: Vector) -> f32 {
        let nx = delta.dx / self.screen.width.max(1.0);
        let ny = delta.dy / self.screen.height.max(1.0);
        (nx * nx + ny * ny).sqrt()
    }

    /// End of an input frame. `now_ms` is a monotonic timestamp.
    pub fn on_syn_report(&mut self, now_ms: u64) -> Vec<TouchOutput> {
        let mut out = Vec::new();
        let Some(mut c) = self.contact else {
            return out;
        };

        if !(c.seen_x && c.seen_y) {
            if c.lifted {
                self.reset();
            }
            return out;
        }

        let (start, start_ms) = match c.start {
            Some(s) => s,
            None => {
                c.start = Some((c.current, now_ms));
                c.last = c.current;
                c.last_ms = now_ms;
                (c.current, now_ms)
            }
        };

        if now_ms > c.last_ms && c.current != c.last {
            let dt = (now_ms - c.last_ms) as f32 / 1000.0;
            c.velocity = Vector::new(
                (c.current.x - c.last.x) / dt,
                (c.current.y - c.last.y) / dt,
            );
            c.last = c.current;
            c.last_ms = now_ms;
        } else if now_ms.saturating_sub(c.last_ms) > 50 {
            // finger held still
            c.velocity = Vector::ZERO;
        }

        let translation = c.current - start;
        if !c.panning && self.moved_norm(translation) > self.touch.tap_move_tol {
            c.panning = true;
            out.push(TouchOutput::PanBegan { position: start });
        }

        if c.lifted {
            if c.panning {
                out.push(TouchOutput::PanEnded {
                    translation,
                    velocity: c.velocity,
                });
            } else if now_ms.saturating_sub(start_ms) <= self.touch.tap_ms {
                out.push(TouchOutput::Tap { position: start });
            }
            self.reset();
            return out;
        }

        if c.panning {
            out.push(TouchOutput::PanChanged { translation });
        }
        self.contact = Some(c);
        out
    }

    fn reset(&mut self) {
        self.primary = None;
        self.contact = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> Tracker {
        let touch = Touch {
            x_min: 0,
            x_max: 1000,
            y_min: 0,
            y_max: 1000,
            tap_ms: 200,
            tap_move_tol: 0.02,
        };
        Tracker::new(touch, Size::new(400.0, 800.0))
    }

    fn down(t: &mut Tracker, x: i32, y: i32) {
        t.on_slot(0);
        t.on_tracking_id(7);
        t.on_pos_x(x);
        t.on_pos_y(y);
    }

    fn move_to(t: &mut Tracker, x: i32, y: i32) {
        t.on_slot(0);
        t.on_pos_x(x);
        t.on_pos_y(y);
    }

    fn up(t: &mut Tracker) {
        t.on_slot(0);
        t.on_tracking_id(-1);
    }

    #[test]
    fn quick_still_touch_is_a_tap() {
        let mut t = tracker();
        down(&mut t, 500, 500);
        assert!(t.on_syn_report(0).is_empty());
        up(&mut t);
        assert_eq!(
            t.on_syn_report(120),
            vec![TouchOutput::Tap {
                position: Point::new(200.0, 400.0)
            }]
        );
        assert!(!t.is_touching());
    }

    #[test]
    fn long_press_is_nothing() {
        let mut t = tracker();
        down(&mut t, 500, 500);
        t.on_syn_report(0);
        up(&mut t);
        assert!(t.on_syn_report(900).is_empty());
    }

    #[test]
    fn drag_becomes_pan_with_velocity() {
        let mut t = tracker();
        down(&mut t, 500, 100);
        t.on_syn_report(0);

        move_to(&mut t, 500, 200);
        let out = t.on_syn_report(100);
        assert_eq!(
            out,
            vec![
                TouchOutput::PanBegan {
                    position: Point::new(200.0, 80.0)
                },
                TouchOutput::PanChanged {
                    translation: Vector::new(0.0, 80.0)
                },
            ]
        );

        up(&mut t);
        match t.on_syn_report(110).as_slice() {
            [TouchOutput::PanEnded {
                translation,
                velocity,
            }] => {
                assert_eq!(*translation, Vector::new(0.0, 80.0));
                assert!((velocity.dy - 800.0).abs() < 1e-2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn second_finger_is_ignored() {
        let mut t = tracker();
        down(&mut t, 500, 500);
        t.on_syn_report(0);

        t.on_slot(1);
        t.on_tracking_id(9);
        t.on_pos_x(0);
        t.on_pos_y(0);
        assert!(t.on_syn_report(10).is_empty());

        t.on_slot(1);
        t.on_tracking_id(-1);
        assert!(t.on_syn_report(20).is_empty());
        assert!(t.is_touching());
    }
}
