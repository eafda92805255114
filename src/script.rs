//! Scripted call timelines, replayed against a `CallScreen` offline.
//!
//! ```toml
//! until_ms = 5000
//!
//! [[step]]
//! at_ms = 0
//! kind = "call"
//! phase = "active"
//! local_video = "active"
//!
//! [[step]]
//! at_ms = 120
//! kind = "view_created"
//! role = "outgoing"
//! ```

use log::{debug, error, warn};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::background::StyleTransition;
use crate::config::Profile;
use crate::error::ScriptError;
use crate::geometry::{Point, Vector};
use crate::phase::{CallPhase, CallUpdate, VideoState};
use crate::pip::HitTarget;
use crate::screen::{CallScreen, PanEvent, Presenter, RelayoutRequest};
use crate::slots::{Orientation, Role, SlotId, VideoTransport, ViewHandle};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Call {
        phase: CallPhase,
        #[serde(default)]
        reception: Option<u8>,
        #[serde(default)]
        remote_video: VideoState,
        #[serde(default)]
        local_video: VideoState,
    },
    /// The transport answers the role's outstanding request.
    ViewCreated {
        role: Role,
        /// Creation failed; no view is delivered.
        #[serde(default)]
        failed: bool,
    },
    FirstFrame {
        role: Role,
    },
    Orientation {
        role: Role,
        orientation: Orientation,
        aspect_ratio: f32,
    },
    PanBegan {
        x: f32,
        y: f32,
        /// Hit-tested against the current frames when absent.
        #[serde(default)]
        hit: Option<HitTarget>,
    },
    PanChanged {
        dx: f32,
        dy: f32,
    },
    PanEnded {
        dx: f32,
        dy: f32,
        #[serde(default)]
        vx: f32,
        #[serde(default)]
        vy: f32,
    },
    Tap {
        #[serde(default)]
        x: f32,
        #[serde(default)]
        y: f32,
        #[serde(default)]
        hit: Option<HitTarget>,
    },
    Interaction,
    Swap,
    ExpandFromPip,
    Proximity {
        hold: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Script {
    /// Keep the clock running after the last step.
    #[serde(default)]
    pub until_ms: Option<u64>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let script: Script = toml::from_str(text)?;
        let mut prev_ms = 0;
        for (index, step) in script.steps.iter().enumerate() {
            if step.at_ms < prev_ms {
                return Err(ScriptError::OutOfOrder {
                    index,
                    at_ms: step.at_ms,
                    prev_ms,
                });
            }
            prev_ms = step.at_ms;
        }
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn end_ms(&self) -> u64 {
        let last = self.steps.last().map_or(0, |s| s.at_ms);
        self.until_ms.map_or(last, |u| u.max(last))
    }
}

/// Transport stand-in: remembers outstanding requests per role and mints
/// view handles when the script says a view arrived.
#[derive(Debug, Default)]
pub struct ReplayTransport {
    next_view: u64,
    pending: HashMap<Role, SlotId>,
    views: HashMap<Role, ViewHandle>,
    pub requested: Vec<SlotId>,
    pub released: Vec<ViewHandle>,
}

impl ReplayTransport {
    /// Takes the role's outstanding request and, unless creation failed,
    /// mints a view for it.
    pub fn deliver(&mut self, role: Role, failed: bool) -> Option<(SlotId, Option<ViewHandle>)> {
        let id = self.pending.remove(&role)?;
        if failed {
            return Some((id, None));
        }
        self.next_view += 1;
        let view = ViewHandle(self.next_view);
        self.views.insert(role, view);
        Some((id, Some(view)))
    }

    /// Last view minted for the role.
    pub fn view(&self, role: Role) -> Option<ViewHandle> {
        self.views.get(&role).copied()
    }
}

impl VideoTransport for ReplayTransport {
    fn create_view(&mut self, slot: SlotId) {
        self.pending.insert(slot.role, slot);
        self.requested.push(slot);
    }

    fn release(&mut self, view: ViewHandle) {
        self.released.push(view);
    }
}

/// Writes one JSON object per presenter call.
pub struct JsonLinesPresenter<W: Write> {
    out: W,
    pub relayouts: usize,
}

impl<W: Write> JsonLinesPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, relayouts: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: serde_json::Value) {
        if let Err(e) = writeln!(self.out, "{line}") {
            error!("replay output failed: {e}");
        }
    }
}

impl<W: Write> Presenter for JsonLinesPresenter<W> {
    fn relayout(&mut self, request: &RelayoutRequest) {
        self.relayouts += 1;
        self.emit(json!({ "event": "relayout", "layout": request }));
    }

    fn style_transition(&mut self, transition: StyleTransition, duration: Duration) {
        self.emit(json!({
            "event": "background",
            "from": transition.from,
            "to": transition.to,
            "duration_ms": duration.as_millis() as u64,
        }));
    }

    fn ambient_animation(&mut self, running: bool) {
        self.emit(json!({ "event": "ambient", "running": running }));
    }

    fn dismissed(&mut self) {
        self.emit(json!({ "event": "dismissed" }));
    }
}

fn apply<P: Presenter>(screen: &mut CallScreen<ReplayTransport, P>, action: &Action) {
    match *action {
        Action::Call {
            phase,
            reception,
            remote_video,
            local_video,
        } => {
            let mut update = CallUpdate::new(phase)
                .with_remote_video(remote_video)
                .with_local_video(local_video);
            update.reception = reception;
            screen.update_call_state(update);
        }
        Action::ViewCreated { role, failed } => match screen.transport_mut().deliver(role, failed) {
            Some((id, view)) => screen.on_view_created(id, view),
            None => warn!("script: no outstanding {role:?} request"),
        },
        Action::FirstFrame { role } => match screen.transport().view(role) {
            Some(view) => screen.on_first_frame(view),
            None => warn!("script: {role:?} never received a view"),
        },
        Action::Orientation {
            role,
            orientation,
            aspect_ratio,
        } => match screen.transport().view(role) {
            Some(view) => screen.on_orientation_changed(view, orientation, aspect_ratio),
            None => warn!("script: {role:?} never received a view"),
        },
        Action::PanBegan { x, y, hit } => {
            let position = Point::new(x, y);
            let hit = hit.unwrap_or_else(|| screen.hit_test(position));
            screen.pan(PanEvent::Began { position, hit });
        }
        Action::PanChanged { dx, dy } => screen.pan(PanEvent::Changed {
            translation: Vector::new(dx, dy),
        }),
        Action::PanEnded { dx, dy, vx, vy } => screen.pan(PanEvent::Ended {
            translation: Vector::new(dx, dy),
            velocity: Vector::new(vx, vy),
        }),
        Action::Tap { x, y, hit } => {
            let hit = hit.unwrap_or_else(|| screen.hit_test(Point::new(x, y)));
            screen.tap(hit);
        }
        Action::Interaction => screen.user_interaction(),
        Action::Swap => {
            screen.swap();
        }
        Action::ExpandFromPip => {
            screen.expand_from_pip();
        }
        Action::Proximity { hold } => screen.set_proximity_hold(hold),
    }
}

/// Runs the whole timeline and returns the screen in its final state.
pub fn replay<P: Presenter>(
    script: &Script,
    profile: Profile,
    presenter: P,
) -> CallScreen<ReplayTransport, P> {
    let mut screen = CallScreen::new(profile, ReplayTransport::default(), presenter);
    for step in &script.steps {
        screen.advance_to(Duration::from_millis(step.at_ms));
        debug!("script: {} ms {:?}", step.at_ms, step.action);
        apply(&mut screen, &step.action);
    }
    screen.advance_to(Duration::from_millis(script.end_ms()));
    screen
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PARTY: &str = r#"
        until_ms = 400

        [[step]]
        at_ms = 0
        kind = "call"
        phase = "ringing"

        [[step]]
        at_ms = 10
        kind = "call"
        phase = "active"
        reception = 4
        local_video = "active"

        [[step]]
        at_ms = 20
        kind = "view_created"
        role = "outgoing"

        [[step]]
        at_ms = 30
        kind = "first_frame"
        role = "outgoing"

        [[step]]
        at_ms = 40
        kind = "call"
        phase = "active"
        reception = 4
        local_video = "active"
        remote_video = "active"

        [[step]]
        at_ms = 50
        kind = "view_created"
        role = "incoming"

        [[step]]
        at_ms = 60
        kind = "first_frame"
        role = "incoming"
    "#;

    #[test]
    fn parses_tagged_steps() {
        let script = Script::parse(TWO_PARTY).unwrap();
        assert_eq!(script.steps.len(), 7);
        assert_eq!(
            script.steps[2].action,
            Action::ViewCreated {
                role: Role::Outgoing,
                failed: false
            }
        );
        assert_eq!(script.end_ms(), 400);
    }

    #[test]
    fn rejects_backwards_time() {
        let text = r#"
            [[step]]
            at_ms = 50
            kind = "interaction"

            [[step]]
            at_ms = 10
            kind = "interaction"
        "#;
        let err = Script::parse(text).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::OutOfOrder {
                index: 1,
                at_ms: 10,
                prev_ms: 50
            }
        ));
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let text = "[[step]]\nat_ms = 0\nkind = \"wave\"\n";
        assert!(matches!(Script::parse(text), Err(ScriptError::Parse(_))));
    }

    #[test]
    fn two_party_replay_emits_two_relayouts() {
        let script = Script::parse(TWO_PARTY).unwrap();
        let screen = replay(&script, Profile::default(), JsonLinesPresenter::new(Vec::new()));
        assert_eq!(screen.presenter().relayouts, 2);

        let roles = screen.roles();
        assert_eq!(roles.expanded.map(|id| id.role), Some(Role::Incoming));
        assert_eq!(roles.minimized.map(|id| id.role), Some(Role::Outgoing));

        let screen_out = screen.into_presenter().into_inner();
        let text = String::from_utf8(screen_out).unwrap();
        let relayouts = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .filter(|v| v["event"] == "relayout")
            .count();
        assert_eq!(relayouts, 2);
        assert!(text.contains("\"background\""));
    }

    #[test]
    fn failed_view_leaves_role_unavailable() {
        let text = r#"
            [[step]]
            at_ms = 0
            kind = "call"
            phase = "active"
            local_video = "active"

            [[step]]
            at_ms = 5
            kind = "view_created"
            role = "outgoing"
            failed = true
        "#;
        let script = Script::parse(text).unwrap();
        let screen = replay(&script, Profile::default(), JsonLinesPresenter::new(Vec::new()));
        assert!(!screen.video_available(Role::Outgoing));
        assert_eq!(screen.presenter().relayouts, 0);
    }
}
