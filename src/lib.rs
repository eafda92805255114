//! Call-screen layout and gesture controller for a one-to-one video call.
//!
//! [`screen::CallScreen`] owns every piece of state and is driven by call
//! updates, video transport callbacks, touch gestures and its own virtual
//! clock. Rendering and the transport are reached through the
//! [`screen::Presenter`] and [`slots::VideoTransport`] traits.

pub mod background;
pub mod config;
pub mod corner;
pub mod error;
pub mod frames;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod phase;
pub mod pip;
pub mod scheduler;
pub mod screen;
pub mod script;
pub mod slots;
pub mod tracker;
pub mod visibility;

pub use config::{Profile, ProfileStore};
pub use screen::{CallScreen, Presenter, RelayoutRequest, ScreenEvent};
pub use slots::{Role, SlotId, VideoTransport, ViewHandle};
