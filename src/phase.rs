//! Call-state input consumed from the signaling layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Waiting,
    Connecting,
    Ringing,
    Requesting,
    Active,
    Reconnecting,
    Terminating,
    Terminated,
}

impl CallPhase {
    pub fn is_ending(self) -> bool {
        matches!(self, CallPhase::Terminating | CallPhase::Terminated)
    }

    /// Phases in which the call-control chrome may be hidden.
    pub fn allows_hidden_chrome(self) -> bool {
        matches!(
            self,
            CallPhase::Active | CallPhase::Connecting | CallPhase::Reconnecting
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoState {
    #[default]
    Inactive,
    Active,
    Paused,
}

impl VideoState {
    /// Active and paused both keep a view around; only inactive tears it down.
    pub fn wants_view(self) -> bool {
        !matches!(self, VideoState::Inactive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallUpdate {
    pub phase: CallPhase,
    /// Reception bars as reported by the transport, if known.
    #[serde(default)]
    pub reception: Option<u8>,
    #[serde(default)]
    pub remote_video: VideoState,
    #[serde(default)]
    pub local_video: VideoState,
}

impl CallUpdate {
    pub fn new(phase: CallPhase) -> Self {
        Self {
            phase,
            reception: None,
            remote_video: VideoState::Inactive,
            local_video: VideoState::Inactive,
        }
    }

    pub fn with_reception(mut self, bars: u8) -> Self {
        self.reception = Some(bars);
        self
    }

    pub fn with_remote_video(mut self, state: VideoState) -> Self {
        self.remote_video = state;
        self
    }

    pub fn with_local_video(mut self, state: VideoState) -> Self {
        self.local_video = state;
        self
    }
}
