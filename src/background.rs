//! Ambience style selection with single-flight cross-fades.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::phase::CallPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStyle {
    /// Not connected yet, or the call is over.
    Neutral,
    Good,
    Degraded,
}

pub fn style_for(phase: CallPhase, reception: Option<u8>, degraded_below: u8) -> BackgroundStyle {
    match phase {
        CallPhase::Active | CallPhase::Reconnecting => match reception {
            Some(bars) if bars < degraded_below => BackgroundStyle::Degraded,
            _ => BackgroundStyle::Good,
        },
        _ => BackgroundStyle::Neutral,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleTransition {
    pub from: BackgroundStyle,
    pub to: BackgroundStyle,
}

#[derive(Debug)]
pub struct BackgroundSelector {
    degraded_below: u8,
    current: BackgroundStyle,
    desired: BackgroundStyle,
    fading: bool,
}

impl BackgroundSelector {
    pub fn new(degraded_below: u8) -> Self {
        Self {
            degraded_below,
            current: BackgroundStyle::Neutral,
            desired: BackgroundStyle::Neutral,
            fading: false,
        }
    }

    pub fn current(&self) -> BackgroundStyle {
        self.current
    }

    pub fn is_fading(&self) -> bool {
        self.fading
    }

    /// Records the latest desired style and starts a fade when allowed.
    pub fn update(&mut self, phase: CallPhase, reception: Option<u8>) -> Option<StyleTransition> {
        self.desired = style_for(phase, reception, self.degraded_below);
        self.try_start()
    }

    /// The running fade finished; catches up with whatever is desired now.
    pub fn fade_finished(&mut self) -> Option<StyleTransition> {
        self.fading = false;
        self.try_start()
    }

    fn try_start(&mut self) -> Option<StyleTransition> {
        if self.fading {
            debug!("background: {:?} deferred, fade in flight", self.desired);
            return None;
        }
        if self.desired == self.current {
            return None;
        }
        let transition = StyleTransition {
            from: self.current,
            to: self.desired,
        };
        self.current = self.desired;
        self.fading = true;
        Some(transition)
    }
}
