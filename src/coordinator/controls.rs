//! Control affordances derived from the machine state

use super::machine::{MachineState, Playback, RecordingPhase};
use serde::Serialize;

/// Whether a control can be used and whether it is shown at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Affordance {
    pub enabled: bool,
    pub visible: bool,
}

impl Affordance {
    pub const ENABLED: Affordance = Affordance {
        enabled: true,
        visible: true,
    };
    pub const DISABLED: Affordance = Affordance {
        enabled: false,
        visible: true,
    };
    pub const HIDDEN: Affordance = Affordance {
        enabled: false,
        visible: false,
    };

    fn shown(enabled: bool) -> Self {
        if enabled {
            Self::ENABLED
        } else {
            Self::DISABLED
        }
    }
}

/// What the host can do, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_pause: bool,
    pub can_record: bool,
}

/// Affordances of every control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub play: Affordance,
    pub pause: Affordance,
    pub resume: Affordance,
    pub stop: Affordance,
    pub record: Affordance,
}

impl Controls {
    pub fn for_state(state: &MachineState, caps: Capabilities) -> Self {
        let requesting = state.is_requesting();
        let record_ready = state.playback == Playback::Idle && state.recording == RecordingPhase::Inactive;

        let record = if caps.can_record {
            Affordance::shown(record_ready)
        } else {
            Affordance::HIDDEN
        };

        match state.playback {
            Playback::Idle => Controls {
                play: Affordance::shown(!requesting),
                pause: Affordance::HIDDEN,
                resume: Affordance::HIDDEN,
                // Stop cancels a pending microphone request
                stop: Affordance::shown(requesting),
                record,
            },
            Playback::Speaking => Controls {
                play: Affordance::HIDDEN,
                pause: Affordance::shown(caps.can_pause),
                resume: Affordance::HIDDEN,
                stop: Affordance::ENABLED,
                record,
            },
            Playback::Paused => Controls {
                play: Affordance::HIDDEN,
                pause: Affordance::HIDDEN,
                resume: Affordance::ENABLED,
                stop: Affordance::ENABLED,
                record,
            },
        }
    }
}
