//! Audio engine and instance driver contracts
//!
//! The domain drives one audio engine per site and one driver per
//! hardware unit; both collaborate purely through these messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::change::{ModifySessionSpec, PlaySession, RenderSession};
use crate::ids::{AppSessionId, DynamicId, ParameterId, PlayId, RenderId, ReportId};
use crate::session::{MultiChannelValue, SessionSpec};

// ============ Audio Engine ============

/// Commands the domain sends to the audio engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEngineCommand {
    SetSpec {
        session_id: AppSessionId,
        spec: SessionSpec,
    },
    ModifySpec {
        session_id: AppSessionId,
        transaction: Vec<ModifySessionSpec>,
    },
    SetDynamicParameters {
        session_id: AppSessionId,
        dynamic_id: DynamicId,
        parameters: HashMap<ParameterId, MultiChannelValue>,
    },
    Play {
        session_id: AppSessionId,
        play: PlaySession,
    },
    Render {
        session_id: AppSessionId,
        render: RenderSession,
    },
    Stop {
        session_id: AppSessionId,
    },
    Close {
        session_id: AppSessionId,
    },
}

/// Events the audio engine reports back to the domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEngineEvent {
    Loaded,
    Stopped {
        session_id: AppSessionId,
    },
    Playing {
        session_id: AppSessionId,
        play_id: PlayId,
    },
    PlayingFailed {
        session_id: AppSessionId,
        play_id: PlayId,
        error: String,
    },
    Rendering {
        session_id: AppSessionId,
        render_id: RenderId,
    },
    RenderingFinished {
        session_id: AppSessionId,
        render_id: RenderId,
        path: String,
    },
    RenderingFailed {
        session_id: AppSessionId,
        render_id: RenderId,
        error: String,
    },
    Error {
        session_id: AppSessionId,
        error: AudioEngineError,
    },
}

/// Errors originating inside the audio engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum AudioEngineError {
    #[error("Track {0} not found")]
    TrackNotFound(usize),

    #[error("Item {0} on track {1} not found")]
    ItemNotFound(usize, usize),

    #[error("Internal sound engine error: {0}")]
    InternalError(String),

    #[error("Remote call failed: {0}")]
    RPC(String),
}

// ============ Instance Drivers ============

/// Commands a hardware instance driver accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceDriverCommand {
    CheckConnection,
    Stop,
    Play { play_id: PlayId },
    Render { length: f64, render_id: RenderId },
    Rewind { to: f64 },
    SetParameters(HashMap<ParameterId, MultiChannelValue>),
}

/// Events a hardware instance driver reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceDriverEvent {
    /// Driver process came up
    Started,

    /// I/O error while talking to the device
    IOError { error: String },

    /// Driver lost its link to the hardware
    ConnectionLost,

    /// Driver (re)connected to the hardware
    Connected,

    /// Metering values reported by the hardware
    Metering {
        meters: HashMap<ReportId, MultiChannelValue>,
    },
}

/// Errors originating inside an instance driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum InstanceDriverError {
    #[error("Parameter {parameter} does not exist")]
    ParameterDoesNotExist { parameter: String },

    #[error("Media is not present, can't play or rewind")]
    MediaNotPresent,

    #[error("Driver can't guarantee that playback won't be interrupted")]
    NotInterruptable,

    #[error("Remote call failed: {error}")]
    RPC { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{AppId, SessionId};

    #[test]
    fn test_engine_event_wire_shape() {
        let event = AudioEngineEvent::PlayingFailed {
            session_id: AppSessionId::new(AppId::from("app"), SessionId::from("s1")),
            play_id: PlayId::new(9),
            error: "device lost".to_owned(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["playing_failed"]["session_id"], "app/s1");
        assert_eq!(json["playing_failed"]["play_id"], 9);
    }

    #[test]
    fn test_driver_error_messages() {
        let err = InstanceDriverError::ParameterDoesNotExist { parameter: "drive".to_owned() };
        assert_eq!(err.to_string(), "Parameter drive does not exist");
    }
}
