//! Structural modifications and playback state
//!
//! The modification vocabulary a client batches against a session
//! version, and the desired/actual playback state machine types the
//! domain reconciles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{
    AppMediaObjectId, ConnectionId, DynamicId, FixedId, MediaId, MediaObjectId, MixerId,
    ParameterId, PlayId, RenderId, SecureKey, TrackId,
};
use crate::session::{
    DynamicInstance, FixedInstance, Mixer, MixerChannels, MultiChannelValue, NodePad,
    SessionSecurity, TimeSegment, TrackChannels, TrackMedia, UpdateTrackMedia,
};
use crate::time::Timestamped;

// ============ Modification Vocabulary ============

/// One structural modification of a session spec
///
/// Applied in ordered batches; the whole batch succeeds or none of it
/// does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifySessionSpec {
    AddTrack {
        track_id: TrackId,
        channels: TrackChannels,
    },
    AddTrackMedia {
        track_id: TrackId,
        media_id: MediaId,
        spec: TrackMedia,
    },
    UpdateTrackMedia {
        track_id: TrackId,
        media_id: MediaId,
        update: UpdateTrackMedia,
    },
    DeleteTrackMedia {
        track_id: TrackId,
        media_id: MediaId,
    },
    DeleteTrack {
        track_id: TrackId,
    },
    AddFixedInstance {
        fixed_id: FixedId,
        process: FixedInstance,
    },
    AddDynamicInstance {
        dynamic_id: DynamicId,
        process: DynamicInstance,
    },
    AddMixer {
        mixer_id: MixerId,
        mixer: Mixer,
    },
    DeleteMixer {
        mixer_id: MixerId,
    },
    DeleteFixedInstance {
        fixed_id: FixedId,
    },
    DeleteDynamicInstance {
        dynamic_id: DynamicId,
    },
    DeleteConnection {
        connection_id: ConnectionId,
    },
    AddConnection {
        connection_id: ConnectionId,
        from: NodePad,
        to: NodePad,
        from_channels: MixerChannels,
        to_channels: MixerChannels,
        volume: f64,
        pan: f64,
    },
    SetConnectionParameterValues {
        connection_id: ConnectionId,
        values: ConnectionValues,
    },
    SetFixedInstanceParameterValues {
        fixed_id: FixedId,
        values: HashMap<ParameterId, MultiChannelValue>,
    },
    SetDynamicInstanceParameterValues {
        dynamic_id: DynamicId,
        values: HashMap<ParameterId, MultiChannelValue>,
    },
}

impl ModifySessionSpec {
    /// Stable operation name, used in audit trails and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ModifySessionSpec::AddTrack { .. } => "add_track",
            ModifySessionSpec::AddTrackMedia { .. } => "add_track_media",
            ModifySessionSpec::UpdateTrackMedia { .. } => "update_track_media",
            ModifySessionSpec::DeleteTrackMedia { .. } => "delete_track_media",
            ModifySessionSpec::DeleteTrack { .. } => "delete_track",
            ModifySessionSpec::AddFixedInstance { .. } => "add_fixed_instance",
            ModifySessionSpec::AddDynamicInstance { .. } => "add_dynamic_instance",
            ModifySessionSpec::AddMixer { .. } => "add_mixer",
            ModifySessionSpec::DeleteMixer { .. } => "delete_mixer",
            ModifySessionSpec::DeleteFixedInstance { .. } => "delete_fixed_instance",
            ModifySessionSpec::DeleteDynamicInstance { .. } => "delete_dynamic_instance",
            ModifySessionSpec::DeleteConnection { .. } => "delete_connection",
            ModifySessionSpec::AddConnection { .. } => "add_connection",
            ModifySessionSpec::SetConnectionParameterValues { .. } => "set_connection_parameter_values",
            ModifySessionSpec::SetFixedInstanceParameterValues { .. } => {
                "set_fixed_instance_parameter_values"
            }
            ModifySessionSpec::SetDynamicInstanceParameterValues { .. } => {
                "set_dynamic_instance_parameter_values"
            }
        }
    }
}

/// Any versioned modification of a session: spec or security
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifySession {
    Spec(ModifySessionSpec),
    SetSecurity { key: SecureKey, security: SessionSecurity },
    RevokeSecurity { key: SecureKey },
}

/// Partial update of a connection's mix parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionValues {
    pub volume: Option<f64>,
    pub pan: Option<f64>,
}

// ============ Playback Parameters ============

/// Playback sample rates offered to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    #[serde(rename = "192")]
    SR192,
    #[serde(rename = "96")]
    SR96,
    #[serde(rename = "88.2")]
    SR88_2,
    #[serde(rename = "48")]
    SR48,
    #[serde(rename = "44.1")]
    SR44_1,
}

impl SampleRate {
    #[inline]
    pub fn as_hz(self) -> usize {
        match self {
            SampleRate::SR192 => 192_000,
            SampleRate::SR96 => 96_000,
            SampleRate::SR88_2 => 88_200,
            SampleRate::SR48 => 48_000,
            SampleRate::SR44_1 => 44_100,
        }
    }
}

/// Playback bit depths offered to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayBitDepth {
    #[serde(rename = "24")]
    PD24,
    #[serde(rename = "16")]
    PD16,
}

impl PlayBitDepth {
    #[inline]
    pub fn as_bits(self) -> usize {
        match self {
            PlayBitDepth::PD24 => 24,
            PlayBitDepth::PD16 => 16,
        }
    }
}

/// One monitoring playback request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySession {
    pub play_id: PlayId,
    pub mixer_id: MixerId,
    pub segment: TimeSegment,
    pub start_at: f64,
    pub looping: bool,
    pub sample_rate: SampleRate,
    pub bit_depth: PlayBitDepth,
}

/// One offline render request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSession {
    pub render_id: RenderId,
    pub mixer_id: MixerId,
    pub segment: TimeSegment,
    pub object_id: AppMediaObjectId,
    pub put_url: String,
    pub notify_url: String,
    pub context: String,
}

/// Sent to the notify endpoint when a render lands successfully
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessfulRenderNotification {
    pub render_id: RenderId,
    pub object_id: MediaObjectId,
    pub context: String,
}

pub type RenderNotification = Result<SuccessfulRenderNotification, String>;

// ============ Desired & Actual Play State ============

/// What the client wants the session to be doing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredSessionPlayState {
    Play(PlaySession),
    Render(RenderSession),
    Stopped,
}

impl DesiredSessionPlayState {
    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_playing_of(&self, play: &PlaySession) -> bool {
        matches!(self, Self::Play(desired) if desired == play)
    }

    pub fn is_rendering_of(&self, render: &RenderSession) -> bool {
        matches!(self, Self::Render(desired) if desired == render)
    }
}

/// What the session is actually doing, as confirmed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPlayState {
    PreparingToPlay(PlaySession),
    PreparingToRender(RenderSession),
    Playing(PlaySession),
    Rendering(RenderSession),
    StoppingPlay(PlayId),
    StoppingRender(RenderId),
    Stopped,
}

impl SessionPlayState {
    pub fn is_playing(&self, play_id: PlayId) -> bool {
        matches!(self, Self::Playing(playing) if playing.play_id == play_id)
    }

    pub fn is_rendering(&self, render_id: RenderId) -> bool {
        matches!(self, Self::Rendering(rendering) if rendering.render_id == render_id)
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Whether this actual state already satisfies a desired state
    pub fn satisfies(&self, desired: &DesiredSessionPlayState) -> bool {
        match (self, desired) {
            (Self::Playing(playing), DesiredSessionPlayState::Play(desired_play)) => {
                playing == desired_play
            }
            (Self::Rendering(rendering), DesiredSessionPlayState::Render(desired_render)) => {
                rendering == desired_render
            }
            (Self::Stopped, DesiredSessionPlayState::Stopped) => true,
            _ => false,
        }
    }
}

/// Overall mode of the session playback state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Idle,
    PreparingToPlay(PlayId),
    Playing(PlayId),
    PreparingToRender(RenderId),
    Rendering(RenderId),
    StoppingPlay(PlayId),
    StoppingRender(RenderId),
}

impl SessionMode {
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Play id this mode concerns, if any
    pub fn play_id(&self) -> Option<PlayId> {
        match self {
            Self::PreparingToPlay(id) | Self::Playing(id) | Self::StoppingPlay(id) => Some(*id),
            _ => None,
        }
    }

    /// Render id this mode concerns, if any
    pub fn render_id(&self) -> Option<RenderId> {
        match self {
            Self::PreparingToRender(id) | Self::Rendering(id) | Self::StoppingRender(id) => {
                Some(*id)
            }
            _ => None,
        }
    }
}

/// Desired and actual play state, both timestamped for staleness checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub play_state: Timestamped<SessionPlayState>,
    pub desired_play_state: Timestamped<DesiredSessionPlayState>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            play_state: Timestamped::new(SessionPlayState::Stopped),
            desired_play_state: Timestamped::new(DesiredSessionPlayState::Stopped),
        }
    }
}
