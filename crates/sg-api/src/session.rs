//! Session structure
//!
//! The routing topology of a session: track, mixer and instance nodes,
//! and the connections wiring their pads together. These are pure value
//! types; validation and mutation rules live in the session engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{
    AppId, ConnectionId, DomainId, DynamicId, FixedId, FixedInstanceId, MediaId, MediaObjectId,
    MixerId, ModelId, ParameterId, SecureKey, TrackId,
};
use crate::time::TimeRange;

// ============ Channels ============

/// Channel layout of a track or media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackChannels {
    Mono,
    Stereo,
}

impl TrackChannels {
    #[inline]
    pub fn num_channels(&self) -> usize {
        match self {
            TrackChannels::Mono => 1,
            TrackChannels::Stereo => 2,
        }
    }
}

/// Channel span a connection endpoint covers on its node
///
/// `Mono(n)` is channel `n`, `Stereo(n)` is the pair starting at `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixerChannels {
    Mono(usize),
    Stereo(usize),
}

impl MixerChannels {
    /// Span as (channel count, first channel index)
    #[inline]
    pub fn to_count_and_index(self) -> (usize, usize) {
        match self {
            MixerChannels::Mono(ch) => (1, ch),
            MixerChannels::Stereo(ch) => (2, ch),
        }
    }

    /// Whether the span fits inside a node with `channels` channels
    #[inline]
    pub fn fits_within(self, channels: usize) -> bool {
        let (count, index) = self.to_count_and_index();
        index + count <= channels
    }
}

// ============ Parameters ============

/// A single parameter value on one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    String(String),
    Number(f64),
    Bool(bool),
}

/// Per-channel parameter values; `None` leaves a channel untouched
pub type MultiChannelValue = Vec<Option<ParameterValue>>;

/// All parameter values of one instance
pub type InstanceParameters = HashMap<ParameterId, MultiChannelValue>;

// ============ Nodes ============

/// Audio track: channel layout plus media items placed on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub channels: TrackChannels,
    pub media: HashMap<MediaId, TrackMedia>,
}

impl Track {
    pub fn new(channels: TrackChannels) -> Self {
        Self {
            channels,
            media: HashMap::new(),
        }
    }
}

/// Summing mixer node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mixer {
    pub channels: usize,
}

/// Reference to a physical hardware unit, with its parameter values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedInstance {
    pub instance_id: FixedInstanceId,
    pub parameters: InstanceParameters,
}

/// Software-instantiated processing unit, with its parameter values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicInstance {
    pub model_id: ModelId,
    pub parameters: InstanceParameters,
}

// ============ Media on Tracks ============

/// Slice of a timeline or of a media object, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSegment {
    pub start: f64,
    pub length: f64,
}

impl TimeSegment {
    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}

/// Media file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackMediaFormat {
    Wave,
    Mp3,
    Flac,
    WavPack,
}

/// Media item on a track: which part of which object plays where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMedia {
    pub channels: TrackChannels,
    pub format: TrackMediaFormat,
    pub media_segment: TimeSegment,
    pub timeline_segment: TimeSegment,
    pub object_id: MediaObjectId,
}

impl TrackMedia {
    /// Apply a partial update, leaving unset fields alone
    pub fn update(&mut self, update: UpdateTrackMedia) {
        let UpdateTrackMedia {
            channels,
            media_segment,
            timeline_segment,
            object_id,
        } = update;

        if let Some(channels) = channels {
            self.channels = channels;
        }
        if let Some(media_segment) = media_segment {
            self.media_segment = media_segment;
        }
        if let Some(timeline_segment) = timeline_segment {
            self.timeline_segment = timeline_segment;
        }
        if let Some(object_id) = object_id {
            self.object_id = object_id;
        }
    }
}

/// Partial update of a media item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTrackMedia {
    pub channels: Option<TrackChannels>,
    pub media_segment: Option<TimeSegment>,
    pub timeline_segment: Option<TimeSegment>,
    pub object_id: Option<MediaObjectId>,
}

// ============ Connections ============

/// Node a pad belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRef {
    Track(TrackId),
    Mixer(MixerId),
    FixedInstance(FixedId),
    DynamicInstance(DynamicId),
}

/// Connectable endpoint on a node
///
/// Tracks only produce audio, so they expose an output pad only; mixers
/// and instances expose both directions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePad {
    TrackOutput(TrackId),
    MixerInput(MixerId),
    MixerOutput(MixerId),
    FixedInstanceInput(FixedId),
    FixedInstanceOutput(FixedId),
    DynamicInstanceInput(DynamicId),
    DynamicInstanceOutput(DynamicId),
}

impl NodePad {
    #[inline]
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            NodePad::MixerInput(_) | NodePad::FixedInstanceInput(_) | NodePad::DynamicInstanceInput(_)
        )
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        !self.is_input()
    }

    /// Node this pad belongs to
    pub fn node(&self) -> NodeRef {
        match self {
            NodePad::TrackOutput(id) => NodeRef::Track(id.clone()),
            NodePad::MixerInput(id) | NodePad::MixerOutput(id) => NodeRef::Mixer(id.clone()),
            NodePad::FixedInstanceInput(id) | NodePad::FixedInstanceOutput(id) => {
                NodeRef::FixedInstance(id.clone())
            }
            NodePad::DynamicInstanceInput(id) | NodePad::DynamicInstanceOutput(id) => {
                NodeRef::DynamicInstance(id.clone())
            }
        }
    }
}

impl std::fmt::Display for NodePad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodePad::TrackOutput(id) => write!(f, "track:{id}:output"),
            NodePad::MixerInput(id) => write!(f, "mixer:{id}:input"),
            NodePad::MixerOutput(id) => write!(f, "mixer:{id}:output"),
            NodePad::FixedInstanceInput(id) => write!(f, "fixed:{id}:input"),
            NodePad::FixedInstanceOutput(id) => write!(f, "fixed:{id}:output"),
            NodePad::DynamicInstanceInput(id) => write!(f, "dynamic:{id}:input"),
            NodePad::DynamicInstanceOutput(id) => write!(f, "dynamic:{id}:output"),
        }
    }
}

/// Directed audio connection between two pads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodePad,
    pub to: NodePad,
    pub from_channels: MixerChannels,
    pub to_channels: MixerChannels,
    pub volume: f64,
    pub pan: f64,
}

// ============ Session Spec ============

/// Complete structural description of a session's routing graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub tracks: HashMap<TrackId, Track>,
    pub mixers: HashMap<MixerId, Mixer>,
    pub fixed: HashMap<FixedId, FixedInstance>,
    pub dynamic: HashMap<DynamicId, DynamicInstance>,
    pub connections: HashMap<ConnectionId, Connection>,
}

impl SessionSpec {
    /// Media objects referenced by any track in the spec
    pub fn media_object_ids(&self) -> impl Iterator<Item = &MediaObjectId> {
        self.tracks
            .values()
            .flat_map(|track| track.media.values().map(|media| &media.object_id))
    }

    /// Hardware units referenced by any fixed instance node
    pub fn fixed_instance_ids(&self) -> impl Iterator<Item = &FixedInstanceId> {
        self.fixed.values().map(|fixed| &fixed.instance_id)
    }
}

// ============ Security ============

/// Capability flags a secure key grants on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSecurity {
    pub structure: bool,
    pub media: bool,
    pub parameters: bool,
    pub transport: bool,
    pub audio: bool,
}

impl SessionSecurity {
    /// Every capability granted
    pub fn full() -> Self {
        Self {
            structure: true,
            media: true,
            parameters: true,
            transport: true,
            audio: true,
        }
    }
}

// ============ Creation & Persistence ============

/// Request to create a new session on a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSession {
    pub time: TimeRange,
    pub domain: DomainId,
    pub spec: SessionSpec,
    pub security: HashMap<SecureKey, SessionSecurity>,
    /// Validate only; nothing is persisted when set
    pub dry_run: bool,
}

/// At-rest session document, one per session
///
/// This is the canonical persisted shape; the engine must rehydrate a
/// session from it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSession {
    pub version: u64,
    pub domain_id: DomainId,
    pub app_id: AppId,
    pub time: TimeRange,
    pub spec: SessionSpec,
    pub security: HashMap<SecureKey, SessionSecurity>,
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixer_channels_fit() {
        assert!(MixerChannels::Mono(0).fits_within(1));
        assert!(MixerChannels::Stereo(0).fits_within(2));
        assert!(!MixerChannels::Stereo(1).fits_within(2));
        assert!(!MixerChannels::Mono(2).fits_within(2));
    }

    #[test]
    fn test_pad_direction_and_node() {
        let pad = NodePad::TrackOutput(TrackId::from("t1"));
        assert!(pad.is_output());
        assert_eq!(pad.node(), NodeRef::Track(TrackId::from("t1")));

        let pad = NodePad::MixerInput(MixerId::from("m1"));
        assert!(pad.is_input());
        assert_eq!(pad.node(), NodeRef::Mixer(MixerId::from("m1")));
    }

    #[test]
    fn test_track_media_partial_update() {
        let mut media = TrackMedia {
            channels: TrackChannels::Mono,
            format: TrackMediaFormat::Wave,
            media_segment: TimeSegment { start: 0.0, length: 4.0 },
            timeline_segment: TimeSegment { start: 8.0, length: 4.0 },
            object_id: MediaObjectId::from("obj-1"),
        };

        media.update(UpdateTrackMedia {
            timeline_segment: Some(TimeSegment { start: 12.0, length: 4.0 }),
            ..Default::default()
        });

        // untouched fields survive
        assert_eq!(media.channels, TrackChannels::Mono);
        assert_eq!(media.object_id, MediaObjectId::from("obj-1"));
        assert_eq!(media.timeline_segment.start, 12.0);
    }
}
