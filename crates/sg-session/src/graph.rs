//! Topology graph operations
//!
//! All structural mutation of a `SessionSpec` goes through here. Every
//! operation validates its preconditions and returns a typed error;
//! a failed operation leaves the spec untouched. Deleting a node
//! cascades to every connection referencing one of its pads.

use std::collections::{HashMap, HashSet};

use sg_api::{
    Connection, MixerChannels, ModifySessionError, ModifySessionSpec, NodePad, NodeRef,
    SessionSpec, Track, TrackMedia, UpdateTrackMedia,
};
use sg_api::{ConnectionId, ConnectionValues, DynamicId, FixedId, MediaId, MixerId, TrackId};
use sg_api::{DynamicInstance, FixedInstance, InstanceParameters, Mixer, TrackChannels};

use sg_api::ModifySessionError::*;

/// Structural operations on a session's routing graph
///
/// Implemented on [`SessionSpec`]; the spec stays a pure value type and
/// callers clone before mutating when they need rollback.
pub trait SessionTopology {
    /// Dispatch one modification operation
    fn modify(&mut self, op: ModifySessionSpec) -> Result<(), ModifySessionError>;

    fn add_track(&mut self, track_id: TrackId, channels: TrackChannels)
    -> Result<(), ModifySessionError>;
    fn delete_track(&mut self, track_id: TrackId) -> Result<(), ModifySessionError>;

    fn add_track_media(
        &mut self,
        track_id: TrackId,
        media_id: MediaId,
        spec: TrackMedia,
    ) -> Result<(), ModifySessionError>;
    fn update_track_media(
        &mut self,
        track_id: TrackId,
        media_id: MediaId,
        update: UpdateTrackMedia,
    ) -> Result<(), ModifySessionError>;
    fn delete_track_media(
        &mut self,
        track_id: TrackId,
        media_id: MediaId,
    ) -> Result<(), ModifySessionError>;

    fn add_mixer(&mut self, mixer_id: MixerId, mixer: Mixer) -> Result<(), ModifySessionError>;
    fn delete_mixer(&mut self, mixer_id: MixerId) -> Result<(), ModifySessionError>;

    fn add_fixed_instance(
        &mut self,
        fixed_id: FixedId,
        process: FixedInstance,
    ) -> Result<(), ModifySessionError>;
    fn delete_fixed_instance(&mut self, fixed_id: FixedId) -> Result<(), ModifySessionError>;

    fn add_dynamic_instance(
        &mut self,
        dynamic_id: DynamicId,
        process: DynamicInstance,
    ) -> Result<(), ModifySessionError>;
    fn delete_dynamic_instance(&mut self, dynamic_id: DynamicId)
    -> Result<(), ModifySessionError>;

    #[allow(clippy::too_many_arguments)]
    fn add_connection(
        &mut self,
        connection_id: ConnectionId,
        from: NodePad,
        to: NodePad,
        from_channels: MixerChannels,
        to_channels: MixerChannels,
        volume: f64,
        pan: f64,
    ) -> Result<(), ModifySessionError>;
    fn delete_connection(&mut self, connection_id: ConnectionId)
    -> Result<(), ModifySessionError>;

    /// Remove every connection with an endpoint on the given node,
    /// regardless of pad direction
    fn delete_connections_referencing(&mut self, node: &NodeRef);

    fn set_connection_parameter_values(
        &mut self,
        connection_id: ConnectionId,
        values: ConnectionValues,
    ) -> Result<(), ModifySessionError>;
    fn set_fixed_instance_parameter_values(
        &mut self,
        fixed_id: FixedId,
        values: InstanceParameters,
    ) -> Result<(), ModifySessionError>;
    fn set_dynamic_instance_parameter_values(
        &mut self,
        dynamic_id: DynamicId,
        values: InstanceParameters,
    ) -> Result<(), ModifySessionError>;

    /// Whether a whole spec is internally consistent: every connection
    /// endpoint resolves, directions and channel ranges are legal, and
    /// the connection graph is acyclic
    fn validate(&self) -> Result<(), ModifySessionError>;
}

impl SessionTopology for SessionSpec {
    fn modify(&mut self, op: ModifySessionSpec) -> Result<(), ModifySessionError> {
        match op {
            ModifySessionSpec::AddTrack { track_id, channels } => self.add_track(track_id, channels),
            ModifySessionSpec::AddTrackMedia { track_id, media_id, spec } => {
                self.add_track_media(track_id, media_id, spec)
            }
            ModifySessionSpec::UpdateTrackMedia { track_id, media_id, update } => {
                self.update_track_media(track_id, media_id, update)
            }
            ModifySessionSpec::DeleteTrackMedia { track_id, media_id } => {
                self.delete_track_media(track_id, media_id)
            }
            ModifySessionSpec::DeleteTrack { track_id } => self.delete_track(track_id),
            ModifySessionSpec::AddFixedInstance { fixed_id, process } => {
                self.add_fixed_instance(fixed_id, process)
            }
            ModifySessionSpec::AddDynamicInstance { dynamic_id, process } => {
                self.add_dynamic_instance(dynamic_id, process)
            }
            ModifySessionSpec::AddMixer { mixer_id, mixer } => self.add_mixer(mixer_id, mixer),
            ModifySessionSpec::DeleteMixer { mixer_id } => self.delete_mixer(mixer_id),
            ModifySessionSpec::DeleteFixedInstance { fixed_id } => {
                self.delete_fixed_instance(fixed_id)
            }
            ModifySessionSpec::DeleteDynamicInstance { dynamic_id } => {
                self.delete_dynamic_instance(dynamic_id)
            }
            ModifySessionSpec::DeleteConnection { connection_id } => {
                self.delete_connection(connection_id)
            }
            ModifySessionSpec::AddConnection {
                connection_id,
                from,
                to,
                from_channels,
                to_channels,
                volume,
                pan,
            } => self.add_connection(connection_id, from, to, from_channels, to_channels, volume, pan),
            ModifySessionSpec::SetConnectionParameterValues { connection_id, values } => {
                self.set_connection_parameter_values(connection_id, values)
            }
            ModifySessionSpec::SetFixedInstanceParameterValues { fixed_id, values } => {
                self.set_fixed_instance_parameter_values(fixed_id, values)
            }
            ModifySessionSpec::SetDynamicInstanceParameterValues { dynamic_id, values } => {
                self.set_dynamic_instance_parameter_values(dynamic_id, values)
            }
        }
    }

    fn add_track(
        &mut self,
        track_id: TrackId,
        channels: TrackChannels,
    ) -> Result<(), ModifySessionError> {
        if self.tracks.contains_key(&track_id) {
            return Err(TrackExists(track_id));
        }

        self.tracks.insert(track_id, Track::new(channels));
        Ok(())
    }

    fn delete_track(&mut self, track_id: TrackId) -> Result<(), ModifySessionError> {
        if self.tracks.remove(&track_id).is_none() {
            return Err(TrackDoesNotExist(track_id));
        }

        self.delete_connections_referencing(&NodeRef::Track(track_id));
        Ok(())
    }

    fn add_track_media(
        &mut self,
        track_id: TrackId,
        media_id: MediaId,
        spec: TrackMedia,
    ) -> Result<(), ModifySessionError> {
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or_else(|| TrackDoesNotExist(track_id.clone()))?;

        if track.media.contains_key(&media_id) {
            return Err(MediaExists(track_id, media_id));
        }

        track.media.insert(media_id, spec);
        Ok(())
    }

    fn update_track_media(
        &mut self,
        track_id: TrackId,
        media_id: MediaId,
        update: UpdateTrackMedia,
    ) -> Result<(), ModifySessionError> {
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or_else(|| TrackDoesNotExist(track_id.clone()))?;
        let media = track
            .media
            .get_mut(&media_id)
            .ok_or_else(|| MediaDoesNotExist(track_id.clone(), media_id))?;

        media.update(update);
        Ok(())
    }

    fn delete_track_media(
        &mut self,
        track_id: TrackId,
        media_id: MediaId,
    ) -> Result<(), ModifySessionError> {
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or_else(|| TrackDoesNotExist(track_id.clone()))?;

        if track.media.remove(&media_id).is_none() {
            return Err(MediaDoesNotExist(track_id, media_id));
        }
        Ok(())
    }

    fn add_mixer(&mut self, mixer_id: MixerId, mixer: Mixer) -> Result<(), ModifySessionError> {
        if self.mixers.contains_key(&mixer_id) {
            return Err(MixerExists(mixer_id));
        }

        self.mixers.insert(mixer_id, mixer);
        Ok(())
    }

    fn delete_mixer(&mut self, mixer_id: MixerId) -> Result<(), ModifySessionError> {
        if self.mixers.remove(&mixer_id).is_none() {
            return Err(MixerDoesNotExist(mixer_id));
        }

        self.delete_connections_referencing(&NodeRef::Mixer(mixer_id));
        Ok(())
    }

    fn add_fixed_instance(
        &mut self,
        fixed_id: FixedId,
        process: FixedInstance,
    ) -> Result<(), ModifySessionError> {
        if self.fixed.contains_key(&fixed_id) {
            return Err(FixedInstanceExists(fixed_id));
        }

        self.fixed.insert(fixed_id, process);
        Ok(())
    }

    fn delete_fixed_instance(&mut self, fixed_id: FixedId) -> Result<(), ModifySessionError> {
        if self.fixed.remove(&fixed_id).is_none() {
            return Err(FixedInstanceDoesNotExist(fixed_id));
        }

        self.delete_connections_referencing(&NodeRef::FixedInstance(fixed_id));
        Ok(())
    }

    fn add_dynamic_instance(
        &mut self,
        dynamic_id: DynamicId,
        process: DynamicInstance,
    ) -> Result<(), ModifySessionError> {
        if self.dynamic.contains_key(&dynamic_id) {
            return Err(DynamicInstanceExists(dynamic_id));
        }

        self.dynamic.insert(dynamic_id, process);
        Ok(())
    }

    fn delete_dynamic_instance(
        &mut self,
        dynamic_id: DynamicId,
    ) -> Result<(), ModifySessionError> {
        if self.dynamic.remove(&dynamic_id).is_none() {
            return Err(DynamicInstanceDoesNotExist(dynamic_id));
        }

        self.delete_connections_referencing(&NodeRef::DynamicInstance(dynamic_id));
        Ok(())
    }

    fn add_connection(
        &mut self,
        connection_id: ConnectionId,
        from: NodePad,
        to: NodePad,
        from_channels: MixerChannels,
        to_channels: MixerChannels,
        volume: f64,
        pan: f64,
    ) -> Result<(), ModifySessionError> {
        if self.connections.contains_key(&connection_id) {
            return Err(ConnectionExists(connection_id));
        }

        check_endpoints(self, &connection_id, &from, &to, from_channels, to_channels)?;

        // Adding from -> to closes a loop iff from is already reachable
        // from to through existing connections.
        if reachable(self, &to.node(), &from.node()) {
            return Err(CycleDetected);
        }

        self.connections.insert(
            connection_id,
            Connection {
                from,
                to,
                from_channels,
                to_channels,
                volume,
                pan,
            },
        );
        Ok(())
    }

    fn delete_connection(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<(), ModifySessionError> {
        if self.connections.remove(&connection_id).is_none() {
            return Err(ConnectionDoesNotExist(connection_id));
        }
        Ok(())
    }

    fn delete_connections_referencing(&mut self, node: &NodeRef) {
        self.connections
            .retain(|_, c| &c.from.node() != node && &c.to.node() != node);
    }

    fn set_connection_parameter_values(
        &mut self,
        connection_id: ConnectionId,
        values: ConnectionValues,
    ) -> Result<(), ModifySessionError> {
        let connection = self
            .connections
            .get_mut(&connection_id)
            .ok_or(ConnectionDoesNotExist(connection_id))?;

        if let Some(volume) = values.volume {
            connection.volume = volume;
        }
        if let Some(pan) = values.pan {
            connection.pan = pan;
        }
        Ok(())
    }

    fn set_fixed_instance_parameter_values(
        &mut self,
        fixed_id: FixedId,
        values: InstanceParameters,
    ) -> Result<(), ModifySessionError> {
        let fixed = self
            .fixed
            .get_mut(&fixed_id)
            .ok_or(FixedInstanceDoesNotExist(fixed_id))?;

        fixed.parameters.extend(values);
        Ok(())
    }

    fn set_dynamic_instance_parameter_values(
        &mut self,
        dynamic_id: DynamicId,
        values: InstanceParameters,
    ) -> Result<(), ModifySessionError> {
        let dynamic = self
            .dynamic
            .get_mut(&dynamic_id)
            .ok_or(DynamicInstanceDoesNotExist(dynamic_id))?;

        dynamic.parameters.extend(values);
        Ok(())
    }

    fn validate(&self) -> Result<(), ModifySessionError> {
        for (id, connection) in &self.connections {
            check_endpoints(
                self,
                id,
                &connection.from,
                &connection.to,
                connection.from_channels,
                connection.to_channels,
            )?;
        }

        if has_cycle(self) {
            return Err(CycleDetected);
        }
        Ok(())
    }
}

/// Validate one connection's endpoints: direction, existence, channel range
fn check_endpoints(
    spec: &SessionSpec,
    connection_id: &ConnectionId,
    from: &NodePad,
    to: &NodePad,
    from_channels: MixerChannels,
    to_channels: MixerChannels,
) -> Result<(), ModifySessionError> {
    if !from.is_output() {
        return Err(ConnectionMalformed(
            connection_id.clone(),
            format!("{from} is not an output"),
        ));
    }
    if !to.is_input() {
        return Err(ConnectionMalformed(
            connection_id.clone(),
            format!("{to} is not an input"),
        ));
    }

    check_pad(spec, connection_id, from, from_channels)?;
    check_pad(spec, connection_id, to, to_channels)?;
    Ok(())
}

/// Check that a pad's node exists and the channel span fits on it
///
/// Instance channel counts are owned by the model registry, not the
/// graph, so only existence is checked for instance pads.
fn check_pad(
    spec: &SessionSpec,
    connection_id: &ConnectionId,
    pad: &NodePad,
    channels: MixerChannels,
) -> Result<(), ModifySessionError> {
    let declared = match pad.node() {
        NodeRef::Track(track_id) => {
            let track = spec
                .tracks
                .get(&track_id)
                .ok_or(TrackDoesNotExist(track_id))?;
            Some(track.channels.num_channels())
        }
        NodeRef::Mixer(mixer_id) => {
            let mixer = spec
                .mixers
                .get(&mixer_id)
                .ok_or(MixerDoesNotExist(mixer_id))?;
            Some(mixer.channels)
        }
        NodeRef::FixedInstance(fixed_id) => {
            if !spec.fixed.contains_key(&fixed_id) {
                return Err(FixedInstanceDoesNotExist(fixed_id));
            }
            None
        }
        NodeRef::DynamicInstance(dynamic_id) => {
            if !spec.dynamic.contains_key(&dynamic_id) {
                return Err(DynamicInstanceDoesNotExist(dynamic_id));
            }
            None
        }
    };

    if let Some(declared) = declared {
        if !channels.fits_within(declared) {
            let (count, index) = channels.to_count_and_index();
            return Err(ConnectionMalformed(
                connection_id.clone(),
                format!("{count} channel(s) at {index} do not fit {pad} with {declared} channel(s)"),
            ));
        }
    }
    Ok(())
}

/// Whether `to` is reachable from `from` along connection direction
fn reachable(spec: &SessionSpec, from: &NodeRef, to: &NodeRef) -> bool {
    if from == to {
        return true;
    }

    let edges = adjacency(spec);
    let mut stack = vec![from.clone()];
    let mut visited = HashSet::new();

    while let Some(node) = stack.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }
        if let Some(next) = edges.get(&node) {
            for target in next {
                if target == to {
                    return true;
                }
                stack.push(target.clone());
            }
        }
    }
    false
}

/// Whether the connection graph already contains a directed cycle
fn has_cycle(spec: &SessionSpec) -> bool {
    let edges = adjacency(spec);
    let mut done = HashSet::new();

    for start in edges.keys() {
        if done.contains(start) {
            continue;
        }

        // iterative DFS, tracking the path to catch back-edges
        let mut stack = vec![(start.clone(), false)];
        let mut path = HashSet::new();

        while let Some((node, children_visited)) = stack.pop() {
            if children_visited {
                path.remove(&node);
                done.insert(node);
                continue;
            }
            if path.contains(&node) {
                return true;
            }
            if done.contains(&node) {
                continue;
            }

            path.insert(node.clone());
            stack.push((node.clone(), true));
            if let Some(next) = edges.get(&node) {
                for target in next {
                    if path.contains(target) {
                        return true;
                    }
                    stack.push((target.clone(), false));
                }
            }
        }
    }
    false
}

fn adjacency(spec: &SessionSpec) -> HashMap<NodeRef, Vec<NodeRef>> {
    let mut edges: HashMap<NodeRef, Vec<NodeRef>> = HashMap::new();
    for connection in spec.connections.values() {
        edges
            .entry(connection.from.node())
            .or_default()
            .push(connection.to.node());
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> TrackId {
        TrackId::from(id)
    }

    fn mixer(id: &str) -> MixerId {
        MixerId::from(id)
    }

    fn spec_with_track_and_mixer() -> SessionSpec {
        let mut spec = SessionSpec::default();
        spec.add_track(track("t1"), TrackChannels::Mono).unwrap();
        spec.add_mixer(mixer("m1"), Mixer { channels: 2 }).unwrap();
        spec
    }

    fn connect(
        spec: &mut SessionSpec,
        id: &str,
        from: NodePad,
        to: NodePad,
    ) -> Result<(), ModifySessionError> {
        spec.add_connection(
            ConnectionId::from(id),
            from,
            to,
            MixerChannels::Mono(0),
            MixerChannels::Mono(0),
            0.0,
            0.0,
        )
    }

    #[test]
    fn test_add_track_twice_rejected() {
        let mut spec = SessionSpec::default();
        spec.add_track(track("t1"), TrackChannels::Mono).unwrap();

        let err = spec.add_track(track("t1"), TrackChannels::Stereo).unwrap_err();
        assert_eq!(err, TrackExists(track("t1")));
    }

    #[test]
    fn test_delete_missing_track_rejected() {
        let mut spec = SessionSpec::default();
        let err = spec.delete_track(track("nope")).unwrap_err();
        assert_eq!(err, TrackDoesNotExist(track("nope")));
    }

    #[test]
    fn test_connection_to_missing_node_rejected() {
        let mut spec = spec_with_track_and_mixer();
        let err = connect(
            &mut spec,
            "c1",
            NodePad::TrackOutput(track("t1")),
            NodePad::MixerInput(mixer("ghost")),
        )
        .unwrap_err();
        assert_eq!(err, MixerDoesNotExist(mixer("ghost")));
    }

    #[test]
    fn test_connection_direction_validated() {
        let mut spec = spec_with_track_and_mixer();

        // output pad on the sink side is malformed
        let err = connect(
            &mut spec,
            "c1",
            NodePad::TrackOutput(track("t1")),
            NodePad::MixerOutput(mixer("m1")),
        )
        .unwrap_err();
        assert!(matches!(err, ConnectionMalformed(_, _)));
    }

    #[test]
    fn test_channel_range_validated() {
        let mut spec = spec_with_track_and_mixer();

        // stereo span starting at 1 does not fit a 2 channel mixer
        let err = spec
            .add_connection(
                ConnectionId::from("c1"),
                NodePad::TrackOutput(track("t1")),
                NodePad::MixerInput(mixer("m1")),
                MixerChannels::Mono(0),
                MixerChannels::Stereo(1),
                0.0,
                0.0,
            )
            .unwrap_err();
        assert!(matches!(err, ConnectionMalformed(_, _)));

        // mono track has exactly one channel
        let err = spec
            .add_connection(
                ConnectionId::from("c2"),
                NodePad::TrackOutput(track("t1")),
                NodePad::MixerInput(mixer("m1")),
                MixerChannels::Mono(1),
                MixerChannels::Mono(0),
                0.0,
                0.0,
            )
            .unwrap_err();
        assert!(matches!(err, ConnectionMalformed(_, _)));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut spec = SessionSpec::default();
        for id in ["a", "b", "c"] {
            spec.add_mixer(mixer(id), Mixer { channels: 2 }).unwrap();
        }

        // a -> b -> c
        connect(&mut spec, "ab", NodePad::MixerOutput(mixer("a")), NodePad::MixerInput(mixer("b")))
            .unwrap();
        connect(&mut spec, "bc", NodePad::MixerOutput(mixer("b")), NodePad::MixerInput(mixer("c")))
            .unwrap();

        // closing the loop is rejected and leaves the graph unchanged
        let before = spec.clone();
        let err =
            connect(&mut spec, "ca", NodePad::MixerOutput(mixer("c")), NodePad::MixerInput(mixer("a")))
                .unwrap_err();
        assert_eq!(err, CycleDetected);
        assert_eq!(spec, before);

        // an edge to a fresh node is fine
        spec.add_mixer(mixer("d"), Mixer { channels: 2 }).unwrap();
        connect(&mut spec, "cd", NodePad::MixerOutput(mixer("c")), NodePad::MixerInput(mixer("d")))
            .unwrap();
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut spec = SessionSpec::default();
        spec.add_mixer(mixer("m1"), Mixer { channels: 2 }).unwrap();

        let err = connect(
            &mut spec,
            "loop",
            NodePad::MixerOutput(mixer("m1")),
            NodePad::MixerInput(mixer("m1")),
        )
        .unwrap_err();
        assert_eq!(err, CycleDetected);
    }

    #[test]
    fn test_delete_node_cascades_connections() {
        let mut spec = spec_with_track_and_mixer();
        connect(
            &mut spec,
            "c1",
            NodePad::TrackOutput(track("t1")),
            NodePad::MixerInput(mixer("m1")),
        )
        .unwrap();

        spec.delete_track(track("t1")).unwrap();
        assert!(spec.connections.is_empty());
    }

    #[test]
    fn test_delete_connections_referencing_explicit() {
        let mut spec = spec_with_track_and_mixer();
        spec.add_mixer(mixer("m2"), Mixer { channels: 2 }).unwrap();
        connect(&mut spec, "c1", NodePad::TrackOutput(track("t1")), NodePad::MixerInput(mixer("m1")))
            .unwrap();
        connect(&mut spec, "c2", NodePad::MixerOutput(mixer("m1")), NodePad::MixerInput(mixer("m2")))
            .unwrap();

        spec.delete_connections_referencing(&NodeRef::Mixer(mixer("m1")));
        assert!(spec.connections.is_empty());
        // the nodes themselves survive
        assert!(spec.mixers.contains_key(&mixer("m1")));
    }

    #[test]
    fn test_validate_whole_spec() {
        let mut spec = spec_with_track_and_mixer();
        connect(&mut spec, "c1", NodePad::TrackOutput(track("t1")), NodePad::MixerInput(mixer("m1")))
            .unwrap();
        assert!(spec.validate().is_ok());

        // sneak in a dangling connection behind the operations' back
        spec.connections.insert(
            ConnectionId::from("bad"),
            Connection {
                from: NodePad::MixerOutput(mixer("ghost")),
                to: NodePad::MixerInput(mixer("m1")),
                from_channels: MixerChannels::Mono(0),
                to_channels: MixerChannels::Mono(0),
                volume: 0.0,
                pan: 0.0,
            },
        );
        assert_eq!(spec.validate().unwrap_err(), MixerDoesNotExist(mixer("ghost")));
    }

    #[test]
    fn test_media_lifecycle_on_track() {
        use sg_api::{MediaObjectId, TimeSegment, TrackMediaFormat};

        let mut spec = SessionSpec::default();
        spec.add_track(track("t1"), TrackChannels::Stereo).unwrap();

        let media = TrackMedia {
            channels: TrackChannels::Stereo,
            format: TrackMediaFormat::Wave,
            media_segment: TimeSegment { start: 0.0, length: 2.0 },
            timeline_segment: TimeSegment { start: 4.0, length: 2.0 },
            object_id: MediaObjectId::from("obj-1"),
        };

        spec.add_track_media(track("t1"), MediaId::from("m1"), media.clone()).unwrap();
        let err = spec
            .add_track_media(track("t1"), MediaId::from("m1"), media)
            .unwrap_err();
        assert_eq!(err, MediaExists(track("t1"), MediaId::from("m1")));

        spec.update_track_media(
            track("t1"),
            MediaId::from("m1"),
            UpdateTrackMedia {
                timeline_segment: Some(TimeSegment { start: 6.0, length: 2.0 }),
                ..Default::default()
            },
        )
        .unwrap();

        spec.delete_track_media(track("t1"), MediaId::from("m1")).unwrap();
        let err = spec
            .delete_track_media(track("t1"), MediaId::from("m1"))
            .unwrap_err();
        assert_eq!(err, MediaDoesNotExist(track("t1"), MediaId::from("m1")));
    }
}
