//! Transactional batch application
//!
//! A batch of modifications is applied strictly in order against a
//! working copy; the first failing operation aborts the whole batch and
//! the caller's graph is never touched. There is no partial success.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sg_api::{
    ModifySession, ModifySessionError, ModifySessionSpec, SecureKey, SessionSecurity, SessionSpec,
};

use crate::graph::SessionTopology;

/// Record of one successfully applied operation, for audit and diffing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedModification {
    /// Position of the operation in its batch
    pub index: usize,
    /// Stable operation name
    pub kind: String,
}

/// Failure of a batch, pointing at the operation that broke it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("Modification {index} ({kind}) rejected: {error}")]
pub struct TransactionError {
    pub index: usize,
    pub kind: String,
    #[source]
    pub error: ModifySessionError,
}

/// Apply spec modifications to a copy of `base`, all-or-nothing
///
/// On success returns the new spec and the applied-operation audit
/// trail; on failure `base` is untouched and the error names the first
/// rejected operation.
pub fn apply_spec(
    base: &SessionSpec,
    modifications: &[ModifySessionSpec],
) -> Result<(SessionSpec, Vec<AppliedModification>), TransactionError> {
    let mut working = base.clone();
    let mut applied = Vec::with_capacity(modifications.len());

    for (index, modification) in modifications.iter().enumerate() {
        let kind = modification.kind();
        working
            .modify(modification.clone())
            .map_err(|error| TransactionError {
                index,
                kind: kind.to_owned(),
                error,
            })?;
        applied.push(AppliedModification {
            index,
            kind: kind.to_owned(),
        });
    }

    Ok((working, applied))
}

/// Outcome of a whole-session batch: new spec, new security map, audit
#[derive(Debug)]
pub struct SessionTransaction {
    pub spec: SessionSpec,
    pub security: HashMap<SecureKey, SessionSecurity>,
    pub applied: Vec<AppliedModification>,
}

/// Apply mixed spec/security modifications, all-or-nothing
pub fn apply_session(
    spec: &SessionSpec,
    security: &HashMap<SecureKey, SessionSecurity>,
    modifications: &[ModifySession],
) -> Result<SessionTransaction, TransactionError> {
    let mut working_spec = spec.clone();
    let mut working_security = security.clone();
    let mut applied = Vec::with_capacity(modifications.len());

    for (index, modification) in modifications.iter().enumerate() {
        let kind = match modification {
            ModifySession::Spec(op) => {
                let kind = op.kind();
                working_spec
                    .modify(op.clone())
                    .map_err(|error| TransactionError {
                        index,
                        kind: kind.to_owned(),
                        error,
                    })?;
                kind
            }
            ModifySession::SetSecurity { key, security } => {
                working_security.insert(key.clone(), *security);
                "set_security"
            }
            ModifySession::RevokeSecurity { key } => {
                working_security.remove(key);
                "revoke_security"
            }
        };
        applied.push(AppliedModification {
            index,
            kind: kind.to_owned(),
        });
    }

    Ok(SessionTransaction {
        spec: working_spec,
        security: working_security,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_api::{Mixer, MixerChannels, MixerId, NodePad, TrackChannels, TrackId};

    fn ops() -> Vec<ModifySessionSpec> {
        vec![
            ModifySessionSpec::AddTrack {
                track_id: TrackId::from("t1"),
                channels: TrackChannels::Mono,
            },
            ModifySessionSpec::AddMixer {
                mixer_id: MixerId::from("m1"),
                mixer: Mixer { channels: 2 },
            },
            ModifySessionSpec::AddConnection {
                connection_id: sg_api::ConnectionId::from("c1"),
                from: NodePad::TrackOutput(TrackId::from("t1")),
                to: NodePad::MixerInput(MixerId::from("m1")),
                from_channels: MixerChannels::Mono(0),
                to_channels: MixerChannels::Mono(0),
                volume: 0.0,
                pan: 0.0,
            },
        ]
    }

    #[test]
    fn test_batch_applies_in_order() {
        let base = SessionSpec::default();
        let (spec, applied) = apply_spec(&base, &ops()).unwrap();

        assert_eq!(spec.tracks.len(), 1);
        assert_eq!(spec.connections.len(), 1);
        assert_eq!(
            applied.iter().map(|a| a.kind.as_str()).collect::<Vec<_>>(),
            vec!["add_track", "add_mixer", "add_connection"]
        );
    }

    #[test]
    fn test_failing_batch_leaves_base_untouched() {
        let base = SessionSpec::default();

        let mut modifications = ops();
        // duplicate of op 0, fails at index 3
        modifications.push(ModifySessionSpec::AddTrack {
            track_id: TrackId::from("t1"),
            channels: TrackChannels::Mono,
        });

        let err = apply_spec(&base, &modifications).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.kind, "add_track");
        assert_eq!(base, SessionSpec::default());
    }

    #[test]
    fn test_mixed_batch_updates_security() {
        let base = SessionSpec::default();
        let security = HashMap::new();

        let key = SecureKey::from("artist");
        let outcome = apply_session(
            &base,
            &security,
            &[
                ModifySession::Spec(ModifySessionSpec::AddTrack {
                    track_id: TrackId::from("t1"),
                    channels: TrackChannels::Mono,
                }),
                ModifySession::SetSecurity {
                    key: key.clone(),
                    security: SessionSecurity::full(),
                },
            ],
        )
        .unwrap();

        assert!(outcome.security.contains_key(&key));
        assert!(security.is_empty());
        assert_eq!(outcome.applied.len(), 2);
    }

    #[test]
    fn test_mixed_batch_is_atomic_across_kinds() {
        let base = SessionSpec::default();
        let mut security = HashMap::new();
        security.insert(SecureKey::from("artist"), SessionSecurity::full());

        let err = apply_session(
            &base,
            &security,
            &[
                ModifySession::RevokeSecurity { key: SecureKey::from("artist") },
                ModifySession::Spec(ModifySessionSpec::DeleteTrack {
                    track_id: TrackId::from("ghost"),
                }),
            ],
        )
        .unwrap_err();

        assert_eq!(err.index, 1);
        // the security revoke from op 0 must not have leaked out
        assert!(security.contains_key(&SecureKey::from("artist")));
    }
}
