//! Versioned session
//!
//! One session's authoritative state behind an optimistic-concurrency
//! version counter. Writers submit the version they last observed; a
//! stale writer is rejected with a conflict and recomputes against the
//! new version. There are no locks here, and no partial commits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sg_api::{
    AppSessionId, CloudError, CreateSession, DomainId, DomainLimits, JsonSession, ModifySession,
    ModifySessionError, ModifySessionSpec, SecureKey, SessionId, SessionSecurity, SessionSpec,
    TimeRange, now,
};

use crate::graph::SessionTopology;
use crate::transaction::{self, AppliedModification, TransactionError};

/// Request-level failures of session mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum SessionError {
    #[error("Session {0} was not found")]
    NotFound(AppSessionId),

    #[error("Version conflict: expected {expected}, session is at {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("Session has been deleted")]
    Deleted,

    #[error("Invalid session spec: {0}")]
    InvalidSpec(#[from] ModifySessionError),

    #[error(transparent)]
    Modify(#[from] TransactionError),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

/// A session's structural state plus its version counter
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedSession {
    app_session_id: AppSessionId,
    domain_id: DomainId,
    time: TimeRange,
    spec: SessionSpec,
    security: HashMap<SecureKey, SessionSecurity>,
    version: u64,
    deleted: bool,
}

impl VersionedSession {
    /// Validate a creation request against domain limits, without
    /// constructing anything (the dry-run path)
    pub fn validate_create(
        create: &CreateSession,
        active_sessions: usize,
        limits: &DomainLimits,
    ) -> Result<(), SessionError> {
        if !create.time.is_valid() {
            return Err(CloudError::TimeMalformed.into());
        }
        if create.time.to <= now() {
            return Err(CloudError::OnlyFutureReservations.into());
        }
        if (create.time.duration().num_milliseconds() as f64) / 1000.0 < limits.min_session_len {
            return Err(CloudError::DurationTooShort(limits.min_session_len).into());
        }
        if active_sessions >= limits.max_sessions {
            return Err(CloudError::TooManySessions.into());
        }

        create.spec.validate()?;
        Ok(())
    }

    /// Create a session at version 0 after validating the request
    pub fn create(
        app_session_id: AppSessionId,
        create: CreateSession,
        active_sessions: usize,
        limits: &DomainLimits,
    ) -> Result<Self, SessionError> {
        Self::validate_create(&create, active_sessions, limits)?;

        let CreateSession { time, domain, spec, security, .. } = create;
        log::info!("Created session {app_session_id} on domain {domain}");

        Ok(Self {
            app_session_id,
            domain_id: domain,
            time,
            spec,
            security,
            version: 0,
            deleted: false,
        })
    }

    #[inline]
    pub fn app_session_id(&self) -> &AppSessionId {
        &self.app_session_id
    }

    #[inline]
    pub fn domain_id(&self) -> &DomainId {
        &self.domain_id
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn spec(&self) -> &SessionSpec {
        &self.spec
    }

    #[inline]
    pub fn security(&self) -> &HashMap<SecureKey, SessionSecurity> {
        &self.security
    }

    #[inline]
    pub fn time(&self) -> TimeRange {
        self.time
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn check_writable(&self, expected_version: u64) -> Result<(), SessionError> {
        if self.deleted {
            return Err(SessionError::Deleted);
        }
        if expected_version != self.version {
            return Err(SessionError::Conflict {
                expected: expected_version,
                actual: self.version,
            });
        }
        Ok(())
    }

    /// Apply a spec-only batch; on success the version advances by 1
    pub fn propose_spec(
        &mut self,
        expected_version: u64,
        modifications: &[ModifySessionSpec],
    ) -> Result<(u64, Vec<AppliedModification>), SessionError> {
        self.check_writable(expected_version)?;

        let (spec, applied) = transaction::apply_spec(&self.spec, modifications)?;
        self.spec = spec;
        self.commit(applied.len());
        Ok((self.version, applied))
    }

    /// Apply a mixed spec/security batch; on success the version
    /// advances by 1
    pub fn propose(
        &mut self,
        expected_version: u64,
        modifications: &[ModifySession],
    ) -> Result<(u64, Vec<AppliedModification>), SessionError> {
        self.check_writable(expected_version)?;

        let outcome = transaction::apply_session(&self.spec, &self.security, modifications)?;
        self.spec = outcome.spec;
        self.security = outcome.security;
        self.commit(outcome.applied.len());
        Ok((self.version, outcome.applied))
    }

    /// Replace the whole spec, validating it first
    pub fn set_spec(
        &mut self,
        expected_version: u64,
        spec: SessionSpec,
    ) -> Result<u64, SessionError> {
        self.check_writable(expected_version)?;

        spec.validate()?;
        self.spec = spec;
        self.commit(1);
        Ok(self.version)
    }

    /// Replace the whole security map
    pub fn set_security(
        &mut self,
        expected_version: u64,
        security: HashMap<SecureKey, SessionSecurity>,
    ) -> Result<u64, SessionError> {
        self.check_writable(expected_version)?;

        self.security = security;
        self.commit(1);
        Ok(self.version)
    }

    /// Tombstone the session; history and version survive
    pub fn delete(&mut self) {
        if !self.deleted {
            self.deleted = true;
            self.version += 1;
            log::info!("Deleted session {} at version {}", self.app_session_id, self.version);
        }
    }

    fn commit(&mut self, ops: usize) {
        self.version += 1;
        log::info!(
            "Committed version {} on session {} ({} op(s))",
            self.version,
            self.app_session_id,
            ops
        );
    }

    /// At-rest document form
    pub fn to_json(&self) -> JsonSession {
        JsonSession {
            version: self.version,
            domain_id: self.domain_id.clone(),
            app_id: self.app_session_id.app_id.clone(),
            time: self.time,
            spec: self.spec.clone(),
            security: self.security.clone(),
            deleted: self.deleted,
        }
    }

    /// Rehydrate from the at-rest document; the session id comes from
    /// the document's storage key
    pub fn from_json(session_id: SessionId, doc: JsonSession) -> Self {
        let JsonSession { version, domain_id, app_id, time, spec, security, deleted } = doc;
        Self {
            app_session_id: AppSessionId::new(app_id, session_id),
            domain_id,
            time,
            spec,
            security,
            version,
            deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sg_api::{AppId, Mixer, MixerChannels, MixerId, NodePad, TrackChannels, TrackId};

    fn session_id() -> AppSessionId {
        AppSessionId::new(AppId::from("app"), SessionId::from("s1"))
    }

    fn future_range(len_minutes: i64) -> TimeRange {
        let from = now() + Duration::minutes(5);
        TimeRange::new(from, from + Duration::minutes(len_minutes))
    }

    fn create_request() -> CreateSession {
        CreateSession {
            time: future_range(60),
            domain: DomainId::from("site-1"),
            spec: SessionSpec::default(),
            security: HashMap::new(),
            dry_run: false,
        }
    }

    fn session() -> VersionedSession {
        VersionedSession::create(session_id(), create_request(), 0, &DomainLimits::default())
            .unwrap()
    }

    fn add_track(id: &str) -> ModifySessionSpec {
        ModifySessionSpec::AddTrack {
            track_id: TrackId::from(id),
            channels: TrackChannels::Mono,
        }
    }

    #[test]
    fn test_version_increments_by_one_per_batch() {
        let mut session = session();
        assert_eq!(session.version(), 0);

        let (version, applied) = session
            .propose_spec(0, &[add_track("t1"), add_track("t2"), add_track("t3")])
            .unwrap();
        assert_eq!(version, 1);
        assert_eq!(applied.len(), 3);

        let (version, _) = session.propose_spec(1, &[add_track("t4")]).unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_stale_writer_conflicts() {
        let mut session = session();
        session.propose_spec(0, &[add_track("t1")]).unwrap();

        // a second writer still at version 0
        let err = session.propose_spec(0, &[add_track("t2")]).unwrap_err();
        assert_eq!(err, SessionError::Conflict { expected: 0, actual: 1 });

        // resubmitting against the current version succeeds
        let (version, _) = session.propose_spec(1, &[add_track("t2")]).unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_failed_batch_keeps_version_and_spec() {
        let mut session = session();
        session.propose_spec(0, &[add_track("t1")]).unwrap();
        let before = session.spec().clone();

        let err = session
            .propose_spec(1, &[add_track("t2"), add_track("t1")])
            .unwrap_err();
        assert!(matches!(err, SessionError::Modify(_)));
        assert_eq!(session.version(), 1);
        assert_eq!(session.spec(), &before);
    }

    #[test]
    fn test_example_scenario_cycle_keeps_version() {
        // session created with one mono track and one 2-channel mixer
        let mut create = create_request();
        create
            .spec
            .tracks
            .insert(TrackId::from("t1"), sg_api::Track::new(TrackChannels::Mono));
        create
            .spec
            .mixers
            .insert(MixerId::from("m1"), Mixer { channels: 2 });
        let mut session =
            VersionedSession::create(session_id(), create, 0, &DomainLimits::default()).unwrap();
        assert_eq!(session.version(), 0);

        let (version, _) = session
            .propose_spec(
                0,
                &[ModifySessionSpec::AddConnection {
                    connection_id: sg_api::ConnectionId::from("c1"),
                    from: NodePad::TrackOutput(TrackId::from("t1")),
                    to: NodePad::MixerInput(MixerId::from("m1")),
                    from_channels: MixerChannels::Mono(0),
                    to_channels: MixerChannels::Mono(0),
                    volume: 0.0,
                    pan: 0.0,
                }],
            )
            .unwrap();
        assert_eq!(version, 1);

        // mixer back into the track would be a cycle (and malformed:
        // tracks have no input pad) - version must not move
        let err = session
            .propose_spec(
                1,
                &[ModifySessionSpec::AddConnection {
                    connection_id: sg_api::ConnectionId::from("c2"),
                    from: NodePad::MixerOutput(MixerId::from("m1")),
                    to: NodePad::TrackOutput(TrackId::from("t1")),
                    from_channels: MixerChannels::Mono(0),
                    to_channels: MixerChannels::Mono(0),
                    volume: 0.0,
                    pan: 0.0,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::Modify(_)));
        assert_eq!(session.version(), 1);
    }

    #[test]
    fn test_mixed_batch_through_propose() {
        let mut session = session();

        let (version, applied) = session
            .propose(
                0,
                &[
                    sg_api::ModifySession::Spec(add_track("t1")),
                    sg_api::ModifySession::SetSecurity {
                        key: SecureKey::from("artist"),
                        security: SessionSecurity::full(),
                    },
                ],
            )
            .unwrap();

        assert_eq!(version, 1);
        assert_eq!(applied.len(), 2);
        assert!(session.security().contains_key(&SecureKey::from("artist")));

        let (version, _) = session
            .propose(
                1,
                &[sg_api::ModifySession::RevokeSecurity { key: SecureKey::from("artist") }],
            )
            .unwrap();
        assert_eq!(version, 2);
        assert!(session.security().is_empty());
    }

    #[test]
    fn test_create_validates_limits() {
        let limits = DomainLimits::default();

        let mut too_short = create_request();
        too_short.time = future_range(0);
        let err = VersionedSession::validate_create(&too_short, 0, &limits).unwrap_err();
        assert_eq!(err, SessionError::Cloud(CloudError::DurationTooShort(limits.min_session_len)));

        let err = VersionedSession::validate_create(&create_request(), limits.max_sessions, &limits)
            .unwrap_err();
        assert_eq!(err, SessionError::Cloud(CloudError::TooManySessions));

        let mut backwards = create_request();
        backwards.time = TimeRange::new(backwards.time.to, backwards.time.from);
        let err = VersionedSession::validate_create(&backwards, 0, &limits).unwrap_err();
        assert_eq!(err, SessionError::Cloud(CloudError::TimeMalformed));
    }

    #[test]
    fn test_deleted_session_rejects_writes() {
        let mut session = session();
        session.delete();
        assert!(session.is_deleted());

        let version = session.version();
        let err = session.propose_spec(version, &[add_track("t1")]).unwrap_err();
        assert_eq!(err, SessionError::Deleted);
    }

    #[test]
    fn test_security_changes_are_versioned() {
        let mut session = session();

        let mut security = HashMap::new();
        security.insert(SecureKey::from("artist"), SessionSecurity::full());
        let version = session.set_security(0, security).unwrap();
        assert_eq!(version, 1);

        let err = session.set_security(0, HashMap::new()).unwrap_err();
        assert!(matches!(err, SessionError::Conflict { .. }));
    }

    #[test]
    fn test_json_round_trip_exact() {
        let mut session = session();
        session.propose_spec(0, &[add_track("t1")]).unwrap();

        let doc = session.to_json();
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let back: JsonSession = serde_json::from_str(&json).unwrap();
        let restored = VersionedSession::from_json(SessionId::from("s1"), back);

        assert_eq!(restored, session);
    }
}
