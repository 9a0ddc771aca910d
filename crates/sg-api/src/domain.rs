//! Domain service contract
//!
//! Commands a domain accepts for its sessions, the events it pushes back
//! to subscribers, and the limits the cloud hands it at boot.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::change::{
    DesiredSessionPlayState, ModifySessionSpec, SessionPlayState, SessionState,
};
use crate::ids::{
    AppSessionId, FixedInstanceId, MediaObjectId, PlayId, RenderId, ResourceId, SecureKey,
};
use crate::session::{CreateSession, SessionSecurity, SessionSpec};
use crate::time::{Timestamp, Timestamped, now};

// ============ Commands ============

/// Session commands a domain accepts, over any transport
///
/// Every variant except `Create` carries the version the caller last
/// observed; stale versions are rejected, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainSessionCommand {
    Create {
        app_session_id: AppSessionId,
        create: CreateSession,
    },
    SetSpec {
        app_session_id: AppSessionId,
        version: u64,
        spec: SessionSpec,
    },
    SetSecurity {
        app_session_id: AppSessionId,
        version: u64,
        security: HashMap<SecureKey, SessionSecurity>,
    },
    Modify {
        app_session_id: AppSessionId,
        version: u64,
        modifications: Vec<ModifySessionSpec>,
    },
    SetDesiredPlayState {
        app_session_id: AppSessionId,
        version: u64,
        desired_play_state: DesiredSessionPlayState,
    },
    Delete {
        app_session_id: AppSessionId,
    },
}

impl DomainSessionCommand {
    pub fn session_id(&self) -> &AppSessionId {
        match self {
            DomainSessionCommand::Create { app_session_id, .. }
            | DomainSessionCommand::SetSpec { app_session_id, .. }
            | DomainSessionCommand::SetSecurity { app_session_id, .. }
            | DomainSessionCommand::Modify { app_session_id, .. }
            | DomainSessionCommand::SetDesiredPlayState { app_session_id, .. }
            | DomainSessionCommand::Delete { app_session_id } => app_session_id,
        }
    }

    /// Stable command name, used in audit trails and logs
    pub fn kind(&self) -> &'static str {
        match self {
            DomainSessionCommand::Create { .. } => "create",
            DomainSessionCommand::SetSpec { .. } => "set_spec",
            DomainSessionCommand::SetSecurity { .. } => "set_security",
            DomainSessionCommand::Modify { .. } => "modify",
            DomainSessionCommand::SetDesiredPlayState { .. } => "set_desired_play_state",
            DomainSessionCommand::Delete { .. } => "delete",
        }
    }
}

/// Commands arriving over a WebSocket connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebSocketCommand {
    Login(AppSessionId, SecureKey),
    Logout(AppSessionId),
    Session(DomainSessionCommand),
}

// ============ Events ============

/// Events pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebSocketEvent {
    Packet(AppSessionId, SessionPacket),
    Spec(AppSessionId, SessionSpec),
    State(AppSessionId, SessionState),
    LoginError(AppSessionId, String),
    SessionError(AppSessionId, String),
}

/// Playback failure surfaced through the session packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SessionPacketError {
    #[error("Play {0} failed: {1}")]
    Playing(PlayId, String),

    #[error("Render {0} failed: {1}")]
    Rendering(RenderId, String),

    #[error("{0}")]
    General(String),
}

/// Periodic digest of a session's live state for subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPacket {
    pub created_at: Timestamp,
    pub errors: Vec<Timestamped<SessionPacketError>>,
    pub play_state: SessionPlayState,
    pub desired_play_state: DesiredSessionPlayState,
    pub waiting_for_instances: HashSet<FixedInstanceId>,
    pub waiting_for_media: HashSet<MediaObjectId>,
    pub audio_engine_ready: bool,
}

impl Default for SessionPacket {
    fn default() -> Self {
        Self {
            created_at: now(),
            errors: Vec::new(),
            play_state: SessionPlayState::Stopped,
            desired_play_state: DesiredSessionPlayState::Stopped,
            waiting_for_instances: HashSet::new(),
            waiting_for_media: HashSet::new(),
            audio_engine_ready: false,
        }
    }
}

impl SessionPacket {
    pub fn push_error(&mut self, error: SessionPacketError) {
        self.errors.push(Timestamped::new(error));
    }

    pub fn add_waiting_media(&mut self, media_id: MediaObjectId) {
        self.waiting_for_media.insert(media_id);
    }

    pub fn add_waiting_instance(&mut self, instance_id: FixedInstanceId) {
        self.waiting_for_instances.insert(instance_id);
    }
}

// ============ Domain Limits ============

/// Quota envelope the cloud hands a domain at boot
///
/// The session engine only consults these; it does not own quota state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainLimits {
    pub max_sessions: usize,
    /// Minimum session length in seconds
    pub min_session_len: f64,
    pub resources: HashMap<ResourceId, f64>,
}

impl Default for DomainLimits {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            min_session_len: 30.0,
            resources: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{AppId, SessionId};

    fn session_id() -> AppSessionId {
        AppSessionId::new(AppId::from("app"), SessionId::from("s1"))
    }

    #[test]
    fn test_command_kind_and_session_id() {
        let cmd = DomainSessionCommand::Delete { app_session_id: session_id() };
        assert_eq!(cmd.kind(), "delete");
        assert_eq!(cmd.session_id(), &session_id());
    }

    #[test]
    fn test_packet_collects_errors_and_waits() {
        let mut packet = SessionPacket::default();
        packet.push_error(SessionPacketError::Playing(PlayId::new(1), "underrun".to_owned()));
        packet.add_waiting_media(MediaObjectId::from("obj-1"));

        assert_eq!(packet.errors.len(), 1);
        assert!(packet.waiting_for_media.contains(&MediaObjectId::from("obj-1")));
        assert!(!packet.audio_engine_ready);
    }
}
