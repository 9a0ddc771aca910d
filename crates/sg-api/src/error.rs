//! Error taxonomy
//!
//! Every rejected command maps to a typed variant; these names are the
//! stable vocabulary clients match on, across every transport.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{
    AppId, AppSessionId, ConnectionId, DomainId, DynamicId, FixedId, MediaId, MixerId, ResourceId,
    TrackId,
};

/// Structural validation failure while modifying a session spec
///
/// These are local and non-retryable without changing the request; a
/// failed modification never leaves partial effects behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ModifySessionError {
    #[error("Track {0} already exists")]
    TrackExists(TrackId),

    #[error("Fixed instance {0} already exists")]
    FixedInstanceExists(FixedId),

    #[error("Dynamic instance {0} already exists")]
    DynamicInstanceExists(DynamicId),

    #[error("Mixer {0} already exists")]
    MixerExists(MixerId),

    #[error("Track {0} does not exist")]
    TrackDoesNotExist(TrackId),

    #[error("Fixed instance {0} does not exist")]
    FixedInstanceDoesNotExist(FixedId),

    #[error("Dynamic instance {0} does not exist")]
    DynamicInstanceDoesNotExist(DynamicId),

    #[error("Mixer {0} does not exist")]
    MixerDoesNotExist(MixerId),

    #[error("Connection {0} does not exist")]
    ConnectionDoesNotExist(ConnectionId),

    #[error("Connection {0} already exists")]
    ConnectionExists(ConnectionId),

    #[error("Connection {0} is malformed: {1}")]
    ConnectionMalformed(ConnectionId, String),

    #[error("Media {1} on track {0} already exists")]
    MediaExists(TrackId, MediaId),

    #[error("Media {1} on track {0} does not exist")]
    MediaDoesNotExist(TrackId, MediaId),

    #[error("Refusing to add connection - cycle detected")]
    CycleDetected,
}

/// Cloud-level request failures, surfaced verbatim and never retried
/// internally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum CloudError {
    #[error("API Key not found")]
    ApiKeyNotFound,

    #[error("App not found")]
    AppNotFound(AppId),

    #[error("Domain {0} unknown")]
    DomainNotFound(DomainId),

    #[error("Session {0} was not found")]
    SessionNotFound(AppSessionId),

    #[error("At least a segment of a session needs to be in the future")]
    OnlyFutureReservations,

    #[error("Session time must be well-formed")]
    TimeMalformed,

    #[error("Session duration is smaller than domain minimum session duration {0} s")]
    DurationTooShort(f64),

    #[error("Too many sessions reserved on domain")]
    TooManySessions,

    #[error("Out of {0} resource by {1}")]
    OutOfResource(ResourceId, f64),

    #[error("Detected internal inconsistency: {0}")]
    InternalInconsistency(String),
}

/// Result shape carried inside response envelopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializableResult<T = ()> {
    Ok(T),
    Err { code: usize, message: String },
}

impl<T> SerializableResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, SerializableResult::Ok(_))
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for SerializableResult<T> {
    fn from(res: Result<T, E>) -> Self {
        match res {
            Ok(ok) => Self::Ok(ok),
            Err(err) => Self::Err {
                code: 500,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modify_error_wire_names() {
        let err = ModifySessionError::TrackExists(TrackId::from("t1"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["track_exists"], "t1");

        let err = ModifySessionError::CycleDetected;
        assert_eq!(serde_json::to_value(&err).unwrap(), "cycle_detected");
    }

    #[test]
    fn test_cloud_error_messages() {
        assert_eq!(
            CloudError::DurationTooShort(30.0).to_string(),
            "Session duration is smaller than domain minimum session duration 30 s"
        );
    }

    #[test]
    fn test_serializable_result_from_err() {
        let res: Result<(), ModifySessionError> = Err(ModifySessionError::CycleDetected);
        let wire = SerializableResult::from(res);
        assert!(!wire.is_ok());
    }
}
