//! Media service contract
//!
//! Media objects are materialized at a domain by asynchronous download
//! and upload jobs; the states here are reported back by the on-site
//! media service and folded into session packets.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{AppMediaObjectId, AppSessionId};
use crate::session::{TrackChannels, TrackMediaFormat};

/// Download job state for one media object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaDownloadState {
    Pending,
    Downloading {
        progress: f64,
        retry: usize,
    },
    Completed,
    Failed {
        error: String,
        count: usize,
        will_retry: bool,
    },
    Evicted,
}

impl MediaDownloadState {
    /// Whether no further transitions can happen without a new request
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MediaDownloadState::Completed
                | MediaDownloadState::Failed { will_retry: false, .. }
                | MediaDownloadState::Evicted
        )
    }
}

/// Upload job state for one media object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaUploadState {
    Pending,
    Uploading {
        progress: f64,
        retry: usize,
    },
    Completed,
    Failed {
        error: String,
        count: usize,
        will_retry: bool,
    },
}

impl MediaUploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MediaUploadState::Completed | MediaUploadState::Failed { will_retry: false, .. }
        )
    }
}

/// Descriptive metadata of a materialized media object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub channels: TrackChannels,
    pub format: TrackMediaFormat,
    pub seconds: f64,
    pub sample_rate: usize,
    pub bytes: u64,
}

/// Media object known to a domain, with its job states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaObject {
    pub id: AppMediaObjectId,
    pub metadata: Option<MediaMetadata>,
    pub path: Option<String>,
    pub download: Option<MediaDownloadState>,
    pub upload: Option<MediaUploadState>,
}

impl MediaObject {
    /// A fresh object that nothing has been done with yet
    pub fn new(id: AppMediaObjectId) -> Self {
        Self {
            id,
            metadata: None,
            path: None,
            download: None,
            upload: None,
        }
    }
}

/// Request to pull a media object into the domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadFromDomain {
    pub url: String,
    pub notify_url: String,
    pub context: Value,
}

/// Request to push a media object out of the domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadToDomain {
    pub channels: TrackChannels,
    pub format: TrackMediaFormat,
    pub seconds: f64,
    pub sample_rate: usize,
    pub bytes: u64,
    pub url: String,
    pub notify_url: String,
    pub context: Value,
}

impl UploadToDomain {
    pub fn metadata(&self) -> MediaMetadata {
        MediaMetadata {
            channels: self.channels,
            format: self.format,
            seconds: self.seconds,
            sample_rate: self.sample_rate,
            bytes: self.bytes,
        }
    }
}

/// Commands the session engine sends to the on-site media service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaServiceCommand {
    /// Declare the set of media objects a session currently references
    SetSessionMedia {
        session_id: AppSessionId,
        media: HashSet<AppMediaObjectId>,
    },
    /// Session is gone; its references no longer pin anything
    DeleteSession { session_id: AppSessionId },
}
