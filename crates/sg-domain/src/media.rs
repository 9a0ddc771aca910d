//! Media job tracking
//!
//! Mirrors the media service's download/upload jobs per media object,
//! driven purely by inbound notifications. Retryable failures re-enter
//! the queue with their attempt count carried forward; non-retryable
//! failures become permanent and surface to owning sessions as missing
//! media. Downloads of objects no session references anymore are
//! evicted once a retention window expires.

use std::collections::{HashMap, HashSet};

use chrono::Duration;
use sg_api::{
    AppMediaObjectId, AppSessionId, MediaDownloadState, MediaMetadata, MediaObject,
    MediaObjectId, MediaUploadState, Timestamp, now,
};

/// Retry and retention policy for media jobs
#[derive(Debug, Clone)]
pub struct MediaPolicy {
    /// Attempts after which a retryable failure becomes permanent
    pub max_retries: usize,
    /// How long an unreferenced download survives before eviction
    pub retention: Duration,
}

impl Default for MediaPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retention: Duration::minutes(15),
        }
    }
}

#[derive(Debug)]
struct TrackedMedia {
    object: MediaObject,
    referenced_by: HashSet<AppSessionId>,
    unreferenced_since: Option<Timestamp>,
    download_attempts: usize,
    upload_attempts: usize,
}

impl TrackedMedia {
    fn new(id: AppMediaObjectId) -> Self {
        let mut object = MediaObject::new(id);
        object.download = Some(MediaDownloadState::Pending);
        Self {
            object,
            referenced_by: HashSet::new(),
            unreferenced_since: None,
            download_attempts: 0,
            upload_attempts: 0,
        }
    }
}

/// Job state for every media object this domain knows about
pub struct MediaJobTracker {
    policy: MediaPolicy,
    objects: HashMap<AppMediaObjectId, TrackedMedia>,
}

impl MediaJobTracker {
    pub fn new(policy: MediaPolicy) -> Self {
        Self {
            policy,
            objects: HashMap::new(),
        }
    }

    #[inline]
    pub fn object(&self, id: &AppMediaObjectId) -> Option<&MediaObject> {
        self.objects.get(id).map(|t| &t.object)
    }

    /// Replace the set of media objects a session references
    ///
    /// Objects referenced for the first time are created with a pending
    /// download; objects the session no longer references start their
    /// retention clock once nothing else references them.
    pub fn set_session_media(&mut self, session_id: &AppSessionId, refs: HashSet<AppMediaObjectId>) {
        for id in &refs {
            let tracked = self
                .objects
                .entry(id.clone())
                .or_insert_with(|| TrackedMedia::new(id.clone()));
            tracked.referenced_by.insert(session_id.clone());
            tracked.unreferenced_since = None;
        }

        for (id, tracked) in self.objects.iter_mut() {
            if !refs.contains(id) && tracked.referenced_by.remove(session_id) {
                if tracked.referenced_by.is_empty() {
                    tracked.unreferenced_since = Some(now());
                }
            }
        }
    }

    /// A session is gone; drop all of its references
    pub fn delete_session(&mut self, session_id: &AppSessionId) {
        self.set_session_media(session_id, HashSet::new());
    }

    /// Notification from the media service about a download job
    pub fn update_download(&mut self, id: &AppMediaObjectId, state: MediaDownloadState) {
        let max_retries = self.policy.max_retries;
        let Some(tracked) = self.objects.get_mut(id) else {
            log::warn!("Download update for unknown media object {id}");
            return;
        };

        match state {
            MediaDownloadState::Failed { error, count, will_retry } => {
                tracked.download_attempts = count;
                if will_retry && count < max_retries {
                    log::warn!("Download of {id} failed (attempt {count}), retrying: {error}");
                    tracked.object.download = Some(MediaDownloadState::Pending);
                } else {
                    log::error!("Download of {id} failed permanently after {count} attempt(s): {error}");
                    tracked.object.download = Some(MediaDownloadState::Failed {
                        error,
                        count,
                        will_retry: false,
                    });
                }
            }
            MediaDownloadState::Downloading { progress, retry } => {
                tracked.download_attempts = tracked.download_attempts.max(retry);
                tracked.object.download = Some(MediaDownloadState::Downloading { progress, retry });
            }
            other => {
                if matches!(other, MediaDownloadState::Completed) {
                    log::info!("Download of {id} completed");
                }
                tracked.object.download = Some(other);
            }
        }
    }

    /// Notification from the media service about an upload job
    pub fn update_upload(&mut self, id: &AppMediaObjectId, state: MediaUploadState) {
        let max_retries = self.policy.max_retries;
        let Some(tracked) = self.objects.get_mut(id) else {
            log::warn!("Upload update for unknown media object {id}");
            return;
        };

        match state {
            MediaUploadState::Failed { error, count, will_retry } => {
                tracked.upload_attempts = count;
                if will_retry && count < max_retries {
                    log::warn!("Upload of {id} failed (attempt {count}), retrying: {error}");
                    tracked.object.upload = Some(MediaUploadState::Pending);
                } else {
                    log::error!("Upload of {id} failed permanently after {count} attempt(s): {error}");
                    tracked.object.upload = Some(MediaUploadState::Failed {
                        error,
                        count,
                        will_retry: false,
                    });
                }
            }
            MediaUploadState::Uploading { progress, retry } => {
                tracked.upload_attempts = tracked.upload_attempts.max(retry);
                tracked.object.upload = Some(MediaUploadState::Uploading { progress, retry });
            }
            other => {
                tracked.object.upload = Some(other);
            }
        }
    }

    /// A pending download attempt starts; the retry counter advances
    pub fn begin_download(&mut self, id: &AppMediaObjectId) -> Option<MediaDownloadState> {
        let tracked = self.objects.get_mut(id)?;
        if !matches!(tracked.object.download, Some(MediaDownloadState::Pending)) {
            return None;
        }

        tracked.download_attempts += 1;
        let state = MediaDownloadState::Downloading {
            progress: 0.0,
            retry: tracked.download_attempts,
        };
        tracked.object.download = Some(state.clone());
        Some(state)
    }

    /// A pending upload attempt starts; the retry counter advances
    pub fn begin_upload(&mut self, id: &AppMediaObjectId) -> Option<MediaUploadState> {
        let tracked = self.objects.get_mut(id)?;
        if !matches!(tracked.object.upload, Some(MediaUploadState::Pending)) {
            return None;
        }

        tracked.upload_attempts += 1;
        let state = MediaUploadState::Uploading {
            progress: 0.0,
            retry: tracked.upload_attempts,
        };
        tracked.object.upload = Some(state.clone());
        Some(state)
    }

    /// Local path reported once a download materialized
    pub fn set_path(&mut self, id: &AppMediaObjectId, path: Option<String>) {
        if let Some(tracked) = self.objects.get_mut(id) {
            tracked.object.path = path;
        }
    }

    pub fn set_metadata(&mut self, id: &AppMediaObjectId, metadata: MediaMetadata) {
        if let Some(tracked) = self.objects.get_mut(id) {
            tracked.object.metadata = Some(metadata);
        }
    }

    /// Evict downloads unreferenced for longer than the retention window
    ///
    /// Eviction is terminal; a client has to re-request the object.
    pub fn sweep_unreferenced(&mut self, at: Timestamp) -> Vec<AppMediaObjectId> {
        let retention = self.policy.retention;
        let mut evicted = Vec::new();

        for (id, tracked) in self.objects.iter_mut() {
            if !tracked.referenced_by.is_empty() {
                continue;
            }
            let Some(since) = tracked.unreferenced_since else {
                continue;
            };
            if at - since < retention {
                continue;
            }
            if matches!(tracked.object.download, Some(MediaDownloadState::Evicted) | None) {
                continue;
            }

            log::info!("Evicting unreferenced media object {id}");
            tracked.object.download = Some(MediaDownloadState::Evicted);
            tracked.object.path = None;
            evicted.push(id.clone());
        }

        evicted
    }

    /// Media a session is still waiting on: everything referenced whose
    /// download has not completed
    pub fn waiting_for(&self, session_id: &AppSessionId) -> HashSet<MediaObjectId> {
        self.objects
            .values()
            .filter(|t| t.referenced_by.contains(session_id))
            .filter(|t| !matches!(t.object.download, Some(MediaDownloadState::Completed)))
            .map(|t| t.object.id.object_id.clone())
            .collect()
    }

    /// Sessions that currently reference a media object
    pub fn sessions_referencing(&self, id: &AppMediaObjectId) -> Vec<AppSessionId> {
        self.objects
            .get(id)
            .map(|t| t.referenced_by.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Permanently failed downloads a session references
    pub fn failed_for(&self, session_id: &AppSessionId) -> Vec<(AppMediaObjectId, String)> {
        self.objects
            .values()
            .filter(|t| t.referenced_by.contains(session_id))
            .filter_map(|t| match &t.object.download {
                Some(MediaDownloadState::Failed { error, will_retry: false, .. }) => {
                    Some((t.object.id.clone(), error.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_api::AppId;
    use sg_api::SessionId;

    fn session(name: &str) -> AppSessionId {
        AppSessionId::new(AppId::from("app"), SessionId::from(name))
    }

    fn object(name: &str) -> AppMediaObjectId {
        AppMediaObjectId::new(AppId::from("app"), MediaObjectId::from(name))
    }

    fn tracker() -> MediaJobTracker {
        MediaJobTracker::new(MediaPolicy::default())
    }

    #[test]
    fn test_first_reference_creates_pending_download() {
        let mut tracker = tracker();
        tracker.set_session_media(&session("s1"), HashSet::from([object("a")]));

        let obj = tracker.object(&object("a")).unwrap();
        assert_eq!(obj.download, Some(MediaDownloadState::Pending));
        assert!(tracker.waiting_for(&session("s1")).contains(&MediaObjectId::from("a")));
    }

    #[test]
    fn test_retry_carries_attempt_count_forward() {
        let mut tracker = tracker();
        tracker.set_session_media(&session("s1"), HashSet::from([object("a")]));
        tracker.begin_download(&object("a")).unwrap();

        tracker.update_download(
            &object("a"),
            MediaDownloadState::Failed {
                error: "connection reset".to_owned(),
                count: 1,
                will_retry: true,
            },
        );
        // retry scheduled: back to pending
        assert_eq!(
            tracker.object(&object("a")).unwrap().download,
            Some(MediaDownloadState::Pending)
        );

        // next attempt reports retry 2
        let state = tracker.begin_download(&object("a")).unwrap();
        assert_eq!(state, MediaDownloadState::Downloading { progress: 0.0, retry: 2 });
    }

    #[test]
    fn test_non_retryable_failure_is_permanent() {
        let mut tracker = tracker();
        tracker.set_session_media(&session("s1"), HashSet::from([object("a")]));

        tracker.update_download(
            &object("a"),
            MediaDownloadState::Failed {
                error: "gone".to_owned(),
                count: 1,
                will_retry: false,
            },
        );

        let obj = tracker.object(&object("a")).unwrap();
        assert!(matches!(
            obj.download,
            Some(MediaDownloadState::Failed { will_retry: false, .. })
        ));
        assert!(tracker.begin_download(&object("a")).is_none());
        assert_eq!(tracker.failed_for(&session("s1")).len(), 1);
    }

    #[test]
    fn test_retry_budget_exhaustion_becomes_permanent() {
        let mut tracker = tracker();
        tracker.set_session_media(&session("s1"), HashSet::from([object("a")]));

        // service says it would retry, but the attempt budget is spent
        tracker.update_download(
            &object("a"),
            MediaDownloadState::Failed {
                error: "timeout".to_owned(),
                count: 3,
                will_retry: true,
            },
        );

        assert!(matches!(
            tracker.object(&object("a")).unwrap().download,
            Some(MediaDownloadState::Failed { will_retry: false, count: 3, .. })
        ));
    }

    #[test]
    fn test_eviction_after_retention() {
        let mut tracker = tracker();
        tracker.set_session_media(&session("s1"), HashSet::from([object("a")]));
        tracker.update_download(&object("a"), MediaDownloadState::Completed);
        tracker.set_path(&object("a"), Some("/media/a.wav".to_owned()));

        // still referenced: retention never starts
        assert!(tracker.sweep_unreferenced(now() + Duration::hours(1)).is_empty());

        tracker.delete_session(&session("s1"));
        // unreferenced but young
        assert!(tracker.sweep_unreferenced(now()).is_empty());

        let evicted = tracker.sweep_unreferenced(now() + Duration::hours(1));
        assert_eq!(evicted, vec![object("a")]);

        let obj = tracker.object(&object("a")).unwrap();
        assert_eq!(obj.download, Some(MediaDownloadState::Evicted));
        assert_eq!(obj.path, None);
    }

    #[test]
    fn test_upload_has_no_eviction() {
        let mut tracker = tracker();
        tracker.set_session_media(&session("s1"), HashSet::from([object("a")]));
        tracker.update_upload(
            &object("a"),
            MediaUploadState::Uploading { progress: 0.5, retry: 1 },
        );
        tracker.delete_session(&session("s1"));

        tracker.sweep_unreferenced(now() + Duration::hours(1));
        // the upload state is untouched by eviction
        assert_eq!(
            tracker.object(&object("a")).unwrap().upload,
            Some(MediaUploadState::Uploading { progress: 0.5, retry: 1 })
        );
    }

    #[test]
    fn test_upload_retry_counter() {
        let mut tracker = tracker();
        tracker.set_session_media(&session("s1"), HashSet::from([object("a")]));

        // an upload job appears for the object
        tracker.update_upload(&object("a"), MediaUploadState::Pending);
        assert_eq!(
            tracker.begin_upload(&object("a")).unwrap(),
            MediaUploadState::Uploading { progress: 0.0, retry: 1 }
        );

        tracker.update_upload(
            &object("a"),
            MediaUploadState::Failed {
                error: "put rejected".to_owned(),
                count: 1,
                will_retry: true,
            },
        );
        assert_eq!(
            tracker.object(&object("a")).unwrap().upload,
            Some(MediaUploadState::Pending)
        );
        assert_eq!(
            tracker.begin_upload(&object("a")).unwrap(),
            MediaUploadState::Uploading { progress: 0.0, retry: 2 }
        );
    }

    #[test]
    fn test_completed_download_stops_waiting() {
        let mut tracker = tracker();
        tracker.set_session_media(&session("s1"), HashSet::from([object("a"), object("b")]));
        tracker.update_download(&object("a"), MediaDownloadState::Completed);

        let waiting = tracker.waiting_for(&session("s1"));
        assert!(!waiting.contains(&MediaObjectId::from("a")));
        assert!(waiting.contains(&MediaObjectId::from("b")));
    }
}
