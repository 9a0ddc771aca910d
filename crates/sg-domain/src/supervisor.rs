//! Session supervision and the domain command queue
//!
//! One `SessionSupervisor` is the single mutator of one session:
//! versioned structure, playback machine and packet assembly. The
//! `DomainProcessor` owns every supervisor plus the media tracker and
//! drains the domain's inbound queue; `DomainHandle` is the thread-safe
//! side handed to the transport layer.
//!
//! Sessions share no state, so commands for different sessions never
//! contend; ordering is only guaranteed per session.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::RwLock;

use sg_api::{
    AppMediaObjectId, AppSessionId, AudioEngineCommand, AudioEngineEvent, CreateSession,
    DomainId, DomainLimits, DomainSessionCommand, MediaDownloadState, MediaServiceCommand,
    MediaUploadState, SessionPacket, SessionPacketError, SuccessfulRenderNotification,
    WebSocketEvent, now,
};
use sg_session::{SessionError, VersionedSession};

use crate::media::{MediaJobTracker, MediaPolicy};
use crate::playback::{PlaybackEvent, PlaybackStateMachine};

// ============ Outbound Events ============

/// Everything the domain runtime emits towards its collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// Push to WebSocket subscribers
    Socket(WebSocketEvent),
    /// Send to the audio engine
    Engine(AudioEngineCommand),
    /// Send to the on-site media service
    Media(MediaServiceCommand),
    /// Deliver to a render's notify endpoint
    Render(SuccessfulRenderNotification),
}

// ============ Session Supervisor ============

/// Single mutator of one session
pub struct SessionSupervisor {
    session: VersionedSession,
    playback: PlaybackStateMachine,
    packet: SessionPacket,
    engine_ready: bool,
}

impl SessionSupervisor {
    pub fn new(session: VersionedSession) -> Self {
        let playback = PlaybackStateMachine::new(session.app_session_id().clone());
        Self {
            session,
            playback,
            packet: SessionPacket::default(),
            engine_ready: false,
        }
    }

    #[inline]
    pub fn session(&self) -> &VersionedSession {
        &self.session
    }

    #[inline]
    pub fn playback(&self) -> &PlaybackStateMachine {
        &self.playback
    }

    fn session_id(&self) -> AppSessionId {
        self.session.app_session_id().clone()
    }

    /// Media objects the current spec references
    fn media_refs(&self) -> HashSet<AppMediaObjectId> {
        let app_id = self.session.app_session_id().app_id.clone();
        self.session
            .spec()
            .media_object_ids()
            .map(|object_id| AppMediaObjectId::new(app_id.clone(), object_id.clone()))
            .collect()
    }

    /// Handle one command addressed to this session
    pub fn handle_command(
        &mut self,
        command: DomainSessionCommand,
    ) -> Result<Vec<DomainEvent>, SessionError> {
        let session_id = self.session_id();
        let mut events = Vec::new();

        match command {
            DomainSessionCommand::Create { .. } => {
                // creation is resolved by the processor before a
                // supervisor exists; a duplicate create is a conflict
                return Err(SessionError::Conflict {
                    expected: 0,
                    actual: self.session.version(),
                });
            }
            DomainSessionCommand::SetSpec { version, spec, .. } => {
                self.session.set_spec(version, spec)?;
                events.push(DomainEvent::Engine(AudioEngineCommand::SetSpec {
                    session_id: session_id.clone(),
                    spec: self.session.spec().clone(),
                }));
                self.push_spec_events(&mut events);
            }
            DomainSessionCommand::SetSecurity { version, security, .. } => {
                self.session.set_security(version, security)?;
            }
            DomainSessionCommand::Modify { version, modifications, .. } => {
                self.session.propose_spec(version, &modifications)?;
                events.push(DomainEvent::Engine(AudioEngineCommand::ModifySpec {
                    session_id: session_id.clone(),
                    transaction: modifications,
                }));
                self.push_spec_events(&mut events);
            }
            DomainSessionCommand::SetDesiredPlayState { version, desired_play_state, .. } => {
                if version != self.session.version() {
                    return Err(SessionError::Conflict {
                        expected: version,
                        actual: self.session.version(),
                    });
                }
                if self.session.is_deleted() {
                    return Err(SessionError::Deleted);
                }
                let playback_events = self.playback.set_desired(desired_play_state);
                self.map_playback(playback_events, &mut events);
            }
            DomainSessionCommand::Delete { .. } => {
                self.session.delete();
                events.push(DomainEvent::Engine(AudioEngineCommand::Close {
                    session_id: session_id.clone(),
                }));
                events.push(DomainEvent::Media(MediaServiceCommand::DeleteSession {
                    session_id,
                }));
            }
        }

        Ok(events)
    }

    /// Handle one event the audio engine reported for this session
    pub fn handle_engine_event(&mut self, event: AudioEngineEvent) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        let playback_events = self.playback.handle_engine_event(event);
        self.map_playback(playback_events, &mut events);
        events
    }

    pub fn set_engine_ready(&mut self, ready: bool) {
        self.engine_ready = ready;
    }

    /// Spec changed: tell subscribers and refresh media references
    fn push_spec_events(&self, events: &mut Vec<DomainEvent>) {
        events.push(DomainEvent::Socket(WebSocketEvent::Spec(
            self.session_id(),
            self.session.spec().clone(),
        )));
        events.push(DomainEvent::Media(MediaServiceCommand::SetSessionMedia {
            session_id: self.session_id(),
            media: self.media_refs(),
        }));
    }

    fn map_playback(&mut self, playback_events: Vec<PlaybackEvent>, events: &mut Vec<DomainEvent>) {
        for event in playback_events {
            match event {
                PlaybackEvent::Engine(command) => events.push(DomainEvent::Engine(command)),
                PlaybackEvent::StateChanged(state) => {
                    events.push(DomainEvent::Socket(WebSocketEvent::State(
                        self.session_id(),
                        state,
                    )));
                }
                PlaybackEvent::PacketError(error) => self.packet.push_error(error),
                PlaybackEvent::RenderComplete(notification) => {
                    events.push(DomainEvent::Render(notification));
                }
            }
        }
    }

    /// Assemble the next packet for subscribers, draining queued errors
    pub fn take_packet(&mut self, media: &MediaJobTracker) -> SessionPacket {
        let mut packet = std::mem::take(&mut self.packet);
        let session_id = self.session_id();

        packet.created_at = now();
        packet.play_state = self.playback.state().play_state.value().clone();
        packet.desired_play_state = self.playback.state().desired_play_state.value().clone();
        packet.waiting_for_media = media.waiting_for(&session_id);
        packet.audio_engine_ready = self.engine_ready;

        for (object_id, error) in media.failed_for(&session_id) {
            packet.push_error(SessionPacketError::General(format!(
                "Media {object_id} is missing: {error}"
            )));
        }

        packet
    }
}

// ============ Domain Queue ============

enum Inbound {
    Command(DomainSessionCommand),
    EngineEvent(AudioEngineEvent),
    DownloadState(AppMediaObjectId, MediaDownloadState),
    UploadState(AppMediaObjectId, MediaUploadState),
}

/// Thread-safe handle for feeding the domain and draining its events
#[derive(Clone)]
pub struct DomainHandle {
    inbound_tx: Sender<Inbound>,
    events_rx: Receiver<DomainEvent>,
    versions: Arc<RwLock<HashMap<AppSessionId, u64>>>,
}

impl DomainHandle {
    /// Enqueue a session command
    pub fn send_command(&self, command: DomainSessionCommand) {
        let _ = self.inbound_tx.send(Inbound::Command(command));
    }

    /// Enqueue an audio engine event
    pub fn notify_engine_event(&self, event: AudioEngineEvent) {
        let _ = self.inbound_tx.send(Inbound::EngineEvent(event));
    }

    /// Enqueue a media download notification
    pub fn notify_download(&self, id: AppMediaObjectId, state: MediaDownloadState) {
        let _ = self.inbound_tx.send(Inbound::DownloadState(id, state));
    }

    /// Enqueue a media upload notification
    pub fn notify_upload(&self, id: AppMediaObjectId, state: MediaUploadState) {
        let _ = self.inbound_tx.send(Inbound::UploadState(id, state));
    }

    /// Next outbound event, if any is ready
    pub fn poll_event(&self) -> Option<DomainEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Last committed version of a session, for conflict recovery
    pub fn session_version(&self, id: &AppSessionId) -> Option<u64> {
        self.versions.read().get(id).copied()
    }
}

/// Single-threaded owner of every session supervisor
pub struct DomainProcessor {
    domain_id: DomainId,
    limits: DomainLimits,
    supervisors: HashMap<AppSessionId, SessionSupervisor>,
    media: MediaJobTracker,
    inbound_rx: Receiver<Inbound>,
    events_tx: Sender<DomainEvent>,
    versions: Arc<RwLock<HashMap<AppSessionId, u64>>>,
}

/// Create a connected handle/processor pair for one domain
pub fn create_domain(
    domain_id: DomainId,
    limits: DomainLimits,
    media_policy: MediaPolicy,
) -> (DomainHandle, DomainProcessor) {
    let (inbound_tx, inbound_rx) = unbounded();
    let (events_tx, events_rx) = unbounded();
    let versions = Arc::new(RwLock::new(HashMap::new()));

    let handle = DomainHandle {
        inbound_tx,
        events_rx,
        versions: versions.clone(),
    };
    let processor = DomainProcessor {
        domain_id,
        limits,
        supervisors: HashMap::new(),
        media: MediaJobTracker::new(media_policy),
        inbound_rx,
        events_tx,
        versions,
    };

    (handle, processor)
}

impl DomainProcessor {
    #[inline]
    pub fn domain_id(&self) -> &DomainId {
        &self.domain_id
    }

    pub fn session(&self, id: &AppSessionId) -> Option<&VersionedSession> {
        self.supervisors.get(id).map(|s| s.session())
    }

    #[inline]
    pub fn media(&self) -> &MediaJobTracker {
        &self.media
    }

    #[inline]
    pub fn media_mut(&mut self) -> &mut MediaJobTracker {
        &mut self.media
    }

    /// Drain the inbound queue, then publish packets for every session
    /// something happened to
    pub fn process(&mut self) {
        let mut touched = HashSet::new();

        while let Ok(inbound) = self.inbound_rx.try_recv() {
            match inbound {
                Inbound::Command(command) => {
                    let session_id = command.session_id().clone();
                    self.handle_command(command);
                    touched.insert(session_id);
                }
                Inbound::EngineEvent(event) => {
                    self.handle_engine_event(event, &mut touched);
                }
                Inbound::DownloadState(id, state) => {
                    self.media.update_download(&id, state);
                    touched.extend(self.media.sessions_referencing(&id));
                }
                Inbound::UploadState(id, state) => {
                    self.media.update_upload(&id, state);
                    touched.extend(self.media.sessions_referencing(&id));
                }
            }
        }

        for id in self.media.sweep_unreferenced(now()) {
            log::debug!("Media object {id} evicted");
        }

        for session_id in touched {
            if let Some(supervisor) = self.supervisors.get_mut(&session_id) {
                let packet = supervisor.take_packet(&self.media);
                let _ = self
                    .events_tx
                    .send(DomainEvent::Socket(WebSocketEvent::Packet(session_id, packet)));
            }
        }
    }

    fn handle_command(&mut self, command: DomainSessionCommand) {
        let session_id = command.session_id().clone();
        log::debug!("Session {session_id}: handling {}", command.kind());

        let result = match command {
            DomainSessionCommand::Create { app_session_id, create } => {
                self.create_session(app_session_id, create)
            }
            other => match self.supervisors.get_mut(&session_id) {
                Some(supervisor) => supervisor.handle_command(other),
                None => Err(SessionError::NotFound(session_id.clone())),
            },
        };

        match result {
            Ok(events) => {
                for event in events {
                    if let DomainEvent::Media(MediaServiceCommand::SetSessionMedia {
                        session_id,
                        media,
                    }) = &event
                    {
                        self.media.set_session_media(session_id, media.clone());
                    }
                    if let DomainEvent::Media(MediaServiceCommand::DeleteSession { session_id }) =
                        &event
                    {
                        self.media.delete_session(session_id);
                    }
                    let _ = self.events_tx.send(event);
                }
                self.publish_version(&session_id);
            }
            Err(error) => {
                log::warn!("Session {session_id}: command rejected: {error}");
                let _ = self.events_tx.send(DomainEvent::Socket(WebSocketEvent::SessionError(
                    session_id,
                    error.to_string(),
                )));
            }
        }
    }

    fn create_session(
        &mut self,
        app_session_id: AppSessionId,
        create: CreateSession,
    ) -> Result<Vec<DomainEvent>, SessionError> {
        if let Some(existing) = self.supervisors.get(&app_session_id) {
            if !existing.session().is_deleted() {
                return Err(SessionError::Conflict {
                    expected: 0,
                    actual: existing.session().version(),
                });
            }
        }

        let active = self
            .supervisors
            .values()
            .filter(|s| !s.session().is_deleted())
            .count();

        if create.dry_run {
            VersionedSession::validate_create(&create, active, &self.limits)?;
            log::info!("Session {app_session_id}: dry-run create validated");
            return Ok(Vec::new());
        }

        let session = VersionedSession::create(app_session_id.clone(), create, active, &self.limits)?;
        let supervisor = SessionSupervisor::new(session);

        let mut events = Vec::new();
        events.push(DomainEvent::Engine(AudioEngineCommand::SetSpec {
            session_id: app_session_id.clone(),
            spec: supervisor.session().spec().clone(),
        }));
        supervisor.push_spec_events(&mut events);
        events.push(DomainEvent::Socket(WebSocketEvent::State(
            app_session_id.clone(),
            supervisor.playback().state().clone(),
        )));

        self.supervisors.insert(app_session_id, supervisor);
        Ok(events)
    }

    fn handle_engine_event(&mut self, event: AudioEngineEvent, touched: &mut HashSet<AppSessionId>) {
        let session_id = match &event {
            AudioEngineEvent::Loaded => {
                // the engine came (back) up; every session hears it
                for (id, supervisor) in self.supervisors.iter_mut() {
                    supervisor.set_engine_ready(true);
                    touched.insert(id.clone());
                }
                return;
            }
            AudioEngineEvent::Stopped { session_id }
            | AudioEngineEvent::Playing { session_id, .. }
            | AudioEngineEvent::PlayingFailed { session_id, .. }
            | AudioEngineEvent::Rendering { session_id, .. }
            | AudioEngineEvent::RenderingFinished { session_id, .. }
            | AudioEngineEvent::RenderingFailed { session_id, .. }
            | AudioEngineEvent::Error { session_id, .. } => session_id.clone(),
        };

        let Some(supervisor) = self.supervisors.get_mut(&session_id) else {
            log::warn!("Engine event for unknown session {session_id}");
            return;
        };

        for event in supervisor.handle_engine_event(event) {
            let _ = self.events_tx.send(event);
        }
        touched.insert(session_id);
    }

    fn publish_version(&self, session_id: &AppSessionId) {
        if let Some(supervisor) = self.supervisors.get(session_id) {
            self.versions
                .write()
                .insert(session_id.clone(), supervisor.session().version());
        }
    }
}
