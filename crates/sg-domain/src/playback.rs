//! Playback state machine
//!
//! Reconciles the client's desired play state against what the audio
//! engine has actually confirmed. The machine never blocks waiting for
//! the engine: it parks in a transitional mode until an event arrives,
//! and a desired-state change mid-transition re-targets the transition
//! while the superseded request is aborted at the engine. Acks that no
//! longer match the current target id are ignored.

use sg_api::{
    AppSessionId, AudioEngineCommand, AudioEngineEvent, DesiredSessionPlayState, PlaySession,
    RenderSession, SessionMode, SessionPacketError, SessionPlayState, SessionState,
    SuccessfulRenderNotification,
};

/// Output of feeding one input into the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Send this to the audio engine
    Engine(AudioEngineCommand),
    /// Desired or actual state changed; publish to subscribers
    StateChanged(SessionState),
    /// Surface this failure in the next session packet
    PacketError(SessionPacketError),
    /// A render completed; notify the requester
    RenderComplete(SuccessfulRenderNotification),
}

/// Desired/actual reconciliation for one session
#[derive(Debug, Clone)]
pub struct PlaybackStateMachine {
    session_id: AppSessionId,
    mode: SessionMode,
    state: SessionState,
}

impl PlaybackStateMachine {
    pub fn new(session_id: AppSessionId) -> Self {
        Self {
            session_id,
            mode: SessionMode::Idle,
            state: SessionState::default(),
        }
    }

    #[inline]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[inline]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Client changed the desired play state
    pub fn set_desired(&mut self, desired: DesiredSessionPlayState) -> Vec<PlaybackEvent> {
        if self.state.desired_play_state.value() == &desired && !self.mode.is_idle() {
            // already working towards exactly this target
            return Vec::new();
        }

        let mut events = Vec::new();

        if self.state.play_state.value().satisfies(&desired) {
            self.state.desired_play_state.set(desired);
            events.push(PlaybackEvent::StateChanged(self.state.clone()));
            return events;
        }

        match &desired {
            DesiredSessionPlayState::Stopped => self.begin_stop(&mut events),
            DesiredSessionPlayState::Play(play) => {
                let play = play.clone();
                self.abort_superseded(&mut events);
                log::debug!("Session {}: preparing to play {}", self.session_id, play.play_id);
                self.mode = SessionMode::PreparingToPlay(play.play_id);
                self.state.play_state.set(SessionPlayState::PreparingToPlay(play.clone()));
                events.push(PlaybackEvent::Engine(AudioEngineCommand::Play {
                    session_id: self.session_id.clone(),
                    play,
                }));
            }
            DesiredSessionPlayState::Render(render) => {
                let render = render.clone();
                self.abort_superseded(&mut events);
                log::debug!(
                    "Session {}: preparing to render {}",
                    self.session_id,
                    render.render_id
                );
                self.mode = SessionMode::PreparingToRender(render.render_id);
                self.state
                    .play_state
                    .set(SessionPlayState::PreparingToRender(render.clone()));
                events.push(PlaybackEvent::Engine(AudioEngineCommand::Render {
                    session_id: self.session_id.clone(),
                    render,
                }));
            }
        }

        self.state.desired_play_state.set(desired);
        events.push(PlaybackEvent::StateChanged(self.state.clone()));
        events
    }

    /// The engine reported something
    pub fn handle_engine_event(&mut self, event: AudioEngineEvent) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();

        match event {
            AudioEngineEvent::Playing { play_id, .. } => {
                if self.mode == SessionMode::PreparingToPlay(play_id) {
                    if let Some(play) = self.desired_play(play_id) {
                        self.mode = SessionMode::Playing(play_id);
                        self.state.play_state.set(SessionPlayState::Playing(play));
                        events.push(PlaybackEvent::StateChanged(self.state.clone()));
                    }
                } else {
                    log::debug!(
                        "Session {}: ignoring stale playing ack for {play_id}",
                        self.session_id
                    );
                }
            }
            AudioEngineEvent::Rendering { render_id, .. } => {
                if self.mode == SessionMode::PreparingToRender(render_id) {
                    if let Some(render) = self.desired_render(render_id) {
                        self.mode = SessionMode::Rendering(render_id);
                        self.state.play_state.set(SessionPlayState::Rendering(render));
                        events.push(PlaybackEvent::StateChanged(self.state.clone()));
                    }
                } else {
                    log::debug!(
                        "Session {}: ignoring stale rendering ack for {render_id}",
                        self.session_id
                    );
                }
            }
            AudioEngineEvent::Stopped { .. } => match self.mode {
                SessionMode::StoppingPlay(_) | SessionMode::StoppingRender(_) => {
                    self.mode = SessionMode::Idle;
                    self.state.play_state.set(SessionPlayState::Stopped);
                    events.push(PlaybackEvent::StateChanged(self.state.clone()));
                }
                SessionMode::Idle => {
                    if !self.state.play_state.value().is_stopped() {
                        self.state.play_state.set(SessionPlayState::Stopped);
                        events.push(PlaybackEvent::StateChanged(self.state.clone()));
                    }
                }
                // a stop ack for a superseded request; the retargeted
                // transition is still in flight
                _ => {
                    log::debug!("Session {}: ignoring stale stop ack", self.session_id);
                }
            },
            AudioEngineEvent::PlayingFailed { play_id, error, .. } => {
                if self.mode.play_id() == Some(play_id) {
                    log::warn!("Session {}: play {play_id} failed: {error}", self.session_id);
                    self.force_idle(&mut events);
                    events.push(PlaybackEvent::PacketError(SessionPacketError::Playing(
                        play_id, error,
                    )));
                }
            }
            AudioEngineEvent::RenderingFailed { render_id, error, .. } => {
                if self.mode.render_id() == Some(render_id) {
                    log::warn!(
                        "Session {}: render {render_id} failed: {error}",
                        self.session_id
                    );
                    self.force_idle(&mut events);
                    events.push(PlaybackEvent::PacketError(SessionPacketError::Rendering(
                        render_id, error,
                    )));
                }
            }
            AudioEngineEvent::RenderingFinished { render_id, .. } => {
                if self.mode.render_id() == Some(render_id) {
                    let notification = self.desired_render(render_id).map(|render| {
                        SuccessfulRenderNotification {
                            render_id,
                            object_id: render.object_id.object_id,
                            context: render.context,
                        }
                    });

                    log::info!("Session {}: render {render_id} finished", self.session_id);
                    self.mode = SessionMode::Idle;
                    self.state.play_state.set(SessionPlayState::Stopped);
                    // a finished render is a one-shot; the session no
                    // longer desires anything
                    self.state.desired_play_state.set(DesiredSessionPlayState::Stopped);

                    if let Some(notification) = notification {
                        events.push(PlaybackEvent::RenderComplete(notification));
                    }
                    events.push(PlaybackEvent::StateChanged(self.state.clone()));
                }
            }
            AudioEngineEvent::Error { error, .. } => {
                events.push(PlaybackEvent::PacketError(SessionPacketError::General(
                    error.to_string(),
                )));
            }
            AudioEngineEvent::Loaded => {}
        }

        events
    }

    /// Move towards stopped from whatever is in flight
    fn begin_stop(&mut self, events: &mut Vec<PlaybackEvent>) {
        match self.mode {
            SessionMode::PreparingToPlay(play_id) | SessionMode::Playing(play_id) => {
                self.mode = SessionMode::StoppingPlay(play_id);
                self.state.play_state.set(SessionPlayState::StoppingPlay(play_id));
                events.push(self.stop_command());
            }
            SessionMode::PreparingToRender(render_id) | SessionMode::Rendering(render_id) => {
                self.mode = SessionMode::StoppingRender(render_id);
                self.state
                    .play_state
                    .set(SessionPlayState::StoppingRender(render_id));
                events.push(self.stop_command());
            }
            // idle or already stopping: nothing new to tell the engine
            SessionMode::Idle | SessionMode::StoppingPlay(_) | SessionMode::StoppingRender(_) => {}
        }
    }

    /// A new target supersedes whatever the engine is working on
    fn abort_superseded(&mut self, events: &mut Vec<PlaybackEvent>) {
        if !self.mode.is_idle() {
            log::debug!(
                "Session {}: aborting superseded transition {:?}",
                self.session_id,
                self.mode
            );
            events.push(self.stop_command());
        }
    }

    fn force_idle(&mut self, events: &mut Vec<PlaybackEvent>) {
        self.mode = SessionMode::Idle;
        self.state.play_state.set(SessionPlayState::Stopped);
        events.push(PlaybackEvent::StateChanged(self.state.clone()));
    }

    fn stop_command(&self) -> PlaybackEvent {
        PlaybackEvent::Engine(AudioEngineCommand::Stop {
            session_id: self.session_id.clone(),
        })
    }

    fn desired_play(&self, play_id: sg_api::PlayId) -> Option<PlaySession> {
        match self.state.desired_play_state.value() {
            DesiredSessionPlayState::Play(play) if play.play_id == play_id => Some(play.clone()),
            _ => None,
        }
    }

    fn desired_render(&self, render_id: sg_api::RenderId) -> Option<RenderSession> {
        match self.state.desired_play_state.value() {
            DesiredSessionPlayState::Render(render) if render.render_id == render_id => {
                Some(render.clone())
            }
            _ => None,
        }
    }
}
