use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::config::SessionCredentials;
use crate::errors::CallError;
use crate::events::{CallEvent, EventEmitter, ScreenShareState};
use crate::retry::CaptureRetryPolicy;
use crate::rtc::{
    CaptureRequest, ClientConfig, LocalTrack, RtcClient, RtcEngine, ScreenCapture,
    ScreenTrackConfig,
};

/// Outcome of a successful [`ScreenShareController::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareStarted {
    /// Number of tracks published (1 for video, 2 for video + system audio).
    pub published: usize,
    /// Capture attempts beyond the first.
    pub retries: u32,
}

/// A dedicated client joined to the channel with its published tracks.
struct ScreenSession {
    client: Arc<dyn RtcClient>,
    tracks: Vec<Arc<dyn LocalTrack>>,
}

/// Holds a joined client until `start` settles. If the start future is
/// dropped first, the client and any captured tracks are released in the
/// background.
struct PendingStart {
    client: Option<Arc<dyn RtcClient>>,
    tracks: Vec<Arc<dyn LocalTrack>>,
}

impl PendingStart {
    fn new(client: Arc<dyn RtcClient>) -> Self {
        Self {
            client: Some(client),
            tracks: Vec::new(),
        }
    }

    fn disarm(mut self) {
        self.client = None;
        self.tracks.clear();
    }
}

impl Drop for PendingStart {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        tracing::warn!("screen share: start cancelled, releasing client");
        release_detached(ScreenSession {
            client,
            tracks: std::mem::take(&mut self.tracks),
        });
    }
}

/// Publishes a captured screen into the call through a second client.
///
/// The session slot lives behind an async mutex that stays locked for the
/// whole duration of a start or stop, so a second `start`/`stop`/`toggle`
/// while one is pending fails fast with [`CallError::ScreenShareBusy`].
pub struct ScreenShareController {
    engine: Arc<dyn RtcEngine>,
    credentials: Arc<SessionCredentials>,
    emitter: EventEmitter,
    client_config: ClientConfig,
    track_config: ScreenTrackConfig,
    retry: CaptureRetryPolicy,
    session: Mutex<Option<ScreenSession>>,
    state: watch::Sender<ScreenShareState>,
}

impl ScreenShareController {
    pub fn new(
        engine: Arc<dyn RtcEngine>,
        credentials: Arc<SessionCredentials>,
        emitter: EventEmitter,
    ) -> Self {
        let (state, _) = watch::channel(ScreenShareState::Idle);
        Self {
            engine,
            credentials,
            emitter,
            client_config: ClientConfig::default(),
            track_config: ScreenTrackConfig::default(),
            retry: CaptureRetryPolicy::default(),
            session: Mutex::new(None),
            state,
        }
    }

    pub fn with_retry_policy(mut self, retry: CaptureRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_track_config(mut self, config: ScreenTrackConfig) -> Self {
        self.track_config = config;
        self
    }

    pub fn state(&self) -> ScreenShareState {
        *self.state.borrow()
    }

    /// Watch state transitions (for UI bindings).
    pub fn watch(&self) -> watch::Receiver<ScreenShareState> {
        self.state.subscribe()
    }

    /// True while a start or stop is in flight.
    pub fn is_busy(&self) -> bool {
        self.session.try_lock().is_err()
    }

    pub async fn start(&self) -> Result<ShareStarted, CallError> {
        let mut slot = self.session.try_lock().map_err(|_| CallError::ScreenShareBusy)?;
        self.start_locked(&mut slot).await
    }

    /// Stop sharing. Returns `false` when there was nothing to stop.
    pub async fn stop(&self) -> Result<bool, CallError> {
        let mut slot = self.session.try_lock().map_err(|_| CallError::ScreenShareBusy)?;
        self.stop_locked(&mut slot).await
    }

    /// Start when idle, stop when sharing. Returns the resulting state.
    pub async fn toggle(&self) -> Result<ScreenShareState, CallError> {
        let mut slot = self.session.try_lock().map_err(|_| CallError::ScreenShareBusy)?;
        if slot.is_some() {
            self.stop_locked(&mut slot).await?;
        } else {
            self.start_locked(&mut slot).await?;
        }
        Ok(self.state())
    }

    /// Wait for any in-flight operation, then stop if sharing.
    ///
    /// Used on call end and teardown, where a pending toggle must not keep
    /// the capture alive.
    pub async fn shutdown(&self) -> Result<bool, CallError> {
        let mut slot = self.session.lock().await;
        self.stop_locked(&mut slot).await
    }

    async fn start_locked(
        &self,
        slot: &mut Option<ScreenSession>,
    ) -> Result<ShareStarted, CallError> {
        if slot.is_some() {
            return Err(CallError::AlreadySharing);
        }

        let client = self.engine.create_client(&self.client_config);
        let mut pending = PendingStart::new(client.clone());
        if let Err(e) = client.join(&self.credentials).await {
            tracing::warn!("screen share: join failed: {e}");
            abandon(client.as_ref()).await;
            pending.disarm();
            return Err(e);
        }
        tracing::info!("screen share: client joined {}", self.credentials.channel);

        let (capture, retries) = match self.capture().await {
            Ok(captured) => captured,
            Err(e) => {
                match &e {
                    CallError::CaptureCancelled => tracing::info!("screen share: picker cancelled"),
                    other => tracing::error!("screen share: capture failed: {other}"),
                }
                abandon(client.as_ref()).await;
                pending.disarm();
                return Err(e);
            }
        };

        let tracks = capture.into_tracks();
        pending.tracks = tracks.clone();
        if let Err(e) = client.publish(&tracks).await {
            tracing::error!("screen share: publish failed: {e}");
            for track in &tracks {
                track.close();
            }
            abandon(client.as_ref()).await;
            pending.disarm();
            return Err(e);
        }

        let published = tracks.len();
        tracing::info!("screen share: published {published} track(s), {retries} capture retries");
        *slot = Some(ScreenSession { client, tracks });
        pending.disarm();
        self.set_state(ScreenShareState::Sharing);

        Ok(ShareStarted { published, retries })
    }

    /// The session stays in the slot until teardown finishes, so a stop
    /// dropped halfway leaves it for the next stop to release.
    async fn stop_locked(&self, slot: &mut Option<ScreenSession>) -> Result<bool, CallError> {
        let Some(session) = slot.as_ref() else {
            tracing::debug!("screen share: stop while idle, nothing to do");
            return Ok(false);
        };

        let result = teardown(session).await;
        *slot = None;
        self.set_state(ScreenShareState::Idle);
        result.map(|()| true)
    }

    /// Request the capture track, applying the retry policy.
    async fn capture(&self) -> Result<(ScreenCapture, u32), CallError> {
        let initial = CaptureRequest::with_audio(self.track_config.clone());
        let mut attempt = 1;
        loop {
            let request = self.retry.request_for_attempt(&initial, attempt);
            match self.engine.create_screen_track(&request).await {
                Ok(capture) => return Ok((capture, attempt - 1)),
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    tracing::warn!("screen capture attempt {attempt} failed: {e}, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn set_state(&self, state: ScreenShareState) {
        self.state.send_replace(state);
        self.emitter.emit(CallEvent::ScreenShareChanged(state));
    }
}

impl Drop for ScreenShareController {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            tracing::warn!("screen share controller dropped while sharing, stopping");
            release_detached(session);
        }
    }
}

/// Run the teardown on the current runtime, or close the tracks when there
/// is none.
fn release_detached(session: ScreenSession) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = teardown(&session).await {
                    tracing::warn!("screen share: background teardown failed: {e}");
                }
            });
        }
        Err(_) => {
            tracing::warn!("screen share: no runtime, closing tracks only");
            for track in &session.tracks {
                track.close();
            }
        }
    }
}

/// Unpublish, close every track, leave. Every step runs even if an earlier
/// one failed; the first error is returned afterwards.
async fn teardown(session: &ScreenSession) -> Result<(), CallError> {
    let client = &session.client;
    let mut tracks = session.tracks.clone();
    for track in client.local_tracks() {
        if !tracks.iter().any(|t| t.id() == track.id()) {
            tracks.push(track);
        }
    }

    let mut first_error = None;

    if !tracks.is_empty() {
        if let Err(e) = client.unpublish(&tracks).await {
            tracing::warn!("screen share: unpublish failed: {e}");
            first_error.get_or_insert(e);
        }
    }

    for track in &tracks {
        track.close();
    }
    tracing::info!("screen share: closed {} track(s)", tracks.len());

    if let Err(e) = client.leave().await {
        tracing::warn!("screen share: leave failed: {e}");
        first_error.get_or_insert(e);
    }
    tracing::info!("screen share: client left");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Best-effort leave on a failed start path.
async fn abandon(client: &dyn RtcClient) {
    if let Err(e) = client.leave().await {
        tracing::warn!("screen share: leave after failed start also failed: {e}");
    }
}
