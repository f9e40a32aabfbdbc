//! In-memory SDK used by the terminal host and the test suite.
//!
//! Nothing leaves the process. Channel membership, publications, closed
//! tracks and capture requests are recorded so lifecycle invariants can be
//! checked from the outside.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::config::SessionCredentials;
use crate::errors::CallError;
use crate::events::TrackKind;
use crate::rtc::{
    AudioCapture, CaptureRequest, ClientConfig, LocalTrack, RtcClient, RtcEngine, ScreenCapture,
};
use crate::uikit::{CallUiKit, UiKitProps};

/// Scripted answer of the screen capture picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerResponse {
    VideoOnly,
    /// Video plus system audio; degrades to video only when the request
    /// did not ask for audio.
    VideoWithAudio,
    Cancel,
    Fail(String),
}

#[derive(Debug, Default)]
struct NetworkState {
    members: HashMap<String, usize>,
    clients_created: usize,
    published: usize,
    unpublished: usize,
    closed: Vec<String>,
    capture_requests: Vec<AudioCapture>,
    picker: VecDeque<PickerResponse>,
    fail_join: bool,
    fail_publish: bool,
    fail_unpublish: bool,
    picker_gate: Option<Arc<Notify>>,
}

#[derive(Debug, Default, Clone)]
struct Network(Arc<Mutex<NetworkState>>);

impl Network {
    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A local track living entirely in memory.
pub struct LoopbackTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    muted: AtomicBool,
    closed: AtomicBool,
    network: Network,
}

impl LoopbackTrack {
    fn new(kind: TrackKind, network: Network) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            enabled: AtomicBool::new(true),
            muted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            network,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalTrack for LoopbackTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn set_enabled(&self, enabled: bool) -> Result<(), CallError> {
        if self.is_closed() {
            return Err(CallError::Track(format!("track {} is closed", self.id)));
        }
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    async fn set_muted(&self, muted: bool) -> Result<(), CallError> {
        if self.is_closed() {
            return Err(CallError::Track(format!("track {} is closed", self.id)));
        }
        self.muted.store(muted, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.network.lock().closed.push(self.id.clone());
        }
    }
}

pub struct LoopbackClient {
    network: Network,
    channel: Mutex<Option<String>>,
    tracks: Mutex<Vec<Arc<dyn LocalTrack>>>,
}

impl LoopbackClient {
    fn channel(&self) -> MutexGuard<'_, Option<String>> {
        self.channel.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tracks(&self) -> MutexGuard<'_, Vec<Arc<dyn LocalTrack>>> {
        self.tracks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RtcClient for LoopbackClient {
    async fn join(&self, credentials: &SessionCredentials) -> Result<(), CallError> {
        let mut channel = self.channel();
        if channel.is_some() {
            return Err(CallError::Join("client already joined".into()));
        }
        let mut net = self.network.lock();
        if net.fail_join {
            return Err(CallError::Join(format!("cannot join {}", credentials.channel)));
        }
        *net.members.entry(credentials.channel.clone()).or_default() += 1;
        *channel = Some(credentials.channel.clone());
        Ok(())
    }

    async fn publish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), CallError> {
        if self.channel().is_none() {
            return Err(CallError::Publish("client not joined".into()));
        }
        let mut net = self.network.lock();
        if net.fail_publish {
            return Err(CallError::Publish("publish rejected".into()));
        }
        net.published += tracks.len();
        self.tracks().extend(tracks.iter().cloned());
        Ok(())
    }

    async fn unpublish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), CallError> {
        let mut net = self.network.lock();
        if net.fail_unpublish {
            return Err(CallError::Unpublish("unpublish rejected".into()));
        }
        let mut published = self.tracks();
        let before = published.len();
        published.retain(|t| !tracks.iter().any(|u| u.id() == t.id()));
        net.unpublished += before - published.len();
        Ok(())
    }

    async fn leave(&self) -> Result<(), CallError> {
        let Some(channel) = self.channel().take() else {
            return Ok(());
        };
        let mut net = self.network.lock();
        if let Some(count) = net.members.get_mut(&channel) {
            *count = count.saturating_sub(1);
        }
        self.tracks().clear();
        Ok(())
    }

    fn local_tracks(&self) -> Vec<Arc<dyn LocalTrack>> {
        self.tracks().clone()
    }
}

/// In-memory [`RtcEngine`] with a scriptable capture picker.
#[derive(Clone)]
pub struct LoopbackEngine {
    network: Network,
    default_response: PickerResponse,
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            network: Network::default(),
            default_response: PickerResponse::VideoOnly,
        }
    }

    /// Response used once the scripted queue is exhausted.
    pub fn with_default_response(mut self, response: PickerResponse) -> Self {
        self.default_response = response;
        self
    }

    /// Queue picker answers, consumed one per capture request.
    pub fn script_picker(&self, responses: impl IntoIterator<Item = PickerResponse>) {
        self.network.lock().picker.extend(responses);
    }

    /// Keep the next capture request pending until the returned handle is
    /// notified, as a user would by leaving the picker open.
    pub fn hold_picker(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.network.lock().picker_gate = Some(gate.clone());
        gate
    }

    pub fn set_fail_join(&self, fail: bool) {
        self.network.lock().fail_join = fail;
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.network.lock().fail_publish = fail;
    }

    pub fn set_fail_unpublish(&self, fail: bool) {
        self.network.lock().fail_unpublish = fail;
    }

    /// Create camera and microphone tracks, as the UI kit would on join.
    pub fn create_local_tracks(&self) -> (Arc<dyn LocalTrack>, Arc<dyn LocalTrack>) {
        let audio: Arc<dyn LocalTrack> =
            Arc::new(LoopbackTrack::new(TrackKind::Audio, self.network.clone()));
        let video: Arc<dyn LocalTrack> =
            Arc::new(LoopbackTrack::new(TrackKind::Video, self.network.clone()));
        (audio, video)
    }

    pub fn joined_count(&self, channel: &str) -> usize {
        self.network.lock().members.get(channel).copied().unwrap_or(0)
    }

    pub fn clients_created(&self) -> usize {
        self.network.lock().clients_created
    }

    pub fn published_count(&self) -> usize {
        self.network.lock().published
    }

    pub fn unpublished_count(&self) -> usize {
        self.network.lock().unpublished
    }

    pub fn closed_tracks(&self) -> Vec<String> {
        self.network.lock().closed.clone()
    }

    pub fn capture_requests(&self) -> Vec<AudioCapture> {
        self.network.lock().capture_requests.clone()
    }
}

#[async_trait]
impl RtcEngine for LoopbackEngine {
    fn create_client(&self, config: &ClientConfig) -> Arc<dyn RtcClient> {
        tracing::debug!("loopback: creating client {config:?}");
        self.network.lock().clients_created += 1;
        Arc::new(LoopbackClient {
            network: self.network.clone(),
            channel: Mutex::new(None),
            tracks: Mutex::new(Vec::new()),
        })
    }

    async fn create_screen_track(
        &self,
        request: &CaptureRequest,
    ) -> Result<ScreenCapture, CallError> {
        let gate = self.network.lock().picker_gate.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let response = {
            let mut net = self.network.lock();
            net.capture_requests.push(request.audio);
            net.picker.pop_front().unwrap_or_else(|| self.default_response.clone())
        };

        let video = || -> Arc<dyn LocalTrack> {
            Arc::new(LoopbackTrack::new(TrackKind::Video, self.network.clone()))
        };

        match response {
            PickerResponse::Cancel => Err(CallError::CaptureCancelled),
            PickerResponse::Fail(reason) => Err(CallError::Capture(reason)),
            PickerResponse::VideoOnly => Ok(ScreenCapture::Video(video())),
            PickerResponse::VideoWithAudio => match request.audio {
                AudioCapture::Enable => Ok(ScreenCapture::VideoWithAudio {
                    video: video(),
                    audio: Arc::new(LoopbackTrack::new(TrackKind::Audio, self.network.clone())),
                }),
                AudioCapture::Disable => Ok(ScreenCapture::Video(video())),
            },
        }
    }
}

/// Stand-in for the call UI kit: records mounts and owns the local
/// camera/microphone tracks for the lifetime of a mount.
pub struct LoopbackUiKit {
    engine: LoopbackEngine,
    mounted: Mutex<Option<UiKitProps>>,
    mounts: Mutex<usize>,
    tracks: Mutex<Option<(Arc<dyn LocalTrack>, Arc<dyn LocalTrack>)>>,
}

impl LoopbackUiKit {
    pub fn new(engine: LoopbackEngine) -> Self {
        Self {
            engine,
            mounted: Mutex::new(None),
            mounts: Mutex::new(0),
            tracks: Mutex::new(None),
        }
    }

    pub fn mounted_props(&self) -> Option<UiKitProps> {
        self.mounted.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn mount_count(&self) -> usize {
        *self.mounts.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The (audio, video) tracks owned by the current mount.
    pub fn local_tracks(&self) -> Option<(Arc<dyn LocalTrack>, Arc<dyn LocalTrack>)> {
        self.tracks.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl CallUiKit for LoopbackUiKit {
    async fn mount(&self, props: &UiKitProps) -> Result<(), CallError> {
        *self.mounted.lock().unwrap_or_else(|p| p.into_inner()) = Some(props.clone());
        *self.mounts.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        let tracks = self.engine.create_local_tracks();
        *self.tracks.lock().unwrap_or_else(|p| p.into_inner()) = Some(tracks);
        Ok(())
    }

    async fn unmount(&self) {
        *self.mounted.lock().unwrap_or_else(|p| p.into_inner()) = None;
        if let Some((audio, video)) = self.tracks.lock().unwrap_or_else(|p| p.into_inner()).take() {
            audio.close();
            video.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::ScreenTrackConfig;

    fn creds() -> SessionCredentials {
        SessionCredentials::new("A1", "room1", "T1")
    }

    #[tokio::test]
    async fn join_and_leave_track_membership() {
        let engine = LoopbackEngine::new();
        let client = engine.create_client(&ClientConfig::default());

        client.join(&creds()).await.unwrap();
        assert_eq!(engine.joined_count("room1"), 1);

        client.leave().await.unwrap();
        assert_eq!(engine.joined_count("room1"), 0);

        // Second leave is harmless.
        client.leave().await.unwrap();
        assert_eq!(engine.joined_count("room1"), 0);
    }

    #[tokio::test]
    async fn publish_requires_join() {
        let engine = LoopbackEngine::new();
        let client = engine.create_client(&ClientConfig::default());
        let (audio, _) = engine.create_local_tracks();
        let err = client.publish(&[audio]).await.unwrap_err();
        assert!(matches!(err, CallError::Publish(_)));
    }

    #[tokio::test]
    async fn picker_degrades_to_video_without_audio_request() {
        let engine = LoopbackEngine::new();
        engine.script_picker([PickerResponse::VideoWithAudio]);
        let request = CaptureRequest::with_audio(ScreenTrackConfig::default()).without_audio();
        let capture = engine.create_screen_track(&request).await.unwrap();
        assert!(!capture.has_audio());
        assert_eq!(engine.capture_requests(), vec![AudioCapture::Disable]);
    }

    #[test]
    fn close_is_recorded_once() {
        let engine = LoopbackEngine::new();
        let (audio, _) = engine.create_local_tracks();
        audio.close();
        audio.close();
        assert_eq!(engine.closed_tracks(), vec![audio.id().to_string()]);
    }
}
