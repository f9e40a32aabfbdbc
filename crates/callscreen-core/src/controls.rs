use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

use crate::errors::CallError;
use crate::events::{CallEvent, EventEmitter};
use crate::rtc::LocalTrack;

/// Non-owning handle to a track owned by the UI kit.
///
/// The kit decides when the track is closed and released; once it has been
/// dropped there, every operation here becomes a no-op.
#[derive(Clone)]
pub struct TrackRef(Weak<dyn LocalTrack>);

impl TrackRef {
    pub fn new(track: &Arc<dyn LocalTrack>) -> Self {
        Self(Arc::downgrade(track))
    }

    pub fn get(&self) -> Option<Arc<dyn LocalTrack>> {
        self.0.upgrade()
    }
}

/// Controls for the local camera and microphone.
///
/// Mirrors the mute state reported by the UI kit onto the borrowed tracks
/// and drives the shell's own enable/disable buttons. It never closes or
/// republishes a track.
pub struct LocalMedia {
    emitter: EventEmitter,
    audio: Arc<Mutex<Option<TrackRef>>>,
    video: Arc<Mutex<Option<TrackRef>>>,
}

impl LocalMedia {
    pub fn new(emitter: EventEmitter) -> Self {
        Self {
            emitter,
            audio: Arc::new(Mutex::new(None)),
            video: Arc::new(Mutex::new(None)),
        }
    }

    /// Borrow the tracks the UI kit created.
    pub async fn attach(&self, audio: &Arc<dyn LocalTrack>, video: &Arc<dyn LocalTrack>) {
        *self.audio.lock().await = Some(TrackRef::new(audio));
        *self.video.lock().await = Some(TrackRef::new(video));
        tracing::info!("local tracks attached: audio={} video={}", audio.id(), video.id());
    }

    /// Forget the borrowed tracks without touching them.
    pub async fn detach(&self) {
        self.audio.lock().await.take();
        self.video.lock().await.take();
    }

    /// Flip the microphone's enabled flag. Returns the new value, or
    /// `None` when no track is attached.
    pub async fn toggle_audio(&self) -> Result<Option<bool>, CallError> {
        let Some(track) = Self::current(&self.audio).await else {
            return Ok(None);
        };
        let enabled = !track.is_enabled();
        track.set_enabled(enabled).await?;
        tracing::info!("microphone enabled: {enabled}");
        Ok(Some(enabled))
    }

    /// Flip the camera's enabled flag.
    pub async fn toggle_video(&self) -> Result<Option<bool>, CallError> {
        let Some(track) = Self::current(&self.video).await else {
            return Ok(None);
        };
        let enabled = !track.is_enabled();
        track.set_enabled(enabled).await?;
        tracing::info!("camera enabled: {enabled}");
        Ok(Some(enabled))
    }

    /// Apply a mute change reported by the UI kit to the microphone.
    pub async fn apply_audio_mute(&self, muted: bool) -> Result<(), CallError> {
        if let Some(track) = Self::current(&self.audio).await {
            track.set_muted(muted).await?;
        }
        self.emitter.emit(CallEvent::LocalAudioMuted(muted));
        Ok(())
    }

    /// Apply a mute change reported by the UI kit to the camera.
    pub async fn apply_video_mute(&self, muted: bool) -> Result<(), CallError> {
        if let Some(track) = Self::current(&self.video).await {
            track.set_muted(muted).await?;
        }
        self.emitter.emit(CallEvent::LocalVideoMuted(muted));
        Ok(())
    }

    pub async fn audio_enabled(&self) -> Option<bool> {
        Self::current(&self.audio).await.map(|t| t.is_enabled())
    }

    pub async fn video_enabled(&self) -> Option<bool> {
        Self::current(&self.video).await.map(|t| t.is_enabled())
    }

    async fn current(slot: &Mutex<Option<TrackRef>>) -> Option<Arc<dyn LocalTrack>> {
        slot.lock().await.as_ref().and_then(TrackRef::get)
    }
}
