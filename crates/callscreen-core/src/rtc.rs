//! Boundary to the external real-time SDK.
//!
//! Media capture, encoding, transport and signaling all live behind these
//! traits. The core only creates clients, joins/leaves channels and moves
//! track handles around.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::SessionCredentials;
use crate::errors::CallError;
use crate::events::TrackKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Rtc,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    Vp8,
    H264,
}

/// Options for creating a client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    pub mode: ChannelMode,
    pub codec: VideoCodec,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: ChannelMode::Rtc,
            codec: VideoCodec::Vp8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMode {
    Detail,
    Motion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplaySurface {
    Browser,
    Window,
    Monitor,
}

/// Include/exclude switch used by several capture preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Include,
    Exclude,
}

/// Encoding and picker preferences for the screen capture track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenTrackConfig {
    pub encoder_config: String,
    pub optimization_mode: OptimizationMode,
    pub display_surface: DisplaySurface,
    pub system_audio: Preference,
    pub self_browser_surface: Preference,
    pub surface_switching: Preference,
}

impl Default for ScreenTrackConfig {
    fn default() -> Self {
        Self {
            encoder_config: "1080p_1".to_string(),
            optimization_mode: OptimizationMode::Detail,
            display_surface: DisplaySurface::Browser,
            system_audio: Preference::Include,
            self_browser_surface: Preference::Include,
            surface_switching: Preference::Exclude,
        }
    }
}

/// Whether the capture request asks for system audio alongside video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCapture {
    Enable,
    Disable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub config: ScreenTrackConfig,
    pub audio: AudioCapture,
}

impl CaptureRequest {
    pub fn with_audio(config: ScreenTrackConfig) -> Self {
        Self {
            config,
            audio: AudioCapture::Enable,
        }
    }

    pub fn without_audio(self) -> Self {
        Self {
            audio: AudioCapture::Disable,
            ..self
        }
    }
}

/// A local media track created by the SDK.
#[async_trait]
pub trait LocalTrack: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> TrackKind;
    fn is_enabled(&self) -> bool;
    async fn set_enabled(&self, enabled: bool) -> Result<(), CallError>;
    fn is_muted(&self) -> bool;
    async fn set_muted(&self, muted: bool) -> Result<(), CallError>;
    /// Release the underlying capture device.
    fn close(&self);
}

/// Result of a screen capture request.
///
/// The platform returns either a bare video track, or a video+audio pair
/// when system audio was granted.
#[derive(Clone)]
pub enum ScreenCapture {
    Video(Arc<dyn LocalTrack>),
    VideoWithAudio {
        video: Arc<dyn LocalTrack>,
        audio: Arc<dyn LocalTrack>,
    },
}

impl ScreenCapture {
    pub fn into_tracks(self) -> Vec<Arc<dyn LocalTrack>> {
        match self {
            ScreenCapture::Video(video) => vec![video],
            ScreenCapture::VideoWithAudio { video, audio } => vec![video, audio],
        }
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, ScreenCapture::VideoWithAudio { .. })
    }
}

impl fmt::Debug for ScreenCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenCapture::Video(video) => f.debug_tuple("Video").field(&video.id()).finish(),
            ScreenCapture::VideoWithAudio { video, audio } => f
                .debug_struct("VideoWithAudio")
                .field("video", &video.id())
                .field("audio", &audio.id())
                .finish(),
        }
    }
}

/// One connection to a channel.
#[async_trait]
pub trait RtcClient: Send + Sync {
    async fn join(&self, credentials: &SessionCredentials) -> Result<(), CallError>;
    async fn publish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), CallError>;
    async fn unpublish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), CallError>;
    async fn leave(&self) -> Result<(), CallError>;
    /// Tracks currently published by this client.
    fn local_tracks(&self) -> Vec<Arc<dyn LocalTrack>>;
}

/// Entry point of the SDK: client factory and screen capture facility.
#[async_trait]
pub trait RtcEngine: Send + Sync {
    fn create_client(&self, config: &ClientConfig) -> Arc<dyn RtcClient>;

    /// Ask the platform for a screen capture track.
    ///
    /// Returns `CallError::CaptureCancelled` when the user dismissed the
    /// picker or the platform produced nothing usable.
    async fn create_screen_track(
        &self,
        request: &CaptureRequest,
    ) -> Result<ScreenCapture, CallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_track_defaults() {
        let json = serde_json::to_value(ScreenTrackConfig::default()).unwrap();
        assert_eq!(json["encoderConfig"], "1080p_1");
        assert_eq!(json["optimizationMode"], "detail");
        assert_eq!(json["displaySurface"], "browser");
        assert_eq!(json["systemAudio"], "include");
        assert_eq!(json["selfBrowserSurface"], "include");
        assert_eq!(json["surfaceSwitching"], "exclude");
    }

    #[test]
    fn without_audio_keeps_config() {
        let request = CaptureRequest::with_audio(ScreenTrackConfig::default()).without_audio();
        assert_eq!(request.audio, AudioCapture::Disable);
        assert_eq!(request.config, ScreenTrackConfig::default());
    }

    #[test]
    fn default_client_is_rtc_vp8() {
        let config = ClientConfig::default();
        assert_eq!(config.mode, ChannelMode::Rtc);
        assert_eq!(config.codec, VideoCodec::Vp8);
    }
}
