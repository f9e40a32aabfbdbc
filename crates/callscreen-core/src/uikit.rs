//! Boundary to the pre-built call UI kit component.
//!
//! The kit renders the participant grid and its own call controls. This
//! module only describes what we hand to it (credentials, styling) and the
//! callbacks it invokes on us.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SessionCredentials;
use crate::errors::CallError;
use crate::events::RemoteUser;
use crate::rtc::LocalTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Grid,
    /// Pinned speaker with a strip of thumbnails.
    Pin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFit {
    Contain,
    Cover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    None,
    Flex,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
}

impl ButtonStyle {
    pub fn hidden() -> Self {
        Self {
            display: Some(Display::None),
            ..Default::default()
        }
    }

    pub fn hidden_with_background(color: &str) -> Self {
        Self {
            background_color: Some(color.to_string()),
            display: Some(Display::None),
            border: None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.display == Some(Display::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMode {
    pub max: VideoFit,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteButtonStyles {
    pub mute_remote_audio: ButtonStyle,
    pub mute_remote_video: ButtonStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalButtonStyles {
    pub mute_local_audio: ButtonStyle,
    pub mute_local_video: ButtonStyle,
    pub switch_camera: ButtonStyle,
    pub end_call: ButtonStyle,
    pub screenshare: ButtonStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxViewStyles {
    pub border_color: String,
    pub border_width: u32,
}

/// Visual configuration handed to the UI kit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleProps {
    pub theme: Theme,
    pub video_mode: VideoMode,
    pub remote_btn_styles: RemoteButtonStyles,
    pub local_btn_styles: LocalButtonStyles,
    pub max_view_styles: MaxViewStyles,
}

const TRANSLUCENT: &str = "rgba(255, 255, 255, 0.4)";

impl Default for StyleProps {
    /// Dark theme, letterboxed main video, and the kit's own mute/end-call
    /// buttons hidden in favour of the shell's control bar.
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            video_mode: VideoMode { max: VideoFit::Contain },
            remote_btn_styles: RemoteButtonStyles {
                mute_remote_audio: ButtonStyle::hidden(),
                mute_remote_video: ButtonStyle::hidden(),
            },
            local_btn_styles: LocalButtonStyles {
                mute_local_audio: ButtonStyle::hidden_with_background(TRANSLUCENT),
                mute_local_video: ButtonStyle::hidden_with_background(TRANSLUCENT),
                switch_camera: ButtonStyle::hidden_with_background(TRANSLUCENT),
                end_call: ButtonStyle::hidden_with_background("blue"),
                screenshare: ButtonStyle {
                    border: Some("10px solid red".to_string()),
                    ..Default::default()
                },
            },
            max_view_styles: MaxViewStyles {
                border_color: "#fff".to_string(),
                border_width: 4,
            },
        }
    }
}

impl StyleProps {
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

/// Connection properties handed to the UI kit.
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcProps {
    pub app_id: String,
    pub channel: String,
    pub token: String,
    pub layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl RtcProps {
    pub fn new(credentials: &SessionCredentials, layout: Layout, username: Option<String>) -> Self {
        Self {
            app_id: credentials.app_id.clone(),
            channel: credentials.channel.clone(),
            token: credentials.token.clone(),
            layout,
            username,
        }
    }
}

impl fmt::Debug for RtcProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RtcProps")
            .field("app_id", &self.app_id)
            .field("channel", &self.channel)
            .field("token", &"<redacted>")
            .field("layout", &self.layout)
            .field("username", &self.username)
            .finish()
    }
}

/// Full property payload for one mount of the UI kit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiKitProps {
    pub rtc_props: RtcProps,
    pub style_props: StyleProps,
}

/// Callbacks the UI kit invokes on the shell.
#[derive(Clone)]
pub enum UiKitCallback {
    /// The user ended the call from the kit's own controls.
    EndCall,
    LocalMuteAudio(bool),
    LocalMuteVideo(bool),
    UserJoined(RemoteUser),
    UserLeft(RemoteUser),
    /// The kit created its camera/microphone tracks. The shell only
    /// borrows them.
    LocalTracksReady {
        audio: Arc<dyn LocalTrack>,
        video: Arc<dyn LocalTrack>,
    },
}

impl fmt::Debug for UiKitCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiKitCallback::EndCall => f.write_str("EndCall"),
            UiKitCallback::LocalMuteAudio(muted) => {
                f.debug_tuple("LocalMuteAudio").field(muted).finish()
            }
            UiKitCallback::LocalMuteVideo(muted) => {
                f.debug_tuple("LocalMuteVideo").field(muted).finish()
            }
            UiKitCallback::UserJoined(user) => f.debug_tuple("UserJoined").field(user).finish(),
            UiKitCallback::UserLeft(user) => f.debug_tuple("UserLeft").field(user).finish(),
            UiKitCallback::LocalTracksReady { audio, video } => f
                .debug_struct("LocalTracksReady")
                .field("audio", &audio.id())
                .field("video", &video.id())
                .finish(),
        }
    }
}

/// The externally supplied UI kit component.
///
/// Join/leave/publish failures inside the kit are handled by the kit; none
/// of them cross this boundary.
#[async_trait]
pub trait CallUiKit: Send + Sync {
    async fn mount(&self, props: &UiKitProps) -> Result<(), CallError>;
    async fn unmount(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn props_debug_redacts_token() {
        let creds = SessionCredentials::new("A1", "room1", "secret-token");
        let props = RtcProps::new(&creds, Layout::Pin, Some("ada".into()));
        let out = format!("{props:?}");
        assert!(out.contains("room1"));
        assert!(out.contains("ada"));
        assert!(!out.contains("secret-token"));
    }

    #[test]
    fn default_style_hides_kit_controls() {
        let style = StyleProps::default();
        assert_eq!(style.theme, Theme::Dark);
        assert!(style.remote_btn_styles.mute_remote_audio.is_hidden());
        assert!(style.local_btn_styles.end_call.is_hidden());
        assert!(!style.local_btn_styles.screenshare.is_hidden());
    }

    #[test]
    fn props_serialize_in_kit_shape() {
        let creds = SessionCredentials::new("A1", "room1", "T1");
        let props = UiKitProps {
            rtc_props: RtcProps::new(&creds, Layout::Grid, None),
            style_props: StyleProps::default(),
        };
        let json = serde_json::to_value(&props).unwrap();

        assert_eq!(json["rtcProps"]["appId"], "A1");
        assert_eq!(json["rtcProps"]["channel"], "room1");
        assert_eq!(json["rtcProps"]["layout"], "grid");
        assert!(json["rtcProps"].get("username").is_none());
        assert_eq!(json["styleProps"]["videoMode"]["max"], "contain");
        assert_eq!(
            json["styleProps"]["localBtnStyles"]["endCall"],
            serde_json::json!({ "backgroundColor": "blue", "display": "none" })
        );
        assert_eq!(
            json["styleProps"]["localBtnStyles"]["screenshare"],
            serde_json::json!({ "border": "10px solid red" })
        );
        assert_eq!(json["styleProps"]["maxViewStyles"]["borderWidth"], 4);
    }

    #[test]
    fn username_is_sent_when_present() {
        let creds = SessionCredentials::new("A1", "room1", "T1");
        let rtc = RtcProps::new(&creds, Layout::Pin, Some("Alice".into()));
        let json = serde_json::to_value(&rtc).unwrap();
        assert_eq!(json["username"], "Alice");
        assert_eq!(json["layout"], "pin");
    }
}
