//! Call screen core logic.
//!
//! Configures an external call UI kit, mirrors its local mute state onto
//! borrowed tracks and runs a dedicated screen-share client next to it.
//! No rendering, capture or transport lives here; those sit behind the
//! traits in [`rtc`] and [`uikit`].

pub mod config;
pub mod controls;
pub mod errors;
pub mod events;
pub mod loopback;
pub mod participants;
pub mod retry;
pub mod rtc;
pub mod screen_share;
pub mod settings;
pub mod shell;
pub mod uikit;

pub use config::SessionCredentials;
pub use controls::{LocalMedia, TrackRef};
pub use errors::CallError;
pub use events::{
    CallEvent, CallEventListener, CallEventStream, CallState, RemoteUser, ScreenShareState,
    TrackKind,
};
pub use participants::ParticipantManager;
pub use retry::{CaptureFallback, CaptureRetryPolicy};
pub use rtc::{CaptureRequest, LocalTrack, RtcClient, RtcEngine, ScreenCapture, ScreenTrackConfig};
pub use screen_share::{ScreenShareController, ShareStarted};
pub use settings::{Settings, SettingsStore};
pub use shell::{CallScreen, ControlBar, View};
pub use uikit::{CallUiKit, Layout, StyleProps, Theme, UiKitCallback, UiKitProps};
