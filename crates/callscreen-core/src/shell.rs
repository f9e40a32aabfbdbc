use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::SessionCredentials;
use crate::controls::LocalMedia;
use crate::errors::CallError;
use crate::events::{
    CallEvent, CallEventListener, CallEventStream, CallState, EventEmitter, RemoteUser,
    ScreenShareState,
};
use crate::participants::ParticipantManager;
use crate::rtc::RtcEngine;
use crate::screen_share::ScreenShareController;
use crate::uikit::{CallUiKit, Layout, RtcProps, StyleProps, UiKitCallback, UiKitProps};

pub const JOIN_LABEL: &str = "Join";
pub const END_CALL_LABEL: &str = "End Call";

/// Labels and flags of the shell's own control bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBar {
    pub audio_label: &'static str,
    pub video_label: &'static str,
    pub screen_share_label: &'static str,
    /// Background of the floating screen share shortcut, which repeats
    /// `screen_share_label`.
    pub screen_share_shortcut_background: &'static str,
    pub end_call_label: &'static str,
    pub screen_sharing: bool,
    /// A screen share start/stop is pending; the toggle is inert.
    pub screen_share_busy: bool,
}

/// What the host should render.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    NotInCall { join_label: &'static str },
    InCall { props: UiKitProps, controls: ControlBar },
}

/// The call screen: UI kit plus manual controls while in a call, a single
/// join affordance otherwise.
pub struct CallScreen {
    credentials: Arc<SessionCredentials>,
    ui_kit: Arc<dyn CallUiKit>,
    emitter: EventEmitter,
    style: StyleProps,
    layout: Layout,
    call_state: Arc<Mutex<CallState>>,
    display_name: Arc<Mutex<Option<String>>>,
    participants: Arc<Mutex<ParticipantManager>>,
    media: LocalMedia,
    screen_share: ScreenShareController,
}

impl CallScreen {
    pub fn new(
        credentials: Arc<SessionCredentials>,
        engine: Arc<dyn RtcEngine>,
        ui_kit: Arc<dyn CallUiKit>,
    ) -> Self {
        let emitter = EventEmitter::new();
        Self {
            screen_share: ScreenShareController::new(engine, credentials.clone(), emitter.clone()),
            media: LocalMedia::new(emitter.clone()),
            credentials,
            ui_kit,
            emitter,
            style: StyleProps::default(),
            layout: Layout::default(),
            call_state: Arc::new(Mutex::new(CallState::NotInCall)),
            display_name: Arc::new(Mutex::new(None)),
            participants: Arc::new(Mutex::new(ParticipantManager::new())),
        }
    }

    pub fn with_style(mut self, style: StyleProps) -> Self {
        self.style = style;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn add_listener(&self, listener: Arc<dyn CallEventListener>) {
        self.emitter.add_listener(listener);
    }

    pub fn events(&self) -> CallEventStream {
        self.emitter.subscribe()
    }

    pub fn screen_share(&self) -> &ScreenShareController {
        &self.screen_share
    }

    pub async fn call_state(&self) -> CallState {
        *self.call_state.lock().await
    }

    pub async fn participants(&self) -> Vec<RemoteUser> {
        self.participants.lock().await.users().to_vec()
    }

    /// Enter the call: mount the UI kit with the current props.
    ///
    /// No-op when already in a call.
    pub async fn start_call(&self, display_name: Option<String>) -> Result<(), CallError> {
        let mut state = self.call_state.lock().await;
        if *state == CallState::InCall {
            tracing::debug!("start_call while already in call");
            return Ok(());
        }

        *self.display_name.lock().await = display_name;
        let props = self.props().await;
        self.ui_kit.mount(&props).await?;

        *state = CallState::InCall;
        tracing::info!("joined call in channel {}", self.credentials.channel);
        self.emitter.emit(CallEvent::CallStateChanged(CallState::InCall));
        Ok(())
    }

    /// Leave the call from the shell's own control bar.
    pub async fn end_call(&self) -> Result<(), CallError> {
        self.reset().await
    }

    /// Entry point for the UI kit's callbacks.
    pub async fn handle_callback(&self, callback: UiKitCallback) -> Result<(), CallError> {
        match callback {
            UiKitCallback::EndCall => self.reset().await,
            UiKitCallback::LocalMuteAudio(muted) => self
                .media
                .apply_audio_mute(muted)
                .await
                .inspect_err(|e| self.report(e)),
            UiKitCallback::LocalMuteVideo(muted) => self
                .media
                .apply_video_mute(muted)
                .await
                .inspect_err(|e| self.report(e)),
            UiKitCallback::UserJoined(user) => {
                tracing::info!("user joined: {}", user.uid);
                if self.participants.lock().await.add_user(user.clone()) {
                    self.emitter.emit(CallEvent::UserJoined(user));
                }
                Ok(())
            }
            UiKitCallback::UserLeft(user) => {
                tracing::info!("user left: {}", user.uid);
                if let Some(user) = self.participants.lock().await.remove_user(&user.uid) {
                    self.emitter.emit(CallEvent::UserLeft(user));
                }
                Ok(())
            }
            UiKitCallback::LocalTracksReady { audio, video } => {
                self.media.attach(&audio, &video).await;
                Ok(())
            }
        }
    }

    pub async fn toggle_audio(&self) -> Result<Option<bool>, CallError> {
        self.require_in_call().await?;
        self.media.toggle_audio().await.inspect_err(|e| self.report(e))
    }

    pub async fn toggle_video(&self) -> Result<Option<bool>, CallError> {
        self.require_in_call().await?;
        self.media.toggle_video().await.inspect_err(|e| self.report(e))
    }

    pub async fn toggle_screen_share(&self) -> Result<ScreenShareState, CallError> {
        self.require_in_call().await?;
        match self.screen_share.toggle().await {
            Ok(state) => Ok(state),
            Err(CallError::ScreenShareBusy) => {
                tracing::debug!("screen share toggle ignored, operation pending");
                Err(CallError::ScreenShareBusy)
            }
            Err(CallError::CaptureCancelled) => {
                tracing::info!("screen share not started: picker cancelled");
                Err(CallError::CaptureCancelled)
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Current view model.
    pub async fn view(&self) -> View {
        if *self.call_state.lock().await == CallState::NotInCall {
            return View::NotInCall { join_label: JOIN_LABEL };
        }

        let sharing = self.screen_share.state() == ScreenShareState::Sharing;
        let controls = ControlBar {
            audio_label: if self.media.audio_enabled().await == Some(true) {
                "Mute Audio"
            } else {
                "Unmute Audio"
            },
            video_label: if self.media.video_enabled().await == Some(true) {
                "Disable Video"
            } else {
                "Enable Video"
            },
            screen_share_label: if sharing {
                "Stop Screen Share"
            } else {
                "Start Screen Share"
            },
            screen_share_shortcut_background: if sharing { "green" } else { "white" },
            end_call_label: END_CALL_LABEL,
            screen_sharing: sharing,
            screen_share_busy: self.screen_share.is_busy(),
        };

        View::InCall {
            props: self.props().await,
            controls,
        }
    }

    /// Tear the screen down. Stops an active screen share exactly once.
    pub async fn unmount(&self) -> Result<(), CallError> {
        tracing::info!("unmounting call screen");
        self.reset().await?;
        // Not in a call but a share may still be pending from an earlier
        // toggle; wait for it and release it.
        self.screen_share.shutdown().await.map(|_| ())
    }

    /// Shared path of both end-call routes.
    async fn reset(&self) -> Result<(), CallError> {
        let mut state = self.call_state.lock().await;
        if *state == CallState::NotInCall {
            return Ok(());
        }

        let stopped = self.screen_share.shutdown().await;
        if let Err(e) = &stopped {
            self.report(e);
        }
        self.media.detach().await;
        self.participants.lock().await.clear();
        self.ui_kit.unmount().await;

        *state = CallState::NotInCall;
        tracing::info!("left call in channel {}", self.credentials.channel);
        self.emitter.emit(CallEvent::CallStateChanged(CallState::NotInCall));
        stopped.map(|_| ())
    }

    async fn props(&self) -> UiKitProps {
        UiKitProps {
            rtc_props: RtcProps::new(
                &self.credentials,
                self.layout,
                self.display_name.lock().await.clone(),
            ),
            style_props: self.style.clone(),
        }
    }

    async fn require_in_call(&self) -> Result<(), CallError> {
        match *self.call_state.lock().await {
            CallState::InCall => Ok(()),
            CallState::NotInCall => Err(CallError::NotInCall),
        }
    }

    fn report(&self, error: &CallError) {
        tracing::error!("{error}");
        self.emitter.emit(CallEvent::Error(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::{LoopbackEngine, LoopbackUiKit, PickerResponse};
    use futures_util::StreamExt;

    struct Harness {
        engine: LoopbackEngine,
        kit: Arc<LoopbackUiKit>,
        screen: CallScreen,
    }

    async fn in_call() -> Harness {
        let harness = not_in_call();
        harness.screen.start_call(None).await.unwrap();
        let (audio, video) = harness.kit.local_tracks().unwrap();
        harness
            .screen
            .handle_callback(UiKitCallback::LocalTracksReady { audio, video })
            .await
            .unwrap();
        harness
    }

    fn not_in_call() -> Harness {
        let engine = LoopbackEngine::new();
        let kit = Arc::new(LoopbackUiKit::new(engine.clone()));
        let screen = CallScreen::new(
            Arc::new(SessionCredentials::new("A1", "room1", "T1")),
            Arc::new(engine.clone()),
            kit.clone(),
        );
        Harness { engine, kit, screen }
    }

    fn controls(view: View) -> ControlBar {
        match view {
            View::InCall { controls, .. } => controls,
            View::NotInCall { .. } => panic!("expected InCall view"),
        }
    }

    #[tokio::test]
    async fn join_affordance_enters_call() {
        let h = not_in_call();
        assert_eq!(h.screen.view().await, View::NotInCall { join_label: "Join" });

        h.screen.start_call(Some("Alice".into())).await.unwrap();
        assert_eq!(h.screen.call_state().await, CallState::InCall);
        assert_eq!(h.kit.mount_count(), 1);

        let props = h.kit.mounted_props().unwrap();
        assert_eq!(props.rtc_props.channel, "room1");
        assert_eq!(props.rtc_props.username.as_deref(), Some("Alice"));

        // Starting again does not remount.
        h.screen.start_call(None).await.unwrap();
        assert_eq!(h.kit.mount_count(), 1);
    }

    #[tokio::test]
    async fn controls_require_a_call() {
        let h = not_in_call();
        assert_eq!(h.screen.toggle_audio().await, Err(CallError::NotInCall));
        assert_eq!(h.screen.toggle_screen_share().await, Err(CallError::NotInCall));
        assert_eq!(h.engine.clients_created(), 0);
    }

    #[tokio::test]
    async fn control_labels_follow_track_state() {
        let h = in_call().await;
        let bar = controls(h.screen.view().await);
        assert_eq!(bar.audio_label, "Mute Audio");
        assert_eq!(bar.video_label, "Disable Video");
        assert_eq!(bar.screen_share_label, "Start Screen Share");
        assert_eq!(bar.end_call_label, "End Call");

        h.screen.toggle_audio().await.unwrap();
        h.screen.toggle_video().await.unwrap();
        let bar = controls(h.screen.view().await);
        assert_eq!(bar.audio_label, "Unmute Audio");
        assert_eq!(bar.video_label, "Enable Video");
    }

    #[tokio::test]
    async fn mute_callbacks_update_borrowed_tracks() {
        let h = in_call().await;
        let (audio, video) = h.kit.local_tracks().unwrap();

        h.screen.handle_callback(UiKitCallback::LocalMuteAudio(true)).await.unwrap();
        h.screen.handle_callback(UiKitCallback::LocalMuteVideo(true)).await.unwrap();
        assert!(audio.is_muted());
        assert!(video.is_muted());

        h.screen.handle_callback(UiKitCallback::LocalMuteVideo(false)).await.unwrap();
        assert!(!video.is_muted());
    }

    #[tokio::test]
    async fn screen_share_round_trip_through_shell() {
        let h = in_call().await;
        h.engine.script_picker([PickerResponse::VideoOnly]);

        assert_eq!(h.screen.toggle_screen_share().await, Ok(ScreenShareState::Sharing));
        assert_eq!(h.engine.joined_count("room1"), 1);
        assert_eq!(h.engine.published_count(), 1);
        let bar = controls(h.screen.view().await);
        assert_eq!(bar.screen_share_label, "Stop Screen Share");
        assert_eq!(bar.screen_share_shortcut_background, "green");

        assert_eq!(h.screen.toggle_screen_share().await, Ok(ScreenShareState::Idle));
        assert_eq!(h.engine.joined_count("room1"), 0);
        assert_eq!(h.engine.unpublished_count(), 1);
        let bar = controls(h.screen.view().await);
        assert_eq!(bar.screen_share_label, "Start Screen Share");
        assert_eq!(bar.screen_share_shortcut_background, "white");
    }

    #[tokio::test]
    async fn mute_callback_on_closed_track_is_surfaced() {
        let h = in_call().await;
        let mut events = h.screen.events();
        let (audio, _) = h.kit.local_tracks().unwrap();
        audio.close();

        let result = h.screen.handle_callback(UiKitCallback::LocalMuteAudio(true)).await;
        assert!(matches!(result, Err(CallError::Track(_))));
        assert!(matches!(events.next().await, Some(CallEvent::Error(_))));
    }

    #[tokio::test]
    async fn cancelled_picker_is_not_reported_as_error() {
        let h = in_call().await;
        let mut events = h.screen.events();
        h.engine.script_picker([PickerResponse::Cancel]);

        assert_eq!(h.screen.toggle_screen_share().await, Err(CallError::CaptureCancelled));
        assert_eq!(h.engine.joined_count("room1"), 0);
        assert_eq!(h.engine.published_count(), 0);

        h.screen.end_call().await.unwrap();
        while let Some(event) = events.next().await {
            assert!(!matches!(event, CallEvent::Error(_)), "unexpected {event:?}");
            if event == CallEvent::CallStateChanged(CallState::NotInCall) {
                break;
            }
        }
    }

    #[tokio::test]
    async fn capture_failure_is_surfaced() {
        let h = in_call().await;
        let mut events = h.screen.events();
        h.engine.script_picker([
            PickerResponse::Fail("no audio".into()),
            PickerResponse::Fail("denied".into()),
        ]);

        assert!(matches!(h.screen.toggle_screen_share().await, Err(CallError::Capture(_))));
        assert_eq!(h.engine.joined_count("room1"), 0);
        assert_eq!(
            events.next().await,
            Some(CallEvent::Error("screen capture failed: denied".into()))
        );
    }

    #[tokio::test]
    async fn end_call_callback_stops_screen_share() {
        let h = in_call().await;
        h.screen.toggle_screen_share().await.unwrap();
        assert_eq!(h.engine.joined_count("room1"), 1);

        h.screen.handle_callback(UiKitCallback::EndCall).await.unwrap();
        assert_eq!(h.screen.call_state().await, CallState::NotInCall);
        assert_eq!(h.screen.screen_share().state(), ScreenShareState::Idle);
        assert_eq!(h.engine.joined_count("room1"), 0);
        // The screen track plus the kit's camera and microphone.
        assert_eq!(h.engine.closed_tracks().len(), 3);
        assert!(h.kit.mounted_props().is_none());
    }

    #[tokio::test]
    async fn both_end_routes_reset_the_same_way() {
        for use_callback in [false, true] {
            let h = in_call().await;
            h.screen
                .handle_callback(UiKitCallback::UserJoined(RemoteUser::new("u1")))
                .await
                .unwrap();
            h.screen.toggle_screen_share().await.unwrap();

            if use_callback {
                h.screen.handle_callback(UiKitCallback::EndCall).await.unwrap();
            } else {
                h.screen.end_call().await.unwrap();
            }

            assert_eq!(h.screen.view().await, View::NotInCall { join_label: "Join" });
            assert!(h.screen.participants().await.is_empty());
            assert_eq!(h.engine.joined_count("room1"), 0);
            assert_eq!(h.screen.toggle_audio().await, Err(CallError::NotInCall));
        }
    }

    #[tokio::test]
    async fn unmount_while_sharing_runs_one_stop() {
        let h = in_call().await;
        h.engine.script_picker([PickerResponse::VideoWithAudio]);
        h.screen.toggle_screen_share().await.unwrap();
        assert_eq!(h.engine.joined_count("room1"), 1);

        h.screen.unmount().await.unwrap();
        assert_eq!(h.engine.joined_count("room1"), 0);
        assert_eq!(h.engine.unpublished_count(), 2);
        // Two screen tracks closed by the stop, plus the kit's own camera
        // and microphone released by its unmount.
        assert_eq!(h.engine.closed_tracks().len(), 4);

        h.screen.unmount().await.unwrap();
        assert_eq!(h.engine.unpublished_count(), 2);
        assert_eq!(h.engine.closed_tracks().len(), 4);
    }

    #[tokio::test]
    async fn roster_follows_join_and_leave() {
        let h = in_call().await;
        let mut events = h.screen.events();

        h.screen.handle_callback(UiKitCallback::UserJoined(RemoteUser::new("u1"))).await.unwrap();
        h.screen.handle_callback(UiKitCallback::UserJoined(RemoteUser::new("u1"))).await.unwrap();
        h.screen.handle_callback(UiKitCallback::UserJoined(RemoteUser::new("u2"))).await.unwrap();
        h.screen.handle_callback(UiKitCallback::UserLeft(RemoteUser::new("u1"))).await.unwrap();

        assert_eq!(h.screen.participants().await, vec![RemoteUser::new("u2")]);
        assert_eq!(events.next().await, Some(CallEvent::UserJoined(RemoteUser::new("u1"))));
        assert_eq!(events.next().await, Some(CallEvent::UserJoined(RemoteUser::new("u2"))));
        assert_eq!(events.next().await, Some(CallEvent::UserLeft(RemoteUser::new("u1"))));
    }

    #[tokio::test]
    async fn tracks_released_by_kit_are_left_alone() {
        let h = in_call().await;
        h.screen.end_call().await.unwrap();
        // The kit closed its own tracks on unmount; the shell must not
        // have closed anything else.
        assert_eq!(h.engine.closed_tracks().len(), 2);
        assert_eq!(h.engine.unpublished_count(), 0);
    }
}
