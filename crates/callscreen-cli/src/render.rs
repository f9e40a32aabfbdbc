use callscreen_core::{CallEvent, CallState, ScreenShareState, View};

pub fn render_view(view: &View) -> String {
    match view {
        View::NotInCall { join_label } => format!("[ {join_label} ]"),
        View::InCall { props, controls } => {
            let share = if controls.screen_share_busy {
                format!("{} (pending)", controls.screen_share_label)
            } else {
                controls.screen_share_label.to_string()
            };
            format!(
                "channel {} ({:?} layout)\n[ {} ] [ {} ] [ {} ] [ {} ]\nshortcut: [ {} ] ({})",
                props.rtc_props.channel,
                props.rtc_props.layout,
                controls.audio_label,
                controls.video_label,
                share,
                controls.end_call_label,
                controls.screen_share_label,
                controls.screen_share_shortcut_background,
            )
        }
    }
}

pub fn render_event(event: &CallEvent) -> String {
    match event {
        CallEvent::CallStateChanged(CallState::InCall) => "* in call".to_string(),
        CallEvent::CallStateChanged(CallState::NotInCall) => "* call ended".to_string(),
        CallEvent::ScreenShareChanged(ScreenShareState::Sharing) => {
            "* screen share started".to_string()
        }
        CallEvent::ScreenShareChanged(ScreenShareState::Idle) => {
            "* screen share stopped".to_string()
        }
        CallEvent::UserJoined(user) => format!("* {} joined", user.uid),
        CallEvent::UserLeft(user) => format!("* {} left", user.uid),
        CallEvent::LocalAudioMuted(muted) => format!("* microphone {}", muted_word(*muted)),
        CallEvent::LocalVideoMuted(muted) => format!("* camera {}", muted_word(*muted)),
        CallEvent::Error(message) => format!("! {message}"),
    }
}

fn muted_word(muted: bool) -> &'static str {
    if muted { "muted" } else { "unmuted" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callscreen_core::RemoteUser;

    #[test]
    fn not_in_call_shows_join() {
        assert_eq!(render_view(&View::NotInCall { join_label: "Join" }), "[ Join ]");
    }

    #[test]
    fn events_are_one_line() {
        assert_eq!(
            render_event(&CallEvent::UserJoined(RemoteUser::new("u1"))),
            "* u1 joined"
        );
        assert_eq!(render_event(&CallEvent::Error("boom".into())), "! boom");
        assert_eq!(
            render_event(&CallEvent::ScreenShareChanged(ScreenShareState::Sharing)),
            "* screen share started"
        );
    }
}
