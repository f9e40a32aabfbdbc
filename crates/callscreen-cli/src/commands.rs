use callscreen_core::{RemoteUser, UiKitCallback};

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(Option<String>),
    ToggleAudio,
    ToggleVideo,
    ToggleScreenShare,
    EndCall,
    View,
    Props,
    Users,
    /// Stand in for a callback the UI kit would fire.
    Kit(KitEvent),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KitEvent {
    EndCall,
    MuteAudio(bool),
    MuteVideo(bool),
    UserJoined(String),
    UserLeft(String),
}

impl KitEvent {
    pub fn into_callback(self) -> UiKitCallback {
        match self {
            KitEvent::EndCall => UiKitCallback::EndCall,
            KitEvent::MuteAudio(muted) => UiKitCallback::LocalMuteAudio(muted),
            KitEvent::MuteVideo(muted) => UiKitCallback::LocalMuteVideo(muted),
            KitEvent::UserJoined(uid) => UiKitCallback::UserJoined(RemoteUser::new(uid)),
            KitEvent::UserLeft(uid) => UiKitCallback::UserLeft(RemoteUser::new(uid)),
        }
    }
}

pub const HELP: &str = "\
commands:
  join [name]            enter the call
  audio | video          toggle microphone / camera
  share                  toggle screen share
  end                    end the call
  view | props | users   show the screen, UI kit props, remote users
  kit end                UI kit ended the call
  kit mute audio|video on|off
  kit join <uid> | kit leave <uid>
  quit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err("empty command".to_string());
        };
        let rest: Vec<&str> = words.collect();

        let command = match (head, rest.as_slice()) {
            ("join", []) => Command::Join(None),
            ("join", name) => Command::Join(Some(name.join(" "))),
            ("audio", []) => Command::ToggleAudio,
            ("video", []) => Command::ToggleVideo,
            ("share", []) => Command::ToggleScreenShare,
            ("end", []) => Command::EndCall,
            ("view", []) => Command::View,
            ("props", []) => Command::Props,
            ("users", []) => Command::Users,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            ("kit", args) => Command::Kit(Self::parse_kit(args)?),
            _ => return Err(format!("unknown command: {}", line.trim())),
        };
        Ok(command)
    }

    fn parse_kit(args: &[&str]) -> Result<KitEvent, String> {
        let on_off = |value: &str| match value {
            "on" => Ok(true),
            "off" => Ok(false),
            other => Err(format!("expected on/off, got {other}")),
        };
        match args {
            ["end"] => Ok(KitEvent::EndCall),
            ["mute", "audio", value] => Ok(KitEvent::MuteAudio(on_off(*value)?)),
            ["mute", "video", value] => Ok(KitEvent::MuteVideo(on_off(*value)?)),
            ["join", uid] => Ok(KitEvent::UserJoined(uid.to_string())),
            ["leave", uid] => Ok(KitEvent::UserLeft(uid.to_string())),
            _ => Err(format!("unknown kit event: {}", args.join(" "))),
        }
    }
}
