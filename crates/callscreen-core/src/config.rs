use std::fmt;

use crate::errors::CallError;

pub const APP_ID_VAR: &str = "CALLSCREEN_APP_ID";
pub const CHANNEL_VAR: &str = "CALLSCREEN_CHANNEL";
pub const TOKEN_VAR: &str = "CALLSCREEN_TOKEN";

/// Identifiers needed to join a channel.
///
/// Read once at startup and shared by reference afterwards. All three
/// values are opaque to this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub app_id: String,
    pub channel: String,
    pub token: String,
}

impl SessionCredentials {
    pub fn new(
        app_id: impl Into<String>,
        channel: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            channel: channel.into(),
            token: token.into(),
        }
    }

    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self, CallError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary key lookup.
    ///
    /// Missing or blank values are collected so the error names every
    /// variable that needs fixing, not just the first one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CallError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let app_id = read(APP_ID_VAR);
        let channel = read(CHANNEL_VAR);
        let token = read(TOKEN_VAR);

        match (app_id, channel, token) {
            (Some(app_id), Some(channel), Some(token)) => {
                tracing::info!("loaded credentials for channel {channel}");
                Ok(Self { app_id, channel, token })
            }
            (app_id, channel, token) => {
                let missing: Vec<&str> = [
                    (APP_ID_VAR, app_id.is_none()),
                    (CHANNEL_VAR, channel.is_none()),
                    (TOKEN_VAR, token.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(CallError::Config(format!(
                    "missing required variable(s): {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("app_id", &self.app_id)
            .field("channel", &self.channel)
            .field("token", &"<redacted>")
            .finish()
    }
}
