use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("join failed: {0}")]
    Join(String),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("unpublish failed: {0}")]
    Unpublish(String),
    #[error("leave failed: {0}")]
    Leave(String),
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("screen capture cancelled")]
    CaptureCancelled,
    #[error("track error: {0}")]
    Track(String),
    #[error("screen share already active")]
    AlreadySharing,
    #[error("a screen share operation is already in progress")]
    ScreenShareBusy,
    #[error("not in a call")]
    NotInCall,
}
