use crate::errors::CallError;
use crate::rtc::CaptureRequest;

/// Transform applied to the capture request on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFallback {
    /// Ask again without system audio.
    DropAudio,
    /// Repeat the original request unchanged.
    Repeat,
}

/// Retry policy for screen capture requests.
///
/// Attempts are numbered from 1. The first attempt always uses the
/// initial request; later attempts use the fallback transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRetryPolicy {
    pub max_attempts: u32,
    pub fallback: CaptureFallback,
}

impl Default for CaptureRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            fallback: CaptureFallback::DropAudio,
        }
    }
}

impl CaptureRetryPolicy {
    pub fn request_for_attempt(&self, initial: &CaptureRequest, attempt: u32) -> CaptureRequest {
        if attempt <= 1 {
            return initial.clone();
        }
        match self.fallback {
            CaptureFallback::DropAudio => initial.clone().without_audio(),
            CaptureFallback::Repeat => initial.clone(),
        }
    }

    /// Whether a failed `attempt` should be followed by another one.
    ///
    /// A dismissed picker is never retried.
    pub fn should_retry(&self, attempt: u32, error: &CallError) -> bool {
        !matches!(error, CallError::CaptureCancelled) && attempt < self.max_attempts
    }
}
