use std::sync::Arc;

use futures_util::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted by the core to UI listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    CallStateChanged(CallState),
    ScreenShareChanged(ScreenShareState),
    UserJoined(RemoteUser),
    UserLeft(RemoteUser),
    LocalAudioMuted(bool),
    LocalVideoMuted(bool),
    /// User-visible failure (screen share start/stop, track toggles).
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    NotInCall,
    InCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenShareState {
    Idle,
    Sharing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// A remote participant as reported by the UI kit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub uid: String,
    pub has_audio: bool,
    pub has_video: bool,
}

impl RemoteUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            has_audio: false,
            has_video: false,
        }
    }
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait CallEventListener: Send + Sync {
    fn on_event(&self, event: CallEvent);

    /// A closed listener is dropped from the emitter on the next emit.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Stream of events handed out by [`EventEmitter::subscribe`].
pub type CallEventStream = BoxStream<'static, CallEvent>;

struct ChannelListener {
    tx: mpsc::UnboundedSender<CallEvent>,
}

impl CallEventListener for ChannelListener {
    fn on_event(&self, event: CallEvent) {
        let _ = self.tx.send(event);
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Internal event emitter that dispatches to registered listeners.
#[derive(Clone)]
pub struct EventEmitter {
    listeners: Arc<std::sync::RwLock<Vec<Arc<dyn CallEventListener>>>>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(std::sync::RwLock::new(Vec::new())),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn CallEventListener>) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.push(listener);
    }

    /// Subscribe to events as an async stream.
    pub fn subscribe(&self) -> CallEventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_listener(Arc::new(ChannelListener { tx }));
        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        }))
    }

    pub fn emit(&self, event: CallEvent) {
        let mut stale = false;
        {
            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for listener in listeners.iter() {
                if listener.is_closed() {
                    stale = true;
                } else {
                    listener.on_event(event.clone());
                }
            }
        }
        if stale {
            self.listeners
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .retain(|listener| !listener.is_closed());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl CallEventListener for CountingListener {
        fn on_event(&self, _event: CallEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emitter_dispatches_to_multiple_listeners() {
        let emitter = EventEmitter::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(Arc::new(CountingListener { count: count1.clone() }));
        emitter.add_listener(Arc::new(CountingListener { count: count2.clone() }));

        emitter.emit(CallEvent::CallStateChanged(CallState::InCall));

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_yields_events_in_order() {
        let emitter = EventEmitter::new();
        let mut events = emitter.subscribe();

        emitter.emit(CallEvent::UserJoined(RemoteUser::new("u1")));
        emitter.emit(CallEvent::ScreenShareChanged(ScreenShareState::Sharing));

        assert_eq!(
            events.next().await,
            Some(CallEvent::UserJoined(RemoteUser::new("u1")))
        );
        assert_eq!(
            events.next().await,
            Some(CallEvent::ScreenShareChanged(ScreenShareState::Sharing))
        );
    }

    #[test]
    fn dropped_stream_is_unregistered_on_emit() {
        let emitter = EventEmitter::new();
        let _kept = emitter.subscribe();
        drop(emitter.subscribe());
        assert_eq!(emitter.listener_count(), 2);

        emitter.emit(CallEvent::LocalAudioMuted(true));
        assert_eq!(emitter.listener_count(), 1);
    }
}
