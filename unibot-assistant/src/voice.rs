//! Voice input and output around black-box speech engines
//!
//! Platform speech engines plug in through [`SpeechSynthesizer`] and [`SpeechRecognizer`].
//! At most one listening session is active at a time; starting a new one stops the
//! previous session before the recognizer is restarted.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use unibot_core::{EventBus, SpeechConfig, Subscription, UnibotResult};

/// Prosody for synthesized speech
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeakOptions {
    pub rate: f32,
    pub pitch: f32,
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.1,
        }
    }
}

impl From<&SpeechConfig> for SpeakOptions {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            rate: config.rate,
            pitch: config.pitch,
        }
    }
}

/// Recognition settings handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenOptions {
    /// End the session after the first final transcript
    pub auto_close: bool,
    /// Silence after which the engine should end the session
    pub silence_timeout_ms: u64,
}

impl From<&SpeechConfig> for ListenOptions {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            auto_close: config.auto_close,
            silence_timeout_ms: config.silence_timeout_ms,
        }
    }
}

/// Text-to-speech engine
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text`, resolving when playback finishes
    async fn speak(&self, text: &str, options: SpeakOptions) -> UnibotResult<()>;

    /// Cut off any speech in progress
    fn cancel(&self);
}

/// Speech-to-text engine
pub trait SpeechRecognizer: Send + Sync {
    /// Begin capturing audio and report results to `sink`.
    ///
    /// `stop` may be called from any thread, while results are still being reported, and
    /// after the engine has already ended.
    fn start(&self, options: ListenOptions, sink: TranscriptSink) -> UnibotResult<()>;

    fn stop(&self);
}

/// Holder for at most one running session.
///
/// Each session is represented by its stop action; the slot runs it exactly once, either
/// when the session is stopped or when a newer session takes its place.
#[derive(Default)]
pub struct SessionSlot {
    current: Mutex<Option<Subscription>>,
    next_id: AtomicU64,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the current session, if any, then install a new one. Returns its id.
    pub fn start<F>(&self, stop: F) -> u64
    where
        F: FnOnce() + Send + 'static,
    {
        self.stop();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let replaced = self.lock().replace(Subscription::new(id, stop));
        // A concurrent start may have slipped in between
        if let Some(replaced) = replaced {
            replaced.unsubscribe();
        }
        id
    }

    /// Stop whatever session is running. Returns whether one was.
    pub fn stop(&self) -> bool {
        let previous = self.lock().take();
        match previous {
            Some(session) => {
                session.unsubscribe();
                true
            }
            None => false,
        }
    }

    /// Stop session `id` only if it is still the current one
    pub fn stop_session(&self, id: u64) -> bool {
        let previous = {
            let mut current = self.lock();
            match current.as_ref() {
                Some(session) if session.id() == id => current.take(),
                _ => None,
            }
        };
        match previous {
            Some(session) => {
                session.unsubscribe();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    pub fn current_id(&self) -> Option<u64> {
        self.lock().as_ref().map(Subscription::id)
    }

    // Stop actions always run after this guard is released, so they may re-enter the slot
    fn lock(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Default)]
struct SinkState {
    last_interim: String,
    final_received: bool,
    closed: bool,
}

/// What a listening session hands to its subscriber, in order
#[derive(Debug, Clone)]
enum SessionEvent {
    Transcript(String),
    /// The session is over; its subscriber stops session `.0` after earlier transcripts
    Closed(u64),
}

/// Where a recognizer reports results for one listening session.
///
/// Results arriving after the session has been stopped or replaced are dropped.
#[derive(Clone)]
pub struct TranscriptSink {
    session_id: u64,
    auto_close: bool,
    events: EventBus<SessionEvent>,
    state: Arc<Mutex<SinkState>>,
}

impl TranscriptSink {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// A partial result; kept in case the session ends without a final one
    pub fn interim(&self, text: &str) {
        let mut state = self.lock_state();
        if !state.closed {
            state.last_interim = text.to_string();
        }
    }

    /// A final result. Non-empty transcripts are delivered; with auto-close the session
    /// then stops.
    pub fn final_transcript(&self, text: &str) {
        {
            let mut state = self.lock_state();
            if state.closed {
                return;
            }
            state.final_received = true;
            state.closed = self.auto_close;
        }

        if !text.trim().is_empty() {
            self.events.publish(SessionEvent::Transcript(text.to_string()));
        }

        if self.auto_close {
            debug!(session_id = self.session_id, "Auto-closing after final transcript");
            self.events.publish(SessionEvent::Closed(self.session_id));
        }
    }

    /// The engine stopped on its own (silence, error or end of input).
    ///
    /// If no final result arrived, the last non-empty interim result is delivered instead.
    pub fn ended(&self) {
        let pending = {
            let mut state = self.lock_state();
            if state.closed {
                return;
            }
            state.closed = true;
            if state.final_received {
                None
            } else {
                Some(std::mem::take(&mut state.last_interim))
            }
        };

        if let Some(text) = pending.filter(|t| !t.trim().is_empty()) {
            self.events.publish(SessionEvent::Transcript(text));
        }
        self.events.publish(SessionEvent::Closed(self.session_id));
    }

    fn lock_state(&self) -> MutexGuard<'_, SinkState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Speaks replies and listens for spoken queries
pub struct VoiceAssistant {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    recognizer: Arc<dyn SpeechRecognizer>,
    listening: Arc<SessionSlot>,
    speak_options: SpeakOptions,
    listen_options: ListenOptions,
}

impl VoiceAssistant {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        recognizer: Arc<dyn SpeechRecognizer>,
        config: &SpeechConfig,
    ) -> Self {
        Self {
            synthesizer,
            recognizer,
            listening: Arc::new(SessionSlot::new()),
            speak_options: SpeakOptions::from(config),
            listen_options: ListenOptions::from(config),
        }
    }

    pub fn speak_options(&self) -> SpeakOptions {
        self.speak_options
    }

    /// Speak `text` with the configured options, cutting off any current speech first.
    /// Blank text is ignored.
    pub async fn speak(&self, text: &str) -> UnibotResult<()> {
        self.speak_with(text, self.speak_options).await
    }

    pub async fn speak_with(&self, text: &str, options: SpeakOptions) -> UnibotResult<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        self.synthesizer.cancel();
        self.synthesizer.speak(text, options).await
    }

    pub fn stop_speaking(&self) {
        self.synthesizer.cancel();
    }

    /// Start a listening session with the configured options
    pub fn listen<F>(&self, on_transcript: F) -> bool
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.listen_with(on_transcript, self.listen_options)
    }

    /// Start a listening session, stopping any session already running.
    ///
    /// `on_transcript` receives each delivered transcript on the session's delivery task and
    /// may itself stop or restart listening. Must be called from within a tokio runtime.
    /// Returns whether the recognizer started.
    pub fn listen_with<F>(&self, mut on_transcript: F, options: ListenOptions) -> bool
    where
        F: FnMut(&str) + Send + 'static,
    {
        if self.listening.stop() {
            debug!("Already listening, stopped previous session");
        }

        let events: EventBus<SessionEvent> = EventBus::new();
        let slot = Arc::downgrade(&self.listening);
        let subscription = events.subscribe(move |event: &SessionEvent| match event {
            SessionEvent::Transcript(text) => on_transcript(text),
            SessionEvent::Closed(session_id) => {
                if let Some(slot) = slot.upgrade() {
                    slot.stop_session(*session_id);
                }
            }
        });

        let recognizer = Arc::clone(&self.recognizer);
        let session_id = self.listening.start(move || {
            recognizer.stop();
            subscription.unsubscribe();
        });

        let sink = TranscriptSink {
            session_id,
            auto_close: options.auto_close,
            events,
            state: Arc::new(Mutex::new(SinkState::default())),
        };

        match self.recognizer.start(options, sink) {
            Ok(()) => {
                info!(session_id, ?options, "Listening started");
                true
            }
            Err(e) => {
                warn!(error = %e, "Speech recognizer failed to start");
                self.listening.stop_session(session_id);
                false
            }
        }
    }

    /// Stop the current listening session. Returns whether one was running.
    pub fn stop_listening(&self) -> bool {
        self.listening.stop()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.is_active()
    }
}

impl Drop for VoiceAssistant {
    fn drop(&mut self) {
        self.listening.stop();
    }
}
