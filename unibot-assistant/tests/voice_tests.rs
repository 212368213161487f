//! Voice session tests with fake speech engines

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use unibot_assistant::{
    ListenOptions, SpeakOptions, SpeechRecognizer, SpeechSynthesizer, TranscriptSink,
    VoiceAssistant,
};
use unibot_core::{async_trait, config_error, SpeechConfig, UnibotResult};

#[derive(Default)]
struct FakeSynthesizer {
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn speak(&self, text: &str, options: SpeakOptions) -> UnibotResult<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("speak:{}@{}/{}", text, options.rate, options.pitch));
        Ok(())
    }

    fn cancel(&self) {
        self.events.lock().unwrap().push("cancel".to_string());
    }
}

#[derive(Default)]
struct FakeRecognizer {
    sinks: Mutex<Vec<TranscriptSink>>,
    options: Mutex<Vec<ListenOptions>>,
    stops: AtomicUsize,
    fail_start: bool,
}

impl FakeRecognizer {
    fn latest_sink(&self) -> TranscriptSink {
        self.sinks.lock().unwrap().last().cloned().expect("recognizer started")
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&self, options: ListenOptions, sink: TranscriptSink) -> UnibotResult<()> {
        if self.fail_start {
            return Err(config_error!("microphone unavailable", "fake_recognizer"));
        }
        self.options.lock().unwrap().push(options);
        self.sinks.lock().unwrap().push(sink);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn assistant(recognizer: Arc<FakeRecognizer>) -> (VoiceAssistant, Arc<FakeSynthesizer>) {
    let synthesizer = Arc::new(FakeSynthesizer::default());
    let voice = VoiceAssistant::new(synthesizer.clone(), recognizer, &SpeechConfig::default());
    (voice, synthesizer)
}

type Heard = mpsc::UnboundedReceiver<String>;

fn collector() -> (impl FnMut(&str) + Send + 'static, Heard) {
    let (tx, rx) = mpsc::unbounded_channel();
    let on_transcript = move |text: &str| {
        let _ = tx.send(text.to_string());
    };
    (on_transcript, rx)
}

/// Next delivered transcript; `None` once the session's handler is gone
async fn next(heard: &mut Heard) -> Option<String> {
    timeout(Duration::from_secs(2), heard.recv())
        .await
        .expect("delivery task stalled")
}

async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_speak_cancels_then_speaks_with_defaults() {
    let (voice, synthesizer) = assistant(Arc::new(FakeRecognizer::default()));

    voice.speak("Welcome to REVA").await.unwrap();
    voice.speak("   ").await.unwrap();

    assert_eq!(
        *synthesizer.events.lock().unwrap(),
        vec!["cancel".to_string(), "speak:Welcome to REVA@1/1.1".to_string()]
    );
}

#[tokio::test]
async fn test_final_transcript_delivers_and_auto_closes() {
    let recognizer = Arc::new(FakeRecognizer::default());
    let (voice, _) = assistant(recognizer.clone());
    let (on_transcript, mut heard) = collector();

    assert!(voice.listen(on_transcript));
    assert!(voice.is_listening());
    assert_eq!(
        recognizer.options.lock().unwrap()[0],
        ListenOptions {
            auto_close: true,
            silence_timeout_ms: 1500
        }
    );

    let sink = recognizer.latest_sink();
    sink.interim("what are the");
    sink.final_transcript("what are the hostel fees");
    sink.final_transcript("ignored after close");

    assert_eq!(next(&mut heard).await.as_deref(), Some("what are the hostel fees"));
    assert_eq!(next(&mut heard).await, None);
    assert!(wait_until(|| !voice.is_listening()).await);
    assert_eq!(recognizer.stops(), 1);
}

#[tokio::test]
async fn test_blank_final_transcript_is_not_delivered() {
    let recognizer = Arc::new(FakeRecognizer::default());
    let (voice, _) = assistant(recognizer.clone());
    let (on_transcript, mut heard) = collector();

    voice.listen(on_transcript);
    recognizer.latest_sink().final_transcript("  ");

    assert_eq!(next(&mut heard).await, None);
    assert!(!voice.is_listening());
}

#[tokio::test]
async fn test_end_without_final_uses_last_interim() {
    let recognizer = Arc::new(FakeRecognizer::default());
    let (voice, _) = assistant(recognizer.clone());
    let (on_transcript, mut heard) = collector();

    voice.listen(on_transcript);
    let sink = recognizer.latest_sink();
    sink.interim("library");
    sink.interim("library timings");
    sink.ended();

    assert_eq!(next(&mut heard).await.as_deref(), Some("library timings"));
    assert_eq!(next(&mut heard).await, None);
    assert!(!voice.is_listening());
}

#[tokio::test]
async fn test_continuous_listening_keeps_session_open() {
    let recognizer = Arc::new(FakeRecognizer::default());
    let (voice, _) = assistant(recognizer.clone());
    let (on_transcript, mut heard) = collector();

    let options = ListenOptions {
        auto_close: false,
        silence_timeout_ms: 3000,
    };
    voice.listen_with(on_transcript, options);
    let sink = recognizer.latest_sink();
    sink.final_transcript("first");
    sink.final_transcript("second");

    assert_eq!(next(&mut heard).await.as_deref(), Some("first"));
    assert_eq!(next(&mut heard).await.as_deref(), Some("second"));
    assert!(voice.is_listening());

    assert!(voice.stop_listening());
    sink.final_transcript("after stop");
    assert_eq!(next(&mut heard).await, None);
    assert!(!voice.stop_listening());
}

#[tokio::test]
async fn test_transcript_handler_can_stop_listening() {
    let recognizer = Arc::new(FakeRecognizer::default());
    let (voice, _) = assistant(recognizer.clone());
    let voice = Arc::new(voice);
    let (tx, mut outcomes) = mpsc::unbounded_channel();

    let handle = Arc::downgrade(&voice);
    let options = ListenOptions {
        auto_close: false,
        silence_timeout_ms: 1500,
    };
    voice.listen_with(
        move |text: &str| {
            let stopped = handle
                .upgrade()
                .map(|voice| voice.stop_listening())
                .unwrap_or(false);
            let _ = tx.send((text.to_string(), stopped));
        },
        options,
    );

    let sink = recognizer.latest_sink();
    sink.final_transcript("stop please");
    sink.final_transcript("too late");

    let first = timeout(Duration::from_secs(2), outcomes.recv())
        .await
        .expect("handler returned");
    assert_eq!(first, Some(("stop please".to_string(), true)));
    let rest = timeout(Duration::from_secs(2), outcomes.recv())
        .await
        .expect("session wound down");
    assert_eq!(rest, None);
    assert!(!voice.is_listening());
    assert_eq!(recognizer.stops(), 1);
}

#[tokio::test]
async fn test_new_session_replaces_previous() {
    let recognizer = Arc::new(FakeRecognizer::default());
    let (voice, _) = assistant(recognizer.clone());
    let (old_on_transcript, mut old_heard) = collector();
    let (on_transcript, mut heard) = collector();

    voice.listen(old_on_transcript);
    let old_sink = recognizer.latest_sink();

    voice.listen(on_transcript);
    let new_sink = recognizer.latest_sink();
    assert_ne!(old_sink.session_id(), new_sink.session_id());
    assert_eq!(recognizer.stops(), 1);

    // The stale session can neither deliver nor close the new one
    old_sink.final_transcript("stale");
    assert_eq!(next(&mut old_heard).await, None);
    assert!(voice.is_listening());

    new_sink.final_transcript("fresh");
    assert_eq!(next(&mut heard).await.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_failed_start_leaves_nothing_running() {
    let recognizer = Arc::new(FakeRecognizer {
        fail_start: true,
        ..FakeRecognizer::default()
    });
    let (voice, _) = assistant(recognizer);
    let (on_transcript, mut heard) = collector();

    assert!(!voice.listen(on_transcript));
    assert!(!voice.is_listening());
    assert_eq!(next(&mut heard).await, None);
}
