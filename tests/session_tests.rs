// Integration tests for the voice session lifecycle: start sequence,
// capture forwarding, server event handling, barge-in, teardown on every
// exit path, and the engine's toggle semantics.

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{MockEndpoint, PushInput, SimulatedDevices, StubPromo};
use dukaan_voice::{
    encode_block, Account, AudioInput, CaptureBlock, EngineConfig, InventoryStore, Item,
    ItemUpdate, MemoryStore, RemoveOutcome, ScriptedInput, SelectionSet, ServerEvent,
    SessionDeps, SessionError, SimulatedSink, Speaker, ToggleOutcome, ToolCallMessage,
    ToolDispatcher, VoiceEngine, VoiceSession, VoiceSessionConfig,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::time::sleep;

fn dispatcher(store: Arc<dyn InventoryStore>) -> ToolDispatcher {
    let (promo_tx, _promo_rx) = mpsc::unbounded_channel();
    ToolDispatcher::new(
        store,
        Arc::new(Mutex::new(Account::free(vec!["grocery".to_string()]))),
        SelectionSet::new(),
        Arc::new(StubPromo),
        promo_tx,
    )
}

fn session_config() -> VoiceSessionConfig {
    VoiceSessionConfig {
        session_id: "voice-test".to_string(),
        ..VoiceSessionConfig::default()
    }
}

struct Started {
    session: Arc<VoiceSession>,
    endpoint: Arc<MockEndpoint>,
    sink: Arc<SimulatedSink>,
}

async fn start_session(input: Box<dyn AudioInput>) -> Result<Started> {
    start_session_with_store(input, Arc::new(MemoryStore::new())).await
}

async fn start_session_with_store(
    input: Box<dyn AudioInput>,
    store: Arc<dyn InventoryStore>,
) -> Result<Started> {
    let endpoint = Arc::new(MockEndpoint::new());
    let (sink, completions) = SimulatedSink::new();
    let sink = Arc::new(sink);

    let session = VoiceSession::start(
        session_config(),
        SessionDeps {
            endpoint: endpoint.clone(),
            input,
            sink: sink.clone(),
            completions,
            dispatcher: dispatcher(store),
        },
    )
    .await?;

    Ok(Started {
        session,
        endpoint,
        sink,
    })
}

/// Poll until the condition holds, or fail the test.
async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for: {what}");
}

#[tokio::test]
async fn test_start_plays_greeting_and_declares_tools() -> Result<()> {
    let started = start_session(Box::new(ScriptedInput::new(Vec::new()))).await?;

    // The greeting is scheduled before anything else and lands in the
    // transcript as an assistant utterance.
    let scheduled = started.sink.scheduled();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].start_at, 0.0);
    assert_eq!(scheduled[0].duration, 1.0);

    let transcript = started.session.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].speaker, Speaker::Assistant);
    assert_eq!(transcript[0].text, "Hello, how can I help you?");

    let log = started.endpoint.log();
    let log = log.lock().unwrap();
    let spec = log.last_spec.as_ref().expect("session opened");
    assert_eq!(spec.session_id, "voice-test");
    assert_eq!(spec.tools.len(), 8, "the full tool set is declared");
    assert!(spec.transcription);
    assert!(spec.system_prompt.contains("grocery"));

    drop(log);
    started.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_capture_blocks_are_encoded_and_forwarded() -> Result<()> {
    let (input, capture_tx) = PushInput::new();
    let started = start_session(Box::new(input)).await?;

    capture_tx
        .send(CaptureBlock {
            samples: vec![0.5f32; 1600],
            sample_rate: 16_000,
        })
        .await?;
    capture_tx
        .send(CaptureBlock {
            samples: vec![-0.25f32; 1600],
            sample_rate: 16_000,
        })
        .await?;

    let log = started.endpoint.log();
    wait_for("both capture blocks forwarded", || {
        log.lock().unwrap().frames.len() == 2
    })
    .await;

    let frames = log.lock().unwrap().frames.clone();
    assert_eq!(frames[0].sequence, 0);
    assert_eq!(frames[1].sequence, 1);
    assert_eq!(frames[0].sample_rate, 16_000);
    assert_eq!(frames[0].channels, 1);
    assert_eq!(frames[0].session_id, "voice-test");
    assert_eq!(frames[0].pcm, encode_block(&vec![0.5f32; 1600]));

    let status = started.session.status().await;
    assert!(status.active);
    assert_eq!(status.frames_sent, 2);

    started.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_blocks_captured_before_session_opens_are_dropped() -> Result<()> {
    // The device starts producing the moment it opens, and the greeting
    // keeps the start sequence busy before the remote session exists.
    let blocks = vec![
        CaptureBlock {
            samples: vec![0.1f32; 1600],
            sample_rate: 16_000,
        };
        3
    ];
    let endpoint = Arc::new(MockEndpoint::new());
    endpoint.delay_synthesis(Duration::from_millis(100));
    let (sink, completions) = SimulatedSink::new();

    let session = VoiceSession::start(
        session_config(),
        SessionDeps {
            endpoint: endpoint.clone(),
            input: Box::new(ScriptedInput::new(blocks)),
            sink: Arc::new(sink),
            completions,
            dispatcher: dispatcher(Arc::new(MemoryStore::new())),
        },
    )
    .await?;

    // None of the audio captured during the handshake may surface as a
    // burst of stale user speech once the session is open.
    sleep(Duration::from_millis(100)).await;
    assert!(
        endpoint.log().lock().unwrap().frames.is_empty(),
        "blocks captured before the remote session opened must be dropped, not queued"
    );
    assert_eq!(session.status().await.frames_sent, 0);

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_audio_deltas_play_gaplessly_and_barge_in_silences() -> Result<()> {
    let started = start_session(Box::new(ScriptedInput::new(Vec::new()))).await?;
    let events = started.endpoint.event_sender();

    // Two 0.1s speech chunks on top of the 1s greeting.
    let chunk = encode_block(&vec![0.25f32; 2_400]);
    events.send(ServerEvent::AudioDelta { pcm: chunk.clone() }).await?;
    events.send(ServerEvent::AudioDelta { pcm: chunk }).await?;

    let sink = Arc::clone(&started.sink);
    wait_for("both deltas scheduled", || sink.scheduled().len() == 3).await;

    let scheduled = started.sink.scheduled();
    assert_eq!(scheduled[1].start_at, 1.0, "first delta follows the greeting");
    assert_eq!(scheduled[2].start_at, 1.1, "second delta follows the first");

    events.send(ServerEvent::Interrupted).await?;
    let sink = Arc::clone(&started.sink);
    wait_for("barge-in stops every source", || sink.stopped().len() == 3).await;

    started.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_transcript_deltas_accumulate_during_session() -> Result<()> {
    let started = start_session(Box::new(ScriptedInput::new(Vec::new()))).await?;
    let events = started.endpoint.event_sender();

    events
        .send(ServerEvent::Transcript {
            speaker: Speaker::User,
            text: "add ten ".to_string(),
        })
        .await?;
    events
        .send(ServerEvent::Transcript {
            speaker: Speaker::User,
            text: "kilos of rice".to_string(),
        })
        .await?;

    // Greeting entry plus the merged user utterance.
    let mut transcript = Vec::new();
    for _ in 0..400 {
        transcript = started.session.transcript().await;
        if transcript.len() == 2 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(transcript.len(), 2, "user deltas merge behind the greeting");
    assert_eq!(transcript[1].speaker, Speaker::User);
    assert_eq!(transcript[1].text, "add ten kilos of rice");

    started.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_tool_call_round_trip() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.upsert("rice", 5, 60.0, None, Some(45.0)).await?;
    let started = start_session_with_store(
        Box::new(ScriptedInput::new(Vec::new())),
        store.clone(),
    )
    .await?;

    let events = started.endpoint.event_sender();
    events
        .send(ServerEvent::ToolCall(ToolCallMessage {
            call_id: "call-7".to_string(),
            name: "queryInventory".to_string(),
            args: json!({"query": "what do I have"}),
        }))
        .await?;

    let log = started.endpoint.log();
    wait_for("tool result sent back", || {
        !log.lock().unwrap().results.is_empty()
    })
    .await;

    let results = log.lock().unwrap().results.clone();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].call_id, "call-7");
    assert_eq!(results[0].session_id, "voice-test");
    assert!(results[0].success);
    assert!(results[0].message.contains("rice"));

    started.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_stop_is_idempotent_and_releases_everything() -> Result<()> {
    let started = start_session(Box::new(ScriptedInput::new(Vec::new()))).await?;
    assert!(started.session.is_active());

    started.session.stop().await;
    started.session.stop().await;

    assert!(!started.session.is_active());
    assert_eq!(
        started.endpoint.log().lock().unwrap().closes,
        1,
        "the remote session is closed exactly once"
    );
    assert_eq!(
        started.sink.stopped().len(),
        1,
        "the queued greeting is silenced on teardown"
    );
    assert!(!started.session.status().await.active);
    Ok(())
}

#[tokio::test]
async fn test_remote_close_tears_the_session_down() -> Result<()> {
    let started = start_session(Box::new(ScriptedInput::new(Vec::new()))).await?;
    let events = started.endpoint.event_sender();

    events.send(ServerEvent::Closed).await?;

    let session = Arc::clone(&started.session);
    wait_for("session deactivates after remote close", || {
        !session.is_active()
    })
    .await;

    let log = started.endpoint.log();
    wait_for("remote handle closed", || log.lock().unwrap().closes == 1).await;

    // A later explicit stop is a no-op.
    started.session.stop().await;
    assert_eq!(started.endpoint.log().lock().unwrap().closes, 1);
    Ok(())
}

#[tokio::test]
async fn test_transport_error_tears_the_session_down() -> Result<()> {
    let started = start_session(Box::new(ScriptedInput::new(Vec::new()))).await?;
    let events = started.endpoint.event_sender();

    events
        .send(ServerEvent::Error {
            kind: dukaan_voice::TransportErrorKind::Connection,
            message: "socket reset".to_string(),
        })
        .await?;

    let session = Arc::clone(&started.session);
    wait_for("session deactivates after transport error", || {
        !session.is_active()
    })
    .await;
    Ok(())
}

#[tokio::test]
async fn test_start_fails_when_microphone_unavailable() -> Result<()> {
    let endpoint = Arc::new(MockEndpoint::new());
    let (sink, completions) = SimulatedSink::new();

    let result = VoiceSession::start(
        session_config(),
        SessionDeps {
            endpoint: endpoint.clone(),
            input: Box::new(ScriptedInput::failing(SessionError::PermissionDenied)),
            sink: Arc::new(sink),
            completions,
            dispatcher: dispatcher(Arc::new(MemoryStore::new())),
        },
    )
    .await;

    assert!(matches!(result, Err(SessionError::PermissionDenied)));
    assert!(
        endpoint.log().lock().unwrap().last_spec.is_none(),
        "no remote session is opened when the microphone fails"
    );
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_greeting_aborts_start() -> Result<()> {
    let endpoint = Arc::new(MockEndpoint::new());
    endpoint.fail_synthesis(SessionError::Unauthorized("key expired".to_string()));
    let (sink, completions) = SimulatedSink::new();

    let result = VoiceSession::start(
        session_config(),
        SessionDeps {
            endpoint: endpoint.clone(),
            input: Box::new(ScriptedInput::new(Vec::new())),
            sink: Arc::new(sink),
            completions,
            dispatcher: dispatcher(Arc::new(MemoryStore::new())),
        },
    )
    .await;

    let err = result.err().expect("start must fail");
    assert!(matches!(err, SessionError::Unauthorized(_)));
    assert!(!err.retryable(), "a bad key is not fixed by retrying");
    assert!(endpoint.log().lock().unwrap().last_spec.is_none());
    Ok(())
}

#[tokio::test]
async fn test_open_failure_releases_scheduled_audio() -> Result<()> {
    let endpoint = Arc::new(MockEndpoint::new());
    endpoint.fail_open(SessionError::Connection("endpoint down".to_string()));
    let (sink, completions) = SimulatedSink::new();
    let sink = Arc::new(sink);

    let result = VoiceSession::start(
        session_config(),
        SessionDeps {
            endpoint: endpoint.clone(),
            input: Box::new(ScriptedInput::new(Vec::new())),
            sink: sink.clone(),
            completions,
            dispatcher: dispatcher(Arc::new(MemoryStore::new())),
        },
    )
    .await;

    assert!(matches!(result, Err(SessionError::Connection(_))));
    assert_eq!(
        sink.stopped().len(),
        1,
        "the already-scheduled greeting is silenced on the failure path"
    );
    Ok(())
}

/// Store whose `list_all` blocks until the test grants a permit, for
/// freezing a tool call mid-dispatch.
struct GatedStore {
    inner: MemoryStore,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl InventoryStore for GatedStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Item>> {
        self.inner.find_by_name(name).await
    }

    async fn upsert(
        &self,
        name: &str,
        quantity: u32,
        price: f64,
        expiry_date: Option<&str>,
        cost_price: Option<f64>,
    ) -> Result<()> {
        self.inner.upsert(name, quantity, price, expiry_date, cost_price).await
    }

    async fn remove(&self, name: &str, quantity: u32) -> Result<RemoveOutcome> {
        self.inner.remove(name, quantity).await
    }

    async fn update_fields(&self, name: &str, updates: ItemUpdate) -> Result<()> {
        self.inner.update_fields(name, updates).await
    }

    async fn list_all(&self) -> Result<Vec<Item>> {
        let _permit = self.gate.acquire().await?;
        self.inner.list_all().await
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<()> {
        self.inner.delete_batch(ids).await
    }
}

#[tokio::test]
async fn test_tool_result_resolving_after_stop_is_discarded() -> Result<()> {
    let gate = Arc::new(Semaphore::new(0));
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        gate: Arc::clone(&gate),
    });
    let started =
        start_session_with_store(Box::new(ScriptedInput::new(Vec::new())), store).await?;

    // The dispatch blocks inside the store until the gate opens.
    let events = started.endpoint.event_sender();
    events
        .send(ServerEvent::ToolCall(ToolCallMessage {
            call_id: "late-call".to_string(),
            name: "queryInventory".to_string(),
            args: json!({"query": "anything"}),
        }))
        .await?;
    sleep(Duration::from_millis(50)).await;

    // Stop the session while the tool call is still in flight, then let it
    // finish.
    let session = Arc::clone(&started.session);
    let stop_task = tokio::spawn(async move { session.stop().await });
    sleep(Duration::from_millis(50)).await;
    gate.add_permits(1);
    stop_task.await?;

    assert!(
        started.endpoint.log().lock().unwrap().results.is_empty(),
        "a result resolving after teardown is discarded, not sent"
    );
    Ok(())
}

#[tokio::test]
async fn test_engine_toggle_starts_then_stops() -> Result<()> {
    let endpoint = Arc::new(MockEndpoint::new());
    let devices = Arc::new(SimulatedDevices::new(Box::new(ScriptedInput::new(
        Vec::new(),
    ))));
    let config = EngineConfig {
        model: "realtime-audio-v1".to_string(),
        greeting: "Hello, how can I help you?".to_string(),
        input_sample_rate: 16_000,
        output_sample_rate: 24_000,
        capture_block_frames: 4096,
    };
    let (engine, _promo_rx) = VoiceEngine::new(
        config,
        endpoint,
        devices,
        Arc::new(MemoryStore::new()),
        Account::free(vec!["grocery".to_string()]),
        Arc::new(StubPromo),
    );

    // Safe to stop with nothing running.
    engine.stop().await;
    assert!(engine.status().await.is_none());
    assert!(engine.transcript().await.is_empty());

    let outcome = engine.toggle().await?;
    let ToggleOutcome::Started { session_id } = outcome else {
        panic!("first toggle must start a session");
    };
    assert!(session_id.starts_with("voice-"));
    let status = engine.status().await.expect("live session has a status");
    assert!(status.active);
    assert_eq!(status.session_id, session_id);

    // The second toggle stops without starting a replacement.
    assert_eq!(engine.toggle().await?, ToggleOutcome::Stopped);
    assert!(engine.status().await.is_none());
    Ok(())
}
