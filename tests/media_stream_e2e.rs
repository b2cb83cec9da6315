//! End-to-end relay tests
//!
//! The gateway runs on an ephemeral port, the speech-AI service is a local
//! mock, and the test plays the telephony platform over a real WebSocket.

mod mock_upstream;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use callrelay_gateway::core::realtime::{OPENAI_REALTIME_URL, OpenAIRealtimeModel};
use callrelay_gateway::{ServerConfig, routes, state::AppState};

use mock_upstream::{EVENT_TIMEOUT, MockUpstream};

type TelephonyClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn test_config(realtime_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 5050,
        public_host: None,
        openai_api_key: Some("sk-test".to_string()),
        openai_model: OpenAIRealtimeModel::default(),
        openai_realtime_url: realtime_url.to_string(),
        temperature: 0.8,
        default_agent: "michela".to_string(),
        agents: HashMap::new(),
        fallback_message: None,
        log_timing_math: true,
        twilio_account_sid: None,
        twilio_auth_token: None,
        twilio_phone_number: None,
        twilio_api_base_url: "https://api.twilio.com".to_string(),
        webhook_base_url: None,
    }
}

async fn start_gateway(config: ServerConfig) -> SocketAddr {
    let state = AppState::new(config).unwrap();
    let app = routes::create_voice_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect_call(addr: SocketAddr, agent: &str) -> TelephonyClient {
    let (client, _) = connect_async(format!("ws://{}/media-stream?agent={}", addr, agent))
        .await
        .unwrap();
    client
}

async fn send_json(client: &mut TelephonyClient, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

async fn next_command(client: &mut TelephonyClient) -> Value {
    loop {
        let message = tokio::time::timeout(EVENT_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for telephony command")
            .expect("telephony socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn assert_phone_silent(client: &mut TelephonyClient, wait: Duration) {
    if let Ok(Some(Ok(message))) = tokio::time::timeout(wait, client.next()).await {
        panic!("unexpected telephony frame: {:?}", message);
    }
}

fn start_event(stream_sid: &str) -> Value {
    json!({
        "event": "start",
        "sequenceNumber": "1",
        "start": {
            "accountSid": "AC0",
            "streamSid": stream_sid,
            "callSid": "CA-call",
            "tracks": ["inbound"],
            "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
        },
        "streamSid": stream_sid
    })
}

fn media_event(timestamp: u64) -> Value {
    json!({
        "event": "media",
        "media": {
            "track": "inbound",
            "chunk": "1",
            "timestamp": timestamp.to_string(),
            "payload": BASE64_STANDARD.encode([0xFFu8; 160])
        }
    })
}

fn audio_delta(item_id: &str) -> Value {
    json!({
        "type": "response.audio.delta",
        "response_id": "resp_1",
        "item_id": item_id,
        "output_index": 0,
        "content_index": 0,
        "delta": BASE64_STANDARD.encode([0u8; 960])
    })
}

#[tokio::test]
async fn test_full_call_with_barge_in() {
    let mut upstream = MockUpstream::start().await;
    let addr = start_gateway(test_config(&upstream.url)).await;
    let mut phone = connect_call(addr, "andrea").await;

    // Negotiation: headers and exactly one session.update before anything else.
    let handshake = upstream.handshake().await;
    assert_eq!(handshake.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(handshake.openai_beta.as_deref(), Some("realtime=v1"));
    assert!(handshake.uri.contains("model=gpt-4o-realtime-preview-2024-10-01"));

    let update = upstream.next_event().await;
    assert_eq!(update["type"], "session.update");
    assert_eq!(update["session"]["voice"], "alloy");
    assert_eq!(update["session"]["turn_detection"]["type"], "server_vad");
    assert_eq!(update["session"]["input_audio_format"], "pcm16");
    assert_eq!(update["session"]["output_audio_format"], "pcm16");

    // Audio before start is not relayed in either direction.
    upstream.send(audio_delta("item_0"));
    send_json(&mut phone, media_event(20)).await;
    upstream.assert_silent(Duration::from_millis(200)).await;

    // Start triggers the greeting exactly once.
    send_json(&mut phone, start_event("CA123")).await;
    let create = upstream.next_event().await;
    assert_eq!(create["type"], "conversation.item.create");
    assert_eq!(create["item"]["content"][0]["text"], "Hello");
    assert_eq!(upstream.next_event().await["type"], "response.create");

    // Caller audio is upsampled and appended.
    send_json(&mut phone, media_event(4200)).await;
    let append = upstream.next_event().await;
    assert_eq!(append["type"], "input_audio_buffer.append");
    let pcm = BASE64_STANDARD
        .decode(append["audio"].as_str().unwrap())
        .unwrap();
    assert_eq!(pcm.len(), 160 * 3 * 2);

    // Assistant audio is downsampled and followed by a mark.
    upstream.send(audio_delta("item_7"));
    upstream.send(audio_delta("item_7"));
    for _ in 0..2 {
        let media = next_command(&mut phone).await;
        assert_eq!(media["event"], "media");
        assert_eq!(media["streamSid"], "CA123");
        let ulaw = BASE64_STANDARD
            .decode(media["media"]["payload"].as_str().unwrap())
            .unwrap();
        assert_eq!(ulaw.len(), 160);

        let mark = next_command(&mut phone).await;
        assert_eq!(mark["event"], "mark");
        assert_eq!(mark["streamSid"], "CA123");
        assert_eq!(mark["mark"]["name"], "responsePart");
    }

    // Clock moves to 5000; wait until the relay has seen it.
    send_json(&mut phone, media_event(5000)).await;
    assert_eq!(upstream.next_event().await["type"], "input_audio_buffer.append");

    // Barge-in: one truncate upstream, one clear downstream.
    upstream.send(json!({"type": "input_audio_buffer.speech_started", "audio_start_ms": 900, "item_id": "in_1"}));
    let truncate = upstream.next_control_event().await;
    assert_eq!(truncate["type"], "conversation.item.truncate");
    assert_eq!(truncate["item_id"], "item_7");
    assert_eq!(truncate["content_index"], 0);
    assert_eq!(truncate["audio_end_ms"], 800);

    let clear = next_command(&mut phone).await;
    assert_eq!(clear, json!({"event": "clear", "streamSid": "CA123"}));

    // Late audio of the interrupted item never reaches the caller; the next
    // item's audio does.
    upstream.send(audio_delta("item_7"));
    upstream.send(audio_delta("item_8"));
    let media = next_command(&mut phone).await;
    assert_eq!(media["event"], "media");
    assert_eq!(next_command(&mut phone).await["event"], "mark");

    // A garbled frame and an odd-length chunk are skipped; the next good
    // chunk still reaches the caller.
    upstream.send_raw("{oops");
    upstream.send(json!({
        "type": "response.audio.delta",
        "item_id": "item_8",
        "delta": BASE64_STANDARD.encode([0u8; 3])
    }));
    upstream.send(audio_delta("item_8"));
    let media = next_command(&mut phone).await;
    assert_eq!(media["event"], "media");
    let ulaw = BASE64_STANDARD
        .decode(media["media"]["payload"].as_str().unwrap())
        .unwrap();
    assert_eq!(ulaw.len(), 160);
    assert_eq!(next_command(&mut phone).await["event"], "mark");

    // The first interrupted item stays silenced after a second barge-in.
    upstream.send(json!({"type": "input_audio_buffer.speech_started", "audio_start_ms": 6000}));
    assert_eq!(
        upstream.next_control_event().await["type"],
        "conversation.item.truncate"
    );
    assert_eq!(next_command(&mut phone).await["event"], "clear");
    upstream.send(audio_delta("item_7"));
    upstream.send(audio_delta("item_8"));
    upstream.send(audio_delta("item_9"));
    let media = next_command(&mut phone).await;
    assert_eq!(media["event"], "media");
    assert_eq!(next_command(&mut phone).await["event"], "mark");
    assert_phone_silent(&mut phone, Duration::from_millis(200)).await;

    // End of caller turn: commit then response.create.
    upstream.send(json!({"type": "input_audio_buffer.speech_stopped", "audio_end_ms": 2000, "item_id": "in_1"}));
    assert_eq!(
        upstream.next_control_event().await["type"],
        "input_audio_buffer.commit"
    );
    assert_eq!(upstream.next_control_event().await["type"], "response.create");

    // Informational and unknown events change nothing.
    upstream.send(json!({"type": "rate_limits.updated", "rate_limits": []}));
    upstream.send(json!({"type": "response.audio_transcript.delta", "delta": "hi"}));
    upstream.send(json!({"type": "error", "error": {"message": "boom"}}));

    // Malformed telephony frames are skipped, the call goes on.
    phone
        .send(Message::Text("{not json".into()))
        .await
        .unwrap();
    send_json(&mut phone, media_event(5020)).await;
    assert_eq!(upstream.next_event().await["type"], "input_audio_buffer.append");

    // Hanging up closes the upstream leg.
    phone.close(None).await.unwrap();
    upstream.wait_closed().await;
}

#[tokio::test]
async fn test_unknown_agent_uses_default() {
    let mut upstream = MockUpstream::start().await;
    let addr = start_gateway(test_config(&upstream.url)).await;
    let _phone = connect_call(addr, "unknown").await;

    let update = upstream.next_event().await;
    assert_eq!(update["type"], "session.update");
    assert_eq!(update["session"]["voice"], "shimmer");
    assert!(
        update["session"]["instructions"]
            .as_str()
            .unwrap()
            .contains("Michela")
    );
}

#[tokio::test]
async fn test_stop_event_ends_call() {
    let mut upstream = MockUpstream::start().await;
    let addr = start_gateway(test_config(&upstream.url)).await;
    let mut phone = connect_call(addr, "michela").await;

    assert_eq!(upstream.next_event().await["type"], "session.update");
    send_json(&mut phone, start_event("CA555")).await;
    assert_eq!(upstream.next_control_event().await["type"], "conversation.item.create");
    assert_eq!(upstream.next_control_event().await["type"], "response.create");

    send_json(&mut phone, json!({"event": "stop", "stop": {"callSid": "CA-call"}})).await;
    upstream.wait_closed().await;
}

#[tokio::test]
async fn test_upstream_close_hangs_up_telephony() {
    let mut upstream = MockUpstream::start().await;
    let addr = start_gateway(test_config(&upstream.url)).await;
    let mut phone = connect_call(addr, "michela").await;

    assert_eq!(upstream.next_event().await["type"], "session.update");
    upstream.close();

    let closed = tokio::time::timeout(EVENT_TIMEOUT, async {
        while let Some(Ok(message)) = phone.next().await {
            if message.is_close() {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "telephony socket was not closed");
}

#[tokio::test]
async fn test_negotiation_failure_closes_telephony() {
    // Nothing listens on port 1.
    let addr = start_gateway(test_config("ws://127.0.0.1:1/v1/realtime")).await;
    let mut phone = connect_call(addr, "michela").await;

    let closed = tokio::time::timeout(EVENT_TIMEOUT, async {
        while let Some(Ok(message)) = phone.next().await {
            if message.is_close() {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "telephony socket was not closed");
}

#[test]
fn test_default_realtime_url_is_wss() {
    assert!(OPENAI_REALTIME_URL.starts_with("wss://"));
}
