//! Live wire format: inbound frame parsing and outbound message shapes.

use careerhub::live::events::{RealtimeInput, RealtimeInputMessage, SetupMessage};
use careerhub::live::parse_server_frame;
use careerhub::{MediaChunk, ServerEvent, Setup, PCM_MIME_16K};

#[test]
fn combined_frame_yields_audio_then_interrupt_then_transcription() {
    let raw = r#"{
        "serverContent": {
            "modelTurn": {
                "parts": [
                    { "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "AAAA" } }
                ]
            },
            "outputTranscription": { "text": "QUESTION: Tell me about yourself." },
            "interrupted": true
        }
    }"#;

    let events = parse_server_frame(raw).unwrap();
    assert_eq!(
        events,
        vec![
            ServerEvent::Audio {
                data: "AAAA".to_string()
            },
            ServerEvent::Interrupted,
            ServerEvent::Transcription {
                text: "QUESTION: Tell me about yourself.".to_string()
            },
        ]
    );
}

#[test]
fn setup_acknowledgement_parses() {
    let events = parse_server_frame(r#"{"setupComplete": {}}"#).unwrap();
    assert_eq!(events, vec![ServerEvent::SetupComplete]);
}

#[test]
fn turn_complete_is_last() {
    let raw = r#"{
        "serverContent": {
            "outputTranscription": { "text": "some narration" },
            "turnComplete": true
        }
    }"#;
    let events = parse_server_frame(raw).unwrap();
    assert_eq!(
        events,
        vec![
            ServerEvent::Transcription {
                text: "some narration".to_string()
            },
            ServerEvent::TurnComplete,
        ]
    );
}

#[test]
fn multiple_audio_parts_keep_their_order() {
    let raw = r#"{
        "serverContent": {
            "modelTurn": {
                "parts": [
                    { "inlineData": { "data": "Zmlyc3Q=" } },
                    { "inlineData": { "data": "c2Vjb25k" } }
                ]
            }
        }
    }"#;
    let events = parse_server_frame(raw).unwrap();
    assert_eq!(
        events,
        vec![
            ServerEvent::Audio {
                data: "Zmlyc3Q=".to_string()
            },
            ServerEvent::Audio {
                data: "c2Vjb25k".to_string()
            },
        ]
    );
}

#[test]
fn unknown_fields_and_empty_transcriptions_produce_nothing() {
    let events = parse_server_frame(r#"{"usageMetadata": {"totalTokens": 5}}"#).unwrap();
    assert!(events.is_empty());

    let events =
        parse_server_frame(r#"{"serverContent": {"outputTranscription": {"text": ""}}}"#).unwrap();
    assert!(events.is_empty());
}

#[test]
fn malformed_json_is_an_error() {
    assert!(parse_server_frame("not json").is_err());
}

#[test]
fn setup_message_serializes_to_the_expected_shape() {
    let setup = Setup::new(
        "gemini-2.5-flash-native-audio-preview-09-2025",
        "Zephyr",
        "Be nice.",
    );
    let json = serde_json::to_value(SetupMessage { setup }).unwrap();

    assert_eq!(
        json["setup"]["model"],
        "models/gemini-2.5-flash-native-audio-preview-09-2025"
    );
    assert_eq!(
        json["setup"]["generationConfig"]["responseModalities"][0],
        "AUDIO"
    );
    assert_eq!(
        json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
            ["voiceName"],
        "Zephyr"
    );
    assert_eq!(json["setup"]["systemInstruction"]["parts"][0]["text"], "Be nice.");
    assert!(json["setup"]["outputAudioTranscription"].is_object());
}

#[test]
fn qualified_model_names_are_left_alone() {
    let setup = Setup::new("models/custom-tuned", "Kore", "x");
    assert_eq!(setup.model, "models/custom-tuned");
}

#[test]
fn realtime_input_serializes_media_chunks() {
    let message = RealtimeInputMessage {
        realtime_input: RealtimeInput {
            media_chunks: vec![MediaChunk {
                data: "AAAA".to_string(),
                mime_type: PCM_MIME_16K.to_string(),
            }],
        },
    };
    let json = serde_json::to_value(&message).unwrap();

    assert_eq!(
        json["realtimeInput"]["mediaChunks"][0]["mimeType"],
        "audio/pcm;rate=16000"
    );
    assert_eq!(json["realtimeInput"]["mediaChunks"][0]["data"], "AAAA");
}
