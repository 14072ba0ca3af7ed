//! Wire messages for the bidirectional live audio stream.
//!
//! The peer speaks camelCase JSON. A single inbound frame can carry
//! several pieces of content, so parsing yields a list of events rather
//! than one.

use serde::{Deserialize, Serialize};

use crate::audio::MediaChunk;

// ============================================================================
// Outbound
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

/// Session configuration sent as the first frame after connecting.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub output_audio_transcription: Empty,
}

impl Setup {
    pub fn new(model: &str, voice: &str, system_instruction: &str) -> Self {
        let model = if model.contains('/') {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                },
            },
            system_instruction: Content {
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            },
            output_audio_transcription: Empty {},
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

/// Serializes as `{}`. Presence of the field switches the feature on.
#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ServerMessage {
    setup_complete: Option<serde_json::Value>,
    server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    output_transcription: Option<Transcription>,
    interrupted: Option<bool>,
    turn_complete: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ModelTurn {
    parts: Vec<InlinePart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct InlinePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Transcription {
    text: String,
}

/// One piece of content from the live peer, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The peer accepted the setup message; streaming may begin.
    SetupComplete,
    /// A base64 PCM chunk of model speech.
    Audio { data: String },
    /// A fragment of the transcript of model speech.
    Transcription { text: String },
    /// The peer cut playback short; pending audio must be discarded.
    Interrupted,
    /// The model finished its turn.
    TurnComplete,
    /// The peer closed the stream.
    Closed,
    /// The transport failed.
    Error { message: String },
}

/// Parse one inbound frame into its events. Audio precedes the
/// interruption flag, which precedes transcription; `TurnComplete` is
/// always last. Unknown fields are ignored.
pub fn parse_server_frame(raw: &str) -> Result<Vec<ServerEvent>, serde_json::Error> {
    let message: ServerMessage = serde_json::from_str(raw)?;
    let mut events = Vec::new();

    if message.setup_complete.is_some() {
        events.push(ServerEvent::SetupComplete);
    }

    if let Some(content) = message.server_content {
        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(inline) = part.inline_data {
                    events.push(ServerEvent::Audio { data: inline.data });
                }
            }
        }
        if content.interrupted.unwrap_or(false) {
            events.push(ServerEvent::Interrupted);
        }
        if let Some(transcription) = content.output_transcription {
            if !transcription.text.is_empty() {
                events.push(ServerEvent::Transcription {
                    text: transcription.text,
                });
            }
        }
        if content.turn_complete.unwrap_or(false) {
            events.push(ServerEvent::TurnComplete);
        }
    }

    Ok(events)
}
