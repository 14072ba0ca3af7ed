pub mod analysis;
pub mod audio;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod interview;
pub mod live;
pub mod resume;

pub use analysis::{GeminiAnalyzer, ResumeAnalysis, ResumeAnalyzer, UploadedDocument};
pub use audio::{
    decode_base64_chunk, decode_chunk, encode_frame, CaptureDevice, CaptureFrame,
    CpalDeviceFactory, CpalMicrophone, CpalSpeaker, DecodedAudio, DeviceFactory, FrameChunker,
    MediaChunk, OutputDevice, PlaybackScheduler, SourceId, WavCapture, FRAME_SAMPLES, PCM_MIME_16K,
};
pub use auth::AuthUser;
pub use config::Config;
pub use error::AppError;
pub use http::{create_router, AppState};
pub use interview::{InterviewSession, InterviewStatus, SessionConfig, SessionPhase};
pub use live::{GeminiLive, LiveConnection, LiveConnector, ServerEvent, Setup};
pub use resume::{JsonFileStore, ResumeData, ResumeStore, StoredResume};
