pub mod capture;
pub mod codec;
pub mod device;
pub mod file;
pub mod playback;

pub use capture::{CaptureDevice, CaptureFrame, FrameChunker, FRAME_SAMPLES};
pub use codec::{
    decode_base64_chunk, decode_chunk, encode_frame, CodecError, DecodedAudio, MediaChunk,
    PCM_MIME_16K,
};
pub use device::{CpalDeviceFactory, CpalMicrophone, CpalSpeaker, DeviceFactory};
pub use file::WavCapture;
pub use playback::{OutputDevice, PlaybackScheduler, SourceId};
