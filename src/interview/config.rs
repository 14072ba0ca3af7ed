use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::FRAME_SAMPLES;

/// Per-interview configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub session_id: String,
    pub job_title: String,
    pub model: String,
    pub voice: String,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub frame_samples: usize,
    pub feedback_limit: usize,
    pub total_questions: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("interview-{}", Uuid::new_v4()),
            job_title: String::new(),
            model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            voice: "Zephyr".to_string(),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_samples: FRAME_SAMPLES,
            feedback_limit: 5,
            total_questions: 10,
        }
    }
}

impl SessionConfig {
    pub fn new(job_title: impl Into<String>) -> Self {
        Self {
            job_title: job_title.into(),
            ..Default::default()
        }
    }
}
