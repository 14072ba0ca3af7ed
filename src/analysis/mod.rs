//! Resume analysis against a generative model.

mod client;

pub use client::GeminiAnalyzer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured verdict on an uploaded resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    pub score: u32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ResumeAnalysis {
    /// Check the shape the model was asked for: a score out of 100 and
    /// exactly three entries per list.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.score > 100 {
            return Err(AnalysisError::Shape(format!(
                "score {} is out of range",
                self.score
            )));
        }
        for (name, list) in [
            ("strengths", &self.strengths),
            ("weaknesses", &self.weaknesses),
            ("suggestions", &self.suggestions),
        ] {
            if list.len() != 3 {
                return Err(AnalysisError::Shape(format!(
                    "expected 3 {name}, got {}",
                    list.len()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("failed to parse analysis: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model returned no content")]
    EmptyContent,
    #[error("analysis has the wrong shape: {0}")]
    Shape(String),
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
}

/// A document as it arrived from the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn analyze(&self, document: &UploadedDocument) -> Result<ResumeAnalysis, AnalysisError>;
}
