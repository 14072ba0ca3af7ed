//! Gemini-backed resume analyzer.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{AnalysisError, ResumeAnalysis, ResumeAnalyzer, UploadedDocument};

const ACCEPTED_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(120);

const ANALYSIS_PROMPT: &str = "You are an expert career coach and resume reviewer. \
    Analyze the attached resume and respond with JSON containing: an overall score \
    out of 100 under \"score\", the top 3 strengths under \"strengths\", the top 3 \
    weaknesses under \"weaknesses\", and 3 specific, actionable suggestions for \
    improvement under \"suggestions\".";

fn supported_mime(mime: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&mime)
}

/// Client for the generateContent endpoint, constrained to a JSON
/// response schema so the reply parses directly into [`ResumeAnalysis`].
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiAnalyzer {
    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ResumeAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, document: &UploadedDocument) -> Result<ResumeAnalysis, AnalysisError> {
        if !supported_mime(&document.mime_type) {
            return Err(AnalysisError::UnsupportedType(document.mime_type.clone()));
        }

        info!(
            "analyzing resume {} ({} bytes)",
            document.file_name,
            document.bytes.len()
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart {
                        inline_data: Some(RequestInlineData {
                            mime_type: document.mime_type.clone(),
                            data: BASE64.encode(&document.bytes),
                        }),
                        text: None,
                    },
                    RequestPart {
                        inline_data: None,
                        text: Some(ANALYSIS_PROMPT.to_string()),
                    },
                ],
            }],
            generation_config: RequestGenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: analysis_schema(),
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .timeout(ANALYSIS_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(AnalysisError::EmptyContent)?;

        let analysis = analysis_from_response_text(&text)?;
        info!("resume analysis complete: score {}", analysis.score);
        Ok(analysis)
    }
}

/// Schema handed to the model so the response is machine-parseable.
fn analysis_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "INTEGER" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "weaknesses": { "type": "ARRAY", "items": { "type": "STRING" } },
            "suggestions": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["score", "strengths", "weaknesses", "suggestions"]
    })
}

/// Parse the model's reply, tolerating markdown code fences around the
/// JSON body.
fn analysis_from_response_text(text: &str) -> Result<ResumeAnalysis, AnalysisError> {
    let analysis: ResumeAnalysis = serde_json::from_str(strip_code_fences(text))?;
    analysis.validate()?;
    Ok(analysis)
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: RequestGenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<RequestInlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "score": 82,
        "strengths": ["a", "b", "c"],
        "weaknesses": ["d", "e", "f"],
        "suggestions": ["g", "h", "i"]
    }"#;

    #[test]
    fn parses_plain_json() {
        let analysis = analysis_from_response_text(VALID).unwrap();
        assert_eq!(analysis.score, 82);
        assert_eq!(analysis.strengths, ["a", "b", "c"]);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```");
        let analysis = analysis_from_response_text(&fenced).unwrap();
        assert_eq!(analysis.score, 82);
    }

    #[test]
    fn rejects_out_of_range_score() {
        let text = VALID.replace("82", "182");
        assert!(matches!(
            analysis_from_response_text(&text),
            Err(AnalysisError::Shape(_))
        ));
    }

    #[test]
    fn rejects_wrong_list_length() {
        let text = VALID.replace(r#"["g", "h", "i"]"#, r#"["g"]"#);
        assert!(matches!(
            analysis_from_response_text(&text),
            Err(AnalysisError::Shape(_))
        ));
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn accepts_known_mime_types_only() {
        assert!(supported_mime("application/pdf"));
        assert!(supported_mime("text/plain"));
        assert!(!supported_mime("image/png"));
    }
}
