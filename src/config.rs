use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub live: LiveConfig,
    pub analysis: AnalysisConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub frame_samples: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    pub endpoint: String,
    pub model: String,
    pub voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub endpoint: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Config {
    /// Load from the named file, then let `CAREERHUB__`-prefixed
    /// environment variables override individual keys. The API key is
    /// not configuration; it comes from `GEMINI_API_KEY` alone.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CAREERHUB").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
