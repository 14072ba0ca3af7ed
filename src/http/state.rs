use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analysis::ResumeAnalyzer;
use crate::audio::DeviceFactory;
use crate::config::Config;
use crate::interview::InterviewSession;
use crate::live::LiveConnector;
use crate::resume::ResumeStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Interview sessions keyed by session id
    pub sessions: Arc<RwLock<HashMap<String, Arc<InterviewSession>>>>,
    pub store: Arc<dyn ResumeStore>,
    pub analyzer: Arc<dyn ResumeAnalyzer>,
    pub devices: Arc<dyn DeviceFactory>,
    pub connector: Arc<dyn LiveConnector>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        analyzer: Arc<dyn ResumeAnalyzer>,
        devices: Arc<dyn DeviceFactory>,
        connector: Arc<dyn LiveConnector>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            analyzer,
            devices,
            connector,
            config,
        }
    }
}
