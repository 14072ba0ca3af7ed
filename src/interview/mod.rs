//! Mock interview engine: prompt construction, transcript
//! classification, and the session that ties devices to the live stream.

mod config;
pub mod prompt;
mod session;
pub mod transcript;

pub use config::SessionConfig;
pub use session::{InterviewSession, InterviewStatus, SessionPhase};
pub use transcript::{classify, Directive, InterviewProgress};
