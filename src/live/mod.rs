pub mod events;
pub mod transport;

pub use events::{parse_server_frame, ServerEvent, Setup};
pub use transport::{GeminiLive, LiveConnection, LiveConnector};
