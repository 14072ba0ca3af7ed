//! WebSocket transport to the live audio peer.
//!
//! A connection is a pair of channels plus the background tasks pumping
//! them: outbound media chunks are serialized onto the socket by a writer
//! task, inbound frames are parsed into [`ServerEvent`]s by a reader
//! task. Dropping the outbound sender drains and closes the socket.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::events::{
    parse_server_frame, RealtimeInput, RealtimeInputMessage, ServerEvent, Setup, SetupMessage,
};
use crate::audio::MediaChunk;

const OUTBOUND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;
const SETUP_TIMEOUT: Duration = Duration::from_secs(30);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An established live stream.
pub struct LiveConnection {
    /// Media chunks pushed here are sent to the peer.
    pub outbound: mpsc::Sender<MediaChunk>,
    /// Parsed events from the peer, in arrival order.
    pub events: mpsc::Receiver<ServerEvent>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl LiveConnection {
    /// Assemble a connection from already-established channels. Used by
    /// scripted peers in tests.
    pub fn from_parts(
        outbound: mpsc::Sender<MediaChunk>,
        events: mpsc::Receiver<ServerEvent>,
    ) -> Self {
        Self {
            outbound,
            events,
            tasks: Vec::new(),
        }
    }

    /// Close the stream and wait briefly for the pump tasks to exit.
    pub async fn close(self) {
        let Self {
            outbound,
            events,
            tasks,
        } = self;
        // The writer drains remaining chunks, sends a close frame, and
        // exits once its sender is gone. The reader follows the socket.
        drop(outbound);
        drop(events);
        for mut task in tasks {
            if timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
                task.abort();
            }
        }
    }
}

/// Dials the live peer. The production connector speaks WebSocket; tests
/// substitute scripted connections.
#[async_trait::async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(&self, setup: Setup) -> Result<LiveConnection>;
}

/// Connector for the Gemini live API.
pub struct GeminiLive {
    endpoint: String,
    api_key: String,
}

impl GeminiLive {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LiveConnector for GeminiLive {
    async fn connect(&self, setup: Setup) -> Result<LiveConnection> {
        info!("connecting to live endpoint: {}", self.endpoint);
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let (socket, _) = connect_async(url)
            .await
            .context("failed to open live socket")?;
        let (mut write, mut read) = socket.split();

        let setup_json = serde_json::to_string(&SetupMessage { setup })
            .context("failed to serialize setup message")?;
        write
            .send(Message::Text(setup_json))
            .await
            .context("failed to send setup message")?;

        wait_for_setup_ack(&mut read).await?;
        info!("live stream established");

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let writer = tokio::spawn(run_writer(write, outbound_rx));
        let reader = tokio::spawn(run_reader(read, events_tx));

        Ok(LiveConnection {
            outbound: outbound_tx,
            events: events_rx,
            tasks: vec![writer, reader],
        })
    }
}

/// Wait for the peer to acknowledge the setup message. Frames arriving
/// before the acknowledgement are discarded.
async fn wait_for_setup_ack(read: &mut SplitStream<WsStream>) -> Result<()> {
    let wait = async {
        loop {
            let frame = read.next().await.context("stream closed during setup")?;
            let text = match frame.context("socket error during setup")? {
                Message::Text(text) => text,
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("ignoring non-utf8 binary frame during setup");
                        continue;
                    }
                },
                Message::Close(_) => anyhow::bail!("stream closed during setup"),
                _ => continue,
            };
            match parse_server_frame(&text) {
                Ok(events) => {
                    if events
                        .iter()
                        .any(|e| matches!(e, ServerEvent::SetupComplete))
                    {
                        if events.len() > 1 {
                            warn!(
                                "discarding {} events bundled with the setup acknowledgement",
                                events.len() - 1
                            );
                        }
                        return Ok(());
                    }
                    warn!("discarding frame received before setup acknowledgement");
                }
                Err(e) => warn!("unparseable frame during setup: {e}"),
            }
        }
    };

    match timeout(SETUP_TIMEOUT, wait).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("timed out waiting for setup acknowledgement"),
    }
}

async fn run_writer(
    mut write: SplitSink<WsStream, Message>,
    mut outbound: mpsc::Receiver<MediaChunk>,
) {
    while let Some(chunk) = outbound.recv().await {
        let message = RealtimeInputMessage {
            realtime_input: RealtimeInput {
                media_chunks: vec![chunk],
            },
        };
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("failed to serialize media chunk: {e}");
                continue;
            }
        };
        if let Err(e) = write.send(Message::Text(json)).await {
            warn!("live socket write failed: {e}");
            break;
        }
    }
    let _ = write.send(Message::Close(None)).await;
    debug!("live writer stopped");
}

async fn run_reader(mut read: SplitStream<WsStream>, events: mpsc::Sender<ServerEvent>) {
    while let Some(frame) = read.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!("ignoring non-utf8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                let _ = events
                    .send(ServerEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
        };
        match parse_server_frame(&text) {
            Ok(parsed) => {
                for event in parsed {
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => warn!("unparseable live frame: {e}"),
        }
    }
    let _ = events.send(ServerEvent::Closed).await;
    debug!("live reader stopped");
}
