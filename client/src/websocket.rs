use futures_util::{SinkExt, StreamExt, stream::SplitStream};
use minefield_common::protocol::{ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Decodes one text frame from the server. Frames that are not a known
/// server message are logged and dropped.
pub fn parse_server_message(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Skipping malformed server frame ({}): {}", e, text);
            None
        }
    }
}

/// Live connection to the websocket of one hosted game. Outgoing actions go
/// through a channel drained by a writer task; incoming frames are read on
/// demand with `receive_message`.
pub struct MinefieldWebSocket {
    actions: mpsc::UnboundedSender<ClientMessage>,
    frames: SplitStream<WsStream>,
    writer: JoinHandle<()>,
}

impl MinefieldWebSocket {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Opening game websocket at {}", url);
        let (ws_stream, _) = connect_async(url).await?;
        let (mut sink, frames) = ws_stream.split();
        let (actions, mut pending) = mpsc::unbounded_channel::<ClientMessage>();

        let writer = tokio::spawn(async move {
            while let Some(action) = pending.recv().await {
                let Ok(json) = serde_json::to_string(&action) else {
                    warn!("Dropping unserializable action {:?}", action);
                    continue;
                };
                debug!("-> {}", json);
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    warn!("Websocket write failed, stopping writer: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        Ok(Self {
            actions,
            frames,
            writer,
        })
    }

    /// Cloneable handle for queueing actions from other tasks.
    pub fn get_sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.actions.clone()
    }

    /// False once the writer has stopped, after a failed write or `close`.
    pub fn is_open(&self) -> bool {
        !self.writer.is_finished()
    }

    pub async fn send_message(&self, message: ClientMessage) -> Result<()> {
        if !self.is_open() {
            return Err("Websocket writer has stopped".into());
        }
        self.actions
            .send(message)
            .map_err(|_| "Websocket action channel closed")?;
        Ok(())
    }

    /// Next decodable server message, or `None` once the server closes the
    /// connection. Malformed frames do not end the stream.
    pub async fn receive_message(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(frame) = self.frames.next().await {
            match frame? {
                Message::Text(text) => {
                    debug!("<- {}", text);
                    if let Some(message) = parse_server_message(&text) {
                        return Ok(Some(message));
                    }
                }
                Message::Close(frame) => {
                    info!("Server closed the game websocket: {:?}", frame);
                    return Ok(None);
                }
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(self) -> Result<()> {
        drop(self.actions);
        let _ = self.writer.await;
        Ok(())
    }
}
