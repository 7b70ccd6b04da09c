use std::sync::Arc;

use minefield_common::{
    models::{Cell, Difficulty, GameSnapshot, GameStatus, Pos},
    protocol::{ClientMessage, ServerMessage},
};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{MinefieldClient, MinefieldWebSocket, Result};

/// Events emitted while mirroring a server-hosted game
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Cells changed on the board
    BoardUpdated { changed_positions: Vec<Pos> },
    /// Game reached a terminal state
    StatusChanged { status: GameStatus },
    /// Game was initialized or restarted
    GameInitialized { difficulty: Difficulty },
    ConnectionLost,
}

/// Folds a server message into the mirrored snapshot and reports what changed.
/// Updates that arrive before the initial snapshot are dropped.
pub fn apply_server_message(
    state: &mut Option<GameSnapshot>,
    message: ServerMessage,
) -> Vec<GameEvent> {
    match message {
        ServerMessage::Init { snapshot } => {
            let difficulty = snapshot.difficulty;
            *state = Some(snapshot);
            vec![GameEvent::GameInitialized { difficulty }]
        }
        ServerMessage::Update {
            updates,
            score,
            flags_left,
            status,
        } => {
            let Some(snapshot) = state.as_mut() else {
                warn!("Dropping update received before game initialization");
                return Vec::new();
            };

            let old_status = snapshot.status;
            let mut changed_positions = Vec::with_capacity(updates.len());
            let mut revealed_any = false;
            for update in updates {
                if let Some(cell) = snapshot
                    .field
                    .get_mut(update.pos.y)
                    .and_then(|row| row.get_mut(update.pos.x))
                {
                    *cell = update.value;
                    revealed_any |= matches!(cell, Cell::Revealed { .. } | Cell::Mine);
                    changed_positions.push(update.pos);
                }
            }
            snapshot.score = score;
            snapshot.flags_left = flags_left;
            snapshot.status = status;
            snapshot.is_first_click &= !revealed_any;

            let mut events = Vec::new();
            if !changed_positions.is_empty() {
                events.push(GameEvent::BoardUpdated { changed_positions });
            }
            if status != old_status {
                events.push(GameEvent::StatusChanged { status });
            }
            events
        }
    }
}

struct ConnectionState {
    websocket_sender: mpsc::UnboundedSender<ClientMessage>,
    game_id: String,
    background_task: JoinHandle<()>,
}

impl ConnectionState {
    fn send_message(&self, message: ClientMessage) -> Result<()> {
        self.websocket_sender
            .send(message)
            .map_err(|_| "WebSocket sender closed")?;
        Ok(())
    }

    async fn abort_and_wait_background_task(self) {
        self.background_task.abort();
        let _ = self.background_task.await;
    }
}

/// Server-hosted game client that mirrors the snapshot the server pushes
pub struct RemoteGame {
    client: MinefieldClient,
    connection_state: Arc<RwLock<Option<ConnectionState>>>,
    event_sender: Arc<RwLock<Option<mpsc::UnboundedSender<GameEvent>>>>,
    state: Arc<RwLock<Option<GameSnapshot>>>,
}

impl RemoteGame {
    pub fn new(server_url: &str) -> Result<Self> {
        let client = MinefieldClient::new(server_url)?;
        Ok(Self {
            client,
            connection_state: Arc::new(RwLock::new(None)),
            event_sender: Arc::new(RwLock::new(None)),
            state: Arc::new(RwLock::new(None)),
        })
    }

    pub fn client(&self) -> &MinefieldClient {
        &self.client
    }

    /// Subscribe to game events. Replaces any previous subscriber.
    pub async fn subscribe_to_events(&self) -> mpsc::UnboundedReceiver<GameEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.event_sender.write().await = Some(sender);
        receiver
    }

    /// Create a game on the server with the given difficulty preset and join it
    pub async fn start_game(&self, difficulty: usize) -> Result<()> {
        let game_id = self.client.create_game(difficulty).await?;
        info!("Created game with ID: {}", game_id);

        self.join_game(game_id).await
    }

    pub async fn join_game(&self, game_id: String) -> Result<()> {
        info!("Joining game with ID: {}", game_id);

        let mut conn_state = self.connection_state.write().await;
        if let Some(existing_conn) = conn_state.take() {
            existing_conn.abort_and_wait_background_task().await;
        }
        self.state.write().await.take();

        let ws_url = self.client.websocket_url(&game_id)?;
        let websocket = MinefieldWebSocket::connect(&ws_url).await?;
        let websocket_sender = websocket.get_sender();

        let background_task = self.start_background_listener(websocket);

        *conn_state = Some(ConnectionState {
            websocket_sender,
            game_id,
            background_task,
        });

        Ok(())
    }

    async fn send_client_message(&self, message: ClientMessage) -> Result<()> {
        match &*self.connection_state.read().await {
            Some(conn) => conn.send_message(message),
            None => Err("Not connected to a game. Call start_game() first.".into()),
        }
    }

    pub async fn reveal(&self, pos: Pos) -> Result<()> {
        debug!("Revealing cell at ({}, {})", pos.x, pos.y);
        self.send_client_message(ClientMessage::Reveal { pos }).await
    }

    pub async fn flag(&self, pos: Pos) -> Result<()> {
        debug!("Flagging cell at ({}, {})", pos.x, pos.y);
        self.send_client_message(ClientMessage::Flag { pos }).await
    }

    pub async fn restart(&self, difficulty: usize) -> Result<()> {
        info!("Restarting game with difficulty preset {}", difficulty);
        self.send_client_message(ClientMessage::Restart { difficulty })
            .await
    }

    pub async fn get_state(&self) -> Option<GameSnapshot> {
        self.state.read().await.clone()
    }

    pub async fn get_game_id(&self) -> Option<String> {
        let conn_state = self.connection_state.read().await;
        conn_state.as_ref().map(|conn| conn.game_id.clone())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection_state.read().await.is_some()
    }

    pub async fn disconnect(&self) -> Result<()> {
        if let Some(conn) = self.connection_state.write().await.take() {
            conn.abort_and_wait_background_task().await;
        }
        *self.event_sender.write().await = None;
        *self.state.write().await = None;

        info!("Disconnected from game");
        Ok(())
    }

    fn start_background_listener(&self, mut websocket: MinefieldWebSocket) -> JoinHandle<()> {
        let state = self.state.clone();
        let event_sender = self.event_sender.clone();

        tokio::spawn(async move {
            loop {
                let message = match websocket.receive_message().await {
                    Ok(Some(message)) => message,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Error receiving WebSocket message: {}", e);
                        break;
                    }
                };

                let events = apply_server_message(&mut *state.write().await, message);
                if let Some(sender) = &*event_sender.read().await {
                    for event in events {
                        let _ = sender.send(event);
                    }
                }
            }

            if let Some(sender) = &*event_sender.read().await {
                let _ = sender.send(GameEvent::ConnectionLost);
            }
        })
    }
}
