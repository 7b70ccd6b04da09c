use std::{collections::HashMap, sync::Arc, time::Instant};

use dashmap::DashMap;
use rocket::futures::{SinkExt, future::join_all, stream::SplitSink};
use rocket_ws::{Message, stream::DuplexStream};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use minefield_common::{
    models::{Difficulty, GameSnapshot, Pos},
    protocol::{CellUpdate, ServerMessage},
};
use minefield_engine::{EngineError, FlagOutcome, RevealOutcome, RevealResult, Session};

pub type Games = Arc<DashMap<String, Arc<Mutex<Game>>>>;

/// A server-hosted session plus the websocket subscribers watching it.
pub struct Game {
    session: Session,
    streams: HashMap<Uuid, SplitSink<DuplexStream, Message>>,
    last_activity: Instant,
}

async fn send(stream: &mut SplitSink<DuplexStream, Message>, message: &ServerMessage) {
    if let Ok(text) = serde_json::to_string(message) {
        let _ = stream.send(Message::Text(text)).await;
    }
}

async fn broadcast(
    streams: &mut HashMap<Uuid, SplitSink<DuplexStream, Message>>,
    message: &ServerMessage,
) {
    let futures: Vec<_> = streams
        .iter_mut()
        .map(|(_, stream)| send(stream, message))
        .collect();

    join_all(futures).await;
}

impl Game {
    #[instrument(level = "trace")]
    pub fn new(difficulty: Difficulty) -> Self {
        info!(
            "Creating new game: {}x{} with {} mines",
            difficulty.width, difficulty.height, difficulty.mines
        );
        Self::from_session(Session::new(difficulty, &mut rand::rng()))
    }

    /// Hosts an already prepared session, such as one with a fixed layout.
    pub fn from_session(session: Session) -> Self {
        Self {
            session,
            streams: HashMap::new(),
            last_activity: Instant::now(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.session.snapshot()
    }

    fn init_message(&self) -> ServerMessage {
        ServerMessage::Init {
            snapshot: self.session.snapshot(),
        }
    }

    fn update_message(&self, updates: Vec<CellUpdate>) -> ServerMessage {
        ServerMessage::Update {
            updates,
            score: self.session.score(),
            flags_left: self.session.flags_left(),
            status: self.session.status(),
        }
    }

    fn cell_update(&self, pos: Pos) -> Option<CellUpdate> {
        self.session
            .cell_view(pos)
            .map(|value| CellUpdate { pos, value })
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn restart(&mut self, difficulty: Difficulty) {
        info!(
            "Restarting game: {}x{} with {} mines",
            difficulty.width, difficulty.height, difficulty.mines
        );
        self.session = Session::new(difficulty, &mut rand::rng());
        self.last_activity = Instant::now();
        let message = self.init_message();
        broadcast(&mut self.streams, &message).await;
        info!(
            "Game restarted and broadcasted to {} connections",
            self.streams.len()
        );
    }

    #[instrument(level = "trace", skip(self, stream))]
    pub async fn add_stream(&mut self, mut stream: SplitSink<DuplexStream, Message>) -> Uuid {
        let id = Uuid::new_v4();
        debug!("Adding stream {} to game", id);
        send(&mut stream, &self.init_message()).await;
        self.streams.insert(id, stream);
        self.last_activity = Instant::now();
        info!(
            "Stream {} added, total connections: {}",
            id,
            self.streams.len()
        );
        id
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn remove_stream(&mut self, id: &Uuid) {
        if self.streams.remove(id).is_some() {
            info!(
                "Stream {} removed, remaining connections: {}",
                id,
                self.streams.len()
            );
        } else {
            warn!("Attempted to remove non-existent stream: {}", id);
        }
        self.last_activity = Instant::now()
    }

    pub fn has_active_connections(&self) -> bool {
        !self.streams.is_empty()
    }

    pub fn should_cleanup(&self, inactive_timeout_secs: u64) -> bool {
        if self.has_active_connections() {
            return false;
        }

        let elapsed = Instant::now().duration_since(self.last_activity).as_secs();
        elapsed > inactive_timeout_secs
    }

    #[instrument(level = "trace", skip(self), fields(x = pos.x, y = pos.y))]
    pub async fn flag(&mut self, pos: Pos) -> Result<FlagOutcome, EngineError> {
        let outcome = self.session.toggle_flag(pos)?;
        self.last_activity = Instant::now();

        match outcome {
            FlagOutcome::NoChange => {
                debug!("Flag at ({}, {}) changed nothing", pos.x, pos.y);
            }
            FlagOutcome::Flagged | FlagOutcome::Unflagged => {
                debug!("Cell ({}, {}) {:?}", pos.x, pos.y, outcome);
                let message = self.update_message(self.cell_update(pos).into_iter().collect());
                broadcast(&mut self.streams, &message).await;
            }
        }

        Ok(outcome)
    }

    #[instrument(level = "trace", skip(self), fields(x = pos.x, y = pos.y))]
    pub async fn reveal(&mut self, pos: Pos) -> Result<RevealResult, EngineError> {
        let result = self.session.reveal_cell(pos)?;
        self.last_activity = Instant::now();

        if !result.outcome.has_update() {
            debug!("Reveal at ({}, {}) changed nothing", pos.x, pos.y);
            return Ok(result);
        }

        match result.outcome {
            RevealOutcome::HitMine => warn!("Player hit mine at ({}, {}) - game over!", pos.x, pos.y),
            RevealOutcome::Won => info!("Game won! All safe cells revealed."),
            _ => debug!("Revealed {} cells, game continues", result.revealed.len()),
        }

        let message = self.reveal_message(pos, &result);
        broadcast(&mut self.streams, &message).await;
        Ok(result)
    }

    /// Update for a reveal at `pos`. A loss also carries every other mine.
    fn reveal_message(&self, pos: Pos, result: &RevealResult) -> ServerMessage {
        let mut updates: Vec<CellUpdate> = result
            .revealed
            .iter()
            .filter_map(|&pos| self.cell_update(pos))
            .collect();

        if result.outcome == RevealOutcome::HitMine {
            let hidden_mines: Vec<Pos> = self
                .session
                .grid()
                .mine_positions()
                .filter(|mine| *mine != pos)
                .collect();
            info!("Game ended with loss, exposing {} mines", hidden_mines.len());
            updates.extend(
                hidden_mines
                    .into_iter()
                    .filter_map(|mine| self.cell_update(mine)),
            );
        }

        self.update_message(updates)
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn update_score(&mut self, delta: u64) -> u64 {
        let score = self.session.update_score(delta);
        self.last_activity = Instant::now();
        let message = self.update_message(Vec::new());
        broadcast(&mut self.streams, &message).await;
        score
    }
}
