//! Minefield Client Library
//!
//! Talks to the minefield score service over HTTP and WebSocket, and can run
//! the engine locally while the service only keeps the high score.
//!
//! ## Usage
//!
//! ### Local play
//!
//! `LocalGame` owns the session and consults a `ScoreService` for the
//! difficulty preset and the high score. Score service failures are logged and
//! never interrupt play:
//!
//! ```rust,no_run
//! use minefield_client::{LocalGame, MinefieldClient, Pos};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = MinefieldClient::new("http://localhost:8000")?;
//!     let mut game = LocalGame::new(client);
//!
//!     game.start(0).await?;
//!     game.reveal(Pos { x: 4, y: 4 }).await?;
//!     game.toggle_flag(Pos { x: 0, y: 0 })?;
//!
//!     println!("High score: {}", game.high_score());
//!     Ok(())
//! }
//! ```
//!
//! ### Server-hosted play
//!
//! `RemoteGame` creates a session on the server and mirrors the snapshots it
//! pushes over the WebSocket:
//!
//! ```rust,no_run
//! use minefield_client::{Pos, RemoteGame};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let game = RemoteGame::new("http://localhost:8000")?;
//!     game.start_game(0).await?;
//!     game.reveal(Pos { x: 0, y: 0 }).await?;
//!
//!     if let Some(snapshot) = game.get_state().await {
//!         println!("Status: {:?}, score: {}", snapshot.status, snapshot.score);
//!     }
//!
//!     game.disconnect().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod game;
mod local;
mod score;
mod websocket;

pub use client::MinefieldClient;
pub use game::{GameEvent, RemoteGame, apply_server_message};
pub use local::LocalGame;
pub use score::ScoreService;
pub use websocket::{MinefieldWebSocket, parse_server_message};

// Re-export common types for convenience
pub use minefield_common::{models::*, protocol::*};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
