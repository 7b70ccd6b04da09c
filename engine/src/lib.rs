//! Minefield engine: grid construction, mine placement, flood-fill reveal,
//! flag toggling and win/loss detection for one game session.
//!
//! ```
//! use minefield_common::models::Pos;
//! use minefield_engine::{Session, preset};
//!
//! let difficulty = preset(0).unwrap();
//! let mut session = Session::new(difficulty, &mut rand::rng());
//! let result = session.reveal_cell(Pos::new(4, 4)).unwrap();
//! assert!(!result.revealed.is_empty());
//! ```

mod difficulty;
mod error;
mod grid;
mod session;

pub use difficulty::*;
pub use error::*;
pub use grid::*;
pub use session::*;
