use serde::{Deserialize, Serialize};

use crate::models::{Cell, GameSnapshot, GameStatus, Pos};

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "action")]
pub enum ClientMessage {
    #[serde(rename = "reveal")]
    Reveal { pos: Pos },
    #[serde(rename = "flag")]
    Flag { pos: Pos },
    #[serde(rename = "restart")]
    Restart { difficulty: usize },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub pos: Pos,
    pub value: Cell,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "init")]
    Init { snapshot: GameSnapshot },
    #[serde(rename = "update")]
    Update {
        updates: Vec<CellUpdate>,
        score: u64,
        #[serde(rename = "flagsLeft")]
        flags_left: i64,
        status: GameStatus,
    },
}
