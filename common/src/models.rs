use serde::{Deserialize, Serialize};

/// What a player is allowed to see of a single cell.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "state")]
pub enum Cell {
    #[serde(rename = "hidden")]
    Hidden,
    #[serde(rename = "flagged")]
    Flagged,
    #[serde(rename = "revealed")]
    Revealed { adjacent: u8 },
    #[serde(rename = "mine")]
    Mine,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Difficulty {
    pub width: usize,
    pub height: usize,
    pub mines: usize,
    pub base_points: u64,
}

impl Difficulty {
    /// Saturates instead of overflowing for absurd dimensions.
    pub const fn total_cells(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    pub const fn safe_cells(&self) -> usize {
        self.total_cells().saturating_sub(self.mines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    #[default]
    InProgress,
    Won,
    Lost,
}

impl GameStatus {
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub difficulty: Difficulty,
    pub score: u64,
    pub flags_left: i64,
    pub status: GameStatus,
    pub is_first_click: bool,
    pub started_at_ms: u64,
    pub field: Vec<Vec<Cell>>,
}

impl GameSnapshot {
    pub fn is_game_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn cell(&self, pos: Pos) -> Option<Cell> {
        self.field.get(pos.y)?.get(pos.x).copied()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NewGameRequest {
    /// Index into the server's difficulty presets.
    pub difficulty: usize,
}

#[derive(Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub score: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighScoreResponse {
    pub high_score: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub delta: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealResponse {
    /// Number of cells this reveal uncovered, flood-fill included.
    pub revealed: usize,
    pub status: GameStatus,
    pub score: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagResponse {
    pub flagged: bool,
    pub flags_left: i64,
}
