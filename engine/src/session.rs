use std::time::{SystemTime, UNIX_EPOCH};

use minefield_common::models::{self, Difficulty, GameSnapshot, GameStatus, Pos};
use rand::Rng;
use tracing::{debug, info, instrument};

use crate::{EngineError, Grid, Result, normalize};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealResult {
    pub outcome: RevealOutcome,
    /// Newly revealed positions, in reveal order.
    pub revealed: Vec<Pos>,
}

impl RevealResult {
    fn no_change() -> Self {
        Self {
            outcome: RevealOutcome::NoChange,
            revealed: Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    NoChange,
    Flagged,
    Unflagged,
}

/// One game from new-game to terminal outcome. Every mutation goes through
/// `&mut self`; the session is never shared between games.
#[derive(Debug, Clone)]
pub struct Session {
    grid: Grid,
    difficulty: Difficulty,
    score: u64,
    flags_left: i64,
    status: GameStatus,
    is_first_click: bool,
    started_at_ms: u64,
}

impl Session {
    /// Starts a session with mines placed at random.
    pub fn new<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Self {
        let difficulty = normalize(difficulty);
        let mut grid = Grid::new(difficulty.width, difficulty.height);
        grid.place_mines(difficulty.mines, rng);
        info!(
            "New session: {}x{} with {} mines",
            difficulty.width, difficulty.height, difficulty.mines
        );
        Self::from_grid(grid, difficulty)
    }

    /// Starts a session with a fixed mine layout. The difficulty's mine count
    /// is replaced by the number of distinct positions given.
    pub fn with_mines(difficulty: Difficulty, mines: &[Pos]) -> Result<Self> {
        let difficulty = normalize(difficulty);
        let mut grid = Grid::new(difficulty.width, difficulty.height);
        grid.place_mines_at(mines)?;
        Ok(Self::from_grid(grid, difficulty))
    }

    fn from_grid(grid: Grid, difficulty: Difficulty) -> Self {
        let difficulty = Difficulty {
            mines: grid.mine_count(),
            ..difficulty
        };
        Self {
            flags_left: difficulty.mines as i64,
            grid,
            difficulty,
            score: 0,
            status: GameStatus::InProgress,
            is_first_click: true,
            started_at_ms: now_ms(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Mines minus flags placed. Goes negative when the player over-flags.
    pub fn flags_left(&self) -> i64 {
        self.flags_left
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_game_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn is_first_click(&self) -> bool {
        self.is_first_click
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    #[instrument(level = "trace", skip(self), fields(x = pos.x, y = pos.y))]
    pub fn reveal_cell(&mut self, pos: Pos) -> Result<RevealResult> {
        let cell = *self
            .grid
            .get(pos)
            .ok_or(EngineError::OutOfBounds { x: pos.x, y: pos.y })?;

        if self.is_game_over() || cell.is_revealed || cell.is_flagged {
            debug!("Ignoring reveal at ({}, {})", pos.x, pos.y);
            return Ok(RevealResult::no_change());
        }

        let revealed = self.grid.reveal(pos)?;
        self.score = self.score.saturating_add(revealed.len() as u64);
        self.is_first_click = false;

        let outcome = if cell.is_mine {
            self.status = GameStatus::Lost;
            debug!("Mine hit at ({}, {})", pos.x, pos.y);
            RevealOutcome::HitMine
        } else if self.check_win_condition() {
            self.status = GameStatus::Won;
            debug!("All safe cells revealed");
            RevealOutcome::Won
        } else {
            RevealOutcome::Revealed
        };

        Ok(RevealResult { outcome, revealed })
    }

    #[instrument(level = "trace", skip(self), fields(x = pos.x, y = pos.y))]
    pub fn toggle_flag(&mut self, pos: Pos) -> Result<FlagOutcome> {
        if !self.grid.contains(pos) {
            return Err(EngineError::OutOfBounds { x: pos.x, y: pos.y });
        }
        if self.is_game_over() {
            return Ok(FlagOutcome::NoChange);
        }

        Ok(match self.grid.toggle_flag(pos)? {
            Some(true) => {
                self.flags_left -= 1;
                FlagOutcome::Flagged
            }
            Some(false) => {
                self.flags_left += 1;
                FlagOutcome::Unflagged
            }
            None => FlagOutcome::NoChange,
        })
    }

    /// True once every non-mine cell is revealed. Flags are not required.
    pub fn check_win_condition(&self) -> bool {
        self.grid.revealed_count() == self.difficulty.safe_cells()
    }

    pub fn update_score(&mut self, delta: u64) -> u64 {
        self.score = self.score.saturating_add(delta);
        self.score
    }

    /// Client view of a cell. Mines are exposed once the game is lost.
    pub fn cell_view(&self, pos: Pos) -> Option<models::Cell> {
        let expose = self.status == GameStatus::Lost;
        self.grid.get(pos).map(|cell| cell.view(expose))
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let expose = self.status == GameStatus::Lost;
        GameSnapshot {
            difficulty: self.difficulty,
            score: self.score,
            flags_left: self.flags_left,
            status: self.status,
            is_first_click: self.is_first_click,
            started_at_ms: self.started_at_ms,
            field: self
                .grid
                .rows()
                .map(|row| row.iter().map(|cell| cell.view(expose)).collect())
                .collect(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::BEGINNER;

    fn session(width: usize, height: usize, mines: &[(usize, usize)]) -> Session {
        let difficulty = Difficulty {
            width,
            height,
            mines: mines.len(),
            base_points: 0,
        };
        let mines: Vec<Pos> = mines.iter().map(|&(x, y)| Pos::new(x, y)).collect();
        Session::with_mines(difficulty, &mines).unwrap()
    }

    #[test]
    fn new_session_places_configured_mines() {
        let mut rng = StdRng::seed_from_u64(42);
        let session = Session::new(BEGINNER, &mut rng);

        assert_eq!(session.grid().mine_count(), 10);
        assert_eq!(session.flags_left(), 10);
        assert_eq!(session.status(), GameStatus::InProgress);
        assert!(session.is_first_click());
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn reveal_hits_mine_and_loses() {
        let mut session = session(2, 2, &[(0, 0)]);

        let result = session.reveal_cell(Pos::new(0, 0)).unwrap();

        assert_eq!(result.outcome, RevealOutcome::HitMine);
        assert_eq!(result.revealed, vec![Pos::new(0, 0)]);
        assert_eq!(session.status(), GameStatus::Lost);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn reveal_numbered_cell_does_not_cascade() {
        let mut session = session(3, 3, &[(0, 0)]);

        let result = session.reveal_cell(Pos::new(1, 1)).unwrap();

        assert_eq!(result.outcome, RevealOutcome::Revealed);
        assert_eq!(result.revealed, vec![Pos::new(1, 1)]);
        assert!(!session.is_first_click());
    }

    #[test]
    fn zero_cell_cascade_wins_single_mine_board() {
        let mut session = session(3, 3, &[(2, 2)]);

        let result = session.reveal_cell(Pos::new(0, 0)).unwrap();

        assert_eq!(result.outcome, RevealOutcome::Won);
        assert_eq!(result.revealed.len(), 8);
        assert_eq!(session.score(), 8);
        assert_eq!(
            session.cell_view(Pos::new(1, 1)),
            Some(models::Cell::Revealed { adjacent: 1 })
        );
        assert_eq!(session.cell_view(Pos::new(2, 2)), Some(models::Cell::Hidden));
    }

    #[test]
    fn beginner_cascade_covers_zero_neighbors() {
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut session = Session::new(BEGINNER, &mut rng);

            let Some(start) = (0..81)
                .map(|i| Pos::new(i % 9, i / 9))
                .find(|&pos| {
                    let cell = session.grid().get(pos).unwrap();
                    !cell.is_mine && cell.adjacent_mines == 0
                })
            else {
                continue;
            };

            let result = session.reveal_cell(start).unwrap();
            let revealed: HashSet<Pos> = result.revealed.iter().copied().collect();

            assert!(revealed.contains(&start));
            assert_eq!(revealed.len(), result.revealed.len());
            for neighbor in session.grid().neighbors(start) {
                assert!(!session.grid().get(neighbor).unwrap().is_mine);
                assert!(revealed.contains(&neighbor));
            }
            assert_ne!(session.status(), GameStatus::Lost);
        }
    }

    #[test]
    fn second_reveal_is_a_no_op() {
        let mut session = session(4, 4, &[(3, 3)]);
        session.reveal_cell(Pos::new(0, 3)).unwrap();
        let score = session.score();

        let result = session.reveal_cell(Pos::new(0, 3)).unwrap();

        assert_eq!(result.outcome, RevealOutcome::NoChange);
        assert!(result.revealed.is_empty());
        assert_eq!(session.score(), score);
    }

    #[test]
    fn flagged_cells_cannot_be_revealed() {
        let mut session = session(2, 1, &[(0, 0)]);
        session.toggle_flag(Pos::new(0, 0)).unwrap();

        let result = session.reveal_cell(Pos::new(0, 0)).unwrap();

        assert_eq!(result.outcome, RevealOutcome::NoChange);
        assert_eq!(session.status(), GameStatus::InProgress);
    }

    #[test]
    fn win_requires_every_safe_cell() {
        let mut session = session(3, 1, &[(1, 0)]);

        assert_eq!(
            session.reveal_cell(Pos::new(0, 0)).unwrap().outcome,
            RevealOutcome::Revealed
        );
        assert!(!session.check_win_condition());
        assert_eq!(
            session.reveal_cell(Pos::new(2, 0)).unwrap().outcome,
            RevealOutcome::Won
        );
        assert!(session.check_win_condition());
        assert_eq!(session.status(), GameStatus::Won);
    }

    #[test]
    fn finished_game_ignores_moves() {
        let mut session = session(3, 1, &[(1, 0)]);
        session.reveal_cell(Pos::new(1, 0)).unwrap();

        let result = session.reveal_cell(Pos::new(0, 0)).unwrap();
        assert_eq!(result.outcome, RevealOutcome::NoChange);
        assert_eq!(
            session.toggle_flag(Pos::new(2, 0)).unwrap(),
            FlagOutcome::NoChange
        );
        assert_eq!(session.status(), GameStatus::Lost);
        assert!(!session.check_win_condition());
    }

    #[test]
    fn toggling_flag_twice_restores_state() {
        let mut session = session(3, 3, &[(0, 0)]);
        let pos = Pos::new(2, 2);

        assert_eq!(session.toggle_flag(pos).unwrap(), FlagOutcome::Flagged);
        assert_eq!(session.flags_left(), 0);
        assert_eq!(session.cell_view(pos), Some(models::Cell::Flagged));

        assert_eq!(session.toggle_flag(pos).unwrap(), FlagOutcome::Unflagged);
        assert_eq!(session.flags_left(), 1);
        assert_eq!(session.cell_view(pos), Some(models::Cell::Hidden));
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn over_flagging_goes_negative() {
        let mut session = session(3, 3, &[(0, 0)]);

        session.toggle_flag(Pos::new(1, 1)).unwrap();
        session.toggle_flag(Pos::new(2, 2)).unwrap();

        assert_eq!(session.flags_left(), -1);
    }

    #[test]
    fn revealed_cells_cannot_be_flagged() {
        let mut session = session(3, 3, &[(0, 0)]);
        session.reveal_cell(Pos::new(1, 1)).unwrap();

        assert_eq!(
            session.toggle_flag(Pos::new(1, 1)).unwrap(),
            FlagOutcome::NoChange
        );
        assert_eq!(session.flags_left(), 1);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut session = session(2, 2, &[(0, 0)]);

        assert_eq!(
            session.reveal_cell(Pos::new(2, 0)).unwrap_err(),
            EngineError::OutOfBounds { x: 2, y: 0 }
        );
        assert!(session.toggle_flag(Pos::new(0, 9)).is_err());
    }

    #[test]
    fn snapshot_exposes_mines_only_after_loss() {
        let mut session = session(2, 1, &[(0, 0)]);
        let before = session.snapshot();
        assert_eq!(before.field, vec![vec![models::Cell::Hidden; 2]]);

        session.reveal_cell(Pos::new(0, 0)).unwrap();
        let after = session.snapshot();

        assert_eq!(after.status, GameStatus::Lost);
        assert_eq!(after.field[0][0], models::Cell::Mine);
        assert!(after.is_game_over());
    }

    #[test]
    fn update_score_accumulates() {
        let mut session = session(2, 1, &[(0, 0)]);

        assert_eq!(session.update_score(5), 5);
        assert_eq!(session.update_score(u64::MAX), u64::MAX);
    }
}
