use minefield_common::models::Pos;
use minefield_engine::{
    FlagOutcome, RevealOutcome, RevealResult, Session, check_difficulty, preset,
};
use tracing::{debug, info, warn};

use crate::{Result, ScoreService};

/// A game played with the engine running client-side. The score service is
/// only asked for presets and the high score; when it fails the failure is
/// logged and play continues with the last known high score.
pub struct LocalGame<S> {
    scores: S,
    session: Option<Session>,
    high_score: u64,
}

impl<S: ScoreService> LocalGame<S> {
    pub fn new(scores: S) -> Self {
        Self {
            scores,
            session: None,
            high_score: 0,
        }
    }

    /// Start a new game with the given difficulty preset, replacing any game
    /// in progress. A difficulty the service cannot provide, or one outside
    /// the engine's limits, is replaced by the local preset.
    pub async fn start(&mut self, difficulty_index: usize) -> Result<()> {
        let served = self
            .scores
            .difficulty(difficulty_index)
            .await
            .and_then(|difficulty| check_difficulty(difficulty).map_err(Into::into));
        let difficulty = match served {
            Ok(difficulty) => difficulty,
            Err(e) => {
                warn!(
                    "Score service failed to provide difficulty {}: {} - using local preset",
                    difficulty_index, e
                );
                preset(difficulty_index)
                    .ok_or_else(|| format!("Unknown difficulty preset {difficulty_index}"))?
            }
        };

        let session = Session::new(difficulty, &mut rand::rng());
        self.start_session(session).await;
        Ok(())
    }

    /// Start playing a prepared session.
    pub async fn start_session(&mut self, session: Session) {
        info!(
            "Starting local game: {}x{} with {} mines",
            session.difficulty().width,
            session.difficulty().height,
            session.difficulty().mines
        );
        self.session = Some(session);

        match self.scores.high_score().await {
            Ok(high_score) => self.high_score = high_score,
            Err(e) => warn!("Failed to fetch high score: {} - keeping {}", e, self.high_score),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Last high score the service reported.
    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    pub async fn reveal(&mut self, pos: Pos) -> Result<RevealResult> {
        let session = self.session.as_mut().ok_or("No game in progress")?;
        let result = session.reveal_cell(pos)?;
        let score = session.score();

        match result.outcome {
            RevealOutcome::Won => {
                info!("You win! Final score {}", score);
                self.submit_score(score).await;
            }
            RevealOutcome::HitMine => info!("Game over! Final score {}", score),
            RevealOutcome::Revealed => debug!("Revealed {} cells", result.revealed.len()),
            RevealOutcome::NoChange => {}
        }

        Ok(result)
    }

    pub fn toggle_flag(&mut self, pos: Pos) -> Result<FlagOutcome> {
        let session = self.session.as_mut().ok_or("No game in progress")?;
        Ok(session.toggle_flag(pos)?)
    }

    async fn submit_score(&mut self, score: u64) {
        match self.scores.update_high_score(score).await {
            Ok(high_score) => {
                debug!("High score is now {}", high_score);
                self.high_score = high_score;
            }
            Err(e) => {
                warn!("Failed to submit score {}: {} - keeping local high score", score, e);
                self.high_score = self.high_score.max(score);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use minefield_common::models::{Difficulty, GameStatus};
    use minefield_engine::{BEGINNER, EXPERT, INTERMEDIATE};

    use super::*;

    #[derive(Default)]
    struct MemoryScores {
        best: Mutex<u64>,
    }

    impl ScoreService for MemoryScores {
        async fn difficulty(&self, index: usize) -> Result<Difficulty> {
            preset(index).ok_or_else(|| "unknown preset".into())
        }

        async fn high_score(&self) -> Result<u64> {
            Ok(*self.best.lock().unwrap())
        }

        async fn update_high_score(&self, candidate: u64) -> Result<u64> {
            let mut best = self.best.lock().unwrap();
            *best = (*best).max(candidate);
            Ok(*best)
        }
    }

    struct FailingScores;

    /// Serves boards far outside what the engine accepts.
    struct OversizedScores;

    impl ScoreService for OversizedScores {
        async fn difficulty(&self, _index: usize) -> Result<Difficulty> {
            Ok(Difficulty {
                width: usize::MAX,
                height: 2,
                mines: 10,
                base_points: 0,
            })
        }

        async fn high_score(&self) -> Result<u64> {
            Ok(4)
        }

        async fn update_high_score(&self, candidate: u64) -> Result<u64> {
            Ok(candidate)
        }
    }

    impl ScoreService for FailingScores {
        async fn difficulty(&self, _index: usize) -> Result<Difficulty> {
            Err("service unavailable".into())
        }

        async fn high_score(&self) -> Result<u64> {
            Err("service unavailable".into())
        }

        async fn update_high_score(&self, _candidate: u64) -> Result<u64> {
            Err("service unavailable".into())
        }
    }

    fn winnable_session() -> Session {
        let difficulty = Difficulty {
            width: 3,
            height: 3,
            mines: 1,
            base_points: 10,
        };
        Session::with_mines(difficulty, &[Pos::new(2, 2)]).unwrap()
    }

    #[tokio::test]
    async fn start_uses_the_service_preset() {
        let mut game = LocalGame::new(MemoryScores::default());

        game.start(2).await.unwrap();

        assert_eq!(game.session().unwrap().difficulty(), EXPERT);
    }

    #[tokio::test]
    async fn start_falls_back_to_local_preset_when_service_fails() {
        let mut game = LocalGame::new(FailingScores);

        game.start(0).await.unwrap();

        assert_eq!(game.session().unwrap().difficulty(), BEGINNER);
        assert_eq!(game.high_score(), 0);
    }

    #[tokio::test]
    async fn out_of_range_service_difficulty_falls_back_to_local_preset() {
        let mut game = LocalGame::new(OversizedScores);

        game.start(1).await.unwrap();

        assert_eq!(game.session().unwrap().difficulty(), INTERMEDIATE);
        assert_eq!(game.high_score(), 4);
    }

    #[tokio::test]
    async fn unknown_preset_without_service_is_an_error() {
        let mut game = LocalGame::new(FailingScores);

        assert!(game.start(7).await.is_err());
        assert!(game.session().is_none());
    }

    #[tokio::test]
    async fn win_submits_score() {
        let scores = MemoryScores::default();
        *scores.best.lock().unwrap() = 3;
        let mut game = LocalGame::new(scores);
        game.start_session(winnable_session()).await;
        assert_eq!(game.high_score(), 3);

        let result = game.reveal(Pos::new(0, 0)).await.unwrap();

        assert_eq!(result.outcome, RevealOutcome::Won);
        assert_eq!(game.high_score(), 8);
        assert_eq!(*game.scores.best.lock().unwrap(), 8);
    }

    #[tokio::test]
    async fn failing_service_never_interrupts_play() {
        let mut game = LocalGame::new(FailingScores);
        game.start_session(winnable_session()).await;

        assert_eq!(
            game.toggle_flag(Pos::new(2, 2)).unwrap(),
            FlagOutcome::Flagged
        );
        let result = game.reveal(Pos::new(0, 0)).await.unwrap();

        assert_eq!(result.outcome, RevealOutcome::Won);
        assert_eq!(game.session().unwrap().status(), GameStatus::Won);
        assert_eq!(game.high_score(), 8);
    }

    #[tokio::test]
    async fn moves_without_a_game_are_errors() {
        let mut game = LocalGame::new(MemoryScores::default());

        assert!(game.reveal(Pos::new(0, 0)).await.is_err());
        assert!(game.toggle_flag(Pos::new(0, 0)).is_err());
    }
}
