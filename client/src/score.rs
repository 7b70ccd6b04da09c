use minefield_common::models::Difficulty;

use crate::{MinefieldClient, Result};

/// The remote collaborator a locally played game consults for presets and the
/// high score.
pub trait ScoreService {
    fn difficulty(&self, index: usize) -> impl Future<Output = Result<Difficulty>> + Send;

    fn high_score(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Returns the high score after considering `candidate`.
    fn update_high_score(&self, candidate: u64) -> impl Future<Output = Result<u64>> + Send;
}

impl ScoreService for MinefieldClient {
    async fn difficulty(&self, index: usize) -> Result<Difficulty> {
        MinefieldClient::difficulty(self, index).await
    }

    async fn high_score(&self) -> Result<u64> {
        MinefieldClient::high_score(self).await
    }

    async fn update_high_score(&self, candidate: u64) -> Result<u64> {
        MinefieldClient::update_high_score(self, candidate).await
    }
}
