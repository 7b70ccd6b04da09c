use minefield_common::models::{
    CreateResponse, Difficulty, FlagResponse, GameSnapshot, HighScoreResponse, NewGameRequest,
    Pos, RevealResponse, ScoreDelta, ScoreResponse, ScoreSubmission,
};
use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::Result;

/// HTTP client for the minefield score service
pub struct MinefieldClient {
    client: Client,
    base_url: Url,
}

impl MinefieldClient {
    /// Create a new client connecting to the specified server URL
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = Client::new();

        Ok(Self { client, base_url })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path)?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(format!("GET {} failed: {}", path, response.status()).into());
        }
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path)?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;

        if !response.status().is_success() {
            return Err(format!("POST {} failed: {}", path, response.status()).into());
        }
        Ok(response.json().await?)
    }

    /// Look up a difficulty preset by index
    pub async fn difficulty(&self, index: usize) -> Result<Difficulty> {
        self.get_json(&format!("/difficulty/{index}")).await
    }

    /// Current high score
    pub async fn high_score(&self) -> Result<u64> {
        let response: HighScoreResponse = self.get_json("/highscore").await?;
        Ok(response.high_score)
    }

    /// Submit a candidate score, returns the resulting high score
    pub async fn update_high_score(&self, candidate: u64) -> Result<u64> {
        let response: HighScoreResponse = self
            .post_json("/highscore", &ScoreSubmission { score: candidate })
            .await?;
        Ok(response.high_score)
    }

    /// Create a server-hosted game with the given difficulty preset.
    /// Returns the game ID that can be used to connect via WebSocket
    pub async fn create_game(&self, difficulty: usize) -> Result<String> {
        let response: CreateResponse = self
            .post_json("/games", &NewGameRequest { difficulty })
            .await?;
        Ok(response.id)
    }

    /// Snapshot of a server-hosted game, `None` if the server does not know it
    pub async fn game_state(&self, game_id: &str) -> Result<Option<GameSnapshot>> {
        let url = self.base_url.join(&format!("/games/{game_id}"))?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(format!("Failed to fetch game {game_id}: {status}").into()),
        }
    }

    pub async fn reveal(&self, game_id: &str, pos: Pos) -> Result<RevealResponse> {
        self.post_json(&format!("/games/{game_id}/reveal"), &pos)
            .await
    }

    pub async fn toggle_flag(&self, game_id: &str, pos: Pos) -> Result<FlagResponse> {
        self.post_json(&format!("/games/{game_id}/flag"), &pos).await
    }

    pub async fn update_score(&self, game_id: &str, delta: u64) -> Result<u64> {
        let response: ScoreResponse = self
            .post_json(&format!("/games/{game_id}/score"), &ScoreDelta { delta })
            .await?;
        Ok(response.score)
    }

    /// Get the WebSocket URL for a game
    pub fn websocket_url(&self, game_id: &str) -> Result<String> {
        let mut ws_url = self.base_url.clone();
        ws_url
            .set_scheme(match self.base_url.scheme() {
                "https" => "wss",
                _ => "ws",
            })
            .map_err(|_| "Failed to set WebSocket scheme")?;
        ws_url.set_path("/ws");
        ws_url.set_query(Some(&format!("id={}", game_id)));

        Ok(ws_url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_follows_http_scheme() {
        let client = MinefieldClient::new("https://mines.example.com/api").unwrap();

        assert_eq!(
            client.websocket_url("abc12").unwrap(),
            "wss://mines.example.com/ws?id=abc12"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(MinefieldClient::new("not a url").is_err());
    }
}
