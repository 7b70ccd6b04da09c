use std::time::Duration;

use tokio::time;
use tracing::{debug, info};

use crate::{config::env_or, logic::Games};

pub async fn start_cleanup_task(games: Games) {
    let cleanup_interval_secs: u64 = env_or("CLEANUP_INTERVAL_SECONDS", 60);
    let inactive_timeout_secs: u64 = env_or("INACTIVE_GAME_TIMEOUT_SECONDS", 600);

    let mut interval = time::interval(Duration::from_secs(cleanup_interval_secs.max(1)));

    info!(
        "Started game cleanup task: checking every {}s, inactive timeout: {}s",
        cleanup_interval_secs, inactive_timeout_secs
    );

    loop {
        interval.tick().await;
        cleanup_games(&games, inactive_timeout_secs);
    }
}

pub fn cleanup_games(games: &Games, inactive_timeout_secs: u64) -> usize {
    let mut games_to_remove = Vec::new();

    for entry in games.iter() {
        // Sessions locked by a request in flight are skipped until next tick.
        if let Ok(game) = entry.value().try_lock()
            && game.should_cleanup(inactive_timeout_secs)
        {
            games_to_remove.push(entry.key().clone());
        }
    }

    let removed_count = games_to_remove.len();
    for game_id in games_to_remove {
        games.remove(&game_id);
        debug!("Cleaned up game: {}", game_id);
    }

    if removed_count > 0 {
        info!("Cleaned up {} inactive games", removed_count);
    }
    removed_count
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dashmap::DashMap;
    use minefield_engine::BEGINNER;
    use tokio::sync::Mutex;

    use super::*;
    use crate::logic::Game;

    #[test]
    fn idle_games_without_connections_are_removed() {
        let games: Games = Arc::new(DashMap::new());
        games.insert("abc".to_string(), Arc::new(Mutex::new(Game::new(BEGINNER))));

        assert_eq!(cleanup_games(&games, 3600), 0);
        assert_eq!(games.len(), 1);

        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(cleanup_games(&games, 0), 1);
        assert!(games.is_empty());
    }
}
