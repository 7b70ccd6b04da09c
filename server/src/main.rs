use std::path::PathBuf;

use minefield_server::{
    build_rocket, cleanup::start_cleanup_task, config::env_or, logic::Games,
    scores::HighScoreStore,
};
use rocket::{
    Build, Rocket,
    fairing::{Fairing, Info, Kind},
};
use tracing::{info, warn};

struct CleanupFairing;

#[rocket::async_trait]
impl Fairing for CleanupFairing {
    fn info(&self) -> Info {
        Info {
            name: "Cleanup Task",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        if let Some(games) = rocket.state::<Games>() {
            info!("Starting cleanup task for game sessions");
            let games_for_cleanup = games.clone();
            tokio::spawn(async move {
                start_cleanup_task(games_for_cleanup).await;
            });
        } else {
            warn!("Failed to get games state for cleanup task");
        }
        Ok(rocket)
    }
}

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    tracing_subscriber::fmt::init();
    info!("Starting minefield score service");

    let high_score_file: String = env_or("HIGH_SCORE_FILE", String::new());
    let scores = if high_score_file.is_empty() {
        info!("HIGH_SCORE_FILE not set, keeping the high score in memory");
        HighScoreStore::in_memory()
    } else {
        HighScoreStore::with_file(PathBuf::from(high_score_file))
    };

    let rocket = build_rocket(scores).attach(CleanupFairing);

    info!("Endpoints: GET /difficulty/<index>, GET|POST /highscore, POST /games, GET /games/<id>, POST /games/<id>/{{reveal,flag,score}}, GET /ws");

    rocket
}
