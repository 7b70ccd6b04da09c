pub mod cleanup;
pub mod config;
pub mod cors;
pub mod logic;
pub mod rate_limit;
pub mod routes;
pub mod scores;

use std::sync::Arc;

use dashmap::DashMap;
use rocket::{Build, Rocket, routes};

use crate::{
    cors::create_cors, logic::Games, rate_limit::create_rate_limiter, routes::HighScores,
    scores::HighScoreStore,
};

/// Assembles the score service with fresh session storage around `scores`.
pub fn build_rocket(scores: HighScoreStore) -> Rocket<Build> {
    let games: Games = Arc::new(DashMap::new());
    let scores: HighScores = Arc::new(scores);

    rocket::build()
        .attach(create_cors())
        .manage(games)
        .manage(scores)
        .manage(create_rate_limiter())
        .mount(
            "/",
            routes![
                routes::get_difficulty,
                routes::get_high_score,
                routes::update_high_score,
                routes::create_game,
                routes::get_game_state,
                routes::reveal_cell,
                routes::toggle_flag,
                routes::update_score,
                routes::websocket_handler,
            ],
        )
}
