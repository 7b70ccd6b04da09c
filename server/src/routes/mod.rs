use std::sync::Arc;

use dashmap::Entry;
use nanoid::nanoid;
use rocket::{State, futures::StreamExt, get, http::Status, post, serde::json::Json};
use rocket_ws::{Channel, Message, WebSocket};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use minefield_common::{
    models::{
        CreateResponse, Difficulty, FlagResponse, GameSnapshot, GameStatus, HighScoreResponse,
        NewGameRequest, Pos, RevealResponse, ScoreDelta, ScoreResponse, ScoreSubmission,
    },
    protocol::ClientMessage,
};
use minefield_engine::{RevealOutcome, preset};

use crate::{
    logic::{Game, Games},
    rate_limit::{ClientIp, RateLimiter, check_rate_limit},
    scores::HighScoreStore,
};

pub type HighScores = Arc<HighScoreStore>;

#[instrument(level = "trace", skip(games, game))]
fn add_game(games: &Games, game: Game) -> String {
    let mut id_length = 5;
    let max_attempts_per_length = 10;

    loop {
        for _ in 0..max_attempts_per_length {
            let id = nanoid!(id_length);
            match games.entry(id.clone()) {
                Entry::Occupied(_) => {
                    debug!("Game ID collision, trying another: {}", id);
                    continue;
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(Mutex::new(game)));
                    info!("Created new game with ID: {}", id);
                    return id;
                }
            }
        }

        warn!(
            "Exhausted ID attempts at length {}, increasing to {}",
            id_length,
            id_length + 1
        );
        id_length += 1;
    }
}

fn find_game(games: &Games, id: &str) -> Result<Arc<Mutex<Game>>, Status> {
    match games.get(id) {
        Some(entry) => Ok(entry.value().clone()),
        None => {
            debug!("Unknown game: {}", id);
            Err(Status::NotFound)
        }
    }
}

/// Submits the session score as a high-score candidate once the game is won.
async fn record_win(scores: &HighScoreStore, game: &Game) {
    if game.session().status() == GameStatus::Won {
        let high_score = scores.submit(game.session().score()).await;
        info!(
            "Won game scored {}, high score is {}",
            game.session().score(),
            high_score
        );
    }
}

#[get("/difficulty/<index>")]
pub fn get_difficulty(index: usize) -> Option<Json<Difficulty>> {
    preset(index).map(Json)
}

#[get("/highscore")]
pub fn get_high_score(scores: &State<HighScores>) -> Json<HighScoreResponse> {
    Json(HighScoreResponse {
        high_score: scores.high_score(),
    })
}

#[post("/highscore", data = "<submission>")]
#[instrument(level = "trace", skip(scores), fields(score = submission.score))]
pub async fn update_high_score(
    submission: Json<ScoreSubmission>,
    scores: &State<HighScores>,
) -> Json<HighScoreResponse> {
    Json(HighScoreResponse {
        high_score: scores.submit(submission.score).await,
    })
}

#[post("/games", data = "<request>")]
#[instrument(level = "trace", skip(games, rate_limiter), fields(client_ip = %client_ip.0, difficulty = request.difficulty))]
pub fn create_game(
    request: Json<NewGameRequest>,
    games: &State<Games>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<CreateResponse>, Status> {
    info!(
        "Game creation request from {}: difficulty {}",
        client_ip.0, request.difficulty
    );

    check_rate_limit(rate_limiter, &client_ip)?;

    let Some(difficulty) = preset(request.difficulty) else {
        warn!("Unknown difficulty preset: {}", request.difficulty);
        return Err(Status::BadRequest);
    };

    let id = add_game(games, Game::new(difficulty));
    info!(
        "Successfully created game {} for client {}",
        id, client_ip.0
    );
    Ok(Json(CreateResponse { id }))
}

#[get("/games/<id>")]
pub async fn get_game_state(id: &str, games: &State<Games>) -> Option<Json<GameSnapshot>> {
    let game = find_game(games, id).ok()?;
    let game = game.lock().await;
    Some(Json(game.snapshot()))
}

#[post("/games/<id>/reveal", data = "<pos>")]
#[instrument(level = "trace", skip(games, scores, pos), fields(x = pos.x, y = pos.y))]
pub async fn reveal_cell(
    id: &str,
    pos: Json<Pos>,
    games: &State<Games>,
    scores: &State<HighScores>,
) -> Result<Json<RevealResponse>, Status> {
    let game = find_game(games, id)?;
    let mut game = game.lock().await;

    let result = game.reveal(pos.0).await.map_err(|e| {
        warn!("Rejected reveal in game {}: {}", id, e);
        Status::BadRequest
    })?;

    if result.outcome == RevealOutcome::Won {
        record_win(scores, &game).await;
    }

    Ok(Json(RevealResponse {
        revealed: result.revealed.len(),
        status: game.session().status(),
        score: game.session().score(),
    }))
}

#[post("/games/<id>/flag", data = "<pos>")]
#[instrument(level = "trace", skip(games, pos), fields(x = pos.x, y = pos.y))]
pub async fn toggle_flag(
    id: &str,
    pos: Json<Pos>,
    games: &State<Games>,
) -> Result<Json<FlagResponse>, Status> {
    let game = find_game(games, id)?;
    let mut game = game.lock().await;

    game.flag(pos.0).await.map_err(|e| {
        warn!("Rejected flag in game {}: {}", id, e);
        Status::BadRequest
    })?;

    let flagged = game
        .session()
        .grid()
        .get(pos.0)
        .is_some_and(|cell| cell.is_flagged);
    Ok(Json(FlagResponse {
        flagged,
        flags_left: game.session().flags_left(),
    }))
}

#[post("/games/<id>/score", data = "<delta>")]
#[instrument(level = "trace", skip(games), fields(delta = delta.delta))]
pub async fn update_score(
    id: &str,
    delta: Json<ScoreDelta>,
    games: &State<Games>,
) -> Result<Json<ScoreResponse>, Status> {
    let game = find_game(games, id)?;
    let mut game = game.lock().await;
    let score = game.update_score(delta.delta).await;
    Ok(Json(ScoreResponse { score }))
}

/// Applies one websocket action to a hosted game. Rejected moves are logged
/// and otherwise ignored.
async fn handle_client_message(
    game: &mut Game,
    message: ClientMessage,
    scores: &HighScoreStore,
    game_id: &str,
) {
    match message {
        ClientMessage::Reveal { pos } => match game.reveal(pos).await {
            Ok(result) if result.outcome == RevealOutcome::Won => record_win(scores, game).await,
            Ok(_) => {}
            Err(e) => warn!("Rejected reveal in game {}: {}", game_id, e),
        },
        ClientMessage::Flag { pos } => {
            if let Err(e) = game.flag(pos).await {
                warn!("Rejected flag in game {}: {}", game_id, e);
            }
        }
        ClientMessage::Restart { difficulty } => match preset(difficulty) {
            Some(difficulty) => game.restart(difficulty).await,
            None => warn!(
                "Ignoring restart with unknown difficulty {} in game {}",
                difficulty, game_id
            ),
        },
    }
}

#[get("/ws?<id>")]
#[instrument(level = "trace", skip(ws, games, scores), fields(game_id = %id))]
pub fn websocket_handler(
    ws: WebSocket,
    games: &State<Games>,
    scores: &State<HighScores>,
    id: String,
) -> Result<Channel<'static>, Status> {
    let game = find_game(games, &id).inspect_err(|_| {
        warn!("WebSocket connection attempt for non-existent game: {}", id);
    })?;
    let scores = scores.inner().clone();
    info!("WebSocket connection established for game: {}", id);

    Ok(ws.channel(move |stream| {
        let game_id = id.clone();
        Box::pin(async move {
            let (write, mut read) = stream.split();

            let stream_id = {
                let mut game = game.lock().await;
                game.add_stream(write).await
            };

            info!(
                "Client connected to game {} (stream: {})",
                game_id, stream_id
            );

            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => {
                            debug!("Received message from game {}: {:?}", game_id, message);
                            let mut game = game.lock().await;
                            handle_client_message(&mut game, message, &scores, &game_id).await;
                        }
                        Err(e) => {
                            warn!(
                                "Invalid message format in game {}: {} - Error: {}",
                                game_id, text, e
                            );
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!(
                            "WebSocket connection closed for game {} (stream: {})",
                            game_id, stream_id
                        );
                        break;
                    }
                    Err(e) => {
                        error!(
                            "WebSocket error in game {} (stream: {}): {}",
                            game_id, stream_id, e
                        );
                        break;
                    }
                    _ => {
                        debug!("Received non-text message in game {}, ignoring", game_id);
                    }
                }
            }

            {
                let mut game = game.lock().await;
                game.remove_stream(&stream_id).await;
            }

            info!(
                "Client disconnected from game {} (stream: {})",
                game_id, stream_id
            );
            Ok(())
        })
    }))
}
