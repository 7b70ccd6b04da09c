use minefield_client::{LocalGame, MinefieldClient, Pos};
use minefield_engine::RevealOutcome;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let client = MinefieldClient::new("http://localhost:8000")?;
    let mut game = LocalGame::new(client);
    game.start(0).await?;

    // Sweep row by row until the game ends. Not a solver.
    let (width, height) = match game.session() {
        Some(session) => (session.grid().width(), session.grid().height()),
        None => return Ok(()),
    };
    'sweep: for y in 0..height {
        for x in 0..width {
            let result = game.reveal(Pos { x, y }).await?;
            match result.outcome {
                RevealOutcome::Won => {
                    println!("Cleared the field!");
                    break 'sweep;
                }
                RevealOutcome::HitMine => {
                    println!("Hit a mine at ({x}, {y})");
                    break 'sweep;
                }
                _ => {}
            }
        }
    }

    if let Some(session) = game.session() {
        println!("Score: {}, high score: {}", session.score(), game.high_score());
    }
    Ok(())
}
