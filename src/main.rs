use std::process::ExitCode;

use chess_rules::config::{AppConfig, OutputFormat};
use chess_rules::engine::{ChessError, Game};

fn main() -> ExitCode {
    let config = AppConfig::from_env();

    // Initialize tracing (structured logging).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("chess-rules v{} replaying from the start position", env!("CARGO_PKG_VERSION"));

    let mut game = Game::new();
    for token in std::env::args().skip(1) {
        if let Err(e) = replay(&mut game, &token) {
            tracing::error!(move_text = %token, error = %e, "replay stopped");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    }

    match report(&game, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn replay(game: &mut Game, token: &str) -> Result<(), ChessError> {
    let text = game.play(token)?;
    tracing::info!(ply = game.move_history().len(), move_text = %text, status = %game.status(), "played");
    Ok(())
}

fn report(game: &Game, config: &AppConfig) -> Result<(), serde_json::Error> {
    match config.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&game.summary())?);
        }
        OutputFormat::Text => {
            println!("{}", game.position().board().grid_string());
            println!(
                "{} to move: {} (halfmove clock {}, repetitions {})",
                game.side_to_move(),
                game.status(),
                game.halfmove_clock(),
                game.repetition_count()
            );
            if config.show_legal {
                let moves: Vec<String> = game.legal_moves().iter().map(|m| m.to_string()).collect();
                println!("legal: {}", moves.join(" "));
            }
        }
    }
    Ok(())
}
