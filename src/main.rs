use twenty48_ai::engine::{self as GameEngine, Game};
use twenty48_ai::expectimax::Expectimax;

fn main() {
    GameEngine::new();
    let mut expectimax = Expectimax::new();
    let mut rng = rand::thread_rng();
    let mut game = Game::new(&mut rng);
    println!("{}", game.board());
    let mut move_count = 0;
    while let Some(direction) = expectimax.best_move(game.board()) {
        game.advance(direction, &mut rng);
        move_count += 1;
        println!("{}", game.board());
    }
    println!(
        "Moves made: {}, Score: {}, Highest tile: {}, Max states considered for a move: {}",
        move_count,
        game.score(),
        game.board().highest_tile(),
        expectimax.last_stats().peak_nodes
    );
}
