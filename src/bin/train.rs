use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, Rng, SeedableRng};

use twenty48_ai::engine::{self as GameEngine, Game};
use twenty48_ai::ntuple::{NTupleAgent, NTupleConfig, SymmetryConfig};

#[derive(Debug, Parser)]
#[command(name = "train", about = "Train the N-tuple agent with TD(0) self-play")]
struct Args {
    /// Number of self-play episodes
    #[arg(long, default_value_t = 5000)]
    episodes: u64,

    /// TD step size, in [0, 1]
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,

    /// Discount factor, in [0, 1]
    #[arg(long, default_value_t = 0.9)]
    discount: f64,

    /// Include the horizontally mirrored board in evaluation
    #[arg(long)]
    mirror_horizontal: bool,

    /// Include the vertically mirrored board in evaluation
    #[arg(long)]
    mirror_vertical: bool,

    /// Include the 90-degree rotation in evaluation
    #[arg(long)]
    rotate_90: bool,

    /// Include the 270-degree rotation in evaluation
    #[arg(long)]
    rotate_270: bool,

    /// RNG seed for reproducible runs (entropy-seeded if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final weight table as JSON to this path
    #[arg(long)]
    weights_out: Option<PathBuf>,

    /// Print an episode report every N episodes (0 disables reports)
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Suppress the progress bar
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if !(0.0..=1.0).contains(&args.learning_rate) {
        anyhow::bail!("--learning-rate must be in [0, 1]");
    }
    if !(0.0..=1.0).contains(&args.discount) {
        anyhow::bail!("--discount must be in [0, 1]");
    }
    GameEngine::new();

    let cfg = NTupleConfig {
        learning_rate: args.learning_rate,
        discount: args.discount,
        symmetry: SymmetryConfig {
            mirror_horizontal: args.mirror_horizontal,
            mirror_vertical: args.mirror_vertical,
            rotate_90: args.rotate_90,
            rotate_270: args.rotate_270,
        },
        ..NTupleConfig::default()
    };
    let mut agent = NTupleAgent::with_config(cfg);
    let mut rng: StdRng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pb = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new(args.episodes);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} episodes | {msg}",
            )?
            .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let start = Instant::now();
    let mut best_score = 0u64;
    for episode in 0..args.episodes {
        let outcome = run_episode(&mut agent, &mut rng);
        best_score = best_score.max(outcome.score);
        if let Some(pb) = &pb {
            pb.inc(1);
            pb.set_message(format!(
                "score: {} | best: {} | weights: {}",
                outcome.score,
                best_score,
                agent.table_len()
            ));
        }
        if args.report_every > 0 && episode % args.report_every == 0 {
            let line = format!(
                "Episode {}: score {}, moves {}, highest tile {}, weights {}",
                episode,
                outcome.score,
                outcome.moves,
                outcome.highest_tile,
                agent.table_len()
            );
            match &pb {
                Some(pb) => pb.println(line),
                None => println!("{}", line),
            }
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "Trained {} episodes in {:.1}s | best score: {} | weights: {}",
        args.episodes,
        elapsed,
        best_score,
        agent.table_len()
    );

    if let Some(path) = args.weights_out {
        let json = serde_json::to_string(&agent).context("serializing weight table")?;
        fs::write(&path, json)
            .with_context(|| format!("writing weights to {}", path.display()))?;
        println!("Wrote weights to {}", path.display());
    }
    Ok(())
}

struct EpisodeOutcome {
    score: u64,
    moves: u64,
    highest_tile: u32,
}

/// One self-play episode: greedy agent move, commit plus spawn, then the
/// TD update on the committed transition, until no legal move remains.
fn run_episode<R: Rng + ?Sized>(agent: &mut NTupleAgent, rng: &mut R) -> EpisodeOutcome {
    let mut game = Game::new(rng);
    let mut moves = 0u64;
    while let Some(direction) = agent.best_move(game.board()) {
        let prev = game.board();
        game.advance(direction, rng);
        agent.td_update(prev, game.board());
        moves += 1;
    }
    EpisodeOutcome {
        score: game.score(),
        moves,
        highest_tile: game.board().highest_tile(),
    }
}
