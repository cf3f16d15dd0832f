use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;
use twenty48_ai::engine::{self as GameEngine, Board, Game, Move};
use twenty48_ai::ntuple::{NTupleAgent, NTupleConfig, SymmetryConfig};

fn warm() {
    GameEngine::new();
}

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(1337);
    let mut boards = Vec::new();
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    boards.push(b);
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..32 {
        let dir = seq[i % seq.len()];
        let nb = b.shift(dir);
        if nb != b {
            b = nb.with_random_tile(&mut rng);
        }
        boards.push(b);
    }
    boards
}

fn bench_value(c: &mut Criterion) {
    warm();
    let boards = corpus();
    let identity_only = NTupleAgent::new();
    let all_sym = NTupleAgent::with_config(NTupleConfig {
        symmetry: SymmetryConfig::ALL,
        ..NTupleConfig::default()
    });
    c.bench_function("ntuple/value_identity", |bch| {
        bch.iter(|| {
            let mut acc = 0f64;
            for &bd in &boards {
                acc += identity_only.value(bd);
            }
            black_box(acc)
        })
    });
    c.bench_function("ntuple/value_all_symmetries", |bch| {
        bch.iter(|| {
            let mut acc = 0f64;
            for &bd in &boards {
                acc += all_sym.value(bd);
            }
            black_box(acc)
        })
    });
}

fn bench_training(c: &mut Criterion) {
    warm();
    c.bench_function("ntuple/td_update", |bch| {
        let boards = corpus();
        bch.iter_batched(
            NTupleAgent::new,
            |mut agent| {
                for pair in boards.windows(2) {
                    agent.td_update(pair[0], pair[1]);
                }
                black_box(agent.table_len())
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("ntuple/greedy_episode_64_moves", |bch| {
        bch.iter_batched(
            || (NTupleAgent::new(), StdRng::seed_from_u64(3)),
            |(mut agent, mut rng)| {
                let mut game = Game::new(&mut rng);
                let mut steps = 0;
                while steps < 64 {
                    let Some(dir) = agent.best_move(game.board()) else {
                        break;
                    };
                    let prev = game.board();
                    game.advance(dir, &mut rng);
                    agent.td_update(prev, game.board());
                    steps += 1;
                }
                black_box(game.score())
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(ntuple, bench_value, bench_training);
criterion_main!(ntuple);
