use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;
use twenty48_ai::engine::{self as GameEngine, Board, Move};

fn warm() {
    GameEngine::new();
}

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut boards = Vec::new();
    // Empty and two-tile starts
    boards.push(Board::EMPTY);
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    boards.push(b);
    // Derive a variety of densities deterministically
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..20 {
        let dir = seq[i % seq.len()];
        let nb = b.shift(dir);
        if nb != b {
            b = nb.with_random_tile(&mut rng);
        }
        boards.push(b);
    }
    boards
}

fn bench_shift(c: &mut Criterion) {
    warm();
    for (name, dir) in [
        ("shift/left", Move::Left),
        ("shift/right", Move::Right),
        ("shift/up", Move::Up),
        ("shift/down", Move::Down),
    ] {
        c.bench_function(name, |bch| {
            let boards = corpus();
            bch.iter(|| {
                let mut acc = 0u64;
                for &bd in &boards {
                    acc ^= bd.shift(dir).raw();
                }
                black_box(acc)
            })
        });
    }
}

fn bench_apply_move(c: &mut Criterion) {
    warm();
    c.bench_function("apply_move/left_with_delta", |bch| {
        let boards = corpus();
        bch.iter(|| {
            let mut acc = 0u64;
            for &bd in &boards {
                let out = bd.apply_move(Move::Left);
                acc = acc.wrapping_add(out.score_delta) ^ out.board.raw();
            }
            black_box(acc)
        })
    });
    c.bench_function("query/legal_moves", |bch| {
        let boards = corpus();
        bch.iter(|| {
            let mut acc = 0usize;
            for &bd in &boards {
                acc += bd.legal_moves().len();
            }
            black_box(acc)
        })
    });
}

fn bench_random_insert(c: &mut Criterion) {
    warm();
    c.bench_function("board/with_random_tile", |bch| {
        bch.iter_batched(
            || (Board::EMPTY, StdRng::seed_from_u64(7)),
            |(mut bd, mut rng)| {
                for _ in 0..16 {
                    bd = bd.with_random_tile(&mut rng);
                }
                black_box(bd)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("board/make_move_left", |bch| {
        bch.iter_batched(
            || {
                let mut rng = StdRng::seed_from_u64(9);
                let bd = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
                (bd, rng)
            },
            |(mut bd, mut rng)| {
                for _ in 0..64 {
                    bd = bd.make_move(Move::Left, &mut rng);
                }
                black_box(bd)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(engine_ops, bench_shift, bench_apply_move, bench_random_insert);
criterion_main!(engine_ops);
