use criterion::{black_box, criterion_group, criterion_main, Criterion};

use phalanx::board::{Placement, PlayerSide, UnitInstance};
use phalanx::cards::{catalog, Catalog};
use phalanx::movegen::{explore, legal_moves_for_side, legal_retreats, MoveDirection};
use phalanx::playout::{demo_game, run_playout};

fn bench_explore(c: &mut Criterion) {
    let cat = Catalog::standard();
    let state = demo_game().unwrap();
    let unit = UnitInstance::new(PlayerSide::Red, catalog::HORSE_ARCHERS, 1);
    let start = state.board.find_unit(&unit).unwrap();
    c.bench_function("explore_horse_archers", |b| {
        b.iter(|| {
            explore(
                black_box(&state),
                black_box(&cat),
                black_box(&unit),
                black_box(start),
                MoveDirection::Advance,
            )
            .unwrap()
        })
    });
}

fn bench_legal_moves_side(c: &mut Criterion) {
    let cat = Catalog::standard();
    let state = demo_game().unwrap();
    c.bench_function("legal_moves_red_side", |b| {
        b.iter(|| legal_moves_for_side(black_box(&state), black_box(&cat), PlayerSide::Red).unwrap())
    });
}

fn bench_legal_retreats(c: &mut Criterion) {
    let cat = Catalog::standard();
    let state = demo_game().unwrap();
    let unit = UnitInstance::new(PlayerSide::Blue, catalog::GUARD, 1);
    let placement: Placement = state.board.find_unit(&unit).unwrap();
    c.bench_function("legal_retreats_guard", |b| {
        b.iter(|| {
            legal_retreats(black_box(&state), black_box(&cat), black_box(&unit), placement)
                .unwrap()
        })
    });
}

fn bench_playout(c: &mut Criterion) {
    let cat = Catalog::standard();
    let state = demo_game().unwrap();
    c.bench_function("playout_60_events", |b| {
        b.iter(|| run_playout(black_box(&state), black_box(&cat), 11, 60).unwrap())
    });
}

criterion_group!(
    benches,
    bench_explore,
    bench_legal_moves_side,
    bench_legal_retreats,
    bench_playout
);
criterion_main!(benches);
