use potion_solver::simulator::Game;
use potion_solver::solver::{search, SearchConfig};
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

pub fn criterion_benchmark(c: &mut Criterion) {
    let config = SearchConfig {
        time_budget: Duration::from_secs(60),
        max_expansions: 5_000,
        queue_capacity: 1 << 20,
        ..SearchConfig::default()
    };

    c.bench_function("search opening seed 42", |b| {
        let input = Game::new_with_seed(42).turn_input();

        b.iter(|| {
            let input = black_box(&input);
            search(input, &config).unwrap().first_action()
        })
    });

    c.bench_function("search opening seed 7", |b| {
        let input = Game::new_with_seed(7).turn_input();

        b.iter(|| {
            let input = black_box(&input);
            search(input, &config).unwrap().first_action()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
