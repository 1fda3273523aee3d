// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use das_sim::simulator::topology;
use das_sim::{Config, NodeClass, Shape, Simulator};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() {
    divan::main();
}

fn shape(nodes: usize) -> Shape {
    Shape::square(32, 16, nodes)
        .with_net_degree(8)
        .with_custody(2, 2)
        .with_bandwidth(1000, vec![NodeClass::new(1, 1, 100)])
}

#[divan::bench(args = [100, 1000, 5000])]
fn regular_graph(bencher: divan::Bencher, n: usize) {
    bencher
        .with_inputs(|| StdRng::seed_from_u64(0))
        .bench_values(|mut rng| topology::channel_graph(n, 8, &mut rng));
}

#[divan::bench(args = [100, 500])]
fn setup(bencher: divan::Bencher, nodes: usize) {
    bencher.bench(|| Simulator::new(shape(nodes), Config::default()));
}

#[divan::bench(args = [100, 500], sample_count = 10)]
fn full_run(bencher: divan::Bencher, nodes: usize) {
    let config = Config {
        save_progress: false,
        ..Config::default()
    };
    bencher
        .with_inputs(|| Simulator::new(shape(nodes), config.clone()).unwrap())
        .bench_values(|mut sim| sim.run());
}
