// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use das_sim::{Block, FailureModel};
use divan::counter::ItemsCount;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() {
    divan::main();
}

#[divan::bench(args = [64, 128, 512])]
fn init_random(bencher: divan::Bencher, n: usize) {
    bencher
        .counter(ItemsCount::new(n * n))
        .with_inputs(|| (Block::new(n, n, n / 2, n / 2), StdRng::seed_from_u64(0)))
        .bench_values(|(mut block, mut rng)| {
            block.init_with_failures(FailureModel::Random, 50, &mut rng);
            block
        });
}

#[divan::bench(args = [64, 128, 512])]
fn repair_all(bencher: divan::Bencher, n: usize) {
    bencher
        .counter(ItemsCount::new(2 * n))
        .with_inputs(|| {
            let mut rng = StdRng::seed_from_u64(0);
            let mut block = Block::new(n, n, n / 2, n / 2);
            block.init_with_failures(FailureModel::Random, 25, &mut rng);
            block
        })
        .bench_values(|mut block| {
            for r in 0..n {
                block.repair_row(r);
            }
            for c in 0..n {
                block.repair_column(c);
            }
            block
        });
}

#[divan::bench(args = [64, 128, 512])]
fn merge(bencher: divan::Bencher, n: usize) {
    bencher
        .with_inputs(|| {
            let mut rng = StdRng::seed_from_u64(1);
            let mut a = Block::new(n, n, n / 2, n / 2);
            let mut b = Block::new(n, n, n / 2, n / 2);
            a.init_with_failures(FailureModel::Random, 50, &mut rng);
            b.init_with_failures(FailureModel::Random, 50, &mut rng);
            (a, b)
        })
        .bench_values(|(mut a, b)| {
            a.merge(&b);
            a
        });
}
