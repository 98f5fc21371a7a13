// SPDX-License-Identifier: Apache-2.0

use cmip_replica_core::{file_transition, Status, SuffixToken};
use criterion::{criterion_group, criterion_main, Criterion};

fn benchmark_file_transition(c: &mut Criterion) {
    let statuses: Vec<Status> = [
        "done",
        "published",
        "error-checksum",
        "waiting",
        "complete",
        "done,retracted",
        "_paused",
    ]
    .iter()
    .cycle()
    .take(10_000)
    .map(|s| Status::parse(s))
    .collect();
    let suffix = SuffixToken::default();

    c.bench_function("file_transition_10k", |b| {
        b.iter(|| {
            let rewrites = statuses
                .iter()
                .filter_map(|s| file_transition(s, &suffix).ok())
                .filter(|t| t.is_rewrite())
                .count();
            assert!(rewrites > 0);
        });
    });
}

criterion_group!(benches, benchmark_file_transition);
criterion_main!(benches);
