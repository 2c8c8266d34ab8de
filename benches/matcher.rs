//! Benchmarks for amount matching
//!
//! This benchmark measures:
//! - Single-comment matching with the default currency rules
//! - Whole-batch processing throughput

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use donation_scan::batch::{BatchProcessor, BatchWork};
use donation_scan::config::CurrencyRule;
use donation_scan::matcher::AmountMatcher;
use donation_scan::{AnalyzerConfig, Comment};

const SAMPLE_COMMENTS: &[&str] = &[
    "donated $50 great stream!",
    "thanks, here's ₹500 for you",
    "what a game in 2024, $2024 lol",
    "first!",
    "sent rs. 250 keep going",
    "€15 from Berlin",
    "that was 20 € well spent ",
    "no money here, just vibes",
];

fn comments(n: usize) -> Vec<Comment> {
    (0..n)
        .map(|i| Comment::new(SAMPLE_COMMENTS[i % SAMPLE_COMMENTS.len()], format!("viewer{}", i)))
        .collect()
}

fn bench_find_amounts(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_amounts");
    let matcher = AmountMatcher::new(&CurrencyRule::defaults()).unwrap();

    group.bench_function("keyword_match", |b| {
        b.iter(|| matcher.find_amounts(black_box(SAMPLE_COMMENTS[0])))
    });

    group.bench_function("no_match", |b| {
        b.iter(|| matcher.find_amounts(black_box(SAMPLE_COMMENTS[7])))
    });

    group.finish();
}

fn bench_process_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_batch");
    let processor = BatchProcessor::new(&AnalyzerConfig::default()).unwrap();
    let batch = comments(1000);
    group.throughput(Throughput::Elements(batch.len() as u64));

    group.bench_function("1000_comments", |b| {
        b.iter(|| processor.process_batch(black_box(batch.clone()), 1))
    });

    group.finish();
}

criterion_group!(benches, bench_find_amounts, bench_process_batch);
criterion_main!(benches);
