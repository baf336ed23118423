//! Range query benchmark: BK-tree vs linear scan
//!
//! Measures how much of the value set the triangle-inequality pruning skips
//! as the tree grows, for unweighted and keyboard-weighted metrics.

use bkindex::indexing::SharedMetric;
use bkindex::{BkTree, BuildOptions, EditDistance, Keyboard};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZES: &[usize] = &[1_000, 10_000, 50_000];
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

fn generate_words(n: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let len = rng.random_range(4..12);
            (0..len)
                .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
                .collect()
        })
        .collect()
}

fn linear_scan(words: &[String], metric: &dyn EditDistance, query: &str, max_distance: usize) -> usize {
    words
        .iter()
        .filter(|word| metric.distance(word, query) <= max_distance)
        .count()
}

fn bench_metric(c: &mut Criterion, name: &str, metric: SharedMetric) {
    let mut group = c.benchmark_group(name);
    let queries = generate_words(20, 99);

    for &size in SIZES {
        let words = generate_words(size, 42);
        let tree = BkTree::from_values(words.clone(), metric.clone()).expect("non-empty input");
        group.throughput(Throughput::Elements(queries.len() as u64));

        group.bench_with_input(BenchmarkId::new("bktree", size), &size, |b, _| {
            b.iter(|| {
                for query in &queries {
                    black_box(tree.range_query(black_box(query), 2));
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("linear_scan", size), &size, |b, _| {
            b.iter(|| {
                for query in &queries {
                    black_box(linear_scan(&words, metric.as_ref(), black_box(query), 2));
                }
            })
        });
    }
    group.finish();
}

fn bench_levenshtein(c: &mut Criterion) {
    bench_metric(c, "range_query_levenshtein", BuildOptions::default().metric(None));
}

fn bench_keyboard(c: &mut Criterion) {
    let keyboard = Keyboard::qwerty();
    bench_metric(c, "range_query_keyboard", BuildOptions::default().metric(Some(&keyboard)));
}

fn bench_insert(c: &mut Criterion) {
    let words = generate_words(10_000, 7);
    c.bench_function("build_10000", |b| {
        b.iter(|| BkTree::from_values(black_box(words.clone()), BuildOptions::default().metric(None)))
    });
}

criterion_group!(benches, bench_levenshtein, bench_keyboard, bench_insert);
criterion_main!(benches);
