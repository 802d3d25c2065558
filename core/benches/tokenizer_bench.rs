use criterion::{criterion_group, criterion_main, Criterion};
use search_core::tokenizer::stems;
use search_core::InvertedIndex;
use std::collections::BTreeSet;

const TEXT: &str = "The quick brown fox jumps over the lazy dog. Foxes and dogs run \
    through forests, fields and farms; the runner's pace never slows.";

fn bench_tokenize(c: &mut Criterion) {
    let text = TEXT.repeat(200);
    c.bench_function("stem_paragraphs", |b| b.iter(|| stems(&text)));
}

fn bench_search(c: &mut Criterion) {
    let mut index = InvertedIndex::new();
    let words = stems(TEXT);
    for doc in 0..500 {
        index.add_words(&words, &format!("doc{doc}.txt"));
    }
    let query: BTreeSet<String> = ["fox", "run", "f"].iter().map(|w| w.to_string()).collect();
    c.bench_function("exact_search", |b| b.iter(|| index.exact_search(&query)));
    c.bench_function("partial_search", |b| b.iter(|| index.partial_search(&query)));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
