use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lexica_rs::{Definition, Entry, Lexicon, LexiconDataset, LexiconIndex, Meta, QueryState};
use std::sync::OnceLock;

const SYLLABLES: &[&str] = &[
    "ai", "ga", "ri", "u", "sol", "ar", "pa", "ra", "ço", "mon", "te", "ca", "sa", "bè", "la",
    "nòu", "vi", "da", "lo", "fe",
];
const TAGS: &[&str] = &["nature", "animal", "color", "food", "place", "body", "time"];

fn synthetic_entries(count: usize) -> Vec<Entry> {
    (0..count)
        .map(|n| {
            let headword: String = (0..3)
                .map(|k| SYLLABLES[(n / SYLLABLES.len().pow(k)) % SYLLABLES.len()])
                .collect();
            let gloss = format!(
                "{} of the {} kind, near {}",
                SYLLABLES[n % SYLLABLES.len()],
                TAGS[n % TAGS.len()],
                SYLLABLES[(n * 7) % SYLLABLES.len()],
            );
            Entry {
                headword,
                pos: if n % 3 == 0 { "v" } else { "n" }.to_string(),
                defs: vec![Definition { gloss, notes: None }],
                tags: vec![
                    TAGS[n % TAGS.len()].to_string(),
                    TAGS[(n / 2) % TAGS.len()].to_string(),
                ],
                ..Entry::default()
            }
        })
        .collect()
}

fn lexicon() -> &'static Lexicon {
    static LEXICON: OnceLock<Lexicon> = OnceLock::new();
    LEXICON.get_or_init(|| {
        Lexicon::new(LexiconDataset::new(Meta::default(), synthetic_entries(8_000)))
    })
}

fn bench_index_build(c: &mut Criterion) {
    let entries = synthetic_entries(8_000);
    c.bench_function("index_build::8000", |b| {
        b.iter(|| {
            let index = LexiconIndex::build(black_box(&entries));
            black_box(index.headword_count());
        });
    });
}

fn bench_search_queries(c: &mut Criterion) {
    let lexicon = lexicon();
    const QUERIES: &[&str] = &["sol", "aiga", "kind near", "nòu", "ZZZ"];
    for &query in QUERIES {
        let state = QueryState::search(query);
        c.bench_with_input(BenchmarkId::new("search", query), &state, |b, state| {
            b.iter(|| {
                let results = lexicon.query(state);
                black_box(results.total);
            });
        });
    }
}

fn bench_browse_queries(c: &mut Criterion) {
    let lexicon = lexicon();
    let cases = [
        ("all", QueryState::browse(None)),
        ("s", QueryState::browse(Some('s'))),
        ("ç", QueryState::browse(Some('ç'))),
        ("animal_n", QueryState::browse(None).with_tag("animal").with_pos("n")),
    ];
    for (label, state) in &cases {
        c.bench_with_input(BenchmarkId::new("browse", label), state, |b, state| {
            b.iter(|| {
                let results = lexicon.query(state);
                black_box(results.hits.len());
            });
        });
    }
}

criterion_group!(
    benches,
    bench_index_build,
    bench_search_queries,
    bench_browse_queries
);
criterion_main!(benches);
