//! Retrieval benchmarks over a generated name corpus.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use simdex::{CharSize, Measure, Reader, Writer};
use tempfile::TempDir;

const GIVEN: [&str; 20] = [
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas",
    "Sarah", "Charles", "Karen",
];

const FAMILY: [&str; 20] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis",
    "Rodriguez", "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson",
    "Thomas", "Taylor", "Moore", "Jackson", "Martin",
];

const SUFFIX: [&str; 5] = ["", " Jr", " Sr", " II", " III"];

fn build_corpus(dir: &TempDir) -> Reader {
    let path = dir.path().join("bench.db");
    let mut writer = Writer::open(&path, 3, false, CharSize::Byte).unwrap();
    for given in GIVEN {
        for family in FAMILY {
            for suffix in SUFFIX {
                writer.insert(&format!("{given} {family}{suffix}")).unwrap();
            }
        }
    }
    writer.close().unwrap();
    Reader::open(&path).unwrap()
}

fn bench_retrieve(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let reader = build_corpus(&dir);

    let mut group = c.benchmark_group("retrieve");
    group.bench_function("cosine 0.7 typo query", |b| {
        b.iter(|| {
            reader
                .retrieve(black_box("Jennifer Hernandes"), Measure::Cosine, 0.7)
                .unwrap()
        })
    });
    group.bench_function("jaccard 0.5 short query", |b| {
        b.iter(|| {
            reader
                .retrieve(black_box("John Smith"), Measure::Jaccard, 0.5)
                .unwrap()
        })
    });
    group.bench_function("exact hit", |b| {
        b.iter(|| {
            reader
                .retrieve(black_box("Karen Martin III"), Measure::Exact, 1.0)
                .unwrap()
        })
    });
    group.bench_function("check cosine 0.7", |b| {
        b.iter(|| {
            reader
                .check(black_box("Willam Andersen"), Measure::Cosine, 0.7)
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_retrieve);
criterion_main!(benches);
