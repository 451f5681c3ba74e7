use annoseek::conservation::ConservationScorer;
use annoseek::mapper::AlignmentColumnMapper;
use annoseek::registry::{DomainAnnotations, PositionalAnnotation};
use annoseek::transfer::TransferResolver;
use annoseek::types::Position;
use annoseek::{Alignment, AnnotationRegistry, DomainUnit, EngineConfig, TransferEngine};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;

const DOMAIN: &str = "PF00001";
const MOTIF: &str = "VLLVGPPGTGKTTLARALAEELGVPFVRVSASELT";

/// Build an alignment of `seeds` seed rows and `targets` novel rows, every
/// other target carrying an insert state and a deletion
fn synthetic_alignment(seeds: usize, targets: usize) -> String {
    let mut text = String::from("# STOCKHOLM 1.0\n");
    for i in 0..seeds {
        text.push_str(&format!("SEED{}/1-{} {}\n", i, MOTIF.len(), MOTIF));
    }
    for i in 0..targets {
        if i % 2 == 0 {
            text.push_str(&format!("T{}target//1-{} {}\n", i, MOTIF.len(), MOTIF));
        } else {
            let row = format!("{}ga{}-{}", &MOTIF[..10], &MOTIF[10..20], &MOTIF[21..]);
            text.push_str(&format!("T{}target//1-{} {}\n", i, MOTIF.len() + 1, row));
        }
    }
    text.push_str("//\n");
    text
}

fn synthetic_annotations(seeds: usize) -> DomainAnnotations {
    let mut annotations = DomainAnnotations::empty(DOMAIN);
    for i in 0..seeds {
        for position in (1..=MOTIF.len()).step_by(3) {
            annotations.add_positional(PositionalAnnotation {
                domain: DOMAIN.to_string(),
                seed: format!("SEED{}", i),
                position: Position(position),
                kind: "BINDING".to_string(),
                value: Some("ATP".to_string()),
                evidence: Vec::new(),
                accession: None,
                residue: None,
                paired_position: None,
                extra: BTreeMap::new(),
            });
        }
    }
    annotations
}

fn benchmark_parse_and_map(c: &mut Criterion) {
    for rows in [10, 100, 1000] {
        let text = synthetic_alignment(rows, rows);
        c.bench_function(&format!("parse_alignment_{}", rows), |b| {
            b.iter(|| Alignment::parse(DOMAIN, black_box(&text), "target/").unwrap())
        });

        let alignment = Alignment::parse(DOMAIN, &text, "target/").unwrap();
        c.bench_function(&format!("column_map_{}", rows), |b| {
            b.iter(|| AlignmentColumnMapper::map(black_box(&alignment)))
        });
    }
}

fn benchmark_conservation(c: &mut Criterion) {
    for rows in [10, 100, 1000] {
        let alignment = Alignment::parse(DOMAIN, &synthetic_alignment(rows, rows), "target/").unwrap();
        let maps = AlignmentColumnMapper::map(&alignment);
        c.bench_function(&format!("conservation_{}", rows), |b| {
            b.iter(|| ConservationScorer::score(black_box(&alignment), &maps))
        });
    }
}

fn benchmark_resolve(c: &mut Criterion) {
    let config = EngineConfig::default();
    for rows in [10, 100] {
        let alignment = Alignment::parse(DOMAIN, &synthetic_alignment(rows, rows), "target/").unwrap();
        let maps = AlignmentColumnMapper::map(&alignment);
        let conservation = ConservationScorer::score(&alignment, &maps);
        let annotations = synthetic_annotations(rows);
        let resolver = TransferResolver::new(&alignment, &maps, &conservation, &config);

        c.bench_function(&format!("resolve_{}", rows), |b| {
            b.iter(|| resolver.resolve(black_box(&annotations)))
        });
    }
}

fn benchmark_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.sample_size(10);

    let registry = AnnotationRegistry::from_domains([synthetic_annotations(20)]);
    for threads in [1, 4] {
        let config = EngineConfig { num_threads: Some(threads), ..Default::default() };
        let engine = TransferEngine::new(&registry, &config);
        let units: Vec<_> =
            (0..16).map(|_| DomainUnit::from_text(DOMAIN, synthetic_alignment(20, 50))).collect();

        group.bench_function(format!("process_batch_16_units_{}_threads", threads), |b| {
            b.iter(|| engine.process_batch(black_box(&units)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_parse_and_map,
    benchmark_conservation,
    benchmark_resolve,
    benchmark_batch
);
criterion_main!(benches);
