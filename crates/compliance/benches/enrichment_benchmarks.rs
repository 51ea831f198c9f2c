use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::collections::BTreeMap;
use std::sync::Arc;

use siteguard_compliance::{Enricher, Rule, RuleCatalog, format_alert};
use siteguard_core::PersonId;
use siteguard_events::{MissingItem, Schema, Violation, ViolationBatch};

const HAZARDS: [&str; 6] = [
    "hardhat",
    "mask",
    "safety vest",
    "gloves",
    "safety_goggles",
    "harness",
];

fn catalog(states: usize) -> Arc<RuleCatalog> {
    let mut raw = BTreeMap::new();
    for s in 0..states {
        let hazards = HAZARDS
            .iter()
            .take(4)
            .map(|h| (h.to_string(), Rule::new(format!("rule {s}/{h}"), "Fine")))
            .collect();
        raw.insert(format!("State{s}"), hazards);
    }
    Arc::new(RuleCatalog::from_map(raw))
}

fn batch(persons: u64) -> ViolationBatch {
    let violations = (0..persons)
        .map(|p| {
            let missing = HAZARDS
                .iter()
                .cycle()
                .skip(p as usize)
                .take(3)
                .filter_map(|h| MissingItem::new(*h).ok())
                .collect();
            Violation::new(PersonId(p), missing)
        })
        .collect();
    ViolationBatch::new(1, 30, "State0", violations)
}

fn bench_enrich_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("enrich_batch");
    let enricher = Enricher::new(catalog(50));

    for persons in [1u64, 10, 100, 1000].iter() {
        let input = batch(*persons);
        group.throughput(Throughput::Elements(input.item_count() as u64));
        group.bench_with_input(BenchmarkId::new("typed", persons), &input, |b, input| {
            b.iter(|| enricher.enrich(black_box(input)));
        });

        let body = serde_json::to_value(&input).unwrap();
        group.bench_with_input(BenchmarkId::new("decode_and_enrich", persons), &body, |b, body| {
            b.iter(|| {
                enricher
                    .enrich_message(Schema::ViolationBatchV2, black_box(body))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_format_alert(c: &mut Criterion) {
    let enricher = Enricher::new(catalog(1));
    let enriched = enricher.enrich(&batch(100));

    c.bench_function("format_alert_100_persons", |b| {
        b.iter(|| format_alert(black_box(&enriched)));
    });
}

criterion_group!(benches, bench_enrich_batch, bench_format_alert);
criterion_main!(benches);
