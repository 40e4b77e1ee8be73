use critlink_core::artifact::LinkArtifact;
use critlink_core::graph::RelationshipSet;
use critlink_core::pipeline::process;
use critlink_core::rewrite::rewrite_artifact;
use critlink_core::universe::CodeUniverse;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const TIERS: [(&str, usize); 3] = [("small", 200), ("medium", 1_000), ("large", 4_000)];

/// Deterministic pairs over a four-level code space, with a share of
/// mutual links and a few leading-zero ties.
fn synthetic(edges: usize, seed: u64) -> (CodeUniverse, RelationshipSet) {
    let mut state = seed;
    let mut next = move |bound: u64| {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) % bound
    };

    let mut codes: Vec<String> = Vec::new();
    for se in 1..=6 {
        for section in 1..=5 {
            for standard in 1..=4 {
                for criterion in 1..=5 {
                    codes.push(format!("{se}.{section}.{standard}.{criterion}"));
                }
            }
        }
    }
    codes.push("1.1.1.01".to_string());

    let universe: CodeUniverse = codes.iter().map(String::as_str).collect();
    let mut pairs = RelationshipSet::new();
    while pairs.len() < edges {
        let len = codes.len() as u64;
        let target = codes[usize::try_from(next(len)).unwrap_or(0)].clone();
        let source = codes[usize::try_from(next(len)).unwrap_or(0)].clone();
        if next(4) == 0 {
            pairs.insert((source.clone(), target.clone()));
        }
        pairs.insert((target, source));
    }
    (universe, pairs)
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline.tiered");

    for (name, edges) in TIERS {
        let (universe, pairs) = synthetic(edges, 0xC0DE_u64 + edges as u64);
        group.throughput(Throughput::Elements(pairs.len() as u64));

        group.bench_with_input(BenchmarkId::new("process", name), &pairs, |b, pairs| {
            b.iter(|| black_box(process(pairs, &universe).map(|p| p.graph.edge_count())));
        });

        let artifact: LinkArtifact = match process(&pairs, &universe) {
            Ok(processed) => processed.artifact(),
            Err(_) => continue,
        };
        group.bench_with_input(BenchmarkId::new("rewrite", name), &artifact, |b, artifact| {
            b.iter(|| black_box(rewrite_artifact(artifact).map(|r| r.bytes.len())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
