//! Benchmarks for symbol resolution and linking.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use knit_core::builders::{Builder, CodeGraphBuilder, GraphBuilder};
use knit_core::ontology::{attr, class, predicate};
use knit_core::{Dataset, Node};
use serde_json::json;

/// `files` modules spread over 10 packages, each defining two functions and
/// importing from its neighbours.
fn synthetic_project(files: usize) -> Dataset {
    let mut nodes = Vec::with_capacity(files * 3);
    for i in 0..files {
        let path = format!("pkg{}/mod{}.py", i % 10, i);
        let next = (i + 1) % files;
        let prev = (i + files - 1) % files;
        let imports = json!([
            {"module": format!("pkg{}.mod{}", next % 10, next), "name": format!("func_{}_a", next), "level": 0},
            {"module": format!("mod{}", prev), "name": "missing", "level": 1},
            {"module": "thirdparty.lib", "name": "x", "level": 0}
        ]);

        nodes.push(
            Node::new(format!("file{}", i), class::FILE)
                .with_attr(attr::FILE_PATH, path.clone())
                .with_attr(attr::IMPORTS, imports),
        );
        for suffix in ["a", "b"] {
            nodes.push(
                Node::new(format!("func{}{}", i, suffix), class::FUNCTION)
                    .with_attr(attr::FILE_PATH, path.clone())
                    .with_attr(attr::FUNCTION_NAME, format!("func_{}_{}", i, suffix)),
            );
        }
    }
    Dataset::new(nodes)
}

fn synthetic_document(chunks: usize) -> Dataset {
    let mut nodes = vec![Node::new("doc", class::DOCUMENT)];
    for i in 0..chunks {
        let mut node = Node::new(format!("chunk{}", i), class::CHUNK)
            .with_attr(attr::TEXT, format!("chunk body {}", i))
            .with_relation(predicate::BELONGS_TO, "doc");
        if i + 1 < chunks {
            node = node.with_relation(predicate::NEXT, format!("chunk{}", i + 1));
        }
        nodes.push(node);
    }
    Dataset::new(nodes)
}

fn bench_symbol_resolution(c: &mut Criterion) {
    let builder = CodeGraphBuilder::new();
    let mut group = c.benchmark_group("code_graph");
    for files in [100, 1_000] {
        let input = synthetic_project(files);
        group.bench_with_input(BenchmarkId::from_parameter(files), &input, |b, input| {
            b.iter(|| black_box(builder.build(input)))
        });
    }
    group.finish();
}

fn bench_linker(c: &mut Criterion) {
    let builder = GraphBuilder::new();
    let input = synthetic_document(10_000);
    c.bench_function("graph_10000_chunks", |b| {
        b.iter(|| black_box(builder.build(&input)))
    });
}

criterion_group!(benches, bench_symbol_resolution, bench_linker);
criterion_main!(benches);
