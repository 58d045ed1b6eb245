//! Container lookup benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use yard_di::definition::FactoryDefinition;
use yard_di::{Container, ContainerBuilder, Definition};

struct Client {
    api_key: String,
}

fn container(entry_count: usize, compile: bool) -> Container {
    let mut builder = ContainerBuilder::new();
    if compile {
        builder.enable_compilation();
    }
    for i in 0..entry_count {
        builder.add_definition(format!("key.{i}"), Definition::value(format!("value-{i}")));
        builder.add_definition(
            format!("client.{i}"),
            Definition::factory(move |c: &Container| {
                Ok(Client {
                    api_key: c.get_as::<String>(&format!("key.{i}"))?.to_string(),
                })
            }),
        );
    }
    builder.build().unwrap()
}

/// Cached lookups, generic and compiled
fn bench_cached_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_get");

    for compile in [false, true] {
        let container = container(100, compile);
        container.get("client.50").unwrap();
        let label = if compile { "compiled" } else { "generic" };
        group.bench_function(label, |b| {
            b.iter(|| black_box(container.get(black_box("client.50")).unwrap()))
        });
    }

    group.finish();
}

/// First resolution of every entry on a fresh container
fn bench_cold_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_resolution");

    for entry_count in [10, 100, 1000] {
        for compile in [false, true] {
            let label = if compile { "compiled" } else { "generic" };
            group.bench_with_input(BenchmarkId::new(label, entry_count), &entry_count, |b, &count| {
                b.iter_with_setup(
                    || container(count, compile),
                    |container| {
                        for i in 0..count {
                            let client = container.get_as::<Client>(&format!("client.{i}")).unwrap();
                            black_box(client.api_key.len());
                        }
                    },
                )
            });
        }
    }

    group.finish();
}

/// Transient factories always run
fn bench_transient_factory(c: &mut Criterion) {
    let container = ContainerBuilder::new()
        .add_definition(
            "ticket",
            FactoryDefinition::new(|call| Ok(call.requested_entry().name().len())).transient(),
        )
        .build()
        .unwrap();

    c.bench_function("transient_factory", |b| {
        b.iter(|| black_box(container.get("ticket").unwrap()))
    });
}

criterion_group!(
    benches,
    bench_cached_get,
    bench_cold_resolution,
    bench_transient_factory
);
criterion_main!(benches);
