use arklow_engine::{lower_source, ArklowConfig, Parser, SourceFile};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn synthetic_file(functions: usize) -> String {
    let mut source = String::from("class Counter {\n  count: number = 0;\n  tick(step: number) { this.count += step; return this.count; }\n}\n");
    for i in 0..functions {
        source.push_str(&format!(
            r#"
function work{i}(items: number[]): number {{
    let total = 0;
    for (const item of items) {{
        total += item > {i} ? item * 2 : item;
    }}
    const label = `work{i}: ${{total}}`;
    const point = {{ x: total, y: items.length }};
    return [point.x, point.y].length + label.length;
}}
"#,
            i = i
        ));
    }
    source.push_str("let counter = new Counter();\ncounter.tick(1);\n");
    source
}

fn bench_parse(c: &mut Criterion) {
    let source = synthetic_file(50);
    c.bench_function("parse_50_functions", |b| {
        b.iter(|| {
            let parser = Parser::new(black_box(&source)).unwrap();
            parser.parse().unwrap()
        });
    });
}

fn bench_lower(c: &mut Criterion) {
    let mut group = c.benchmark_group("lower");
    for functions in [10, 100] {
        let source = SourceFile::new("bench.ets", synthetic_file(functions));
        group.throughput(Throughput::Bytes(source.text().len() as u64));
        for jobs in [1, 4] {
            let mut config = ArklowConfig::default();
            config.lower.jobs = jobs;
            group.bench_with_input(
                BenchmarkId::new(format!("jobs{}", jobs), functions),
                &source,
                |b, source| {
                    b.iter(|| lower_source(black_box(source), &config).unwrap());
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_lower);
criterion_main!(benches);
