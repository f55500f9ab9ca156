//! Benchmarks for the analysis stages.
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- smells

use std::path::Path;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use devease::analyzers::metrics::{self, MetricOptions};
use devease::analyzers::{PatternRecognizer, SmellDetector};
use devease::cli::analyze_directory;
use devease::config::Config;
use devease::core::{FileSet, Language, ProgressTracker, SourceUnit};
use devease::parser::{extract_declarations, parse_unit};
use devease::pipeline::Engine;

/// Generate a Python module whose size and branching grow with `seed`.
fn generate_python_file(seed: usize, functions: usize) -> String {
    let mut code = format!("\"\"\"Module {seed} for benchmarking.\"\"\"\nimport math\n\n");
    code.push_str(&format!("class Service{seed}:\n    def __init__(self):\n"));
    for f in 0..4 {
        code.push_str(&format!("        self.field_{f} = {f}\n"));
    }
    for f in 0..functions {
        let level = (seed + f) % 5;
        code.push_str(&format!("\n    def handle_{f}(self, items, limit):\n"));
        code.push_str("        total = 0\n");
        code.push_str("        for item in items:\n");
        for depth in 0..level {
            let indent = "    ".repeat(depth + 3);
            code.push_str(&format!("{indent}if item > {depth} and limit > 0:\n"));
        }
        let indent = "    ".repeat(level + 3);
        code.push_str(&format!("{indent}total += math.sqrt(item)\n"));
        code.push_str("        return total\n");
    }
    code
}

fn create_benchmark_dir(file_count: usize) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    for i in 0..file_count {
        std::fs::write(
            temp.path().join(format!("module_{i}.py")),
            generate_python_file(i, 10),
        )
        .expect("Failed to write file");
    }
    temp
}

/// Benchmark parsing and declaration extraction.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for functions in [10, 50, 200].iter() {
        let unit = SourceUnit::with_language(
            None,
            Language::Python,
            generate_python_file(0, *functions),
        );
        group.throughput(Throughput::Bytes(unit.content.len() as u64));
        group.bench_with_input(BenchmarkId::new("functions", functions), functions, |b, _| {
            b.iter(|| {
                let parsed = parse_unit(&unit, Duration::ZERO).unwrap();
                black_box(extract_declarations(&parsed).declarations.len())
            });
        });
    }

    group.finish();
}

/// Benchmark metric extraction and smell detection on a pre-parsed unit.
fn bench_smells(c: &mut Criterion) {
    let mut group = c.benchmark_group("smells");
    let detector = SmellDetector::default();
    let recognizer = PatternRecognizer::default();

    for functions in [10, 50, 200].iter() {
        let unit = SourceUnit::with_language(
            None,
            Language::Python,
            generate_python_file(1, *functions),
        );
        let parsed = parse_unit(&unit, Duration::ZERO).unwrap();
        let summary = extract_declarations(&parsed);
        let file_metrics = metrics::extract(&parsed, &summary, MetricOptions::default());

        group.throughput(Throughput::Elements(*functions as u64));
        group.bench_with_input(BenchmarkId::new("metrics", functions), functions, |b, _| {
            b.iter(|| {
                black_box(metrics::extract(&parsed, &summary, MetricOptions::default()).loc)
            });
        });
        group.bench_with_input(BenchmarkId::new("rules", functions), functions, |b, _| {
            b.iter(|| black_box(detector.detect(&unit, &summary, &file_metrics).total_smells));
        });
        group.bench_with_input(BenchmarkId::new("patterns", functions), functions, |b, _| {
            b.iter(|| black_box(recognizer.recognize(&unit, &summary, &file_metrics).confidence));
        });
    }

    group.finish();
}

/// Benchmark the full single-file pipeline.
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let engine = Engine::default();

    for functions in [10, 50].iter() {
        let content = generate_python_file(2, *functions);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("functions", functions), functions, |b, _| {
            b.iter(|| {
                let result = engine
                    .analyze(Some(Path::new("module.py")), &content)
                    .unwrap();
                black_box(result.quality_score.overall_score)
            });
        });
    }

    group.finish();
}

/// Benchmark parallel directory analysis.
fn bench_directory(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory");
    group.sample_size(20);
    let engine = Engine::from_config(&Config::default());

    for size in [10, 50].iter() {
        let temp = create_benchmark_dir(*size);
        let files = FileSet::from_path(temp.path(), &[]).unwrap();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("files", size), size, |b, _| {
            b.iter(|| {
                let progress = ProgressTracker::hidden(files.len());
                black_box(analyze_directory(&engine, &files, &progress).total_hours)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_smells,
    bench_pipeline,
    bench_directory
);
criterion_main!(benches);
