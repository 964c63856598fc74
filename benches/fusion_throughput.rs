//! Score fusion and distance throughput benchmark
//!
//! Fusion runs once per analysis over every scored row, so its cost grows
//! with line-level granularity. Distances compress and vectorize whole
//! groups per comparison.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench fusion_throughput
//! ```

use anomalog::distance::{measure_distances, DistanceRequest, GroupColumn};
use anomalog::fusion::{fuse_scores, FusedColumn};
use anomalog::log_line::{LogLine, LogTable};
use anomalog::pipeline::Granularity;
use anomalog::scores::{AnomalyScoreTable, ScoreRow};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const COLUMNS: [&str; 3] = ["kmeans_pred_ano_proba", "rm_pred_ano_proba", "oovd_pred_ano_proba"];

fn score_table(rows: usize) -> AnomalyScoreTable {
    let mut table = AnomalyScoreTable::new(
        Granularity::Line,
        COLUMNS.iter().map(|c| c.to_string()).collect(),
    );
    for i in 0..rows {
        let mut row = ScoreRow::new(format!("run_{}", i % 7), format!("run_{}", i % 7));
        row.line_number = Some(i + 1);
        row.scores = vec![
            Some((i % 13) as f64 * 0.1),
            if i % 5 == 0 { None } else { Some((i % 11) as f64) },
            Some((i % 3) as f64 / 3.0),
        ];
        table.rows.push(row);
    }
    table
}

fn log_table(runs: usize, lines_per_run: usize) -> LogTable {
    let mut lines = Vec::with_capacity(runs * lines_per_run);
    for r in 0..runs {
        for i in 0..lines_per_run {
            lines.push(LogLine {
                run: format!("run_{}", r),
                file_name: "app.log".to_string(),
                orig_file_name: format!("run_{}/app.log", r),
                seq_id: format!("run_{}_app", r),
                line_number: i + 1,
                message: format!("worker {} handled request {} in {} ms", r, i, (i * 7) % 100),
                items: None,
            });
        }
    }
    LogTable::new(lines)
}

fn bench_fuse_scores(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuse_scores");
    let columns: Vec<FusedColumn> = COLUMNS.iter().map(|c| FusedColumn::higher(*c)).collect();

    for rows in [100, 1_000, 10_000] {
        let table = score_table(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, table| {
            b.iter(|| fuse_scores(black_box(table.clone()), &columns).unwrap());
        });
    }
    group.finish();
}

fn bench_measure_distances(c: &mut Criterion) {
    let mut group = c.benchmark_group("measure_distances");
    group.sample_size(20);

    for runs in [4, 16] {
        let table = log_table(runs, 200);
        let request = DistanceRequest::new("run_0", GroupColumn::Run);
        group.bench_with_input(BenchmarkId::from_parameter(runs), &table, |b, table| {
            b.iter(|| measure_distances(black_box(table), &request).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fuse_scores, bench_measure_distances);
criterion_main!(benches);
