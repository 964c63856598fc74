// Distance engine integration tests

mod utils;

use anomalog::distance::{measure_distances, DistanceRequest, GroupColumn};
use anomalog::loader::{load_logs, LogFormat};
use anomalog::log_line::LogTable;
use anomalog::AnalysisError;
use tempfile::TempDir;
use utils::{faulty_lines, normal_lines, write_log};

fn three_runs() -> (TempDir, LogTable) {
    let tmp = TempDir::new().unwrap();
    write_log(tmp.path(), "run_a/app.log", &normal_lines(6));
    write_log(tmp.path(), "run_b/app.log", &normal_lines(4));
    write_log(tmp.path(), "run_c/app.log", &faulty_lines(5));
    let table = load_logs(tmp.path(), LogFormat::Raw).unwrap();
    (tmp, table)
}

#[test]
fn test_one_row_per_comparison_in_sorted_order() {
    let (_tmp, table) = three_runs();
    let rows = measure_distances(&table, &DistanceRequest::new("run_b", GroupColumn::Run)).unwrap();

    let comparisons: Vec<&str> = rows.iter().map(|r| r.comparison.as_str()).collect();
    assert_eq!(comparisons, vec!["run_a", "run_c"]);
    assert!(rows.iter().all(|r| r.target == "run_b" && r.target_lines == 4));
    assert_eq!(rows[0].comparison_lines, 6);
    assert_eq!(rows[1].comparison_lines, 7);
    assert!(rows.iter().all(|r| r.zscore_sum.is_some() && r.rank_sum.is_some()));
}

#[test]
fn test_symmetric_measures_swap_sizes() {
    let (_tmp, table) = three_runs();
    let ab = measure_distances(
        &table,
        &DistanceRequest::new("run_a", GroupColumn::Run).with_comparisons(vec!["run_c".into()]),
    )
    .unwrap();
    let ba = measure_distances(
        &table,
        &DistanceRequest::new("run_c", GroupColumn::Run).with_comparisons(vec!["run_a".into()]),
    )
    .unwrap();

    assert_eq!(ab.len(), 1);
    assert_eq!(ba.len(), 1);
    assert_eq!(ab[0].target_lines, ba[0].comparison_lines);
    assert_eq!(ab[0].comparison_lines, ba[0].target_lines);

    let (c1, c2) = (ab[0].cosine.unwrap(), ba[0].cosine.unwrap());
    assert!((c1 - c2).abs() < 1e-12);
    assert_eq!(ab[0].jaccard, ba[0].jaccard);
    // Containment depends on which side is the target
    assert_ne!(ab[0].containment, ba[0].containment);
}

#[test]
fn test_faulty_run_is_most_distant() {
    let (_tmp, table) = three_runs();
    let rows = measure_distances(&table, &DistanceRequest::new("run_a", GroupColumn::Run)).unwrap();
    let b = rows.iter().find(|r| r.comparison == "run_b").unwrap();
    let c = rows.iter().find(|r| r.comparison == "run_c").unwrap();
    assert!(c.zscore_sum > b.zscore_sum);
    assert!(c.jaccard < b.jaccard);
}

#[test]
fn test_only_group_has_no_comparisons() {
    let tmp = TempDir::new().unwrap();
    write_log(tmp.path(), "solo/app.log", &normal_lines(3));
    let table = load_logs(tmp.path(), LogFormat::Raw).unwrap();

    let err = measure_distances(&table, &DistanceRequest::new("solo", GroupColumn::Run)).unwrap_err();
    assert!(matches!(err, AnalysisError::NoComparisonGroups { ref target } if target == "solo"));
}

#[test]
fn test_filter_excluding_all_comparisons() {
    let (_tmp, table) = three_runs();
    let request = DistanceRequest::new("run_a", GroupColumn::Run)
        .with_comparisons(vec!["run_z".into(), "run_a".into()]);
    assert!(matches!(
        measure_distances(&table, &request),
        Err(AnalysisError::NoComparisonGroups { .. })
    ));
}

#[test]
fn test_unknown_target() {
    let (_tmp, table) = three_runs();
    let err =
        measure_distances(&table, &DistanceRequest::new("run_x", GroupColumn::Run)).unwrap_err();
    assert!(matches!(err, AnalysisError::UnknownGroup(_)));
}

#[test]
fn test_file_grouping_uses_seq_ids() {
    let (_tmp, table) = three_runs();
    let rows =
        measure_distances(&table, &DistanceRequest::new("run_a_app", GroupColumn::File)).unwrap();
    let comparisons: Vec<&str> = rows.iter().map(|r| r.comparison.as_str()).collect();
    assert_eq!(comparisons, vec!["run_b_app", "run_c_app"]);
}
