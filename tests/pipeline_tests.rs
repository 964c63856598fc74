// Pipeline integration tests across every granularity

mod utils;

use anomalog::config::PipelineConfig;
use anomalog::detector::ModelKind;
use anomalog::enhancer::{ItemListKind, MaskKind};
use anomalog::pipeline::{Granularity, ManualTrainTestPipeline, PipelineState};
use anomalog::AnalysisError;
use tempfile::TempDir;
use utils::{faulty_lines, normal_lines, train_test_dirs, write_log};

fn config(train: &std::path::Path, test: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        train_path: train.to_path_buf(),
        test_path: test.to_path_buf(),
        mask: MaskKind::Myllari,
        models: vec![ModelKind::KMeans, ModelKind::Rarity, ModelKind::OutOfVocabulary],
        ..PipelineConfig::default()
    }
}

#[test]
fn test_line_level_scores_every_test_line() {
    let (_tmp, train, test) = train_test_dirs();
    let mut pipeline = ManualTrainTestPipeline::new(config(&train, &test)).unwrap();
    let results = pipeline.run().unwrap().clone();

    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    assert_eq!(results.granularity, Granularity::Line);
    assert_eq!(results.len(), pipeline.test().unwrap().len());
    assert_eq!(
        results.columns,
        vec!["kmeans_pred_ano_proba", "rm_pred_ano_proba", "oovd_pred_ano_proba"]
    );
    // Line level is not fused
    assert!(!results.is_fused());
    assert!(results.rows.iter().all(|r| r.line_number.is_some()));
}

#[test]
fn test_line_level_flags_unseen_lines() {
    let (_tmp, train, test) = train_test_dirs();
    let mut pipeline = ManualTrainTestPipeline::new(config(&train, &test)).unwrap();
    let results = pipeline.run().unwrap();

    let panic_row = results
        .rows
        .iter()
        .position(|r| r.key == "correct_3_app" && r.line_number == Some(11))
        .unwrap();
    assert_eq!(results.score(panic_row, "oovd_pred_ano_proba"), Some(1.0));
    assert_eq!(results.score(0, "oovd_pred_ano_proba"), Some(0.0));
}

#[test]
fn test_run_level_fuses_model_columns() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        run_level: true,
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    let results = pipeline.run().unwrap();

    let keys: Vec<&str> = results.rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["correct_1", "correct_3"]);
    assert!(results.rows.iter().all(|r| r.zscore_sum.is_some()));
    assert!(results.rows.iter().all(|r| r.rank_sum.is_some()));
    // The faulty run is the most anomalous
    assert_eq!(results.top(1)[0].key, "correct_3");
    assert_eq!(results.summaries.len(), 3);
}

#[test]
fn test_file_level_global() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        file_level: true,
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    let results = pipeline.run().unwrap();

    let keys: Vec<&str> = results.rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["correct_1_app", "correct_3_app", "correct_3_cache"]);
    assert!(results.is_fused());
}

#[test]
fn test_file_matched_uses_common_names_only() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        file_level: true,
        match_filenames: true,
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    let results = pipeline.run().unwrap();

    // Only app.log exists on both sides; cache.log has no reference
    assert_eq!(results.granularity, Granularity::FileMatched);
    assert!(results
        .rows
        .iter()
        .all(|r| r.file_name.as_deref() == Some("app.log")));
    assert_eq!(results.len(), 2);
}

#[test]
fn test_line_matched_uses_common_names_only() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        match_filenames: true,
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    let results = pipeline.run().unwrap();

    assert_eq!(results.granularity, Granularity::LineMatched);
    assert_eq!(results.len(), 10 + 12);
    assert!(results
        .rows
        .iter()
        .all(|r| r.file_name.as_deref() == Some("app.log")));
}

#[test]
fn test_no_common_files() {
    let tmp = TempDir::new().unwrap();
    let train = tmp.path().join("train");
    let test = tmp.path().join("test");
    write_log(&train, "correct_1/a.log", &normal_lines(4));
    write_log(&test, "correct_3/b.log", &faulty_lines(4));

    let config = PipelineConfig {
        file_level: true,
        match_filenames: true,
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, AnalysisError::NoCommonFiles));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.results().is_none());
}

#[test]
fn test_run_filter_on_test_side() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        run_level: true,
        runs_to_include: Some(vec!["correct_3".to_string()]),
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    let results = pipeline.run().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.rows[0].key, "correct_3");
}

#[test]
fn test_filtered_load_report_counts_kept_test_lines() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        runs_to_include: Some(vec!["correct_3".to_string()]),
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    pipeline.load().unwrap();

    let train_lines = pipeline.train().unwrap().len();
    let test_lines = pipeline.test().unwrap().len();
    assert_eq!(pipeline.test().unwrap().runs(), vec!["correct_3"]);
    assert_eq!(pipeline.test().unwrap().report.kept_lines, test_lines);
    assert_eq!(pipeline.load_report().kept_lines, train_lines + test_lines);
}

#[test]
fn test_empty_filter_keeps_everything() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        runs_to_include: Some(Vec::new()),
        files_to_include: Some(Vec::new()),
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    pipeline.load().unwrap();
    assert_eq!(pipeline.test().unwrap().runs(), vec!["correct_1", "correct_3"]);
}

#[test]
fn test_filter_matching_nothing_fails_load() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        files_to_include: Some(vec!["missing.log".to_string()]),
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
    assert!(matches!(pipeline.load(), Err(AnalysisError::DataLoad { .. })));
}

#[test]
fn test_stages_step_by_step() {
    let (_tmp, train, test) = train_test_dirs();
    let config = PipelineConfig {
        file_level: true,
        item_list: ItemListKind::DrainEvent,
        models: vec![ModelKind::IsolationForest, ModelKind::DecisionTree],
        ..config(&train, &test)
    };
    let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();

    pipeline.load().unwrap();
    assert_eq!(pipeline.state(), PipelineState::Loaded);
    assert!(matches!(
        pipeline.analyze(),
        Err(AnalysisError::StageOrder { .. })
    ));

    pipeline.enhance().unwrap();
    assert!(pipeline.train().unwrap().is_enhanced());
    assert!(pipeline.test().unwrap().is_enhanced());

    pipeline.aggregate().unwrap();
    assert_eq!(pipeline.state(), PipelineState::Aggregated);

    pipeline.analyze().unwrap();
    assert_eq!(pipeline.state(), PipelineState::Analyzed);
    let results = pipeline.results().unwrap();
    assert_eq!(results.columns, vec!["if_pred_ano_proba", "dt_pred_ano_proba"]);
}

#[test]
fn test_conflicting_granularity_before_any_io() {
    let config = PipelineConfig {
        train_path: "/no/such/train".into(),
        test_path: "/no/such/test".into(),
        run_level: true,
        file_level: true,
        ..PipelineConfig::default()
    };
    assert!(matches!(
        ManualTrainTestPipeline::new(config),
        Err(AnalysisError::ConflictingGranularity(_))
    ));
}

#[test]
fn test_every_item_list_kind_runs() {
    let (_tmp, train, test) = train_test_dirs();
    for item_list in ItemListKind::ALL {
        let config = PipelineConfig {
            run_level: true,
            item_list,
            models: vec![ModelKind::Rarity],
            ..config(&train, &test)
        };
        let mut pipeline = ManualTrainTestPipeline::new(config).unwrap();
        let results = pipeline.run().unwrap();
        assert_eq!(results.len(), 2, "item list {}", item_list);
    }
}
