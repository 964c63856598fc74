// Detector dispatch tests on small word documents

use super::*;

fn docs(raw: &[&str]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|d| d.split_whitespace().map(str::to_string).collect())
        .collect()
}

fn detector() -> AnomalyDetector {
    let train = docs(&[
        "connection opened for user",
        "connection closed for user",
        "connection opened for user",
        "connection closed for user",
    ]);
    let test = docs(&[
        "connection opened for user",
        "kernel panic fatal error fatal error",
    ]);
    AnomalyDetector::new(train, test, VectorizerKind::Count, 42)
}

#[test]
fn test_parse_models() {
    for model in ModelKind::ALL {
        assert_eq!(model.tag().parse::<ModelKind>().unwrap(), model);
    }
    assert_eq!(ModelKind::IsolationForest.column(), "if_pred_ano_proba");
    assert!(matches!(
        "svm".parse::<ModelKind>(),
        Err(AnalysisError::UnsupportedModel(ref m)) if m == "svm"
    ));
}

#[test]
fn test_every_model_scores_each_test_document() {
    let d = detector();
    for model in ModelKind::ALL {
        let scores = d.train_and_predict(model).unwrap();
        assert_eq!(scores.len(), d.test_len(), "model {}", model);
        assert!(scores.iter().all(|s| s.is_finite()), "model {}", model);
    }
}

#[test]
fn test_novel_document_scores_higher() {
    let d = detector();
    for model in [
        ModelKind::KMeans,
        ModelKind::Rarity,
        ModelKind::OutOfVocabulary,
        ModelKind::LogisticRegression,
        ModelKind::DecisionTree,
    ] {
        let scores = d.train_and_predict(model).unwrap();
        assert!(scores[1] > scores[0], "model {} scores {:?}", model, scores);
    }
}

#[test]
fn test_classifiers_separate_unseen_rows_from_reference_rows() {
    let d = AnomalyDetector::new(
        docs(&["disk ok", "disk ok"]),
        docs(&["disk ok", "fan failure"]),
        VectorizerKind::Count,
        0,
    );

    let lr = d.train_and_predict(ModelKind::LogisticRegression).unwrap();
    assert!(lr.iter().all(|p| (0.0..=1.0).contains(p)), "lr {:?}", lr);
    assert!(lr[0] < 0.5 && lr[1] > 0.5, "lr {:?}", lr);

    let dt = d.train_and_predict(ModelKind::DecisionTree).unwrap();
    assert_eq!(dt, vec![0.0, 1.0]);
}

#[test]
fn test_seeded_forest_is_repeatable() {
    let a = detector().train_and_predict(ModelKind::IsolationForest).unwrap();
    let b = detector().train_and_predict(ModelKind::IsolationForest).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_empty_reference_set() {
    let d = AnomalyDetector::new(Vec::new(), docs(&["a"]), VectorizerKind::Count, 0);
    assert!(matches!(
        d.train_and_predict(ModelKind::Rarity),
        Err(DetectorError::InsufficientData { .. })
    ));
}

#[test]
fn test_empty_vocabulary() {
    let d = AnomalyDetector::new(vec![Vec::new()], docs(&["a"]), VectorizerKind::Count, 0);
    assert!(matches!(
        d.train_and_predict(ModelKind::KMeans),
        Err(DetectorError::EmptyVocabulary)
    ));
}

#[test]
fn test_empty_test_set() {
    let d = AnomalyDetector::new(docs(&["a"]), Vec::new(), VectorizerKind::Tfidf, 0);
    assert!(d.train_and_predict(ModelKind::KMeans).unwrap().is_empty());
}

#[test]
fn test_summarize_column_name() {
    let d = detector();
    let scores = d.train_and_predict(ModelKind::OutOfVocabulary).unwrap();
    let summary = d.summarize(ModelKind::OutOfVocabulary, &scores).unwrap();
    assert_eq!(summary.column, "oovd_pred_ano_proba");
    assert_eq!(summary.count, 2);
    assert_eq!(summary.max, 1.0);
}
