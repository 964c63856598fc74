// Enhancement tests over small realistic log tables

use super::*;
use crate::log_line::LogLine;

fn table(messages: &[&str]) -> LogTable {
    LogTable::new(
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| LogLine {
                run: "run1".to_string(),
                file_name: "app.log".to_string(),
                orig_file_name: "run1/app.log".to_string(),
                seq_id: "run1_app".to_string(),
                line_number: i + 1,
                message: m.to_string(),
                items: None,
            })
            .collect(),
    )
}

#[test]
fn test_parse_every_kind() {
    for kind in ItemListKind::ALL {
        assert_eq!(kind.as_str().parse::<ItemListKind>().unwrap(), kind);
    }
}

#[test]
fn test_unknown_kind_is_unsupported() {
    let err = "e_bigrams".parse::<ItemListKind>().unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedEnhancement(ref k) if k == "e_bigrams"));
}

#[test]
fn test_words_without_mask() {
    let t = table(&["GET /index 200", "POST /login 500"]);
    let enhanced = enhance(&t, &EnhanceOptions::default()).unwrap();

    assert!(enhanced.is_enhanced());
    assert_eq!(
        enhanced.lines[0].items,
        Some(ItemValue::List(vec![
            "GET".to_string(),
            "/index".to_string(),
            "200".to_string()
        ]))
    );
    // Source table is left untouched
    assert!(!t.is_enhanced());
}

#[test]
fn test_words_with_mask() {
    let t = table(&["retry 3 of 5"]);
    let options = EnhanceOptions::new(ItemListKind::Words, MaskKind::Myllari);
    let enhanced = enhance(&t, &options).unwrap();
    assert_eq!(
        enhanced.lines[0].items.as_ref().unwrap().to_items(),
        vec!["retry", "<NUM>", "of", "<NUM>"]
    );
}

#[test]
fn test_trigrams() {
    let t = table(&["abcd"]);
    let options = EnhanceOptions::new(ItemListKind::Trigrams, MaskKind::None);
    let enhanced = enhance(&t, &options).unwrap();
    assert_eq!(
        enhanced.lines[0].items.as_ref().unwrap().to_items(),
        vec!["abc", "bcd"]
    );
}

#[test]
fn test_event_kinds_produce_scalar_ids() {
    let t = table(&[
        "Connection from alice closed",
        "Connection from bob closed",
        "Disk full on sda",
    ]);

    for kind in ItemListKind::ALL.into_iter().filter(|k| k.is_event_id()) {
        let enhanced = enhance(&t, &EnhanceOptions::new(kind, MaskKind::None)).unwrap();
        assert!(
            enhanced
                .lines
                .iter()
                .all(|l| matches!(l.items, Some(ItemValue::Scalar(_)))),
            "{} should produce scalar ids",
            kind
        );
    }
}

#[test]
fn test_drain_ids_match_across_tables() {
    let train = table(&["Connection from alice closed", "Connection from bob closed"]);
    let test = table(&["Connection from carol closed", "Connection from dave closed"]);
    let options = EnhanceOptions::new(ItemListKind::DrainEvent, MaskKind::None);

    let train = enhance(&train, &options).unwrap();
    let test = enhance(&test, &options).unwrap();
    assert_eq!(train.lines[0].items, test.lines[0].items);
}

#[test]
fn test_masked_drain_groups_numbers() {
    let t = table(&["took 12 ms", "took 480 ms"]);
    let options = EnhanceOptions::new(ItemListKind::DrainEvent, MaskKind::DrainOrig);
    let enhanced = enhance(&t, &options).unwrap();
    assert_eq!(enhanced.lines[0].items, enhanced.lines[1].items);
    assert_eq!(
        enhanced.lines[0].items,
        Some(ItemValue::Scalar(template_id("took <*> ms")))
    );
}
