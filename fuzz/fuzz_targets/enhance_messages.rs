#![no_main]

use anomalog::enhancer::{enhance, EnhanceOptions, ItemListKind, MaskKind};
use anomalog::log_line::{LogLine, LogTable};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    item_list: ItemListKind,
    mask: MaskKind,
    messages: Vec<String>,
}

fuzz_target!(|input: Input| {
    let lines = input
        .messages
        .into_iter()
        .enumerate()
        .map(|(i, message)| LogLine {
            run: "run".to_string(),
            file_name: "a.log".to_string(),
            orig_file_name: "run/a.log".to_string(),
            seq_id: "run_a".to_string(),
            line_number: i + 1,
            message,
            items: None,
        })
        .collect();
    let table = LogTable::new(lines);

    // Any message mix must enhance every line without panicking
    let options = EnhanceOptions::new(input.item_list, input.mask);
    if let Ok(enhanced) = enhance(&table, &options) {
        assert_eq!(enhanced.missing_items(), 0);
    }
});
