//! Run and file level aggregation of enhanced log lines
//!
//! Lines are grouped by run, by file (`seq_id`), or by file while keeping the
//! file name for cross-run matching. Each group's items are the concatenation
//! of its lines' items in line order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::enhancer::{enhance, EnhanceOptions};
use crate::error::{AnalysisError, Result};
use crate::log_line::{LogLine, LogTable};

/// Grouping applied by [`aggregate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationLevel {
    Run,
    File,
    FileWithName,
}

impl fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationLevel::Run => write!(f, "run"),
            AggregationLevel::File => write!(f, "file"),
            AggregationLevel::FileWithName => write!(f, "file_with_name"),
        }
    }
}

/// One aggregated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// `run` or `seq_id`, depending on the level
    pub key: String,
    pub run: String,
    /// Only set for [`AggregationLevel::FileWithName`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub line_count: usize,
    pub items: Vec<String>,
}

/// Groups sorted by key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTable {
    pub level: AggregationLevel,
    pub groups: Vec<Group>,
}

impl GroupTable {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.key.as_str()).collect()
    }

    /// Groups carrying `file_name`
    pub fn with_file_name<'a>(&'a self, file_name: &'a str) -> impl Iterator<Item = &'a Group> {
        self.groups
            .iter()
            .filter(move |g| g.file_name.as_deref() == Some(file_name))
    }

    /// Distinct file names, sorted (empty unless grouped with names)
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .iter()
            .filter_map(|g| g.file_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Item documents in group order
    pub fn documents(&self) -> Vec<Vec<String>> {
        self.groups.iter().map(|g| g.items.clone()).collect()
    }
}

fn group_key(line: &LogLine, level: AggregationLevel) -> &str {
    match level {
        AggregationLevel::Run => &line.run,
        AggregationLevel::File | AggregationLevel::FileWithName => &line.seq_id,
    }
}

/// Group `table` at `level`
///
/// When any line has no items yet, the table is enhanced with `options` first.
pub fn aggregate(
    table: &LogTable,
    level: AggregationLevel,
    options: &EnhanceOptions,
) -> Result<GroupTable> {
    let enhanced;
    let table = if table.missing_items() > 0 {
        debug!(
            missing = table.missing_items(),
            "items missing, enhancing before aggregation"
        );
        enhanced = enhance(table, options)?;
        &enhanced
    } else {
        table
    };

    let mut by_key: BTreeMap<&str, Group> = BTreeMap::new();
    for line in &table.lines {
        let Some(value) = &line.items else {
            return Err(AnalysisError::MissingItemList {
                missing: table.missing_items(),
                total: table.len(),
            });
        };
        let key = group_key(line, level);
        let group = by_key.entry(key).or_insert_with(|| Group {
            key: key.to_string(),
            run: line.run.clone(),
            file_name: match level {
                AggregationLevel::FileWithName => Some(line.file_name.clone()),
                _ => None,
            },
            line_count: 0,
            items: Vec::new(),
        });
        group.line_count += 1;
        value.flatten_into(&mut group.items);
    }

    let groups: Vec<Group> = by_key.into_values().collect();
    debug!(level = %level, groups = groups.len(), "aggregated log lines");
    Ok(GroupTable { level, groups })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::{ItemListKind, MaskKind};
    use crate::log_line::ItemValue;

    fn line(run: &str, file: &str, n: usize, msg: &str) -> LogLine {
        LogLine {
            run: run.to_string(),
            file_name: file.to_string(),
            orig_file_name: format!("{}/{}", run, file),
            seq_id: format!("{}_{}", run, file.trim_end_matches(".log")),
            line_number: n,
            message: msg.to_string(),
            items: None,
        }
    }

    fn sample() -> LogTable {
        LogTable::new(vec![
            line("r2", "a.log", 1, "gamma"),
            line("r1", "b.log", 1, "beta one"),
            line("r1", "a.log", 1, "alpha"),
            line("r1", "a.log", 2, "alpha two"),
        ])
    }

    #[test]
    fn test_run_level_sorted_and_ordered() {
        let groups = aggregate(&sample(), AggregationLevel::Run, &EnhanceOptions::default()).unwrap();
        assert_eq!(groups.keys(), vec!["r1", "r2"]);
        assert_eq!(groups.groups[0].line_count, 3);
        assert_eq!(
            groups.groups[0].items,
            vec!["beta", "one", "alpha", "alpha", "two"]
        );
    }

    #[test]
    fn test_file_level_keys_are_seq_ids() {
        let groups =
            aggregate(&sample(), AggregationLevel::File, &EnhanceOptions::default()).unwrap();
        assert_eq!(groups.keys(), vec!["r1_a", "r1_b", "r2_a"]);
        assert!(groups.groups.iter().all(|g| g.file_name.is_none()));
    }

    #[test]
    fn test_file_with_name_keeps_names() {
        let groups = aggregate(
            &sample(),
            AggregationLevel::FileWithName,
            &EnhanceOptions::default(),
        )
        .unwrap();
        assert_eq!(groups.file_names(), vec!["a.log", "b.log"]);
        assert_eq!(groups.with_file_name("a.log").count(), 2);
    }

    #[test]
    fn test_existing_items_used_as_is() {
        let mut table = sample();
        for l in &mut table.lines {
            l.items = Some(ItemValue::Scalar("e1".to_string()));
        }
        // Options would produce trigrams, but items are already present
        let options = EnhanceOptions::new(ItemListKind::Trigrams, MaskKind::None);
        let groups = aggregate(&table, AggregationLevel::Run, &options).unwrap();
        assert_eq!(groups.groups[1].items, vec!["e1"]);
    }

    #[test]
    fn test_aggregation_is_repeatable() {
        let options = EnhanceOptions::default();
        let a = aggregate(&sample(), AggregationLevel::File, &options).unwrap();
        let b = aggregate(&sample(), AggregationLevel::File, &options).unwrap();
        assert_eq!(a, b);
    }
}
