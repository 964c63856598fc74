//! Log line enhancement: masking and item list extraction
//!
//! [`enhance`] applies an optional [`MaskKind`] to every message and then
//! derives the item list selected by [`ItemListKind`]: a token list for words
//! and trigrams, or a template id for the event miners.

mod brain;
mod drain;
mod iplom;
mod mask;
mod template;
mod tip;
mod tokenize;

pub use brain::Brain;
pub use drain::{Drain, DrainConfig};
pub use iplom::{Iplom, IplomConfig};
pub use mask::{Mask, MaskKind};
pub use template::{template_id, TemplateMiner, WILDCARD};
pub use tip::{Tip, TipConfig};
pub use tokenize::{char_ngrams, trigrams, words};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::log_line::{ItemValue, LogTable};

/// Item list extractors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum ItemListKind {
    #[default]
    #[serde(rename = "e_words")]
    Words,
    #[serde(rename = "e_trigrams")]
    Trigrams,
    #[serde(rename = "e_event_drain_id")]
    DrainEvent,
    #[serde(rename = "e_event_tip_id")]
    TipEvent,
    #[serde(rename = "e_event_brain_id")]
    BrainEvent,
    #[serde(rename = "e_event_pliplom_id")]
    PliplomEvent,
    #[serde(rename = "e_event_iplom_id")]
    IplomEvent,
}

impl ItemListKind {
    pub const ALL: [ItemListKind; 7] = [
        ItemListKind::Words,
        ItemListKind::Trigrams,
        ItemListKind::DrainEvent,
        ItemListKind::TipEvent,
        ItemListKind::BrainEvent,
        ItemListKind::PliplomEvent,
        ItemListKind::IplomEvent,
    ];

    /// Column name of the derived item list
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemListKind::Words => "e_words",
            ItemListKind::Trigrams => "e_trigrams",
            ItemListKind::DrainEvent => "e_event_drain_id",
            ItemListKind::TipEvent => "e_event_tip_id",
            ItemListKind::BrainEvent => "e_event_brain_id",
            ItemListKind::PliplomEvent => "e_event_pliplom_id",
            ItemListKind::IplomEvent => "e_event_iplom_id",
        }
    }

    /// True for kinds producing one template id per line
    pub fn is_event_id(&self) -> bool {
        !matches!(self, ItemListKind::Words | ItemListKind::Trigrams)
    }

    fn miner(&self) -> Option<Box<dyn TemplateMiner>> {
        match self {
            ItemListKind::Words | ItemListKind::Trigrams => None,
            ItemListKind::DrainEvent => Some(Box::new(Drain::default())),
            ItemListKind::TipEvent => Some(Box::new(Tip::default())),
            ItemListKind::BrainEvent => Some(Box::new(Brain::new())),
            ItemListKind::PliplomEvent => Some(Box::new(Iplom::single_pass())),
            ItemListKind::IplomEvent => Some(Box::new(Iplom::default())),
        }
    }
}

impl FromStr for ItemListKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        ItemListKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AnalysisError::UnsupportedEnhancement(s.to_string()))
    }
}

impl fmt::Display for ItemListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one enhancement pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnhanceOptions {
    pub item_list: ItemListKind,
    pub mask: MaskKind,
}

impl EnhanceOptions {
    pub fn new(item_list: ItemListKind, mask: MaskKind) -> Self {
        Self { item_list, mask }
    }
}

/// Derive the item list of every line
///
/// Returns a new table; existing item values are replaced.
pub fn enhance(table: &LogTable, options: &EnhanceOptions) -> Result<LogTable> {
    let mask = Mask::compile(options.mask)?;
    let texts: Vec<String> = table.lines.iter().map(|l| mask.apply(&l.message)).collect();

    let items: Vec<ItemValue> = match options.item_list.miner() {
        Some(mut miner) => {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            miner
                .mine(&refs)
                .iter()
                .map(|template| ItemValue::Scalar(template_id(template)))
                .collect()
        }
        None => texts
            .iter()
            .map(|text| match options.item_list {
                ItemListKind::Trigrams => ItemValue::List(trigrams(text)),
                _ => ItemValue::List(words(text)),
            })
            .collect(),
    };

    debug!(
        lines = table.len(),
        item_list = %options.item_list,
        mask = %options.mask,
        "enhanced log lines"
    );

    let mut enhanced = table.clone();
    for (line, value) in enhanced.lines.iter_mut().zip(items) {
        line.items = Some(value);
    }
    Ok(enhanced)
}

#[cfg(test)]
mod tests;
