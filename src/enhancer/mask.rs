//! Regex masks that normalize volatile values before feature extraction
//!
//! A mask is an ordered list of `(replacement, pattern)` rules. Rules are
//! applied in sequence, so earlier (more specific) rules win over later ones.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Named mask rule sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum MaskKind {
    Myllari,
    MyllariExtended,
    DrainLoglead,
    DrainOrig,
    #[default]
    None,
}

impl MaskKind {
    pub const ALL: [MaskKind; 5] = [
        MaskKind::Myllari,
        MaskKind::MyllariExtended,
        MaskKind::DrainLoglead,
        MaskKind::DrainOrig,
        MaskKind::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaskKind::Myllari => "myllari",
            MaskKind::MyllariExtended => "myllari_extended",
            MaskKind::DrainLoglead => "drain_loglead",
            MaskKind::DrainOrig => "drain_orig",
            MaskKind::None => "none",
        }
    }

    fn rules(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            MaskKind::Myllari => MYLLARI,
            MaskKind::MyllariExtended => MYLLARI_EXTENDED,
            MaskKind::DrainLoglead => DRAIN_LOGLEAD,
            MaskKind::DrainOrig => DRAIN_ORIG,
            MaskKind::None => &[],
        }
    }
}

impl FromStr for MaskKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        MaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AnalysisError::UnsupportedMask(s.to_string()))
    }
}

impl fmt::Display for MaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MYLLARI: &[(&str, &str)] = &[
    ("<DATE>", r"\b\d{4}-\d{2}-\d{2}\b|\b\d{2}[/.]\d{2}[/.]\d{4}\b"),
    ("<TIME>", r"\b\d{2}:\d{2}:\d{2}(?:[.,]\d+)?\b"),
    ("<IP>", r"\b(?:\d{1,3}\.){3}\d{1,3}(?::\d{1,5})?\b"),
    ("<HEX>", r"\b0[xX][0-9a-fA-F]+\b"),
    ("<NUM>", r"\b\d+\b"),
];

const MYLLARI_EXTENDED: &[(&str, &str)] = &[
    ("<URL>", r"\b[a-zA-Z][a-zA-Z0-9+.-]*://\S+"),
    ("<EMAIL>", r"\b[\w.+-]+@[\w-]+(?:\.[\w-]+)+\b"),
    (
        "<UUID>",
        r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
    ),
    ("<DATE>", r"\b\d{4}-\d{2}-\d{2}\b|\b\d{2}[/.]\d{2}[/.]\d{4}\b"),
    ("<TIME>", r"\b\d{2}:\d{2}:\d{2}(?:[.,]\d+)?\b"),
    ("<IP>", r"\b(?:\d{1,3}\.){3}\d{1,3}(?::\d{1,5})?\b"),
    ("<PATH>", r"(?:/[\w.-]+){2,}/?"),
    ("<HEX>", r"\b0[xX][0-9a-fA-F]+\b"),
    ("<ID>", r"\b[0-9a-fA-F]*\d[0-9a-fA-F]*[a-fA-F][0-9a-fA-F]*\b|\b[0-9a-fA-F]*[a-fA-F][0-9a-fA-F]*\d[0-9a-fA-F]*\b"),
    ("<NUM>", r"\b\d+(?:\.\d+)?\b"),
];

const DRAIN_LOGLEAD: &[(&str, &str)] = &[
    (
        "<*>",
        r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
    ),
    ("<*>", r"blk_-?\d+"),
    ("<*>", r"(?:\d+\.){3}\d+(?::\d+)?"),
    ("<*>", r"\b0[xX][0-9a-fA-F]+\b"),
    ("<*>", r"\b[0-9a-fA-F]{12,}\b"),
    ("<*>", r"\b\d+(?:\.\d+)?\b"),
];

const DRAIN_ORIG: &[(&str, &str)] = &[
    ("<*>", r"blk_-?\d+"),
    ("<*>", r"(?:/|)(?:\d+\.){3}\d+(?::\d+)?:?"),
    ("<*>", r"\b\d+\b"),
];

/// Compiled mask
#[derive(Debug, Clone)]
pub struct Mask {
    kind: MaskKind,
    rules: Vec<(&'static str, Regex)>,
}

impl Mask {
    /// Compile the rules of `kind`
    pub fn compile(kind: MaskKind) -> Result<Self> {
        let rules = kind
            .rules()
            .iter()
            .map(|(replacement, pattern)| {
                Regex::new(pattern)
                    .map(|re| (*replacement, re))
                    .map_err(|e| AnalysisError::InvalidConfig(format!("mask {}: {}", kind, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { kind, rules })
    }

    pub fn kind(&self) -> MaskKind {
        self.kind
    }

    /// Apply every rule in order
    pub fn apply(&self, message: &str) -> String {
        let mut masked = message.to_string();
        for (replacement, re) in &self.rules {
            masked = re.replace_all(&masked, *replacement).into_owned();
        }
        masked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_kinds() {
        for kind in MaskKind::ALL {
            assert_eq!(kind.as_str().parse::<MaskKind>().unwrap(), kind);
            Mask::compile(kind).unwrap();
        }
        assert!(matches!(
            "nope".parse::<MaskKind>(),
            Err(AnalysisError::UnsupportedMask(_))
        ));
    }

    #[test]
    fn test_none_is_identity() {
        let mask = Mask::compile(MaskKind::None).unwrap();
        assert_eq!(mask.apply("pid 42 at 10.0.0.1"), "pid 42 at 10.0.0.1");
    }

    #[test]
    fn test_myllari_masks_in_order() {
        let mask = Mask::compile(MaskKind::Myllari).unwrap();
        let masked = mask.apply("2024-01-02 10:11:12 conn from 10.0.0.1:8080 id 0x1f pid 42");
        assert_eq!(
            masked,
            "<DATE> <TIME> conn from <IP> id <HEX> pid <NUM>"
        );
    }

    #[test]
    fn test_myllari_keeps_alphanumeric_words() {
        let mask = Mask::compile(MaskKind::Myllari).unwrap();
        assert_eq!(mask.apply("worker1 ready"), "worker1 ready");
    }

    #[test]
    fn test_drain_orig_block_ids() {
        let mask = Mask::compile(MaskKind::DrainOrig).unwrap();
        assert_eq!(
            mask.apply("Receiving block blk_-1608999687919862906 src: /10.250.19.102:54106"),
            "Receiving block <*> src: <*>"
        );
    }

    #[test]
    fn test_extended_masks_uuid_and_url() {
        let mask = Mask::compile(MaskKind::MyllariExtended).unwrap();
        let masked = mask.apply(
            "GET https://example.com/a?b=1 req 123e4567-e89b-12d3-a456-426614174000 took 12.5",
        );
        assert_eq!(masked, "GET <URL> req <UUID> took <NUM>");
    }
}
