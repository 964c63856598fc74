//! Raw log loading
//!
//! Reads a single log file or every `*.log` file below a directory into a
//! [`LogTable`]. The first path segment below the root names the run, the rest
//! of the path names the file inside the run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::log_line::{LoadReport, LogLine, LogTable};

/// Extension matched inside directories
pub const LOG_EXTENSION: &str = "log";

/// Replacement character emitted for bytes that failed to decode
const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Supported on-disk log layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One message per line, no structure
    #[default]
    Raw,
}

impl FromStr for LogFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(LogFormat::Raw),
            other => Err(AnalysisError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Raw => write!(f, "raw"),
        }
    }
}

/// Where a file sits relative to the input root
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileIdentity {
    run: String,
    file_name: String,
    orig_file_name: String,
    seq_id: String,
}

impl FileIdentity {
    fn new(run: String, file_name: String, orig_file_name: String) -> Self {
        let stem = file_name
            .strip_suffix(&format!(".{}", LOG_EXTENSION))
            .unwrap_or(&file_name);
        let seq_id = format!("{}_{}", run, stem);
        Self {
            run,
            file_name,
            orig_file_name,
            seq_id,
        }
    }

    /// Identity of a file found below `root`
    fn below_root(root: &Path, path: &Path) -> Self {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let orig_file_name = parts.join("/");

        match parts.split_first() {
            Some((run, rest)) if !rest.is_empty() => {
                Self::new(run.clone(), rest.join("/"), orig_file_name)
            }
            // File directly below the root: it is its own run
            _ => Self::new(orig_file_name.clone(), orig_file_name.clone(), orig_file_name),
        }
    }

    /// Identity of a single file given directly as input
    fn single_file(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self::new(name.clone(), name.clone(), name)
    }
}

/// Load logs from a file or directory
///
/// Fails with [`AnalysisError::DataLoad`] when the path does not exist, cannot
/// be read, or yields no usable lines.
pub fn load_logs(path: &Path, format: LogFormat) -> Result<LogTable> {
    if !path.exists() {
        return Err(AnalysisError::data_load(path, "path does not exist"));
    }

    let files: Vec<(PathBuf, FileIdentity)> = if path.is_file() {
        vec![(path.to_path_buf(), FileIdentity::single_file(path))]
    } else {
        collect_log_files(path)?
            .into_iter()
            .map(|file| {
                let identity = FileIdentity::below_root(path, &file);
                (file, identity)
            })
            .collect()
    };

    debug!(path = %path.display(), files = files.len(), %format, "loading logs");

    let mut lines = Vec::new();
    let mut report = LoadReport {
        files: files.len(),
        ..LoadReport::default()
    };

    for (file, identity) in &files {
        let bytes = fs::read(file)
            .map_err(|e| AnalysisError::data_load(file, format!("cannot read file: {}", e)))?;
        parse_raw(&bytes, identity, &mut lines, &mut report);
    }

    report.kept_lines = lines.len();

    if report.dropped() > 0 {
        warn!(
            path = %path.display(),
            dropped_empty = report.dropped_empty,
            dropped_undecodable = report.dropped_undecodable,
            "discarded unusable log lines"
        );
    }

    if lines.is_empty() {
        return Err(AnalysisError::data_load(
            path,
            "no log lines could be parsed (empty input or all lines filtered out)",
        ));
    }

    info!(path = %path.display(), "{}", report.format());
    Ok(LogTable { lines, report })
}

/// Split one file into log lines, numbering the kept lines from 1
fn parse_raw(bytes: &[u8], identity: &FileIdentity, out: &mut Vec<LogLine>, report: &mut LoadReport) {
    let content = String::from_utf8_lossy(bytes);
    let mut line_number = 0;

    for message in content.lines() {
        if message.is_empty() {
            report.dropped_empty += 1;
            continue;
        }
        if message.contains(REPLACEMENT_CHAR) {
            report.dropped_undecodable += 1;
            continue;
        }

        line_number += 1;
        out.push(LogLine {
            run: identity.run.clone(),
            file_name: identity.file_name.clone(),
            orig_file_name: identity.orig_file_name.clone(),
            seq_id: identity.seq_id.clone(),
            line_number,
            message: message.to_string(),
            items: None,
        });
    }
}

/// Recursively collect `*.log` files, sorted by path
fn collect_log_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir)
            .map_err(|e| AnalysisError::data_load(&dir, format!("cannot read directory: {}", e)))?;

        for entry in entries {
            let entry = entry
                .map_err(|e| AnalysisError::data_load(&dir, format!("cannot read entry: {}", e)))?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == LOG_EXTENSION) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
