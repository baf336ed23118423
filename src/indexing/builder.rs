//! Ways to build a tree
//!
//! The construction modes are a closed set, so they are modelled as a
//! tagged union dispatched by [`BkTree::build`] rather than a registry.

use super::bktree::{BkTree, SharedMetric};
use super::record::TreeRecord;
use crate::algorithms::keyboard::{Keyboard, DEFAULT_WEIGHT};
use crate::algorithms::levenshtein::WeightedLevenshtein;
use crate::algorithms::normalize::CaseMode;
use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Delimiter used by text ingestion when none is configured
pub const DEFAULT_DELIMITER: &str = ",";

/// Options shared by the text builders and the metric they use.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Separator between values in text input
    pub delimiter: String,
    /// Compare values with their case preserved
    pub case_sensitive: bool,
    /// Substitution cost between keys that are not neighbours
    pub default_weight: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            case_sensitive: true,
            default_weight: DEFAULT_WEIGHT,
        }
    }
}

impl BuildOptions {
    /// Metric configured by these options, weighted by `keyboard` when given
    pub fn metric(&self, keyboard: Option<&Keyboard>) -> SharedMetric {
        let mut metric =
            WeightedLevenshtein::new().with_case(CaseMode::from_sensitive(self.case_sensitive));
        if let Some(keyboard) = keyboard {
            metric = metric.with_weights(keyboard.weight_fn(self.default_weight));
        }
        Arc::new(metric)
    }
}

/// Source a tree can be built from
#[derive(Debug, Clone)]
pub enum TreeSource {
    /// A collection of strings; the first one becomes the root
    Values(Vec<String>),
    /// A previously exported structure
    Record(TreeRecord),
    /// Delimiter-separated text
    Text { content: String, delimiter: String },
    /// A JSON tree record on disk
    JsonFile(PathBuf),
    /// A delimiter-separated text file
    TextFile { path: PathBuf, delimiter: String },
}

impl BkTree {
    /// Build a tree from any [`TreeSource`]
    pub fn build(source: TreeSource, metric: SharedMetric) -> Result<Self> {
        match source {
            TreeSource::Values(values) => Self::from_values(values, metric),
            TreeSource::Record(record) => Self::from_record(&record, metric),
            TreeSource::Text { content, delimiter } => Self::from_text(&content, &delimiter, metric),
            TreeSource::JsonFile(path) => Self::from_json_file(path, metric),
            TreeSource::TextFile { path, delimiter } => {
                Self::from_text_file(path, &delimiter, metric)
            }
        }
    }

    /// Build a tree from delimiter-separated values.
    ///
    /// Line terminators around each value are stripped, empty values are
    /// skipped and duplicates are ignored.
    pub fn from_text(content: &str, delimiter: &str, metric: SharedMetric) -> Result<Self> {
        Self::from_values(split_values(content, delimiter)?, metric)
    }

    /// Like [`BkTree::from_text`], reading everything from `reader`.
    ///
    /// Fails with [`IndexError::InvalidArgument`] when the input is not UTF-8.
    pub fn from_reader<R: Read>(mut reader: R, delimiter: &str, metric: SharedMetric) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let content = String::from_utf8(bytes)
            .map_err(|e| IndexError::InvalidArgument(format!("input is not valid UTF-8: {e}")))?;
        Self::from_text(&content, delimiter, metric)
    }

    pub fn from_text_file(
        path: impl AsRef<Path>,
        delimiter: &str,
        metric: SharedMetric,
    ) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "building BK-tree from text file");
        Self::from_reader(File::open(path)?, delimiter, metric)
    }

    pub fn from_json_file(path: impl AsRef<Path>, metric: SharedMetric) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading BK-tree record");
        Self::from_json(BufReader::new(File::open(path)?), metric)
    }

    /// Write the JSON record to `path`, replacing any existing file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        self.write_json(writer)
    }
}

fn split_values<'a>(content: &'a str, delimiter: &str) -> Result<Vec<&'a str>> {
    if delimiter.is_empty() {
        return Err(IndexError::InvalidArgument("delimiter must not be empty".into()));
    }
    Ok(content
        .split(delimiter)
        .map(|value| value.trim_matches(&['\r', '\n'][..]))
        .filter(|value| !value.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::EditDistance;
    use crate::indexing::bktree::default_metric;

    #[test]
    fn test_split_values() {
        assert_eq!(split_values("a,b,,c\n", ",").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(split_values("one\r\ntwo\r\n", "\n").unwrap(), vec!["one", "two"]);
        assert_eq!(split_values(" a ;b", ";").unwrap(), vec![" a ", "b"]);
        assert!(split_values("abc", "").is_err());
    }

    #[test]
    fn test_from_text() {
        let tree = BkTree::from_text("book,books,cake,book,cook", ",", default_metric()).unwrap();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root().value(), "book");

        let err = BkTree::from_text(",\n", ",", default_metric()).unwrap_err();
        assert!(matches!(err, IndexError::EmptyInput(_)));
    }

    #[test]
    fn test_from_reader_rejects_invalid_utf8() {
        let bytes: &[u8] = &[b'a', b',', 0xff, 0xfe];
        let err = BkTree::from_reader(bytes, ",", default_metric()).unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument(_)));
    }

    #[test]
    fn test_build_dispatch() {
        let from_values = BkTree::build(
            TreeSource::Values(vec!["cake".into(), "cook".into()]),
            default_metric(),
        )
        .unwrap();
        assert_eq!(from_values.len(), 2);

        let from_record =
            BkTree::build(TreeSource::Record(from_values.to_record()), default_metric()).unwrap();
        assert_eq!(from_record.values(), from_values.values());

        let from_text = BkTree::build(
            TreeSource::Text { content: "a;b;c".into(), delimiter: ";".into() },
            default_metric(),
        )
        .unwrap();
        assert_eq!(from_text.len(), 3);
    }

    #[test]
    fn test_build_options_metric() {
        let options = BuildOptions { case_sensitive: false, ..Default::default() };
        let metric = options.metric(None);
        assert_eq!(metric.distance("Cake", "cake"), 0);
        assert_eq!(metric.name(), "levenshtein");

        let weighted = BuildOptions::default().metric(Some(&Keyboard::qwerty()));
        assert_eq!(weighted.distance("cat", "cst"), 1);
        assert_eq!(weighted.distance("cat", "cpt"), 2);
        assert_eq!(weighted.distance("Cat", "cat"), 2);
    }

    #[test]
    fn test_build_options_from_json() {
        let options: BuildOptions = serde_json::from_str(r#"{"delimiter": ";"}"#).unwrap();
        assert_eq!(options.delimiter, ";");
        assert!(options.case_sensitive);
        assert_eq!(options.default_weight, DEFAULT_WEIGHT);
    }
}
