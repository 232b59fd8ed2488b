//! Label dictionary loading.
//!
//! A [`LabelTable`] maps class indices to human readable labels. Entries are
//! kept in file order, which must match the order of the model's output
//! classes; keys are never re-sorted.

use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::utils::blocking;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Ordered class-index to label mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Creates a table from labels already in class order.
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Loads a label table from disk.
    ///
    /// The format is detected from the content:
    /// * a JSON object (`{"0": "tench", "1": "goldfish"}`), read in document order,
    /// * a JSON array of strings,
    /// * plain text with one label per line.
    ///
    /// # Errors
    ///
    /// * `ResourceNotFound` if the file does not exist.
    /// * `MalformedLabels` if the content is not a key to label mapping, a
    ///   value is not a string, or no labels are present.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use oar_classify::utils::LabelTable;
    /// use std::path::Path;
    ///
    /// let labels = LabelTable::load(Path::new("assets/labels.json"))?;
    /// println!("{} classes", labels.len());
    /// # Ok::<(), oar_classify::core::ClassifyError>(())
    /// ```
    pub fn load(path: &Path) -> ClassifyResult<Self> {
        let bytes = blocking::read_file_blocking(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ClassifyError::resource_not_found(path, e)
            } else {
                ClassifyError::malformed_labels(path, "failed to read label file", e)
            }
        })?;
        let content = std::str::from_utf8(&bytes)
            .map_err(|e| ClassifyError::malformed_labels(path, "label file is not UTF-8", e))?;

        let table = Self::parse(path, content)?;
        debug!(
            "Loaded {} labels from '{}'",
            table.labels.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses label content; `origin` is only used in error messages.
    pub fn parse(origin: &Path, content: &str) -> ClassifyResult<Self> {
        let content = content.trim_start_matches('\u{feff}');
        let trimmed = content.trim_start();

        let labels = if trimmed.starts_with('{') {
            parse_json_object(origin, trimmed)?
        } else if trimmed.starts_with('[') {
            parse_json_array(origin, trimmed)?
        } else {
            parse_text_lines(origin, content)?
        };

        if labels.is_empty() {
            return Err(ClassifyError::malformed_labels_msg(
                origin,
                "label source contains no entries",
            ));
        }
        Ok(Self { labels })
    }

    /// Returns the label for a class index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates labels in class order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

fn parse_json_object(origin: &Path, content: &str) -> ClassifyResult<Vec<String>> {
    let map: serde_json::Map<String, Value> = serde_json::from_str(content).map_err(|e| {
        ClassifyError::malformed_labels(origin, "expected a JSON object of key to label", e)
    })?;

    map.into_iter()
        .map(|(key, value)| match value {
            Value::String(label) => Ok(label),
            other => Err(ClassifyError::malformed_labels_msg(
                origin,
                format!("value for key '{key}' is not a string: {other}"),
            )),
        })
        .collect()
}

/// One label per line. Trailing blank lines are dropped; a blank line before
/// the last label would shift every later class index, so it is rejected.
fn parse_text_lines(origin: &Path, content: &str) -> ClassifyResult<Vec<String>> {
    let mut lines: Vec<&str> = content.lines().collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if line.trim().is_empty() {
                Err(ClassifyError::malformed_labels_msg(
                    origin,
                    format!("line {} is blank", i + 1),
                ))
            } else {
                Ok(line.to_string())
            }
        })
        .collect()
}

fn parse_json_array(origin: &Path, content: &str) -> ClassifyResult<Vec<String>> {
    serde_json::from_str::<Vec<String>>(content).map_err(|e| {
        ClassifyError::malformed_labels(origin, "expected a JSON array of label strings", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::PipelineStage;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn test_json_object_keeps_document_order() {
        // Lexical ordering of the keys would put "10" before "2".
        let file = write_temp(r#"{"0": "tench", "1": "goldfish", "2": "shark", "10": "hen"}"#);
        let table = LabelTable::load(file.path()).unwrap();
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec!["tench", "goldfish", "shark", "hen"]
        );
    }

    #[test]
    fn test_json_array() {
        let file = write_temp(r#"["cat", "dog"]"#);
        let table = LabelTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1), Some("dog"));
    }

    #[test]
    fn test_text_lines() {
        let file = write_temp("cat\ndog\nbird\n");
        let table = LabelTable::load(file.path()).unwrap();
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["cat", "dog", "bird"]);
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn test_missing_file_is_resource_not_found() {
        let err = LabelTable::load(Path::new("/nonexistent/labels.json")).unwrap_err();
        assert!(matches!(err, ClassifyError::ResourceNotFound { .. }));
        assert_eq!(err.stage(), PipelineStage::LabelLoading);
    }

    #[test]
    fn test_non_string_value_is_malformed() {
        let file = write_temp(r#"{"0": "tench", "1": 7}"#);
        let err = LabelTable::load(file.path()).unwrap_err();
        assert!(matches!(err, ClassifyError::MalformedLabels { .. }));
        assert!(err.to_string().contains("key '1'"));
    }

    #[test]
    fn test_broken_json_is_malformed() {
        let file = write_temp(r#"{"0": "tench", "1": "#);
        let err = LabelTable::load(file.path()).unwrap_err();
        assert!(matches!(err, ClassifyError::MalformedLabels { .. }));
    }

    #[test]
    fn test_empty_source_is_malformed() {
        let file = write_temp("{}");
        assert!(matches!(
            LabelTable::load(file.path()),
            Err(ClassifyError::MalformedLabels { .. })
        ));

        for content in ["", " \n\t\n\n"] {
            let file = write_temp(content);
            assert!(matches!(
                LabelTable::load(file.path()),
                Err(ClassifyError::MalformedLabels { .. })
            ));
        }
    }

    #[test]
    fn test_blank_text_lines() {
        let table = LabelTable::parse(Path::new("labels.txt"), "cat\r\ndog\r\n\n  \n").unwrap();
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["cat", "dog"]);

        let err = LabelTable::parse(Path::new("labels.txt"), "cat\n\ndog\n").unwrap_err();
        assert!(matches!(err, ClassifyError::MalformedLabels { .. }));
        assert!(err.to_string().contains("line 2 is blank"));
    }
}
