//! File-backed persistence for consolidated page annotations.
//!
//! One JSON file per (document, tool). Every write replaces the whole file,
//! so the last writer for a key wins. The store does no locking of its own;
//! callers that write the same key concurrently must serialise themselves
//! (see [`crate::consolidate::ConsolidationService`]).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consolidate::{AnnotationKey, ConsolidatedPageAnnotation};
use crate::error::{FusionError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentAnnotations {
    pub document: String,
    pub tool: String,
    /// Sorted by (page, strategy).
    pub pages: Vec<ConsolidatedPageAnnotation>,
}

impl DocumentAnnotations {
    fn empty(document: &str, tool: &str) -> Self {
        Self {
            document: document.to_string(),
            tool: tool.to_string(),
            pages: Vec::new(),
        }
    }

    /// Replace the entry with the same page and strategy, or insert it.
    pub fn upsert(&mut self, annotation: ConsolidatedPageAnnotation) {
        match self
            .pages
            .iter_mut()
            .find(|p| p.page == annotation.page && p.strategy == annotation.strategy)
        {
            Some(existing) => *existing = annotation,
            None => self.pages.push(annotation),
        }
        self.pages.sort_by_key(|p| (p.page, p.strategy));
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    root: PathBuf,
}

impl AnnotationStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Everything stored for (document, tool). Missing or unreadable state is
    /// an empty record, never an error.
    pub fn load(&self, document: &str, tool: &str) -> DocumentAnnotations {
        let path = self.record_path(document, tool);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return DocumentAnnotations::empty(document, tool);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable annotation record, treating as empty");
                return DocumentAnnotations::empty(document, tool);
            }
        };
        match serde_json::from_str::<DocumentAnnotations>(&data) {
            Ok(record) if record.document == document && record.tool == tool => record,
            Ok(_) => {
                tracing::warn!(path = %path.display(), "annotation record belongs to another key, treating as empty");
                DocumentAnnotations::empty(document, tool)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "corrupt annotation record, treating as empty");
                DocumentAnnotations::empty(document, tool)
            }
        }
    }

    pub fn get(&self, key: &AnnotationKey) -> Option<ConsolidatedPageAnnotation> {
        self.load(&key.document, &key.tool)
            .pages
            .into_iter()
            .find(|p| p.page == key.page && p.strategy == key.strategy)
    }

    /// Read-modify-write of the (document, tool) record.
    pub fn upsert(&self, annotation: ConsolidatedPageAnnotation) -> Result<()> {
        let mut record = self.load(&annotation.document, &annotation.tool);
        record.upsert(annotation);
        self.save(&record)
    }

    /// Write the record through a temporary file and rename it into place.
    pub fn save(&self, record: &DocumentAnnotations) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| FusionError::Io {
            path: self.root.clone(),
            source,
        })?;
        let path = self.record_path(&record.document, &record.tool);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(record).map_err(|err| FusionError::Encode {
            what: "annotation record",
            message: err.to_string(),
        })?;
        fs::write(&tmp, data).map_err(|source| FusionError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| FusionError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), pages = record.pages.len(), "saved annotation record");
        Ok(())
    }

    fn record_path(&self, document: &str, tool: &str) -> PathBuf {
        self.root
            .join(format!("{}__{}.json", encode_name(document), encode_name(tool)))
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9.-]`. `_` is encoded too, so
/// the `__` separator never occurs inside a name and distinct keys never
/// share a file.
fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::{ConsolidationResult, GroupingStrategy};
    use pretty_assertions::assert_eq;

    fn annotation(page: usize, strategy: GroupingStrategy) -> ConsolidatedPageAnnotation {
        ConsolidatedPageAnnotation {
            document: "report.pdf".to_string(),
            tool: "pdfplumber".to_string(),
            page,
            strategy,
            result: ConsolidationResult::default(),
        }
    }

    #[test]
    fn missing_record_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path().to_path_buf());
        let record = store.load("report.pdf", "pdfplumber");
        assert!(record.pages.is_empty());
        assert_eq!(record.document, "report.pdf");
    }

    #[test]
    fn corrupt_record_is_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = AnnotationStore::new(dir.path().to_path_buf());
        fs::write(dir.path().join("report.pdf__pdfplumber.json"), "{ not json")?;
        assert!(store.load("report.pdf", "pdfplumber").pages.is_empty());

        store.upsert(annotation(0, GroupingStrategy::Overlap))?;
        assert_eq!(store.load("report.pdf", "pdfplumber").pages.len(), 1);
        Ok(())
    }

    #[test]
    fn upsert_replaces_same_page_and_strategy() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = AnnotationStore::new(dir.path().to_path_buf());
        store.upsert(annotation(2, GroupingStrategy::Paragraph))?;
        store.upsert(annotation(1, GroupingStrategy::Overlap))?;
        store.upsert(annotation(2, GroupingStrategy::Overlap))?;

        let mut updated = annotation(2, GroupingStrategy::Paragraph);
        updated.result.merged_groups.push(crate::core::model::MergeGroup {
            id: 0,
            bbox: crate::core::geometry::BBox::new(0.1, 0.1, 0.2, 0.2),
            members: vec![0],
        });
        store.upsert(updated.clone())?;

        let record = store.load("report.pdf", "pdfplumber");
        let keys: Vec<(usize, GroupingStrategy)> =
            record.pages.iter().map(|p| (p.page, p.strategy)).collect();
        assert_eq!(
            keys,
            vec![
                (1, GroupingStrategy::Overlap),
                (2, GroupingStrategy::Overlap),
                (2, GroupingStrategy::Paragraph),
            ]
        );
        assert_eq!(store.get(&updated.key()), Some(updated));
        Ok(())
    }

    #[test]
    fn encodes_file_names() {
        assert_eq!(encode_name("a/b c.pdf"), "a%2Fb%20c.pdf");
        assert_eq!(encode_name("q3_final.pdf"), "q3%5Ffinal.pdf");
    }

    #[test]
    fn similar_document_names_keep_separate_records() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = AnnotationStore::new(dir.path().to_path_buf());
        let mut nested = annotation(0, GroupingStrategy::Overlap);
        nested.document = "reports/q3.pdf".to_string();
        let mut flat = annotation(0, GroupingStrategy::Overlap);
        flat.document = "reports_q3.pdf".to_string();
        let mut split_tool = annotation(0, GroupingStrategy::Overlap);
        split_tool.document = "reports".to_string();
        split_tool.tool = "q3.pdf__pdfplumber".to_string();

        store.upsert(nested.clone())?;
        store.upsert(flat.clone())?;
        store.upsert(split_tool.clone())?;

        assert_eq!(store.get(&nested.key()), Some(nested));
        assert_eq!(store.get(&flat.key()), Some(flat));
        assert_eq!(store.get(&split_tool.key()), Some(split_tool));
        assert_eq!(fs::read_dir(dir.path())?.count(), 3);
        Ok(())
    }
}
