use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::config::FusionConfig;
use crate::core::model::{NormalizedBox, WordToken};
use crate::engine::words::{words_or_empty, WordSource};
use crate::error::Result;
use crate::store::AnnotationStore;

use super::{consolidate_page, ConsolidatedPageAnnotation, GroupingStrategy};

/// Computes consolidations and persists them, one writer per (document, tool)
/// at a time. Different keys proceed in parallel.
pub struct ConsolidationService {
    store: AnnotationStore,
    config: FusionConfig,
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl ConsolidationService {
    pub fn new(store: AnnotationStore, config: FusionConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn consolidate(
        &self,
        document: &str,
        tool: &str,
        page: usize,
        strategy: GroupingStrategy,
        boxes: &[NormalizedBox],
        words: &[WordToken],
    ) -> Result<ConsolidatedPageAnnotation> {
        let annotation = ConsolidatedPageAnnotation {
            document: document.to_string(),
            tool: tool.to_string(),
            page,
            strategy,
            result: consolidate_page(boxes, words, strategy, &self.config),
        };

        let lock = self.lock_for(document, tool);
        let stored = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store.upsert(annotation.clone())
        };
        self.release(document, tool, lock);
        stored?;
        tracing::info!(
            document,
            tool,
            page,
            %strategy,
            boxes = annotation.result.boxes.len(),
            groups = annotation.result.merged_groups.len(),
            "stored consolidation"
        );
        Ok(annotation)
    }

    /// Like [`consolidate`](Self::consolidate) but pulls the page's words from
    /// `source`. A failing source consolidates against no words.
    pub fn consolidate_from(
        &self,
        document: &str,
        tool: &str,
        page: usize,
        strategy: GroupingStrategy,
        boxes: &[NormalizedBox],
        source: &dyn WordSource,
    ) -> Result<ConsolidatedPageAnnotation> {
        let words = words_or_empty(source, page);
        self.consolidate(document, tool, page, strategy, boxes, &words)
    }

    fn lock_for(&self, document: &str, tool: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry((document.to_string(), tool.to_string()))
            .or_default()
            .clone()
    }

    /// Drop the key's lock once no other caller holds or waits on it.
    fn release(&self, document: &str, tool: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference in the map, one in `lock`
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&(document.to_string(), tool.to_string()));
        }
    }
}
