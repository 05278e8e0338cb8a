//! Per-document write serialization.
//!
//! Every read-diff-write sequence against a document runs while holding that
//! document's lock, so two writers can never diff against the same baseline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive section keyed by document id.
///
/// Entries exist only while some task holds or waits for the lock.
#[derive(Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

/// Held for the duration of a write. Releases on drop.
pub struct DocumentGuard {
    document_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl DocumentGuard {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `document_id`.
    pub async fn lock(&self, document_id: &str) -> DocumentGuard {
        let mutex = self.entry(document_id);
        let guard = mutex.lock_owned().await;
        tracing::trace!(document_id, "Document lock acquired");
        DocumentGuard {
            document_id: document_id.to_string(),
            _guard: guard,
        }
    }

    /// Number of documents with a live lock.
    pub fn active(&self) -> usize {
        self.map()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn entry(&self, document_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.map();
        locks.retain(|_, weak| weak.strong_count() > 0);

        if let Some(existing) = locks.get(document_id).and_then(Weak::upgrade) {
            return existing;
        }
        let mutex = Arc::new(AsyncMutex::new(()));
        locks.insert(document_id.to_string(), Arc::downgrade(&mutex));
        mutex
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Weak<AsyncMutex<()>>>> {
        // The map holds no invariants a panicking holder could break
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_document_is_exclusive() {
        let locks = Arc::new(DocumentLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("doc_1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_documents_do_not_block() {
        let locks = DocumentLocks::new();
        let a = locks.lock("doc_a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("doc_b")).await;
        assert!(b.is_ok());
        assert_eq!(a.document_id(), "doc_a");
    }

    #[tokio::test]
    async fn test_entries_released_after_drop() {
        let locks = DocumentLocks::new();
        {
            let _a = locks.lock("doc_a").await;
            let _b = locks.lock("doc_b").await;
            assert_eq!(locks.active(), 2);
        }
        assert_eq!(locks.active(), 0);
    }
}
