//! History service integration tests.
//!
//! Exercise the full create / edit / restore flow against real stores.

use async_trait::async_trait;
use folio_core::diff::{Diff, Op, Segment};
use folio_core::{
    Actor, Bus, Config, CreateDocumentInput, CreateVersionInput, ErrorKind, History, Page,
    RenameDocumentInput, UpdateContentInput,
};
use folio_storage::{
    JsonStore, MemoryStore, NewVersion, SortOrder, StorageError, StorageResult, Version,
    VersionFilter, VersionRepo,
};
use folio_test_utils::assertions::{assert_json_eq, assert_newest_first};
use folio_test_utils::{fixtures, TestDataDir};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn memory_history() -> History {
    let store = Arc::new(MemoryStore::new());
    History::new(store.clone(), store, &Config::default(), Bus::new())
}

fn alice() -> Actor {
    Actor::new("alice")
}

fn bob() -> Actor {
    Actor::new("bob")
}

fn new_doc(name: &str, content: &str) -> CreateDocumentInput {
    CreateDocumentInput {
        name: name.to_string(),
        content: content.to_string(),
    }
}

fn edit(content: &str) -> CreateVersionInput {
    CreateVersionInput {
        content: content.to_string(),
        is_auto_save: false,
    }
}

fn stored_diff(version: &Version) -> Diff {
    serde_json::from_value(version.diff.clone()).expect("stored diff should deserialize")
}

#[tokio::test]
async fn test_create_document_with_initial_version() {
    let history = memory_history();
    let (doc, first) = history
        .create_document(&alice(), new_doc("Plan", r#"{"a":1}"#))
        .await
        .unwrap();

    assert_eq!(first.content, r#"{"a":1}"#);
    assert_eq!(first.document_id, doc.id);
    assert!(stored_diff(&first).is_empty());
    assert!(!first.is_auto_save);
    assert_eq!(doc.owner_id, "alice");
}

#[tokio::test]
async fn test_json_edit_reports_changed_path() {
    let history = memory_history();
    let (doc, _) = history
        .create_document(&alice(), new_doc("Plan", r#"{"a":1}"#))
        .await
        .unwrap();

    let version = history
        .create_version(&alice(), &doc.id, edit(r#"{"a":2}"#))
        .await
        .unwrap();

    let diff = stored_diff(&version);
    assert_eq!(diff.changes().len(), 1);
    assert_eq!(diff.changes()[0].path, vec![Segment::Key("a".into())]);
    assert_eq!(
        diff.changes()[0].op,
        Op::Changed {
            old: json!(1),
            new: json!(2)
        }
    );

    let doc = history.get_document(&alice(), &doc.id).await.unwrap();
    assert_eq!(doc.content, r#"{"a":2}"#);
}

#[tokio::test]
async fn test_text_edit_is_whole_value_replace() {
    let history = memory_history();
    let (doc, _) = history
        .create_document(&alice(), new_doc("Notes", "hello"))
        .await
        .unwrap();

    let version = history
        .create_version(&alice(), &doc.id, edit("world"))
        .await
        .unwrap();

    assert_json_eq(
        &version.diff,
        &json!({"type": "replace", "old": "hello", "new": "world"}),
    );
}

#[tokio::test]
async fn test_other_actor_is_denied_not_hidden() {
    let history = memory_history();
    let (doc, first) = history
        .create_document(&bob(), new_doc("Private", "{}"))
        .await
        .unwrap();

    let denied = [
        history.get_document(&alice(), &doc.id).await.map(|_| ()),
        history.list_versions(&alice(), &doc.id).await.map(|_| ()),
        history
            .get_version(&alice(), &doc.id, &first.id)
            .await
            .map(|_| ()),
        history
            .create_version(&alice(), &doc.id, edit("x"))
            .await
            .map(|_| ()),
        history
            .merge(&alice(), &doc.id, &first.id)
            .await
            .map(|_| ()),
        history
            .rename_document(
                &alice(),
                &doc.id,
                RenameDocumentInput {
                    name: "Mine".into(),
                },
            )
            .await
            .map(|_| ()),
        history
            .update_version_content(
                &alice(),
                &first.id,
                UpdateContentInput {
                    content: "x".into(),
                },
            )
            .await
            .map(|_| ()),
    ];

    for result in denied {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::AccessDenied);
    }

    // Nothing changed
    let doc = history.get_document(&bob(), &doc.id).await.unwrap();
    assert_eq!(doc.content, "{}");
    assert_eq!(doc.name, "Private");
}

#[tokio::test]
async fn test_existence_checked_before_ownership() {
    let history = memory_history();
    let missing = folio_util::Identifier::document();

    let err = history.get_document(&alice(), &missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = history
        .get_document(&alice(), "../../etc/passwd")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_version_under_wrong_document_is_not_found() {
    let history = memory_history();
    let (a, first_a) = history
        .create_document(&alice(), new_doc("A", "a"))
        .await
        .unwrap();
    let (b, _) = history
        .create_document(&alice(), new_doc("B", "b"))
        .await
        .unwrap();

    assert_eq!(
        history
            .get_version(&alice(), &b.id, &first_a.id)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        history
            .merge(&alice(), &b.id, &first_a.id)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
    assert!(history.get_version(&alice(), &a.id, &first_a.id).await.is_ok());
}

#[tokio::test]
async fn test_list_versions_is_stable_and_newest_first() {
    let history = memory_history();
    let (doc, _) = history
        .create_document(&alice(), new_doc("Plan", "1"))
        .await
        .unwrap();
    for n in 2..=5 {
        history
            .create_version(
                &alice(),
                &doc.id,
                CreateVersionInput {
                    content: n.to_string(),
                    is_auto_save: n % 2 == 1,
                },
            )
            .await
            .unwrap();
    }

    let first = history.list_versions(&alice(), &doc.id).await.unwrap();
    let second = history.list_versions(&alice(), &doc.id).await.unwrap();
    assert_eq!(first.len(), 5);
    assert_newest_first(&first);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_merge_restores_across_intervening_versions() {
    let history = memory_history();
    let (doc, original) = history
        .create_document(&alice(), new_doc("Plan", &fixtures::blocks(&[("a", "one")])))
        .await
        .unwrap();
    for text in ["two", "three", "four"] {
        history
            .create_version(&alice(), &doc.id, edit(&fixtures::blocks(&[("a", text)])))
            .await
            .unwrap();
    }

    let (updated, restored) = history
        .merge(&alice(), &doc.id, &original.id)
        .await
        .unwrap();

    assert_eq!(updated.content, original.content);
    assert_eq!(restored.content, original.content);
    assert_eq!(
        restored.merged_from_version_id.as_deref(),
        Some(original.id.as_str())
    );
    assert!(!restored.is_auto_save);
    assert_eq!(
        stored_diff(&restored).to_string(),
        r#"~ blocks[id=a].text: "four" -> "one""#
    );
    assert_eq!(
        history.list_versions(&alice(), &doc.id).await.unwrap().len(),
        5
    );
}

#[tokio::test]
async fn test_update_version_content_does_not_touch_document() {
    let history = memory_history();
    let (doc, first) = history
        .create_document(&alice(), new_doc("Plan", "original"))
        .await
        .unwrap();

    let updated = history
        .update_version_content(
            &alice(),
            &first.id,
            UpdateContentInput {
                content: "rewritten".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.content, "rewritten");
    let doc = history.get_document(&alice(), &doc.id).await.unwrap();
    assert_eq!(doc.content, "original");
    assert_eq!(
        history.list_versions(&alice(), &doc.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_update_current_version_edits_head() {
    let history = memory_history();
    let (doc, _) = history
        .create_document(&alice(), new_doc("Plan", "v1"))
        .await
        .unwrap();
    let head = history
        .create_version(&alice(), &doc.id, edit("v2"))
        .await
        .unwrap();

    let updated = history
        .update_current_version(
            &alice(),
            &doc.id,
            UpdateContentInput {
                content: "v2 draft".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, head.id);
    assert_eq!(updated.content, "v2 draft");
    let doc = history.get_document(&alice(), &doc.id).await.unwrap();
    assert_eq!(doc.content, "v2");
}

#[tokio::test]
async fn test_list_documents_scoped_and_paged() {
    let history = memory_history();
    for n in 0..5 {
        history
            .create_document(&alice(), new_doc(&format!("A{n}"), ""))
            .await
            .unwrap();
    }
    history
        .create_document(&bob(), new_doc("B", ""))
        .await
        .unwrap();

    let page = history
        .list_documents(&alice(), Page::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|d| d.owner_id == "alice"));
}

#[tokio::test]
async fn test_rename_keeps_history() {
    let history = memory_history();
    let (doc, _) = history
        .create_document(&alice(), new_doc("Old", "c"))
        .await
        .unwrap();
    let renamed = history
        .rename_document(&alice(), &doc.id, RenameDocumentInput { name: "New".into() })
        .await
        .unwrap();

    assert_eq!(renamed.name, "New");
    assert_eq!(renamed.content, "c");
    assert_eq!(
        history.list_versions(&alice(), &doc.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_events_published() {
    let history = memory_history();
    let mut events = history.bus().subscribe_all();

    let (doc, first) = history
        .create_document(&alice(), new_doc("Plan", "a"))
        .await
        .unwrap();
    history
        .merge(&alice(), &doc.id, &first.id)
        .await
        .unwrap();

    let created = events.recv().await.unwrap();
    assert_eq!(created.event_type, "document.created");
    let restored = events.recv().await.unwrap();
    assert_eq!(restored.event_type, "version.created");
    assert_eq!(restored.payload["mergedFromVersionId"], json!(first.id));
    assert!(restored.visible_to("alice"));
}

#[tokio::test]
async fn test_json_store_survives_restart() {
    let dir = TestDataDir::new();
    let doc_id = {
        let store = Arc::new(JsonStore::new(dir.store_dir()));
        let history = History::new(store.clone(), store, &Config::default(), Bus::new());
        let (doc, _) = history
            .create_document(&alice(), new_doc("Plan", r#"{"a":1}"#))
            .await
            .unwrap();
        history
            .create_version(&alice(), &doc.id, edit(r#"{"a":2}"#))
            .await
            .unwrap();
        doc.id
    };

    let store = Arc::new(JsonStore::new(dir.store_dir()));
    let history = History::new(store.clone(), store, &Config::default(), Bus::new());
    let doc = history.get_document(&alice(), &doc_id).await.unwrap();
    assert_eq!(doc.content, r#"{"a":2}"#);
    assert_eq!(doc.version_count, 2);
    let versions = history.list_versions(&alice(), &doc_id).await.unwrap();
    assert_eq!(versions[0].number, 2);
    assert_newest_first(&versions);
}

#[tokio::test]
async fn test_ignored_key_from_config() {
    let store = Arc::new(MemoryStore::new());
    let history = History::new(store.clone(), store, &Config::default(), Bus::new());
    let (doc, _) = history
        .create_document(
            &alice(),
            new_doc("Plan", &fixtures::blocks_with_display(&[("a", "x")], true)),
        )
        .await
        .unwrap();

    let version = history
        .create_version(
            &alice(),
            &doc.id,
            edit(&fixtures::blocks_with_display(&[("a", "x")], false)),
        )
        .await
        .unwrap();
    assert!(stored_diff(&version).is_empty());
}

/// Version repo that can be told to fail writes.
struct FlakyVersions {
    inner: MemoryStore,
    fail: AtomicBool,
}

#[async_trait]
impl VersionRepo for FlakyVersions {
    async fn create(&self, fields: NewVersion) -> StorageResult<Version> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        VersionRepo::create(&self.inner, fields).await
    }

    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Version>> {
        VersionRepo::find_by_id(&self.inner, id).await
    }

    async fn find_one(&self, filter: &VersionFilter) -> StorageResult<Option<Version>> {
        self.inner.find_one(filter).await
    }

    async fn find(&self, filter: &VersionFilter, order: SortOrder) -> StorageResult<Vec<Version>> {
        VersionRepo::find(&self.inner, filter, order).await
    }

    async fn save(&self, version: &Version) -> StorageResult<()> {
        VersionRepo::save(&self.inner, version).await
    }
}

#[tokio::test]
async fn test_failed_version_write_rolls_back_document() {
    let documents = Arc::new(MemoryStore::new());
    let versions = Arc::new(FlakyVersions {
        inner: MemoryStore::new(),
        fail: AtomicBool::new(false),
    });
    let history = History::new(documents, versions.clone(), &Config::default(), Bus::new());

    let (doc, _) = history
        .create_document(&alice(), new_doc("Plan", "before"))
        .await
        .unwrap();

    versions.fail.store(true, Ordering::SeqCst);
    let err = history
        .create_version(&alice(), &doc.id, edit("after"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.failure().message, "internal error");

    versions.fail.store(false, Ordering::SeqCst);
    let doc = history.get_document(&alice(), &doc.id).await.unwrap();
    assert_eq!(doc.content, "before");
    assert_eq!(doc.version_count, 1);
}

#[tokio::test]
async fn test_failed_first_version_discards_document() {
    let documents = Arc::new(MemoryStore::new());
    let versions = Arc::new(FlakyVersions {
        inner: MemoryStore::new(),
        fail: AtomicBool::new(true),
    });
    let history = History::new(documents, versions, &Config::default(), Bus::new());

    let err = history
        .create_document(&alice(), new_doc("Plan", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    let page = history
        .list_documents(&alice(), Page::new(1, 10))
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

/// Owner plus one named reader; records every document it is asked about.
struct SharedWith {
    reader: String,
    consulted: std::sync::Mutex<Vec<String>>,
}

impl SharedWith {
    fn new(reader: &str) -> Arc<Self> {
        Arc::new(Self {
            reader: reader.to_string(),
            consulted: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn consulted(&self) -> Vec<String> {
        self.consulted.lock().unwrap().clone()
    }
}

impl folio_core::Authorizer for SharedWith {
    fn authorize(
        &self,
        actor: &Actor,
        document: &folio_storage::Document,
    ) -> folio_core::CoreResult<()> {
        self.consulted.lock().unwrap().push(document.id.clone());
        if actor.id == document.owner_id || actor.id == self.reader {
            Ok(())
        } else {
            Err(folio_core::CoreError::access_denied(&document.id))
        }
    }
}

#[tokio::test]
async fn test_custom_authorizer_decides_access() {
    let authorizer = SharedWith::new("bob");
    let history = memory_history().with_authorizer(authorizer.clone());
    let (doc, _) = history
        .create_document(&alice(), new_doc("Shared", "v1"))
        .await
        .unwrap();

    // not the owner, but allowed by the authorizer
    let version = history
        .create_version(&bob(), &doc.id, edit("v2"))
        .await
        .unwrap();
    assert_eq!(version.author_id.as_deref(), Some("bob"));
    assert_eq!(history.list_versions(&alice(), &doc.id).await.unwrap().len(), 2);

    let err = history
        .get_document(&Actor::new("carol"), &doc.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
    assert_eq!(authorizer.consulted(), vec![doc.id.clone(); 3]);
}

#[tokio::test]
async fn test_missing_document_skips_authorizer() {
    let authorizer = SharedWith::new("bob");
    let history = memory_history().with_authorizer(authorizer.clone());

    let err = history
        .get_document(&alice(), "doc_01ARZ3NDEKTSV4RRFFQ69G5FAV")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(authorizer.consulted().is_empty());
}
