//! Filters and sort orders shared by the storage backends.

use crate::record::{Document, Version};
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Field to sort documents by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentSortField {
    CreatedAt,
    #[default]
    UpdatedAt,
    Name,
}

/// Document sort specification. Ties are broken by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentSort {
    pub field: DocumentSortField,
    pub order: SortOrder,
}

impl DocumentSort {
    pub fn new(field: DocumentSortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let primary = match self.field {
            DocumentSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            DocumentSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            DocumentSortField::Name => a.name.cmp(&b.name),
        };
        self.order.apply(primary.then_with(|| a.id.cmp(&b.id)))
    }
}

/// Document filter. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub owner_id: Option<String>,
}

impl DocumentFilter {
    /// Documents owned by `owner_id`.
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.owner_id
            .as_ref()
            .map_or(true, |owner| &doc.owner_id == owner)
    }
}

/// Version filter. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionFilter {
    pub id: Option<String>,
    pub document_id: Option<String>,
}

impl VersionFilter {
    /// Versions belonging to `document_id`.
    pub fn for_document(document_id: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
            ..Default::default()
        }
    }

    /// A specific version, scoped to its document.
    pub fn version_of(document_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            id: Some(version_id.into()),
            document_id: Some(document_id.into()),
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.id.as_ref().map_or(true, |id| &version.id == id)
            && self
                .document_id
                .as_ref()
                .map_or(true, |doc| &version.document_id == doc)
    }
}

/// Sort documents in place.
pub fn sort_documents(documents: &mut [Document], sort: DocumentSort) {
    documents.sort_by(|a, b| sort.compare(a, b));
}

/// Sort versions in place by `(created_at, number)`.
pub fn sort_versions(versions: &mut [Version], order: SortOrder) {
    versions.sort_by(|a, b| {
        order.apply(
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.number.cmp(&b.number)),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{NewDocument, NewVersion};
    use chrono::{Duration, Utc};

    fn doc(id: &str, name: &str, owner: &str) -> Document {
        NewDocument::new(name, "", owner).into_document(id.to_string())
    }

    fn version(id: &str, document_id: &str, number: u64, offset_ms: i64) -> Version {
        NewVersion {
            document_id: document_id.to_string(),
            number,
            content: String::new(),
            is_auto_save: false,
            diff: serde_json::Value::Null,
            merged_from_version_id: None,
            author_id: None,
            created_at: Utc::now() + Duration::milliseconds(offset_ms),
        }
        .into_version(id.to_string())
    }

    #[test]
    fn test_document_filter_owner() {
        let filter = DocumentFilter::owned_by("alice");
        assert!(filter.matches(&doc("doc_1", "a", "alice")));
        assert!(!filter.matches(&doc("doc_2", "a", "bob")));
        assert!(DocumentFilter::default().matches(&doc("doc_3", "a", "carol")));
    }

    #[test]
    fn test_version_filter() {
        let v = version("ver_1", "doc_1", 1, 0);
        assert!(VersionFilter::default().matches(&v));
        assert!(VersionFilter::for_document("doc_1").matches(&v));
        assert!(!VersionFilter::for_document("doc_2").matches(&v));
        assert!(VersionFilter::version_of("doc_1", "ver_1").matches(&v));
        assert!(!VersionFilter::version_of("doc_2", "ver_1").matches(&v));
    }

    #[test]
    fn test_sort_documents_by_name() {
        let mut docs = vec![doc("doc_1", "b", "x"), doc("doc_2", "a", "x")];
        sort_documents(
            &mut docs,
            DocumentSort::new(DocumentSortField::Name, SortOrder::Ascending),
        );
        assert_eq!(docs[0].name, "a");
    }

    #[test]
    fn test_sort_versions_breaks_ties_by_number() {
        let first = version("ver_1", "doc_1", 1, 0);
        let mut second = version("ver_2", "doc_1", 2, 0);
        second.created_at = first.created_at;

        let mut versions = vec![first, second];
        sort_versions(&mut versions, SortOrder::Descending);
        assert_eq!(versions[0].number, 2);
        assert_eq!(versions[1].number, 1);
    }
}
