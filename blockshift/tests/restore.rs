//! Restore operator against real conversions

use crate::common::{FlakyStore, RecordingCache};
use blockshift::{
    restore, BlockConverter, ConversionEngine, ConversionStepError, DocumentId, MemoryStore,
    NoopCache, PatchChain, RestoreError, RestoreScope, RestoreTarget, ScopeError, SnapshotStore,
    StorageError,
};

/// Wraps content in a single block, refusing anything mentioning "refuse"
struct Wrap;

impl BlockConverter for Wrap {
    fn convert_to_blocks(&self, html: &str) -> Result<String, ConversionStepError> {
        if html.contains("refuse") {
            return Err(ConversionStepError::new("refused"));
        }
        Ok(format!("<!-- wp:html -->\n{html}\n<!-- /wp:html -->"))
    }
}

fn converted_store(docs: &[(u64, &str)]) -> MemoryStore {
    let store = MemoryStore::with_documents(docs.iter().map(|(id, c)| (DocumentId(*id), *c)));
    let engine = ConversionEngine::new(PatchChain::new(), Wrap);
    let ids: Vec<DocumentId> = docs.iter().map(|(id, _)| DocumentId(*id)).collect();
    engine.convert_batch(&store, &ids);
    store
}

fn only(ids: &[u64]) -> RestoreScope {
    RestoreScope::Only(ids.iter().copied().map(DocumentId).collect())
}

#[test]
fn scope_with_unsnapshotted_id_restores_the_rest() {
    let store = converted_store(&[(7, "<p>seven</p>")]);
    store.set_live_content(DocumentId(8), "<p>eight</p>").unwrap();

    let mut cache = RecordingCache::default();
    let count = restore(&store, RestoreTarget::Original, &only(&[7, 8]), &mut cache).unwrap();

    assert_eq!(count, 1);
    assert_eq!(store.live_content(DocumentId(7)).unwrap(), "<p>seven</p>");
    assert_eq!(store.live_content(DocumentId(8)).unwrap(), "<p>eight</p>");
    assert_eq!(cache.invalidated, vec![DocumentId(7)]);
}

#[test]
fn restoring_the_original_twice_is_idempotent() {
    let store = converted_store(&[(1, "<p>a</p>"), (2, "<p>b</p>")]);

    let first = restore(&store, RestoreTarget::Original, &RestoreScope::All, &mut NoopCache);
    let after_first: Vec<String> = [1, 2]
        .iter()
        .map(|id| store.live_content(DocumentId(*id)).unwrap())
        .collect();
    let second = restore(&store, RestoreTarget::Original, &RestoreScope::All, &mut NoopCache);
    let after_second: Vec<String> = [1, 2]
        .iter()
        .map(|id| store.live_content(DocumentId(*id)).unwrap())
        .collect();

    assert_eq!(first.unwrap(), 2);
    assert_eq!(second.unwrap(), 2);
    assert_eq!(after_first, vec!["<p>a</p>", "<p>b</p>"]);
    assert_eq!(after_first, after_second);
}

#[test]
fn restoring_converted_skips_documents_never_converted() {
    let store = converted_store(&[(1, "<p>a</p>"), (2, "<p>refuse</p>")]);
    restore(&store, RestoreTarget::Original, &RestoreScope::All, &mut NoopCache).unwrap();

    let count = restore(&store, RestoreTarget::Converted, &RestoreScope::All, &mut NoopCache)
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(
        store.live_content(DocumentId(1)).unwrap(),
        "<!-- wp:html -->\n<p>a</p>\n<!-- /wp:html -->"
    );
    assert_eq!(store.live_content(DocumentId(2)).unwrap(), "<p>refuse</p>");
}

#[test]
fn explicit_scopes_must_select_something() {
    let store = converted_store(&[(1, "<p>a</p>")]);

    let empty = restore(&store, RestoreTarget::Original, &only(&[]), &mut NoopCache);
    assert!(matches!(empty, Err(RestoreError::Scope(ScopeError::Empty))));

    let unmatched = restore(&store, RestoreTarget::Original, &only(&[4, 5]), &mut NoopCache);
    match unmatched {
        Err(RestoreError::Scope(ScopeError::NoMatchingSnapshots(ids))) => {
            assert_eq!(ids, vec![DocumentId(4), DocumentId(5)]);
        }
        other => panic!("Expected NoMatchingSnapshots, got {other:?}"),
    }
    assert_eq!(
        store.live_content(DocumentId(1)).unwrap(),
        "<!-- wp:html -->\n<p>a</p>\n<!-- /wp:html -->"
    );
}

#[test]
fn explicit_scope_with_nothing_converted_is_an_error() {
    let store = converted_store(&[(1, "<p>a</p>"), (2, "<p>refuse</p>")]);

    let refused = restore(&store, RestoreTarget::Converted, &only(&[2]), &mut NoopCache);
    match refused {
        Err(RestoreError::Scope(ScopeError::NotConverted(ids))) => {
            assert_eq!(ids, vec![DocumentId(2)]);
        }
        other => panic!("Expected NotConverted, got {other:?}"),
    }
    assert_eq!(store.live_content(DocumentId(2)).unwrap(), "<p>refuse</p>");

    let mixed = restore(&store, RestoreTarget::Converted, &only(&[1, 2]), &mut NoopCache);
    assert_eq!(mixed.unwrap(), 1);
}

#[test]
fn restoring_everything_with_no_snapshots_is_a_no_op() {
    let store = MemoryStore::with_documents([(DocumentId(1), "<p>a</p>")]);
    let mut cache = RecordingCache::default();
    assert_eq!(
        restore(&store, RestoreTarget::Original, &RestoreScope::All, &mut cache).unwrap(),
        0
    );
    assert!(cache.invalidated.is_empty());
}

#[test]
fn partial_failure_reports_applied_rows_and_invalidates_them() {
    let inner = converted_store(&[(1, "<p>a</p>"), (2, "<p>b</p>"), (3, "<p>c</p>")]);
    let store = FlakyStore::new(inner, 1);
    let mut cache = RecordingCache::default();

    let err = restore(&store, RestoreTarget::Original, &RestoreScope::All, &mut cache).unwrap_err();

    assert_eq!(err.applied(), 1);
    assert!(matches!(
        err,
        RestoreError::Storage {
            applied: 1,
            source: StorageError::Io(_)
        }
    ));
    assert_eq!(cache.invalidated, vec![DocumentId(1)]);
    assert_eq!(cache.calls, 1);
    assert_eq!(store.inner().live_content(DocumentId(1)).unwrap(), "<p>a</p>");
    assert!(store.inner().live_content(DocumentId(2)).unwrap().starts_with("<!-- wp:html -->"));
}
