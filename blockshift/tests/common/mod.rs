//! Shared fixtures for the integration tests

use blockshift::{
    ContentCache, DocumentId, PatchContext, PatchFault, Patcher, Snapshot, SnapshotStore,
    StorageError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const LEGACY_POST: &str = "<!-- wp:paragraph -->\n<p>Kept</p>\n<!-- /wp:paragraph -->\n\n\
Intro line\n\n\
<p>See [gallery ids=1,2]</p>\n\n\
<p><img src=\"a.png\" alt=\"A\" width=\"640\"></p>\n\n\
[embed]https://youtu.be/xyz[/embed]";

/// Records what each phase's patcher saw
#[derive(Clone)]
pub struct Recorder {
    name: &'static str,
    pre: bool,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn pre(name: &'static str) -> Self {
        Self {
            name,
            pre: true,
            seen: Arc::default(),
        }
    }

    pub fn post(name: &'static str) -> Self {
        Self {
            name,
            pre: false,
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Patcher for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn supports_pre(&self) -> bool {
        self.pre
    }

    fn supports_post(&self) -> bool {
        !self.pre
    }

    fn patch_html_source(&self, html: &str, _ctx: &PatchContext) -> Result<String, PatchFault> {
        self.seen.lock().unwrap().push(html.to_string());
        Ok(html.to_string())
    }

    fn patch_blocks_contents(
        &self,
        blocks: &str,
        _ctx: &PatchContext,
    ) -> Result<String, PatchFault> {
        self.seen.lock().unwrap().push(blocks.to_string());
        Ok(blocks.to_string())
    }
}

/// Cache that remembers every invalidation
#[derive(Debug, Default)]
pub struct RecordingCache {
    pub invalidated: Vec<DocumentId>,
    pub calls: usize,
}

impl ContentCache for RecordingCache {
    fn invalidate(&mut self, ids: &[DocumentId]) {
        self.calls += 1;
        self.invalidated.extend_from_slice(ids);
    }
}

/// Store wrapper whose live-content writes start failing after `budget` writes
pub struct FlakyStore<S> {
    inner: S,
    budget: usize,
    writes: AtomicUsize,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S, budget: usize) -> Self {
        Self {
            inner,
            budget,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SnapshotStore> SnapshotStore for FlakyStore<S> {
    fn live_content(&self, id: DocumentId) -> Result<String, StorageError> {
        self.inner.live_content(id)
    }

    fn set_live_content(&self, id: DocumentId, content: &str) -> Result<(), StorageError> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.budget {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.set_live_content(id, content)
    }

    fn snapshot(&self, id: DocumentId) -> Result<Option<Snapshot>, StorageError> {
        self.inner.snapshot(id)
    }

    fn capture_original(&self, id: DocumentId, content: &str) -> Result<bool, StorageError> {
        self.inner.capture_original(id, content)
    }

    fn record_converted(&self, id: DocumentId, blocks: &str) -> Result<(), StorageError> {
        self.inner.record_converted(id, blocks)
    }

    fn snapshot_ids(&self) -> Result<Vec<DocumentId>, StorageError> {
        self.inner.snapshot_ids()
    }

    fn document_ids(&self) -> Result<Vec<DocumentId>, StorageError> {
        self.inner.document_ids()
    }
}
