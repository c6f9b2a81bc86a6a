//! Restore operator
//!
//! Copies one snapshot column back into the live field for a set of documents:
//! the original content to undo a conversion, or the converted blocks to redo
//! one without running the chain again. Rows are written one at a time with no
//! surrounding transaction; a failure stops the run and reports how many rows
//! were already restored.

use crate::document::DocumentId;
use crate::error::{RestoreError, ScopeError, StorageError};
use crate::store::SnapshotStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Snapshot column to copy into the live field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreTarget {
    #[default]
    Original,
    Converted,
}

impl fmt::Display for RestoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreTarget::Original => write!(f, "original"),
            RestoreTarget::Converted => write!(f, "converted"),
        }
    }
}

impl FromStr for RestoreTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(RestoreTarget::Original),
            "converted" | "blocks" => Ok(RestoreTarget::Converted),
            other => Err(format!(
                "unknown restore target '{other}' (expected original or converted)"
            )),
        }
    }
}

/// Documents a restore applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreScope {
    /// Every document with a snapshot
    All,
    Only(BTreeSet<DocumentId>),
}

impl RestoreScope {
    /// Parse a comma-separated id list such as `7, 8,12`.
    ///
    /// Blank entries are ignored; a list with no ids at all is
    /// [`ScopeError::Empty`].
    pub fn from_csv(raw: &str) -> Result<Self, ScopeError> {
        let mut ids = BTreeSet::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id = part
                .parse::<DocumentId>()
                .map_err(|_| ScopeError::MalformedId(part.to_string()))?;
            ids.insert(id);
        }
        if ids.is_empty() {
            return Err(ScopeError::Empty);
        }
        Ok(RestoreScope::Only(ids))
    }
}

impl FromStr for RestoreScope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(RestoreScope::All);
        }
        RestoreScope::from_csv(s)
    }
}

/// Cache in front of the live content, told which documents changed
pub trait ContentCache {
    fn invalidate(&mut self, ids: &[DocumentId]);
}

/// For stores that nothing caches
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl ContentCache for NoopCache {
    fn invalidate(&mut self, _ids: &[DocumentId]) {}
}

/// Restore `target` into the live field of every document in `scope`.
///
/// Returns the number of documents written. With [`RestoreTarget::Converted`],
/// documents that were never converted successfully are skipped and not
/// counted; an explicit scope where every selected document was skipped fails
/// with [`ScopeError::NotConverted`]. `cache` is invalidated for the written
/// ids, also when the run stops early.
pub fn restore<S, C>(
    store: &S,
    target: RestoreTarget,
    scope: &RestoreScope,
    cache: &mut C,
) -> Result<usize, RestoreError>
where
    S: SnapshotStore + ?Sized,
    C: ContentCache + ?Sized,
{
    let storage =
        |applied: usize| move |source: StorageError| RestoreError::Storage { applied, source };

    let snapshotted = store.snapshot_ids().map_err(storage(0))?;
    let selected: Vec<DocumentId> = match scope {
        RestoreScope::All => snapshotted,
        RestoreScope::Only(ids) => {
            if ids.is_empty() {
                return Err(ScopeError::Empty.into());
            }
            let matching: Vec<DocumentId> = snapshotted
                .into_iter()
                .filter(|id| ids.contains(id))
                .collect();
            if matching.is_empty() {
                return Err(ScopeError::NoMatchingSnapshots(ids.iter().copied().collect()).into());
            }
            if matching.len() < ids.len() {
                log::debug!(
                    "restore: {} of {} requested documents have no snapshot",
                    ids.len() - matching.len(),
                    ids.len()
                );
            }
            matching
        }
    };

    let mut written = Vec::with_capacity(selected.len());
    let mut skipped = Vec::new();
    for id in selected {
        let outcome = store.snapshot(id).and_then(|snapshot| {
            let content = snapshot.and_then(|s| match target {
                RestoreTarget::Original => Some(s.pre_conversion_content),
                RestoreTarget::Converted => s.post_conversion_content,
            });
            match content {
                Some(content) => store.set_live_content(id, &content).map(|_| true),
                None => Ok(false),
            }
        });

        match outcome {
            Ok(true) => written.push(id),
            Ok(false) => {
                log::debug!("restore: document {id} has no {target} content, skipped");
                skipped.push(id);
            }
            Err(source) => {
                cache.invalidate(&written);
                log::warn!(
                    "restore stopped at document {id} after {} document(s)",
                    written.len()
                );
                return Err(storage(written.len())(source));
            }
        }
    }

    if written.is_empty() && !skipped.is_empty() && matches!(scope, RestoreScope::Only(_)) {
        return Err(ScopeError::NotConverted(skipped).into());
    }

    cache.invalidate(&written);
    log::info!("restored {target} content for {} document(s)", written.len());
    Ok(written.len())
}
