//! Error types for conversion, storage and restore operations

use crate::document::DocumentId;
use std::fmt;

/// Stage of the pipeline in which a document failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Encode,
    Pre,
    Conversion,
    Post,
    Decode,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Encode => "encode",
            Phase::Pre => "pre-conversion",
            Phase::Conversion => "conversion",
            Phase::Post => "post-conversion",
            Phase::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// Reason reported by a patcher that could not transform its input.
///
/// The chain lifts a fault into a [`PatchError`] by attaching the patcher
/// identity, the phase and the document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFault(pub String);

impl PatchFault {
    pub fn new(reason: impl Into<String>) -> Self {
        PatchFault(reason.into())
    }
}

impl fmt::Display for PatchFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single patcher failed on a single document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchError {
    pub patcher: String,
    pub position: usize,
    pub phase: Phase,
    pub document_id: DocumentId,
    pub reason: String,
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "patcher '{}' (#{} in {} chain) failed on document {}: {}",
            self.patcher, self.position, self.phase, self.document_id, self.reason
        )
    }
}

impl std::error::Error for PatchError {}

/// Placeholder bookkeeping between encode and decode went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input already contained a placeholder-shaped token before encoding
    Collision { document_id: DocumentId, token: String },
    /// A placeholder was found that encode never produced
    UnknownPlaceholder { document_id: DocumentId, token: String },
    /// A placeholder appeared more than once after the phase patchers ran
    DuplicatePlaceholder { document_id: DocumentId, token: String },
    /// A recorded placeholder disappeared, its fragment would be lost
    DroppedPlaceholder { document_id: DocumentId, token: String },
}

impl CodecError {
    pub fn document_id(&self) -> DocumentId {
        match self {
            CodecError::Collision { document_id, .. }
            | CodecError::UnknownPlaceholder { document_id, .. }
            | CodecError::DuplicatePlaceholder { document_id, .. }
            | CodecError::DroppedPlaceholder { document_id, .. } => *document_id,
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Collision { document_id, token } => write!(
                f,
                "document {document_id} already contains placeholder token '{token}'"
            ),
            CodecError::UnknownPlaceholder { document_id, token } => {
                write!(f, "unknown placeholder '{token}' in document {document_id}")
            }
            CodecError::DuplicatePlaceholder { document_id, token } => {
                write!(f, "placeholder '{token}' duplicated in document {document_id}")
            }
            CodecError::DroppedPlaceholder { document_id, token } => {
                write!(f, "placeholder '{token}' dropped from document {document_id}")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// The external HTML-to-block step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionStepError(pub String);

impl ConversionStepError {
    pub fn new(message: impl Into<String>) -> Self {
        ConversionStepError(message.into())
    }
}

impl fmt::Display for ConversionStepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conversion step failed: {}", self.0)
    }
}

impl std::error::Error for ConversionStepError {}

/// Snapshot or live-content persistence failed
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    /// The id does not fit the storage key type
    IdOutOfRange(u64),
    UnknownDocument(DocumentId),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io: {err}"),
            StorageError::Sql(err) => write!(f, "sqlite: {err}"),
            StorageError::IdOutOfRange(id) => write!(f, "document id {id} out of range"),
            StorageError::UnknownDocument(id) => write!(f, "unknown document {id}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            StorageError::Sql(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        StorageError::Sql(value)
    }
}

/// A restore scope that selects nothing usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    Empty,
    MalformedId(String),
    NoMatchingSnapshots(Vec<DocumentId>),
    /// Converted content was requested but none of the ids has any
    NotConverted(Vec<DocumentId>),
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::Empty => write!(f, "restore scope is empty"),
            ScopeError::MalformedId(raw) => write!(f, "malformed document id '{raw}'"),
            ScopeError::NoMatchingSnapshots(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "no snapshot exists for documents {}", ids.join(","))
            }
            ScopeError::NotConverted(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "documents {} were never converted", ids.join(","))
            }
        }
    }
}

impl std::error::Error for ScopeError {}

/// Failure converting one document. Other documents are unaffected.
#[derive(Debug)]
pub enum ConvertError {
    Patch(PatchError),
    Codec(CodecError),
    ConversionStep {
        document_id: DocumentId,
        source: ConversionStepError,
    },
    Storage {
        document_id: DocumentId,
        source: StorageError,
    },
}

impl ConvertError {
    pub fn document_id(&self) -> DocumentId {
        match self {
            ConvertError::Patch(err) => err.document_id,
            ConvertError::Codec(err) => err.document_id(),
            ConvertError::ConversionStep { document_id, .. }
            | ConvertError::Storage { document_id, .. } => *document_id,
        }
    }

    /// Pipeline phase that failed, `None` for storage failures
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ConvertError::Patch(err) => Some(err.phase),
            ConvertError::Codec(CodecError::Collision { .. }) => Some(Phase::Encode),
            ConvertError::Codec(_) => Some(Phase::Decode),
            ConvertError::ConversionStep { .. } => Some(Phase::Conversion),
            ConvertError::Storage { .. } => None,
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Patch(err) => write!(f, "{err}"),
            ConvertError::Codec(err) => write!(f, "codec: {err}"),
            ConvertError::ConversionStep {
                document_id,
                source,
            } => write!(f, "document {document_id}: {source}"),
            ConvertError::Storage {
                document_id,
                source,
            } => write!(f, "document {document_id}: storage error: {source}"),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<PatchError> for ConvertError {
    fn from(value: PatchError) -> Self {
        ConvertError::Patch(value)
    }
}

impl From<CodecError> for ConvertError {
    fn from(value: CodecError) -> Self {
        ConvertError::Codec(value)
    }
}

/// Failure of a bulk restore
#[derive(Debug)]
pub enum RestoreError {
    Scope(ScopeError),
    /// Persistence failed after `applied` rows were already restored
    Storage { applied: usize, source: StorageError },
}

impl RestoreError {
    /// Rows restored before the failure
    pub fn applied(&self) -> usize {
        match self {
            RestoreError::Scope(_) => 0,
            RestoreError::Storage { applied, .. } => *applied,
        }
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreError::Scope(err) => write!(f, "invalid scope: {err}"),
            RestoreError::Storage { applied, source } => write!(
                f,
                "restore stopped after {applied} document(s): {source}"
            ),
        }
    }
}

impl std::error::Error for RestoreError {}

impl From<ScopeError> for RestoreError {
    fn from(value: ScopeError) -> Self {
        RestoreError::Scope(value)
    }
}

/// Errors raised while assembling a patch chain at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Patcher not found in registry
    PatcherNotFound(String),
    /// Patcher placed in a phase it does not support
    UnsupportedPhase { patcher: String, phase: Phase },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::PatcherNotFound(name) => write!(f, "Patcher '{name}' not found"),
            ChainError::UnsupportedPhase { patcher, phase } => {
                write!(f, "Patcher '{patcher}' does not support the {phase} phase")
            }
        }
    }
}

impl std::error::Error for ChainError {}
