//! Document identity and the stored views of a document

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Externally assigned document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(pub u64);

impl DocumentId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for DocumentId {
    fn from(value: u64) -> Self {
        DocumentId(value)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(DocumentId)
    }
}

/// The two historical copies kept for a converted document.
///
/// `pre_conversion_content` is written once, before the first patcher runs.
/// `post_conversion_content` stays `None` until a conversion succeeds and is
/// replaced on every successful re-conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub document_id: DocumentId,
    pub pre_conversion_content: String,
    pub post_conversion_content: Option<String>,
}

/// Read view combining the live field with the snapshot columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub live_content: String,
    pub original_content: Option<String>,
    pub converted_content: Option<String>,
}

impl Document {
    pub fn from_parts(id: DocumentId, live_content: String, snapshot: Option<Snapshot>) -> Self {
        let (original_content, converted_content) = match snapshot {
            Some(snapshot) => (
                Some(snapshot.pre_conversion_content),
                snapshot.post_conversion_content,
            ),
            None => (None, None),
        };
        Document {
            id,
            live_content,
            original_content,
            converted_content,
        }
    }

    /// Whether the live field currently holds the converted block markup.
    pub fn is_converted(&self) -> bool {
        self.converted_content.as_deref() == Some(self.live_content.as_str())
    }
}
