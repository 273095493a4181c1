// crates/domain/src/doc.rs

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free-form extraction metadata. Values are stringified on entry so the
/// map stays uniform regardless of the source (file stats, front matter,
/// feed entries).
pub type Metadata = BTreeMap<String, String>;

// ─────────────────────────────────────────────────────────────────────────────
// Content kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Content discriminator for an indexed document.
///
/// Files serialise as their MIME string; feed entries as the bare tag
/// `web`. The string form is what gets persisted in the `type` column,
/// so `as_str`/`from_str` must stay inverses of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    Plain,
    Markdown,
    Csv,
    Pdf,
    Epub,
    Docx,
    Pptx,
    Xlsx,
    Web,
}

pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Plain => "text/plain",
            DocKind::Markdown => "text/markdown",
            DocKind::Csv => "text/csv",
            DocKind::Pdf => "application/pdf",
            DocKind::Epub => "application/epub+zip",
            DocKind::Docx => MIME_DOCX,
            DocKind::Pptx => MIME_PPTX,
            DocKind::Xlsx => MIME_XLSX,
            DocKind::Web => "web",
        }
    }

    /// True for kinds that live on the local filesystem.
    pub fn is_file(&self) -> bool {
        !matches!(self, DocKind::Web)
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document type: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for DocKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text/plain" => Ok(DocKind::Plain),
            "text/markdown" => Ok(DocKind::Markdown),
            "text/csv" => Ok(DocKind::Csv),
            "application/pdf" => Ok(DocKind::Pdf),
            "application/epub+zip" => Ok(DocKind::Epub),
            MIME_DOCX => Ok(DocKind::Docx),
            MIME_PPTX => Ok(DocKind::Pptx),
            MIME_XLSX => Ok(DocKind::Xlsx),
            "web" => Ok(DocKind::Web),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

impl Serialize for DocKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// The indexed unit: one file, one feed entry, one web page.
///
/// `uri` is the global identity: the canonical absolute path for files,
/// the entry link for web content. At most one persisted row exists per
/// `uri` at any instant; the indexer enforces this with its
/// check-then-write discipline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub uri: String,
    pub title: String,
    pub kind: DocKind,

    /// Full extracted plain text. Never NULL in the store; empty is legal
    /// but produces an unsearchable row.
    pub body: String,

    /// SHA-256 hex digest of the raw bytes for files; `None` for web
    /// entries, whose presence alone gates reindexing.
    pub fingerprint: Option<String>,

    /// Carried through the pipeline for callers; not persisted.
    pub metadata: Metadata,
}

impl Document {
    pub fn new(uri: impl Into<String>, title: impl Into<String>, kind: DocKind) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            kind,
            body: String::new(),
            fingerprint: None,
            metadata: Metadata::new(),
        }
    }

    // ───────────────────────────────
    // Builder-style setters
    // ───────────────────────────────

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Search results
// ─────────────────────────────────────────────────────────────────────────────

/// One ranked search result. `snippet` is a display-sized prefix of the
/// stored body, not the full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub uri: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: DocKind,
    pub snippet: String,
}
