use std::io;
use thiserror::Error;

/// Everything that can go wrong turning one input into text. All of
/// these are per-item failures; the indexer logs and moves on.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not valid UTF-8: {0}")]
    Utf8(String),

    #[error("front matter parse error: {0}")]
    FrontMatter(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("feed parse error: {0}")]
    FeedParse(String),
}
