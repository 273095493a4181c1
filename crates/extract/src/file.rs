// crates/extract/src/file.rs

use crate::{archive, fm, pdf, ExtractError};
use chrono::{DateTime, Local};
use domain::doc::{DocKind, Metadata};
use std::fs;
use std::path::Path;

/// What an extractor hands back for one input: a display title, the full
/// plain-text body, and free-form metadata.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub title: String,
    pub body: String,
    pub metadata: Metadata,
}

/// Turn a classified file into `(title, body, metadata)`.
///
/// Extraction is synchronous; the indexer decides where it runs.
pub fn extract(path: &Path, kind: DocKind) -> Result<Extraction, ExtractError> {
    let title = basename(path);
    let mut metadata = file_metadata(path)?;

    let body = match kind {
        DocKind::Plain | DocKind::Csv => read_utf8(path)?,
        DocKind::Markdown => {
            let full = read_utf8(path)?;
            let (front, body) = fm::split_front_matter(&full)?;
            if let Some((_, data)) = front {
                fm::merge_into_metadata(&data, &mut metadata);
            }
            body
        }
        DocKind::Pdf => pdf::read_pdf(path)?,
        DocKind::Epub => archive::read_epub(path)?,
        DocKind::Docx | DocKind::Pptx | DocKind::Xlsx => archive::read_office(path, kind)?,
        DocKind::Web => {
            return Err(ExtractError::UnsupportedFormat(
                "web content is fetched, not read from disk".into(),
            ))
        }
    };

    Ok(Extraction {
        title,
        body,
        metadata,
    })
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn read_utf8(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| ExtractError::Utf8(e.to_string()))
}

/// Stat-derived metadata: `name`, `size`, `created_at`, `last_modified`.
/// Timestamps are RFC 3339 in local time; filesystems without a creation
/// time simply omit `created_at`.
fn file_metadata(path: &Path) -> Result<Metadata, ExtractError> {
    let stats = fs::metadata(path)?;
    let mut metadata = Metadata::new();

    metadata.insert("name".into(), basename(path));
    metadata.insert("size".into(), stats.len().to_string());

    if let Ok(created) = stats.created() {
        metadata.insert("created_at".into(), DateTime::<Local>::from(created).to_rfc3339());
    }
    if let Ok(modified) = stats.modified() {
        metadata.insert(
            "last_modified".into(),
            DateTime::<Local>::from(modified).to_rfc3339(),
        );
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plain_text_body_is_raw_contents() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        fs::write(&path, "The quick brown fox.").expect("write");

        let ex = extract(&path, DocKind::Plain).expect("extract");
        assert_eq!(ex.title, "a.txt");
        assert_eq!(ex.body, "The quick brown fox.");
        assert_eq!(ex.metadata["name"], "a.txt");
        assert_eq!(ex.metadata["size"], "20");
        assert!(ex.metadata.contains_key("last_modified"));
    }

    #[test]
    fn csv_is_read_verbatim() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("table.csv");
        fs::write(&path, "city,population\noslo,700000\n").expect("write");

        let ex = extract(&path, DocKind::Csv).expect("extract");
        assert!(ex.body.contains("oslo"));
    }

    #[test]
    fn markdown_front_matter_moves_into_metadata() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("post.md");
        fs::write(&path, "---\ntitle: A Post\ndraft: true\n---\nActual body here.\n")
            .expect("write");

        let ex = extract(&path, DocKind::Markdown).expect("extract");
        assert!(!ex.body.contains("draft"));
        assert!(ex.body.contains("Actual body here."));
        assert_eq!(ex.metadata["title"], "A Post");
        assert_eq!(ex.metadata["draft"], "true");
        // Stat keys survive the merge.
        assert_eq!(ex.metadata["name"], "post.md");
    }

    #[test]
    fn non_utf8_input_is_reported_as_such() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bin.txt");
        fs::write(&path, b"\xff\xfe\xfd").expect("write");

        let err = extract(&path, DocKind::Plain).unwrap_err();
        assert!(matches!(err, ExtractError::Utf8(_)));
    }

    #[test]
    fn web_kind_is_not_file_extractable() {
        let err = extract(Path::new("/nowhere"), DocKind::Web).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = extract(Path::new("/no/such/file.txt"), DocKind::Plain).unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }
}
