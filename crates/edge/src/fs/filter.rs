//! Path classification and exclusion-pattern handling.

use crate::{Error, Result};
use domain::doc::DocKind;
use extract::ExtractError;
use glob::Pattern;
use std::path::Path;

/// Compile basename globs, surfacing the offending pattern on failure.
pub fn compile_patterns(exclude: &[String]) -> Result<Vec<Pattern>> {
    exclude
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| Error::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Classify a path by its MIME type, keyed on the extension.
///
/// The OS MIME table (via `mime_guess`) is consulted first; extensions
/// it does not know fall back to a built-in map. Anything else is an
/// `UnsupportedFormat` failure for that file alone.
pub fn classify(path: &Path) -> std::result::Result<DocKind, ExtractError> {
    if let Some(mime) = mime_guess::from_path(path).first() {
        if let Ok(kind) = mime.essence_str().parse::<DocKind>() {
            return Ok(kind);
        }
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("txt" | "text") => Ok(DocKind::Plain),
        Some("md" | "markdown" | "mkd" | "mkdn") => Ok(DocKind::Markdown),
        Some("csv") => Ok(DocKind::Csv),
        Some("pdf") => Ok(DocKind::Pdf),
        Some("epub") => Ok(DocKind::Epub),
        Some("docx") => Ok(DocKind::Docx),
        Some("pptx") => Ok(DocKind::Pptx),
        Some("xlsx") => Ok(DocKind::Xlsx),
        _ => Err(ExtractError::UnsupportedFormat(
            path.to_string_lossy().into_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_classify() {
        let cases = [
            ("notes.txt", DocKind::Plain),
            ("notes.TXT", DocKind::Plain),
            ("post.md", DocKind::Markdown),
            ("post.markdown", DocKind::Markdown),
            ("table.csv", DocKind::Csv),
            ("paper.pdf", DocKind::Pdf),
            ("book.epub", DocKind::Epub),
            ("report.docx", DocKind::Docx),
            ("deck.pptx", DocKind::Pptx),
            ("sheet.xlsx", DocKind::Xlsx),
        ];

        for (name, expected) in cases {
            let kind = classify(Path::new(name)).expect(name);
            assert_eq!(kind, expected, "classify({name})");
        }
    }

    #[test]
    fn unknown_types_are_unsupported() {
        for name in ["image.png", "archive.zip", "binary", "page.html", ".hidden"] {
            let err = classify(Path::new(name)).unwrap_err();
            assert!(
                matches!(err, ExtractError::UnsupportedFormat(_)),
                "expected UnsupportedFormat for {name}"
            );
        }
    }

    #[test]
    fn bad_glob_reports_the_pattern() {
        let err = compile_patterns(&["[".to_owned()]).unwrap_err();
        assert!(err.to_string().contains('['));
    }

    #[test]
    fn good_globs_compile_in_order() {
        let patterns = compile_patterns(&["*.tmp".to_owned(), ".git".to_owned()]).expect("compile");
        assert_eq!(patterns.len(), 2);
        assert!(patterns[0].matches("junk.tmp"));
        assert!(patterns[1].matches(".git"));
    }
}
