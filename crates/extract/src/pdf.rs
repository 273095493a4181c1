//! PDF text extraction.

use crate::ExtractError;
use std::path::Path;

/// Extract the text of every page, concatenated in page order.
pub fn read_pdf(path: &Path) -> Result<String, ExtractError> {
    pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_input_is_a_pdf_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("not-a.pdf");
        std::fs::write(&path, b"definitely not a pdf").expect("write");

        let err = read_pdf(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
