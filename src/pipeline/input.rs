//! Input discovery: list the PDFs in the input directory.
//!
//! The scan is non-recursive and sorted by filename so two runs over the
//! same directory visit documents in the same order. The extension check is
//! case-insensitive (`Paper.PDF` is picked up); anything else is ignored.

use crate::error::Pdf2NoteError;
use crate::output::Document;
use std::path::Path;
use tracing::{debug, warn};

/// Whether `path` has a `.pdf` extension, ignoring case.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// List every `*.pdf` file directly inside `dir`, sorted by filename.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<Document>, Pdf2NoteError> {
    if !dir.is_dir() {
        return Err(Pdf2NoteError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let read_err = |source| Pdf2NoteError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if !path.is_file() || !is_pdf(&path) {
            continue;
        }
        match Document::from_path(&path) {
            Some(doc) => documents.push(doc),
            None => warn!("Skipping non-UTF-8 file name: {}", path.display()),
        }
    }

    documents.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Discovered {} PDFs in {}", documents.len(), dir.display());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("a.pdf")));
        assert!(is_pdf(Path::new("dir/B.PDF")));
        assert!(!is_pdf(Path::new("a.pdf.md")));
        assert!(!is_pdf(Path::new("pdf")));
        assert!(!is_pdf(Path::new("")));
    }

    #[test]
    fn discovers_sorted_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.pdf"), b"%PDF-1.4").unwrap();
        std::fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let docs = discover_pdfs(dir.path()).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
        assert_eq!(docs[0].stem, "a");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = discover_pdfs(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Pdf2NoteError::DirectoryNotFound { .. }));
    }
}
