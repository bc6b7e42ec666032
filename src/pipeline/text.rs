//! Text-layer access: classify a PDF and extract its text locally.
//!
//! A PDF that carries a text layer on at least one page is *text-bearing* and
//! can be summarised straight from its extracted text, skipping the paid
//! remote parser. A PDF with no text on any page is *image-only* (typically a
//! scan) and must go through OCR on the remote side.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state; calling it from an async
//! worker would stall the runtime. [`PdfiumReader`] does all pdfium work on
//! tokio's blocking pool.

use crate::error::Pdf2NoteError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// At least one page yields non-blank text.
    TextBearing,
    /// No page yields any text.
    ImageOnly,
}

/// Reads the text layer of a PDF, one string per page, in page order.
#[async_trait]
pub trait TextLayerReader: Send + Sync {
    async fn page_texts(&self, pdf_path: &Path) -> Result<Vec<String>, Pdf2NoteError>;
}

/// Classify a document from its page texts.
pub fn classify_pages<S: AsRef<str>>(pages: &[S]) -> DocumentKind {
    if pages.iter().any(|p| !p.as_ref().trim().is_empty()) {
        DocumentKind::TextBearing
    } else {
        DocumentKind::ImageOnly
    }
}

/// Concatenate page texts with a newline between pages, in page order.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Open `pdf_path` and decide whether it has an extractable text layer.
pub async fn classify(
    reader: &dyn TextLayerReader,
    pdf_path: &Path,
) -> Result<DocumentKind, Pdf2NoteError> {
    let pages = reader.page_texts(pdf_path).await?;
    Ok(classify_pages(&pages))
}

/// Extract the full text of a text-bearing PDF.
pub async fn extract_text(
    reader: &dyn TextLayerReader,
    pdf_path: &Path,
) -> Result<String, Pdf2NoteError> {
    let pages = reader.page_texts(pdf_path).await?;
    Ok(join_pages(&pages))
}

/// [`TextLayerReader`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumReader {
    /// Directory containing libpdfium. If None, `PDFIUM_LIB_PATH`, then the
    /// system library.
    lib_dir: Option<PathBuf>,
}

impl PdfiumReader {
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        Self { lib_dir }
    }
}

#[async_trait]
impl TextLayerReader for PdfiumReader {
    async fn page_texts(&self, pdf_path: &Path) -> Result<Vec<String>, Pdf2NoteError> {
        let path = pdf_path.to_path_buf();
        let lib_dir = self.lib_dir.clone();

        tokio::task::spawn_blocking(move || read_pages_blocking(&path, lib_dir.as_deref()))
            .await
            .map_err(|e| Pdf2NoteError::Internal(format!("Text extraction task panicked: {e}")))?
    }
}

/// Bind to pdfium, preferring an explicit directory, then `PDFIUM_LIB_PATH`,
/// then whatever the system loader finds.
fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, Pdf2NoteError> {
    let env_dir = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    let dir = lib_dir.map(Path::to_path_buf).or(env_dir);

    let bindings = match dir {
        Some(dir) => {
            let lib = if dir.is_file() {
                dir
            } else {
                Pdfium::pdfium_platform_library_name_at_path(&dir)
            };
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Pdf2NoteError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn read_pages_blocking(
    pdf_path: &Path,
    lib_dir: Option<&Path>,
) -> Result<Vec<String>, Pdf2NoteError> {
    let pdfium = bind_pdfium(lib_dir)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| Pdf2NoteError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let mut texts = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| Pdf2NoteError::TextExtractionFailed {
                path: pdf_path.to_path_buf(),
                page: idx + 1,
                detail: format!("{e:?}"),
            })?
            .all();
        texts.push(text);
    }

    debug!(
        "Read text layer of {}: {} pages, {} chars",
        pdf_path.display(),
        texts.len(),
        texts.iter().map(|t| t.len()).sum::<usize>()
    );
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPages(Vec<&'static str>);

    #[async_trait]
    impl TextLayerReader for FixedPages {
        async fn page_texts(&self, _pdf_path: &Path) -> Result<Vec<String>, Pdf2NoteError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    #[test]
    fn any_text_page_makes_document_text_bearing() {
        assert_eq!(
            classify_pages(&["", "", "Introduction"]),
            DocumentKind::TextBearing
        );
        assert_eq!(classify_pages(&["Abstract"]), DocumentKind::TextBearing);
    }

    #[test]
    fn no_text_pages_make_document_image_only() {
        assert_eq!(classify_pages(&["", "", ""]), DocumentKind::ImageOnly);
        assert_eq!(classify_pages(&[" \n", "\t"]), DocumentKind::ImageOnly);
        assert_eq!(classify_pages::<&str>(&[]), DocumentKind::ImageOnly);
    }

    #[test]
    fn pages_joined_by_newline_in_order() {
        assert_eq!(join_pages(&["one", "two", "three"]), "one\ntwo\nthree");
        assert_eq!(join_pages(&["only"]), "only");
        assert_eq!(join_pages(&["", "b"]), "\nb");
    }

    #[tokio::test]
    async fn classify_and_extract_through_reader() {
        let reader = FixedPages(vec!["", "Results", "Discussion"]);
        let path = Path::new("paper.pdf");
        assert_eq!(
            classify(&reader, path).await.unwrap(),
            DocumentKind::TextBearing
        );
        assert_eq!(
            extract_text(&reader, path).await.unwrap(),
            "\nResults\nDiscussion"
        );
    }
}
