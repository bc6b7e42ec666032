//! Error types for the pdf2note library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`Pdf2NoteError`]: **Fatal or per-document**: configuration cannot be
//!   loaded, a directory is missing, the registry cannot be written, or a
//!   single PDF cannot be opened. Setup errors abort the run; per-document
//!   errors are caught by the coordinator and recorded in the
//!   [`crate::output::RunReport`].
//!
//! * [`BackendError`]: **One failed remote call**. Its variant decides
//!   whether [`crate::retry::RetryPolicy`] tries again (`Transient`) or gives
//!   up at once (`RateLimited`, `ProviderSwitch`) so the fallback generator
//!   gets its turn without burning the retry budget.
//!
//! * [`GenerateError`]: **A generator gave up** after its retry budget, or
//!   the note could not be written.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal and per-document errors returned by the pdf2note library.
#[derive(Debug, Error)]
pub enum Pdf2NoteError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML/JSON for the expected keys.
    #[error("Failed to parse config file '{path}': {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A note generator is listed but its credentials are missing.
    #[error("Note generator '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The input directory does not exist or is not a directory.
    #[error("PDF directory not found: '{path}'\nCheck `pdf_dir` in the config file.")]
    DirectoryNotFound { path: PathBuf },

    /// Listing the input directory failed.
    #[error("Failed to list '{path}': {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set `pdfium_lib_path` in the config file or PDFIUM_LIB_PATH to the directory\n\
containing libpdfium, or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    /// PDF is corrupt, encrypted, or otherwise cannot be opened.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Text extraction failed for a specific page.
    #[error("Text extraction failed for page {page} of '{path}': {detail}")]
    TextExtractionFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    // ── Registry errors ───────────────────────────────────────────────────
    /// The processed-files registry exists but could not be read or decoded.
    #[error("Failed to load registry '{path}': {detail}")]
    RegistryLoad { path: PathBuf, detail: String },

    /// The processed-files registry could not be persisted.
    #[error("Failed to persist registry '{path}': {source}")]
    RegistryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single failed call to a remote service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The service answered HTTP 429 (or an equivalent signal).
    #[error("{provider}: rate limit exceeded: {detail}")]
    RateLimited { provider: String, detail: String },

    /// The service returned its provider-specific "switch provider" code.
    #[error("{provider}: provider error {code}: {detail}")]
    ProviderSwitch {
        provider: String,
        code: i64,
        detail: String,
    },

    /// Anything else: network error, non-200 status, malformed payload.
    #[error("{provider}: {detail}")]
    Transient { provider: String, detail: String },
}

impl BackendError {
    pub fn transient(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        BackendError::Transient {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    /// Only transient errors are worth another attempt. Rate limits and
    /// switch codes hand control to the next generator instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Transient { .. })
    }
}

/// A note generator gave up on one document.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The backend failed; `attempts` calls were made before giving up.
    #[error("{generator} failed after {attempts} attempt(s): {source}")]
    Backend {
        generator: String,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// The completion arrived but the note could not be written.
    #[error("{generator}: {source}")]
    WriteFailed {
        generator: String,
        #[source]
        source: Pdf2NoteError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(BackendError::transient("siliconflow", "HTTP 502").is_retryable());
        assert!(!BackendError::RateLimited {
            provider: "siliconflow".into(),
            detail: "slow down".into(),
        }
        .is_retryable());
        assert!(!BackendError::ProviderSwitch {
            provider: "siliconflow".into(),
            code: 20042,
            detail: "model busy".into(),
        }
        .is_retryable());
    }

    #[test]
    fn provider_switch_display() {
        let e = BackendError::ProviderSwitch {
            provider: "siliconflow".into(),
            code: 20042,
            detail: "model busy".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("20042"), "got: {msg}");
        assert!(msg.contains("siliconflow"), "got: {msg}");
    }

    #[test]
    fn generate_error_reports_attempts() {
        let e = GenerateError::Backend {
            generator: "moonshot".into(),
            attempts: 5,
            source: BackendError::transient("moonshot", "connection reset"),
        };
        let msg = e.to_string();
        assert!(msg.contains("5 attempt"), "got: {msg}");
        assert!(msg.contains("connection reset"), "got: {msg}");
    }

    #[test]
    fn directory_not_found_mentions_key() {
        let e = Pdf2NoteError::DirectoryNotFound {
            path: PathBuf::from("/nope"),
        };
        assert!(e.to_string().contains("pdf_dir"));
    }
}
