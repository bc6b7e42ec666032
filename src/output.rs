//! Result types: discovered documents, per-document outcomes, run report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A PDF discovered in the input directory.
///
/// The filename is the stable identity used by the registry; the stem names
/// the note and any intermediate artefacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: PathBuf,
    /// File name including extension, e.g. `smith2021.pdf`.
    pub name: String,
    /// File name without extension, e.g. `smith2021`.
    pub stem: String,
}

impl Document {
    /// Build a document from a path. Returns `None` for paths without a
    /// UTF-8 file name.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?.to_string();
        let stem = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            path: path.to_path_buf(),
            name,
            stem,
        })
    }
}

/// Where a failed document stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The PDF could not be opened or its text layer read.
    Read,
    /// The remote parser gave up.
    Parse,
    /// Extraction succeeded but produced nothing worth summarising.
    EmptyContent,
    /// Every note generator failed.
    Generate,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Read => "read",
            FailureStage::Parse => "parse",
            FailureStage::EmptyContent => "empty content",
            FailureStage::Generate => "generate",
        };
        f.write_str(s)
    }
}

/// Terminal state of one document in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// Already in the registry; nothing was attempted.
    Skipped,
    /// Note written by the named generator.
    NoteWritten { generator: String, note: PathBuf },
    /// Attempted and failed.
    Failed { stage: FailureStage, reason: String },
}

impl DocumentOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DocumentOutcome::Failed { .. })
    }
}

/// One row of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Outcome of a whole run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub documents: Vec<DocumentReport>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn push(&mut self, name: impl Into<String>, outcome: DocumentOutcome) {
        self.documents.push(DocumentReport {
            name: name.into(),
            outcome,
        });
    }

    /// Names of documents whose attempt failed this run.
    pub fn failed(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|d| d.outcome.is_failed())
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Names of documents that got a note this run.
    pub fn written(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::NoteWritten { .. }))
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn skipped(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.outcome == DocumentOutcome::Skipped)
            .count()
    }

    pub fn outcome(&self, name: &str) -> Option<&DocumentOutcome> {
        self.documents
            .iter()
            .find(|d| d.name == name)
            .map(|d| &d.outcome)
    }
}
