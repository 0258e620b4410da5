use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::SignatoryRole;

/// Conditions that abort a whole batch. Nothing partial is returned.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("could not read template {path}: {source}")]
    TemplateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template {path} is not a valid document package: {source}")]
    TemplateFormat {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("template {0} has no word/document.xml part")]
    MissingDocumentPart(PathBuf),
    #[error("could not create scratch file: {0}")]
    Scratch(#[source] std::io::Error),
    #[error("could not write archive: {0}")]
    Archive(#[source] zip::result::ZipError),
    #[error("invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },
    #[error("could not read rows: {0}")]
    RowSource(String),
    #[error("invalid request file: {0}")]
    Request(String),
    #[error("could not render {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: RenderError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Failure confined to one rendered document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("rendered {part} is not well-formed: {reason}")]
    Markup { part: String, reason: String },
    #[error("could not package image: {0}")]
    Image(String),
    #[error("could not assemble document: {0}")]
    Package(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Non-fatal condition collected alongside a successful result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchWarning {
    MissingPlaceholders { placeholders: Vec<String> },
    UnknownPlaceholders { placeholders: Vec<String> },
    SignatureNotFound { role: SignatoryRole, asset: String },
    SignatureUnreadable { role: SignatoryRole, path: PathBuf, reason: String },
    ImageSkipped { site: String, date: String, index: usize, reason: String },
    RowFailed { row: usize, site: String, date: String, reason: String },
}

impl fmt::Display for BatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchWarning::MissingPlaceholders { placeholders } => {
                write!(f, "Template is missing placeholders: {}", placeholders.join(", "))
            }
            BatchWarning::UnknownPlaceholders { placeholders } => write!(
                f,
                "Template declares placeholders with no value: {}",
                placeholders.join(", ")
            ),
            BatchWarning::SignatureNotFound { role, asset } => {
                write!(f, "{} signature '{}' not found", role, asset)
            }
            BatchWarning::SignatureUnreadable { role, path, reason } => write!(
                f,
                "{} signature {} could not be read: {}",
                role,
                path.display(),
                reason
            ),
            BatchWarning::ImageSkipped { site, date, index, reason } => write!(
                f,
                "Image {} for {} ({}) skipped: {}",
                index + 1,
                site,
                date,
                reason
            ),
            BatchWarning::RowFailed { row, site, date, reason } => write!(
                f,
                "Row {} ({} {}) was not generated: {}",
                row + 1,
                site,
                date,
                reason
            ),
        }
    }
}
