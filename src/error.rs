use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AtlasError {
    #[error("invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("no free project id left (PRJ001..PRJ999 are all taken)")]
    IdentifierSpaceExhausted,

    #[error("missing config file atlas.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),

    #[error("failed to encode project descriptor: {0}")]
    Descriptor(String),

    #[error("no projects selected for download")]
    EmptySelection,

    #[error("error creating ZIP: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("{0}")]
    #[diagnostic(help("fix the upload and submit again"))]
    Rejected(#[from] Rejection),
}

/// Why a submission was turned down before anything was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    WrongFileCount { expected: usize, found: usize },
    MissingTitle,
    TitleTooLong { limit: usize, found: usize },
    MissingRole(Vec<String>),
    MalformedMetadata(String),
    MissingColumns(Vec<String>),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::WrongFileCount { expected, found } => write!(
                f,
                "wrong file count: please upload exactly {expected} files (got {found})"
            ),
            Rejection::MissingTitle => write!(f, "missing title: please enter a project title"),
            Rejection::TitleTooLong { limit, found } => write!(
                f,
                "title too long: at most {limit} characters allowed (got {found})"
            ),
            Rejection::MissingRole(roles) => write!(
                f,
                "missing required files: {} (expected count.csv, taxa.csv, meta.csv, asv.fasta)",
                roles.join(", ")
            ),
            Rejection::MalformedMetadata(detail) => {
                write!(f, "malformed metadata file: {detail}")
            }
            Rejection::MissingColumns(columns) => write!(
                f,
                "metadata file is missing required columns: {}",
                columns.join(", ")
            ),
        }
    }
}

impl std::error::Error for Rejection {}
