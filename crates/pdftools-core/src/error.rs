use thiserror::Error;

use crate::tool::Tool;

/// How a failure should be reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caused by the request itself; never retried.
    Validation,
    /// A recognized tool that intentionally has no implementation.
    Unsupported,
    /// The document engine or converter failed.
    Processing,
}

#[derive(Error, Debug)]
pub enum PdfToolError {
    #[error("No files were provided")]
    NoFiles,

    #[error("Missing required option '{option}' for {tool}")]
    MissingOption { tool: Tool, option: &'static str },

    #[error("No pages selected")]
    NoPagesSelected,

    #[error("Cannot delete every page of the document")]
    CannotDeleteAllPages,

    #[error("Crop margin {margin} is too large for page {page}")]
    MarginTooLarge { margin: i64, page: usize },

    #[error("{0} is not supported")]
    Unsupported(Tool),

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Conversion failed: {0}")]
    ConversionError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PdfToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfToolError::NoFiles
            | PdfToolError::MissingOption { .. }
            | PdfToolError::NoPagesSelected
            | PdfToolError::CannotDeleteAllPages
            | PdfToolError::MarginTooLarge { .. } => ErrorKind::Validation,
            PdfToolError::Unsupported(_) => ErrorKind::Unsupported,
            PdfToolError::ParseError(_)
            | PdfToolError::OperationError(_)
            | PdfToolError::ConversionError(_)
            | PdfToolError::SerializationError(_) => ErrorKind::Processing,
        }
    }
}

/// Rejections raised by the upload gate before anything is dispatched.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    #[error("No files were uploaded")]
    NoFiles,

    #[error("No tool was specified")]
    MissingTool,

    #[error("Unrecognized tool '{0}'")]
    UnknownTool(String),

    #[error("Unsupported file type for '{0}'. Only PDF, DOCX and DOC files are allowed")]
    UnsupportedFileType(String),

    #[error("File '{name}' is too large. The maximum size is {}", format_size(*.limit))]
    FileTooLarge { name: String, limit: u64 },

    #[error("Too many files. At most {limit} files are allowed")]
    TooManyFiles { limit: usize },

    #[error("Unexpected file field '{0}'")]
    UnexpectedFileField(String),

    #[error("Malformed upload: {0}")]
    Malformed(String),
}

fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
