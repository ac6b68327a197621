//! Office document conversion
//!
//! The dispatcher only sees the [`OfficeConverter`] trait; the production
//! implementation shells out to a headless LibreOffice.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::PdfToolError;

/// Output format requested from a converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Pdf,
}

impl TargetFormat {
    fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
        }
    }
}

/// Converts a binary office document into another format. Implementations
/// may block; callers run them off the async executor.
pub trait OfficeConverter: Send + Sync {
    fn convert(
        &self,
        bytes: &[u8],
        source_name: &str,
        target: TargetFormat,
    ) -> Result<Vec<u8>, PdfToolError>;
}

/// Converter backed by `soffice --headless --convert-to`.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    binary: PathBuf,
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl LibreOfficeConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl OfficeConverter for LibreOfficeConverter {
    fn convert(
        &self,
        bytes: &[u8],
        source_name: &str,
        target: TargetFormat,
    ) -> Result<Vec<u8>, PdfToolError> {
        // Error messages below never mention the scratch paths.
        let scratch = tempfile::Builder::new()
            .prefix("pdftools-convert-")
            .tempdir()
            .map_err(|e| conversion_error("could not create scratch space", e))?;

        let input = scratch
            .path()
            .join(format!("input.{}", source_extension(source_name)));
        std::fs::write(&input, bytes)
            .map_err(|e| conversion_error("could not stage input document", e))?;

        // A private profile keeps concurrent conversions from fighting over
        // LibreOffice's user installation lock.
        let profile = format!(
            "-env:UserInstallation=file://{}",
            scratch.path().join("profile").display()
        );

        tracing::debug!(
            "Running {} for '{}' ({} bytes)",
            self.binary.display(),
            source_name,
            bytes.len()
        );

        let output = Command::new(&self.binary)
            .arg(profile)
            .arg("--headless")
            .arg("--convert-to")
            .arg(target.extension())
            .arg("--outdir")
            .arg(scratch.path())
            .arg(&input)
            .output()
            .map_err(|e| conversion_error("office converter is not available", e))?;

        if !output.status.success() {
            tracing::warn!(
                "Office converter exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(PdfToolError::ConversionError(format!(
                "office converter exited with {}",
                output.status
            )));
        }

        let converted = input.with_extension(target.extension());
        std::fs::read(&converted).map_err(|e| conversion_error("converter produced no output", e))
    }
}

fn conversion_error(context: &str, err: std::io::Error) -> PdfToolError {
    PdfToolError::ConversionError(format!("{} ({})", context, err.kind()))
}

/// Extension for the staged input, taken from the upload's filename.
/// LibreOffice picks its import filter from it.
fn source_extension(source_name: &str) -> String {
    Path::new(source_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "docx".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_extension() {
        assert_eq!(source_extension("report.DOC"), "doc");
        assert_eq!(source_extension("report.docx"), "docx");
        assert_eq!(source_extension("no-extension"), "docx");
        assert_eq!(source_extension("../../etc/passwd"), "docx");
        assert_eq!(source_extension("weird.d$x"), "docx");
    }

    #[test]
    fn test_missing_binary_is_a_conversion_error() {
        let converter = LibreOfficeConverter::new("/nonexistent/pdftools/soffice");
        let err = converter
            .convert(b"PK\x03\x04", "letter.docx", TargetFormat::Pdf)
            .unwrap_err();

        assert!(matches!(err, PdfToolError::ConversionError(_)));
        let message = err.to_string();
        assert!(!message.contains("pdftools-convert-"), "leaked path: {message}");
        assert!(!message.contains("/nonexistent"), "leaked path: {message}");
    }

    #[test]
    fn test_default_binary() {
        assert_eq!(LibreOfficeConverter::default().binary, PathBuf::from("soffice"));
    }
}
