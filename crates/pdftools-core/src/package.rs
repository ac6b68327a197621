//! Response packaging
//!
//! Decides content type and filename for a tool's output, and bundles
//! multi-document results into a zip archive.

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::dispatch::{Artifact, DocumentFormat};
use crate::error::PdfToolError;
use crate::tool::Tool;

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageBody {
    Bytes(Vec<u8>),
    Archive(Vec<ArchiveEntry>),
}

/// Everything needed to answer the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub content_type: &'static str,
    pub filename: String,
    pub body: PackageBody,
}

/// Shape a tool's artifact for download. `at` stamps the filenames.
pub fn package(tool: Tool, artifact: Artifact, at: DateTime<Utc>) -> Package {
    let timestamp = at.timestamp_millis();

    match artifact {
        Artifact::Document { bytes, format } => {
            let filename = match format {
                DocumentFormat::Docx => format!("converted_{}.docx", timestamp),
                DocumentFormat::Pdf => {
                    format!("processed_{}_{}.{}", tool, timestamp, format.extension())
                }
            };
            Package {
                content_type: format.content_type(),
                filename,
                body: PackageBody::Bytes(bytes),
            }
        }
        Artifact::Pages(pages) => Package {
            content_type: ZIP_CONTENT_TYPE,
            filename: format!("split_pages_{}.zip", timestamp),
            body: PackageBody::Archive(
                pages
                    .into_iter()
                    .enumerate()
                    .map(|(i, bytes)| ArchiveEntry {
                        name: format!("page_{}.pdf", i + 1),
                        bytes,
                    })
                    .collect(),
            ),
        },
    }
}

impl Package {
    /// Value for the `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    /// Final response body; archives are written in entry order.
    pub fn into_bytes(self) -> Result<Vec<u8>, PdfToolError> {
        match self.body {
            PackageBody::Bytes(bytes) => Ok(bytes),
            PackageBody::Archive(entries) => write_archive(&entries),
        }
    }
}

fn write_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>, PdfToolError> {
    let archive_error = |e: &dyn std::fmt::Display| {
        PdfToolError::SerializationError(format!("Failed to write archive: {}", e))
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)
            .map_err(|e| archive_error(&e))?;
        zip.write_all(&entry.bytes).map_err(|e| archive_error(&e))?;
    }

    let cursor = zip.finish().map_err(|e| archive_error(&e))?;
    Ok(cursor.into_inner())
}
