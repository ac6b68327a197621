//! Upload gate
//!
//! Validates an incoming upload before anything reaches the dispatcher.
//! The policy is an immutable value built once at startup.

use std::path::Path;

use crate::dispatch::{ToolRequest, UploadedFile};
use crate::error::UploadError;
use crate::tool::{Tool, ToolOptions};

pub const MIB: u64 = 1024 * 1024;

/// Multipart field that carries files.
pub const FILES_FIELD: &str = "files";

/// Limits and allow-lists for uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_files: usize,
    pub max_file_size: u64,
    pub allowed_media_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_file_size: 200 * MIB,
            allowed_media_types: vec![
                "application/pdf".into(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document".into(),
                "application/msword".into(),
            ],
            allowed_extensions: vec![".pdf".into(), ".docx".into(), ".doc".into()],
        }
    }
}

/// An upload as read off the wire, before validation.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub tool: Option<String>,
    pub options: Option<String>,
}

impl UploadPolicy {
    pub fn with_limits(max_files: usize, max_file_size: u64) -> Self {
        Self {
            max_files,
            max_file_size,
            ..Self::default()
        }
    }

    /// Largest request body that can carry an acceptable upload, with
    /// headroom for multipart framing and the text fields.
    pub fn body_limit(&self) -> usize {
        let files = (self.max_files as u64).saturating_mul(self.max_file_size);
        let limit = files.saturating_add(MIB);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }

    pub fn check_file_count(&self, count: usize) -> Result<(), UploadError> {
        if count > self.max_files {
            return Err(UploadError::TooManyFiles {
                limit: self.max_files,
            });
        }
        Ok(())
    }

    pub fn check_file_size(&self, name: &str, len: u64) -> Result<(), UploadError> {
        if len > self.max_file_size {
            return Err(UploadError::FileTooLarge {
                name: name.to_string(),
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// A file is accepted when either its declared media type or its
    /// filename extension is on the allow-list.
    pub fn check_file_type(&self, name: &str, media_type: Option<&str>) -> Result<(), UploadError> {
        let type_ok = media_type.is_some_and(|declared| {
            let essence = declared.split(';').next().unwrap_or_default().trim();
            self.allowed_media_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(essence))
        });

        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()));
        let extension_ok = extension.is_some_and(|ext| self.allowed_extensions.contains(&ext));

        if type_ok || extension_ok {
            Ok(())
        } else {
            Err(UploadError::UnsupportedFileType(name.to_string()))
        }
    }

    /// Run every check over a fully read form and turn it into a request.
    pub fn admit(&self, form: UploadForm) -> Result<ToolRequest, UploadError> {
        self.check_file_count(form.files.len())?;
        for file in &form.files {
            self.check_file_size(&file.name, file.bytes.len() as u64)?;
            self.check_file_type(&file.name, file.media_type.as_deref())?;
        }

        if form.files.is_empty() {
            return Err(UploadError::NoFiles);
        }

        let tool = form
            .tool
            .as_deref()
            .map(str::trim)
            .filter(|tool| !tool.is_empty())
            .ok_or(UploadError::MissingTool)?;
        let tool = tool.parse::<Tool>().map_err(UploadError::UnknownTool)?;

        Ok(ToolRequest {
            tool,
            files: form.files,
            options: ToolOptions::parse(form.options.as_deref()),
        })
    }
}
