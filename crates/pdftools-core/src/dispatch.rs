//! Tool dispatch
//!
//! Maps a validated [`ToolRequest`] onto document engine and converter
//! calls. Every precondition is checked before the first engine call.

use std::sync::Arc;

use tracing::{debug, info};

use crate::convert::{OfficeConverter, TargetFormat};
use crate::engine;
use crate::error::PdfToolError;
use crate::merge::merge;
use crate::selector::{parse_page_groups, parse_page_set, PageSet};
use crate::tool::{Operation, RotateScope, SplitMode, Tool, ToolOptions};

/// A file received with the request, held in memory for its lifetime.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tool: Tool,
    pub files: Vec<UploadedFile>,
    pub options: ToolOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

/// What a tool produced, before it is shaped into a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Document { bytes: Vec<u8>, format: DocumentFormat },
    /// Separate PDFs in output order.
    Pages(Vec<Vec<u8>>),
}

impl Artifact {
    fn pdf(bytes: Vec<u8>) -> Self {
        Artifact::Document {
            bytes,
            format: DocumentFormat::Pdf,
        }
    }

    /// Total payload size across all outputs.
    pub fn size(&self) -> usize {
        match self {
            Artifact::Document { bytes, .. } => bytes.len(),
            Artifact::Pages(pages) => pages.iter().map(Vec::len).sum(),
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    converter: Arc<dyn OfficeConverter>,
}

impl Dispatcher {
    pub fn new(converter: Arc<dyn OfficeConverter>) -> Self {
        Self { converter }
    }

    pub fn dispatch(&self, request: &ToolRequest) -> Result<Artifact, PdfToolError> {
        let Some(first) = request.files.first() else {
            return Err(PdfToolError::NoFiles);
        };
        let operation = Operation::resolve(request.tool, &request.options)?;

        debug!(
            "Dispatching {} over {} file(s): {:?}",
            request.tool,
            request.files.len(),
            operation
        );

        let artifact = match operation {
            Operation::Merge => {
                let documents = request
                    .files
                    .iter()
                    .enumerate()
                    .map(|(i, file)| {
                        engine::load(&file.bytes).map_err(|e| match e {
                            PdfToolError::ParseError(cause) => PdfToolError::ParseError(format!(
                                "document {} ('{}'): {}",
                                i + 1,
                                file.name,
                                cause
                            )),
                            other => other,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Artifact::pdf(engine::save(merge(documents)?)?)
            }
            Operation::Split(mode) => split(&first.bytes, &mode)?,
            Operation::Extract { pages } => {
                let doc = engine::load(&first.bytes)?;
                let selected = parse_page_set(&pages, engine::page_count(&doc));
                Artifact::pdf(engine::save(engine::copy_pages(&doc, &selected)?)?)
            }
            Operation::Rotate { rotation, scope } => {
                let mut doc = engine::load(&first.bytes)?;
                let total = engine::page_count(&doc);
                let selected = match scope {
                    RotateScope::All => PageSet::all(total),
                    RotateScope::Specific(selector) => parse_page_set(&selector, total),
                };
                engine::set_rotation(&mut doc, &selected, rotation)?;
                Artifact::pdf(engine::save(doc)?)
            }
            Operation::Crop { margin } => {
                let mut doc = engine::load(&first.bytes)?;
                engine::crop(&mut doc, margin)?;
                Artifact::pdf(engine::save(doc)?)
            }
            Operation::Delete { pages } => {
                let doc = engine::load(&first.bytes)?;
                let total = engine::page_count(&doc);
                let keep = parse_page_set(&pages, total).complement(total);
                if keep.is_empty() {
                    return Err(PdfToolError::CannotDeleteAllPages);
                }
                Artifact::pdf(engine::save(engine::copy_pages(&doc, &keep)?)?)
            }
            Operation::WordToPdf { quality } => {
                if let Some(quality) = quality {
                    debug!("Ignoring advisory quality hint '{}'", quality);
                }
                let bytes = self
                    .converter
                    .convert(&first.bytes, &first.name, TargetFormat::Pdf)?;
                Artifact::pdf(bytes)
            }
            Operation::PdfToWord => {
                debug!(
                    "pdf-to-word requested (preserveLayout={:?}, extractImages={:?})",
                    request.options.preserve_layout, request.options.extract_images
                );
                return Err(PdfToolError::Unsupported(Tool::PdfToWord));
            }
        };

        info!("{} produced {} bytes", request.tool, artifact.size());
        Ok(artifact)
    }
}

fn split(bytes: &[u8], mode: &SplitMode) -> Result<Artifact, PdfToolError> {
    let doc = engine::load(bytes)?;
    let total = engine::page_count(&doc);

    let groups = match mode {
        SplitMode::EachPage => (0..total)
            .map(|index| PageSet::single(index, total))
            .collect(),
        SplitMode::Ranges(selector) => parse_page_groups(selector, total),
    };
    if groups.is_empty() {
        return Err(PdfToolError::NoPagesSelected);
    }

    let outputs = groups
        .iter()
        .map(|group| engine::save(engine::copy_pages(&doc, group)?))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Artifact::Pages(outputs))
}
