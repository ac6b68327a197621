//! PDF tool engine
//!
//! Everything behind the `/api/pdf/process` endpoint that does not need a
//! web server: upload validation, option resolution, the PDF operations
//! themselves (lopdf), office conversion, and response packaging.
//!
//! A request flows through the crate in this order:
//! - [`upload::UploadPolicy::admit`] validates the form and names the tool
//! - [`dispatch::Dispatcher::dispatch`] resolves options and runs the tool
//! - [`package::package`] picks the content type and filename

pub mod convert;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod merge;
pub mod package;
pub mod selector;
pub mod tool;
pub mod upload;

#[cfg(test)]
mod fixtures;

pub use convert::{LibreOfficeConverter, OfficeConverter, TargetFormat};
pub use dispatch::{Artifact, Dispatcher, DocumentFormat, ToolRequest, UploadedFile};
pub use error::{ErrorKind, PdfToolError, UploadError};
pub use merge::merge;
pub use package::{package, Package, PackageBody};
pub use selector::{parse_page_groups, parse_page_set, PageSet};
pub use tool::{Operation, Tool, ToolOptions};
pub use upload::{UploadForm, UploadPolicy};
