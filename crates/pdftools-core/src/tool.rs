//! Tool identifiers and option resolution
//!
//! Options arrive as a loosely-typed JSON object. Every lenient default
//! lives in one of the `resolve` functions here, so the dispatcher only ever
//! sees a fully typed [`Operation`].

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::PdfToolError;

/// Crop margin used when none, a zero or an unparsable one is given.
pub const DEFAULT_CROP_MARGIN: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Merge,
    Split,
    Extract,
    Rotate,
    Crop,
    Delete,
    WordToPdf,
    PdfToWord,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Merge,
        Tool::Split,
        Tool::Extract,
        Tool::Rotate,
        Tool::Crop,
        Tool::Delete,
        Tool::WordToPdf,
        Tool::PdfToWord,
    ];

    /// Identifier used on the wire and in generated filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Merge => "merge",
            Tool::Split => "split",
            Tool::Extract => "extract",
            Tool::Rotate => "rotate",
            Tool::Crop => "crop",
            Tool::Delete => "delete",
            Tool::WordToPdf => "word-to-pdf",
            Tool::PdfToWord => "pdf-to-word",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Raw per-tool options as sent by the web UI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolOptions {
    pub split_type: Option<Value>,
    pub page_range: Option<Value>,
    pub pages: Option<Value>,
    pub angle: Option<Value>,
    pub specific_pages: Option<Value>,
    pub margin: Option<Value>,
    pub quality: Option<Value>,
    pub preserve_layout: Option<Value>,
    pub extract_images: Option<Value>,
}

impl ToolOptions {
    /// Parse the serialized options payload. Anything that is not a JSON
    /// object yields an empty option set; the per-tool checks in
    /// [`Operation::resolve`] then report what is actually missing.
    pub fn parse(payload: Option<&str>) -> Self {
        let Some(payload) = payload.map(str::trim).filter(|p| !p.is_empty()) else {
            return Self::default();
        };

        match serde_json::from_str::<Value>(payload) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::debug!("Ignoring malformed options: {}", e);
                Self::default()
            }),
            Ok(_) => {
                tracing::debug!("Ignoring options payload that is not an object");
                Self::default()
            }
            Err(e) => {
                tracing::debug!("Ignoring unparsable options payload: {}", e);
                Self::default()
            }
        }
    }
}

/// Absolute page rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// 90, 180 and 270 are honoured; anything else, including a missing
    /// angle, means 90.
    pub fn resolve(value: Option<&Value>) -> Self {
        match value.and_then(lenient_int) {
            Some(180) => Rotation::Deg180,
            Some(270) => Rotation::Deg270,
            _ => Rotation::Deg90,
        }
    }

    pub fn degrees(&self) -> i64 {
        match self {
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitMode {
    /// One output document per page.
    EachPage,
    /// One output document per comma-separated group of the selector.
    Ranges(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateScope {
    All,
    Specific(String),
}

/// A tool with its options fully resolved and its preconditions checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Merge,
    Split(SplitMode),
    Extract { pages: String },
    Rotate { rotation: Rotation, scope: RotateScope },
    /// Points inset on every side; negative values grow the visible area.
    Crop { margin: i64 },
    Delete { pages: String },
    WordToPdf { quality: Option<String> },
    PdfToWord,
}

impl Operation {
    pub fn resolve(tool: Tool, options: &ToolOptions) -> Result<Self, PdfToolError> {
        let required = |value: Option<&Value>, option: &'static str| {
            text(value).ok_or(PdfToolError::MissingOption { tool, option })
        };

        let operation = match tool {
            Tool::Merge => Operation::Merge,
            Tool::Split => match text(options.split_type.as_ref()).as_deref() {
                Some("range") => {
                    let range = required(options.page_range.as_ref(), "pageRange")?;
                    Operation::Split(SplitMode::Ranges(range))
                }
                _ => Operation::Split(SplitMode::EachPage),
            },
            Tool::Extract => Operation::Extract {
                pages: required(options.pages.as_ref(), "pages")?,
            },
            Tool::Rotate => {
                let scope = match text(options.pages.as_ref()).as_deref() {
                    Some("specific") => {
                        let pages = required(options.specific_pages.as_ref(), "specificPages")?;
                        RotateScope::Specific(pages)
                    }
                    _ => RotateScope::All,
                };
                Operation::Rotate {
                    rotation: Rotation::resolve(options.angle.as_ref()),
                    scope,
                }
            }
            Tool::Crop => Operation::Crop {
                margin: crop_margin(options.margin.as_ref()),
            },
            Tool::Delete => Operation::Delete {
                pages: required(options.pages.as_ref(), "pages")?,
            },
            Tool::WordToPdf => Operation::WordToPdf {
                quality: text(options.quality.as_ref()),
            },
            Tool::PdfToWord => Operation::PdfToWord,
        };

        Ok(operation)
    }
}

/// Any non-zero margin is used as given, negative ones included; missing,
/// unparsable or zero margins fall back to [`DEFAULT_CROP_MARGIN`].
pub fn crop_margin(value: Option<&Value>) -> i64 {
    value
        .and_then(lenient_int)
        .filter(|&margin| margin != 0)
        .unwrap_or(DEFAULT_CROP_MARGIN)
}

/// Non-empty trimmed text of a string or number option.
fn text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Integer from a JSON number, or from the leading digits of a string
/// (`"180deg"` reads as 180).
fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}
