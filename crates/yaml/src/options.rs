//! Output options.

use serde::{Deserialize, Serialize};

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

/// How string scalars are quoted when they have to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// Plain when the text reads back unchanged, single quotes otherwise,
    /// double quotes when the text holds control characters.
    #[default]
    Auto,
    Single,
    Double,
}

/// Options for [`crate::Document::encode`].
///
/// Every field defaults to "keep what the source had". A format or indent
/// that differs from the source switches the output to a full re-render,
/// which drops comments. A quote style only restyles string scalars; the
/// text around them, comments included, is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodeOptions {
    pub format: Option<Format>,
    pub indent: Option<usize>,
    pub quote_style: Option<QuoteStyle>,
}

impl EncodeOptions {
    pub fn json() -> Self {
        Self {
            format: Some(Format::Json),
            ..Self::default()
        }
    }

    pub fn yaml() -> Self {
        Self {
            format: Some(Format::Yaml),
            ..Self::default()
        }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn with_quote_style(mut self, style: QuoteStyle) -> Self {
        self.quote_style = Some(style);
        self
    }
}
