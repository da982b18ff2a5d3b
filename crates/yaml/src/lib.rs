//! Lossless YAML/JSON document trees.
//!
//! A [`Document`] is an arena of nodes addressed by [`NodeId`]. Every parsed
//! node remembers its source span and position, so:
//!
//! - positions can be reported for any node (`line`/`column`, 1-based),
//! - an unedited document encodes back to exactly its input,
//! - an edited document keeps comments, quoting and layout of every region
//!   the edit did not touch.
//!
//! JSON input is parsed as YAML flow collections; the detected format is
//! kept for output unless [`EncodeOptions::format`] says otherwise.
//!
//! ```
//! use docmodel_yaml::{Document, EncodeOptions};
//!
//! let mut doc = Document::parse("name: petstore # title\nversion: 1\n").unwrap();
//! let root = doc.root().unwrap();
//! let v = doc.new_string("2.0");
//! doc.set_value(root, "version", v).unwrap();
//! assert_eq!(
//!     doc.encode(&EncodeOptions::default()),
//!     "name: petstore # title\nversion: '2.0'\n"
//! );
//! ```

mod document;
mod emit;
mod error;
mod node;
mod options;
mod parser;
mod render;
pub mod scalar;

pub use document::Document;
pub use error::{EditError, ParseError};
pub use node::{CollectionStyle, NodeId, NodeKind, Position, Scalar, ScalarStyle, ScalarType, Span};
pub use options::{EncodeOptions, Format, QuoteStyle};

/// Parses YAML or JSON text into a [`Document`].
pub fn parse(source: &str) -> Result<Document, ParseError> {
    Document::parse(source)
}
