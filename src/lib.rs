/// The document tree model and the compact/pretty serializers
pub mod value;

/// Convenience functions and utilities
mod utils;


/// The recursive-descent parser for normalized JSON text
pub mod parser;

/// File ingestion: line-break normalization ahead of parsing
pub mod ingest;

/// The deserialization module, for `serde` compatibility (optional feature)
#[cfg(feature = "serde")]
pub mod de;

/// The serialization module, for `serde` compatibility (optional feature)
#[cfg(feature = "serde")]
pub mod ser;

/// The `serde` deserializer
#[cfg(feature = "serde")]
pub use de::{from_str, from_value, ValueDeserializer};

/// the `serde` serializer
#[cfg(feature = "serde")]
pub use ser::{to_string, to_string_pretty, to_value, ValueSerializer};

/// turn your strings into the document model
pub use parser::from_str as model_from_str;

/// the document tree node type and its companions
pub use value::{Key, Kind, Value, ValueError};

/// parse straight from a file, with line breaks normalized away first
pub use ingest::{from_file, strip_newlines, LoadError};

pub use parser::ParsingError;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
