//! Serialization Format Module
//!
//! Byte encodings a codec can write values in.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

/// Largest bincode payload accepted in either direction. Length prefixes
/// beyond it fail before anything is allocated.
pub const MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Legacy bincode layout (fixed-width integers, trailing bytes allowed)
/// with a size limit.
fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_PAYLOAD_BYTES)
}

// == Serialization Format ==
/// Encoding used for cached payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// Compact binary encoding via bincode
    #[default]
    Bincode,
    /// JSON text via serde_json
    Json,
}

impl SerializationFormat {
    /// Serializes `value` into `writer`.
    pub fn write<W: Write, T: Serialize + ?Sized>(&self, writer: W, value: &T) -> Result<()> {
        match self {
            SerializationFormat::Bincode => bincode_options()
                .serialize_into(writer, value)
                .map_err(|e| CacheError::Serialization(e.to_string())),
            SerializationFormat::Json => serde_json::to_writer(writer, value)
                .map_err(|e| CacheError::Serialization(e.to_string())),
        }
    }

    /// Deserializes a `T` from `reader`.
    pub fn read<R: Read, T: DeserializeOwned>(&self, reader: R) -> Result<T> {
        match self {
            SerializationFormat::Bincode => bincode_options()
                .deserialize_from(reader)
                .map_err(|e| CacheError::Decode(e.to_string())),
            SerializationFormat::Json => {
                serde_json::from_reader(reader).map_err(|e| CacheError::Decode(e.to_string()))
            }
        }
    }
}

impl fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationFormat::Bincode => write!(f, "bincode"),
            SerializationFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for SerializationFormat {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bincode" => Ok(SerializationFormat::Bincode),
            "json" => Ok(SerializationFormat::Json),
            other => Err(CacheError::InvalidArgument(format!(
                "unknown serialization format '{}'",
                other
            ))),
        }
    }
}
