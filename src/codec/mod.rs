//! Codec Module
//!
//! Turns values into payload bytes and back: a serialization format
//! streamed through an optional compressor.

mod compression;
mod format;
mod types;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

pub use compression::{Compression, DEFAULT_ZSTD_LEVEL};
pub use format::{SerializationFormat, MAX_PAYLOAD_BYTES};
pub use types::{type_tag, CacheValue, ErasedValue, TypeRegistry};

/// Initial capacity for uncompressed payload buffers.
const ENCODE_BUFFER_CAPACITY: usize = 256;

// == Codec ==
/// Serializer plus compressor, chosen once and shared by every cache.
///
/// Cloning is cheap: the type table sits behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Codec {
    format: SerializationFormat,
    compression: Compression,
    types: Arc<TypeRegistry>,
}

impl Codec {
    /// Creates a codec with the built-in type table.
    pub fn new(format: SerializationFormat, compression: Compression) -> Self {
        Self::builder()
            .format(format)
            .compression(compression)
            .build()
    }

    pub fn builder() -> CodecBuilder {
        CodecBuilder::default()
    }

    pub fn format(&self) -> SerializationFormat {
        self.format
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    // == Encode ==
    /// Serializes `value`, compressing the stream when configured.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self.compression {
            Compression::None => {
                let mut buf = Vec::with_capacity(ENCODE_BUFFER_CAPACITY);
                self.format.write(&mut buf, value)?;
                Ok(buf)
            }
            Compression::Zstd { level } => {
                let mut encoder = zstd::stream::write::Encoder::new(Vec::new(), level)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                self.format.write(&mut encoder, value)?;
                encoder
                    .finish()
                    .map_err(|e| CacheError::Serialization(e.to_string()))
            }
        }
    }

    // == Decode ==
    /// Decompresses and deserializes a `T`.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self.compression {
            Compression::None => self.format.read(bytes),
            Compression::Zstd { .. } => {
                let decoder = zstd::stream::read::Decoder::new(bytes)
                    .map_err(|e| CacheError::Decode(e.to_string()))?;
                self.format.read(decoder)
            }
        }
    }

    // == Decode Tagged ==
    /// Decodes a payload whose type is only known by its tag.
    ///
    /// Fails with `Decode` when the tag was never registered.
    pub fn decode_tagged(&self, tag: &str, bytes: &[u8]) -> Result<ErasedValue> {
        let decoder = self
            .types
            .decoder(tag)
            .ok_or_else(|| CacheError::Decode(format!("unknown type '{}'", tag)))?;
        decoder(self, bytes)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::builder().build()
    }
}

// == Codec Builder ==
#[derive(Debug)]
pub struct CodecBuilder {
    format: SerializationFormat,
    compression: Compression,
    types: TypeRegistry,
}

impl Default for CodecBuilder {
    fn default() -> Self {
        Self {
            format: SerializationFormat::default(),
            compression: Compression::default(),
            types: TypeRegistry::with_builtins(),
        }
    }
}

impl CodecBuilder {
    pub fn format(mut self, format: SerializationFormat) -> Self {
        self.format = format;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Makes `T` decodable on untyped reads.
    pub fn register<T: CacheValue>(mut self) -> Self {
        self.types.register::<T>();
        self
    }

    pub fn build(self) -> Codec {
        Codec {
            format: self.format,
            compression: self.compression,
            types: Arc::new(self.types),
        }
    }
}
