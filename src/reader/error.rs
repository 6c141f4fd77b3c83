//! Error types for model decoding.

use thiserror::Error;

use crate::reader::serializer::FourCC;

/// Everything that can abort [`ModelReader::read_model`](crate::reader::ModelReader::read_model).
///
/// A decode never returns a partially populated model: the first error unwinds
/// the whole call.
#[derive(Error, Debug)]
pub enum ModelError {
    /// I/O error other than a premature end of stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete value could be read
    #[error("Unexpected end of stream at position {position}")]
    UnexpectedEof { position: u64 },

    /// A chunk started with a different tag than the one expected
    #[error("Invalid chunk: expected {expected}, found {found}")]
    InvalidChunk { expected: FourCC, found: FourCC },

    /// A chunk body was not consumed exactly
    #[error("Chunk {tag} should end at byte {expected} but ended at {actual}")]
    ChunkSizeMismatch {
        tag: FourCC,
        expected: u64,
        actual: u64,
    },

    /// Negative counts, lengths or sizes
    #[error("Invalid {what}: {value}")]
    InvalidLength { what: &'static str, value: i64 },

    /// Presence flag of an optional value was neither 0 nor 1
    #[error("Invalid presence flag {0}")]
    InvalidFlag(u8),

    #[error("Invalid UTF-8 string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid attribute kind {0}")]
    InvalidAttributeKind(u8),

    #[error("Invalid texture type {0}")]
    InvalidTextureType(u8),

    #[error("Invalid texture operation {0}")]
    InvalidTextureOperation(u8),

    #[error("Invalid texture wrap mode {0}")]
    InvalidWrapMode(i32),

    #[error("Invalid vertex element format {0}")]
    InvalidVertexFormat(u32),

    /// Bone index outside the valid range of its list
    #[error("Invalid {role} bone index {index} (count: {count})")]
    InvalidBoneIndex {
        role: &'static str,
        index: i32,
        count: usize,
    },

    /// Parent index names a bone that has not been decoded yet
    #[error("Parent bone {index} of bone {bone} is not decoded yet")]
    UnresolvedParentBone { bone: usize, index: i32 },

    #[error("Invalid material index {index} (count: {count})")]
    InvalidMaterialIndex { index: i32, count: usize },

    /// A mesh part references a buffer slot its mesh does not have
    #[error("Invalid {kind} buffer slot {slot} (count: {count})")]
    InvalidBufferSlot {
        kind: &'static str,
        slot: i32,
        count: usize,
    },

    #[error("{kind} buffer range {start}+{count} exceeds {len} elements")]
    BufferRangeOutOfBounds {
        kind: &'static str,
        start: i32,
        count: i32,
        len: u32,
    },

    /// Byte length is not a whole multiple of the element count
    #[error("{kind} buffer of {byte_len} bytes cannot hold {count} elements")]
    InvalidBufferStride {
        kind: &'static str,
        byte_len: usize,
        count: usize,
    },

    #[error("Index stride must be 2 or 4 bytes, got {0}")]
    InvalidIndexStride(usize),

    /// A buffer payload does not fit the shared scratch block
    #[error("Buffer of {len} bytes exceeds the {capacity} byte scratch block")]
    ScratchOverflow { len: usize, capacity: usize },

    #[error("Failed to load texture {path}: {source}")]
    TextureLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to allocate {label}: {source}")]
    BufferAllocation {
        label: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type alias for model decoding.
pub type Result<T> = std::result::Result<T, ModelError>;
