//! Little-endian primitive reads and chunk bookkeeping for the TKMD format.
//!
//! [`BinarySerializer`] wraps any [`Read`] and tracks how many bytes were
//! consumed so that chunks can be validated on close and premature end of
//! stream can be reported with a position.

use std::{fmt, io::Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{
    data_structures::attributes::{AttributeValue, Attributes},
    reader::error::{ModelError, Result},
};

/// Four-character chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self)
    }
}

// Counts above this still decode, the list just grows past its initial capacity.
const MAX_PREALLOCATED_ITEMS: usize = 4096;

/// Capacity to reserve for a list of `count` items.
pub(crate) fn list_capacity(count: usize) -> usize {
    count.min(MAX_PREALLOCATED_ITEMS)
}

struct Tracked<R> {
    inner: R,
    position: u64,
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

struct OpenChunk {
    tag: FourCC,
    end: u64,
}

pub struct BinarySerializer<R> {
    stream: Tracked<R>,
    chunks: Vec<OpenChunk>,
}

impl<R: Read> BinarySerializer<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream: Tracked {
                inner: stream,
                position: 0,
            },
            chunks: Vec::new(),
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.stream.position
    }

    /// Number of chunks currently open.
    pub fn depth(&self) -> usize {
        self.chunks.len()
    }

    fn map_io(&self, err: std::io::Error) -> ModelError {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ModelError::UnexpectedEof {
                position: self.position(),
            }
        } else {
            ModelError::Io(err)
        }
    }

    pub fn read_tag(&mut self) -> Result<FourCC> {
        let mut tag = [0u8; 4];
        self.read_exact(&mut tag)?;
        Ok(FourCC(tag))
    }

    /// Open a chunk: the next tag must equal `expected`, followed by the body length.
    pub fn begin_chunk(&mut self, expected: FourCC) -> Result<()> {
        let found = self.read_tag()?;
        if found != expected {
            return Err(ModelError::InvalidChunk { expected, found });
        }
        let len = self.read_u32()?;
        let end = self.position() + u64::from(len);
        log::debug!("chunk {} opened, {} byte body", expected, len);
        self.chunks.push(OpenChunk { tag: expected, end });
        Ok(())
    }

    /// Close the innermost chunk, checking its body was consumed exactly.
    pub fn end_chunk(&mut self) -> Result<()> {
        let Some(chunk) = self.chunks.pop() else {
            return Err(ModelError::Io(std::io::Error::other(
                "end_chunk called without an open chunk",
            )));
        };
        let actual = self.position();
        if actual != chunk.end {
            return Err(ModelError::ChunkSizeMismatch {
                tag: chunk.tag,
                expected: chunk.end,
                actual,
            });
        }
        Ok(())
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let res = self.stream.read_exact(buf);
        res.map_err(|e| self.map_io(e))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let res = self.stream.read_u8();
        res.map_err(|e| self.map_io(e))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let res = self.stream.read_i32::<LittleEndian>();
        res.map_err(|e| self.map_io(e))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let res = self.stream.read_u32::<LittleEndian>();
        res.map_err(|e| self.map_io(e))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let res = self.stream.read_f32::<LittleEndian>();
        res.map_err(|e| self.map_io(e))
    }

    /// Read a signed 32-bit count; negative values are rejected.
    pub fn read_count(&mut self, what: &'static str) -> Result<usize> {
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| ModelError::InvalidLength {
            what,
            value: i64::from(value),
        })
    }

    /// Read exactly `len` bytes without trusting `len` for the allocation.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(list_capacity(len));
        self.read_into(&mut buf, len)?;
        Ok(buf)
    }

    /// Replace the contents of `buf` with the next `len` bytes.
    ///
    /// `buf` only grows as bytes actually arrive, so a declared length far
    /// beyond the end of the stream fails with `UnexpectedEof` before it is
    /// ever allocated. Existing capacity is reused.
    pub fn read_into(&mut self, buf: &mut Vec<u8>, len: usize) -> Result<()> {
        buf.clear();
        let res = (&mut self.stream).take(len as u64).read_to_end(buf);
        res.map_err(|e| self.map_io(e))?;
        if buf.len() < len {
            return Err(ModelError::UnexpectedEof {
                position: self.position(),
            });
        }
        Ok(())
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_vec(len)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Read a `u8` presence flag and, when set, the value produced by `read`.
    pub fn read_optional<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => read(self).map(Some),
            flag => Err(ModelError::InvalidFlag(flag)),
        }
    }

    /// Column-major 4x4 matrix.
    pub fn read_matrix(&mut self) -> Result<cgmath::Matrix4<f32>> {
        let mut m = [[0f32; 4]; 4];
        for column in m.iter_mut() {
            for value in column.iter_mut() {
                *value = self.read_f32()?;
            }
        }
        Ok(m.into())
    }

    pub fn read_attributes(&mut self) -> Result<Attributes> {
        let count = self.read_count("attribute count")?;
        let mut attributes = Attributes::with_capacity(list_capacity(count));
        for _ in 0..count {
            let key = self.read_string()?;
            let value = match self.read_u8()? {
                0 => AttributeValue::Bool(self.read_u8()? != 0),
                1 => AttributeValue::Int(self.read_i32()?),
                2 => AttributeValue::Float(self.read_f32()?),
                3 => AttributeValue::String(self.read_string()?),
                4 => {
                    let mut v = [0f32; 4];
                    for value in v.iter_mut() {
                        *value = self.read_f32()?;
                    }
                    AttributeValue::Vector4(v)
                }
                5 => AttributeValue::Matrix(self.read_matrix()?),
                6 => {
                    let len = self.read_u32()? as usize;
                    AttributeValue::Bytes(self.read_vec(len)?)
                }
                kind => return Err(ModelError::InvalidAttributeKind(kind)),
            };
            attributes.insert(key, value);
        }
        Ok(attributes)
    }
}
