use std::cell::Cell;

use wgpu::util::DeviceExt;

/// What a decoded buffer is bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// A request for one immutable GPU buffer.
///
/// `contents` points into the reader's scratch block and is only valid for
/// the duration of the call: allocators must copy it.
#[derive(Debug)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub contents: &'a [u8],
    /// Bytes per vertex or per index.
    pub stride: u32,
    pub usage: BufferUsage,
}

/// Creates the buffers referenced by a decoded model.
pub trait BufferAllocator {
    type Buffer;

    fn allocate_buffer(&self, desc: &BufferDescriptor<'_>) -> anyhow::Result<Self::Buffer>;
}

impl BufferAllocator for wgpu::Device {
    type Buffer = wgpu::Buffer;

    fn allocate_buffer(&self, desc: &BufferDescriptor<'_>) -> anyhow::Result<wgpu::Buffer> {
        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        };
        Ok(self.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: desc.contents,
            usage,
        }))
    }
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &A {
    type Buffer = A::Buffer;

    fn allocate_buffer(&self, desc: &BufferDescriptor<'_>) -> anyhow::Result<A::Buffer> {
        (**self).allocate_buffer(desc)
    }
}

/// A buffer kept in host memory.
#[derive(Clone, Debug, PartialEq)]
pub struct HostBuffer {
    pub label: String,
    pub bytes: Vec<u8>,
    pub stride: u32,
    pub usage: BufferUsage,
}

impl HostBuffer {
    /// View the contents as a slice of `T`.
    ///
    /// Fails when the length is not a multiple of `size_of::<T>()` or the data
    /// is misaligned for `T`.
    pub fn cast<T: bytemuck::Pod>(&self) -> anyhow::Result<&[T]> {
        bytemuck::try_cast_slice(&self.bytes).map_err(|e| {
            anyhow::anyhow!(
                "cannot view {} as {}: {:?}",
                self.label,
                std::any::type_name::<T>(),
                e
            )
        })
    }

    pub fn element_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.bytes.len() / self.stride as usize
        }
    }
}

/// An allocator that keeps every buffer in host memory.
///
/// Used where no GPU is available: tests, tooling, and offline inspection.
#[derive(Debug, Default)]
pub struct HostAllocator {
    allocated: Cell<usize>,
}

impl HostAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers created so far.
    pub fn allocated(&self) -> usize {
        self.allocated.get()
    }
}

impl BufferAllocator for HostAllocator {
    type Buffer = HostBuffer;

    fn allocate_buffer(&self, desc: &BufferDescriptor<'_>) -> anyhow::Result<HostBuffer> {
        self.allocated.set(self.allocated.get() + 1);
        Ok(HostBuffer {
            label: desc.label.to_string(),
            bytes: desc.contents.to_vec(),
            stride: desc.stride,
            usage: desc.usage,
        })
    }
}
