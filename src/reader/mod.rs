//! Decoder for the chunked TKMD binary model format.
//!
//! A file is one outer `TKMD` chunk holding the scratch block size, four fixed
//! chunks (`MATL` materials, `BONE` bones, `SKIN` skinned bones, `MESH` meshes)
//! and a trailing attribute map. Every collection is an `i32` count followed by
//! that many records.
//!
//! [`ModelReader`] turns such a stream into a linked [`Model`]. It does not
//! create GPU resources or textures itself: buffers come from a
//! [`BufferAllocator`] and textures from a [`TextureLoader`]. Any error aborts
//! the whole decode; no partially populated model is returned.
//!
//! ```no_run
//! use tkmodel::{reader::ModelReader, resources::mesh::HostAllocator};
//!
//! let bytes = std::fs::read("ship.tkmd")?;
//! let allocator = HostAllocator::new();
//! let mut reader = ModelReader::new(
//!     &allocator,
//!     bytes.as_slice(),
//!     |path: &str| -> anyhow::Result<String> { Ok(path.to_string()) },
//! );
//! let model = reader.read_model()?;
//! println!("{} meshes", model.meshes.len());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod error;
pub mod factory;
pub mod serializer;

use std::{io::Read, path::Path};

use crate::{
    data_structures::model::{
        BoneId, BufferRange, IndexBufferBinding, Material, MaterialId, MaterialTexture, Model,
        ModelBone, ModelMesh, ModelMeshPart, TextureFlags, TextureOperation, TextureType,
        TextureWrapMode, VertexBufferBinding, VertexElement, VertexLayout,
    },
    resources::{
        mesh::{BufferAllocator, BufferDescriptor, BufferUsage},
        texture::TextureLoader,
    },
};

pub use error::{ModelError, Result};
pub use factory::{DefaultFactory, ModelFactory};
use serializer::{BinarySerializer, FourCC, list_capacity};

pub const MAGIC_CODE: FourCC = FourCC(*b"TKMD");
pub const MATERIALS_CHUNK: FourCC = FourCC(*b"MATL");
pub const BONES_CHUNK: FourCC = FourCC(*b"BONE");
pub const SKINNED_BONES_CHUNK: FourCC = FourCC(*b"SKIN");
pub const MESHES_CHUNK: FourCC = FourCC(*b"MESH");

/// Attribute key whose string value becomes [`Material::name`].
pub const MATERIAL_NAME_KEY: &str = "Name";

/// Decodes one model from a byte stream.
///
/// Buffer payloads are staged in a single scratch block whose size limit is
/// declared by the file. The block is reused for every buffer and dropped with
/// the reader.
pub struct ModelReader<R, A, L, F = DefaultFactory> {
    serializer: BinarySerializer<R>,
    allocator: A,
    loader: L,
    factory: F,
    scratch: Vec<u8>,
    scratch_limit: usize,
}

impl<R, A, L> ModelReader<R, A, L, DefaultFactory>
where
    R: Read,
    A: BufferAllocator,
    L: TextureLoader,
{
    pub fn new(allocator: A, stream: R, loader: L) -> Self {
        Self::with_factory(allocator, stream, loader, DefaultFactory)
    }
}

impl<R, A, L, F> ModelReader<R, A, L, F>
where
    R: Read,
    A: BufferAllocator,
    L: TextureLoader,
    F: ModelFactory<A::Buffer, L::Texture>,
{
    pub fn with_factory(allocator: A, stream: R, loader: L, factory: F) -> Self {
        Self {
            serializer: BinarySerializer::new(stream),
            allocator,
            loader,
            factory,
            scratch: Vec::new(),
            scratch_limit: 0,
        }
    }

    /// Read a complete model.
    pub fn read_model(&mut self) -> Result<Model<A::Buffer, L::Texture>> {
        let mut model = self.factory.create_model();

        self.serializer.begin_chunk(MAGIC_CODE)?;

        let scratch_size = self.serializer.read_i32()?;
        self.allocate_scratch(scratch_size)?;

        self.serializer.begin_chunk(MATERIALS_CHUNK)?;
        model.materials = self.read_list("material count", Self::read_material)?;
        self.serializer.end_chunk()?;

        self.serializer.begin_chunk(BONES_CHUNK)?;
        model.bones = self.read_bones()?;
        self.serializer.end_chunk()?;

        self.serializer.begin_chunk(SKINNED_BONES_CHUNK)?;
        model.skinned_bones = self.read_bones()?;
        self.serializer.end_chunk()?;

        let bone_count = model.bones.len();
        let material_count = model.materials.len();
        self.serializer.begin_chunk(MESHES_CHUNK)?;
        model.meshes = self.read_list("mesh count", |r, i| {
            r.read_mesh(i, bone_count, material_count)
        })?;
        self.serializer.end_chunk()?;

        let attributes = self.serializer.read_attributes()?;
        model.attributes.merge(attributes);

        self.serializer.end_chunk()?;

        log::info!(
            "decoded model: {} materials, {} bones, {} skinned bones, {} meshes",
            model.materials.len(),
            model.bones.len(),
            model.skinned_bones.len(),
            model.meshes.len()
        );
        Ok(model)
    }

    fn allocate_scratch(&mut self, size: i32) -> Result<()> {
        let size = usize::try_from(size).map_err(|_| ModelError::InvalidLength {
            what: "scratch size",
            value: i64::from(size),
        })?;
        // Only a limit: the block grows as payload bytes arrive, never from a declared length.
        self.scratch.clear();
        self.scratch_limit = size;
        Ok(())
    }

    /// Read `len` payload bytes into the scratch block.
    fn stage(&mut self, len: usize) -> Result<()> {
        if len > self.scratch_limit {
            return Err(ModelError::ScratchOverflow {
                len,
                capacity: self.scratch_limit,
            });
        }
        self.serializer.read_into(&mut self.scratch, len)
    }

    fn allocate(
        &self,
        label: &str,
        len: usize,
        stride: u32,
        usage: BufferUsage,
    ) -> Result<A::Buffer> {
        log::trace!("allocating {} ({} bytes, stride {})", label, len, stride);
        self.allocator
            .allocate_buffer(&BufferDescriptor {
                label,
                contents: &self.scratch[..len],
                stride,
                usage,
            })
            .map_err(|source| ModelError::BufferAllocation {
                label: label.to_string(),
                source,
            })
    }

    /// `i32` count followed by `count` records produced by `read_item`.
    fn read_list<I>(
        &mut self,
        what: &'static str,
        mut read_item: impl FnMut(&mut Self, usize) -> Result<I>,
    ) -> Result<Vec<I>> {
        let count = self.serializer.read_count(what)?;
        log::debug!("{}: {}", what, count);
        let mut items = Vec::with_capacity(list_capacity(count));
        for i in 0..count {
            items.push(read_item(self, i)?);
        }
        Ok(items)
    }

    fn read_material(&mut self, index: usize) -> Result<Material<L::Texture>> {
        let mut material = self.factory.create_material(MaterialId(index));
        let count = self.serializer.read_count("texture count")?;
        for _ in 0..count {
            let texture = self.read_material_texture()?;
            if !material.push_texture(texture) {
                log::trace!("material {}: dropped texture of type None", index);
            }
        }
        let attributes = self.serializer.read_attributes()?;
        material.attributes.merge(attributes);
        if let Some(name) = material
            .attributes
            .get(MATERIAL_NAME_KEY)
            .and_then(|v| v.as_str())
        {
            material.name = Some(name.to_string());
        }
        Ok(material)
    }

    fn read_material_texture(&mut self) -> Result<MaterialTexture<L::Texture>> {
        let s = &mut self.serializer;
        let file_path = s.read_string()?;
        let code = s.read_u8()?;
        let kind = TextureType::from_code(code).ok_or(ModelError::InvalidTextureType(code))?;
        let index = s.read_i32()?;
        let uv_index = s.read_i32()?;
        let blend_factor = s.read_f32()?;
        let code = s.read_u8()?;
        let operation =
            TextureOperation::from_code(code).ok_or(ModelError::InvalidTextureOperation(code))?;
        let code = s.read_i32()?;
        let wrap_mode = TextureWrapMode::from_code(code).ok_or(ModelError::InvalidWrapMode(code))?;
        let flags = TextureFlags(s.read_u8()?);

        let texture = self
            .loader
            .load(&file_path)
            .map_err(|source| ModelError::TextureLoad {
                path: file_path.clone(),
                source,
            })?;
        let name = Path::new(&file_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(MaterialTexture {
            name,
            file_path,
            texture,
            kind,
            index,
            uv_index,
            blend_factor,
            operation,
            wrap_mode,
            flags,
        })
    }

    /// Bones are read in two passes: children may point at bones decoded
    /// later, so their indices are staged and resolved once the list is complete.
    fn read_bones(&mut self) -> Result<Vec<ModelBone>> {
        let count = self.serializer.read_count("bone count")?;
        log::debug!("bone count: {}", count);
        let mut bones = Vec::with_capacity(list_capacity(count));
        let mut staged_children = Vec::with_capacity(list_capacity(count));

        for i in 0..count {
            let mut bone = self.factory.create_bone(BoneId(i));
            let parent = self.serializer.read_i32()?;
            bone.parent = resolve_parent(i, parent)?;
            bone.transform = self.serializer.read_matrix()?;
            bone.name = self.serializer.read_optional(|s| s.read_string())?;
            let children = self.serializer.read_optional(|s| {
                let n = s.read_count("child count")?;
                let mut indices = Vec::with_capacity(list_capacity(n));
                for _ in 0..n {
                    indices.push(s.read_i32()?);
                }
                Ok(indices)
            })?;
            staged_children.push(children);
            bones.push(bone);
        }

        let total = bones.len();
        for (bone, children) in bones.iter_mut().zip(staged_children) {
            if let Some(children) = children {
                let resolved = children
                    .into_iter()
                    .map(|index| resolve_child(index, total))
                    .collect::<Result<Vec<_>>>()?;
                bone.children = Some(resolved);
            }
        }
        Ok(bones)
    }

    fn read_mesh(
        &mut self,
        index: usize,
        bone_count: usize,
        material_count: usize,
    ) -> Result<ModelMesh<A::Buffer>> {
        let mut mesh = self.factory.create_mesh(index);
        mesh.name = self.serializer.read_optional(|s| s.read_string())?;

        let parent = self.serializer.read_i32()?;
        mesh.parent_bone = match parent {
            -1 => None,
            p if p >= 0 && (p as usize) < bone_count => Some(BoneId(p as usize)),
            p => {
                return Err(ModelError::InvalidBoneIndex {
                    role: "mesh parent",
                    index: p,
                    count: bone_count,
                });
            }
        };

        let label = mesh.name.clone().unwrap_or_else(|| format!("mesh {}", index));
        mesh.vertex_buffers = self.read_list("vertex buffer count", |r, i| {
            r.read_vertex_buffer(&format!("{} vertex buffer {}", label, i))
        })?;
        mesh.index_buffers = self.read_list("index buffer count", |r, i| {
            r.read_index_buffer(&format!("{} index buffer {}", label, i))
        })?;

        let vertex_counts: Vec<u32> = mesh.vertex_buffers.iter().map(|b| b.vertex_count).collect();
        let index_counts: Vec<u32> = mesh.index_buffers.iter().map(|b| b.index_count).collect();
        let parts = self.read_list("mesh part count", |r, i| {
            r.read_mesh_part(i, material_count, &vertex_counts, &index_counts)
        })?;
        mesh.parts = parts;

        let attributes = self.serializer.read_attributes()?;
        mesh.attributes.merge(attributes);
        Ok(mesh)
    }

    fn read_vertex_buffer(&mut self, label: &str) -> Result<VertexBufferBinding<A::Buffer>> {
        let vertex_count = self.serializer.read_count("vertex count")?;
        let elements = self.read_list("vertex element count", |r, _| r.read_vertex_element())?;
        let byte_len = self.serializer.read_count("vertex buffer length")?;
        let stride = derive_stride("vertex", byte_len, vertex_count)?;

        self.stage(byte_len)?;
        let buffer = self.allocate(label, byte_len, stride, BufferUsage::Vertex)?;

        Ok(VertexBufferBinding {
            layout: VertexLayout::new(elements),
            buffer,
            vertex_count: vertex_count as u32,
            stride,
        })
    }

    fn read_vertex_element(&mut self) -> Result<VertexElement> {
        let s = &mut self.serializer;
        let semantic = s.read_string()?;
        let semantic_index = s.read_u32()?;
        let code = s.read_u32()?;
        let format =
            VertexElement::format_from_code(code).ok_or(ModelError::InvalidVertexFormat(code))?;
        let offset = s.read_u32()?;
        Ok(VertexElement {
            semantic,
            semantic_index,
            format,
            offset,
        })
    }

    fn read_index_buffer(&mut self, label: &str) -> Result<IndexBufferBinding<A::Buffer>> {
        let index_count = self.serializer.read_count("index count")?;
        let byte_len = self.serializer.read_count("index buffer length")?;
        let stride = derive_stride("index", byte_len, index_count)?;
        let format = match stride {
            0 | 4 => wgpu::IndexFormat::Uint32,
            2 => wgpu::IndexFormat::Uint16,
            other => return Err(ModelError::InvalidIndexStride(other as usize)),
        };

        self.stage(byte_len)?;
        let buffer = self.allocate(label, byte_len, stride, BufferUsage::Index)?;

        Ok(IndexBufferBinding {
            buffer,
            index_count: index_count as u32,
            format,
        })
    }

    fn read_mesh_part(
        &mut self,
        index: usize,
        material_count: usize,
        vertex_counts: &[u32],
        index_counts: &[u32],
    ) -> Result<ModelMeshPart> {
        let mut part = self.factory.create_mesh_part(index);

        let material = self.serializer.read_i32()?;
        part.material = match usize::try_from(material) {
            Ok(m) if m < material_count => MaterialId(m),
            _ => {
                return Err(ModelError::InvalidMaterialIndex {
                    index: material,
                    count: material_count,
                });
            }
        };
        part.index_range = self.read_range("index", index_counts)?;
        part.vertex_range = self.read_range("vertex", vertex_counts)?;

        let attributes = self.serializer.read_attributes()?;
        part.attributes.merge(attributes);
        Ok(part)
    }

    /// `(slot, start, count)` into one of the owning mesh's buffer lists.
    /// `lens` holds the element count of each buffer in that list.
    fn read_range(&mut self, kind: &'static str, lens: &[u32]) -> Result<BufferRange> {
        let slot = self.serializer.read_i32()?;
        let start = self.serializer.read_i32()?;
        let count = self.serializer.read_i32()?;

        let len = usize::try_from(slot)
            .ok()
            .and_then(|s| lens.get(s))
            .copied()
            .ok_or(ModelError::InvalidBufferSlot {
                kind,
                slot,
                count: lens.len(),
            })?;
        if start < 0 || count < 0 || i64::from(start) + i64::from(count) > i64::from(len) {
            return Err(ModelError::BufferRangeOutOfBounds {
                kind,
                start,
                count,
                len,
            });
        }
        Ok(BufferRange {
            slot: slot as usize,
            start: start as u32,
            count: count as u32,
        })
    }
}

/// Decode a model from `stream` with the default factory.
pub fn read_model<R, A, L>(
    allocator: A,
    stream: R,
    loader: L,
) -> Result<Model<A::Buffer, L::Texture>>
where
    R: Read,
    A: BufferAllocator,
    L: TextureLoader,
{
    ModelReader::new(allocator, stream, loader).read_model()
}

/// The parent must already be decoded. The bound check accepts
/// `parent == bones_read`, which then names the bone being read and fails to resolve.
fn resolve_parent(bones_read: usize, parent: i32) -> Result<Option<BoneId>> {
    if parent == -1 {
        return Ok(None);
    }
    if parent < -1 || parent as usize > bones_read {
        return Err(ModelError::InvalidBoneIndex {
            role: "parent",
            index: parent,
            count: bones_read,
        });
    }
    if parent as usize == bones_read {
        return Err(ModelError::UnresolvedParentBone {
            bone: bones_read,
            index: parent,
        });
    }
    Ok(Some(BoneId(parent as usize)))
}

fn resolve_child(index: i32, total: usize) -> Result<Option<BoneId>> {
    match index {
        -1 => Ok(None),
        i if i >= 0 && (i as usize) < total => Ok(Some(BoneId(i as usize))),
        i => Err(ModelError::InvalidBoneIndex {
            role: "child",
            index: i,
            count: total,
        }),
    }
}

/// Bytes per element. The length must split evenly; an empty buffer has stride 0.
fn derive_stride(kind: &'static str, byte_len: usize, count: usize) -> Result<u32> {
    let invalid = || ModelError::InvalidBufferStride {
        kind,
        byte_len,
        count,
    };
    if count == 0 {
        return if byte_len == 0 { Ok(0) } else { Err(invalid()) };
    }
    if byte_len % count != 0 {
        return Err(invalid());
    }
    u32::try_from(byte_len / count).map_err(|_| invalid())
}
