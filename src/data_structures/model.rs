//! Decoded model graph: materials, bones, meshes and their GPU buffers.
//!
//! A [`Model`] is generic over the buffer handle `B` produced by a
//! [`BufferAllocator`](crate::resources::mesh::BufferAllocator) and the texture
//! handle `T` produced by a [`TextureLoader`](crate::resources::texture::TextureLoader).
//! Cross references (mesh part to material, bone to bone) are typed indices
//! into the owning lists instead of pointers.

use crate::data_structures::{attributes::Attributes, texture::Texture};

/// A model whose buffers live on a wgpu device.
pub type GpuModel = Model<wgpu::Buffer, Texture>;

/// Index of a bone inside the list it was decoded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub usize);

/// Index of a material inside [`Model::materials`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

#[derive(Debug)]
pub struct Model<B, T> {
    pub materials: Vec<Material<T>>,
    pub bones: Vec<ModelBone>,
    pub skinned_bones: Vec<ModelBone>,
    pub meshes: Vec<ModelMesh<B>>,
    pub attributes: Attributes,
}

impl<B, T> Default for Model<B, T> {
    fn default() -> Self {
        Self {
            materials: Vec::new(),
            bones: Vec::new(),
            skinned_bones: Vec::new(),
            meshes: Vec::new(),
            attributes: Attributes::new(),
        }
    }
}

impl<B, T> Model<B, T> {
    pub fn material(&self, id: MaterialId) -> Option<&Material<T>> {
        self.materials.get(id.0)
    }

    pub fn bone(&self, id: BoneId) -> Option<&ModelBone> {
        self.bones.get(id.0)
    }

    /// Bones without a parent, in decode order.
    pub fn root_bones(&self) -> impl Iterator<Item = &ModelBone> {
        self.bones.iter().filter(|b| b.parent.is_none())
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<&ModelMesh<B>> {
        self.meshes.iter().find(|m| m.name.as_deref() == Some(name))
    }
}

/// Looks up children of `bone` in `bones`, the list the bone was decoded into.
///
/// `-1` entries in the file decode to `None` and are yielded as such.
pub fn child_bones<'a>(
    bones: &'a [ModelBone],
    bone: &'a ModelBone,
) -> impl Iterator<Item = Option<&'a ModelBone>> + 'a {
    bone.children
        .iter()
        .flatten()
        .map(move |child| child.and_then(|id| bones.get(id.0)))
}

#[derive(Clone, Debug)]
pub struct ModelBone {
    pub index: BoneId,
    pub name: Option<String>,
    pub parent: Option<BoneId>,
    pub transform: cgmath::Matrix4<f32>,
    pub children: Option<Vec<Option<BoneId>>>,
}

impl ModelBone {
    pub fn new(index: BoneId) -> Self {
        use cgmath::SquareMatrix;
        Self {
            index,
            name: None,
            parent: None,
            transform: cgmath::Matrix4::identity(),
            children: None,
        }
    }
}

/// Material channel a texture is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureType {
    None,
    Diffuse,
    Specular,
    Ambient,
    Emissive,
    Height,
    Normals,
    Shininess,
    Opacity,
    Displacement,
    Lightmap,
    Reflection,
    Unknown,
}

impl TextureType {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => TextureType::None,
            1 => TextureType::Diffuse,
            2 => TextureType::Specular,
            3 => TextureType::Ambient,
            4 => TextureType::Emissive,
            5 => TextureType::Height,
            6 => TextureType::Normals,
            7 => TextureType::Shininess,
            8 => TextureType::Opacity,
            9 => TextureType::Displacement,
            10 => TextureType::Lightmap,
            11 => TextureType::Reflection,
            12 => TextureType::Unknown,
            _ => return None,
        })
    }
}

/// How a texture is combined with the texture below it in its stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureOperation {
    Multiply,
    Add,
    Subtract,
    Divide,
    SmoothAdd,
    SignedAdd,
}

impl TextureOperation {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => TextureOperation::Multiply,
            1 => TextureOperation::Add,
            2 => TextureOperation::Subtract,
            3 => TextureOperation::Divide,
            4 => TextureOperation::SmoothAdd,
            5 => TextureOperation::SignedAdd,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureWrapMode {
    Wrap,
    Clamp,
    Mirror,
    Decal,
}

impl TextureWrapMode {
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => TextureWrapMode::Wrap,
            1 => TextureWrapMode::Clamp,
            2 => TextureWrapMode::Mirror,
            3 => TextureWrapMode::Decal,
            _ => return None,
        })
    }

    pub fn to_wgpu(&self) -> wgpu::AddressMode {
        match self {
            TextureWrapMode::Wrap => wgpu::AddressMode::Repeat,
            TextureWrapMode::Clamp => wgpu::AddressMode::ClampToEdge,
            TextureWrapMode::Mirror => wgpu::AddressMode::MirrorRepeat,
            TextureWrapMode::Decal => wgpu::AddressMode::ClampToBorder,
        }
    }
}

/// Per-texture flag bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureFlags(pub u8);

impl TextureFlags {
    pub const INVERT: u8 = 0x1;
    pub const USE_ALPHA: u8 = 0x2;
    pub const IGNORE_ALPHA: u8 = 0x4;

    pub fn contains(&self, bits: u8) -> bool {
        self.0 & bits == bits
    }
}

#[derive(Clone, Debug)]
pub struct MaterialTexture<T> {
    /// File stem of `file_path`.
    pub name: String,
    pub file_path: String,
    pub texture: T,
    pub kind: TextureType,
    pub index: i32,
    pub uv_index: i32,
    pub blend_factor: f32,
    pub operation: TextureOperation,
    pub wrap_mode: TextureWrapMode,
    pub flags: TextureFlags,
}

/// A material with one lazily created texture stack per channel.
#[derive(Clone, Debug)]
pub struct Material<T> {
    pub index: MaterialId,
    pub name: Option<String>,
    pub ambient: Option<Vec<MaterialTexture<T>>>,
    pub diffuse: Option<Vec<MaterialTexture<T>>>,
    pub displacement: Option<Vec<MaterialTexture<T>>>,
    pub emissive: Option<Vec<MaterialTexture<T>>>,
    pub height: Option<Vec<MaterialTexture<T>>>,
    pub lightmap: Option<Vec<MaterialTexture<T>>>,
    pub normals: Option<Vec<MaterialTexture<T>>>,
    pub opacity: Option<Vec<MaterialTexture<T>>>,
    pub reflection: Option<Vec<MaterialTexture<T>>>,
    pub shininess: Option<Vec<MaterialTexture<T>>>,
    pub specular: Option<Vec<MaterialTexture<T>>>,
    pub unknown: Option<Vec<MaterialTexture<T>>>,
    pub attributes: Attributes,
}

impl<T> Material<T> {
    pub fn new(index: MaterialId) -> Self {
        Self {
            index,
            name: None,
            ambient: None,
            diffuse: None,
            displacement: None,
            emissive: None,
            height: None,
            lightmap: None,
            normals: None,
            opacity: None,
            reflection: None,
            shininess: None,
            specular: None,
            unknown: None,
            attributes: Attributes::new(),
        }
    }

    fn slot_mut(&mut self, kind: TextureType) -> Option<&mut Option<Vec<MaterialTexture<T>>>> {
        Some(match kind {
            TextureType::None => return None,
            TextureType::Ambient => &mut self.ambient,
            TextureType::Diffuse => &mut self.diffuse,
            TextureType::Displacement => &mut self.displacement,
            TextureType::Emissive => &mut self.emissive,
            TextureType::Height => &mut self.height,
            TextureType::Lightmap => &mut self.lightmap,
            TextureType::Normals => &mut self.normals,
            TextureType::Opacity => &mut self.opacity,
            TextureType::Reflection => &mut self.reflection,
            TextureType::Shininess => &mut self.shininess,
            TextureType::Specular => &mut self.specular,
            TextureType::Unknown => &mut self.unknown,
        })
    }

    /// Textures of one channel; `None` until the first texture of that channel is added.
    pub fn stack(&self, kind: TextureType) -> Option<&[MaterialTexture<T>]> {
        let stack = match kind {
            TextureType::None => return None,
            TextureType::Ambient => &self.ambient,
            TextureType::Diffuse => &self.diffuse,
            TextureType::Displacement => &self.displacement,
            TextureType::Emissive => &self.emissive,
            TextureType::Height => &self.height,
            TextureType::Lightmap => &self.lightmap,
            TextureType::Normals => &self.normals,
            TextureType::Opacity => &self.opacity,
            TextureType::Reflection => &self.reflection,
            TextureType::Shininess => &self.shininess,
            TextureType::Specular => &self.specular,
            TextureType::Unknown => &self.unknown,
        };
        stack.as_deref()
    }

    /// Push `texture` onto the stack of its kind. Textures of kind `None` are dropped.
    pub fn push_texture(&mut self, texture: MaterialTexture<T>) -> bool {
        match self.slot_mut(texture.kind) {
            Some(slot) => {
                slot.get_or_insert_with(Vec::new).push(texture);
                true
            }
            None => false,
        }
    }

    /// All textures of all channels, channel by channel.
    pub fn textures_mut(&mut self) -> impl Iterator<Item = &mut MaterialTexture<T>> {
        [
            &mut self.ambient,
            &mut self.diffuse,
            &mut self.displacement,
            &mut self.emissive,
            &mut self.height,
            &mut self.lightmap,
            &mut self.normals,
            &mut self.opacity,
            &mut self.reflection,
            &mut self.shininess,
            &mut self.specular,
            &mut self.unknown,
        ]
        .into_iter()
        .flatten()
        .flatten()
    }

    /// True when no channel has a texture.
    pub fn has_no_textures(&self) -> bool {
        [
            &self.ambient,
            &self.diffuse,
            &self.displacement,
            &self.emissive,
            &self.height,
            &self.lightmap,
            &self.normals,
            &self.opacity,
            &self.reflection,
            &self.shininess,
            &self.specular,
            &self.unknown,
        ]
        .iter()
        .all(|s| s.is_none())
    }
}

#[derive(Debug)]
pub struct ModelMesh<B> {
    pub name: Option<String>,
    pub parent_bone: Option<BoneId>,
    pub vertex_buffers: Vec<VertexBufferBinding<B>>,
    pub index_buffers: Vec<IndexBufferBinding<B>>,
    pub parts: Vec<ModelMeshPart>,
    pub attributes: Attributes,
}

impl<B> ModelMesh<B> {
    pub fn new() -> Self {
        Self {
            name: None,
            parent_bone: None,
            vertex_buffers: Vec::new(),
            index_buffers: Vec::new(),
            parts: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn vertex_buffer(&self, range: &BufferRange) -> Option<&VertexBufferBinding<B>> {
        self.vertex_buffers.get(range.slot)
    }

    pub fn index_buffer(&self, range: &BufferRange) -> Option<&IndexBufferBinding<B>> {
        self.index_buffers.get(range.slot)
    }
}

impl<B> Default for ModelMesh<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// A slot in the owning mesh's buffer list plus an element range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferRange {
    pub slot: usize,
    pub start: u32,
    pub count: u32,
}

impl BufferRange {
    pub fn elements(&self) -> std::ops::Range<u32> {
        self.start..self.start + self.count
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelMeshPart {
    pub material: MaterialId,
    pub index_range: BufferRange,
    pub vertex_range: BufferRange,
    pub attributes: Attributes,
}

/// One attribute inside a vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexElement {
    pub semantic: String,
    pub semantic_index: u32,
    pub format: wgpu::VertexFormat,
    pub offset: u32,
}

impl VertexElement {
    pub fn format_from_code(code: u32) -> Option<wgpu::VertexFormat> {
        use wgpu::VertexFormat::*;
        Some(match code {
            0 => Float32,
            1 => Float32x2,
            2 => Float32x3,
            3 => Float32x4,
            4 => Uint32,
            5 => Sint32,
            6 => Uint8x4,
            7 => Unorm8x4,
            8 => Uint16x2,
            9 => Uint16x4,
            10 => Float16x2,
            11 => Float16x4,
            _ => return None,
        })
    }
}

/// Ordered vertex elements plus the matching wgpu attributes.
///
/// Shader locations follow element order, starting at 0.
#[derive(Clone, Debug, Default)]
pub struct VertexLayout {
    elements: Vec<VertexElement>,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    pub fn new(elements: Vec<VertexElement>) -> Self {
        let attributes = elements
            .iter()
            .enumerate()
            .map(|(location, e)| wgpu::VertexAttribute {
                offset: e.offset as wgpu::BufferAddress,
                shader_location: location as u32,
                format: e.format,
            })
            .collect();
        Self {
            elements,
            attributes,
        }
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    pub fn attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.attributes
    }
}

#[derive(Debug)]
pub struct VertexBufferBinding<B> {
    pub layout: VertexLayout,
    pub buffer: B,
    pub vertex_count: u32,
    /// Bytes per vertex, derived from the payload size.
    pub stride: u32,
}

impl<B> VertexBufferBinding<B> {
    /// Describes the buffer for a render pipeline.
    pub fn desc(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: self.layout.attributes(),
        }
    }
}

#[derive(Debug)]
pub struct IndexBufferBinding<B> {
    pub buffer: B,
    pub index_count: u32,
    pub format: wgpu::IndexFormat,
}
