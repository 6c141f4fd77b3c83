use byteorder::{LittleEndian, WriteBytesExt};
use tkmodel::data_structures::attributes::{AttributeValue, Attributes};

/// Reference TKMD writer. Chunk lengths are back-patched on close.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
    open: Vec<usize>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_chunk(&mut self, tag: &[u8; 4]) {
        self.buf.extend_from_slice(tag);
        self.open.push(self.buf.len());
        self.u32(0);
    }

    pub fn end_chunk(&mut self) {
        let at = self.open.pop().expect("no open chunk");
        let len = (self.buf.len() - at - 4) as u32;
        self.buf[at..at + 4].copy_from_slice(&len.to_le_bytes());
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.write_u8(v).unwrap();
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.write_i32::<LittleEndian>(v).unwrap();
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.write_u32::<LittleEndian>(v).unwrap();
    }

    pub fn f32(&mut self, v: f32) {
        self.buf.write_f32::<LittleEndian>(v).unwrap();
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn string(&mut self, v: &str) {
        self.u32(v.len() as u32);
        self.bytes(v.as_bytes());
    }

    pub fn optional_string(&mut self, v: Option<&str>) {
        match v {
            Some(s) => {
                self.u8(1);
                self.string(s);
            }
            None => self.u8(0),
        }
    }

    pub fn matrix(&mut self, m: &[f32; 16]) {
        for v in m {
            self.f32(*v);
        }
    }

    pub fn attributes(&mut self, attributes: &Attributes) {
        self.i32(attributes.len() as i32);
        for (key, value) in attributes.iter() {
            self.string(key);
            match value {
                AttributeValue::Bool(v) => {
                    self.u8(0);
                    self.u8(*v as u8);
                }
                AttributeValue::Int(v) => {
                    self.u8(1);
                    self.i32(*v);
                }
                AttributeValue::Float(v) => {
                    self.u8(2);
                    self.f32(*v);
                }
                AttributeValue::String(v) => {
                    self.u8(3);
                    self.string(v);
                }
                AttributeValue::Vector4(v) => {
                    self.u8(4);
                    for x in v {
                        self.f32(*x);
                    }
                }
                AttributeValue::Matrix(m) => {
                    self.u8(5);
                    let columns: [[f32; 4]; 4] = (*m).into();
                    for column in columns {
                        for x in column {
                            self.f32(x);
                        }
                    }
                }
                AttributeValue::Bytes(v) => {
                    self.u8(6);
                    self.u32(v.len() as u32);
                    self.bytes(v);
                }
            }
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        assert!(self.open.is_empty(), "unclosed chunk");
        self.buf
    }
}

pub const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

#[derive(Clone, Debug)]
pub struct TextureDesc {
    pub path: String,
    pub kind: u8,
    pub index: i32,
    pub uv_index: i32,
    pub blend_factor: f32,
    pub operation: u8,
    pub wrap_mode: i32,
    pub flags: u8,
}

impl TextureDesc {
    pub fn new(path: &str, kind: u8) -> Self {
        Self {
            path: path.to_string(),
            kind,
            index: 0,
            uv_index: 0,
            blend_factor: 1.0,
            operation: 0,
            wrap_mode: 0,
            flags: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MaterialDesc {
    pub textures: Vec<TextureDesc>,
    pub attributes: Attributes,
}

#[derive(Clone, Debug)]
pub struct BoneDesc {
    pub parent: i32,
    pub transform: [f32; 16],
    pub name: Option<String>,
    pub children: Option<Vec<i32>>,
}

impl BoneDesc {
    pub fn new(name: &str, parent: i32) -> Self {
        Self {
            parent,
            transform: IDENTITY,
            name: Some(name.to_string()),
            children: None,
        }
    }

    pub fn with_children(mut self, children: &[i32]) -> Self {
        self.children = Some(children.to_vec());
        self
    }
}

#[derive(Clone, Debug)]
pub struct VertexElementDesc {
    pub semantic: String,
    pub semantic_index: u32,
    pub format: u32,
    pub offset: u32,
}

#[derive(Clone, Debug, Default)]
pub struct VertexBufferDesc {
    pub vertex_count: i32,
    pub elements: Vec<VertexElementDesc>,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct IndexBufferDesc {
    pub index_count: i32,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct PartDesc {
    pub material: i32,
    pub index_range: (i32, i32, i32),
    pub vertex_range: (i32, i32, i32),
    pub attributes: Attributes,
}

#[derive(Clone, Debug, Default)]
pub struct MeshDesc {
    pub name: Option<String>,
    pub parent_bone: i32,
    pub vertex_buffers: Vec<VertexBufferDesc>,
    pub index_buffers: Vec<IndexBufferDesc>,
    pub parts: Vec<PartDesc>,
    pub attributes: Attributes,
}

#[derive(Clone, Debug, Default)]
pub struct ModelDesc {
    pub scratch_size: i32,
    pub materials: Vec<MaterialDesc>,
    pub bones: Vec<BoneDesc>,
    pub skinned_bones: Vec<BoneDesc>,
    pub meshes: Vec<MeshDesc>,
    pub attributes: Attributes,
}

impl ModelDesc {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.begin_chunk(b"TKMD");
        w.i32(self.scratch_size);

        w.begin_chunk(b"MATL");
        w.i32(self.materials.len() as i32);
        for material in &self.materials {
            write_material(&mut w, material);
        }
        w.end_chunk();

        w.begin_chunk(b"BONE");
        write_bones(&mut w, &self.bones);
        w.end_chunk();

        w.begin_chunk(b"SKIN");
        write_bones(&mut w, &self.skinned_bones);
        w.end_chunk();

        w.begin_chunk(b"MESH");
        w.i32(self.meshes.len() as i32);
        for mesh in &self.meshes {
            write_mesh(&mut w, mesh);
        }
        w.end_chunk();

        w.attributes(&self.attributes);
        w.end_chunk();
        w.into_bytes()
    }
}

fn write_material(w: &mut Writer, material: &MaterialDesc) {
    w.i32(material.textures.len() as i32);
    for t in &material.textures {
        w.string(&t.path);
        w.u8(t.kind);
        w.i32(t.index);
        w.i32(t.uv_index);
        w.f32(t.blend_factor);
        w.u8(t.operation);
        w.i32(t.wrap_mode);
        w.u8(t.flags);
    }
    w.attributes(&material.attributes);
}

fn write_bones(w: &mut Writer, bones: &[BoneDesc]) {
    w.i32(bones.len() as i32);
    for bone in bones {
        w.i32(bone.parent);
        w.matrix(&bone.transform);
        w.optional_string(bone.name.as_deref());
        match &bone.children {
            Some(children) => {
                w.u8(1);
                w.i32(children.len() as i32);
                for c in children {
                    w.i32(*c);
                }
            }
            None => w.u8(0),
        }
    }
}

fn write_mesh(w: &mut Writer, mesh: &MeshDesc) {
    w.optional_string(mesh.name.as_deref());
    w.i32(mesh.parent_bone);

    w.i32(mesh.vertex_buffers.len() as i32);
    for vb in &mesh.vertex_buffers {
        w.i32(vb.vertex_count);
        w.i32(vb.elements.len() as i32);
        for e in &vb.elements {
            w.string(&e.semantic);
            w.u32(e.semantic_index);
            w.u32(e.format);
            w.u32(e.offset);
        }
        w.i32(vb.bytes.len() as i32);
        w.bytes(&vb.bytes);
    }

    w.i32(mesh.index_buffers.len() as i32);
    for ib in &mesh.index_buffers {
        w.i32(ib.index_count);
        w.i32(ib.bytes.len() as i32);
        w.bytes(&ib.bytes);
    }

    w.i32(mesh.parts.len() as i32);
    for part in &mesh.parts {
        w.i32(part.material);
        let (slot, start, count) = part.index_range;
        w.i32(slot);
        w.i32(start);
        w.i32(count);
        let (slot, start, count) = part.vertex_range;
        w.i32(slot);
        w.i32(start);
        w.i32(count);
        w.attributes(&part.attributes);
    }

    w.attributes(&mesh.attributes);
}

/// Three positions as `Float32x3`.
pub fn triangle_vertices() -> VertexBufferDesc {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    VertexBufferDesc {
        vertex_count: 3,
        elements: vec![VertexElementDesc {
            semantic: "POSITION".to_string(),
            semantic_index: 0,
            format: 2,
            offset: 0,
        }],
        bytes: bytemuck::cast_slice(&positions).to_vec(),
    }
}

pub fn triangle_indices() -> IndexBufferDesc {
    let indices: [u16; 3] = [0, 1, 2];
    IndexBufferDesc {
        index_count: 3,
        bytes: bytemuck::cast_slice(&indices).to_vec(),
    }
}

/// One named material with a diffuse texture, a small bone tree and one
/// triangle mesh referencing both.
pub fn sample_model() -> ModelDesc {
    let mut material_attributes = Attributes::new();
    material_attributes.insert("Name", AttributeValue::String("hull".to_string()));
    material_attributes.insert("Shininess", AttributeValue::Float(0.5));

    let mut texture = TextureDesc::new("textures/hull_diffuse.png", 1);
    texture.wrap_mode = 1;
    texture.flags = 2;
    texture.blend_factor = 0.75;

    let mut model_attributes = Attributes::new();
    model_attributes.insert("Author", AttributeValue::String("tests".to_string()));
    model_attributes.insert("Version", AttributeValue::Int(3));

    let mut part_attributes = Attributes::new();
    part_attributes.insert("Visible", AttributeValue::Bool(true));

    let mut root = BoneDesc::new("root", -1).with_children(&[1, 2]);
    root.transform[12] = 5.0;

    ModelDesc {
        scratch_size: 64,
        materials: vec![MaterialDesc {
            textures: vec![texture],
            attributes: material_attributes,
        }],
        bones: vec![
            root,
            BoneDesc::new("arm", 0).with_children(&[-1]),
            BoneDesc::new("leg", 0),
        ],
        skinned_bones: vec![BoneDesc::new("skin_root", -1)],
        meshes: vec![MeshDesc {
            name: Some("hull".to_string()),
            parent_bone: 0,
            vertex_buffers: vec![triangle_vertices()],
            index_buffers: vec![triangle_indices()],
            parts: vec![PartDesc {
                material: 0,
                index_range: (0, 0, 3),
                vertex_range: (0, 0, 3),
                attributes: part_attributes,
            }],
            attributes: Attributes::new(),
        }],
        attributes: model_attributes,
    }
}

/// Decode with host buffers; each texture handle is its path.
pub fn decode(
    bytes: &[u8],
) -> tkmodel::reader::Result<
    tkmodel::data_structures::model::Model<tkmodel::resources::mesh::HostBuffer, String>,
> {
    let allocator = tkmodel::resources::mesh::HostAllocator::new();
    tkmodel::read_model(&allocator, bytes, |path: &str| -> anyhow::Result<String> {
        Ok(path.to_string())
    })
}
