use std::cell::RefCell;

use tkmodel::{
    ModelError, ModelReader,
    data_structures::{
        attributes::AttributeValue,
        model::{Material, MaterialId, ModelMesh},
    },
    reader::ModelFactory,
    resources::mesh::{BufferAllocator, BufferDescriptor, HostAllocator, HostBuffer},
};

use crate::common::test_utils::sample_model;

mod common;

#[derive(Default)]
struct RecordingFactory;

impl<B, T> ModelFactory<B, T> for RecordingFactory {
    fn create_material(&mut self, index: MaterialId) -> Material<T> {
        let mut material = Material::new(index);
        material
            .attributes
            .insert("Origin", AttributeValue::String("factory".to_string()));
        material
    }

    fn create_mesh(&mut self, index: usize) -> ModelMesh<B> {
        let mut mesh = ModelMesh::new();
        mesh.attributes.insert("Slot", AttributeValue::Int(index as i32));
        mesh
    }
}

#[test]
fn should_build_entities_through_custom_factory() {
    let bytes = sample_model().encode();
    let allocator = HostAllocator::new();
    let mut reader = ModelReader::with_factory(
        &allocator,
        bytes.as_slice(),
        |path: &str| -> anyhow::Result<String> { Ok(path.to_string()) },
        RecordingFactory,
    );
    let model = reader.read_model().unwrap();

    let material = &model.materials[0];
    assert_eq!(
        material.attributes.get("Origin").and_then(|v| v.as_str()),
        Some("factory")
    );
    // Decoded attributes are merged over the prepared ones.
    assert_eq!(material.name.as_deref(), Some("hull"));
    assert_eq!(
        model.meshes[0].attributes.get("Slot").and_then(|v| v.as_int()),
        Some(0)
    );
}

/// Records what the reader asks for and then refuses index buffers.
#[derive(Default)]
struct PickyAllocator {
    requests: RefCell<Vec<(String, usize, u32)>>,
}

impl BufferAllocator for PickyAllocator {
    type Buffer = HostBuffer;

    fn allocate_buffer(&self, desc: &BufferDescriptor<'_>) -> anyhow::Result<HostBuffer> {
        self.requests
            .borrow_mut()
            .push((desc.label.to_string(), desc.contents.len(), desc.stride));
        if desc.label.contains("index") {
            anyhow::bail!("index buffers are not supported");
        }
        HostAllocator::new().allocate_buffer(desc)
    }
}

#[test]
fn should_abort_when_buffer_allocation_fails() {
    let bytes = sample_model().encode();
    let allocator = PickyAllocator::default();
    let err = ModelReader::new(
        &allocator,
        bytes.as_slice(),
        |path: &str| -> anyhow::Result<String> { Ok(path.to_string()) },
    )
    .read_model()
    .unwrap_err();

    match err {
        ModelError::BufferAllocation { label, .. } => assert_eq!(label, "hull index buffer 0"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        *allocator.requests.borrow(),
        vec![
            ("hull vertex buffer 0".to_string(), 36, 12),
            ("hull index buffer 0".to_string(), 6, 2),
        ]
    );
}

#[test]
fn should_label_buffers_of_unnamed_meshes_by_index() {
    let mut desc = sample_model();
    desc.meshes[0].name = None;
    let allocator = HostAllocator::new();
    let model = tkmodel::read_model(
        &allocator,
        desc.encode().as_slice(),
        |path: &str| -> anyhow::Result<String> { Ok(path.to_string()) },
    )
    .unwrap();
    assert_eq!(model.meshes[0].vertex_buffers[0].buffer.label, "mesh 0 vertex buffer 0");
    let indices = &model.meshes[0].index_buffers[0].buffer;
    assert_eq!(indices.element_count(), 3);
    assert_eq!(indices.cast::<u16>().unwrap(), &[0, 1, 2]);
    assert!(indices.cast::<u32>().is_err());
}
