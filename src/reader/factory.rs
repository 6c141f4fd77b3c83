//! Construction hooks for every entity the reader produces.

use crate::data_structures::model::{
    BoneId, Material, MaterialId, Model, ModelBone, ModelMesh, ModelMeshPart,
};

/// Creates the empty entities that [`ModelReader`](crate::reader::ModelReader) then fills.
///
/// Every method has a default, so an implementation only overrides the entities
/// it wants to prepare differently (pre-filled attributes, different initial
/// transforms, counting, ...). The decode algorithm itself does not change.
pub trait ModelFactory<B, T> {
    fn create_model(&mut self) -> Model<B, T> {
        Model::default()
    }

    fn create_material(&mut self, index: MaterialId) -> Material<T> {
        Material::new(index)
    }

    fn create_bone(&mut self, index: BoneId) -> ModelBone {
        ModelBone::new(index)
    }

    fn create_mesh(&mut self, _index: usize) -> ModelMesh<B> {
        ModelMesh::new()
    }

    fn create_mesh_part(&mut self, _index: usize) -> ModelMeshPart {
        ModelMeshPart::default()
    }
}

/// Factory using all default constructors.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFactory;

impl<B, T> ModelFactory<B, T> for DefaultFactory {}
