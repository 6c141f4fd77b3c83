use std::io::Cursor;

use crate::{
    data_structures::{model::GpuModel, texture::create_sampler},
    reader::ModelReader,
    resources::texture::{load_binary, load_texture},
};

/**
 * This module contains all logic for loading models and textures from external files
 * and for creating the GPU resources a decoded model refers to.
 */
pub mod mesh;
pub mod texture;

/// Load a TKMD model from the asset directory onto `device`.
///
/// Texture paths inside the model are resolved relative to the asset directory
/// as well. Each texture's sampler follows the wrap mode stored in the file.
pub async fn load_model(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<GpuModel> {
    let data = load_binary(file_name).await?;
    let mut reader = ModelReader::new(device, Cursor::new(data), |path: &str| {
        load_texture(path, device, queue)
    });
    let mut model = reader
        .read_model()
        .map_err(|e| anyhow::anyhow!("failed to decode {}: {}", file_name, e))?;

    for material in model.materials.iter_mut() {
        for texture in material.textures_mut() {
            texture.texture.sampler = create_sampler(device, texture.wrap_mode.to_wgpu());
        }
    }
    Ok(model)
}
