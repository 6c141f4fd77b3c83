use std::path::{Path, PathBuf};

use crate::data_structures::texture;

/// Turns a material texture path into a texture handle.
///
/// Called once per texture entry while a model is decoded. Any error aborts
/// the decode.
pub trait TextureLoader {
    type Texture;

    fn load(&mut self, path: &str) -> anyhow::Result<Self::Texture>;
}

impl<T, F> TextureLoader for F
where
    F: FnMut(&str) -> anyhow::Result<T>,
{
    type Texture = T;

    fn load(&mut self, path: &str) -> anyhow::Result<T> {
        self(path)
    }
}

/// Location of an asset file, relative to `./assets`.
pub fn asset_path(file_name: &str) -> PathBuf {
    Path::new("./").join("assets").join(file_name)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = std::fs::read(&path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    Ok(data)
}

/// Load a texture from the asset directory and upload it.
///
/// The file extension, when present, is passed as a format hint to the image decoder.
pub fn load_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    load_texture_from(Path::new("./assets"), file_name, device, queue)
}

/// Like [`load_texture`], but resolves `file_name` against `root`.
///
/// Model files reference textures relative to their own directory, so tools
/// reading a model from an arbitrary location pass that directory here.
pub fn load_texture_from(
    root: &Path,
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let path = root.join(file_name);
    let data = std::fs::read(&path)
        .map_err(|e| anyhow::anyhow!("cannot read texture {}: {}", path.display(), e))?;
    let format = Path::new(file_name).extension().and_then(|e| e.to_str());
    texture::Texture::from_bytes(device, queue, &data, file_name, format)
}
