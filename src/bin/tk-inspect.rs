use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::Parser;
use tkmodel::{
    context::Context,
    data_structures::{
        model::{Model, ModelBone, child_bones},
        texture::Texture,
    },
    reader::ModelReader,
    resources::{mesh::HostAllocator, texture::load_texture_from},
};

#[derive(Parser, Debug)]
#[command(name = "tk-inspect", version)]
/// Decode a TKMD model and print what it contains.
struct Cli {
    /// Model file. Texture paths inside it are resolved against its directory.
    file: PathBuf,

    /// Keep buffers in host memory and skip texture loading; no GPU needed.
    #[arg(long)]
    host: bool,
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Warning: Could not initialize logger: {}", e);
    }
    let cli = Cli::parse();

    let file = File::open(&cli.file).with_context(|| format!("open '{}'", cli.file.display()))?;
    let stream = BufReader::new(file);

    if cli.host {
        let allocator = HostAllocator::new();
        let model = ModelReader::new(
            &allocator,
            stream,
            |path: &str| -> anyhow::Result<String> { Ok(path.to_string()) },
        )
        .read_model()
        .with_context(|| format!("decode '{}'", cli.file.display()))?;
        print_summary(&model);
        println!("host buffers: {}", allocator.allocated());
    } else {
        let root = cli.file.parent().unwrap_or(Path::new("."));
        let ctx = futures::executor::block_on(Context::headless())?;
        let model = ModelReader::new(&ctx.device, stream, |path: &str| -> anyhow::Result<Texture> {
            load_texture_from(root, path, &ctx.device, &ctx.queue)
        })
        .read_model()
        .with_context(|| format!("decode '{}'", cli.file.display()))?;
        print_summary(&model);
    }
    Ok(())
}

fn print_summary<B, T>(model: &Model<B, T>) {
    println!("materials: {}", model.materials.len());
    for material in &model.materials {
        println!(
            "  [{}] {}",
            material.index.0,
            material.name.as_deref().unwrap_or("<unnamed>")
        );
    }

    println!("bones: {}", model.bones.len());
    for root in model.root_bones() {
        print_bone(&model.bones, root, 1);
    }
    println!("skinned bones: {}", model.skinned_bones.len());

    println!("meshes: {}", model.meshes.len());
    for (i, mesh) in model.meshes.iter().enumerate() {
        println!(
            "  [{}] {}: {} vertex buffers, {} index buffers",
            i,
            mesh.name.as_deref().unwrap_or("<unnamed>"),
            mesh.vertex_buffers.len(),
            mesh.index_buffers.len()
        );
        for part in &mesh.parts {
            println!(
                "    part: material {}, indices {:?} of buffer {}, vertices {:?} of buffer {}",
                part.material.0,
                part.index_range.elements(),
                part.index_range.slot,
                part.vertex_range.elements(),
                part.vertex_range.slot
            );
        }
    }
    println!("attributes: {}", model.attributes.len());
}

fn print_bone(bones: &[ModelBone], bone: &ModelBone, depth: usize) {
    println!(
        "{:indent$}{} ({})",
        "",
        bone.name.as_deref().unwrap_or("<unnamed>"),
        bone.index.0,
        indent = depth * 2
    );
    // Child links may form cycles.
    if depth > 64 {
        return;
    }
    for child in child_bones(bones, bone).flatten() {
        print_bone(bones, child, depth + 1);
    }
}
