// Usage: mesh_pack <model.obj|model.gltf|model.glb> <out.mesh>
//
// Converts every triangle mesh of a model file into a mesh pack.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, bail};
use engine_render::{MeshData, MeshPack};
use pica3d::logging::{LoggingConfig, init_logging};

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!("usage: mesh_pack <model> <output>");
    }
    let input = PathBuf::from(&args[1]);
    let output = PathBuf::from(&args[2]);

    let meshes = MeshData::load_from_file(&input)
        .with_context(|| format!("loading {}", input.display()))?;
    if meshes.is_empty() {
        bail!("{} contains no triangle meshes", input.display());
    }

    for mesh in &meshes {
        log::info!(
            "{}: {} vertices, {} indices, {}",
            mesh.name,
            mesh.vertex_count(),
            mesh.index_count(),
            match &mesh.texture {
                Some(t) => format!("{} byte texture", t.len()),
                None => "no texture".to_string(),
            }
        );
    }

    let file = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    MeshPack::new(meshes)
        .write(BufWriter::new(file))
        .with_context(|| format!("writing {}", output.display()))?;

    log::info!("wrote {}", output.display());
    Ok(())
}
