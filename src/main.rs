// src/main.rs
//
// Usage: pica3d [--trace-draws] [frames] [pack]
//
// Renders a spinning checker-textured cube (plus every mesh of `pack`, if
// given) on the headless backend and logs per-frame statistics.

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::PathBuf;

use anyhow::Context;
use engine_core::{Material, Transform};
use engine_render::fatal::{OrAbort, StderrDisplay};
use engine_render::{HEADLESS_SHADER, MeshData, MeshPack, RecordingGpu, RenderConfig, Renderer};
use glam::{Quat, Vec3};
use pica3d::logging::{LoggingConfig, init_logging};

const DEFAULT_FRAMES: u32 = 120;
const SPIN_PER_FRAME: f32 = 1.0 / 32.0;

fn checker_png(size: u32, cell: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbaImage::from_fn(size, size, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            image::Rgba([0xf0, 0xf0, 0xf0, 0xff])
        } else {
            image::Rgba([0x30, 0x60, 0xa0, 0xff])
        }
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .context("encoding checker texture")?;
    Ok(out.into_inner())
}

fn main() -> anyhow::Result<()> {
    let (flags, positional): (Vec<String>, Vec<String>) =
        std::env::args().skip(1).partition(|a| a.starts_with("--"));
    init_logging(LoggingConfig {
        trace_draws: flags.iter().any(|f| f == "--trace-draws"),
        ..Default::default()
    });
    if let Some(unknown) = flags.iter().find(|f| *f != "--trace-draws") {
        anyhow::bail!("unknown flag `{unknown}`");
    }

    let mut args = positional.into_iter();
    let frames = match args.next() {
        Some(arg) => arg
            .parse::<u32>()
            .with_context(|| format!("invalid frame count `{arg}`"))?,
        None => DEFAULT_FRAMES,
    };
    let pack_path = args.next().map(PathBuf::from);

    let mut display = StderrDisplay;
    let mut renderer = Renderer::new(RecordingGpu::new(), RenderConfig::default(), HEADLESS_SHADER)
        .or_abort(&mut display);

    let cube = MeshData::cube().to_triangle_list();
    let texture = checker_png(64, 8)?;
    let cube_id = renderer
        .register_mesh(&cube, &texture, Material::DEFAULT)
        .or_abort(&mut display);

    let pack_ids = match &pack_path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let pack = MeshPack::read(BufReader::new(file))
                .with_context(|| format!("reading {}", path.display()))?;
            log::info!("{}: {} meshes", path.display(), pack.meshes.len());
            renderer.register_pack(&pack).or_abort(&mut display)
        }
        None => Vec::new(),
    };

    let mut cube_transform = Transform::from_translation(0.0, 0.0, -2.5);
    let pack_transform = Transform::from_translation(0.0, -1.0, -6.0);

    for frame in 0..frames {
        cube_transform.rotate(Quat::from_axis_angle(
            Vec3::new(1.0, 1.0, 0.0).normalize(),
            SPIN_PER_FRAME,
        ));

        renderer.submit(cube_id, cube_transform.to_mat4())?;
        for &id in &pack_ids {
            renderer.submit(id, pack_transform.to_mat4())?;
        }

        let stats = renderer.render()?;
        log::info!(
            "frame {frame}: {} draws, {} vertices",
            stats.draw_calls,
            stats.vertices
        );
        renderer.gpu_mut().clear_log();
    }

    log::info!(
        "done: {} frames, {} bytes of GPU-visible memory",
        renderer.gpu().frames(),
        renderer.gpu().linear_allocated()
    );
    Ok(())
}
