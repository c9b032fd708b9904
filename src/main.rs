mod geometry;
mod material;
mod rendering;
mod scene;
mod texture;
mod utils;


extern crate nalgebra as na;

use crate::rendering::render_scene;
use crate::scene::{load_scene, Scene};
use anyhow::{bail, Context, Result};
use image::{ImageFormat, RgbImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("usage: {} <scene-file> <out.ppm> [png-name]", args[0]);
    }
    let scene = load_scene(Path::new(&args[1]))
        .with_context(|| format!("failed to load scene {}", args[1]))?;
    scene.log_statistics();

    log::info!(
        "rendering {0}x{0} pixels, antialiasing {1}",
        scene.divisions,
        scene.antialiasing
    );
    let rendered_scene = render_scene(&scene);
    log::debug!("bytes: {}", rendered_scene.len());

    let out_file = File::create(&args[2]).with_context(|| format!("cannot create {}", args[2]))?;
    dump_rendered_to_ppm(&scene, &rendered_scene, &mut BufWriter::new(out_file))
        .with_context(|| format!("failed to write {}", args[2]))?;
    log::info!("wrote {}", args[2]);

    if args.len() >= 4 {
        let png_path = format!("{}.png", args[3]);
        dump_rendered_to_png(&scene, rendered_scene, &png_path)?;
        log::info!("wrote {}", png_path);
    }
    Ok(())
}

fn dump_rendered_to_png(scene: &Scene, rendered_scene: Vec<u8>, png_path: &str) -> Result<()> {
    let img = RgbImage::from_raw(scene.divisions, scene.divisions, rendered_scene)
        .context("rendered buffer does not match the image size")?;
    img.save_with_format(png_path, ImageFormat::Png)
        .with_context(|| format!("failed to write {}", png_path))?;
    Ok(())
}

fn dump_rendered_to_ppm(scene: &Scene, rendered_scene: &[u8], out_file: &mut impl Write) -> Result<()> {
    out_file.write_all(b"P6\n")?;
    out_file.write_all(format!("{} {}\n", scene.divisions, scene.divisions).as_bytes())?;
    out_file.write_all(b"255\n")?;
    out_file.write_all(rendered_scene)?;
    out_file.flush()?;
    Ok(())
}
