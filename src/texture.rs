use std::f64::consts::PI;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::geometry::{Fp, Vec3f};

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to decode texture {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("texture has no pixels ({width}x{height})")]
    Empty { width: usize, height: usize },

    #[error("{width}x{height} texture given {len} pixels")]
    SizeMismatch { width: usize, height: usize, len: usize },
}

/// RGB bitmap sampled with normalized coordinates.
#[derive(Clone, Debug)]
pub struct Texture {
    width: usize,
    height: usize,
    /// Row-major, first row is the top of the image.
    pixels: Vec<Vec3f>,
}

impl Texture {
    pub fn open(path: &Path) -> Result<Texture, TextureError> {
        let img = image::open(path)
            .map_err(|source| TextureError::Decode {
                path: path.display().to_string(),
                source,
            })?
            .to_rgb8();
        let pixels = img
            .pixels()
            .map(|p| {
                Vec3f::new(
                    p.0[0] as Fp / 255.0,
                    p.0[1] as Fp / 255.0,
                    p.0[2] as Fp / 255.0,
                )
            })
            .collect();
        let texture = Texture::from_pixels(img.width() as usize, img.height() as usize, pixels)?;
        log::debug!(
            "loaded texture {} ({}x{})",
            path.display(),
            texture.width,
            texture.height
        );
        Ok(texture)
    }

    /// Row-major pixels, top row first. Both dimensions must be non-zero.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Vec3f>) -> Result<Texture, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        if width * height != pixels.len() {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Texture {
            width,
            height,
            pixels,
        })
    }

    /// Nearest texel at `(u, v)`, `v = 0` being the bottom row.
    pub fn color_at(&self, u: Fp, v: Fp) -> Vec3f {
        let i = ((u.clamp(0.0, 1.0) * self.width as Fp) as usize).min(self.width - 1);
        let j = ((v.clamp(0.0, 1.0) * self.height as Fp) as usize).min(self.height - 1);
        let row = self.height - 1 - j;
        self.pixels[row * self.width + i]
    }
}

fn pattern_color(k: i64) -> Vec3f {
    if k != 0 {
        Vec3f::new(1.0, 0.0, 0.92)
    } else {
        Vec3f::new(1.0, 1.0, 0.5)
    }
}

/// Where the colour of a primitive comes from.
#[derive(Clone, Debug, Default)]
pub enum Appearance {
    #[default]
    Solid,
    /// Two colour checkerboard over the x/z coordinates, cells of 2 units.
    Checker,
    /// Irregular two colour tiling over the x/z coordinates, cells of 1 unit.
    Mosaic,
    /// Texture wrapped by the longitude/latitude of the surface normal.
    SphereMap { texture: Arc<Texture> },
    /// Texture projected along z over `[-half_width, half_width] x [y_min, y_min + y_span]`.
    /// Outside of that window the base colour is kept.
    PlanarMap {
        texture: Arc<Texture>,
        half_width: Fp,
        y_min: Fp,
        y_span: Fp,
    },
}

impl Appearance {
    pub fn name(&self) -> &'static str {
        match self {
            Appearance::Solid => "solid",
            Appearance::Checker => "checker",
            Appearance::Mosaic => "mosaic",
            Appearance::SphereMap { .. } => "sphere map",
            Appearance::PlanarMap { .. } => "planar map",
        }
    }

    /// Colour of the surface at `hit`, falling back to `base`.
    pub fn effective_color(&self, base: &Vec3f, hit: &Vec3f, normal: &Vec3f) -> Vec3f {
        match self {
            Appearance::Solid => *base,
            Appearance::Checker => {
                let iz = (hit.z / 2.0) as i64;
                let ix = (hit.x / 2.0 + 50.0) as i64;
                pattern_color((iz + ix) % 2)
            }
            Appearance::Mosaic => {
                let iz = (hit.z + 50.0) as i64;
                let ix = (hit.x + 50.0) as i64;
                if ix > 45 {
                    pattern_color((iz * ix + ix * ix) % 5)
                } else {
                    pattern_color((iz + ix * ix) % 5)
                }
            }
            Appearance::SphereMap { texture } => {
                let u = 0.5 + normal.x.atan2(normal.z) / (2.0 * PI);
                let v = 0.5 + normal.y.clamp(-1.0, 1.0).asin() / PI;
                texture.color_at(u, v)
            }
            Appearance::PlanarMap {
                texture,
                half_width,
                y_min,
                y_span,
            } => {
                let s = (hit.x + half_width) / (2.0 * half_width);
                let t = (hit.y - y_min) / y_span;
                if s > 0.0 && s < 1.0 && t > 0.0 && t < 1.0 {
                    texture.color_at(s, t)
                } else {
                    *base
                }
            }
        }
    }
}
