use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::geometry::{Fp, Ray, Shape3D, Vec3f, EPS};
use crate::material::{Material, Refraction};
use crate::texture::{Appearance, Texture, TextureError};

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("cannot read scene file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {command} expects {expected} arguments, got {got}")]
    MissingArguments {
        line: usize,
        command: String,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: cannot parse {token:?} as a number")]
    BadNumber { line: usize, token: String },

    #[error("line {line}: fog range {near}..{far} is empty")]
    BadFogRange { line: usize, near: Fp, far: Fp },

    #[error("line {line}: expected on or off, got {token:?}")]
    BadSwitch { line: usize, token: String },

    #[error("line {line}: {command} must follow a primitive")]
    NoCurrentPrimitive { line: usize, command: String },

    #[error("line {line}: FACE needs a preceding BOX with a face {face}")]
    NoSuchFace { line: usize, face: usize },

    #[error("line {line}: unknown texture {name:?}")]
    UnknownTexture { line: usize, name: String },

    #[error("line {line}: unknown appearance {kind:?}")]
    UnknownAppearance { line: usize, kind: String },

    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// One surface of the scene. Its position in `Scene::primitives` is its identity.
#[derive(Clone, Debug)]
pub struct Primitive {
    pub shape: Shape3D,
    pub material: Material,
    pub appearance: Appearance,
}

impl Primitive {
    pub fn new(shape: Shape3D, material: Material) -> Primitive {
        Primitive {
            shape,
            material,
            appearance: Appearance::Solid,
        }
    }
}

/// Result of a nearest-hit search.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub point: Vec3f,
    pub distance: Fp,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub primitives: Vec<Primitive>,
    pub bg_color: Vec3f,
    pub light_position: Vec3f,
    pub camera_position: Vec3f,
    /// Cells per side of the image plane.
    pub divisions: u32,
    pub x_min: Fp,
    pub x_max: Fp,
    pub y_min: Fp,
    pub y_max: Fp,
    /// Distance from the eye to the image plane.
    pub edist: Fp,
    pub ray_depth: u32,
    pub fog: bool,
    pub fog_near: Fp,
    pub fog_far: Fp,
    pub antialiasing: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Scene {
            primitives: vec![],
            bg_color: Vec3f::zeros(),
            light_position: Vec3f::new(10.0, 40.0, -3.0),
            camera_position: Vec3f::zeros(),
            divisions: 500,
            x_min: -10.0,
            x_max: 10.0,
            y_min: -10.0,
            y_max: 10.0,
            edist: 40.0,
            ray_depth: 5,
            fog: false,
            fog_near: 50.0,
            fog_far: 300.0,
            antialiasing: false,
        }
    }
}

impl Scene {
    /// Linear scan for the smallest distance along the ray. On equal
    /// distances the primitive added first wins.
    pub fn closest_hit(&self, ray: &Ray) -> Option<Hit> {
        let mut closest: Option<(usize, Fp)> = None;
        for (index, primitive) in self.primitives.iter().enumerate() {
            if let Some(t) = primitive.shape.intersect(ray) {
                if t > EPS && closest.map_or(true, |(_, best)| t < best) {
                    closest = Some((index, t));
                }
            }
        }
        closest.map(|(index, distance)| Hit {
            point: ray.at(distance),
            distance,
            index,
        })
    }

    pub fn add(&mut self, primitive: Primitive) -> usize {
        self.primitives.push(primitive);
        self.primitives.len() - 1
    }

    /// Axis aligned box of six planes with the front lower left corner at `corner`,
    /// extending `length` along +x, `height` along +y and `width` along -z.
    /// Faces are added as front, right, back, left, top, bottom; returns the
    /// index of the front face.
    pub fn add_box(&mut self, corner: Vec3f, length: Fp, width: Fp, height: Fp, color: Vec3f) -> usize {
        let (x, y, z) = (corner.x, corner.y, corner.z);
        let xl = x + length;
        let yh = y + height;
        let zw = z - width;

        let v1 = Vec3f::new(x, y, z);
        let v2 = Vec3f::new(xl, y, z);
        let v3 = Vec3f::new(xl, yh, z);
        let v4 = Vec3f::new(x, yh, z);
        let v5 = Vec3f::new(xl, y, zw);
        let v6 = Vec3f::new(xl, yh, zw);
        let v7 = Vec3f::new(x, yh, zw);
        let v8 = Vec3f::new(x, y, zw);

        let faces = [
            (v1, v2, v3, v4),
            (v2, v5, v6, v3),
            (v5, v8, v7, v6),
            (v4, v7, v8, v1),
            (v4, v3, v6, v7),
            (v8, v5, v2, v1),
        ];
        let first = self.primitives.len();
        for (a, b, c, d) in faces {
            self.add(Primitive::new(Shape3D::plane(a, b, c, d), Material::with_color(color)));
        }
        first
    }

    pub fn log_statistics(&self) {
        let mut shapes = BTreeMap::<&str, usize>::new();
        let mut appearances = BTreeMap::<&str, usize>::new();
        let (mut reflective, mut refractive, mut transparent) = (0, 0, 0);
        for primitive in &self.primitives {
            *shapes.entry(primitive.shape.kind_name()).or_default() += 1;
            *appearances.entry(primitive.appearance.name()).or_default() += 1;
            reflective += primitive.material.reflection.is_some() as usize;
            refractive += primitive.material.refraction.is_some() as usize;
            transparent += primitive.material.transparency.is_some() as usize;
        }
        log::info!("scene has {} primitives", self.primitives.len());
        log::debug!("shapes: {:?}", shapes);
        log::debug!("appearances: {:?}", appearances);
        log::debug!(
            "reflective: {}, refractive: {}, transparent: {}",
            reflective,
            refractive,
            transparent
        );
        log::debug!(
            "light at {:?}, depth {}, fog {}, antialiasing {}",
            self.light_position,
            self.ray_depth,
            self.fog,
            self.antialiasing
        );
    }
}

struct Command<'a> {
    line: usize,
    name: &'a str,
    args: Vec<&'a str>,
}

impl<'a> Command<'a> {
    fn expect_args(&self, expected: usize) -> Result<(), SceneError> {
        if self.args.len() < expected {
            return Err(SceneError::MissingArguments {
                line: self.line,
                command: self.name.to_string(),
                expected,
                got: self.args.len(),
            });
        }
        Ok(())
    }

    fn number(&self, i: usize) -> Result<Fp, SceneError> {
        self.args[i].parse().map_err(|_| SceneError::BadNumber {
            line: self.line,
            token: self.args[i].to_string(),
        })
    }

    fn integer<T: FromStr>(&self, i: usize) -> Result<T, SceneError> {
        self.args[i].parse().map_err(|_| SceneError::BadNumber {
            line: self.line,
            token: self.args[i].to_string(),
        })
    }

    fn vector(&self, i: usize) -> Result<Vec3f, SceneError> {
        Ok(Vec3f::new(self.number(i)?, self.number(i + 1)?, self.number(i + 2)?))
    }

    fn switch(&self, i: usize) -> Result<bool, SceneError> {
        match self.args[i].to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok(true),
            "off" | "false" | "0" => Ok(false),
            _ => Err(SceneError::BadSwitch {
                line: self.line,
                token: self.args[i].to_string(),
            }),
        }
    }

    fn current(&self, current: Option<usize>) -> Result<usize, SceneError> {
        current.ok_or_else(|| SceneError::NoCurrentPrimitive {
            line: self.line,
            command: self.name.to_string(),
        })
    }

    fn texture(&self, i: usize, textures: &HashMap<String, Arc<Texture>>) -> Result<Arc<Texture>, SceneError> {
        textures
            .get(self.args[i])
            .cloned()
            .ok_or_else(|| SceneError::UnknownTexture {
                line: self.line,
                name: self.args[i].to_string(),
            })
    }
}

pub fn load_scene(path: &Path) -> Result<Scene, SceneError> {
    let content = fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let lines = content.lines().map(|x| x.trim()).collect::<Vec<&str>>();
    let textures_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_file_content(&lines, textures_dir)
}

/// Builds a scene from the lines of a scene description. Texture paths are
/// resolved against `textures_dir`.
pub fn parse_file_content(content: &[&str], textures_dir: &Path) -> Result<Scene, SceneError> {
    let mut result = Scene::default();
    let mut textures = HashMap::<String, Arc<Texture>>::new();
    let mut current: Option<usize> = None;
    let mut last_box: Option<usize> = None;

    for (line_index, line) in content.iter().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(name) => name,
            None => continue,
        };
        let command = Command {
            line: line_index + 1,
            name,
            args: tokens.collect(),
        };
        log::debug!("line {}: {} {:?}", command.line, command.name, command.args);

        match command.name {
            "DIMENSIONS" => {
                command.expect_args(1)?;
                result.divisions = command.integer(0)?;
            }
            "IMAGE_PLANE" => {
                command.expect_args(4)?;
                result.x_min = command.number(0)?;
                result.x_max = command.number(1)?;
                result.y_min = command.number(2)?;
                result.y_max = command.number(3)?;
            }
            "EDIST" => {
                command.expect_args(1)?;
                result.edist = command.number(0)?;
            }
            "BG_COLOR" => {
                command.expect_args(3)?;
                result.bg_color = command.vector(0)?;
            }
            "LIGHT_POSITION" => {
                command.expect_args(3)?;
                result.light_position = command.vector(0)?;
            }
            "RAY_DEPTH" => {
                command.expect_args(1)?;
                result.ray_depth = command.integer(0)?;
            }
            "FOG" => {
                command.expect_args(1)?;
                result.fog = command.switch(0)?;
            }
            "FOG_RANGE" => {
                command.expect_args(2)?;
                let (near, far) = (command.number(0)?, command.number(1)?);
                if near >= far {
                    return Err(SceneError::BadFogRange {
                        line: command.line,
                        near,
                        far,
                    });
                }
                result.fog_near = near;
                result.fog_far = far;
            }
            "ANTIALIASING" => {
                command.expect_args(1)?;
                result.antialiasing = command.switch(0)?;
            }
            "TEXTURE" => {
                command.expect_args(2)?;
                let texture = Texture::open(&textures_dir.join(command.args[1]))?;
                textures.insert(command.args[0].to_string(), Arc::new(texture));
            }
            "SPHERE" => {
                command.expect_args(4)?;
                let shape = Shape3D::Sphere {
                    center: command.vector(0)?,
                    radius: command.number(3)?,
                };
                current = Some(result.add(Primitive::new(shape, Material::default())));
            }
            "PLANE" => {
                command.expect_args(12)?;
                let shape = Shape3D::plane(
                    command.vector(0)?,
                    command.vector(3)?,
                    command.vector(6)?,
                    command.vector(9)?,
                );
                current = Some(result.add(Primitive::new(shape, Material::default())));
            }
            "CONE" => {
                command.expect_args(5)?;
                let shape = Shape3D::Cone {
                    center: command.vector(0)?,
                    radius: command.number(3)?,
                    height: command.number(4)?,
                };
                current = Some(result.add(Primitive::new(shape, Material::default())));
            }
            "CYLINDER" => {
                command.expect_args(5)?;
                let shape = Shape3D::Cylinder {
                    center: command.vector(0)?,
                    radius: command.number(3)?,
                    height: command.number(4)?,
                };
                current = Some(result.add(Primitive::new(shape, Material::default())));
            }
            "BOX" => {
                command.expect_args(9)?;
                let first = result.add_box(
                    command.vector(0)?,
                    command.number(3)?,
                    command.number(4)?,
                    command.number(5)?,
                    command.vector(6)?,
                );
                last_box = Some(first);
                current = Some(result.primitives.len() - 1);
            }
            "FACE" => {
                command.expect_args(1)?;
                let face: usize = command.integer(0)?;
                match last_box {
                    Some(first) if face < 6 => current = Some(first + face),
                    _ => {
                        return Err(SceneError::NoSuchFace {
                            line: command.line,
                            face,
                        })
                    }
                }
            }
            "COLOR" => {
                command.expect_args(3)?;
                let index = command.current(current)?;
                result.primitives[index].material.color = command.vector(0)?;
            }
            "REFLECTIVE" => {
                command.expect_args(1)?;
                let index = command.current(current)?;
                result.primitives[index].material.reflection = Some(command.number(0)?);
            }
            "REFRACTIVE" => {
                command.expect_args(2)?;
                let index = command.current(current)?;
                result.primitives[index].material.refraction = Some(Refraction {
                    coefficient: command.number(0)?,
                    ior: command.number(1)?,
                });
            }
            "TRANSPARENT" => {
                command.expect_args(1)?;
                let index = command.current(current)?;
                result.primitives[index].material.transparency = Some(command.number(0)?);
            }
            "NO_SPECULAR" => {
                let index = command.current(current)?;
                result.primitives[index].material.specular_enabled = false;
            }
            "SHININESS" => {
                command.expect_args(1)?;
                let index = command.current(current)?;
                result.primitives[index].material.shininess = command.number(0)?;
            }
            "APPEARANCE" => {
                command.expect_args(1)?;
                let index = command.current(current)?;
                let appearance = match command.args[0] {
                    "SOLID" => Appearance::Solid,
                    "CHECKER" => Appearance::Checker,
                    "MOSAIC" => Appearance::Mosaic,
                    "SPHERE_MAP" => {
                        command.expect_args(2)?;
                        Appearance::SphereMap {
                            texture: command.texture(1, &textures)?,
                        }
                    }
                    "PLANAR_MAP" => {
                        command.expect_args(5)?;
                        Appearance::PlanarMap {
                            texture: command.texture(1, &textures)?,
                            half_width: command.number(2)?,
                            y_min: command.number(3)?,
                            y_span: command.number(4)?,
                        }
                    }
                    kind => {
                        return Err(SceneError::UnknownAppearance {
                            line: command.line,
                            kind: kind.to_string(),
                        })
                    }
                };
                result.primitives[index].appearance = appearance;
            }
            _ => {
                log::warn!("line {}: ignoring unknown command {}", command.line, command.name);
            }
        }
    }
    Ok(result)
}
