use crate::geometry::{get_reflection_ray, Fp, Vec3f};

#[derive(Clone, Debug, PartialEq)]
pub struct Refraction {
    pub coefficient: Fp,
    pub ior: Fp,
}

/// Surface response of a primitive. Each optional effect carries the
/// coefficient its recursive contribution is weighted with.
#[derive(Clone, Debug)]
pub struct Material {
    pub color: Vec3f,
    pub ambient: Fp,
    pub diffuse: Fp,
    pub specular: Fp,
    pub shininess: Fp,
    pub specular_enabled: bool,
    pub reflection: Option<Fp>,
    pub refraction: Option<Refraction>,
    pub transparency: Option<Fp>,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            color: Vec3f::new(1.0, 1.0, 1.0),
            ambient: 0.2,
            diffuse: 1.0,
            specular: 1.0,
            shininess: 50.0,
            specular_enabled: true,
            reflection: None,
            refraction: None,
            transparency: None,
        }
    }
}

impl Material {
    pub fn with_color(color: Vec3f) -> Material {
        Material {
            color,
            ..Default::default()
        }
    }

    /// Phong shading of `color` at `hit` with a white point light.
    /// `view` points from the surface back to the viewer.
    pub fn lighting(
        &self,
        color: &Vec3f,
        normal: &Vec3f,
        light_position: &Vec3f,
        view: &Vec3f,
        hit: &Vec3f,
    ) -> Vec3f {
        let light_dir = (light_position - hit).normalize();
        let l_dot_n = light_dir.dot(normal).max(0.0);
        let specular_term = if self.specular_enabled {
            let reflected = get_reflection_ray(&-light_dir, normal);
            let r_dot_v = reflected.dot(view);
            if r_dot_v > 0.0 {
                self.specular * r_dot_v.powf(self.shininess)
            } else {
                0.0
            }
        } else {
            0.0
        };
        color * (self.ambient + self.diffuse * l_dot_n) + Vec3f::repeat(specular_term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_behind_surface_leaves_ambient() {
        let material = Material::with_color(Vec3f::new(1.0, 0.5, 0.0));
        let color = material.lighting(
            &material.color,
            &Vec3f::y(),
            &Vec3f::new(0.0, -10.0, 0.0),
            &Vec3f::y(),
            &Vec3f::zeros(),
        );
        assert!((color - Vec3f::new(0.2, 0.1, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn head_on_light_has_full_diffuse_and_highlight() {
        let material = Material::with_color(Vec3f::new(0.5, 0.5, 0.5));
        let color = material.lighting(
            &material.color,
            &Vec3f::y(),
            &Vec3f::new(0.0, 10.0, 0.0),
            &Vec3f::y(),
            &Vec3f::zeros(),
        );
        // 0.5 * (0.2 + 1.0) + 1.0
        assert!((color - Vec3f::repeat(1.6)).norm() < 1e-12);
    }

    #[test]
    fn disabled_specularity_drops_highlight() {
        let material = Material {
            specular_enabled: false,
            ..Material::with_color(Vec3f::new(0.5, 0.5, 0.5))
        };
        let color = material.lighting(
            &material.color,
            &Vec3f::y(),
            &Vec3f::new(0.0, 10.0, 0.0),
            &Vec3f::y(),
            &Vec3f::zeros(),
        );
        assert!((color - Vec3f::repeat(0.6)).norm() < 1e-12);
    }
}
