use indicatif::ProgressBar;

use crate::geometry::{get_reflection_ray, get_refraction_ray, Fp, Ray, Vec3f};
use crate::material::Refraction;
use crate::scene::{Hit, Primitive, Scene};
use crate::utils::color_to_byte;

/// Light reaching a point behind an opaque occluder.
pub static SHADOW_FACTOR: Fp = 0.2;

/// Colour seen along `ray`. `step` is 1 for primary rays; secondary rays are
/// only spawned while it is below `scene.ray_depth`. The result is not clamped.
pub fn trace(ray: &Ray, scene: &Scene, step: u32) -> Vec3f {
    let hit = match scene.closest_hit(ray) {
        Some(hit) => hit,
        None => return scene.bg_color,
    };
    let primitive = &scene.primitives[hit.index];
    let material = &primitive.material;
    let normal = primitive.shape.normal(&hit.point);
    let surface_color = primitive
        .appearance
        .effective_color(&material.color, &hit.point, &normal);

    let mut color = material.lighting(
        &surface_color,
        &normal,
        &scene.light_position,
        &-ray.direction,
        &hit.point,
    );
    color *= light_visibility(scene, &hit.point);

    if step < scene.ray_depth {
        if let Some(transparency) = material.transparency {
            color += transparency * trace_transmitted(ray, &hit, scene, step);
        }
        if let Some(refraction) = &material.refraction {
            if let Some(refracted) = trace_refracted(ray, &hit, primitive, refraction, scene, step) {
                color += refraction.coefficient * refracted;
            }
        }
        if let Some(reflection) = material.reflection {
            let reflected = Ray::new(hit.point, get_reflection_ray(&ray.direction, &normal));
            color += reflection * trace(&reflected, scene, step + 1);
        }
    }

    if scene.fog {
        color = apply_fog(&color, hit.point.z, scene.fog_near, scene.fog_far);
    }
    color
}

/// Fraction of the light arriving at `point`: 1 when unobstructed, otherwise
/// decided by the first occluder between the point and the light.
fn light_visibility(scene: &Scene, point: &Vec3f) -> Fp {
    let light_vec = scene.light_position - point;
    let shadow_ray = Ray::new(*point, light_vec);
    match scene.closest_hit(&shadow_ray) {
        Some(occluder) if occluder.distance < light_vec.norm() => {
            let material = &scene.primitives[occluder.index].material;
            if let Some(transparency) = material.transparency {
                transparency
            } else if let Some(refraction) = &material.refraction {
                refraction.coefficient
            } else {
                SHADOW_FACTOR
            }
        }
        _ => 1.0,
    }
}

/// Continues straight through the surface, starting behind its far side.
fn trace_transmitted(ray: &Ray, hit: &Hit, scene: &Scene, step: u32) -> Vec3f {
    let through = Ray::new(hit.point, ray.direction);
    let exit = scene
        .closest_hit(&through)
        .map_or(hit.point, |exit| exit.point);
    trace(&Ray::new(exit, ray.direction), scene, step + 1)
}

/// Bends the ray into the primitive and out of it again. `None` when either
/// interface reflects the ray totally.
fn trace_refracted(
    ray: &Ray,
    hit: &Hit,
    primitive: &Primitive,
    refraction: &Refraction,
    scene: &Scene,
    step: u32,
) -> Option<Vec3f> {
    let eta = 1.0 / refraction.ior;
    let entry_normal = primitive.shape.normal(&hit.point);
    let inside = Ray::new(
        hit.point,
        get_refraction_ray(&ray.direction, &entry_normal, eta)?,
    );
    let exit = match scene.closest_hit(&inside) {
        Some(exit) => exit,
        None => return Some(trace(&inside, scene, step + 1)),
    };
    let exit_normal = primitive.shape.normal(&exit.point);
    let outside = Ray::new(
        exit.point,
        get_refraction_ray(&inside.direction, &-exit_normal, 1.0 / eta)?,
    );
    Some(trace(&outside, scene, step + 1))
}

/// Blends towards white between `near` and `far` along -z.
fn apply_fog(color: &Vec3f, z: Fp, near: Fp, far: Fp) -> Vec3f {
    let t = ((z + near) / (near - far)).clamp(0.0, 1.0);
    color * (1.0 - t) + Vec3f::repeat(t)
}

pub fn primary_ray(scene: &Scene, x: Fp, y: Fp) -> Ray {
    Ray::new(scene.camera_position, Vec3f::new(x, y, -scene.edist))
}

/// Colour of cell `(i, j)` of the image plane, `j` counted from the bottom.
/// With antialiasing the four quarter points of the cell are averaged.
pub fn render_pixel(scene: &Scene, i: u32, j: u32) -> Vec3f {
    let divisions = scene.divisions as Fp;
    let cell_x = (scene.x_max - scene.x_min) / divisions;
    let cell_y = (scene.y_max - scene.y_min) / divisions;
    let xp = scene.x_min + i as Fp * cell_x;
    let yp = scene.y_min + j as Fp * cell_y;

    if scene.antialiasing {
        let offsets = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];
        let sum: Vec3f = offsets
            .iter()
            .map(|(dx, dy)| {
                let ray = primary_ray(scene, xp + dx * cell_x, yp + dy * cell_y);
                trace(&ray, scene, 1)
            })
            .sum();
        sum / offsets.len() as Fp
    } else {
        let ray = primary_ray(scene, xp + 0.5 * cell_x, yp + 0.5 * cell_y);
        trace(&ray, scene, 1)
    }
}

/// RGB bytes of the whole image, first row at the top.
pub fn render_scene(scene: &Scene) -> Vec<u8> {
    let n = scene.divisions;
    let mut result = Vec::<u8>::with_capacity(n as usize * n as usize * 3);
    let progress = ProgressBar::new(n as u64);
    for row in 0..n {
        let j = n - 1 - row;
        for i in 0..n {
            let color = render_pixel(scene, i, j);
            result.push(color_to_byte(color.x));
            result.push(color_to_byte(color.y));
            result.push(color_to_byte(color.z));
        }
        progress.inc(1);
    }
    progress.finish_and_clear();
    result
}
