use arrayvec::ArrayVec;
use na::Vector3;

pub type Fp = f64;
pub type Vec3f = Vector3<Fp>;

/// Discriminant tolerance, also the minimal accepted ray parameter so that
/// secondary rays do not hit the surface they start on.
pub static EPS: Fp = 0.001;
/// Leading coefficients below this are treated as a degenerate quadratic.
static DEGENERATE_EPS: Fp = 1e-9;
static PARALLEL_EPS: Fp = 1e-4;

#[derive(Clone, Debug)]
pub struct Ray {
    pub origin: Vec3f,
    pub direction: Vec3f,
}

impl Ray {
    /// Direction is normalized here, reflect/refract rely on it.
    pub fn new(origin: Vec3f, direction: Vec3f) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: Fp) -> Vec3f {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Debug)]
pub enum Shape3D {
    Sphere {
        center: Vec3f,
        radius: Fp,
    },
    /// Convex quadrilateral `a b c d`, `norm` is derived from the corners.
    Plane {
        a: Vec3f,
        b: Vec3f,
        c: Vec3f,
        d: Vec3f,
        norm: Vec3f,
    },
    /// Vertical cone standing on `center` with the apex `height` above it.
    Cone {
        center: Vec3f,
        radius: Fp,
        height: Fp,
    },
    /// Vertical cylinder from `center.y` up to `center.y + height`, open at the bottom.
    Cylinder {
        center: Vec3f,
        radius: Fp,
        height: Fp,
    },
}

/// Roots of `a·t² + b·t + c`, in the order `(-b - √Δ) / 2a`, `(-b + √Δ) / 2a`.
fn solve_quadratic(a: Fp, b: Fp, c: Fp) -> ArrayVec<Fp, 2> {
    let mut result = ArrayVec::new();
    if a.abs() < DEGENERATE_EPS {
        return result;
    }
    let discr = b * b - 4.0 * a * c;
    if discr < EPS {
        return result;
    }
    let sqrt_discr = discr.sqrt();
    result.push((-b - sqrt_discr) / (2.0 * a));
    result.push((-b + sqrt_discr) / (2.0 * a));
    result
}

impl Shape3D {
    pub fn plane(a: Vec3f, b: Vec3f, c: Vec3f, d: Vec3f) -> Shape3D {
        let norm = (c - b).cross(&(a - b)).normalize();
        Shape3D::Plane { a, b, c, d, norm }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape3D::Sphere { .. } => "sphere",
            Shape3D::Plane { .. } => "plane",
            Shape3D::Cone { .. } => "cone",
            Shape3D::Cylinder { .. } => "cylinder",
        }
    }

    /// Nearest valid distance along the ray, `None` if the shape is missed.
    pub fn intersect(&self, ray: &Ray) -> Option<Fp> {
        let o = ray.origin;
        let d = ray.direction;
        match self {
            Shape3D::Sphere { center, radius } => {
                let oc = o - center;
                solve_quadratic(d.dot(&d), 2.0 * d.dot(&oc), oc.dot(&oc) - radius * radius)
                    .into_iter()
                    .filter(|t| *t >= EPS)
                    .reduce(Fp::min)
            }
            Shape3D::Plane { a, norm, .. } => {
                let d_dot_n = d.dot(norm);
                if d_dot_n.abs() < PARALLEL_EPS {
                    return None;
                }
                let t = (a - o).dot(norm) / d_dot_n;
                if t < 0.0 {
                    return None;
                }
                if self.contains(&ray.at(t)) {
                    Some(t)
                } else {
                    None
                }
            }
            Shape3D::Cone {
                center,
                radius,
                height,
            } => {
                let apex = center.y + height;
                let ratio = (radius / height) * (radius / height);
                let dx = o.x - center.x;
                let dz = o.z - center.z;
                let dy = apex - o.y;
                let roots = solve_quadratic(
                    d.x * d.x + d.z * d.z - ratio * d.y * d.y,
                    2.0 * (d.x * dx + d.z * dz + ratio * d.y * dy),
                    dx * dx + dz * dz - ratio * dy * dy,
                );
                let (t1, t2) = match roots.as_slice() {
                    [t1, t2] => (*t1, *t2),
                    _ => return None,
                };
                let t = if t1 >= EPS {
                    t1
                } else if t2 >= EPS {
                    t2
                } else {
                    return None;
                };
                if o.y + t * d.y > apex {
                    None
                } else {
                    Some(t)
                }
            }
            Shape3D::Cylinder {
                center,
                radius,
                height,
            } => {
                let top = center.y + height;
                let dx = o.x - center.x;
                let dz = o.z - center.z;
                let roots = solve_quadratic(
                    d.x * d.x + d.z * d.z,
                    2.0 * (d.x * dx + d.z * dz),
                    dx * dx + dz * dz - radius * radius,
                );
                let (t1, t2) = match roots.as_slice() {
                    [t1, t2] => (*t1, *t2),
                    _ => return None,
                };
                let y1 = o.y + t1 * d.y;
                let y2 = o.y + t2 * d.y;
                if y1 > top && y2 < top {
                    // enters through the cap
                    let t_cap = (top - o.y) / d.y;
                    return if t_cap >= EPS { Some(t_cap) } else { None };
                }
                [(t1, y1), (t2, y2)]
                    .into_iter()
                    .filter(|(_, y)| *y >= center.y && *y <= top)
                    .map(|(t, _)| t)
                    .filter(|t| *t >= EPS)
                    .reduce(Fp::min)
            }
        }
    }

    /// Outward unit normal. `point` must lie on the surface.
    pub fn normal(&self, point: &Vec3f) -> Vec3f {
        match self {
            Shape3D::Sphere { center, radius } => ((point - center) / *radius).normalize(),
            Shape3D::Plane { norm, .. } => *norm,
            Shape3D::Cone {
                center,
                radius,
                height,
            } => {
                let n = point - center;
                let theta = (radius / height).atan();
                let alpha = n.x.atan2(n.z);
                Vec3f::new(
                    alpha.sin() * theta.cos(),
                    theta.sin(),
                    alpha.cos() * theta.cos(),
                )
            }
            Shape3D::Cylinder {
                center,
                radius,
                height,
            } => {
                let n = point - center;
                if (n.y - height).abs() < EPS {
                    Vec3f::y()
                } else {
                    Vec3f::new(n.x / radius, 0.0, n.z / radius)
                }
            }
        }
    }

    /// Whether a point of the supporting plane lies inside the quadrilateral.
    /// Always true for the other shapes.
    fn contains(&self, q: &Vec3f) -> bool {
        match self {
            Shape3D::Plane { a, b, c, d, norm } => [(a, b), (b, c), (c, d), (d, a)]
                .into_iter()
                .all(|(start, end)| (end - start).cross(&(q - start)).dot(norm) > 0.0),
            _ => true,
        }
    }
}

pub fn get_reflection_ray(ray: &Vec3f, normal: &Vec3f) -> Vec3f {
    let projection = -ray.dot(normal);
    ray + normal * projection * 2.0
}

/// Snell refraction of a unit `incident` about `normal` with the ratio `eta = n1 / n2`.
/// `None` on total internal reflection.
pub fn get_refraction_ray(incident: &Vec3f, normal: &Vec3f, eta: Fp) -> Option<Vec3f> {
    let cos_i = normal.dot(incident);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        None
    } else {
        Some(incident * eta - normal * (eta * cos_i + k.sqrt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Fp, b: Fp) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    fn unit_square_floor() -> Shape3D {
        Shape3D::plane(
            Vec3f::new(-1.0, -1.0, -1.0),
            Vec3f::new(1.0, -1.0, -1.0),
            Vec3f::new(1.0, -1.0, -3.0),
            Vec3f::new(-1.0, -1.0, -3.0),
        )
    }

    #[test]
    fn sphere_returns_near_root() {
        let sphere = Shape3D::Sphere {
            center: Vec3f::new(0.0, 0.0, -100.0),
            radius: 10.0,
        };
        let ray = Ray::new(Vec3f::zeros(), Vec3f::new(0.0, 0.0, -1.0));
        assert_close(sphere.intersect(&ray).unwrap(), 90.0);
    }

    #[test]
    fn sphere_missed_when_closest_approach_exceeds_radius() {
        let sphere = Shape3D::Sphere {
            center: Vec3f::new(0.0, 0.0, -100.0),
            radius: 10.0,
        };
        let ray = Ray::new(Vec3f::new(10.5, 0.0, 0.0), Vec3f::new(0.0, 0.0, -1.0));
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn sphere_from_inside_returns_far_root() {
        let sphere = Shape3D::Sphere {
            center: Vec3f::new(0.0, 0.0, -10.0),
            radius: 2.0,
        };
        let ray = Ray::new(Vec3f::new(0.0, 0.0, -10.0), Vec3f::new(1.0, 0.0, 0.0));
        assert_close(sphere.intersect(&ray).unwrap(), 2.0);
    }

    #[test]
    fn sphere_ignores_start_point_on_surface() {
        let sphere = Shape3D::Sphere {
            center: Vec3f::new(0.0, 0.0, -10.0),
            radius: 2.0,
        };
        let ray = Ray::new(Vec3f::new(0.0, 0.0, -8.0), Vec3f::new(0.0, 0.0, 1.0));
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn plane_hit_inside_quad() {
        let plane = unit_square_floor();
        let ray = Ray::new(Vec3f::zeros(), Vec3f::new(0.0, -1.0, -2.0));
        let t = plane.intersect(&ray).unwrap();
        let p = ray.at(t);
        assert_close(p.y, -1.0);
        assert_close(p.z, -2.0);
        assert_eq!(plane.normal(&p), Vec3f::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn plane_hit_outside_quad_is_a_miss() {
        let plane = unit_square_floor();
        // would meet the infinite plane at z = -10
        let ray = Ray::new(Vec3f::zeros(), Vec3f::new(0.0, -1.0, -10.0));
        assert!(plane.intersect(&ray).is_none());
    }

    #[test]
    fn plane_parallel_ray_is_a_miss() {
        let plane = unit_square_floor();
        let ray = Ray::new(Vec3f::new(0.0, -1.0, 0.0), Vec3f::new(0.0, 0.0, -1.0));
        assert!(plane.intersect(&ray).is_none());
    }

    #[test]
    fn cylinder_reports_cap_distance() {
        let cylinder = Shape3D::Cylinder {
            center: Vec3f::new(0.0, -8.0, -73.0),
            radius: 2.0,
            height: 3.0,
        };
        let target = Vec3f::new(0.5, -5.0, -73.0);
        let ray = Ray::new(Vec3f::zeros(), target);
        let t = cylinder.intersect(&ray).unwrap();
        assert_close(t, target.norm());
        let p = ray.at(t);
        assert_close(p.y, -5.0);
        assert_eq!(cylinder.normal(&p), Vec3f::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn cylinder_side_hit_within_span() {
        let cylinder = Shape3D::Cylinder {
            center: Vec3f::new(0.0, -8.0, -73.0),
            radius: 2.0,
            height: 3.0,
        };
        let ray = Ray::new(Vec3f::new(0.0, -6.5, 0.0), Vec3f::new(0.0, 0.0, -1.0));
        let t = cylinder.intersect(&ray).unwrap();
        assert_close(t, 71.0);
        let n = cylinder.normal(&ray.at(t));
        assert!((n - Vec3f::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn cylinder_below_base_is_a_miss() {
        let cylinder = Shape3D::Cylinder {
            center: Vec3f::new(0.0, -8.0, -73.0),
            radius: 2.0,
            height: 3.0,
        };
        let ray = Ray::new(Vec3f::new(0.0, -9.0, 0.0), Vec3f::new(0.0, 0.0, -1.0));
        assert!(cylinder.intersect(&ray).is_none());
    }

    #[test]
    fn cylinder_axis_parallel_ray_is_degenerate() {
        let cylinder = Shape3D::Cylinder {
            center: Vec3f::new(0.0, -8.0, -73.0),
            radius: 2.0,
            height: 3.0,
        };
        let ray = Ray::new(Vec3f::new(0.0, 10.0, -73.0), Vec3f::new(0.0, -1.0, 0.0));
        assert!(cylinder.intersect(&ray).is_none());
    }

    #[test]
    fn cone_hit_below_apex() {
        let cone = Shape3D::Cone {
            center: Vec3f::new(0.0, -18.0, -90.0),
            radius: 5.0,
            height: 10.0,
        };
        // half way up the radius is 2.5
        let ray = Ray::new(Vec3f::new(0.0, -13.0, 0.0), Vec3f::new(0.0, 0.0, -1.0));
        let t = cone.intersect(&ray).unwrap();
        assert_close(t, 87.5);
        let n = cone.normal(&ray.at(t));
        assert_close(n.norm(), 1.0);
        assert!(n.z > 0.0 && n.y > 0.0);
    }

    #[test]
    fn cone_above_apex_is_a_miss() {
        let cone = Shape3D::Cone {
            center: Vec3f::new(0.0, -18.0, -90.0),
            radius: 5.0,
            height: 10.0,
        };
        let ray = Ray::new(Vec3f::new(0.0, -3.0, 0.0), Vec3f::new(0.0, 0.0, -1.0));
        assert!(cone.intersect(&ray).is_none());
    }

    #[test]
    fn reflection_mirrors_about_normal() {
        let r = get_reflection_ray(&Vec3f::new(1.0, -1.0, 0.0), &Vec3f::y());
        assert_eq!(r, Vec3f::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn refraction_through_slab_is_reversible() {
        let eta = 1.5;
        let incident = Vec3f::new(0.3, -1.0, 0.2).normalize();
        let entry_normal = Vec3f::y();
        let inside = get_refraction_ray(&incident, &entry_normal, 1.0 / eta).unwrap();
        // exit face of the slab has the normal -y, refraction uses its reverse
        let exit_normal = -Vec3f::y();
        let out = get_refraction_ray(&inside, &-exit_normal, eta).unwrap();
        assert!((out - incident).norm() < 1e-9);
    }

    #[test]
    fn refraction_total_internal_reflection() {
        let incident = Vec3f::new(0.9, -0.1, 0.0).normalize();
        assert!(get_refraction_ray(&incident, &Vec3f::y(), 1.5).is_none());
    }
}
