//! GJK distance test for convex volumes given by support mappings.
//!
//! Works on the Minkowski difference `a - b`, whose distance to the origin is
//! the distance between the volumes. Each iteration moves `v`, the point of
//! the current simplex closest to the origin, closer to the origin, while the
//! support point along `-v` gives a lower bound of the distance. The volumes
//! are reported apart only once that lower bound exceeds `tolerance`; every
//! undecided case counts as an intersection.

use crate::bounding::{Aabb, Real, TVec3};

const MAX_ITERATIONS: usize = 64;

/// Convex volume described by its support mapping.
pub(crate) trait Support<R: Real> {
    /// Point of the volume furthest along `direction`.
    fn support(&self, direction: TVec3<R>) -> TVec3<R>;
}

impl<R: Real> Support<R> for Aabb<R> {
    #[inline]
    fn support(&self, direction: TVec3<R>) -> TVec3<R> {
        Aabb::support(self, direction)
    }
}

#[derive(Clone, Copy)]
struct Simplex<R: Real> {
    points: [TVec3<R>; 4],
    len: usize,
}

impl<R: Real> Simplex<R> {
    fn of(points: &[TVec3<R>]) -> Self {
        let mut simplex = Simplex {
            points: [TVec3::zero(); 4],
            len: points.len(),
        };
        simplex.points[..points.len()].copy_from_slice(points);
        simplex
    }

    fn push(&mut self, point: TVec3<R>) {
        self.points[self.len] = point;
        self.len += 1;
    }

    /// Point of the simplex closest to the origin, with the smallest sub
    /// simplex containing it.
    fn closest(&self) -> (TVec3<R>, Simplex<R>) {
        let p = &self.points;
        match self.len {
            1 => (p[0], *self),
            2 => segment(p[0], p[1]),
            3 => triangle(p[0], p[1], p[2]),
            _ => tetrahedron(p[0], p[1], p[2], p[3]),
        }
    }
}

/// Whether `a` and `b` intersect, treating touching volumes as intersecting.
///
/// `direction` roughly points from `b` towards `a` and only seeds the search.
pub(crate) fn intersects<R, A, B>(a: &A, b: &B, direction: TVec3<R>, tolerance: R) -> bool
where
    R: Real,
    A: Support<R>,
    B: Support<R>,
{
    let support = |d: TVec3<R>| a.support(d) - b.support(-d);
    let converged = R::epsilon() * R::lit(128.0);

    let seed = if direction.length_squared() > R::zero() {
        direction
    } else {
        TVec3::unit_x()
    };
    let mut v = support(-seed);
    let mut simplex = Simplex::of(&[v]);

    for _ in 0..MAX_ITERATIONS {
        let vv = v.length_squared();
        if vv <= tolerance * tolerance {
            return true;
        }

        // every point p of a - b has p . v >= w . v
        let w = support(-v);
        let vw = v.dot(w);
        if vw > tolerance * vv.sqrt() {
            return false;
        }
        if vv - vw <= converged * vv {
            // v is as close as it gets and within tolerance
            return true;
        }

        simplex.push(w);
        let (closest, reduced) = simplex.closest();
        if reduced.len == 4 {
            // origin enclosed
            return true;
        }
        if !(closest.length_squared() < vv) {
            return true;
        }
        simplex = reduced;
        v = closest;
    }

    true
}

fn segment<R: Real>(a: TVec3<R>, b: TVec3<R>) -> (TVec3<R>, Simplex<R>) {
    let ab = b - a;
    let denom = ab.length_squared();
    if !(denom > R::zero()) {
        return (a, Simplex::of(&[a]));
    }

    let t = -a.dot(ab) / denom;
    if t <= R::zero() {
        (a, Simplex::of(&[a]))
    } else if t >= R::one() {
        (b, Simplex::of(&[b]))
    } else {
        (a + ab * t, Simplex::of(&[a, b]))
    }
}

fn nearest<R: Real>(
    candidates: impl IntoIterator<Item = (TVec3<R>, Simplex<R>)>,
) -> Option<(TVec3<R>, Simplex<R>)> {
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(b) if b.0.length_squared() <= candidate.0.length_squared() => Some(b),
        _ => Some(candidate),
    })
}

/// Closest point by Voronoi regions of the vertices, edges and face.
fn triangle<R: Real>(a: TVec3<R>, b: TVec3<R>, c: TVec3<R>) -> (TVec3<R>, Simplex<R>) {
    let ab = b - a;
    let ac = c - a;

    let d1 = -ab.dot(a);
    let d2 = -ac.dot(a);
    if d1 <= R::zero() && d2 <= R::zero() {
        return (a, Simplex::of(&[a]));
    }

    let d3 = -ab.dot(b);
    let d4 = -ac.dot(b);
    if d3 >= R::zero() && d4 <= d3 {
        return (b, Simplex::of(&[b]));
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= R::zero() && d1 >= R::zero() && d3 <= R::zero() {
        return (a + ab * (d1 / (d1 - d3)), Simplex::of(&[a, b]));
    }

    let d5 = -ab.dot(c);
    let d6 = -ac.dot(c);
    if d6 >= R::zero() && d5 <= d6 {
        return (c, Simplex::of(&[c]));
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= R::zero() && d2 >= R::zero() && d6 <= R::zero() {
        return (a + ac * (d2 / (d2 - d6)), Simplex::of(&[a, c]));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= R::zero() && d4 - d3 >= R::zero() && d5 - d6 >= R::zero() {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * t, Simplex::of(&[b, c]));
    }

    let denom = va + vb + vc;
    if !(denom > R::zero()) {
        // collinear corners
        return nearest([segment(a, b), segment(a, c), segment(b, c)])
            .unwrap_or((a, Simplex::of(&[a])));
    }
    (
        a + ab * (vb / denom) + ac * (vc / denom),
        Simplex::of(&[a, b, c]),
    )
}

/// Closest point over the faces the origin lies outside of.
fn tetrahedron<R: Real>(
    a: TVec3<R>,
    b: TVec3<R>,
    c: TVec3<R>,
    d: TVec3<R>,
) -> (TVec3<R>, Simplex<R>) {
    let volume = (b - a).dot((c - a).cross(d - a));
    let scale = (b - a).length() * (c - a).length() * (d - a).length();
    let flat = !(volume.abs() > R::epsilon() * scale);

    // each face with the vertex opposite to it
    let faces = [(a, b, c, d), (a, c, d, b), (a, d, b, c), (b, d, c, a)];
    let outside = faces.into_iter().filter(|&(p, q, r, opposite)| {
        let normal = (q - p).cross(r - p);
        flat || (-p).dot(normal) * (opposite - p).dot(normal) < R::zero()
    });

    nearest(outside.map(|(p, q, r, _)| triangle(p, q, r)))
        .unwrap_or((TVec3::zero(), Simplex::of(&[a, b, c, d])))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ball {
        center: TVec3<f64>,
        radius: f64,
    }

    impl Support<f64> for Ball {
        fn support(&self, direction: TVec3<f64>) -> TVec3<f64> {
            match direction.normalize() {
                Some(n) => self.center + n * self.radius,
                None => self.center,
            }
        }
    }

    fn unit_box(min: TVec3<f64>) -> Aabb<f64> {
        Aabb::from_min_max(min, min + TVec3::splat(1.0))
    }

    #[test]
    fn test_boxes() {
        let a = unit_box(TVec3::zero());
        let tol = 1e-9;
        assert!(intersects(&a, &unit_box(TVec3::splat(0.5)), TVec3::unit_x(), tol));
        assert!(!intersects(&a, &unit_box(TVec3::new(1.5, 0.2, 0.2)), TVec3::unit_x(), tol));
        assert!(!intersects(&a, &unit_box(TVec3::splat(-1.2)), TVec3::unit_y(), tol));
        // shared face, edge and corner
        assert!(intersects(&a, &unit_box(TVec3::new(1.0, 0.0, 0.0)), TVec3::unit_z(), tol));
        assert!(intersects(&a, &unit_box(TVec3::new(1.0, 1.0, 0.0)), TVec3::unit_x(), tol));
        assert!(intersects(&a, &unit_box(TVec3::splat(1.0)), TVec3::unit_x(), tol));
        assert!(!intersects(&a, &unit_box(TVec3::new(1.0 + 1e-6, 1.0, 1.0)), TVec3::unit_x(), tol));
        // contained
        let inner = Aabb::from_min_max(TVec3::splat(0.25), TVec3::splat(0.75));
        assert!(intersects(&a, &inner, TVec3::zero(), tol));
    }

    #[test]
    fn test_ball_against_box() {
        let a = unit_box(TVec3::zero());
        let near = Ball {
            center: TVec3::new(2.0, 0.5, 0.5),
            radius: 1.1,
        };
        let far = Ball {
            center: TVec3::new(2.0, 2.0, 2.0),
            radius: 1.0,
        };
        let corner = Ball {
            center: TVec3::new(1.6, 1.6, 1.6),
            radius: 1.0,
        };
        assert!(intersects(&a, &near, TVec3::unit_x(), 1e-9));
        assert!(!intersects(&a, &far, TVec3::unit_x(), 1e-9));
        // distance to the corner is sqrt(3 * 0.36) > 1
        assert!(!intersects(&a, &corner, TVec3::unit_y(), 1e-9));
    }

    #[test]
    fn test_closest_on_simplex() {
        let (point, simplex) = triangle(
            TVec3::new(-1.0f64, -1.0, 2.0),
            TVec3::new(1.0, -1.0, 2.0),
            TVec3::new(0.0, 1.0, 2.0),
        );
        assert_eq!(point, TVec3::new(0.0, 0.0, 2.0));
        assert_eq!(simplex.len, 3);

        // collinear corners
        let (point, simplex) = triangle(
            TVec3::new(-1.0f64, 1.0, 0.0),
            TVec3::new(1.0, 1.0, 0.0),
            TVec3::new(3.0, 1.0, 0.0),
        );
        assert_eq!(point, TVec3::new(0.0, 1.0, 0.0));
        assert_eq!(simplex.len, 2);

        // a flat tetrahedron never encloses the origin
        let (point, simplex) = tetrahedron(
            TVec3::new(-1.0f64, -1.0, 0.5),
            TVec3::new(1.0, -1.0, 0.5),
            TVec3::new(0.0, 1.0, 0.5),
            TVec3::new(0.0, 0.0, 0.5),
        );
        assert!((point.length() - 0.5).abs() < 1e-12);
        assert!(simplex.len < 4);

        let (point, simplex) = tetrahedron(
            TVec3::new(-1.0f64, -1.0, -1.0),
            TVec3::new(1.0, -1.0, -1.0),
            TVec3::new(0.0, 1.0, -1.0),
            TVec3::new(0.0, 0.0, 1.0),
        );
        assert_eq!(point, TVec3::zero());
        assert_eq!(simplex.len, 4);
    }
}
