//! Bounding primitives.
//!
//! [`TVec3`], [`BVec3`], [`Aabb`]

use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
};

use num::{cast, Float, FromPrimitive};

use crate::TreeError;

/// Floating point type the geometry is computed with.
///
/// Implemented for `f32` and `f64`.
pub trait Real: Float + FromPrimitive + Display + Debug + Default + Send + Sync + 'static {
    /// Converts a literal into `Self`.
    #[inline]
    fn lit(value: f64) -> Self {
        cast(value).unwrap()
    }

    #[inline]
    fn half() -> Self {
        Self::lit(0.5)
    }

    #[inline]
    fn two() -> Self {
        Self::lit(2.0)
    }
}
impl Real for f32 {}
impl Real for f64 {}

/// Tree Vec3
///
/// Inner type should be any [`Real`]: `f32` or `f64`.
#[derive(Default, Debug, PartialEq, PartialOrd, Clone, Copy)]
pub struct TVec3<R: Real> {
    pub x: R,
    pub y: R,
    pub z: R,
}

impl<R: Real> Add for TVec3<R> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        TVec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl<R: Real> Sub for TVec3<R> {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        TVec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl<R: Real> Mul<R> for TVec3<R> {
    type Output = Self;

    fn mul(self, s: R) -> Self {
        TVec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }
}

impl<R: Real> Div<R> for TVec3<R> {
    type Output = Self;

    fn div(self, s: R) -> Self {
        TVec3 {
            x: self.x / s,
            y: self.y / s,
            z: self.z / s,
        }
    }
}

impl<R: Real> Neg for TVec3<R> {
    type Output = Self;

    fn neg(self) -> Self {
        TVec3 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl<R: Real> AddAssign for TVec3<R> {
    fn add_assign(&mut self, other: Self) {
        self.x = self.x + other.x;
        self.y = self.y + other.y;
        self.z = self.z + other.z;
    }
}

impl<R: Real> SubAssign for TVec3<R> {
    fn sub_assign(&mut self, other: Self) {
        self.x = self.x - other.x;
        self.y = self.y - other.y;
        self.z = self.z - other.z;
    }
}

impl<R: Real> Display for TVec3<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vec3: x: {}, y: {}, z: {}", self.x, self.y, self.z)
    }
}

impl<R: Real> TVec3<R> {
    pub fn new(x: R, y: R, z: R) -> Self {
        TVec3 { x, y, z }
    }

    pub fn splat(v: R) -> Self {
        TVec3 { x: v, y: v, z: v }
    }

    pub fn zero() -> Self {
        Self::splat(R::zero())
    }

    pub fn unit_x() -> Self {
        TVec3::new(R::one(), R::zero(), R::zero())
    }

    pub fn unit_y() -> Self {
        TVec3::new(R::zero(), R::one(), R::zero())
    }

    pub fn unit_z() -> Self {
        TVec3::new(R::zero(), R::zero(), R::one())
    }

    #[inline]
    pub fn dot(&self, other: Self) -> R {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: Self) -> Self {
        TVec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    #[inline]
    pub fn length_squared(&self) -> R {
        self.dot(*self)
    }

    #[inline]
    pub fn length(&self) -> R {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector, or `None` for a zero or non finite vector.
    pub fn normalize(&self) -> Option<Self> {
        let len = self.length();
        if len > R::zero() && len.is_finite() {
            Some(*self / len)
        } else {
            None
        }
    }

    pub fn min(&self, other: Self) -> Self {
        TVec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(&self, other: Self) -> Self {
        TVec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn abs(&self) -> Self {
        TVec3::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    pub fn max_element(&self) -> R {
        self.x.max(self.y).max(self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Component-wise clamp into `[min, max]`.
    pub fn clamp(&self, min: Self, max: Self) -> Self {
        self.max(min).min(max)
    }

    pub fn lt(&self, other: Self) -> BVec3 {
        BVec3::new(self.x < other.x, self.y < other.y, self.z < other.z)
    }

    pub fn gt(&self, other: Self) -> BVec3 {
        BVec3::new(self.x > other.x, self.y > other.y, self.z > other.z)
    }

    pub fn le(&self, other: Self) -> BVec3 {
        BVec3::new(self.x <= other.x, self.y <= other.y, self.z <= other.z)
    }

    pub fn ge(&self, other: Self) -> BVec3 {
        BVec3::new(self.x >= other.x, self.y >= other.y, self.z >= other.z)
    }
}

/// Boolean Vec3 mask.
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct BVec3 {
    x: bool,
    y: bool,
    z: bool,
}

impl BVec3 {
    fn new(x: bool, y: bool, z: bool) -> Self {
        BVec3 { x, y, z }
    }

    pub fn all(&self) -> bool {
        self.x && self.y && self.z
    }

    pub fn any(&self) -> bool {
        self.x || self.y || self.z
    }

    pub fn none(&self) -> bool {
        !self.x && !self.y && !self.z
    }
}

/// Axis Aligned Bounding Box
///
/// Closed box: points on the faces are inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<R: Real> {
    pub min: TVec3<R>,
    pub max: TVec3<R>,
}

impl<R: Real> Default for Aabb<R> {
    fn default() -> Self {
        Self {
            min: TVec3::zero(),
            max: TVec3::splat(R::one()),
        }
    }
}

impl<R: Real> Display for Aabb<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aabb(min: {}, max: {})", self.min, self.max)
    }
}

impl<R: Real> Aabb<R> {
    /// Creates a new cubic [`Aabb`] object without any checks
    pub fn new_unchecked(center: TVec3<R>, half_size: R) -> Self {
        let half = TVec3::splat(half_size);
        Aabb {
            min: center - half,
            max: center + half,
        }
    }

    /// Creates a new cubic [`Aabb`] object
    ///
    /// Checks that the center is finite and the half size is positive.
    pub fn new(center: TVec3<R>, half_size: R) -> Result<Self, TreeError> {
        if !center.is_finite() || !half_size.is_finite() {
            Err(TreeError::InvalidGeometry(format!(
                "Non finite aabb. Center: {center}, half size: {half_size}"
            )))
        } else if half_size <= R::zero() {
            Err(TreeError::InvalidGeometry(format!(
                "Aabb half size should be positive: {half_size}"
            )))
        } else {
            Ok(Self::new_unchecked(center, half_size))
        }
    }

    /// Creates a new [`Aabb`] object from a min and max
    pub fn from_min_max(min: TVec3<R>, max: TVec3<R>) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> TVec3<R> {
        (self.min + self.max) * R::half()
    }

    pub fn half_extent(&self) -> TVec3<R> {
        (self.max - self.min) * R::half()
    }

    pub fn size(&self) -> TVec3<R> {
        self.max - self.min
    }

    /// Child box of octant `i`: bit 0 selects +x, bit 1 +y, bit 2 +z.
    #[inline]
    pub fn octant(&self, i: usize) -> Aabb<R> {
        let center = self.center();
        let x_mask = (i & 0b1) != 0;
        let y_mask = (i & 0b10) != 0;
        let z_mask = (i & 0b100) != 0;

        Aabb {
            min: TVec3::new(
                if x_mask { center.x } else { self.min.x },
                if y_mask { center.y } else { self.min.y },
                if z_mask { center.z } else { self.min.z },
            ),
            max: TVec3::new(
                if x_mask { self.max.x } else { center.x },
                if y_mask { self.max.y } else { center.y },
                if z_mask { self.max.z } else { center.z },
            ),
        }
    }

    /// Checks if the aabb contains a point. Faces are inclusive.
    pub fn contains(&self, position: TVec3<R>) -> bool {
        self.min.le(position).all() && self.max.ge(position).all()
    }

    /// Checks if this aabb fully contains another one.
    pub fn encloses(&self, other: &Aabb<R>) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Checks if this volume overlaps with another [`Aabb`].
    ///
    /// Touching boxes overlap.
    pub fn overlaps(&self, other: &Aabb<R>) -> bool {
        self.max.x.min(other.max.x) >= self.min.x.max(other.min.x)
            && self.max.y.min(other.max.y) >= self.min.y.max(other.min.y)
            && self.max.z.min(other.max.z) >= self.min.z.max(other.min.z)
    }

    /// Point of the box closest to `point`.
    #[inline]
    pub fn closest_point(&self, point: TVec3<R>) -> TVec3<R> {
        point.clamp(self.min, self.max)
    }

    #[inline]
    pub fn distance_squared(&self, point: TVec3<R>) -> R {
        (self.closest_point(point) - point).length_squared()
    }

    /// Box corner furthest along `direction`.
    #[inline]
    pub fn support(&self, direction: TVec3<R>) -> TVec3<R> {
        TVec3::new(
            if direction.x >= R::zero() { self.max.x } else { self.min.x },
            if direction.y >= R::zero() { self.max.y } else { self.min.y },
            if direction.z >= R::zero() { self.max.z } else { self.min.z },
        )
    }

    /// Grows the box so it includes `point`.
    pub fn expand(&mut self, point: TVec3<R>) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Smallest cube with the same center enclosing this box.
    pub fn bounding_cube(&self) -> Aabb<R> {
        let half = self.half_extent().max_element();
        Aabb::new_unchecked(self.center(), half)
    }
}

#[cfg(test)]
mod tests {
    use super::{Aabb, TVec3};

    #[test]
    fn test_aabb_contains() {
        let aabb = Aabb::new_unchecked(TVec3::splat(8.0), 8.0f32);
        assert!(aabb.contains(TVec3::zero()));
        assert!(aabb.contains(TVec3::splat(8.0)));
        assert!(aabb.contains(TVec3::splat(16.0)));
        assert!(!aabb.contains(TVec3::new(0.0, 16.5, 8.0)));
    }

    #[test]
    fn test_aabb_constructor() {
        assert!(Aabb::new(TVec3::splat(2.0f64), 2.0).is_ok());
        assert!(Aabb::new(TVec3::splat(2.0f64), 0.0).is_err());
        assert!(Aabb::new(TVec3::splat(2.0f64), -1.0).is_err());
        assert!(Aabb::new(TVec3::new(f64::NAN, 0.0, 0.0), 1.0).is_err());
        assert!(Aabb::new(TVec3::splat(0.0), f64::INFINITY).is_err());
    }

    #[test]
    fn test_octants() {
        let aabb = Aabb::from_min_max(TVec3::zero(), TVec3::splat(2.0f64));
        assert_eq!(
            aabb.octant(0),
            Aabb::from_min_max(TVec3::zero(), TVec3::splat(1.0))
        );
        assert_eq!(
            aabb.octant(0b101),
            Aabb::from_min_max(TVec3::new(1.0, 0.0, 1.0), TVec3::new(2.0, 1.0, 2.0))
        );
        for i in 0..8 {
            assert!(aabb.encloses(&aabb.octant(i)));
        }
    }

    #[test]
    fn test_overlap_touching() {
        let a = Aabb::from_min_max(TVec3::zero(), TVec3::splat(1.0f32));
        let b = Aabb::from_min_max(TVec3::new(1.0, 0.0, 0.0), TVec3::new(2.0, 1.0, 1.0));
        let c = Aabb::from_min_max(TVec3::new(1.5, 0.0, 0.0), TVec3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_closest_point() {
        let aabb = Aabb::from_min_max(TVec3::zero(), TVec3::splat(1.0f64));
        assert_eq!(aabb.distance_squared(TVec3::splat(0.5)), 0.0);
        assert_eq!(aabb.distance_squared(TVec3::new(3.0, 0.5, 0.5)), 4.0);
        assert_eq!(aabb.distance_squared(TVec3::new(2.0, 2.0, 0.5)), 2.0);
    }

    #[test]
    fn test_vector_ops() {
        let x = TVec3::<f64>::unit_x();
        let y = TVec3::<f64>::unit_y();
        assert_eq!(x.cross(y), TVec3::unit_z());
        assert_eq!(x.dot(y), 0.0);
        assert_eq!(TVec3::new(3.0, 4.0, 0.0f64).length(), 5.0);
        assert!(TVec3::<f32>::zero().normalize().is_none());
    }
}
