use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box, stored as one [`Interval`] per axis.
///
/// A box built with [`Aabb::EMPTY`] is "unset": it contains nothing and acts as
/// the identity for [`Aabb::surrounding`]. Boxes built from points are padded so
/// no axis is thinner than [`Aabb::MIN_EXTENT`], which keeps flat primitives
/// (axis-aligned triangles) hittable by the slab test.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    pub const MIN_EXTENT: f32 = 0.0001;

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };

    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Box spanning two opposite corners, in any order.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self::new(
            Interval::new(a.x.min(b.x), a.x.max(b.x)),
            Interval::new(a.y.min(b.y), a.y.max(b.y)),
            Interval::new(a.z.min(b.z), a.z.max(b.z)),
        )
    }

    /// Smallest box enclosing every point in `points`. Empty input gives [`Aabb::EMPTY`].
    pub fn enclosing<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::EMPTY;
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Self::from_points(min, max)
    }

    /// Per-axis union of two boxes.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Interval for axis `n` (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// A box is valid once every axis satisfies `min <= max`.
    pub fn is_valid(&self) -> bool {
        !self.x.is_empty() && !self.y.is_empty() && !self.z.is_empty()
    }

    /// `2 * (xy + xz + yz)` of the extents; zero for an unset box.
    pub fn surface_area(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let (dx, dy, dz) = (self.x.size(), self.y.size(), self.z.size());
        2.0 * (dx * dy + dx * dz + dy * dz)
    }

    /// True when the boxes overlap on all three axes.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x.overlaps(&other.x) && self.y.overlaps(&other.y) && self.z.overlaps(&other.z)
    }

    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.x.contains_interval(&other.x)
            && self.y.contains_interval(&other.y)
            && self.z.contains_interval(&other.z)
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Slab test against `ray_t`.
    ///
    /// Zero direction components produce infinite slab distances, which the
    /// interval intersection handles without special casing. NaN slab bounds
    /// (origin exactly on a slab plane of a parallel ray) leave the running
    /// interval untouched because `f32::max`/`f32::min` ignore NaN.
    pub fn hit(&self, r: &Ray, mut ray_t: Interval) -> bool {
        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let inv_d = 1.0 / r.direction[axis];
            let origin = r.origin[axis];

            let mut t0 = (slab.min - origin) * inv_d;
            let mut t1 = (slab.max - origin) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max <= ray_t.min {
                return false;
            }
        }
        true
    }

    /// Returns a copy grown by `delta` on every axis (`delta / 2` per side).
    pub fn padded(&self, delta: f32) -> Aabb {
        Aabb {
            x: self.x.expand(delta),
            y: self.y.expand(delta),
            z: self.z.expand(delta),
        }
    }

    fn pad_to_minimums(&mut self) {
        let delta = Self::MIN_EXTENT;
        if self.x.size() < delta {
            self.x = self.x.expand(delta);
        }
        if self.y.size() < delta {
            self.y = self.y.expand(delta);
        }
        if self.z.size() < delta {
            self.z = self.z.expand(delta);
        }
    }

    /// Index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Slab test evaluated in f64 with explicit handling of parallel rays.
    fn reference_hit(aabb: &Aabb, r: &Ray, t_min: f64, t_max: f64) -> bool {
        let mut lo = t_min;
        let mut hi = t_max;
        for axis in 0..3 {
            let slab = aabb.axis_interval(axis);
            let (smin, smax) = (slab.min as f64, slab.max as f64);
            let o = r.origin[axis] as f64;
            let d = r.direction[axis] as f64;
            if d == 0.0 {
                if o < smin || o > smax {
                    return false;
                }
                continue;
            }
            let (mut t0, mut t1) = ((smin - o) / d, (smax - o) / d);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            lo = lo.max(t0);
            hi = hi.min(t1);
            if hi <= lo {
                return false;
            }
        }
        true
    }

    fn unit_box() -> Aabb {
        Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_aabb_from_points_any_order() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(aabb.min(), Vec3::ZERO);
        assert_eq!(aabb.max(), Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_flat_box_is_padded() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        assert!(aabb.z.size() >= Aabb::MIN_EXTENT);
        assert!(aabb.z.contains(0.0));
    }

    #[test]
    fn test_aabb_surface_area() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        assert!((aabb.surface_area() - 22.0).abs() < 1e-5);
        assert_eq!(Aabb::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn test_aabb_overlaps() {
        let a = Aabb::from_points(Vec3::ZERO, Vec3::splat(2.0));
        let b = Aabb::from_points(Vec3::splat(1.0), Vec3::splat(3.0));
        let c = Aabb::from_points(Vec3::new(1.0, 1.0, 5.0), Vec3::new(3.0, 3.0, 6.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Overlaps on x and y but not z
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_surrounding_is_tight_union() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut random_box = || {
                let a = Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
                let b = a + Vec3::new(rng.gen_range(0.1..3.0), rng.gen_range(0.1..3.0), rng.gen_range(0.1..3.0));
                Aabb::from_points(a, b)
            };
            let a = random_box();
            let b = random_box();
            let union = Aabb::surrounding(&a, &b);

            assert!(union.contains_box(&a));
            assert!(union.contains_box(&b));
            // Each face of the union touches one of the inputs
            for axis in 0..3 {
                let (ia, ib, iu) = (a.axis_interval(axis), b.axis_interval(axis), union.axis_interval(axis));
                assert_eq!(iu.min, ia.min.min(ib.min));
                assert_eq!(iu.max, ia.max.max(ib.max));
            }
        }
    }

    #[test]
    fn test_surrounding_with_empty_is_identity() {
        let a = unit_box();
        assert_eq!(Aabb::surrounding(&a, &Aabb::EMPTY), a);
        assert_eq!(Aabb::surrounding(&Aabb::EMPTY, &a), a);
        assert!(!Aabb::EMPTY.is_valid());
    }

    #[test]
    fn test_hit_basic() {
        let aabb = unit_box();
        let toward = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let away = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z);
        let beside = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);

        assert!(aabb.hit(&toward, Interval::new(0.0, 100.0)));
        assert!(!aabb.hit(&away, Interval::new(0.0, 100.0)));
        assert!(!aabb.hit(&beside, Interval::new(0.0, 100.0)));
        // Box lies beyond the allowed range
        assert!(!aabb.hit(&toward, Interval::new(0.0, 3.0)));
    }

    #[test]
    fn test_hit_edge_cases_match_reference() {
        let aabb = unit_box();
        let cases = [
            // Parallel to the x faces, inside the x slab
            Ray::new(Vec3::new(0.5, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0)),
            // Parallel to the x faces, outside the x slab
            Ray::new(Vec3::new(1.5, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0)),
            // Origin inside the box
            Ray::new(Vec3::new(0.1, -0.2, 0.3), Vec3::new(0.3, 0.9, -0.1)),
            Ray::new(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0)),
            // Narrow misses just past a corner
            Ray::new(Vec3::new(-5.0, 1.001, 0.0), Vec3::new(1.0, 0.0, 0.0)),
            Ray::new(Vec3::new(-5.0, -5.0, 0.0), Vec3::new(1.0, 0.6665, 0.0)),
            // Narrow hit just inside a corner
            Ray::new(Vec3::new(-5.0, 0.999, 0.0), Vec3::new(1.0, 0.0, 0.0)),
            // Diagonal through the middle
            Ray::new(Vec3::splat(-3.0), Vec3::splat(1.0)),
            // Pointing away from behind
            Ray::new(Vec3::splat(3.0), Vec3::splat(1.0)),
        ];

        for ray in &cases {
            let expected = reference_hit(&aabb, ray, 0.0, 100.0);
            assert_eq!(aabb.hit(ray, Interval::new(0.0, 100.0)), expected, "ray {:?}", ray);
        }
    }

    #[test]
    fn test_hit_matches_reference_random() {
        let mut rng = StdRng::seed_from_u64(42);
        let aabb = Aabb::from_points(Vec3::new(-1.0, -2.0, -0.5), Vec3::new(2.0, 1.0, 1.5));
        for _ in 0..2000 {
            let origin = Vec3::new(rng.gen_range(-6.0..6.0), rng.gen_range(-6.0..6.0), rng.gen_range(-6.0..6.0));
            let target = Vec3::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
            let ray = Ray::new(origin, target - origin);
            assert_eq!(
                aabb.hit(&ray, Interval::new(0.0, 1e6)),
                reference_hit(&aabb, &ray, 0.0, 1e6),
                "ray {:?}",
                ray
            );
        }
    }

    #[test]
    fn test_hit_zero_direction_does_not_panic() {
        let aabb = unit_box();
        let inside = Ray::new(Vec3::ZERO, Vec3::ZERO);
        let outside = Ray::new(Vec3::splat(5.0), Vec3::ZERO);
        assert!(aabb.hit(&inside, Interval::new(0.0, 1.0)));
        assert!(!aabb.hit(&outside, Interval::new(0.0, 1.0)));
    }

    #[test]
    fn test_aabb_centroid_and_longest_axis() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 2.0));
        assert_eq!(aabb.centroid(), Vec3::new(5.0, 0.5, 1.0));
        assert_eq!(aabb.longest_axis(), 0);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }

    #[test]
    fn test_enclosing_points() {
        let aabb = Aabb::enclosing([Vec3::new(1.0, -1.0, 0.0), Vec3::new(-2.0, 3.0, 1.0), Vec3::ZERO]);
        assert_eq!(aabb.min(), Vec3::new(-2.0, -1.0, 0.0));
        assert_eq!(aabb.max(), Vec3::new(1.0, 3.0, 1.0));
        assert_eq!(Aabb::enclosing(std::iter::empty()), Aabb::EMPTY);
    }
}
