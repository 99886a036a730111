//! Parallel bounding volume hierarchy.
//!
//! Primitives live in an arena owned by the [`Bvh`]; nodes refer to them through
//! a permutation array (`order`), so every node covers a contiguous range
//! `order[start..end]`. Each node picks its split axis at random (x, y or z) and
//! splits at the median of the primitives' minimum box coordinate along it.
//!
//! Large ranges are built with `rayon::join`. A shared counter caps the number of
//! concurrently forked builds; once the cap is reached the recursion continues
//! synchronously on the current thread.

use crate::error::{RenderError, RenderResult};
use crate::hittable::{HitRecord, Hittable};
use crate::primitive::Primitive;
use prism_math::{Aabb, Interval, Ray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

/// Ranges smaller than this are never forked.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvhBuildOptions {
    /// Minimum range size that may be built in parallel.
    pub parallel_threshold: usize,
    /// Maximum number of concurrently forked builds. 0 builds sequentially.
    pub max_parallel_tasks: usize,
    /// Seed for the per-node axis choice.
    pub seed: u64,
}

impl Default for BvhBuildOptions {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            max_parallel_tasks: std::thread::available_parallelism().map_or(1, |n| n.get()),
            seed: 0x9e37_79b9_7f4a_7c15,
        }
    }
}

impl BvhBuildOptions {
    pub fn sequential() -> Self {
        Self {
            max_parallel_tasks: 0,
            ..Self::default()
        }
    }

    pub fn with_max_parallel_tasks(mut self, tasks: usize) -> Self {
        self.max_parallel_tasks = tasks;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    /// One or two primitives, `order[start..end]`.
    Leaf { start: usize, end: usize, bbox: Aabb },
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        start: usize,
        end: usize,
        bbox: Aabb,
    },
}

impl BvhNode {
    pub fn bbox(&self) -> Aabb {
        match self {
            BvhNode::Leaf { bbox, .. } | BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    /// Range of `order` covered by this node.
    pub fn range(&self) -> (usize, usize) {
        match self {
            BvhNode::Leaf { start, end, .. } | BvhNode::Branch { start, end, .. } => (*start, *end),
        }
    }

    pub fn children(&self) -> Option<(&BvhNode, &BvhNode)> {
        match self {
            BvhNode::Leaf { .. } => None,
            BvhNode::Branch { left, right, .. } => Some((left, right)),
        }
    }

    fn depth(&self) -> usize {
        match self.children() {
            None => 1,
            Some((l, r)) => 1 + l.depth().max(r.depth()),
        }
    }

    fn count(&self) -> (usize, usize) {
        match self.children() {
            None => (1, 1),
            Some((l, r)) => {
                let (ln, ll) = l.count();
                let (rn, rl) = r.count();
                (1 + ln + rn, ll + rl)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BvhStats {
    pub primitives: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
    /// Highest number of forked builds that were in flight at once.
    pub peak_parallel_tasks: usize,
    pub build_time: Duration,
}

/// Shared state of one build. Lives only for the duration of [`Bvh::build`].
struct BuildContext<'a> {
    boxes: &'a [Aabb],
    options: BvhBuildOptions,
    active_tasks: AtomicUsize,
    peak_tasks: AtomicUsize,
}

impl BuildContext<'_> {
    fn try_acquire(&self) -> bool {
        let acquired = self
            .active_tasks
            .fetch_update(AtomicOrdering::AcqRel, AtomicOrdering::Acquire, |active| {
                (active < self.options.max_parallel_tasks).then_some(active + 1)
            });
        match acquired {
            Ok(previous) => {
                self.peak_tasks.fetch_max(previous + 1, AtomicOrdering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }

    fn release(&self) {
        self.active_tasks.fetch_sub(1, AtomicOrdering::AcqRel);
    }

    fn compare(&self, a: usize, b: usize, axis: usize) -> Ordering {
        let a_min = self.boxes[a].axis_interval(axis).min;
        let b_min = self.boxes[b].axis_interval(axis).min;
        // Ties keep arena order so coincident primitives resolve like a linear scan
        a_min.total_cmp(&b_min).then(a.cmp(&b))
    }

    /// Build the node covering `order`, which sits at `start` in the full permutation.
    fn build(&self, order: &mut [usize], start: usize, seed: u64) -> BvhNode {
        let end = start + order.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let axis = rng.gen_range(0..3);

        match order.len() {
            0 => {
                log::error!("BVH build reached an empty range at {}", start);
                BvhNode::Leaf { start, end, bbox: Aabb::EMPTY }
            }
            1 => BvhNode::Leaf {
                start,
                end,
                bbox: self.boxes[order[0]],
            },
            2 => {
                if self.compare(order[1], order[0], axis) == Ordering::Less {
                    order.swap(0, 1);
                }
                BvhNode::Leaf {
                    start,
                    end,
                    bbox: self.union(&self.boxes[order[0]], &self.boxes[order[1]]),
                }
            }
            span => {
                order.sort_unstable_by(|&a, &b| self.compare(a, b, axis));
                let mid = span / 2;
                let (left_order, right_order) = order.split_at_mut(mid);
                let (left_seed, right_seed) = (rng.gen::<u64>(), rng.gen::<u64>());

                let (left, right) = if span >= self.options.parallel_threshold && self.try_acquire() {
                    let pair = rayon::join(
                        || self.build(left_order, start, left_seed),
                        || self.build(right_order, start + mid, right_seed),
                    );
                    self.release();
                    pair
                } else {
                    (
                        self.build(left_order, start, left_seed),
                        self.build(right_order, start + mid, right_seed),
                    )
                };

                let bbox = self.union(&left.bbox(), &right.bbox());
                BvhNode::Branch {
                    left: Box::new(left),
                    right: Box::new(right),
                    start,
                    end,
                    bbox,
                }
            }
        }
    }

    fn union(&self, a: &Aabb, b: &Aabb) -> Aabb {
        if !a.is_valid() || !b.is_valid() {
            log::warn!("BVH union with an invalid bounding box; using the valid side");
        }
        Aabb::surrounding(a, b)
    }
}

/// Immutable BVH over an arena of primitives.
#[derive(Debug, Clone)]
pub struct Bvh {
    primitives: Vec<Primitive>,
    order: Vec<usize>,
    root: BvhNode,
    stats: BvhStats,
}

impl Bvh {
    /// Build a hierarchy. An empty primitive list is the only failure.
    pub fn build(primitives: Vec<Primitive>, options: BvhBuildOptions) -> RenderResult<Self> {
        if primitives.is_empty() {
            log::error!("cannot build a BVH over zero primitives");
            return Err(RenderError::EmptyScene);
        }

        let started = Instant::now();
        let boxes: Vec<Aabb> = primitives.iter().map(Hittable::bounding_box).collect();
        let mut order: Vec<usize> = (0..primitives.len()).collect();

        let ctx = BuildContext {
            boxes: &boxes,
            options,
            active_tasks: AtomicUsize::new(0),
            peak_tasks: AtomicUsize::new(0),
        };
        let root = ctx.build(&mut order, 0, options.seed);

        let (nodes, leaves) = root.count();
        let stats = BvhStats {
            primitives: primitives.len(),
            nodes,
            leaves,
            depth: root.depth(),
            peak_parallel_tasks: ctx.peak_tasks.load(AtomicOrdering::Relaxed),
            build_time: started.elapsed(),
        };
        log::info!(
            "BVH built: {} primitives, {} nodes, depth {}, {} parallel tasks peak, {:.2?}",
            stats.primitives,
            stats.nodes,
            stats.depth,
            stats.peak_parallel_tasks,
            stats.build_time
        );

        Ok(Self {
            primitives,
            order,
            root,
            stats,
        })
    }

    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    pub fn stats(&self) -> &BvhStats {
        &self.stats
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Arena indices of the primitives in `node`.
    pub fn leaf_primitives(&self, node: &BvhNode) -> &[usize] {
        let (start, end) = node.range();
        &self.order[start..end]
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    fn hit_node(&self, node: &BvhNode, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        if !node.bbox().hit(ray, ray_t) {
            return false;
        }
        match node {
            BvhNode::Leaf { start, end, .. } => {
                let mut hit_anything = false;
                let mut closest_so_far = ray_t.max;
                for &index in &self.order[*start..*end] {
                    if self.primitives[index].hit(ray, ray_t.with_max(closest_so_far), rec) {
                        hit_anything = true;
                        closest_so_far = rec.t;
                    }
                }
                hit_anything
            }
            BvhNode::Branch { left, right, .. } => {
                let hit_left = self.hit_node(left, ray, ray_t, rec);
                let right_max = if hit_left { rec.t } else { ray_t.max };
                let hit_right = self.hit_node(right, ray, ray_t.with_max(right_max), rec);
                hit_left || hit_right
            }
        }
    }
}

impl Hittable for Bvh {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        self.hit_node(&self.root, ray, ray_t, rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.root.bbox()
    }
}
