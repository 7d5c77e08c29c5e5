#![warn(missing_docs)]
//! A balanced kd-tree over 2d points, plus a bounded nearest-neighbour heap.
//!
//! The tree does not own the points. It is built over a slice of `[f32; 2]`
//! coordinates and stores indices into that slice, so the same slice (or an
//! equally long one) must be passed to queries. Rebuilding reuses the node
//! storage, which makes the tree cheap to reconstruct every simulation step.

use std::{cmp::Ordering, collections::BinaryHeap};

use ordered_float::OrderedFloat;

/// Index of a point in the slice the tree was built over.
pub type PointIndex = usize;

/// Sentinel for an absent child node.
const NONE: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    point: PointIndex,
    left:  usize,
    right: usize,
}

/// A balanced binary kd-tree, alternating between the x axis (even depths)
/// and the y axis (odd depths). Every node, leaves included, holds exactly
/// one point.
#[derive(Debug, Default)]
pub struct KdTree {
    nodes:   Vec<Node>,
    root:    usize,
    scratch: Vec<PointIndex>,
}

impl KdTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes:   Vec::new(),
            root:    NONE,
            scratch: Vec::new(),
        }
    }

    /// Number of points in the tree.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no points.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuild the tree over `points`, discarding the previous contents.
    /// Node and scratch allocations are retained across rebuilds.
    pub fn rebuild(&mut self, points: &[[f32; 2]]) {
        self.nodes.clear();
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.extend(0..points.len());
        self.root = Self::build(&mut self.nodes, &mut scratch, points, 0);
        self.scratch = scratch;
    }

    /// Recursive median split. The median of the segment on the current axis
    /// becomes the node; ties are broken by point index so the tree shape is
    /// a pure function of the input.
    fn build(
        nodes: &mut Vec<Node>,
        segment: &mut [PointIndex],
        points: &[[f32; 2]],
        depth: usize,
    ) -> usize {
        if segment.is_empty() {
            return NONE;
        }
        let axis = depth % 2;
        let mid = segment.len() / 2;
        segment.select_nth_unstable_by(mid, |&a, &b| {
            points[a][axis]
                .total_cmp(&points[b][axis])
                .then_with(|| a.cmp(&b))
        });

        let index = nodes.len();
        nodes.push(Node {
            point: segment[mid],
            left:  NONE,
            right: NONE,
        });

        let (below, above) = segment.split_at_mut(mid);
        let left = Self::build(nodes, below, points, depth + 1);
        let right = Self::build(nodes, &mut above[1..], points, depth + 1);
        nodes[index].left = left;
        nodes[index].right = right;
        index
    }

    /// Collect the nearest points to `query` into `out`, bounded by the
    /// count and range `out` was reset with. `exclude` skips one point,
    /// which lets an agent query the tree it is itself part of.
    ///
    /// `points` must be the slice the tree was last rebuilt over.
    pub fn nearest_within(
        &self,
        points: &[[f32; 2]],
        query: [f32; 2],
        exclude: Option<PointIndex>,
        out: &mut NearestHeap,
    ) {
        if self.root != NONE {
            self.visit(self.root, 0, points, query, exclude, out);
        }
    }

    fn visit(
        &self,
        node: usize,
        depth: usize,
        points: &[[f32; 2]],
        query: [f32; 2],
        exclude: Option<PointIndex>,
        out: &mut NearestHeap,
    ) {
        let Node { point, left, right } = self.nodes[node];
        if exclude != Some(point) {
            let dx = points[point][0] - query[0];
            let dy = points[point][1] - query[1];
            out.consider(point, dx.mul_add(dx, dy * dy));
        }

        let axis = depth % 2;
        let delta = query[axis] - points[point][axis];
        let (near, far) = if delta < 0.0 {
            (left, right)
        } else {
            (right, left)
        };

        if near != NONE {
            self.visit(near, depth + 1, points, query, exclude, out);
        }
        // The far side only holds candidates if the splitting plane is
        // closer than the current cutoff.
        if far != NONE && delta * delta < out.cutoff_sq() {
            self.visit(far, depth + 1, points, query, exclude, out);
        }
    }
}

/// A neighbour returned by a bounded query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the neighbouring point.
    pub point:       PointIndex,
    /// Squared distance from the query point.
    pub distance_sq: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    distance_sq: OrderedFloat<f32>,
    point:       PointIndex,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .cmp(&other.distance_sq)
            .then_with(|| self.point.cmp(&other.point))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded max-heap of candidate neighbours, keyed by squared distance with
/// point index as the tiebreaker. Only points strictly inside the query
/// range are kept; once the heap is full the effective range shrinks to the
/// worst kept distance.
#[derive(Debug, Default)]
pub struct NearestHeap {
    heap:      BinaryHeap<Entry>,
    max_count: usize,
    range_sq:  f32,
}

impl NearestHeap {
    /// Create an empty heap. It keeps nothing until [`reset`](Self::reset)
    /// gives it a bound and a range.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for a new query, retaining the backing allocation.
    pub fn reset(&mut self, max_count: usize, range_sq: f32) {
        self.heap.clear();
        self.max_count = max_count;
        self.range_sq = range_sq;
    }

    /// Number of neighbours currently kept.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no neighbour has been kept.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The squared distance beyond which no candidate can improve the
    /// result: the worst kept distance once full, the query range before.
    #[inline]
    pub fn cutoff_sq(&self) -> f32 {
        if self.heap.len() == self.max_count {
            self.heap.peek().map_or(self.range_sq, |e| e.distance_sq.0)
        } else {
            self.range_sq
        }
    }

    /// Offer a candidate to the heap.
    pub fn consider(&mut self, point: PointIndex, distance_sq: f32) {
        let entry = Entry {
            distance_sq: OrderedFloat(distance_sq),
            point,
        };
        if self.heap.len() < self.max_count {
            if distance_sq < self.range_sq {
                self.heap.push(entry);
            }
        } else if let Some(worst) = self.heap.peek() {
            if entry < *worst {
                self.heap.pop();
                self.heap.push(entry);
            }
        }
    }

    /// Empty the heap into `out` (cleared first) in ascending
    /// (distance, index) order.
    pub fn drain_sorted_into(&mut self, out: &mut Vec<Neighbor>) {
        out.clear();
        while let Some(entry) = self.heap.pop() {
            out.push(Neighbor {
                point:       entry.point,
                distance_sq: entry.distance_sq.0,
            });
        }
        out.reverse();
    }
}
