//! Region quadtree for broad-phase collision and range queries
//!
//! The tree has no fixed extent. Inserts are buffered and grow the root box
//! to the union of every footprint; `build` then distributes the entries.
//! Entries whose footprint straddles a quadrant boundary stay in the parent,
//! so nothing is duplicated and no pair is missed by `walk`.
//!
//! Nodes come from a `NodePool` owned by the tree. `clear` hands every node
//! back, keeping each node's entry buffer for the next tick.

use smallvec::SmallVec;

use crate::game::constants::spatial::{MAX_DEPTH, NODE_CAPACITY};
use crate::util::vec2::Vec2;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// An empty box; the first `expand` replaces it
    pub const EMPTY: Aabb = Aabb {
        min: Vec2::new(f32::INFINITY, f32::INFINITY),
        max: Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    pub fn around(center: Vec2, radius: f32) -> Self {
        let r = Vec2::new(radius, radius);
        Self { min: center - r, max: center + r }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    /// Quadrants in order: top-left, top-right, bottom-right, bottom-left
    fn quadrants(&self) -> [Aabb; 4] {
        let c = self.center();
        [
            Aabb { min: self.min, max: c },
            Aabb { min: Vec2::new(c.x, self.min.y), max: Vec2::new(self.max.x, c.y) },
            Aabb { min: c, max: self.max },
            Aabb { min: Vec2::new(self.min.x, c.y), max: Vec2::new(c.x, self.max.y) },
        ]
    }

    /// Too small to split further
    fn is_degenerate(&self) -> bool {
        self.max.x - self.min.x <= f32::EPSILON || self.max.y - self.min.y <= f32::EPSILON
    }
}

/// A circular footprint stored in the tree
#[derive(Debug, Clone, Copy)]
pub struct Entry<T> {
    pub item: T,
    pub position: Vec2,
    pub radius: f32,
}

impl<T> Entry<T> {
    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::around(self.position, self.radius)
    }
}

#[derive(Debug)]
struct Node<T> {
    bounds: Aabb,
    depth: u8,
    items: Vec<Entry<T>>,
    children: Option<[u32; 4]>,
}

/// Recycles quadtree nodes across ticks
#[derive(Debug)]
pub struct NodePool<T> {
    nodes: Vec<Node<T>>,
    free: Vec<u32>,
}

impl<T> NodePool<T> {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), free: Vec::new() }
    }

    fn alloc(&mut self, bounds: Aabb, depth: u8) -> u32 {
        if let Some(index) = self.free.pop() {
            let node = &mut self.nodes[index as usize];
            node.bounds = bounds;
            node.depth = depth;
            node.children = None;
            node.items.clear();
            index
        } else {
            self.nodes.push(Node { bounds, depth, items: Vec::new(), children: None });
            (self.nodes.len() - 1) as u32
        }
    }

    /// Return a node and its whole subtree to the free list
    fn release(&mut self, index: u32) {
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(index);
        while let Some(i) = stack.pop() {
            let node = &mut self.nodes[i as usize];
            node.items.clear();
            if let Some(children) = node.children.take() {
                stack.extend_from_slice(&children);
            }
            self.free.push(i);
        }
    }

    /// Nodes currently handed out
    pub fn in_use(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Nodes ever allocated
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }
}

impl<T> Default for NodePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Region quadtree over circular footprints
#[derive(Debug)]
pub struct QuadTree<T> {
    capacity: usize,
    max_depth: u8,
    /// Inserted since the last clear, in insertion order
    entries: Vec<Entry<T>>,
    bounds: Aabb,
    root: Option<u32>,
    /// Entries were inserted after the last build
    dirty: bool,
    pool: NodePool<T>,
    scratch: Vec<Entry<T>>,
}

impl<T: Copy> QuadTree<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_depth(capacity, MAX_DEPTH)
    }

    pub fn with_depth(capacity: usize, max_depth: u8) -> Self {
        Self {
            capacity: capacity.max(1),
            max_depth,
            entries: Vec::new(),
            bounds: Aabb::EMPTY,
            root: None,
            dirty: false,
            pool: NodePool::new(),
            scratch: Vec::new(),
        }
    }

    /// Add a circular footprint, growing the tree's extent to fit it
    pub fn insert(&mut self, item: T, position: Vec2, radius: f32) {
        let entry = Entry { item, position, radius: radius.abs() };
        self.bounds.expand(&entry.bounds());
        self.entries.push(entry);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        if self.bounds.is_empty() {
            None
        } else {
            Some(self.bounds)
        }
    }

    /// Drop all entries and return every node to the pool
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            self.pool.release(root);
        }
        self.entries.clear();
        self.bounds = Aabb::EMPTY;
        self.dirty = false;
    }

    /// (Re)distribute buffered entries into nodes
    pub fn build(&mut self) {
        if let Some(root) = self.root.take() {
            self.pool.release(root);
        }
        self.dirty = false;
        if self.entries.is_empty() {
            return;
        }

        let root = self.pool.alloc(self.bounds, 0);
        self.pool.nodes[root as usize].items.extend_from_slice(&self.entries);
        self.root = Some(root);

        let mut pending: SmallVec<[u32; 32]> = SmallVec::new();
        pending.push(root);
        while let Some(index) = pending.pop() {
            if let Some(children) = self.subdivide(index) {
                pending.extend_from_slice(&children);
            }
        }
    }

    /// Split an overfull node, moving entries that fit wholly in one quadrant
    fn subdivide(&mut self, index: u32) -> Option<[u32; 4]> {
        let (bounds, depth, count) = {
            let node = &self.pool.nodes[index as usize];
            (node.bounds, node.depth, node.items.len())
        };
        if count <= self.capacity || depth >= self.max_depth || bounds.is_degenerate() {
            return None;
        }

        let quadrants = bounds.quadrants();
        let children = [
            self.pool.alloc(quadrants[0], depth + 1),
            self.pool.alloc(quadrants[1], depth + 1),
            self.pool.alloc(quadrants[2], depth + 1),
            self.pool.alloc(quadrants[3], depth + 1),
        ];

        let mut items = std::mem::take(&mut self.pool.nodes[index as usize].items);
        let mut i = 0;
        while i < items.len() {
            let footprint = items[i].bounds();
            match quadrants.iter().position(|q| q.contains(&footprint)) {
                Some(q) => {
                    let entry = items.swap_remove(i);
                    self.pool.nodes[children[q] as usize].items.push(entry);
                }
                None => i += 1,
            }
        }

        let node = &mut self.pool.nodes[index as usize];
        node.items = items;
        node.children = Some(children);
        Some(children)
    }

    /// Visit every entry whose bounding box intersects the query box.
    ///
    /// Broad phase only: callers re-check exact distances. Before `build`
    /// has seen the latest inserts this falls back to a linear scan.
    pub fn query(&self, center: Vec2, radius: f32, mut visit: impl FnMut(&Entry<T>)) {
        let area = Aabb::around(center, radius.abs());

        if self.dirty {
            for entry in &self.entries {
                if entry.bounds().intersects(&area) {
                    visit(entry);
                }
            }
            return;
        }

        let Some(root) = self.root else {
            return;
        };
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(index) = stack.pop() {
            let node = &self.pool.nodes[index as usize];
            if !node.bounds.intersects(&area) {
                continue;
            }
            for entry in &node.items {
                if entry.bounds().intersects(&area) {
                    visit(entry);
                }
            }
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
            }
        }
    }

    /// Visit every non-empty bucket once.
    ///
    /// `local` holds the node's own entries, `inherited` the entries kept in
    /// its ancestors. Checking `local` pairwise plus `local` against
    /// `inherited` covers each overlapping pair exactly once.
    pub fn walk(&mut self, mut visit: impl FnMut(&[Entry<T>], &[Entry<T>])) {
        if self.dirty {
            self.build();
        }
        let Some(root) = self.root else {
            return;
        };
        self.scratch.clear();
        walk_node(&self.pool.nodes, root, &mut self.scratch, &mut visit);
    }

    /// Nodes in the current tree
    pub fn node_count(&self) -> usize {
        self.pool.in_use()
    }

    pub fn pool(&self) -> &NodePool<T> {
        &self.pool
    }

    /// Deepest level reached by the current build
    pub fn depth(&self) -> u8 {
        let Some(root) = self.root else {
            return 0;
        };
        let mut deepest = 0;
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(index) = stack.pop() {
            let node = &self.pool.nodes[index as usize];
            deepest = deepest.max(node.depth);
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
            }
        }
        deepest
    }
}

impl<T: Copy> Default for QuadTree<T> {
    fn default() -> Self {
        Self::new(NODE_CAPACITY)
    }
}

fn walk_node<T: Copy>(
    nodes: &[Node<T>],
    index: u32,
    inherited: &mut Vec<Entry<T>>,
    visit: &mut impl FnMut(&[Entry<T>], &[Entry<T>]),
) {
    let node = &nodes[index as usize];
    if !node.items.is_empty() {
        visit(&node.items, inherited);
    }
    if let Some(children) = node.children {
        let mark = inherited.len();
        inherited.extend_from_slice(&node.items);
        for child in children {
            walk_node(nodes, child, inherited, visit);
        }
        inherited.truncate(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn collect(tree: &QuadTree<u32>, center: Vec2, radius: f32) -> Vec<u32> {
        let mut found = Vec::new();
        tree.query(center, radius, |e| found.push(e.item));
        found.sort_unstable();
        found
    }

    #[test]
    fn test_empty_query() {
        let tree: QuadTree<u32> = QuadTree::new(4);
        assert!(collect(&tree, Vec2::ZERO, 100.0).is_empty());
        assert!(tree.bounds().is_none());
    }

    #[test]
    fn test_insert_grows_bounds() {
        let mut tree = QuadTree::new(4);
        tree.insert(1u32, Vec2::new(0.0, 0.0), 1.0);
        tree.insert(2u32, Vec2::new(100.0, -50.0), 5.0);
        let bounds = tree.bounds().unwrap();
        assert_eq!(bounds.min, Vec2::new(-1.0, -55.0));
        assert_eq!(bounds.max, Vec2::new(105.0, 1.0));
    }

    #[test]
    fn test_query_before_and_after_build() {
        let mut tree = QuadTree::new(2);
        for i in 0..20u32 {
            tree.insert(i, Vec2::new(i as f32 * 10.0, 0.0), 1.0);
        }
        let before = collect(&tree, Vec2::new(50.0, 0.0), 12.0);
        tree.build();
        let after = collect(&tree, Vec2::new(50.0, 0.0), 12.0);
        assert_eq!(before, after);
        assert_eq!(after, vec![4, 5, 6]);
        assert!(tree.node_count() > 1);
    }

    #[test]
    fn test_clear_then_query_is_empty() {
        let mut tree = QuadTree::new(2);
        for i in 0..50u32 {
            tree.insert(i, Vec2::new(i as f32, i as f32), 2.0);
        }
        tree.build();
        tree.clear();
        assert!(collect(&tree, Vec2::new(10.0, 10.0), 1000.0).is_empty());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn test_nodes_are_recycled() {
        let mut tree = QuadTree::new(2);
        for round in 0..3 {
            for i in 0..64u32 {
                tree.insert(i, Vec2::new((i % 8) as f32 * 10.0, (i / 8) as f32 * 10.0), 1.0);
            }
            tree.build();
            let allocated = tree.pool().allocated();
            tree.clear();
            if round > 0 {
                assert_eq!(tree.pool().allocated(), allocated);
            }
        }
    }

    #[test]
    fn test_identical_positions_stop_at_degenerate_box() {
        let mut tree = QuadTree::new(2);
        for i in 0..30u32 {
            tree.insert(i, Vec2::new(5.0, 5.0), 0.0);
        }
        tree.build();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(collect(&tree, Vec2::new(5.0, 5.0), 1.0).len(), 30);
    }

    #[test]
    fn test_max_depth_bounds_subdivision() {
        let mut tree = QuadTree::with_depth(1, 3);
        for i in 0..100u32 {
            tree.insert(i, Vec2::new(i as f32 * 0.01, 0.0), 0.001);
        }
        tree.build();
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_walk_sees_every_entry_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut tree = QuadTree::new(4);
        for i in 0..200u32 {
            let p = Vec2::new(rng.gen_range(-500.0..500.0), rng.gen_range(-500.0..500.0));
            tree.insert(i, p, 4.0);
        }
        let mut seen = Vec::new();
        tree.walk(|local, _| seen.extend(local.iter().map(|e| e.item)));
        seen.sort_unstable();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_walk_finds_all_overlapping_pairs() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let radius = 6.0;
        let mut tree = QuadTree::new(4);
        let mut points = Vec::new();
        for i in 0..300u32 {
            let p = Vec2::new(rng.gen_range(-300.0..300.0), rng.gen_range(-300.0..300.0));
            points.push(p);
            tree.insert(i, p, radius);
        }

        let mut expected = Vec::new();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                if points[i].distance_to(points[j]) < radius {
                    expected.push((i as u32, j as u32));
                }
            }
        }

        let mut found = Vec::new();
        tree.walk(|local, inherited| {
            for (n, a) in local.iter().enumerate() {
                for b in local[n + 1..].iter().chain(inherited.iter()) {
                    if a.position.distance_to(b.position) < radius {
                        found.push((a.item.min(b.item), a.item.max(b.item)));
                    }
                }
            }
        });
        found.sort_unstable();
        expected.sort_unstable();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_straddler_stays_in_parent() {
        let mut tree = QuadTree::new(1);
        tree.insert(0u32, Vec2::new(-10.0, -10.0), 1.0);
        tree.insert(1u32, Vec2::new(10.0, 10.0), 1.0);
        // Sits on the centre lines of the root box
        tree.insert(2u32, Vec2::new(0.0, 0.0), 1.0);
        tree.build();

        let mut buckets = Vec::new();
        tree.walk(|local, inherited| {
            buckets.push((
                local.iter().map(|e| e.item).collect::<Vec<_>>(),
                inherited.len(),
            ))
        });
        assert!(buckets.contains(&(vec![2], 0)));
        assert!(buckets.contains(&(vec![0], 1)));
        assert!(buckets.contains(&(vec![1], 1)));
    }
}
