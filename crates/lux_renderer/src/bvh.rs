//! Bounding volume hierarchy over the scene triangles.
//!
//! The tree is a flat node array indexing into the triangle array. Building
//! it partitions the triangles by spatial median, which reorders the
//! triangle array in place: indices into that array are only meaningful
//! once the build has completed. After the build the tree and the triangle
//! array are read-only and can be queried from any number of threads.

use std::time::Instant;

use lux_math::{BoundingBox, Ray, Triangle};

use crate::Hit;

/// A node of the tree: either a leaf referencing one triangle, or an
/// internal node with a box covering its subtree and two children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Bounds of every triangle below this node (the triangle itself for leaves)
    pub bbox: BoundingBox,
    /// `[left, right]` node indices; `None` for leaves
    pub children: Option<[usize; 2]>,
    /// Triangle referenced by a leaf (0 for internal nodes)
    pub triangle: usize,
}

impl Node {
    pub fn leaf(triangle: usize, bbox: BoundingBox) -> Self {
        Self {
            bbox,
            children: None,
            triangle,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Binary BVH over a triangle array.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: usize,
    /// `order[i]` is the load-order index of the triangle now at slot `i`
    pub(crate) order: Vec<u32>,
}

/// Pending `[begin, end)` range, and where to link the node built from it.
struct Task {
    begin: usize,
    end: usize,
    parent: Option<(usize, usize)>,
}

impl BinaryTree {
    /// Build a tree over `triangles`, reordering them in place.
    ///
    /// Each range `[begin, end)` gets one node, allocated before its children
    /// so node indices follow pre-order. A single triangle becomes a leaf;
    /// larger ranges are split at the middle of their box on its longest
    /// axis, by comparing approximate centroids. If every triangle falls on
    /// one side, the range is cut at its index midpoint instead.
    ///
    /// # Panics
    ///
    /// Panics if `triangles` is empty.
    pub fn build(triangles: &mut [Triangle]) -> Self {
        assert!(
            !triangles.is_empty(),
            "cannot build a tree over an empty triangle array"
        );

        let start = Instant::now();
        let count = triangles.len();
        let mut order: Vec<u32> = (0..count as u32).collect();
        let mut nodes: Vec<Node> = Vec::with_capacity(2 * count - 1);

        // Explicit stack instead of recursion, the split can be very unbalanced.
        let mut tasks = vec![Task {
            begin: 0,
            end: count,
            parent: None,
        }];

        while let Some(Task { begin, end, parent }) = tasks.pop() {
            let index = nodes.len();
            if let Some((parent, side)) = parent {
                if let Some(children) = nodes[parent].children.as_mut() {
                    children[side] = index;
                }
            }

            if end - begin <= 1 {
                let triangle = &triangles[order[begin] as usize];
                nodes.push(Node::leaf(begin, triangle.bounds()));
                continue;
            }

            let range = &mut order[begin..end];
            let mut bbox = BoundingBox::EMPTY;
            for &i in range.iter() {
                let t = &triangles[i as usize];
                bbox.fold_point(t.a);
                bbox.fold_point(t.b);
                bbox.fold_point(t.c);
            }

            let axis = bbox.longest_axis();
            let split = (bbox.pmin[axis] + bbox.pmax[axis]) / 2.0;

            let mut mid = begin
                + partition(range, |&i| triangles[i as usize].centroid()[axis] < split);
            if mid == begin || mid == end {
                mid = (begin + end) / 2;
            }

            nodes.push(Node {
                bbox,
                children: Some([index, index]),
                triangle: 0,
            });

            // Right pushed first so the left subtree is numbered first.
            tasks.push(Task {
                begin: mid,
                end,
                parent: Some((index, 1)),
            });
            tasks.push(Task {
                begin,
                end: mid,
                parent: Some((index, 0)),
            });
        }

        let tree = Self {
            nodes,
            root: 0,
            order,
        };
        tree.apply_order(triangles);

        log::info!(
            "Built tree over {} triangles: {} nodes, depth {} in {:.2?}",
            count,
            tree.nodes.len(),
            tree.depth(),
            start.elapsed()
        );
        tree
    }

    /// Reorder triangles given in load order into the order this tree expects.
    pub fn apply_order(&self, triangles: &mut [Triangle]) {
        debug_assert_eq!(triangles.len(), self.order.len());
        let permuted: Vec<Triangle> = self
            .order
            .iter()
            .map(|&i| triangles[i as usize])
            .collect();
        triangles.copy_from_slice(&permuted);
    }

    /// Find the closest triangle hit by `ray` with `t <= ray.tmax`.
    ///
    /// Traversal pops nodes from an explicit stack: leaves are collected as
    /// candidates, internal nodes push their children only when the ray
    /// hits their box. Candidates are then tested exactly; the query only
    /// reports a hit when one of them actually intersects the ray.
    pub fn find_nearest_hit(&self, triangles: &[Triangle], ray: &Ray) -> Option<Hit> {
        let mut stack = Vec::with_capacity(64);
        let mut candidates = Vec::new();
        stack.push(self.root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            match node.children {
                None => candidates.push(node.triangle),
                Some([left, right]) => {
                    if node.bbox.hit(ray) {
                        stack.push(right);
                        stack.push(left);
                    }
                }
            }
        }

        let mut closest = ray.tmax;
        let mut nearest = None;
        for index in candidates {
            if let Some((t, u, v)) = triangles[index].intersect(ray, closest) {
                closest = t;
                nearest = Some((index, t, u, v));
            }
        }

        nearest.map(|(index, t, u, v)| Hit::new(ray, &triangles[index], index, t, u, v))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of triangles the tree was built over.
    pub fn triangle_count(&self) -> usize {
        self.order.len()
    }

    /// Permutation applied by the build (see [`BinaryTree::apply_order`]).
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some([left, right]) = self.nodes[index].children {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }
}

/// Move every element matching `pred` to the front; returns how many matched.
/// Not stable.
fn partition<T>(items: &mut [T], mut pred: impl FnMut(&T) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lux_math::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    pub(crate) fn random_triangles(count: usize, seed: u64) -> Vec<Triangle> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let center = Vec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                let mut corner = || {
                    center
                        + Vec3::new(
                            rng.gen_range(-0.5..0.5),
                            rng.gen_range(-0.5..0.5),
                            rng.gen_range(-0.5..0.5),
                        )
                };
                let (a, b, c) = (corner(), corner(), corner());
                Triangle::new(a, b, c, 0)
            })
            .collect()
    }

    /// Four disjoint unit triangles facing +Z at z = -5, centered on x = -3, -1, 1, 3.
    pub(crate) fn four_triangles() -> Vec<Triangle> {
        [-3.0, -1.0, 1.0, 3.0]
            .iter()
            .map(|&x| {
                Triangle::new(
                    Vec3::new(x - 0.5, -0.5, -5.0),
                    Vec3::new(x + 0.5, -0.5, -5.0),
                    Vec3::new(x, 0.5, -5.0),
                    0,
                )
            })
            .collect()
    }

    fn leaf_triangles(tree: &BinaryTree) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![tree.root()];
        while let Some(index) = stack.pop() {
            let node = &tree.nodes()[index];
            match node.children {
                None => leaves.push(node.triangle),
                Some([left, right]) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        leaves
    }

    fn assert_well_formed(tree: &BinaryTree, count: usize) {
        // Full binary tree
        assert_eq!(tree.node_count(), 2 * count - 1);

        // Every triangle reached exactly once, in pre-order
        let leaves = leaf_triangles(tree);
        assert_eq!(leaves, (0..count).collect::<Vec<_>>());

        // Parents contain their children
        for node in tree.nodes() {
            if let Some([left, right]) = node.children {
                assert!(node.bbox.contains(&tree.nodes()[left].bbox));
                assert!(node.bbox.contains(&tree.nodes()[right].bbox));
            }
        }
    }

    #[test]
    fn test_build_single_triangle() {
        let mut triangles = vec![Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, 0)];
        let tree = BinaryTree::build(&mut triangles);

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.root(), 0);
        assert!(tree.nodes()[0].is_leaf());
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    #[should_panic(expected = "empty triangle array")]
    fn test_build_empty_panics() {
        BinaryTree::build(&mut []);
    }

    #[test]
    fn test_build_random() {
        let mut triangles = random_triangles(500, 1);
        let tree = BinaryTree::build(&mut triangles);

        assert_well_formed(&tree, 500);
        assert!(tree.depth() < 500);
    }

    #[test]
    fn test_build_identical_triangles() {
        let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, 0);
        let mut triangles = vec![tri; 37];
        let tree = BinaryTree::build(&mut triangles);

        assert_well_formed(&tree, 37);
    }

    #[test]
    fn test_build_coincident_centroids() {
        // Different shapes sharing the same approximate centroid on every axis
        let mut triangles: Vec<Triangle> = (1..=20)
            .map(|i| {
                let s = i as f32;
                let a = Vec3::new(-0.66 * s, -0.66 * s, 0.0);
                Triangle::new(a, a + Vec3::new(2.0 * s, 0.0, 0.0), a + Vec3::new(0.0, 2.0 * s, 0.0), 0)
            })
            .collect();
        let tree = BinaryTree::build(&mut triangles);

        assert_well_formed(&tree, 20);
    }

    #[test]
    fn test_build_preorder_indices() {
        let mut triangles = random_triangles(64, 2);
        let tree = BinaryTree::build(&mut triangles);

        assert_eq!(tree.root(), 0);
        for (index, node) in tree.nodes().iter().enumerate() {
            if let Some([left, _]) = node.children {
                assert_eq!(left, index + 1);
            }
        }
    }

    #[test]
    fn test_build_reorders_in_place() {
        let original = random_triangles(100, 3);
        let mut triangles = original.clone();
        let tree = BinaryTree::build(&mut triangles);

        // Same multiset, tracked by the permutation
        let order: BTreeSet<u32> = tree.order().iter().copied().collect();
        assert_eq!(order.len(), 100);
        for (slot, &load_index) in tree.order().iter().enumerate() {
            assert_eq!(triangles[slot], original[load_index as usize]);
        }
        assert_ne!(triangles, original);

        // Replaying the permutation on a fresh load gives the same array
        let mut reloaded = original.clone();
        tree.apply_order(&mut reloaded);
        assert_eq!(reloaded, triangles);
    }

    #[test]
    fn test_split_uses_longest_axis() {
        // Spread along Z only: the root splits the two groups apart
        let mut triangles: Vec<Triangle> = [0.0, 0.5, 10.0, 10.5]
            .iter()
            .map(|&z| {
                Triangle::new(
                    Vec3::new(0.0, 0.0, z),
                    Vec3::new(1.0, 0.0, z),
                    Vec3::new(0.0, 1.0, z),
                    0,
                )
            })
            .collect();
        let tree = BinaryTree::build(&mut triangles);

        assert_well_formed(&tree, 4);
        assert!(triangles[0].a.z < 5.0 && triangles[1].a.z < 5.0);
        assert!(triangles[2].a.z > 5.0 && triangles[3].a.z > 5.0);
    }

    #[test]
    fn test_find_nearest_hit() {
        let mut triangles = four_triangles();
        let tree = BinaryTree::build(&mut triangles);

        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), -Vec3::Z);
        let hit = tree.find_nearest_hit(&triangles, &ray).expect("ray should hit");

        assert!((hit.t - 5.0).abs() < 1e-4);
        assert!((triangles[hit.triangle].centroid().x - 1.0).abs() < 0.1);
        assert!((hit.position - Vec3::new(1.0, 0.0, -5.0)).length() < 1e-4);
    }

    #[test]
    fn test_find_nearest_hit_miss() {
        let mut triangles = four_triangles();
        let tree = BinaryTree::build(&mut triangles);

        // Pointing away from all geometry
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(tree.find_nearest_hit(&triangles, &ray).is_none());
    }

    #[test]
    fn test_box_hit_without_triangle_hit() {
        let mut triangles = four_triangles();
        let tree = BinaryTree::build(&mut triangles);

        // Inside every box on the way down to the x=1 leaf, but above its apex
        let ray = Ray::new(Vec3::new(1.4, 0.45, 0.0), -Vec3::Z);
        assert!(tree.nodes()[tree.root()].bbox.hit(&ray));
        assert!(tree.find_nearest_hit(&triangles, &ray).is_none());
    }

    #[test]
    fn test_find_nearest_of_stacked() {
        let mut triangles: Vec<Triangle> = [-2.0, -6.0, -4.0]
            .iter()
            .map(|&z| {
                Triangle::new(
                    Vec3::new(-1.0, -1.0, z),
                    Vec3::new(1.0, -1.0, z),
                    Vec3::new(0.0, 1.0, z),
                    0,
                )
            })
            .collect();
        let tree = BinaryTree::build(&mut triangles);

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let hit = tree.find_nearest_hit(&triangles, &ray).expect("ray should hit");
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert_eq!(triangles[hit.triangle].a.z, -2.0);
    }

    #[test]
    fn test_segment_stops_at_tmax() {
        let mut triangles = four_triangles();
        let tree = BinaryTree::build(&mut triangles);

        let blocked = Ray::between(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, -10.0));
        assert!(tree.find_nearest_hit(&triangles, &blocked).is_some());

        let short = Ray::between(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, -4.0));
        assert!(tree.find_nearest_hit(&triangles, &short).is_none());
    }

    #[test]
    fn test_matches_brute_force() {
        let mut triangles = random_triangles(300, 4);
        let tree = BinaryTree::build(&mut triangles);
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..200 {
            let origin = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let target = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            let ray = Ray::new(origin, target - origin);

            let mut closest = ray.tmax;
            let mut expected = None;
            for (i, tri) in triangles.iter().enumerate() {
                if let Some((t, _, _)) = tri.intersect(&ray, closest) {
                    closest = t;
                    expected = Some(i);
                }
            }

            let found = tree.find_nearest_hit(&triangles, &ray).map(|h| h.triangle);
            assert_eq!(found, expected);
        }
    }
}
