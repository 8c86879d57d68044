//! Fixed-region quad-tree over axis-aligned envelopes.
//!
//! The tree stores `(envelope, payload)` pairs and answers
//! envelope-intersection queries without false negatives. Nodes split into
//! four quadrants once they hold more than a fixed number of entries; an
//! entry that straddles a split line stays at the internal node, and an
//! entry outside the tree's region stays at the root, so every entry is
//! always reachable. Queries are lazy iterators driven by an explicit node
//! stack.
//!
//! Intersection uses closed intervals on both axes: envelopes that merely
//! touch (including zero-area point envelopes) intersect.

use geo::{Coord, Rect};

/// Entries a node may hold before it splits.
const NODE_CAPACITY: usize = 8;

/// Maximum node depth; below this, nodes absorb any overflow.
const MAX_DEPTH: u8 = 12;

const ROOT: usize = 0;

/// Closed-interval intersection test for two envelopes.
fn envelopes_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x
        && a.max().x >= b.min().x
        && a.min().y <= b.max().y
        && a.max().y >= b.min().y
}

/// True when `outer` fully contains `inner`, boundaries included.
fn envelope_contains(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    outer.min().x <= inner.min().x
        && inner.max().x <= outer.max().x
        && outer.min().y <= inner.min().y
        && inner.max().y <= outer.max().y
}

#[derive(Debug)]
struct Node<P> {
    bounds: Rect<f64>,
    depth: u8,
    entries: Vec<(Rect<f64>, P)>,
    children: Option<[usize; 4]>,
}

/// Quad-tree mapping envelopes to opaque payloads.
///
/// Built once per provider snapshot and read-only afterwards; a refresh
/// builds a new tree rather than mutating this one.
///
/// # Examples
///
/// ```
/// use geo::{Coord, Rect};
/// use geomarket_core::QuadTree;
///
/// let world = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 100.0 });
/// let mut tree = QuadTree::new(world);
/// tree.insert(Rect::new(Coord { x: 10.0, y: 10.0 }, Coord { x: 20.0, y: 20.0 }), "a");
/// tree.insert(Rect::new(Coord { x: 60.0, y: 60.0 }, Coord { x: 70.0, y: 70.0 }), "b");
///
/// let query = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 30.0, y: 30.0 });
/// let hits: Vec<_> = tree.query(query).copied().collect();
/// assert_eq!(hits, vec!["a"]);
/// ```
#[derive(Debug)]
pub struct QuadTree<P> {
    nodes: Vec<Node<P>>,
    len: usize,
}

impl<P> QuadTree<P> {
    /// Create an empty tree partitioning `bounds`.
    pub fn new(bounds: Rect<f64>) -> Self {
        Self {
            nodes: vec![Node {
                bounds,
                depth: 0,
                entries: Vec::new(),
                children: None,
            }],
            len: 0,
        }
    }

    /// Build a tree over `bounds` from an entry iterator.
    pub fn bulk<I>(bounds: Rect<f64>, items: I) -> Self
    where
        I: IntoIterator<Item = (Rect<f64>, P)>,
    {
        let mut tree = Self::new(bounds);
        for (envelope, payload) in items {
            tree.insert(envelope, payload);
        }
        tree
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `payload` under `envelope`.
    ///
    /// Never fails: duplicates, zero-area envelopes, and envelopes outside
    /// the tree's region are all accepted and remain queryable.
    pub fn insert(&mut self, envelope: Rect<f64>, payload: P) {
        self.len += 1;

        let mut node = ROOT;
        // Descend to the smallest node that fully contains the envelope.
        while let Some(children) = self.nodes[node].children {
            match children
                .into_iter()
                .find(|&child| envelope_contains(&self.nodes[child].bounds, &envelope))
            {
                Some(child) => node = child,
                None => break,
            }
        }

        self.nodes[node].entries.push((envelope, payload));
        if self.should_split(node) {
            self.split(node);
        }
    }

    /// All payloads whose envelope intersects `envelope`, lazily.
    ///
    /// Results are produced incrementally in unspecified order; a fresh call
    /// re-executes the traversal. An empty iterator is a normal outcome.
    pub fn query(&self, envelope: Rect<f64>) -> Query<'_, P> {
        Query {
            tree: self,
            envelope,
            stack: vec![ROOT],
            entries: std::slice::Iter::default(),
        }
    }

    fn should_split(&self, node: usize) -> bool {
        let node = &self.nodes[node];
        node.children.is_none()
            && node.entries.len() > NODE_CAPACITY
            && node.depth < MAX_DEPTH
            && node.bounds.width() > 0.0
            && node.bounds.height() > 0.0
    }

    fn split(&mut self, node: usize) {
        let bounds = self.nodes[node].bounds;
        let depth = self.nodes[node].depth + 1;
        let centre = bounds.center();

        let quadrants = [
            Rect::new(bounds.min(), centre),
            Rect::new(
                Coord {
                    x: centre.x,
                    y: bounds.min().y,
                },
                Coord {
                    x: bounds.max().x,
                    y: centre.y,
                },
            ),
            Rect::new(
                Coord {
                    x: bounds.min().x,
                    y: centre.y,
                },
                Coord {
                    x: centre.x,
                    y: bounds.max().y,
                },
            ),
            Rect::new(centre, bounds.max()),
        ];

        let first_child = self.nodes.len();
        for quadrant in quadrants {
            self.nodes.push(Node {
                bounds: quadrant,
                depth,
                entries: Vec::new(),
                children: None,
            });
        }
        let children = [first_child, first_child + 1, first_child + 2, first_child + 3];
        self.nodes[node].children = Some(children);

        // Push down every entry a single quadrant can fully hold; the rest
        // stay here as straddlers.
        let entries = std::mem::take(&mut self.nodes[node].entries);
        let mut straddlers = Vec::new();
        for (envelope, payload) in entries {
            match children
                .into_iter()
                .find(|&child| envelope_contains(&self.nodes[child].bounds, &envelope))
            {
                Some(child) => self.nodes[child].entries.push((envelope, payload)),
                None => straddlers.push((envelope, payload)),
            }
        }
        self.nodes[node].entries = straddlers;
    }
}

/// Lazy envelope-intersection query over a [`QuadTree`].
#[derive(Debug)]
pub struct Query<'a, P> {
    tree: &'a QuadTree<P>,
    envelope: Rect<f64>,
    stack: Vec<usize>,
    entries: std::slice::Iter<'a, (Rect<f64>, P)>,
}

impl<'a, P> Iterator for Query<'a, P> {
    type Item = &'a P;

    fn next(&mut self) -> Option<&'a P> {
        loop {
            for (envelope, payload) in self.entries.by_ref() {
                if envelopes_intersect(envelope, &self.envelope) {
                    return Some(payload);
                }
            }

            let node = self.stack.pop()?;
            let current = &self.tree.nodes[node];
            if let Some(children) = current.children {
                for child in children {
                    if envelopes_intersect(&self.tree.nodes[child].bounds, &self.envelope) {
                        self.stack.push(child);
                    }
                }
            }
            self.entries = current.entries.iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn world() -> Rect<f64> {
        Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 100.0 })
    }

    fn cell(x: f64, y: f64, size: f64) -> Rect<f64> {
        Rect::new(Coord { x, y }, Coord { x: x + size, y: y + size })
    }

    #[rstest]
    fn empty_tree_yields_nothing() {
        let tree: QuadTree<u32> = QuadTree::new(world());
        assert!(tree.is_empty());
        assert_eq!(tree.query(world()).count(), 0);
    }

    #[rstest]
    fn no_false_negatives_against_linear_scan() {
        // A 10×10 grid of cells forces several levels of splitting.
        let mut entries = Vec::new();
        for row in 0..10 {
            for column in 0..10 {
                let envelope = cell(f64::from(column) * 10.0, f64::from(row) * 10.0, 8.0);
                entries.push((envelope, row * 10 + column));
            }
        }
        let tree = QuadTree::bulk(world(), entries.clone());
        assert_eq!(tree.len(), entries.len());

        let queries = [
            cell(0.0, 0.0, 100.0),
            cell(5.0, 5.0, 20.0),
            cell(33.0, 71.0, 0.5),
            Rect::new(Coord { x: 48.0, y: 0.0 }, Coord { x: 52.0, y: 100.0 }),
        ];
        for query in queries {
            let mut expected: Vec<i32> = entries
                .iter()
                .filter(|(envelope, _)| envelopes_intersect(envelope, &query))
                .map(|(_, payload)| *payload)
                .collect();
            expected.sort_unstable();
            let mut found: Vec<i32> = tree.query(query).copied().collect();
            found.sort_unstable();
            assert_eq!(found, expected);
        }
    }

    #[rstest]
    fn touching_envelopes_intersect() {
        let mut tree = QuadTree::new(world());
        tree.insert(cell(10.0, 10.0, 10.0), "box");
        // Query sharing only the right edge of the stored envelope.
        let query = Rect::new(Coord { x: 20.0, y: 12.0 }, Coord { x: 25.0, y: 14.0 });
        assert_eq!(tree.query(query).count(), 1);
    }

    #[rstest]
    fn point_envelope_is_retrievable_by_point_query() {
        let mut tree = QuadTree::new(world());
        let point = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 5.0, y: 5.0 });
        tree.insert(point, "point");
        assert_eq!(tree.query(point).count(), 1);
    }

    #[rstest]
    fn straddling_entry_survives_splits() {
        let mut tree = QuadTree::new(world());
        // Sits across the first split line at x = 50.
        let straddler = Rect::new(Coord { x: 48.0, y: 48.0 }, Coord { x: 52.0, y: 52.0 });
        tree.insert(straddler, usize::MAX);
        for index in 0..64 {
            let offset = (index % 8) as f64;
            tree.insert(cell(offset * 6.0, (index / 8) as f64 * 6.0, 1.0), index);
        }
        let found: Vec<usize> = tree.query(straddler).copied().collect();
        assert!(found.contains(&usize::MAX));
    }

    #[rstest]
    fn entry_outside_the_region_stays_queryable() {
        let mut tree = QuadTree::new(world());
        let outside = cell(500.0, 500.0, 10.0);
        tree.insert(outside, "stray");
        assert_eq!(tree.query(outside).count(), 1);
        assert_eq!(tree.query(cell(0.0, 0.0, 100.0)).count(), 0);
    }

    #[rstest]
    fn duplicate_envelopes_are_all_returned() {
        let mut tree = QuadTree::new(world());
        let envelope = cell(10.0, 10.0, 5.0);
        for payload in 0..20 {
            tree.insert(envelope, payload);
        }
        assert_eq!(tree.query(envelope).count(), 20);
        assert_eq!(tree.len(), 20);
    }

    #[rstest]
    fn query_is_lazy() {
        let mut tree = QuadTree::new(world());
        for payload in 0..100 {
            tree.insert(cell(1.0, 1.0, 1.0), payload);
        }
        // Taking one element must not require draining the traversal.
        let first = tree.query(world()).next();
        assert!(first.is_some());
    }
}
