use crate::{BoundingSquare, Coordinate, Error, Result};
use arrayvec::ArrayVec;
use tracing::{debug, trace, warn};

mod visit;

pub use visit::{NodeView, Nodes, Visitor};

/// Number of points a node holds before it splits.
pub const CAPACITY: usize = 4;
/// Nodes at this depth never split, surplus points go into an overflow list instead.
pub const MAX_DEPTH: u32 = 24;
/// Below this depth `par_query_range` stops forking.
const PAR_CUTOFF_DEPTH: u32 = 6;

const DEFAULT_HALF_DIMENSION: f64 = 50.0;

type Items = ArrayVec<[Coordinate; CAPACITY]>;

#[derive(Debug, Clone)]
enum Node {
    // overflow is only ever filled at MAX_DEPTH
    Leaf { overflow: Vec<Coordinate> },
    Internal(Box<[Quadtree; 4]>),
}

#[derive(Debug, Clone)]
pub struct Quadtree {
    boundary: BoundingSquare,
    // exact edges, shared bit for bit with the siblings so the quadrants leave no gaps
    from: Coordinate,
    to: Coordinate,
    level: u32,

    node: Node,

    items: Items,
}

impl Default for Quadtree {
    fn default() -> Self {
        Self::new(BoundingSquare::new(
            Coordinate::default(),
            DEFAULT_HALF_DIMENSION,
        ))
    }
}

impl Quadtree {
    /// Empty root leaf governing `boundary`.
    ///
    /// Panics if the half-dimension is not finite and positive, see `try_new`.
    pub fn new(boundary: BoundingSquare) -> Self {
        assert!(
            boundary.half_dimension.is_finite() && boundary.half_dimension > 0.0,
            "invalid half-dimension {}",
            boundary.half_dimension
        );
        Self::root(boundary)
    }

    pub fn try_new(boundary: BoundingSquare) -> Result<Self> {
        let half_dimension = boundary.half_dimension;
        if !half_dimension.is_finite() || half_dimension <= 0.0 {
            return Err(Error::InvalidBoundary { half_dimension });
        }
        Ok(Self::root(boundary))
    }

    fn root(boundary: BoundingSquare) -> Self {
        Self::with_edges(boundary, boundary.min(), boundary.max(), 0)
    }

    fn with_edges(boundary: BoundingSquare, from: Coordinate, to: Coordinate, level: u32) -> Self {
        Self {
            boundary,
            from,
            to,
            level,
            node: Node::Leaf {
                overflow: Vec::new(),
            },
            items: Default::default(),
        }
    }

    pub fn from_iterator<It>(it: It) -> Self
    where
        It: Iterator<Item = Coordinate>,
    {
        let mut min = [f64::INFINITY, f64::INFINITY];
        let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        let values = it
            .map(|p| {
                min[0] = min[0].min(p[0]);
                min[1] = min[1].min(p[1]);
                max[0] = max[0].max(p[0]);
                max[1] = max[1].max(p[1]);
                p
            })
            .collect::<Vec<_>>();
        if values.is_empty() {
            return Self::default();
        }

        // smallest square enclosing every point, padded to survive rounding of the center
        let center = Coordinate::new((min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0);
        let half = ((max[0] - min[0]).max(max[1] - min[1])) / 2.0;
        let magnitude = min
            .iter()
            .chain(max.iter())
            .fold(1.0f64, |acc, v| acc.max(v.abs()));
        let half = if half > 0.0 { half } else { 1.0 };
        let half = half + magnitude * f64::EPSILON * 4.0;

        let mut tree = Self::new(BoundingSquare::new(center, half));
        let len = values.len();
        let inserted = tree.extend(values.into_iter());
        debug_assert_eq!(inserted, len, "bounding square does not enclose the input");
        tree
    }

    /// Insert every point, return how many were accepted.
    pub fn extend<It>(&mut self, it: It) -> usize
    where
        It: Iterator<Item = Coordinate>,
    {
        it.filter(|p| self.insert(*p)).count()
    }

    /// Return if the insertion was successful.
    /// Points outside the boundary are rejected without touching the tree.
    pub fn insert(&mut self, point: Coordinate) -> bool {
        if !self.encloses(&point) {
            trace!(?point, boundary = ?self.boundary, "point out of bounds");
            return false;
        }

        if let Node::Leaf { overflow } = &mut self.node {
            if self.items.try_push(point).is_ok() {
                // there was capacity left in this node. We're done.
                return true;
            }
            if self.level >= MAX_DEPTH {
                warn!(
                    ?point,
                    depth = self.level,
                    stored = CAPACITY + overflow.len() + 1,
                    "max depth reached, storing point over capacity"
                );
                overflow.push(point);
                return true;
            }
            self.split();
        }

        // Return when we found a child that can accept this point.
        // NW goes first, so a point on a shared edge lands in exactly one child.
        if let Node::Internal(children) = &mut self.node {
            for c in children.iter_mut() {
                if c.insert(point) {
                    return true;
                }
            }
        }

        unreachable!(
            "{:?} is inside {:?} but no quadrant accepted it",
            point, self.boundary
        );
    }

    /// Edge-inclusive test against the node's exact edges.
    /// For the root this agrees with `BoundingSquare::contains_point` on its boundary.
    fn encloses(&self, point: &Coordinate) -> bool {
        let [x, y] = **point;

        self.from[0] <= x && self.from[1] <= y && x <= self.to[0] && y <= self.to[1]
    }

    fn intersects_range(&self, range: &BoundingSquare) -> bool {
        let [from, to] = [range.min(), range.max()];

        if self.to[0] < from[0] || self.from[0] > to[0] {
            return false;
        }
        if self.to[1] < from[1] || self.from[1] > to[1] {
            return false;
        }
        true
    }

    fn split(&mut self) {
        let overflow_empty = match &self.node {
            Node::Leaf { overflow } => overflow.is_empty(),
            Node::Internal(_) => unreachable!("split called on an internal node"),
        };
        assert!(overflow_empty);

        debug!(
            depth = self.level,
            center = ?self.boundary.center,
            half_dimension = self.boundary.half_dimension,
            "splitting node"
        );

        let level = self.level + 1;
        let [nw, ne, sw, se] = self.boundary.quadrants();

        // children reuse these edges instead of recomputing them from their own centers
        let [fromx, fromy] = *self.from;
        let [tox, toy] = *self.to;
        let [midx, midy] = *self.boundary.center;
        let midx = midx.max(fromx).min(tox);
        let midy = midy.max(fromy).min(toy);

        self.node = Node::Internal(Box::new([
            Self::with_edges(
                nw,
                Coordinate::new(fromx, midy),
                Coordinate::new(midx, toy),
                level,
            ),
            Self::with_edges(
                ne,
                Coordinate::new(midx, midy),
                Coordinate::new(tox, toy),
                level,
            ),
            Self::with_edges(
                sw,
                Coordinate::new(fromx, fromy),
                Coordinate::new(midx, midy),
                level,
            ),
            Self::with_edges(
                se,
                Coordinate::new(midx, fromy),
                Coordinate::new(tox, midy),
                level,
            ),
        ]));
    }

    /// Every stored point inside `range`. Own points first, then children in NW, NE, SW, SE order.
    pub fn query_range(&self, range: &BoundingSquare) -> Vec<Coordinate> {
        let mut out = Vec::new();
        self.query_range_into(range, &mut out);
        out
    }

    /// Same as `query_range` but appends to `out`.
    pub fn query_range_into(&self, range: &BoundingSquare, out: &mut Vec<Coordinate>) {
        if !self.intersects_range(range) {
            return;
        }

        self.own_in_range(range, out);

        if let Node::Internal(ref children) = self.node {
            for child in children.iter() {
                child.query_range_into(range, out);
            }
        }
    }

    /// Parallel version of `query_range`. Returns the exact same sequence.
    pub fn par_query_range(&self, range: &BoundingSquare) -> Vec<Coordinate> {
        if !self.intersects_range(range) {
            return Vec::new();
        }
        let children = match &self.node {
            Node::Internal(children) if self.level < PAR_CUTOFF_DEPTH => children,
            _ => return self.query_range(range),
        };

        let mut out = Vec::new();
        self.own_in_range(range, &mut out);

        let [nw, ne, sw, se] = &**children;
        let ((nw, ne), (sw, se)) = rayon::join(
            || {
                rayon::join(
                    || nw.par_query_range(range),
                    || ne.par_query_range(range),
                )
            },
            || {
                rayon::join(
                    || sw.par_query_range(range),
                    || se.par_query_range(range),
                )
            },
        );
        out.reserve(nw.len() + ne.len() + sw.len() + se.len());
        for part in [nw, ne, sw, se].iter() {
            out.extend_from_slice(part);
        }
        out
    }

    fn own_in_range(&self, range: &BoundingSquare, out: &mut Vec<Coordinate>) {
        for p in self.points() {
            if range.contains_point(p) {
                out.push(*p);
            }
        }
    }

    /// Exact match lookup.
    pub fn contains(&self, point: &Coordinate) -> bool {
        if !self.encloses(point) {
            return false;
        }

        if self.points().any(|p| p == point) {
            return true;
        }

        if let Node::Internal(ref children) = self.node {
            for child in children.iter() {
                if child.contains(point) {
                    return true;
                }
            }
        }
        false
    }

    /// Points held directly by this node, not by its children.
    pub fn points(&self) -> impl Iterator<Item = &Coordinate> {
        let overflow: &[Coordinate] = match &self.node {
            Node::Leaf { overflow } => overflow,
            Node::Internal(_) => &[],
        };
        self.items.iter().chain(overflow.iter())
    }

    /// Total number of points stored in this subtree.
    pub fn len(&self) -> usize {
        self.nodes().map(|n| n.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn boundary(&self) -> &BoundingSquare {
        &self.boundary
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.node, Node::Leaf { .. })
    }

    pub fn children(&self) -> Option<&[Quadtree; 4]> {
        match &self.node {
            Node::Internal(children) => Some(children),
            Node::Leaf { .. } => None,
        }
    }

    /// Number of levels below and including this node.
    pub fn depth(&self) -> u32 {
        match &self.node {
            Node::Leaf { .. } => 1,
            Node::Internal(children) => {
                1 + children.iter().map(|c| c.depth()).max().unwrap_or(0)
            }
        }
    }
}
