//! Box-based shapes in a cell's local coordinate space.
//!
//! A [`Shape`] is an immutable union of axis-aligned [`Cuboid`]s. The cell
//! spans `0.0..=1.0` on every axis, but nothing stops a part from
//! reaching past it. Set operations are exact up to [`EPSILON`]: slivers
//! thinner than that on any axis are treated as empty space.

use std::fmt;

/// Tolerance used by every comparison in this module.
pub const EPSILON: f64 = 1.0e-7;

/// One of the six faces of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Axis index (0 = x, 1 = y, 2 = z) and whether the face is on the
    /// positive end of that axis.
    const fn axis(self) -> (usize, bool) {
        match self {
            Direction::Down => (1, false),
            Direction::Up => (1, true),
            Direction::North => (2, false),
            Direction::South => (2, true),
            Direction::West => (0, false),
            Direction::East => (0, true),
        }
    }
}

/// An axis-aligned box with `min <= max` on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Cuboid {
    /// Creates a box from two opposite corners in any order.
    #[must_use]
    pub fn new(x0: f64, y0: f64, z0: f64, x1: f64, y1: f64, z1: f64) -> Self {
        Self {
            min: [x0.min(x1), y0.min(y1), z0.min(z1)],
            max: [x0.max(x1), y0.max(y1), z0.max(z1)],
        }
    }

    /// The whole cell.
    #[must_use]
    pub fn unit() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0)
    }

    /// Builds a box from sixteenth-of-a-cell coordinates, the usual grid for
    /// hand-authored part shapes.
    #[must_use]
    pub fn sixteenths(x0: u8, y0: u8, z0: u8, x1: u8, y1: u8, z1: u8) -> Self {
        let s = |v: u8| f64::from(v) / 16.0;
        Self::new(s(x0), s(y0), s(z0), s(x1), s(y1), s(z1))
    }

    /// True when some axis is thinner than [`EPSILON`].
    pub fn is_degenerate(&self) -> bool {
        (0..3).any(|axis| self.max[axis] - self.min[axis] <= EPSILON)
    }

    pub fn volume(&self) -> f64 {
        (0..3).map(|axis| self.max[axis] - self.min[axis]).product()
    }

    /// True when the two boxes share a region of positive volume.
    /// Touching faces do not count.
    pub fn intersects(&self, other: &Cuboid) -> bool {
        (0..3).all(|axis| {
            self.min[axis] < other.max[axis] - EPSILON && other.min[axis] < self.max[axis] - EPSILON
        })
    }

    /// The shared region, if it has positive volume.
    pub fn intersection(&self, other: &Cuboid) -> Option<Cuboid> {
        if !self.intersects(other) {
            return None;
        }
        let mut cut = *self;
        for axis in 0..3 {
            cut.min[axis] = self.min[axis].max(other.min[axis]);
            cut.max[axis] = self.max[axis].min(other.max[axis]);
        }
        Some(cut)
    }

    /// True when `other` lies entirely inside this box.
    pub fn contains(&self, other: &Cuboid) -> bool {
        (0..3).all(|axis| {
            self.min[axis] <= other.min[axis] + EPSILON && other.max[axis] <= self.max[axis] + EPSILON
        })
    }

    /// Smallest box enclosing both.
    #[must_use]
    pub fn enclose(&self, other: &Cuboid) -> Cuboid {
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] = self.min[axis].min(other.min[axis]);
            out.max[axis] = self.max[axis].max(other.max[axis]);
        }
        out
    }

    /// The parts of this box not covered by `other`, as at most six
    /// disjoint boxes.
    pub fn subtract(&self, other: &Cuboid) -> Vec<Cuboid> {
        let Some(cut) = self.intersection(other) else {
            return vec![*self];
        };
        let mut pieces = Vec::with_capacity(6);
        let mut rest = *self;
        for axis in 0..3 {
            if cut.min[axis] - rest.min[axis] > EPSILON {
                let mut low = rest;
                low.max[axis] = cut.min[axis];
                pieces.push(low);
            }
            if rest.max[axis] - cut.max[axis] > EPSILON {
                let mut high = rest;
                high.min[axis] = cut.max[axis];
                pieces.push(high);
            }
            rest.min[axis] = cut.min[axis];
            rest.max[axis] = cut.max[axis];
        }
        pieces
    }

    /// True when the box reaches the given face of the cell.
    pub fn touches(&self, side: Direction) -> bool {
        let (axis, positive) = side.axis();
        if positive {
            self.max[axis] >= 1.0 - EPSILON
        } else {
            self.min[axis] <= EPSILON
        }
    }

    #[must_use]
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Cuboid {
        let d = [dx, dy, dz];
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] += d[axis];
            out.max[axis] += d[axis];
        }
        out
    }
}

/// An immutable region made of possibly-overlapping boxes.
///
/// Equality is region equality: two shapes are equal when each contains the
/// other, regardless of how the boxes are split.
#[derive(Clone, Default)]
pub struct Shape {
    boxes: Vec<Cuboid>,
}

impl Shape {
    /// The empty region.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The whole cell.
    #[must_use]
    pub fn full_cell() -> Self {
        Self::cuboid(Cuboid::unit())
    }

    #[must_use]
    pub fn cuboid(cuboid: Cuboid) -> Self {
        Self::from_cuboids([cuboid])
    }

    /// Collects boxes, silently dropping degenerate ones.
    #[must_use]
    pub fn from_cuboids(cuboids: impl IntoIterator<Item = Cuboid>) -> Self {
        Self {
            boxes: cuboids.into_iter().filter(|c| !c.is_degenerate()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn cuboids(&self) -> &[Cuboid] {
        &self.boxes
    }

    /// Box enclosing the whole shape, `None` when empty.
    pub fn bounding_box(&self) -> Option<Cuboid> {
        let (first, rest) = self.boxes.split_first()?;
        Some(rest.iter().fold(*first, |acc, c| acc.enclose(c)))
    }

    /// The combined region of both shapes.
    #[must_use]
    pub fn union(&self, other: &Shape) -> Shape {
        let mut boxes = Vec::with_capacity(self.boxes.len() + other.boxes.len());
        boxes.extend(self.boxes.iter().copied());
        for candidate in &other.boxes {
            if !boxes.iter().any(|b| b.contains(candidate)) {
                boxes.push(*candidate);
            }
        }
        Shape { boxes }
    }

    /// Union of every shape in the iterator.
    #[must_use]
    pub fn union_all<'a>(shapes: impl IntoIterator<Item = &'a Shape>) -> Shape {
        shapes
            .into_iter()
            .fold(Shape::empty(), |acc, shape| acc.union(shape))
    }

    /// True when the shapes share a region of positive volume.
    pub fn overlaps(&self, other: &Shape) -> bool {
        self.boxes
            .iter()
            .any(|a| other.boxes.iter().any(|b| a.intersects(b)))
    }

    /// True when the bounding boxes overlap. Cheap pre-filter for
    /// [`Shape::overlaps`].
    pub fn bounds_overlap(&self, other: &Shape) -> bool {
        match (self.bounding_box(), other.bounding_box()) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        }
    }

    /// The region shared by both shapes.
    #[must_use]
    pub fn intersection(&self, other: &Shape) -> Shape {
        Shape {
            boxes: self
                .boxes
                .iter()
                .flat_map(|a| other.boxes.iter().filter_map(move |b| a.intersection(b)))
                .collect(),
        }
    }

    /// The part of this shape not covered by `other`.
    #[must_use]
    pub fn subtract(&self, other: &Shape) -> Shape {
        let mut pieces = self.boxes.clone();
        for cutter in &other.boxes {
            if pieces.is_empty() {
                break;
            }
            pieces = pieces
                .iter()
                .flat_map(|piece| piece.subtract(cutter))
                .collect();
        }
        Shape::from_cuboids(pieces)
    }

    /// True when every point of `other` is inside this shape.
    pub fn contains(&self, other: &Shape) -> bool {
        other.subtract(self).is_empty()
    }

    /// Rewrites the shape as pairwise-disjoint boxes covering the same region.
    #[must_use]
    pub fn disjoint(&self) -> Shape {
        let mut out: Vec<Cuboid> = Vec::with_capacity(self.boxes.len());
        for b in &self.boxes {
            let mut pieces = vec![*b];
            for existing in &out {
                pieces = pieces.iter().flat_map(|p| p.subtract(existing)).collect();
            }
            out.extend(pieces);
        }
        Shape::from_cuboids(out)
    }

    /// Volume of the covered region (overlaps counted once).
    pub fn volume(&self) -> f64 {
        self.disjoint().boxes.iter().map(Cuboid::volume).sum()
    }

    /// True when some box reaches the given face of the cell.
    pub fn touches(&self, side: Direction) -> bool {
        self.boxes.iter().any(|b| b.touches(side))
    }

    #[must_use]
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Shape {
        Shape {
            boxes: self.boxes.iter().map(|b| b.offset(dx, dy, dz)).collect(),
        }
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.contains(other) && other.contains(self)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.boxes.iter()).finish()
    }
}

impl From<Cuboid> for Shape {
    fn from(cuboid: Cuboid) -> Self {
        Shape::cuboid(cuboid)
    }
}

impl FromIterator<Cuboid> for Shape {
    fn from_iter<I: IntoIterator<Item = Cuboid>>(iter: I) -> Self {
        Shape::from_cuboids(iter)
    }
}
