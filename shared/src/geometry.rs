//! Road geometry: corridor membership, segment intersection and coordinate rounding
//!
//! Every road is an axis-aligned segment with integer endpoints. The walkable
//! area around it is a rectangle ("corridor") that extends `ROAD_HALF_WIDTH`
//! past the segment on every side. Coordinates produced by the simulation are
//! rounded to three decimals, and corridor tests compare on a 0.001 grid so
//! that floating-point noise at a corridor edge does not push a dog off-road.

use serde::{Deserialize, Serialize};

/// Half-width of the walkable corridor around a road segment.
pub const ROAD_HALF_WIDTH: f64 = 0.4;

const COORD_SCALE: f64 = 1000.0;
const COMPARE_GRID: f64 = 0.001;

///Represents a point or a velocity on the map plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    ///Value along the x-axis.
    pub x: f64,
    ///Value along the y-axis.
    /// Positive direction is down, matching map coordinates.
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f64) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: &Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    ///Returns the euclidean distance between two points.
    pub fn distance(&self, other: &Vec2) -> f64 {
        self.sub(other).magnitude()
    }

    ///Returns the point with both coordinates rounded to three decimals.
    pub fn rounded(&self) -> Vec2 {
        Vec2 {
            x: round_coord(self.x),
            y: round_coord(self.y),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2 {
            x: f64::from(p.x),
            y: f64::from(p.y),
        }
    }
}

/// Integer map coordinate used by static map data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Straight segment between two map points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }
}

/// Axis-aligned road segment with integer endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    start: Point,
    end: Point,
}

impl Road {
    pub fn horizontal(start: Point, end_x: i32) -> Self {
        Self {
            start,
            end: Point::new(end_x, start.y),
        }
    }

    pub fn vertical(start: Point, end_y: i32) -> Self {
        Self {
            start,
            end: Point::new(start.x, end_y),
        }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    /// Endpoints ordered so that `start` has the smaller varying coordinate.
    pub fn ordered_ends(&self) -> (Point, Point) {
        let (start, end) = (self.start, self.end);
        if self.is_horizontal() && start.x > end.x {
            return (end, start);
        }
        if self.is_vertical() && start.y > end.y {
            return (end, start);
        }
        (start, end)
    }

    /// Lower-left and upper-right corners of the walkable corridor.
    pub fn corridor_bounds(&self) -> (Vec2, Vec2) {
        let (start, end) = self.ordered_ends();
        (
            Vec2::new(
                f64::from(start.x) - ROAD_HALF_WIDTH,
                f64::from(start.y) - ROAD_HALF_WIDTH,
            ),
            Vec2::new(
                f64::from(end.x) + ROAD_HALF_WIDTH,
                f64::from(end.y) + ROAD_HALF_WIDTH,
            ),
        )
    }
}

/// Rounds a coordinate to three decimal places.
pub fn round_coord(value: f64) -> f64 {
    (value * COORD_SCALE).round() / COORD_SCALE
}

fn snap(value: f64) -> f64 {
    (value / COMPARE_GRID).round() * COMPARE_GRID
}

/// Returns true if the point lies inside the road's corridor.
///
/// Both the point and the corridor edges are snapped to a 0.001 grid before
/// comparing, so a point sitting on the edge up to rounding noise counts as
/// on-road.
pub fn is_on_road(road: &Road, point: Vec2) -> bool {
    let (lo, hi) = road.corridor_bounds();
    let (x, y) = (snap(point.x), snap(point.y));

    !(x < snap(lo.x) || x > snap(hi.x) || y < snap(lo.y) || y > snap(hi.y))
}

/// Returns true if the point lies inside the corridor of any of the roads.
pub fn is_on_any_road(roads: &[Road], point: Vec2) -> bool {
    roads.iter().any(|road| is_on_road(road, point))
}

/// The four boundary segments of the road's corridor.
///
/// Order: bottom edge, far edge, top edge, near edge (for horizontal roads;
/// vertical roads follow the same corner walk).
pub fn corridor_borders(road: &Road) -> [Segment; 4] {
    let (start, end) = road.ordered_ends();
    let (sx, sy) = (f64::from(start.x), f64::from(start.y));
    let (ex, ey) = (f64::from(end.x), f64::from(end.y));
    let r = ROAD_HALF_WIDTH;

    let a = Vec2::new(sx - r, sy - r);
    let c = Vec2::new(ex + r, ey + r);
    let (b, d) = if road.is_horizontal() {
        (Vec2::new(ex + r, ey - r), Vec2::new(sx - r, sy + r))
    } else {
        (Vec2::new(sx + r, sy - r), Vec2::new(ex - r, ey + r))
    };

    [
        Segment::new(a, b),
        Segment::new(b, c),
        Segment::new(d, c),
        Segment::new(a, d),
    ]
}

/// Finds where segment `a` meets segment `b`.
///
/// Returns `None` when the segments do not touch, or when the first contact
/// point is exactly `a.start`: a walk that begins on a border is not a
/// crossing of that border. For collinear overlapping segments the contact
/// point is the overlap end nearest to `a.start`. The result is rounded to
/// three decimals.
pub fn segment_intersect(a: &Segment, b: &Segment) -> Option<Vec2> {
    let p = a.start;
    let r = a.end.sub(&a.start);
    let q = b.start;
    let s = b.end.sub(&b.start);

    // A zero-length walk can only touch at its own start.
    if r.is_zero() {
        return None;
    }

    let qp = q.sub(&p);
    let denom = r.cross(&s);

    let t = if denom == 0.0 {
        if qp.cross(&r) != 0.0 {
            return None;
        }
        // Collinear: project b onto a and clip to [0, 1].
        let rr = r.dot(&r);
        let t0 = qp.dot(&r) / rr;
        let t1 = t0 + s.dot(&r) / rr;
        let lo = t0.min(t1).max(0.0);
        let hi = t0.max(t1).min(1.0);
        if lo > hi {
            return None;
        }
        lo
    } else {
        let t = qp.cross(&s) / denom;
        let u = qp.cross(&r) / denom;
        if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
            return None;
        }
        t
    };

    let hit = p.add(&r.scale(t));
    if hit == a.start {
        return None;
    }
    Some(hit.rounded())
}
