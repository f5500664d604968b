//! Swept collision detection between moving gatherers and static items
//!
//! A gatherer is the path one actor swept during a tick; an item is a point
//! with a pickup radius. An item is gathered when its closest approach to the
//! swept segment lies within the segment (projection ratio in `[0, 1]`) and no
//! farther than the two radii combined. Events come back ordered by how far
//! along its path the gatherer was when it touched the item, so earlier
//! contacts are resolved first.

use crate::geometry::Vec2;

/// Closest-approach data for one point against one swept segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionResult {
    /// Squared distance from the point to the segment's supporting line.
    pub sq_distance: f64,
    /// Fraction of the segment travelled at the closest approach.
    pub proj_ratio: f64,
}

impl CollectionResult {
    pub fn is_collected(&self, collect_radius: f64) -> bool {
        self.proj_ratio >= 0.0
            && self.proj_ratio <= 1.0
            && self.sq_distance <= collect_radius * collect_radius
    }
}

/// Moving from `a` to `b`, how close does the walk come to `c`.
///
/// `a` and `b` must differ.
pub fn try_collect_point(a: Vec2, b: Vec2, c: Vec2) -> CollectionResult {
    let u = c.sub(&a);
    let v = b.sub(&a);
    let u_dot_v = u.dot(&v);
    let u_len2 = u.dot(&u);
    let v_len2 = v.dot(&v);

    CollectionResult {
        sq_distance: u_len2 - (u_dot_v * u_dot_v) / v_len2,
        proj_ratio: u_dot_v / v_len2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub position: Vec2,
    pub width: f64,
    /// Caller-side identifier echoed back in events.
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gatherer {
    pub start: Vec2,
    pub end: Vec2,
    pub width: f64,
    /// Caller-side identifier echoed back in events.
    pub id: u64,
}

/// One item touched by one gatherer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatheringEvent {
    pub item_id: u64,
    pub gatherer_id: u64,
    pub sq_distance: f64,
    /// Projection ratio along the gatherer's path, in `[0, 1]`.
    pub time: f64,
}

/// Source of items and gatherers for one detection pass.
pub trait ItemGathererProvider {
    fn items(&self) -> &[Item];
    fn gatherers(&self) -> &[Gatherer];
}

/// Provider backed by two plain vectors, built fresh every tick.
#[derive(Debug, Clone, Default)]
pub struct VecProvider {
    items: Vec<Item>,
    gatherers: Vec<Gatherer>,
}

impl VecProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item and returns its index.
    pub fn add_item(&mut self, item: Item) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    /// Adds a gatherer and returns its index.
    pub fn add_gatherer(&mut self, gatherer: Gatherer) -> usize {
        self.gatherers.push(gatherer);
        self.gatherers.len() - 1
    }
}

impl ItemGathererProvider for VecProvider {
    fn items(&self) -> &[Item] {
        &self.items
    }

    fn gatherers(&self) -> &[Gatherer] {
        &self.gatherers
    }
}

/// Finds every (item, gatherer) contact, ordered by time along the path.
///
/// Gatherers that did not move produce no events. The sort is stable, so
/// contacts with equal time keep gatherer-major, item-minor insertion order.
pub fn find_gather_events<P: ItemGathererProvider + ?Sized>(provider: &P) -> Vec<GatheringEvent> {
    let mut events = Vec::new();

    for gatherer in provider.gatherers() {
        if gatherer.start == gatherer.end {
            continue;
        }

        for item in provider.items() {
            let result = try_collect_point(gatherer.start, gatherer.end, item.position);
            if result.is_collected(gatherer.width + item.width) {
                events.push(GatheringEvent {
                    item_id: item.id,
                    gatherer_id: gatherer.id,
                    sq_distance: result.sq_distance,
                    time: result.proj_ratio,
                });
            }
        }
    }

    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}
