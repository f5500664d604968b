//! Game session: the live dogs and loot of one map
//!
//! A session owns its dogs and free loot by value. Each tick moves every dog,
//! turns the swept paths into gatherers, and resolves pickups and office
//! visits in the order the dogs reached them.

use crate::dog::{Dog, Loot};
use crate::ids::IdAllocator;
use crate::map::Map;
use crate::movement::resolve_movement;
use log::debug;
use rand::Rng;
use shared::{
    find_gather_events, Gatherer, Item, LootGenerator, Vec2, VecProvider, DOG_GATHER_WIDTH,
    LOOT_WIDTH, OFFICE_WIDTH,
};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameSession {
    id: u64,
    map_id: String,
    dogs: BTreeMap<u64, Dog>,
    loot: BTreeMap<u64, Loot>,
}

impl GameSession {
    pub fn new(id: u64, map_id: String) -> Self {
        Self {
            id,
            map_id,
            dogs: BTreeMap::new(),
            loot: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    pub fn add_dog(&mut self, dog: Dog) {
        self.dogs.insert(dog.id(), dog);
    }

    pub fn remove_dog(&mut self, dog_id: u64) -> Option<Dog> {
        self.dogs.remove(&dog_id)
    }

    pub fn dog(&self, dog_id: u64) -> Option<&Dog> {
        self.dogs.get(&dog_id)
    }

    pub fn dog_mut(&mut self, dog_id: u64) -> Option<&mut Dog> {
        self.dogs.get_mut(&dog_id)
    }

    /// Dogs in id order
    pub fn dogs(&self) -> impl Iterator<Item = &Dog> {
        self.dogs.values()
    }

    pub fn dog_count(&self) -> usize {
        self.dogs.len()
    }

    pub fn add_loot(&mut self, loot: Loot) {
        self.loot.insert(loot.id, loot);
    }

    pub fn take_loot(&mut self, loot_id: u64) -> Option<Loot> {
        self.loot.remove(&loot_id)
    }

    pub fn loot(&self, loot_id: u64) -> Option<&Loot> {
        self.loot.get(&loot_id)
    }

    /// Free loot in id order
    pub fn loot_items(&self) -> impl Iterator<Item = &Loot> {
        self.loot.values()
    }

    pub fn loot_count(&self) -> usize {
        self.loot.len()
    }

    /// Moves every dog, then resolves pickups, deposits and idle timers.
    pub fn update(&mut self, map: &Map, time_delta: Duration) {
        let mut provider = VecProvider::new();
        let mut previous = BTreeMap::new();

        for dog in self.dogs.values_mut() {
            dog.add_play_time(time_delta);

            let start = dog.position();
            previous.insert(dog.id(), start);

            let outcome = resolve_movement(map.roads(), start, dog.velocity(), time_delta);
            dog.set_position(outcome.position);
            dog.set_velocity(outcome.velocity);

            provider.add_gatherer(Gatherer {
                start,
                end: dog.position(),
                width: DOG_GATHER_WIDTH,
                id: dog.id(),
            });
        }

        self.gather(map, &mut provider);

        for dog in self.dogs.values_mut() {
            let start = previous.get(&dog.id()).copied().unwrap_or(Vec2::ZERO);
            dog.track_idle(start, time_delta);
        }
    }

    fn gather(&mut self, map: &Map, provider: &mut VecProvider) {
        for loot in self.loot.values() {
            provider.add_item(Item {
                position: loot.position,
                width: LOOT_WIDTH,
                id: loot.id,
            });
        }

        // Offices take item ids counting down from the top of the id space
        let mut offices = HashSet::new();
        for (index, office) in map.offices().iter().enumerate() {
            let item_id = u64::MAX - index as u64;
            offices.insert(item_id);
            provider.add_item(Item {
                position: Vec2::from(office.position),
                width: OFFICE_WIDTH,
                id: item_id,
            });
        }

        let mut collected = HashSet::new();
        for event in find_gather_events(&*provider) {
            let Some(dog) = self.dogs.get_mut(&event.gatherer_id) else {
                continue;
            };

            if offices.contains(&event.item_id) {
                let gained = dog.release_bag();
                if gained > 0 {
                    debug!("Dog {} deposited loot worth {}", dog.id(), gained);
                }
                continue;
            }

            if collected.contains(&event.item_id) || dog.is_bag_full(map.bag_capacity()) {
                continue;
            }
            if let Some(loot) = self.loot.remove(&event.item_id) {
                if let Err(loot) = dog.pick_up(loot, map.bag_capacity()) {
                    self.loot.insert(loot.id, loot);
                    continue;
                }
                collected.insert(event.item_id);
            }
        }
    }

    /// Adds loot according to the generator and returns how many were added.
    ///
    /// Maps without loot types never spawn loot.
    pub fn spawn_loot<R: Rng + ?Sized>(
        &mut self,
        map: &Map,
        generator: &LootGenerator,
        time_delta: Duration,
        ids: &mut IdAllocator,
        rng: &mut R,
    ) -> u32 {
        let type_count = map.loot_type_count();
        if type_count == 0 {
            return 0;
        }

        let count = generator.generate(
            time_delta,
            self.loot.len() as u32,
            self.dogs.len() as u32,
        );

        let mut added = 0;
        for _ in 0..count {
            let Some(position) = map.random_road_point(rng) else {
                break;
            };
            let loot_type = rng.gen_range(0..type_count);
            self.add_loot(Loot {
                id: ids.allocate(),
                loot_type,
                position,
                value: map.loot_value(loot_type),
            });
            added += 1;
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dog::Direction;
    use crate::map::Office;
    use shared::{Point, Road};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn test_map(bag_capacity: usize) -> Map {
        let mut map = Map::new("map1".to_string(), "Map 1".to_string(), 1.0, bag_capacity);
        map.add_road(Road::horizontal(Point::new(0, 0), 20));
        map.add_loot_type(5);
        map.add_loot_type(7);
        map
    }

    fn loot_at(id: u64, x: f64, value: u64) -> Loot {
        Loot {
            id,
            loot_type: 0,
            position: Vec2::new(x, 0.0),
            value,
        }
    }

    fn running_dog(id: u64, x: f64) -> Dog {
        let mut dog = Dog::new(id, format!("dog{}", id), Vec2::new(x, 0.0));
        dog.steer(Direction::Right, 1.0);
        dog
    }

    #[test]
    fn test_pickup_moves_loot_into_bag() {
        let map = test_map(3);
        let mut session = GameSession::new(1, "map1".to_string());
        session.add_dog(running_dog(0, 0.0));
        session.add_loot(loot_at(10, 2.0, 5));

        session.update(&map, ms(3000));

        assert_eq!(session.loot_count(), 0);
        let dog = session.dog(0).unwrap();
        assert_eq!(dog.bag().len(), 1);
        assert_eq!(dog.bag()[0].id, 10);
    }

    #[test]
    fn test_full_bag_leaves_loot() {
        let map = test_map(1);
        let mut session = GameSession::new(1, "map1".to_string());
        session.add_dog(running_dog(0, 0.0));
        session.add_loot(loot_at(10, 1.0, 5));
        session.add_loot(loot_at(11, 2.0, 7));

        session.update(&map, ms(3000));

        let dog = session.dog(0).unwrap();
        assert_eq!(dog.bag().len(), 1);
        assert_eq!(dog.bag()[0].id, 10);
        assert!(session.loot(11).is_some());
    }

    #[test]
    fn test_earlier_dog_wins_contested_loot() {
        let map = test_map(3);
        let mut session = GameSession::new(1, "map1".to_string());
        // Dog 0 reaches x=4 at t=0.8; dog 1 reaches it at t=0.2
        session.add_dog(running_dog(0, 0.0));
        session.add_dog(running_dog(1, 3.0));
        session.add_loot(loot_at(10, 4.0, 5));

        session.update(&map, ms(5000));

        assert!(session.dog(0).unwrap().bag().is_empty());
        assert_eq!(session.dog(1).unwrap().bag().len(), 1);
        assert_eq!(session.loot_count(), 0);
    }

    #[test]
    fn test_office_deposit() {
        let mut map = test_map(3);
        map.add_office(Office {
            id: "o1".to_string(),
            position: Point::new(6, 0),
            offset: Point::new(0, 0),
        });
        let mut session = GameSession::new(1, "map1".to_string());
        session.add_dog(running_dog(0, 0.0));
        session.add_loot(loot_at(10, 2.0, 5));
        session.add_loot(loot_at(11, 4.0, 7));

        session.update(&map, ms(8000));

        let dog = session.dog(0).unwrap();
        assert_eq!(dog.score(), 12);
        assert!(dog.bag().is_empty());
    }

    #[test]
    fn test_loot_after_office_stays_in_bag() {
        let mut map = test_map(3);
        map.add_office(Office {
            id: "o1".to_string(),
            position: Point::new(3, 0),
            offset: Point::new(0, 0),
        });
        let mut session = GameSession::new(1, "map1".to_string());
        session.add_dog(running_dog(0, 0.0));
        session.add_loot(loot_at(10, 5.0, 5));

        session.update(&map, ms(6000));

        let dog = session.dog(0).unwrap();
        assert_eq!(dog.score(), 0);
        assert_eq!(dog.bag().len(), 1);
    }

    #[test]
    fn test_idle_and_play_time() {
        let map = test_map(3);
        let mut session = GameSession::new(1, "map1".to_string());
        let mut stopped = Dog::new(0, "idle".to_string(), Vec2::ZERO);
        stopped.steer(Direction::None, 1.0);
        session.add_dog(stopped);
        session.add_dog(running_dog(1, 0.0));

        session.update(&map, ms(100));
        session.update(&map, ms(100));

        let idle = session.dog(0).unwrap();
        assert_eq!(idle.idle_time(), Some(ms(200)));
        assert_eq!(idle.play_time(), ms(200));

        let runner = session.dog(1).unwrap();
        assert_eq!(runner.idle_time(), None);
        assert_eq!(runner.play_time(), ms(200));
    }

    #[test]
    fn test_spawn_loot_bounded_by_dogs() {
        let map = test_map(3);
        let generator = LootGenerator::new(Duration::from_secs(1), 1.0);
        let mut ids = IdAllocator::default();
        let mut rng = rand::thread_rng();
        let mut session = GameSession::new(1, "map1".to_string());
        session.add_dog(Dog::new(0, "a".to_string(), Vec2::ZERO));
        session.add_dog(Dog::new(1, "b".to_string(), Vec2::ZERO));

        let added = session.spawn_loot(&map, &generator, ms(1000), &mut ids, &mut rng);
        assert_eq!(added, 2);
        assert_eq!(session.loot_count(), 2);

        let again = session.spawn_loot(&map, &generator, ms(1000), &mut ids, &mut rng);
        assert_eq!(again, 0);

        for loot in session.loot_items() {
            assert!(loot.value == 5 || loot.value == 7);
            assert!(shared::is_on_any_road(map.roads(), loot.position));
        }
    }

    #[test]
    fn test_no_loot_types_no_spawn() {
        let mut map = Map::new("bare".to_string(), "Bare".to_string(), 1.0, 3);
        map.add_road(Road::horizontal(Point::new(0, 0), 5));
        let generator = LootGenerator::new(Duration::from_secs(1), 1.0);
        let mut ids = IdAllocator::default();
        let mut session = GameSession::new(1, "bare".to_string());
        session.add_dog(Dog::new(0, "a".to_string(), Vec2::ZERO));

        let added = session.spawn_loot(&map, &generator, ms(1000), &mut ids, &mut rand::thread_rng());
        assert_eq!(added, 0);
    }
}
